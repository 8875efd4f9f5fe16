// SPDX-License-Identifier: GPL-3.0-only

//! Typed reads out of D-Bus property maps

use std::collections::HashMap;

use zbus::zvariant::{OwnedObjectPath, OwnedValue};

pub type PropertyMap = HashMap<String, OwnedValue>;

pub fn as_string(value: &OwnedValue) -> Option<String> {
    String::try_from(value.clone()).ok()
}

pub fn as_u64(value: &OwnedValue) -> Option<u64> {
    if let Ok(parsed) = u64::try_from(value.clone()) {
        Some(parsed)
    } else {
        u32::try_from(value.clone()).ok().map(u64::from)
    }
}

pub fn as_u32(value: &OwnedValue) -> Option<u32> {
    u32::try_from(value.clone()).ok()
}

pub fn as_bool(value: &OwnedValue) -> Option<bool> {
    bool::try_from(value.clone()).ok()
}

pub fn as_f64(value: &OwnedValue) -> Option<f64> {
    f64::try_from(value.clone()).ok()
}

pub fn as_strings(value: &OwnedValue) -> Option<Vec<String>> {
    Vec::<String>::try_from(value.clone()).ok()
}

/// An object path property; the daemon's `/` placeholder reads as `None`.
pub fn as_object_path(value: &OwnedValue) -> Option<String> {
    let path = OwnedObjectPath::try_from(value.clone())
        .ok()
        .map(|path| path.to_string())
        .or_else(|| as_string(value))?;
    (path != "/").then_some(path)
}

pub fn as_object_paths(value: &OwnedValue) -> Vec<String> {
    Vec::<OwnedObjectPath>::try_from(value.clone())
        .map(|paths| paths.into_iter().map(|p| p.to_string()).collect())
        .unwrap_or_default()
}

/// A NUL-terminated byte string property (`ay`).
pub fn as_bytestring(value: &OwnedValue) -> Option<String> {
    let bytes: Vec<u8> = value.clone().try_into().ok()?;
    Some(decode_c_string_bytes(&bytes))
}

pub fn decode_c_string_bytes(bytes: &[u8]) -> String {
    let raw = match bytes.split(|b| *b == 0).next() {
        Some(v) => v,
        None => bytes,
    };

    String::from_utf8_lossy(raw).to_string()
}

/// Mount points (`aay`), skipping empty entries.
pub fn as_mount_points(value: &OwnedValue) -> Vec<String> {
    Vec::<Vec<u8>>::try_from(value.clone())
        .map(|mount_points| {
            mount_points
                .iter()
                .map(|mp| decode_c_string_bytes(mp))
                .filter(|decoded| !decoded.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Shorthand for looking up and converting one property.
pub fn prop<T>(props: &PropertyMap, name: &str, read: fn(&OwnedValue) -> Option<T>) -> Option<T> {
    props.get(name).and_then(read)
}
