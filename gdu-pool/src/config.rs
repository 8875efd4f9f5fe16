// SPDX-License-Identifier: GPL-3.0-only

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunables of the reconciler. Every field has a default, so an empty TOML
/// document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// A gap becomes a hole only if it covers at least this percentage of the
    /// drive.
    pub min_hole_percent: u8,

    /// Re-resolve presentables whose enclosing presentable was missing when
    /// they were created.
    pub resolve_deferred: bool,

    /// Prime device-mapper and md array devices after everything else.
    pub prime_arrays_last: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_hole_percent: 1,
            resolve_deferred: true,
            prime_arrays_last: true,
        }
    }
}

impl PoolConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(raw)?;
        config.min_hole_percent = config.min_hole_percent.min(100);
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Smallest gap, in bytes, reported as a hole on a drive of `drive_size` bytes.
    pub fn hole_threshold(&self, drive_size: u64) -> u64 {
        drive_size / 100 * u64::from(self.min_hole_percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = PoolConfig::from_toml_str("").expect("parse empty config");
        assert_eq!(config, PoolConfig::default());
        assert_eq!(config.hole_threshold(1000), 10);
    }

    #[test]
    fn percent_is_clamped() {
        let config = PoolConfig::from_toml_str("min_hole_percent = 250\nresolve_deferred = false")
            .expect("parse config");
        assert_eq!(config.min_hole_percent, 100);
        assert!(!config.resolve_deferred);
        assert!(config.prime_arrays_last);
    }

    #[test]
    fn zero_percent_threshold_is_zero() {
        let config = PoolConfig {
            min_hole_percent: 0,
            ..Default::default()
        };
        assert_eq!(config.hole_threshold(u64::MAX), 0);
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(PoolConfig::from_toml_str("min_hole_percent = \"big\"").is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = PoolConfig::load(Path::new("/nonexistent/gdu-pool.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
