// SPDX-License-Identifier: GPL-3.0-only

//! Unallocated space detection

use gdu_types::{ByteRange, PartitionTableInfo, partition::MBR_PRIMARY_SLOTS};

/// Gaps of `range` not covered by any partition table entry that starts
/// inside it.
///
/// An entry counts when its slot is used and its offset lies strictly after
/// `range.start` and before `range.end`, so the entry of an extended partition
/// never covers its own interior. With `ignore_logical`, MBR entries beyond the
/// primary slots are skipped so the drive level sees only primaries. A gap is
/// reported only if it is non-empty and at least `threshold` bytes long.
pub fn compute_holes(
    table: &PartitionTableInfo,
    range: ByteRange,
    ignore_logical: bool,
    threshold: u64,
) -> Vec<ByteRange> {
    let skip_logical = ignore_logical && table.is_mbr();

    let mut entries: Vec<ByteRange> = table
        .entries()
        .filter(|entry| !(skip_logical && entry.number > MBR_PRIMARY_SLOTS))
        .filter(|entry| entry.offset > range.start && entry.offset < range.end)
        .map(|entry| entry.range())
        .collect();
    entries.sort_by_key(|entry| entry.start);

    let mut holes = Vec::new();
    let mut cursor = range.start;

    for entry in entries {
        let gap = ByteRange {
            start: cursor,
            end: entry.start,
        };
        if keep(gap, threshold) {
            holes.push(gap);
        }
        // Overlapping entries never move the cursor backwards.
        cursor = cursor.max(entry.end.min(range.end));
    }

    let tail = ByteRange {
        start: cursor,
        end: range.end,
    };
    if keep(tail, threshold) {
        holes.push(tail);
    }

    holes
}

fn keep(gap: ByteRange, threshold: u64) -> bool {
    !gap.is_empty() && gap.size() >= threshold
}
