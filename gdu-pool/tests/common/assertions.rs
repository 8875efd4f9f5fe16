use gdu_pool::{Pool, PresentableId};
use gdu_types::ByteRange;

/// Every id a presentable holds must resolve, and no activatable drive may
/// linger empty.
pub fn assert_consistent(pool: &Pool) {
    for presentable in pool.list_all() {
        if let Some(enclosing) = presentable.enclosing() {
            assert!(
                pool.get(enclosing).is_some(),
                "{} is enclosed by missing {}",
                presentable.id(),
                enclosing
            );
        }
        if let Some(device) = presentable.device_id() {
            assert!(
                pool.device(device).is_some(),
                "{} is backed by unknown device {}",
                presentable.id(),
                device
            );
        }
        if let Some(drive) = presentable.as_activatable() {
            assert!(!drive.is_empty(), "{} is empty", presentable.id());
            for slave in drive.slaves() {
                assert!(
                    pool.device(slave).is_some(),
                    "{} lists unknown slave {}",
                    presentable.id(),
                    slave
                );
            }
        }
    }
}

/// Ranges of the holes directly enclosed by `enclosing`, in offset order.
pub fn hole_ranges(pool: &Pool, enclosing: &PresentableId) -> Vec<ByteRange> {
    let mut ranges: Vec<ByteRange> = pool
        .list_enclosed(enclosing)
        .into_iter()
        .filter_map(|p| p.hole_range())
        .collect();
    ranges.sort_by_key(|range| range.start);
    ranges
}

pub fn enclosing_of(pool: &Pool, id: &PresentableId) -> Option<PresentableId> {
    pool.get(id).and_then(|p| p.enclosing().cloned())
}
