mod common;

use common::assertions::assert_consistent;
use common::fixtures::*;
use gdu_pool::{Pool, PoolConfig, PresentableId};
use gdu_types::{DeviceRecord, PartitionScheme};

const UUID: &str = "0a1b2c3d:4e5f6071:8293a4b5:c6d7e8f9";

/// An MBR disk with a primary, an extended and a logical partition, an
/// unlocked LUKS volume on the primary, and a two-disk RAID-1.
fn mixed_devices() -> Vec<DeviceRecord> {
    let slots = [(100, 100), (300, 600), (0, 0), (0, 0), (350, 100)];
    let mut luks = partition("sda1", "sda", PartitionScheme::Mbr, 1, (100, 100), "0x83");
    luks.id_usage = "crypto".to_string();
    luks.id_type = "crypto_LUKS".to_string();
    vec![
        partitioned(disk("sda", 1000), PartitionScheme::Mbr, &slots),
        luks,
        partition("sda2", "sda", PartitionScheme::Mbr, 2, (300, 600), "0x05"),
        partition("sda5", "sda", PartitionScheme::Mbr, 5, (350, 100), "0x83"),
        cleartext("dm-0", "sda1"),
        component("sdb", UUID),
        component("sdc", UUID),
        md_array("md0", Some(UUID), &["sdb", "sdc"]),
    ]
}

type Row = (PresentableId, Option<PresentableId>, Option<u64>, Vec<String>);

/// The graph without arrival-order details such as slave order.
fn snapshot(pool: &Pool) -> Vec<Row> {
    pool.list_all()
        .into_iter()
        .map(|p| {
            let mut slaves = p
                .as_activatable()
                .map(|ad| ad.slaves().to_vec())
                .unwrap_or_default();
            slaves.sort();
            (p.id().clone(), p.enclosing().cloned(), p.position(), slaves)
        })
        .collect()
}

/// Every permutation of `0..n`, by Heap's algorithm.
fn permutations(n: usize) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..n).collect();
    let mut counters = vec![0; n];
    let mut all = vec![order.clone()];
    let mut i = 0;
    while i < n {
        if counters[i] < i {
            if i % 2 == 0 {
                order.swap(0, i);
            } else {
                order.swap(counters[i], i);
            }
            all.push(order.clone());
            counters[i] += 1;
            i = 0;
        } else {
            counters[i] = 0;
            i += 1;
        }
    }
    all
}

#[test]
fn heap_permutations_are_complete() {
    let mut all = permutations(4);
    assert_eq!(all.len(), 24);
    all.sort();
    all.dedup();
    assert_eq!(all.len(), 24);
}

#[tokio::test]
async fn every_arrival_order_builds_the_same_graph() {
    let devices = mixed_devices();
    let source = FakeSource::new();
    for record in &devices {
        source.put(record.clone());
    }

    let mut reference = Pool::new(source.clone(), PoolConfig::default());
    for record in &devices {
        reference.on_device_added(&record.id).await;
    }
    let expected = snapshot(&reference);
    assert!(reference.deferred_devices().is_empty());
    assert_eq!(
        reference.get(&volume_id("sda5")).and_then(|p| p.enclosing()),
        Some(&volume_id("sda2"))
    );
    assert_eq!(
        reference.get(&volume_id("dm-0")).and_then(|p| p.enclosing()),
        Some(&volume_id("sda1"))
    );
    assert_eq!(reference.activatable_drives().len(), 1);

    for order in permutations(devices.len()) {
        let mut pool = Pool::new(source.clone(), PoolConfig::default());
        for &index in &order {
            pool.on_device_added(&devices[index].id).await;
            assert_consistent(&pool);
        }
        let arrival: Vec<&str> = order.iter().map(|&i| devices[i].id.as_str()).collect();
        assert_eq!(snapshot(&pool), expected, "arrival order {arrival:?}");
        assert!(pool.deferred_devices().is_empty(), "arrival order {arrival:?}");

        for &index in &order {
            pool.on_device_removed(&devices[index].id);
            assert_consistent(&pool);
        }
        assert!(pool.list_all().is_empty(), "arrival order {arrival:?}");
        assert!(pool.devices().is_empty());
    }
}
