use std::collections::HashMap;

use afit_packer::geometry::verify_packing;
use afit_packer::model::{Container, ItemType};
use afit_packer::optimizer::{PackEvent, PackingConfig, pack, pack_with_config, pack_with_progress};
use test_case::test_case;

const EPS: f64 = 1e-6;

fn unweighted() -> PackingConfig {
    PackingConfig::builder().weighted(false).build()
}

fn mixed_catalog() -> Vec<ItemType> {
    vec![
        ItemType::new("a", (3.0, 2.0, 4.0), 10, 1.5).unwrap(),
        ItemType::new("b", (5.0, 4.0, 3.0), 6, 3.0).unwrap(),
        ItemType::new("c", (2.0, 2.0, 2.0), 20, 0.5).unwrap(),
    ]
}

fn units_by_id(items: impl IntoIterator<Item = String>) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for id in items {
        *counts.entry(id).or_insert(0) += 1;
    }
    counts
}

#[test_case(true ; "weighted")]
#[test_case(false ; "unweighted")]
fn exact_fill_of_cube(weighted: bool) {
    let container = Container::new("cube", (10.0, 10.0, 10.0), 1000.0).unwrap();
    let items = vec![ItemType::new("small", (2.0, 2.0, 2.0), 200, 1.0).unwrap()];
    let config = PackingConfig::builder().weighted(weighted).build();

    let result = pack_with_config(&container, &items, config);

    assert_eq!(result.packed_count(), 125);
    assert_eq!(result.unpacked_count(), 75);
    assert!((result.total_weight - 125.0).abs() < EPS);
    assert!((result.utilization_percent() - 100.0).abs() < EPS);
    assert_eq!(verify_packing(&result, EPS), Ok(()));
}

#[test]
fn oversized_item_is_never_packed() {
    let container = Container::new("small", (5.0, 5.0, 5.0), 100.0).unwrap();
    let items = vec![ItemType::new("big", (6.0, 6.0, 6.0), 1, 1.0).unwrap()];

    let result = pack(&container, &items);

    assert_eq!(result.packed_count(), 0);
    assert_eq!(result.unpacked_count(), 1);
    assert_eq!(result.unpacked[0].id, "big");
    assert_eq!(result.orientation, None);
}

#[test]
fn weight_cap_binds_before_volume() {
    let container = Container::new("capped", (10.0, 10.0, 10.0), 40.0).unwrap();
    let items = vec![
        ItemType::new("light", (5.0, 5.0, 5.0), 4, 5.0).unwrap(),
        ItemType::new("heavy", (5.0, 5.0, 5.0), 4, 20.0).unwrap(),
    ];

    let result = pack(&container, &items);

    assert!((result.total_weight - 40.0).abs() < EPS);
    assert!(result.utilization_percent() < 100.0);

    let packed = units_by_id(result.packed.iter().map(|p| p.id.clone()));
    assert_eq!(packed.get("light"), Some(&4));
    assert_eq!(packed.get("heavy"), Some(&1));

    let unpacked = units_by_id(result.unpacked.iter().map(|u| u.id.clone()));
    assert_eq!(unpacked.get("heavy"), Some(&3));
    assert_eq!(unpacked.get("light"), None);
}

#[test]
fn filler_leaves_no_strip_empty() {
    let container = Container::new("strip", (10.0, 4.0, 10.0), 1000.0).unwrap();
    let items = vec![
        ItemType::new("B", (10.0, 2.0, 6.0), 2, 1.0).unwrap(),
        ItemType::new("T", (10.0, 4.0, 4.0), 1, 1.0).unwrap(),
    ];

    let result = pack_with_config(&container, &items, unweighted());

    assert!(result.is_complete());
    assert_eq!(result.packed_count(), 3);
    assert!((result.utilization_percent() - 100.0).abs() < EPS);
    assert_eq!(verify_packing(&result, EPS), Ok(()));
}

#[test_case((12.0, 8.0, 10.0), 60.0, true ; "weighted box")]
#[test_case((12.0, 8.0, 10.0), 60.0, false ; "unweighted box")]
#[test_case((7.0, 13.0, 9.0), 25.0, true ; "weighted odd box")]
#[test_case((20.0, 6.0, 6.0), 200.0, false ; "unweighted long box")]
fn units_are_conserved_and_placed_validly(dims: (f64, f64, f64), max_weight: f64, weighted: bool) {
    let container = Container::new("box", dims, max_weight).unwrap();
    let items = mixed_catalog();
    let config = PackingConfig::builder().weighted(weighted).build();

    let result = pack_with_config(&container, &items, config);

    assert_eq!(verify_packing(&result, EPS), Ok(()));

    let packed = units_by_id(result.packed.iter().map(|p| p.id.clone()));
    let unpacked = units_by_id(result.unpacked.iter().map(|u| u.id.clone()));
    for item in &items {
        let total = packed.get(&item.id).copied().unwrap_or(0)
            + unpacked.get(&item.id).copied().unwrap_or(0);
        assert_eq!(total, item.quantity, "units of {}", item.id);
    }

    let weight: f64 = result.packed.iter().map(|p| p.weight).sum();
    assert!((weight - result.total_weight).abs() < EPS);
    if weighted {
        assert!(result.total_weight <= max_weight + EPS);
    }
}

#[test]
fn packing_is_deterministic() {
    let container = Container::new("box", (12.0, 8.0, 10.0), 60.0).unwrap();
    let items = mixed_catalog();

    let first = pack(&container, &items);
    let second = pack(&container, &items);

    assert_eq!(first, second);
}

#[test_case(true ; "weighted")]
#[test_case(false ; "unweighted")]
fn parallel_trials_match_sequential(weighted: bool) {
    let container = Container::new("box", (12.0, 8.0, 10.0), 60.0).unwrap();
    let items = mixed_catalog();
    let sequential = PackingConfig::builder().weighted(weighted).build();
    let parallel = PackingConfig::builder()
        .weighted(weighted)
        .parallel_trials(true)
        .build();

    assert_eq!(
        pack_with_config(&container, &items, sequential),
        pack_with_config(&container, &items, parallel)
    );
}

#[test]
fn cube_container_keeps_its_orientation() {
    let container = Container::new("cube", (9.0, 9.0, 9.0), 500.0).unwrap();
    let items = mixed_catalog();

    let result = pack_with_config(&container, &items, unweighted());

    assert_eq!(result.orientation, Some(4));
}

#[test]
fn progress_events_describe_committed_run() {
    let container = Container::new("box", (12.0, 8.0, 10.0), 60.0).unwrap();
    let items = mixed_catalog();
    let mut events = Vec::new();

    let result = pack_with_progress(&container, &items, PackingConfig::default(), |event| {
        events.push(event.clone())
    });

    let trials = events
        .iter()
        .filter(|e| matches!(e, PackEvent::TrialEvaluated { .. }))
        .count();
    let placed = events
        .iter()
        .filter(|e| matches!(e, PackEvent::ItemPlaced { .. }))
        .count();
    assert_eq!(trials, result.trials);
    assert_eq!(placed, result.packed_count());
    assert_eq!(
        events.last(),
        Some(&PackEvent::Finished {
            packed: result.packed_count(),
            unpacked: result.unpacked_count(),
            total_weight: result.total_weight,
        })
    );
}
