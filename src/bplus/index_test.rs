use rand::{prelude::random, rngs::SmallRng, Rng, SeedableRng};

use std::{collections::BTreeSet, ops::Bound};

use super::*;

#[test]
fn test_bplus_index() {
    let index = Index::new("test_bplus_index", false, 4).unwrap();

    for t in [500, 100, 900, 300, 700, 200, 800, 400, 600].iter() {
        assert!(index.set(&Value::Integer(*t), &format!("id{}", t)).unwrap());
    }
    assert_eq!(index.len(), 9);

    let lo = Value::Integer(250);
    let hi = Value::Integer(750);
    let entries = index.range(Bound::Included(&lo), Bound::Included(&hi));
    let keys: Vec<Value> = entries.iter().map(|e| e.key.clone()).collect();
    assert_eq!(
        keys,
        vec![
            Value::Integer(300),
            Value::Integer(400),
            Value::Integer(500),
            Value::Integer(600),
            Value::Integer(700),
        ]
    );

    assert_eq!(index.get(&Value::Integer(700)), vec!["id700".to_string()]);
    assert_eq!(index.get(&Value::Integer(701)), Vec::<String>::new());

    index.validate().unwrap();
}

#[test]
fn test_bplus_range_bounds() {
    let index = Index::new("test_bplus_range_bounds", false, 8).unwrap();
    for i in 0..100 {
        index.set(&Value::Integer(i), "x").unwrap();
    }

    let (lo, hi) = (Value::Integer(10), Value::Integer(20));

    let n = index.range(Bound::Included(&lo), Bound::Included(&hi)).len();
    assert_eq!(n, 11);
    let n = index.range(Bound::Excluded(&lo), Bound::Included(&hi)).len();
    assert_eq!(n, 10);
    let n = index.range(Bound::Included(&lo), Bound::Excluded(&hi)).len();
    assert_eq!(n, 10);
    let n = index.range(Bound::Excluded(&lo), Bound::Excluded(&hi)).len();
    assert_eq!(n, 9);

    let n = index.range(Bound::Unbounded, Bound::Included(&lo)).len();
    assert_eq!(n, 11);
    let n = index.range(Bound::Included(&hi), Bound::Unbounded).len();
    assert_eq!(n, 80);
    assert_eq!(index.iter().len(), 100);

    // lo above hi yields empty.
    let entries = index.range(Bound::Included(&hi), Bound::Included(&lo));
    assert!(entries.is_empty());
}

#[test]
fn test_bplus_split_at_midpoint() {
    let order = 4;
    let index = Index::new("test_bplus_split_at_midpoint", false, order).unwrap();

    // a leaf of size `order` splits exactly at the midpoint.
    for i in 0..order {
        index.set(&Value::Integer(i as i64), "x").unwrap();
    }
    let stats = index.to_stats().unwrap();
    assert_eq!(stats.n_splits, 1);
    assert_eq!(stats.n_leaves, 2);
    assert_eq!(stats.height, 2);

    let entries = index.iter();
    assert_eq!(entries.len(), order);
    index.validate().unwrap();
}

#[test]
fn test_bplus_duplicates() {
    let index = Index::new("test_bplus_duplicates", false, 4).unwrap();

    for i in 0..50 {
        index.set(&Value::Integer(7), &format!("id{:02}", i)).unwrap();
    }
    index.set(&Value::Integer(3), "a").unwrap();
    index.set(&Value::Integer(9), "b").unwrap();

    // duplicates come out adjacent, in identifier order.
    let ids = index.get(&Value::Integer(7));
    assert_eq!(ids.len(), 50);
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);

    // re-adding an existing (key, id) pair is a no-op.
    assert!(!index.set(&Value::Integer(7), "id00").unwrap());
    assert_eq!(index.len(), 52);

    assert!(index.remove(&Value::Integer(7), "id25"));
    assert!(!index.remove(&Value::Integer(7), "id25"));
    assert_eq!(index.get(&Value::Integer(7)).len(), 49);

    index.validate().unwrap();
}

#[test]
fn test_bplus_unique() {
    let index = Index::new("test_bplus_unique", true, 8).unwrap();

    assert!(index.set(&Value::from("a"), "id1").unwrap());
    assert!(!index.set(&Value::from("a"), "id1").unwrap());

    let err = index.set(&Value::from("a"), "id2").unwrap_err();
    assert_eq!(err.to_kind(), "DuplicateKey");
    assert_eq!(index.get(&Value::from("a")), vec!["id1".to_string()]);
    assert_eq!(index.len(), 1);
}

#[test]
fn test_bplus_delete_rebalance() {
    let index = Index::new("test_bplus_delete_rebalance", false, 4).unwrap();

    for i in 0..1000 {
        index.set(&Value::Integer(i), "x").unwrap();
    }
    index.validate().unwrap();

    // drain from the front, forcing borrows and merges all the way up.
    for i in 0..999 {
        assert!(index.remove(&Value::Integer(i), "x"), "{}", i);
        if i % 97 == 0 {
            index.validate().unwrap();
        }
    }
    let stats = index.validate().unwrap();
    assert_eq!(stats.n_count, 1);
    assert!(stats.n_merges > 0);
    assert_eq!(index.get(&Value::Integer(999)), vec!["x".to_string()]);

    // tree collapses back towards a single root leaf.
    assert_eq!(index.to_stats().unwrap().height, 1);
}

#[test]
fn test_bplus_model() {
    let seed: u128 = random();
    println!("test_bplus_model seed:{}", seed);
    let mut seed_bytes = [0u8; 32];
    seed_bytes[..16].copy_from_slice(&seed.to_le_bytes());
    seed_bytes[16..].copy_from_slice(&seed.to_le_bytes());
    let mut rng = SmallRng::from_seed(seed_bytes);

    for order in [4, 5, 32].iter() {
        let index = Index::new("test_bplus_model", false, *order).unwrap();
        let mut model: BTreeSet<(i64, String)> = BTreeSet::new();

        for _ in 0..10_000 {
            let key = rng.gen_range(0..300);
            let id = format!("id{}", rng.gen_range(0..8));
            if rng.gen_ratio(6, 10) {
                index.set(&Value::Integer(key), &id).unwrap();
                model.insert((key, id));
            } else {
                let res = index.remove(&Value::Integer(key), &id);
                assert_eq!(res, model.remove(&(key, id)));
            }
        }

        let entries: Vec<(i64, String)> = index
            .iter()
            .into_iter()
            .map(|e| match e.key {
                Value::Integer(k) => (k, e.id),
                _ => panic!("unexpected key"),
            })
            .collect();
        let expect: Vec<(i64, String)> = model.iter().cloned().collect();
        assert_eq!(entries, expect, "order {}", order);

        let stats = index.validate().unwrap();
        assert_eq!(stats.n_count, model.len());
    }
}

#[test]
fn test_bplus_bad_order() {
    assert!(Index::new("test_bplus_bad_order", false, 3).is_err());
    assert!(Index::new("test_bplus_bad_order", false, 4).is_ok());
}
