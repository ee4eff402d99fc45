use std::ops::Bound;

use super::*;
use crate::db::Property;

fn obj(props: Vec<(&str, Value)>) -> Value {
    Value::Object(props.into_iter().map(|(k, v)| Property::new(k, v)).collect())
}

fn opts(kind: IndexKind, unique: bool) -> IndexOpts {
    let mut opts = IndexOpts::default();
    opts.set_kind(kind).set_unique(unique);
    opts
}

#[test]
fn test_imgr_create_with_scan() {
    let imgr = IndexManager::new(Config::default());

    let docs = vec![
        ("id1".to_string(), obj(vec![("k", Value::Integer(10))])),
        ("id2".to_string(), obj(vec![("k", Value::Integer(20))])),
        ("id3".to_string(), obj(vec![("x", Value::Integer(30))])),
    ];
    imgr.create("c", "k", opts(IndexKind::Both, false), docs.into_iter())
        .unwrap();

    assert!(imgr.has_index("c", "k", Capability::Equality));
    assert!(imgr.has_index("c", "k", Capability::Range));
    assert!(!imgr.has_index("c", "x", Capability::Equality));

    let ids = imgr.lookup_equal("c", "k", &Value::Integer(10)).unwrap();
    assert_eq!(ids, vec!["id1".to_string()]);
    // id3 has no `k`, it must not be indexed.
    let ids = imgr
        .lookup_range("c", "k", Bound::Unbounded, Bound::Unbounded)
        .unwrap();
    assert_eq!(ids, vec!["id1".to_string(), "id2".to_string()]);

    let err = imgr
        .create("c", "k", opts(IndexKind::Both, false), vec![].into_iter())
        .unwrap_err();
    assert_eq!(err.to_kind(), "DuplicateIndex");
}

#[test]
fn test_imgr_unique_build_fails_clean() {
    let imgr = IndexManager::new(Config::default());

    let docs = vec![
        ("id1".to_string(), obj(vec![("u", Value::from("a"))])),
        ("id2".to_string(), obj(vec![("u", Value::from("a"))])),
    ];
    let err = imgr
        .create("c", "u", opts(IndexKind::Both, true), docs.into_iter())
        .unwrap_err();
    assert_eq!(err.to_kind(), "DuplicateKey");

    // no partial bundle left behind.
    assert!(!imgr.has_index("c", "u", Capability::Equality));
    assert!(imgr.list("c").is_empty());
}

#[test]
fn test_imgr_apply_mutation() {
    let imgr = IndexManager::new(Config::default());
    imgr.create("c", "name", opts(IndexKind::Equality, false), vec![].into_iter())
        .unwrap();
    imgr.create("c", "ts", opts(IndexKind::Ordered, false), vec![].into_iter())
        .unwrap();

    let body1 = obj(vec![("name", Value::from("x")), ("ts", Value::Integer(10))]);
    imgr.apply_mutation("c", "X", None, Some(&body1)).unwrap();

    let ids = imgr.lookup_equal("c", "name", &Value::from("x")).unwrap();
    assert_eq!(ids, vec!["X".to_string()]);

    // update ts 10 -> 20; name unchanged, its bundle must not churn.
    let body2 = obj(vec![("name", Value::from("x")), ("ts", Value::Integer(20))]);
    imgr.apply_mutation("c", "X", Some(&body1), Some(&body2)).unwrap();

    let lo = Value::Integer(15);
    let hi = Value::Integer(25);
    let ids = imgr
        .lookup_range("c", "ts", Bound::Included(&lo), Bound::Included(&hi))
        .unwrap();
    assert_eq!(ids, vec!["X".to_string()]);
    let lo = Value::Integer(5);
    let hi = Value::Integer(15);
    let ids = imgr
        .lookup_range("c", "ts", Bound::Included(&lo), Bound::Included(&hi))
        .unwrap();
    assert!(ids.is_empty());

    // delete purges every bundle.
    imgr.apply_mutation("c", "X", Some(&body2), None).unwrap();
    assert!(imgr
        .lookup_equal("c", "name", &Value::from("x"))
        .unwrap()
        .is_empty());
    assert!(imgr
        .lookup_range("c", "ts", Bound::Unbounded, Bound::Unbounded)
        .unwrap()
        .is_empty());

    imgr.validate().unwrap();
}

#[test]
fn test_imgr_mutation_rollback() {
    let imgr = IndexManager::new(Config::default());
    imgr.create("c", "a", opts(IndexKind::Both, false), vec![].into_iter())
        .unwrap();
    imgr.create("c", "u", opts(IndexKind::Both, true), vec![].into_iter())
        .unwrap();

    let taken = obj(vec![("u", Value::from("dup"))]);
    imgr.apply_mutation("c", "OWNER", None, Some(&taken)).unwrap();

    // the `a` bundle applies first, then `u` hits the unique conflict;
    // the whole mutation must unwind.
    let body = obj(vec![("a", Value::Integer(1)), ("u", Value::from("dup"))]);
    let err = imgr.apply_mutation("c", "X", None, Some(&body)).unwrap_err();
    assert_eq!(err.to_kind(), "DuplicateKey");

    assert!(imgr
        .lookup_equal("c", "a", &Value::Integer(1))
        .unwrap()
        .is_empty());
    let ids = imgr.lookup_equal("c", "u", &Value::from("dup")).unwrap();
    assert_eq!(ids, vec!["OWNER".to_string()]);

    // update rollback restores the old value.
    let old = obj(vec![("u", Value::from("mine")), ("a", Value::Integer(7))]);
    imgr.apply_mutation("c", "Y", None, Some(&old)).unwrap();
    let new = obj(vec![("u", Value::from("dup")), ("a", Value::Integer(8))]);
    let err = imgr
        .apply_mutation("c", "Y", Some(&old), Some(&new))
        .unwrap_err();
    assert_eq!(err.to_kind(), "DuplicateKey");

    let ids = imgr.lookup_equal("c", "u", &Value::from("mine")).unwrap();
    assert_eq!(ids, vec!["Y".to_string()]);
    let ids = imgr.lookup_equal("c", "a", &Value::Integer(7)).unwrap();
    assert_eq!(ids, vec!["Y".to_string()]);
    assert!(imgr
        .lookup_equal("c", "a", &Value::Integer(8))
        .unwrap()
        .is_empty());

    imgr.validate().unwrap();
}

#[test]
fn test_imgr_sharded_bundle() {
    let imgr = IndexManager::new(Config::default());

    let mut o = IndexOpts::default();
    o.set_kind(IndexKind::Equality).set_shard_count(4);
    imgr.create("c", "k", o, vec![].into_iter()).unwrap();

    for i in 0..100 {
        let body = obj(vec![("k", Value::Integer(i))]);
        imgr.apply_mutation("c", &format!("id{}", i), None, Some(&body))
            .unwrap();
    }
    let ids = imgr.lookup_equal("c", "k", &Value::Integer(42)).unwrap();
    assert_eq!(ids, vec!["id42".to_string()]);

    // equality-only bundle cannot serve ranges.
    assert!(!imgr.has_index("c", "k", Capability::Range));
    assert!(imgr
        .lookup_range("c", "k", Bound::Unbounded, Bound::Unbounded)
        .is_err());

    let stats = imgr.to_stats("c").unwrap();
    assert_eq!(stats.len(), 1);
    match &stats[0].eq {
        Some(EqStats::Sharded(s)) => assert_eq!(s.shard_count, 4),
        _ => panic!("expected sharded stats"),
    }
}

#[test]
fn test_imgr_drop() {
    let imgr = IndexManager::new(Config::default());
    imgr.create("c", "a", opts(IndexKind::Both, false), vec![].into_iter())
        .unwrap();
    imgr.create("c", "b", opts(IndexKind::Both, false), vec![].into_iter())
        .unwrap();
    imgr.create("d", "a", opts(IndexKind::Both, false), vec![].into_iter())
        .unwrap();

    assert_eq!(imgr.list("c").len(), 2);

    imgr.drop("c", "a").unwrap();
    assert_eq!(imgr.list("c").len(), 1);
    assert_eq!(imgr.drop("c", "a").unwrap_err().to_kind(), "UnknownIndex");

    imgr.drop_collection("c");
    assert!(imgr.list("c").is_empty());
    assert_eq!(imgr.list("d").len(), 1);
}
