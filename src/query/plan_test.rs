use std::ops::Bound;

use super::*;
use crate::{
    db::Property,
    imgr::{IndexKind, IndexOpts},
    Config,
};

fn obj(props: Vec<(&str, Value)>) -> Value {
    Value::Object(props.into_iter().map(|(k, v)| Property::new(k, v)).collect())
}

fn manager() -> IndexManager {
    let imgr = IndexManager::new(Config::default());
    let mut eq = IndexOpts::default();
    eq.set_kind(IndexKind::Equality);
    let mut ord = IndexOpts::default();
    ord.set_kind(IndexKind::Ordered);
    imgr.create("c", "name", eq, vec![].into_iter()).unwrap();
    imgr.create("c", "ts", ord, vec![].into_iter()).unwrap();
    imgr
}

#[test]
fn test_plan_prefers_equality() {
    let imgr = manager();

    // both an equality and a range criterion are available; equality
    // on the indexed field wins.
    let filter = Filter::parse(&obj(vec![
        ("name", Value::from("x")),
        ("ts", obj(vec![("gte", Value::Integer(0))])),
    ]))
    .unwrap();
    match plan(&imgr, "c", &filter) {
        AccessPath::EqLookup { field, value } => {
            assert_eq!(field, "name");
            assert_eq!(value, Value::from("x"));
        }
        path => panic!("unexpected path {:?}", path),
    }

    // declaration order decides among equally capable fields.
    let filter = Filter::parse(&obj(vec![
        ("ts", Value::Integer(1)),
        ("name", Value::from("x")),
    ]))
    .unwrap();
    match plan(&imgr, "c", &filter) {
        AccessPath::EqLookup { field, .. } => assert_eq!(field, "ts"),
        path => panic!("unexpected path {:?}", path),
    }
}

#[test]
fn test_plan_range() {
    let imgr = manager();

    let filter = Filter::parse(&obj(vec![(
        "ts",
        obj(vec![("gte", Value::Integer(10)), ("lt", Value::Integer(20))]),
    )]))
    .unwrap();
    match plan(&imgr, "c", &filter) {
        AccessPath::RangeScan { field, lo, hi } => {
            assert_eq!(field, "ts");
            assert_eq!(lo, Bound::Included(Value::Integer(10)));
            assert_eq!(hi, Bound::Excluded(Value::Integer(20)));
        }
        path => panic!("unexpected path {:?}", path),
    }

    // multiple bounds on the same side tighten.
    let filter = Filter::parse(&obj(vec![(
        "ts",
        obj(vec![("gt", Value::Integer(5)), ("gte", Value::Integer(5))]),
    )]))
    .unwrap();
    match plan(&imgr, "c", &filter) {
        AccessPath::RangeScan { lo, hi, .. } => {
            assert_eq!(lo, Bound::Excluded(Value::Integer(5)));
            assert_eq!(hi, Bound::Unbounded);
        }
        path => panic!("unexpected path {:?}", path),
    }
}

#[test]
fn test_plan_full_scan() {
    let imgr = manager();

    // no indexed field in the filter.
    let filter = Filter::parse(&obj(vec![("v", Value::Integer(1))])).unwrap();
    assert!(matches!(plan(&imgr, "c", &filter), AccessPath::FullScan));

    // range operators on a hash-only index cannot be served.
    let filter =
        Filter::parse(&obj(vec![("name", obj(vec![("gt", Value::from("a"))]))])).unwrap();
    assert!(matches!(plan(&imgr, "c", &filter), AccessPath::FullScan));

    // `in` never drives an index.
    let filter = Filter::parse(&obj(vec![(
        "name",
        obj(vec![("in", Value::from(vec![Value::from("x")]))]),
    )]))
    .unwrap();
    assert!(matches!(plan(&imgr, "c", &filter), AccessPath::FullScan));

    let filter = Filter::parse(&obj(vec![])).unwrap();
    assert!(matches!(plan(&imgr, "c", &filter), AccessPath::FullScan));
}

#[test]
fn test_plan_ordered_serves_equality() {
    let imgr = manager();

    // equality on a field with only an ordered index still avoids the
    // full scan.
    let filter = Filter::parse(&obj(vec![("ts", Value::Integer(7))])).unwrap();
    match plan(&imgr, "c", &filter) {
        AccessPath::EqLookup { field, value } => {
            assert_eq!(field, "ts");
            assert_eq!(value, Value::Integer(7));
        }
        path => panic!("unexpected path {:?}", path),
    }
}
