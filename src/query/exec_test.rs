use super::*;
use crate::{
    db::{Document, Property},
    imgr::{IndexKind, IndexOpts},
    store::{MemStore, Storage},
    Config,
};

fn obj(props: Vec<(&str, Value)>) -> Value {
    Value::Object(props.into_iter().map(|(k, v)| Property::new(k, v)).collect())
}

fn setup(docs: Vec<(&str, Value)>) -> (IndexManager, MemStore) {
    let imgr = IndexManager::new(Config::default());
    let storage = MemStore::new();
    storage.create_collection("c").unwrap();

    let mut opts = IndexOpts::default();
    opts.set_kind(IndexKind::Both);
    imgr.create("c", "k", opts, vec![].into_iter()).unwrap();

    for (id, mut body) in docs.into_iter() {
        body.set(ID_FIELD, Value::from(id));
        storage.put("c", Document::new(id, body.clone(), 0)).unwrap();
        imgr.apply_mutation("c", id, None, Some(&body)).unwrap();
    }
    (imgr, storage)
}

#[test]
fn test_exec_access_paths() {
    let (imgr, storage) = setup(vec![
        ("id1", obj(vec![("k", Value::Integer(10)), ("v", Value::from("a"))])),
        ("id2", obj(vec![("k", Value::Integer(20)), ("v", Value::from("b"))])),
        ("id3", obj(vec![("k", Value::Integer(30)), ("v", Value::from("a"))])),
    ]);

    // equality through the hash index.
    let filter = Filter::parse(&obj(vec![("k", Value::Integer(20))])).unwrap();
    let docs = find(&imgr, &storage, "c", &filter, &Options::default()).unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].get("v"), Some(&Value::from("b")));

    // range through the ordered index.
    let filter = Filter::parse(&obj(vec![(
        "k",
        obj(vec![("gte", Value::Integer(15)), ("lte", Value::Integer(30))]),
    )]))
    .unwrap();
    let docs = find(&imgr, &storage, "c", &filter, &Options::default()).unwrap();
    assert_eq!(docs.len(), 2);

    // unindexed field falls back to the full scan.
    let filter = Filter::parse(&obj(vec![("v", Value::from("a"))])).unwrap();
    let docs = find(&imgr, &storage, "c", &filter, &Options::default()).unwrap();
    assert_eq!(docs.len(), 2);

    let filter = Filter::parse(&obj(vec![])).unwrap();
    assert_eq!(count(&imgr, &storage, "c", &filter, &Options::default()).unwrap(), 3);
}

#[test]
fn test_exec_sort_nulls() {
    let (imgr, storage) = setup(vec![
        ("id1", obj(vec![("s", Value::Integer(2))])),
        ("id2", obj(vec![("s", Value::Null)])),
        ("id3", obj(vec![("s", Value::Integer(1))])),
        ("id4", obj(vec![])),
    ]);
    let filter = Filter::parse(&obj(vec![])).unwrap();

    // ascending: values first, nulls and missing last.
    let mut opts = Options::default();
    opts.set_sort(vec![("s".to_string(), SortOrder::Asc)]);
    let docs = find(&imgr, &storage, "c", &filter, &opts).unwrap();
    let ids: Vec<Option<&Value>> = docs.iter().map(|d| d.get(ID_FIELD)).collect();
    assert_eq!(docs[0].get("s"), Some(&Value::Integer(1)));
    assert_eq!(docs[1].get("s"), Some(&Value::Integer(2)));
    // the null and the missing tie, stable order preserves scan order.
    assert_eq!(ids[2], Some(&Value::from("id2")));
    assert_eq!(ids[3], Some(&Value::from("id4")));

    // descending: nulls and missing first.
    let mut opts = Options::default();
    opts.set_sort(vec![("s".to_string(), SortOrder::Desc)]);
    let docs = find(&imgr, &storage, "c", &filter, &opts).unwrap();
    assert_eq!(docs[0].get(ID_FIELD), Some(&Value::from("id2")));
    assert_eq!(docs[1].get(ID_FIELD), Some(&Value::from("id4")));
    assert_eq!(docs[2].get("s"), Some(&Value::Integer(2)));
    assert_eq!(docs[3].get("s"), Some(&Value::Integer(1)));
}

#[test]
fn test_exec_multi_key_sort() {
    let (imgr, storage) = setup(vec![
        ("id1", obj(vec![("a", Value::Integer(1)), ("b", Value::Integer(2))])),
        ("id2", obj(vec![("a", Value::Integer(1)), ("b", Value::Integer(1))])),
        ("id3", obj(vec![("a", Value::Integer(0)), ("b", Value::Integer(9))])),
    ]);
    let filter = Filter::parse(&obj(vec![])).unwrap();

    let mut opts = Options::default();
    opts.set_sort(vec![
        ("a".to_string(), SortOrder::Asc),
        ("b".to_string(), SortOrder::Desc),
    ]);
    let docs = find(&imgr, &storage, "c", &filter, &opts).unwrap();
    let ids: Vec<Option<&Value>> = docs.iter().map(|d| d.get(ID_FIELD)).collect();
    assert_eq!(
        ids,
        vec![
            Some(&Value::from("id3")),
            Some(&Value::from("id1")),
            Some(&Value::from("id2")),
        ]
    );
}

#[test]
fn test_exec_skip_limit_projection() {
    let docs: Vec<(String, Value)> = (0..10)
        .map(|i| {
            (
                format!("id{}", i),
                obj(vec![("k", Value::Integer(i)), ("v", Value::Integer(i * i))]),
            )
        })
        .collect();
    let (imgr, storage) = setup(docs.iter().map(|(id, b)| (id.as_str(), b.clone())).collect());

    let filter = Filter::parse(&obj(vec![])).unwrap();
    let mut opts = Options::default();
    opts.set_sort(vec![("k".to_string(), SortOrder::Asc)])
        .set_skip(3)
        .set_limit(4)
        .set_projection(vec!["v".to_string()]);

    let docs = find(&imgr, &storage, "c", &filter, &opts).unwrap();
    assert_eq!(docs.len(), 4);
    // skip applies before limit.
    assert_eq!(docs[0].get("v"), Some(&Value::Integer(9)));
    assert_eq!(docs[3].get("v"), Some(&Value::Integer(36)));
    // the projection retains the identifier, drops the rest.
    assert_eq!(docs[0].get(ID_FIELD), Some(&Value::from("id3")));
    assert_eq!(docs[0].get("k"), None);

    // count runs the same pipeline, skip and limit included.
    let mut opts = Options::default();
    opts.set_skip(8).set_limit(5);
    assert_eq!(count(&imgr, &storage, "c", &filter, &opts).unwrap(), 2);
}

#[test]
fn test_exec_unknown_collection() {
    let (imgr, storage) = setup(vec![]);
    let filter = Filter::parse(&obj(vec![])).unwrap();
    let err = find(&imgr, &storage, "nope", &filter, &Options::default()).unwrap_err();
    assert_eq!(err.to_kind(), "UnknownCollection");
}
