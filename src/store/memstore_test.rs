use super::*;
use crate::db::{Property, Value};

fn doc(id: &str, millis: i64) -> Document {
    let body = Value::Object(vec![Property::new("x", Value::Integer(millis))]);
    Document::new(id, body, millis)
}

#[test]
fn test_memstore() {
    let store = MemStore::new();

    assert_eq!(
        store.get("c", "id1").unwrap_err().to_kind(),
        "UnknownCollection"
    );

    store.create_collection("c").unwrap();
    assert!(store.create_collection("c").is_err());

    store.put("c", doc("id2", 2)).unwrap();
    store.put("c", doc("id1", 1)).unwrap();
    assert_eq!(store.get("c", "id1").unwrap().unwrap().created, 1);
    assert_eq!(store.get("c", "id3").unwrap(), None);

    // iteration is stable, in identifier order.
    let ids: Vec<String> = store
        .iterate("c")
        .unwrap()
        .into_iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(ids, vec!["id1".to_string(), "id2".to_string()]);

    assert!(store.remove("c", "id1").unwrap());
    assert!(!store.remove("c", "id1").unwrap());

    store.drop_collection("c").unwrap();
    assert_eq!(
        store.drop_collection("c").unwrap_err().to_kind(),
        "UnknownCollection"
    );
}
