use super::*;
use crate::db::Property;

fn obj(props: Vec<(&str, Value)>) -> Value {
    Value::Object(props.into_iter().map(|(k, v)| Property::new(k, v)).collect())
}

#[test]
fn test_document() {
    let body = obj(vec![("a", Value::Integer(1))]);
    let mut doc = Document::new("id1", body, 1000);
    assert_eq!(doc.created, 1000);
    assert_eq!(doc.updated, 1000);

    doc.replace_body(obj(vec![("a", Value::Integer(2))]), 2000);
    assert_eq!(doc.created, 1000);
    assert_eq!(doc.updated, 2000);
    assert_eq!(doc.body.get("a"), Some(&Value::Integer(2)));

    assert!(doc.footprint().unwrap() > 0);
}

#[test]
fn test_schema() {
    let schema = Schema::new(vec![
        FieldRule::new("name", Kind::String, true),
        FieldRule::new("age", Kind::Integer, false),
    ]);

    let ok = obj(vec![("name", Value::from("x")), ("age", Value::Integer(3))]);
    assert!(schema.validate(&ok).is_ok());

    let ok = obj(vec![("name", Value::from("x"))]);
    assert!(schema.validate(&ok).is_ok());

    let ok = obj(vec![("name", Value::from("x")), ("age", Value::Null)]);
    assert!(schema.validate(&ok).is_ok());

    let missing = obj(vec![("age", Value::Integer(3))]);
    assert_eq!(schema.validate(&missing).unwrap_err().to_kind(), "SchemaViolation");

    let nulled = obj(vec![("name", Value::Null)]);
    assert_eq!(schema.validate(&nulled).unwrap_err().to_kind(), "SchemaViolation");

    let wrong = obj(vec![("name", Value::from("x")), ("age", Value::from("3"))]);
    assert_eq!(schema.validate(&wrong).unwrap_err().to_kind(), "SchemaViolation");
}
