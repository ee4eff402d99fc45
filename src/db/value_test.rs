use arbitrary::{Arbitrary, Unstructured};
use rand::{prelude::random, rngs::SmallRng, Rng, RngCore, SeedableRng};

use std::cmp::Ordering;

use super::*;

fn obj(props: Vec<(&str, Value)>) -> Value {
    Value::Object(props.into_iter().map(|(k, v)| Property::new(k, v)).collect())
}

#[test]
fn test_value_type_order() {
    let vals = vec![
        Value::Null,
        Value::Bool(false),
        Value::Bool(true),
        Value::Integer(-10),
        Value::Float(0.5),
        Value::Integer(1),
        Value::from("a"),
        Value::from("b"),
        Value::from(vec![Value::Integer(1)]),
        obj(vec![("a", Value::Integer(1))]),
    ];
    for pair in vals.windows(2) {
        assert!(pair[0] < pair[1], "{} < {}", pair[0], pair[1]);
    }
}

#[test]
fn test_value_numeric_order() {
    assert_eq!(Value::Integer(1), Value::Float(1.0));
    assert_eq!(Value::Integer(0), Value::Float(-0.0));
    assert!(Value::Integer(1) < Value::Float(1.5));
    assert!(Value::Float(1.5) < Value::Integer(2));
    assert!(Value::Float(f64::NEG_INFINITY) < Value::Integer(i64::MIN));
    assert!(Value::Integer(i64::MAX) < Value::Float(f64::INFINITY));

    // NaN keeps the order total: after every numeric, equal to itself.
    let nan = Value::Float(f64::NAN);
    assert_eq!(nan.cmp(&nan), Ordering::Equal);
    assert!(Value::Float(f64::INFINITY) < nan);
    assert!(nan < Value::from(""));
}

#[test]
fn test_value_numeric_order_exact() {
    // 2^63 rounds out of the i64 domain, it is strictly greater than
    // every integer instead of colliding with i64::MAX.
    let above = Value::Float(9223372036854775808.0);
    assert!(Value::Integer(i64::MAX) < above);
    assert_ne!(Value::Integer(i64::MAX), above);

    // the largest float below 2^63 is 2^63 - 1024; nearby integers
    // must not collapse through f64 rounding.
    let near = Value::Float(9223372036854774784.0);
    assert_eq!(near, Value::Integer(9223372036854774784));
    assert!(near < Value::Integer(i64::MAX));
    assert!(near < Value::Integer(9223372036854774785));
    assert!(Value::Integer(9223372036854774783) < near);

    assert_eq!(Value::Float(-9223372036854775808.0), Value::Integer(i64::MIN));
    assert!(Value::Float(-9223372036854777856.0) < Value::Integer(i64::MIN));

    assert!(Value::Integer(-3) > Value::Float(-3.5));
    assert!(Value::Integer(-4) < Value::Float(-3.5));
}

#[test]
fn test_value_key_bytes() {
    assert_eq!(
        Value::Integer(7).to_key_bytes(),
        Value::Float(7.0).to_key_bytes()
    );
    assert_eq!(
        Value::Integer(0).to_key_bytes(),
        Value::Float(-0.0).to_key_bytes()
    );
    assert_ne!(
        Value::Integer(7).to_key_bytes(),
        Value::Float(7.5).to_key_bytes()
    );
    assert_ne!(Value::from("7").to_key_bytes(), Value::Integer(7).to_key_bytes());
    assert_ne!(Value::Null.to_key_bytes(), Value::Bool(false).to_key_bytes());

    // all NaN payloads canonicalize to the same bytes.
    let a = Value::Float(f64::NAN).to_key_bytes();
    let b = Value::Float(f64::from_bits(0x7ff8000000000001)).to_key_bytes();
    assert_eq!(a, b);

    // at the i64/f64 boundary the encoding stays in lock-step with
    // equality: 2^63 equals no integer, so its float tag is fine.
    assert_ne!(
        Value::Float(9223372036854775808.0).to_key_bytes(),
        Value::Integer(i64::MAX).to_key_bytes()
    );
    assert_eq!(
        Value::Float(9223372036854774784.0).to_key_bytes(),
        Value::Integer(9223372036854774784).to_key_bytes()
    );
}

#[test]
fn test_value_object_ops() {
    let mut val = obj(vec![("a", Value::Integer(1)), ("b", Value::from("x"))]);
    assert_eq!(val.get("a"), Some(&Value::Integer(1)));
    assert_eq!(val.get("c"), None);

    assert!(val.set("a", Value::Integer(2)));
    assert!(val.set("c", Value::Bool(true)));
    assert_eq!(val.get("a"), Some(&Value::Integer(2)));
    assert_eq!(val.get("c"), Some(&Value::Bool(true)));

    let mut scalar = Value::Integer(1);
    assert!(!scalar.set("a", Value::Null));
    assert_eq!(scalar.get("a"), None);
}

#[test]
fn test_value_footprint() {
    let a = Value::Integer(1).footprint().unwrap();
    let b = Value::from("hello world, of footprints").footprint().unwrap();
    let c = obj(vec![("a", Value::from("hello world, of footprints"))])
        .footprint()
        .unwrap();
    assert!(a > 0);
    assert!(b > a, "{} {}", b, a);
    assert!(c > b, "{} {}", c, b);
}

#[test]
fn test_value_order_total() {
    let seed: u128 = random();
    println!("test_value_order_total seed:{}", seed);
    let mut seed_bytes = [0u8; 32];
    seed_bytes[..16].copy_from_slice(&seed.to_le_bytes());
    seed_bytes[16..].copy_from_slice(&seed.to_le_bytes());
    let mut rng = SmallRng::from_seed(seed_bytes);

    let mut bytes = vec![0_u8; 8 * 1024];
    rng.fill_bytes(&mut bytes);
    let mut u = Unstructured::new(&bytes);

    let mut vals: Vec<Value> = vec![];
    for _ in 0..256 {
        match Value::arbitrary(&mut u) {
            Ok(val) => vals.push(val),
            Err(_) => break,
        }
    }

    vals.sort();
    for pair in vals.windows(2) {
        assert!(pair[0] <= pair[1]);
        // equality must line up with the canonical encoding.
        if pair[0] == pair[1] {
            assert_eq!(pair[0].to_key_bytes(), pair[1].to_key_bytes());
        }
    }

    for _ in 0..100 {
        if vals.is_empty() {
            break;
        }
        let a = &vals[rng.gen_range(0..vals.len())];
        let b = &vals[rng.gen_range(0..vals.len())];
        assert_eq!(a.cmp(b), b.cmp(a).reverse());
    }
}
