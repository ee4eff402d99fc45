//! Module implement the value model for document bodies and index keys.

use arbitrary::{Arbitrary, Unstructured};
use cbordata::Cborize;

use std::{cmp::Ordering, convert::TryFrom, fmt, result};

use crate::{db::Footprint, Error, Result};

/// This value must change only when the shape of Value type changes.
/// High 16-bits identify the type and lower 16-bits identify the version.
pub const VALUE_VER: u32 = 0x00010001;

// i64 domain expressed in f64, [-(2^63), 2^63).
const I64_MIN_F: f64 = -9223372036854775808.0;
const I64_MAX_F: f64 = 9223372036854775808.0;

// canonical quiet-NaN bit pattern, all NaNs encode to this.
const CANONICAL_NAN: u64 = 0x7ff8000000000000;

/// Single field within an object body. Objects preserve the order in
/// which properties were supplied.
#[derive(Clone, Debug, Eq, PartialEq, Cborize)]
pub struct Property {
    pub key: String,
    pub value: Value,
}

impl Property {
    pub const ID: u32 = VALUE_VER;

    pub fn new(key: &str, value: Value) -> Property {
        Property {
            key: key.to_string(),
            value,
        }
    }
}

/// Value type, the unit of document bodies and index keys.
///
/// Values are totally ordered: nulls first, then booleans
/// (false < true), then numerics by numeric value, then strings by byte
/// order of their UTF-8 encoding, then arrays element-wise, then objects
/// property-wise in stored order. Integer/float comparisons follow
/// numeric equality, `Integer(1) == Float(1.0)`, computed exactly and
/// never through a lossy cast, so two values compare equal exactly
/// when their canonical encodings agree. NaN sorts after every other
/// numeric while comparing equal to itself, keeping the order total.
#[derive(Clone, Debug, Cborize)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Object(Vec<Property>),
}

impl Value {
    pub const ID: u32 = VALUE_VER;

    /// Return the [Kind] describing this value's variant.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Integer(_) => Kind::Integer,
            Value::Float(_) => Kind::Float,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::Object(_) => Kind::Object,
        }
    }

    /// Lookup `field` in an object value. Return None for non-object
    /// values and for missing fields.
    pub fn get(&self, field: &str) -> Option<&Value> {
        match self {
            Value::Object(props) => props.iter().find(|p| p.key == field).map(|p| &p.value),
            _ => None,
        }
    }

    /// Set `field` to `value` in an object, replacing in place or
    /// appending. Return false when self is not an object.
    pub fn set(&mut self, field: &str, value: Value) -> bool {
        match self {
            Value::Object(props) => {
                match props.iter_mut().find(|p| p.key == field) {
                    Some(prop) => prop.value = value,
                    None => props.push(Property::new(field, value)),
                }
                true
            }
            _ => false,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Return the canonical byte encoding of this value. Equal values,
    /// including cross-type numeric equals like `Integer(1)` and
    /// `Float(1.0)`, produce identical byte strings; the hash index and
    /// the query cache key off these bytes.
    pub fn to_key_bytes(&self) -> Vec<u8> {
        let mut out = vec![];
        self.encode_key(&mut out);
        out
    }

    fn encode_key(&self, out: &mut Vec<u8>) {
        match self {
            Value::Null => out.push(0x00),
            Value::Bool(val) => {
                out.push(0x01);
                out.push(*val as u8);
            }
            Value::Integer(val) => {
                out.push(0x02);
                out.extend_from_slice(&val.to_be_bytes());
            }
            Value::Float(val) => match integral(*val) {
                // integral floats collapse into the integer encoding.
                Some(n) => {
                    out.push(0x02);
                    out.extend_from_slice(&n.to_be_bytes());
                }
                None => {
                    let bits = if val.is_nan() {
                        CANONICAL_NAN
                    } else {
                        val.to_bits()
                    };
                    out.push(0x03);
                    out.extend_from_slice(&bits.to_be_bytes());
                }
            },
            Value::String(val) => {
                out.push(0x04);
                out.extend_from_slice(&(val.len() as u32).to_be_bytes());
                out.extend_from_slice(val.as_bytes());
            }
            Value::Array(vals) => {
                out.push(0x05);
                out.extend_from_slice(&(vals.len() as u32).to_be_bytes());
                for val in vals.iter() {
                    val.encode_key(out);
                }
            }
            Value::Object(props) => {
                out.push(0x06);
                out.extend_from_slice(&(props.len() as u32).to_be_bytes());
                for prop in props.iter() {
                    out.extend_from_slice(&(prop.key.len() as u32).to_be_bytes());
                    out.extend_from_slice(prop.key.as_bytes());
                    prop.value.encode_key(out);
                }
            }
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Integer(_) | Value::Float(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
}

// return Some(i) when `f` is integral and within the i64 domain.
fn integral(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= I64_MIN_F && f < I64_MAX_F {
        Some(f as i64)
    } else {
        None
    }
}

// total order over f64, NaN compares greater than everything else.
fn cmp_f64(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) if a == b => Ordering::Equal,
        (false, false) if a < b => Ordering::Less,
        (false, false) => Ordering::Greater,
    }
}

// exact comparison of an integer with a float. Casting the integer
// into f64 would round near the domain edges and declare distinct
// values equal, disagreeing with the canonical encoding; instead the
// float's whole part is compared as i64 and its fraction breaks ties.
fn cmp_i64_f64(i: i64, f: f64) -> Ordering {
    if f.is_nan() {
        // NaN sorts after every numeric.
        return Ordering::Less;
    }
    if f < I64_MIN_F {
        return Ordering::Greater;
    }
    if f >= I64_MAX_F {
        return Ordering::Less;
    }
    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal if f > whole => Ordering::Less,
        Ordering::Equal if f < whole => Ordering::Greater,
        ord => ord,
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Value) -> Ordering {
        use Value::{Array, Bool, Float, Integer, Null, Object, String};

        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => cmp_f64(*a, *b),
            (Integer(a), Float(b)) => cmp_i64_f64(*a, *b),
            (Float(a), Integer(b)) => cmp_i64_f64(*b, *a).reverse(),
            (String(a), String(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Array(xs), Array(ys)) => {
                for (x, y) in xs.iter().zip(ys.iter()) {
                    match x.cmp(y) {
                        Ordering::Equal => (),
                        ord => return ord,
                    }
                }
                xs.len().cmp(&ys.len())
            }
            (Object(xs), Object(ys)) => {
                for (x, y) in xs.iter().zip(ys.iter()) {
                    match x.key.cmp(&y.key) {
                        Ordering::Equal => (),
                        ord => return ord,
                    }
                    match x.value.cmp(&y.value) {
                        Ordering::Equal => (),
                        ord => return ord,
                    }
                }
                xs.len().cmp(&ys.len())
            }
            (a, b) => a.type_rank().cmp(&b.type_rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Value) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Footprint for Value {
    fn footprint(&self) -> Result<isize> {
        use std::mem::size_of;

        let mut size = size_of::<Value>();
        size += match self {
            Value::Null | Value::Bool(_) | Value::Integer(_) | Value::Float(_) => 0,
            Value::String(s) => s.capacity(),
            Value::Array(vals) => {
                let mut n = 0;
                for val in vals.iter() {
                    n += usize::try_from(val.footprint()?).unwrap_or(0);
                }
                n
            }
            Value::Object(props) => {
                let mut n = 0;
                for prop in props.iter() {
                    n += prop.key.capacity();
                    n += usize::try_from(prop.value.footprint()?).unwrap_or(0);
                }
                n
            }
        };

        err_at!(FailConvert, isize::try_from(size))
    }
}

impl From<bool> for Value {
    fn from(val: bool) -> Value {
        Value::Bool(val)
    }
}

impl From<i64> for Value {
    fn from(val: i64) -> Value {
        Value::Integer(val)
    }
}

impl From<f64> for Value {
    fn from(val: f64) -> Value {
        Value::Float(val)
    }
}

impl From<&str> for Value {
    fn from(val: &str) -> Value {
        Value::String(val.to_string())
    }
}

impl From<String> for Value {
    fn from(val: String) -> Value {
        Value::String(val)
    }
}

impl From<Vec<Value>> for Value {
    fn from(vals: Vec<Value>) -> Value {
        Value::Array(vals)
    }
}

impl From<Vec<Property>> for Value {
    fn from(props: Vec<Property>) -> Value {
        Value::Object(props)
    }
}

impl fmt::Display for Value {
    // render in JSON shape, useful for logging and debugging.
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(val) => write!(f, "{}", val),
            Value::Integer(val) => write!(f, "{}", val),
            Value::Float(val) => write!(f, "{}", val),
            Value::String(val) => {
                write!(f, "{:?}", val)
            }
            Value::Array(vals) => {
                let items: Vec<String> = vals.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", items.join(","))
            }
            Value::Object(props) => {
                let items: Vec<String> = props
                    .iter()
                    .map(|p| format!("{:?}:{}", p.key, p.value))
                    .collect();
                write!(f, "{{{}}}", items.join(","))
            }
        }
    }
}

impl<'a> Arbitrary<'a> for Value {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Value> {
        arbitrary_value(u, 2)
    }
}

// containers only above depth zero, so generated values stay bounded.
fn arbitrary_value(u: &mut Unstructured, depth: usize) -> arbitrary::Result<Value> {
    let n_variants = if depth == 0 { 5 } else { 7 };
    let val = match u.arbitrary::<u8>()? % n_variants {
        0 => Value::Null,
        1 => Value::Bool(u.arbitrary()?),
        2 => Value::Integer(u.arbitrary()?),
        3 => Value::Float(u.arbitrary()?),
        4 => Value::String(u.arbitrary()?),
        5 => {
            let n = u.arbitrary::<u8>()? % 4;
            let mut vals = vec![];
            for _ in 0..n {
                vals.push(arbitrary_value(u, depth - 1)?);
            }
            Value::Array(vals)
        }
        _ => {
            let n = u.arbitrary::<u8>()? % 4;
            let mut props = vec![];
            for i in 0..n {
                let key = format!("f{}", i);
                props.push(Property::new(&key, arbitrary_value(u, depth - 1)?));
            }
            Value::Object(props)
        }
    };
    Ok(val)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Cborize)]
pub enum Kind {
    Null,
    Bool,
    Integer,
    Float,
    String,
    Array,
    Object,
}

impl Kind {
    pub const ID: u32 = VALUE_VER;
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        let name = match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Integer => "integer",
            Kind::Float => "float",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Object => "object",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
#[path = "value_test.rs"]
mod value_test;
