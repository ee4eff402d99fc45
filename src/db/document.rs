//! Module implement the document type and optional schema validation.

use cbordata::Cborize;

use std::convert::TryFrom;

use crate::{
    db::{Footprint, Kind, Value},
    Error, Result,
};

/// This value must change only when the shape of Document type changes.
pub const DOC_VER: u32 = 0x00020001;

/// This value must change only when the shape of Schema type changes.
pub const SCHEMA_VER: u32 = 0x00030001;

/// Document type, a single record within a collection.
///
/// The identifier is opaque, unique within its collection and never
/// reused. The body is mutated only by replacing it wholesale, which
/// also bumps `updated`.
#[derive(Clone, Debug, Eq, PartialEq, Cborize)]
pub struct Document {
    pub id: String,
    pub body: Value,
    pub created: i64, // unix-millis
    pub updated: i64, // unix-millis
}

impl Document {
    pub const ID: u32 = DOC_VER;

    pub fn new(id: &str, body: Value, millis: i64) -> Document {
        Document {
            id: id.to_string(),
            body,
            created: millis,
            updated: millis,
        }
    }

    /// Replace the whole body, bumping the updated timestamp.
    pub fn replace_body(&mut self, body: Value, millis: i64) {
        self.body = body;
        self.updated = millis;
    }
}

impl Footprint for Document {
    fn footprint(&self) -> Result<isize> {
        use std::mem::size_of;

        let size = size_of::<Document>() + self.id.capacity();
        let size = err_at!(FailConvert, isize::try_from(size))?;
        Ok(size + self.body.footprint()?)
    }
}

/// Single field constraint within a [Schema].
#[derive(Clone, Debug, Eq, PartialEq, Cborize)]
pub struct FieldRule {
    pub field: String,
    pub kind: Kind,
    pub required: bool,
}

impl FieldRule {
    pub const ID: u32 = SCHEMA_VER;

    pub fn new(field: &str, kind: Kind, required: bool) -> FieldRule {
        FieldRule {
            field: field.to_string(),
            kind,
            required,
        }
    }
}

/// Optional, declarative validation for documents entering a collection.
///
/// A required field must be present with the declared kind. An optional
/// field may be absent or null, but when present with a non-null value
/// it must match the declared kind.
#[derive(Clone, Debug, Eq, PartialEq, Cborize)]
pub struct Schema {
    pub rules: Vec<FieldRule>,
}

impl Schema {
    pub const ID: u32 = SCHEMA_VER;

    pub fn new(rules: Vec<FieldRule>) -> Schema {
        Schema { rules }
    }

    pub fn validate(&self, body: &Value) -> Result<()> {
        for rule in self.rules.iter() {
            match body.get(&rule.field) {
                None if rule.required => {
                    err_at!(SchemaViolation, msg: "field {} missing", rule.field)?
                }
                None => (),
                Some(value) if value.is_null() && rule.required => {
                    err_at!(SchemaViolation, msg: "field {} is null", rule.field)?
                }
                Some(value) if value.is_null() => (),
                Some(value) if value.kind() != rule.kind => err_at!(
                    SchemaViolation,
                    msg: "field {} expect {}, got {}", rule.field, rule.kind, value.kind()
                )?,
                Some(_) => (),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "document_test.rs"]
mod document_test;
