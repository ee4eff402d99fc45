//! Traits and types shared by the rest of the ddms-modules.

mod document;
mod value;

pub use document::{Document, FieldRule, Schema};
pub use value::{Kind, Property, Value};

use crate::Result;

/// Field under which a document's identifier is mirrored into its body,
/// so that projections can always retain it.
pub const ID_FIELD: &str = "_id";

/// Trait to be implemented by document types, key-types and value-types.
///
/// This trait is required to compute the memory foot-print of indexed
/// data, for book-keeping against the configured memory ceiling.
///
/// **Note: This can be an approximate measure.**
pub trait Footprint {
    /// Return the approximate size of the underlying type, when
    /// stored in memory.
    ///
    /// NOTE: `isize` is used instead of `usize` because of delta computation.
    fn footprint(&self) -> Result<isize>;
}

/// Trait to render statistic types in JSON format, for easier
/// integration with scripting environments.
pub trait ToJson {
    fn to_json(&self) -> String;
}
