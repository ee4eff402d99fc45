//! Package implement an embeddable, in-process document store, organized
//! as named collections of [Value] records.
//!
//! The interesting engineering is the dual-index subsystem. Every indexed
//! field carries upto two index structures over the same value domain:
//!
//! * [hash::Index], Robin-Hood open-addressed table for O(1) equality
//!   lookups, optionally fanned out into [hash::ShardedIndex] to reduce
//!   write contention.
//! * [bplus::Index], B+ tree for ordered iteration and range scans.
//!
//! Index bundles are owned and coordinated by [imgr::IndexManager], and
//! driven by the query planner/executor in the [query] module. The
//! [store::Store] facade ties them together with a pluggable
//! [store::Storage] collaborator for the document map and an optional
//! [store::Persist] collaborator for snapshots.
//!
//! Indexes hold only `(key, identifier)` pairs, never document bodies,
//! and are rebuilt from a collection scan when a snapshot is reloaded.
//!
//! **Concurrency**: readers never block readers. Every index latches its
//! state through [util::Spinlock] and serializes writers on a per-index
//! mutex, while the document map takes a per-collection lock held only
//! for the duration of the in-memory update.

use std::{error, fmt, result};

/// Type alias for Result return type, used by this package.
pub type Result<T> = result::Result<T, Error>;

/// Error variants that can be returned by this package's API.
///
/// Each variant carries a prefix, typically identifying the
/// error location, and a human readable message.
pub enum Error {
    Fatal(String, String),
    FailConvert(String, String),
    FailCbor(String, String),
    IOError(String, String),
    InvalidFile(String, String),
    InvalidInput(String, String),
    UnknownCollection(String, String),
    UnknownIndex(String, String),
    DuplicateIndex(String, String),
    DuplicateKey(String, String),
    InvalidQuery(String, String),
    OutOfMemory(String, String),
    SchemaViolation(String, String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        use Error::*;

        match self {
            Fatal(p, msg) => write!(f, "{} Fatal: {}", p, msg),
            FailConvert(p, msg) => write!(f, "{} FailConvert: {}", p, msg),
            FailCbor(p, msg) => write!(f, "{} FailCbor: {}", p, msg),
            IOError(p, msg) => write!(f, "{} IOError: {}", p, msg),
            InvalidFile(p, msg) => write!(f, "{} InvalidFile: {}", p, msg),
            InvalidInput(p, msg) => write!(f, "{} InvalidInput: {}", p, msg),
            UnknownCollection(p, msg) => write!(f, "{} UnknownCollection: {}", p, msg),
            UnknownIndex(p, msg) => write!(f, "{} UnknownIndex: {}", p, msg),
            DuplicateIndex(p, msg) => write!(f, "{} DuplicateIndex: {}", p, msg),
            DuplicateKey(p, msg) => write!(f, "{} DuplicateKey: {}", p, msg),
            InvalidQuery(p, msg) => write!(f, "{} InvalidQuery: {}", p, msg),
            OutOfMemory(p, msg) => write!(f, "{} OutOfMemory: {}", p, msg),
            SchemaViolation(p, msg) => write!(f, "{} SchemaViolation: {}", p, msg),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        write!(f, "{}", self)
    }
}

impl error::Error for Error {}

impl Error {
    /// Return the variant name, without the location prefix and message.
    pub fn to_kind(&self) -> &'static str {
        use Error::*;

        match self {
            Fatal(_, _) => "Fatal",
            FailConvert(_, _) => "FailConvert",
            FailCbor(_, _) => "FailCbor",
            IOError(_, _) => "IOError",
            InvalidFile(_, _) => "InvalidFile",
            InvalidInput(_, _) => "InvalidInput",
            UnknownCollection(_, _) => "UnknownCollection",
            UnknownIndex(_, _) => "UnknownIndex",
            DuplicateIndex(_, _) => "DuplicateIndex",
            DuplicateKey(_, _) => "DuplicateKey",
            InvalidQuery(_, _) => "InvalidQuery",
            OutOfMemory(_, _) => "OutOfMemory",
            SchemaViolation(_, _) => "SchemaViolation",
        }
    }
}

macro_rules! err_at {
    ($v:ident, msg: $($arg:expr),+) => {{
        let prefix = format!("at {}:{}", file!(), line!());
        Err(Error::$v(prefix, format!($($arg),+)))
    }};
    ($v:ident, $e:expr) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("at {}:{}", file!(), line!());
                Err(Error::$v(prefix, format!("{}", err)))
            }
        }
    }};
    ($v:ident, $e:expr, $($arg:expr),+) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("at {}:{}", file!(), line!());
                let msg = format!($($arg),+);
                Err(Error::$v(prefix, format!("{} {}", err, msg)))
            }
        }
    }};
}

mod config;
pub mod util;

pub mod bplus;
pub mod db;
pub mod hash;
pub mod imgr;
pub mod query;
pub mod store;

pub use crate::config::Config;
pub use crate::db::{Document, Schema, Value};
pub use crate::imgr::{IndexKind, IndexOpts};
pub use crate::query::{Options, SortOrder};
pub use crate::store::{MemStore, NoPersist, Persist, Snapshot, Storage, Store};
