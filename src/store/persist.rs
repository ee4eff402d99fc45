//! Module implement the snapshot persistence contract.
//!
//! The store treats persistence as an optional collaborator: `load`
//! once at startup, `save` a point-in-time [Snapshot] whenever the
//! caller decides. Index state is never persisted, it is rebuilt from
//! the document scan on reload.

use cbordata::Cborize;

use crate::{
    db::{Document, Schema},
    imgr::IndexDef,
    util, Result,
};

/// This value must change only when the shape of Snapshot type changes.
pub const SNAPSHOT_VER: u32 = 0x00050001;

/// Point-in-time image of the whole store, documents and index
/// definitions, one blob per save.
#[derive(Clone, Debug, Eq, PartialEq, Cborize)]
pub struct Snapshot {
    pub collections: Vec<CollectionShot>,
}

impl Snapshot {
    pub const ID: u32 = SNAPSHOT_VER;

    /// Encode into a CBOR byte-string, the on-disk format is the
    /// persistence collaborator's business beyond these bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        util::into_cbor_bytes(self.clone())
    }

    /// Decode from a CBOR byte-string. Return the snapshot and the
    /// bytes consumed.
    pub fn from_bytes(data: &[u8]) -> Result<(Snapshot, usize)> {
        util::from_cbor_bytes(data)
    }
}

/// Single collection within a [Snapshot].
#[derive(Clone, Debug, Eq, PartialEq, Cborize)]
pub struct CollectionShot {
    pub name: String,
    pub schema: Option<Schema>,
    pub indexes: Vec<IndexDef>,
    pub documents: Vec<Document>,
}

impl CollectionShot {
    pub const ID: u32 = SNAPSHOT_VER;
}

/// Persistence collaborator boundary.
pub trait Persist {
    /// Return the last saved snapshot, None on a fresh deployment.
    fn load(&self) -> Result<Option<Snapshot>>;

    /// Persist a snapshot, replacing the previous one.
    fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Do-nothing [Persist] collaborator, for purely in-memory stores.
pub struct NoPersist;

impl Persist for NoPersist {
    fn load(&self) -> Result<Option<Snapshot>> {
        Ok(None)
    }

    fn save(&self, _snapshot: &Snapshot) -> Result<()> {
        Ok(())
    }
}
