//! Module implement the index manager, owning every (collection, field)
//! index bundle and keeping them consistent with document mutations.

use cbordata::Cborize;
use log::{debug, info};

use std::{
    fmt,
    ops::Bound,
    result,
    sync::{Arc, Mutex},
};

use crate::{
    bplus,
    db::{ToJson, Value},
    hash,
    util::Spinlock,
    Config, Error, Result,
};

/// This value must change only when the shape of IndexDef type changes.
pub const INDEXDEF_VER: u32 = 0x00040001;

/// Which structures a bundle carries over its field's value domain.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Cborize)]
pub enum IndexKind {
    /// Hash table only, equality lookups.
    Equality,
    /// B+ tree only, ordered iteration and range scans.
    Ordered,
    /// Hash table and B+ tree over the same (key, identifier) pairs.
    Both,
}

impl IndexKind {
    pub const ID: u32 = INDEXDEF_VER;
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        match self {
            IndexKind::Equality => write!(f, "equality"),
            IndexKind::Ordered => write!(f, "ordered"),
            IndexKind::Both => write!(f, "both"),
        }
    }
}

/// Capability a caller requires from an index bundle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Capability {
    Equality,
    Range,
}

/// Options for creating an index bundle.
#[derive(Clone, Debug, Eq, PartialEq, Cborize)]
pub struct IndexOpts {
    pub kind: IndexKind,
    pub unique: bool,
    /// Power of two. Values below 2 keep the equality side unsharded.
    pub shard_count: usize,
}

impl IndexOpts {
    pub const ID: u32 = INDEXDEF_VER;
}

impl Default for IndexOpts {
    fn default() -> IndexOpts {
        IndexOpts {
            kind: IndexKind::Both,
            unique: false,
            shard_count: 1,
        }
    }
}

impl IndexOpts {
    pub fn set_kind(&mut self, kind: IndexKind) -> &mut Self {
        self.kind = kind;
        self
    }

    pub fn set_unique(&mut self, unique: bool) -> &mut Self {
        self.unique = unique;
        self
    }

    /// Fan the equality side out across shards, refer to
    /// [ShardedIndex][hash::ShardedIndex]. Count is rounded up to a
    /// power of two.
    pub fn set_shard_count(&mut self, shard_count: usize) -> &mut Self {
        self.shard_count = shard_count;
        self
    }
}

/// Description of an index bundle, for listing and snapshots.
#[derive(Clone, Debug, Eq, PartialEq, Cborize)]
pub struct IndexDef {
    pub field: String,
    pub opts: IndexOpts,
}

impl IndexDef {
    pub const ID: u32 = INDEXDEF_VER;
}

// equality side of a bundle, plain or sharded.
enum EqIndex {
    Plain(hash::Index),
    Sharded(hash::ShardedIndex),
}

impl EqIndex {
    fn set(&self, key: &Value, id: &str) -> Result<bool> {
        match self {
            EqIndex::Plain(index) => index.set(key, id),
            EqIndex::Sharded(index) => index.set(key, id),
        }
    }

    fn remove(&self, key: &Value, id: &str) -> bool {
        match self {
            EqIndex::Plain(index) => index.remove(key, id),
            EqIndex::Sharded(index) => index.remove(key, id),
        }
    }

    fn get(&self, key: &Value) -> Option<Vec<String>> {
        match self {
            EqIndex::Plain(index) => index.get(key),
            EqIndex::Sharded(index) => index.get(key),
        }
    }

    fn footprint(&self) -> Result<isize> {
        match self {
            EqIndex::Plain(index) => index.footprint(),
            EqIndex::Sharded(index) => index.footprint(),
        }
    }
}

/// Index bundle for one (collection, field) pair, carrying the
/// structures requested at creation.
pub struct Bundle {
    collection: String,
    field: String,
    opts: IndexOpts,

    eq: Option<EqIndex>,
    ord: Option<bplus::Index>,
}

impl Bundle {
    fn new(collection: &str, field: &str, opts: &IndexOpts, config: &Config) -> Result<Bundle> {
        let name = format!("{}/{}", collection, field);
        let eq = match opts.kind {
            IndexKind::Equality | IndexKind::Both if opts.shard_count > 1 => {
                let index = hash::ShardedIndex::new(
                    &name,
                    opts.unique,
                    opts.shard_count,
                    config.hash_capacity,
                )?;
                Some(EqIndex::Sharded(index))
            }
            IndexKind::Equality | IndexKind::Both => {
                let index = hash::Index::new(&name, opts.unique, config.hash_capacity)?;
                Some(EqIndex::Plain(index))
            }
            IndexKind::Ordered => None,
        };
        let ord = match opts.kind {
            IndexKind::Ordered | IndexKind::Both => {
                Some(bplus::Index::new(&name, opts.unique, config.btree_order)?)
            }
            IndexKind::Equality => None,
        };

        Ok(Bundle {
            collection: collection.to_string(),
            field: field.to_string(),
            opts: opts.clone(),
            eq,
            ord,
        })
    }

    pub fn to_def(&self) -> IndexDef {
        IndexDef {
            field: self.field.clone(),
            opts: self.opts.clone(),
        }
    }

    // add (value, id) to every structure, undoing the partial half when
    // the second one rejects a unique violation.
    fn add(&self, value: &Value, id: &str) -> Result<()> {
        if let Some(eq) = &self.eq {
            eq.set(value, id)?;
        }
        if let Some(ord) = &self.ord {
            if let Err(err) = ord.set(value, id) {
                if let Some(eq) = &self.eq {
                    eq.remove(value, id);
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn del(&self, value: &Value, id: &str) {
        if let Some(eq) = &self.eq {
            eq.remove(value, id);
        }
        if let Some(ord) = &self.ord {
            ord.remove(value, id);
        }
    }
}

/// Index manager, the single owner of every index bundle in the store.
///
/// The bundle set itself is copy-on-write behind a spinlock, lookups
/// and mutations work off a point-in-time snapshot while create/drop
/// publish a fresh set.
#[derive(Clone)]
pub struct IndexManager {
    config: Config,

    mu: Arc<Mutex<u32>>,
    inner: Arc<Spinlock<Arc<Inner>>>,
}

struct Inner {
    bundles: Vec<Arc<Bundle>>,
}

impl Inner {
    fn find(&self, collection: &str, field: &str) -> Option<&Arc<Bundle>> {
        self.bundles
            .iter()
            .find(|b| b.collection == collection && b.field == field)
    }

    fn on_collection<'a>(&'a self, collection: &'a str) -> impl Iterator<Item = &'a Arc<Bundle>> {
        self.bundles.iter().filter(move |b| b.collection == collection)
    }
}

impl IndexManager {
    pub fn new(config: Config) -> IndexManager {
        IndexManager {
            config,

            mu: Arc::new(Mutex::new(0)),
            inner: Arc::new(Spinlock::new(Arc::new(Inner { bundles: vec![] }))),
        }
    }

    /// Create an index bundle on (collection, field). Existing documents
    /// are supplied by `scan`; a unique conflict while building fails
    /// the creation and leaves no partial bundle behind.
    pub fn create<I>(
        &self,
        collection: &str,
        field: &str,
        opts: IndexOpts,
        scan: I,
    ) -> Result<()>
    where
        I: Iterator<Item = (String, Value)>,
    {
        let _w = self.mu.lock();
        let inner = Arc::clone(&self.inner.read());
        if inner.find(collection, field).is_some() {
            err_at!(
                DuplicateIndex,
                msg: "index on {}/{} already exists", collection, field
            )?
        }

        let bundle = Bundle::new(collection, field, &opts, &self.config)?;
        for (id, body) in scan {
            if let Some(value) = body.get(field) {
                // fresh structures, nothing to roll back on failure.
                bundle.add(value, &id)?;
            }
        }

        let mut bundles = inner.bundles.clone();
        bundles.push(Arc::new(bundle));
        *self.inner.write() = Arc::new(Inner { bundles });

        info!(target: "imgr", "created index on {}/{} as {}", collection, field, opts.kind);
        Ok(())
    }

    /// Drop the bundle on (collection, field).
    pub fn drop(&self, collection: &str, field: &str) -> Result<()> {
        let _w = self.mu.lock();
        let inner = Arc::clone(&self.inner.read());
        if inner.find(collection, field).is_none() {
            err_at!(UnknownIndex, msg: "no index on {}/{}", collection, field)?
        }

        let bundles = inner
            .bundles
            .iter()
            .filter(|b| !(b.collection == collection && b.field == field))
            .cloned()
            .collect();
        *self.inner.write() = Arc::new(Inner { bundles });

        info!(target: "imgr", "dropped index on {}/{}", collection, field);
        Ok(())
    }

    /// Drop every bundle on `collection`.
    pub fn drop_collection(&self, collection: &str) {
        let _w = self.mu.lock();
        let inner = Arc::clone(&self.inner.read());
        let bundles: Vec<Arc<Bundle>> = inner
            .bundles
            .iter()
            .filter(|b| b.collection != collection)
            .cloned()
            .collect();
        if bundles.len() != inner.bundles.len() {
            *self.inner.write() = Arc::new(Inner { bundles });
            debug!(target: "imgr", "dropped indexes of collection {}", collection);
        }
    }

    /// List the bundles on `collection`, in creation order.
    pub fn list(&self, collection: &str) -> Vec<IndexDef> {
        let inner = Arc::clone(&self.inner.read());
        inner.on_collection(collection).map(|b| b.to_def()).collect()
    }

    /// Return whether (collection, field) carries an index with the
    /// required capability.
    pub fn has_index(&self, collection: &str, field: &str, cap: Capability) -> bool {
        let inner = Arc::clone(&self.inner.read());
        match inner.find(collection, field) {
            Some(bundle) => match cap {
                // a B+ tree can also serve equality, at O(log n).
                Capability::Equality => bundle.eq.is_some() || bundle.ord.is_some(),
                Capability::Range => bundle.ord.is_some(),
            },
            None => false,
        }
    }

    /// Apply a document mutation to every bundle on `collection`.
    ///
    /// Insert passes `old` as None, delete passes `new` as None, update
    /// passes both; per bundle only the changed halves are applied. A
    /// failure mid-way, a unique violation, rolls back the bundles
    /// already touched so the indexes return to their pre-operation
    /// state.
    pub fn apply_mutation(
        &self,
        collection: &str,
        id: &str,
        old: Option<&Value>,
        new: Option<&Value>,
    ) -> Result<()> {
        let inner = Arc::clone(&self.inner.read());

        // undo log, (bundle, value, was-added) in application order.
        let mut undo: Vec<(&Arc<Bundle>, &Value, bool)> = vec![];

        for bundle in inner.on_collection(collection) {
            let old_value = old.and_then(|body| body.get(&bundle.field));
            let new_value = new.and_then(|body| body.get(&bundle.field));
            if old_value == new_value {
                continue;
            }

            if let Some(value) = old_value {
                bundle.del(value, id);
                undo.push((bundle, value, false));
            }
            if let Some(value) = new_value {
                match bundle.add(value, id) {
                    Ok(()) => undo.push((bundle, value, true)),
                    Err(err) => {
                        for (bundle, value, added) in undo.into_iter().rev() {
                            if added {
                                bundle.del(value, id);
                            } else {
                                // removal of an indexed value cannot
                                // conflict, ignore the impossible error.
                                bundle.add(value, id).ok();
                            }
                        }
                        return Err(err);
                    }
                }
            }
        }
        Ok(())
    }

    /// Return the identifiers whose `field` equals `value`.
    pub fn lookup_equal(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<String>> {
        let inner = Arc::clone(&self.inner.read());
        let bundle = match inner.find(collection, field) {
            Some(bundle) => bundle,
            None => err_at!(UnknownIndex, msg: "no index on {}/{}", collection, field)?,
        };
        match (&bundle.eq, &bundle.ord) {
            (Some(eq), _) => Ok(eq.get(value).unwrap_or_else(Vec::new)),
            (None, Some(ord)) => Ok(ord.get(value)),
            (None, None) => err_at!(Fatal, msg: "empty bundle on {}/{}", collection, field),
        }
    }

    /// Return the identifiers whose `field` falls within the bounds,
    /// in ascending key order.
    pub fn lookup_range(
        &self,
        collection: &str,
        field: &str,
        lo: Bound<&Value>,
        hi: Bound<&Value>,
    ) -> Result<Vec<String>> {
        let inner = Arc::clone(&self.inner.read());
        let bundle = match inner.find(collection, field) {
            Some(bundle) => bundle,
            None => err_at!(UnknownIndex, msg: "no index on {}/{}", collection, field)?,
        };
        match &bundle.ord {
            Some(ord) => Ok(ord.range(lo, hi).into_iter().map(|e| e.id).collect()),
            None => err_at!(
                UnknownIndex,
                msg: "no ordered index on {}/{}", collection, field
            ),
        }
    }

    pub fn footprint(&self) -> Result<isize> {
        let inner = Arc::clone(&self.inner.read());
        let mut size = 0;
        for bundle in inner.bundles.iter() {
            if let Some(eq) = &bundle.eq {
                size += eq.footprint()?;
            }
            if let Some(ord) = &bundle.ord {
                size += ord.footprint()?;
            }
        }
        Ok(size)
    }

    /// Gather statistics for every bundle on `collection`.
    pub fn to_stats(&self, collection: &str) -> Result<Vec<IndexStats>> {
        let inner = Arc::clone(&self.inner.read());
        let mut out = vec![];
        for bundle in inner.on_collection(collection) {
            let eq = match &bundle.eq {
                Some(EqIndex::Plain(index)) => Some(EqStats::Plain(index.to_stats()?)),
                Some(EqIndex::Sharded(index)) => Some(EqStats::Sharded(index.to_stats()?)),
                None => None,
            };
            let ord = match &bundle.ord {
                Some(index) => Some(index.to_stats()?),
                None => None,
            };
            out.push(IndexStats {
                field: bundle.field.clone(),
                unique: bundle.opts.unique,
                eq,
                ord,
            });
        }
        Ok(out)
    }

    /// Validate every index structure of every bundle, refer to
    /// [hash::Index::validate] and [bplus::Index::validate].
    pub fn validate(&self) -> Result<()> {
        let inner = Arc::clone(&self.inner.read());
        for bundle in inner.bundles.iter() {
            match &bundle.eq {
                Some(EqIndex::Plain(index)) => {
                    index.validate()?;
                }
                Some(EqIndex::Sharded(index)) => {
                    index.validate()?;
                }
                None => (),
            }
            if let Some(ord) = &bundle.ord {
                ord.validate()?;
            }
        }
        Ok(())
    }
}

/// Statistic type, for the equality side of a bundle.
pub enum EqStats {
    Plain(hash::Stats),
    Sharded(hash::ShardStats),
}

/// Statistic type, for a single index bundle.
pub struct IndexStats {
    pub field: String,
    pub unique: bool,
    pub eq: Option<EqStats>,
    pub ord: Option<bplus::Stats>,
}

impl fmt::Display for IndexStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        writeln!(f, "index.field = {} unique = {}", self.field, self.unique)?;
        match &self.eq {
            Some(EqStats::Plain(stats)) => writeln!(f, "{}", stats)?,
            Some(EqStats::Sharded(stats)) => writeln!(f, "{}", stats)?,
            None => (),
        }
        match &self.ord {
            Some(stats) => write!(f, "{}", stats),
            None => Ok(()),
        }
    }
}

impl ToJson for IndexStats {
    fn to_json(&self) -> String {
        let eq = match &self.eq {
            Some(EqStats::Plain(stats)) => stats.to_json(),
            Some(EqStats::Sharded(stats)) => stats.to_json(),
            None => "null".to_string(),
        };
        let ord = match &self.ord {
            Some(stats) => stats.to_json(),
            None => "null".to_string(),
        };
        format!(
            r#"{{ "field": {:?}, "unique": {}, "eq": {}, "ord": {} }}"#,
            self.field, self.unique, eq, ord
        )
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
