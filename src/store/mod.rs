//! Module implement the public store facade and its collaborator
//! contracts.
//!
//! [Store] ties the pieces together: a [Storage] collaborator holding
//! the document map, the [IndexManager] keeping index bundles in step
//! with mutations, the query pipeline, and an optional [Persist]
//! collaborator for snapshots. Mutations take a per-collection lock
//! for the duration of the in-memory update; reads run concurrently.

mod memstore;
mod persist;

pub use memstore::MemStore;
pub use persist::{CollectionShot, NoPersist, Persist, Snapshot};

use log::{debug, info};

use std::{
    fmt, iter, result,
    sync::{
        atomic::{AtomicIsize, AtomicU64, AtomicUsize, Ordering::SeqCst},
        Arc, Mutex,
    },
};

use crate::{
    db::{Document, Footprint, Property, Schema, ToJson, Value, ID_FIELD},
    imgr::{IndexDef, IndexManager, IndexOpts, IndexStats},
    query::{self, CacheStats, Filter, Options, QueryCache},
    util, Config, Error, Result,
};

/// Storage collaborator boundary, the document map.
///
/// The store is the only writer; implementations provide interior
/// locking for their own maps and stable iteration order for the
/// duration of a scan.
pub trait Storage {
    fn create_collection(&self, name: &str) -> Result<()>;

    fn drop_collection(&self, name: &str) -> Result<()>;

    fn put(&self, name: &str, doc: Document) -> Result<()>;

    /// Return whether the document was present.
    fn remove(&self, name: &str, id: &str) -> Result<bool>;

    fn get(&self, name: &str, id: &str) -> Result<Option<Document>>;

    /// Point-in-time scan of the collection.
    fn iterate(&self, name: &str) -> Result<Vec<Document>>;
}

// book-keeping for one collection: schema, version stamp for the query
// cache, counters and the per-collection write lock.
struct CollMeta {
    name: String,
    schema: Option<Schema>,
    version: AtomicU64,
    n_documents: AtomicUsize,
    footprint: AtomicIsize,
    mu: Mutex<u32>,
}

struct MetaSet {
    collections: Vec<Arc<CollMeta>>,
}

/// Embeddable document store, organized as named collections of
/// [Value] records with dual-index query support.
pub struct Store<S = MemStore>
where
    S: Storage,
{
    config: Config,
    storage: S,
    imgr: IndexManager,
    cache: QueryCache,

    metas: Arc<util::Spinlock<Arc<MetaSet>>>,
    mem_used: Arc<AtomicIsize>,
    version_seed: Arc<AtomicU64>,
}

impl Store<MemStore> {
    /// Create a store backed by the in-memory [MemStore] collaborator.
    pub fn open(config: Config) -> Result<Store<MemStore>> {
        Store::with_storage(config, MemStore::new())
    }
}

impl<S> Store<S>
where
    S: Storage,
{
    /// Create a store over a caller-supplied storage collaborator.
    pub fn with_storage(config: Config, storage: S) -> Result<Store<S>> {
        config.validate()?;
        let store = Store {
            imgr: IndexManager::new(config.clone()),
            cache: QueryCache::new(config.cache_limit),
            config,
            storage,

            metas: Arc::new(util::Spinlock::new(Arc::new(MetaSet {
                collections: vec![],
            }))),
            mem_used: Arc::new(AtomicIsize::new(0)),
            version_seed: Arc::new(AtomicU64::new(0)),
        };
        Ok(store)
    }

    /// Access the index manager, for plan introspection and stats.
    pub fn index_manager(&self) -> &IndexManager {
        &self.imgr
    }

    fn meta(&self, collection: &str) -> Result<Arc<CollMeta>> {
        let metas = Arc::clone(&self.metas.read());
        match metas.collections.iter().find(|m| m.name == collection) {
            Some(meta) => Ok(Arc::clone(meta)),
            None => err_at!(UnknownCollection, msg: "{}", collection),
        }
    }

    fn bump(&self, meta: &CollMeta) {
        let version = self.version_seed.fetch_add(1, SeqCst) + 1;
        meta.version.store(version, SeqCst);
    }

    // memory ceiling is enforced before any index or storage mutation.
    fn check_memory(&self, delta: isize) -> Result<()> {
        let max = match self.config.max_memory {
            Some(max) => max as isize,
            None => return Ok(()),
        };
        let used = self.mem_used.load(SeqCst) + delta;
        if used > max {
            err_at!(OutOfMemory, msg: "{} bytes over ceiling {}", used, max)
        } else {
            Ok(())
        }
    }
}

/// Collection lifecycle.
impl<S> Store<S>
where
    S: Storage,
{
    /// Create a collection, optionally guarded by a [Schema].
    pub fn create_collection(&self, name: &str, schema: Option<Schema>) -> Result<()> {
        let metas = Arc::clone(&self.metas.read());
        if metas.collections.iter().any(|m| m.name == name) {
            err_at!(InvalidInput, msg: "collection {} exists", name)?
        }
        self.storage.create_collection(name)?;

        let meta = CollMeta {
            name: name.to_string(),
            schema,
            version: AtomicU64::new(self.version_seed.fetch_add(1, SeqCst) + 1),
            n_documents: AtomicUsize::new(0),
            footprint: AtomicIsize::new(0),
            mu: Mutex::new(0),
        };
        let mut collections = metas.collections.clone();
        collections.push(Arc::new(meta));
        *self.metas.write() = Arc::new(MetaSet { collections });

        info!(target: "store", "created collection {}", name);
        Ok(())
    }

    /// Drop a collection, its documents and every index bundle on it.
    pub fn drop_collection(&self, name: &str) -> Result<()> {
        let meta = self.meta(name)?;
        let _w = meta.mu.lock();

        self.storage.drop_collection(name)?;
        self.imgr.drop_collection(name);
        self.mem_used.fetch_sub(meta.footprint.load(SeqCst), SeqCst);

        let metas = Arc::clone(&self.metas.read());
        let collections = metas
            .collections
            .iter()
            .filter(|m| m.name != name)
            .cloned()
            .collect();
        *self.metas.write() = Arc::new(MetaSet { collections });

        info!(target: "store", "dropped collection {}", name);
        Ok(())
    }

    /// List collection names, in creation order.
    pub fn list_collections(&self) -> Vec<String> {
        let metas = Arc::clone(&self.metas.read());
        metas.collections.iter().map(|m| m.name.clone()).collect()
    }
}

/// Document CRUD.
impl<S> Store<S>
where
    S: Storage,
{
    /// Insert a fresh document, returning its identifier. The body must
    /// be an object; a caller-supplied `"_id"` string is honored,
    /// otherwise one is generated.
    pub fn insert(&self, collection: &str, mut body: Value) -> Result<String> {
        let meta = self.meta(collection)?;
        let _w = meta.mu.lock();

        if !body.is_object() {
            err_at!(InvalidInput, msg: "document body must be an object")?
        }
        if let Some(schema) = &meta.schema {
            schema.validate(&body)?
        }

        let id = match body.get(ID_FIELD) {
            Some(Value::String(id)) => id.clone(),
            Some(_) => err_at!(InvalidInput, msg: "{} must be a string", ID_FIELD)?,
            None => {
                let id = util::gen_id();
                body.set(ID_FIELD, Value::from(id.clone()));
                id
            }
        };
        if self.storage.get(collection, &id)?.is_some() {
            err_at!(DuplicateKey, msg: "document {} exists in {}", id, collection)?
        }

        let doc = Document::new(&id, body, chrono::Utc::now().timestamp_millis());
        let delta = doc.footprint()?;
        self.check_memory(delta)?;

        self.storage.put(collection, doc.clone())?;
        if let Err(err) = self.imgr.apply_mutation(collection, &id, None, Some(&doc.body)) {
            // a unique violation unwinds the indexes internally; undo
            // the document map too, restoring pre-operation state.
            self.storage.remove(collection, &id)?;
            return Err(err);
        }

        self.mem_used.fetch_add(delta, SeqCst);
        meta.footprint.fetch_add(delta, SeqCst);
        meta.n_documents.fetch_add(1, SeqCst);
        self.bump(&meta);

        debug!(target: "store", "inserted {} into {}", id, collection);
        Ok(id)
    }

    /// Return the body of the identified document.
    pub fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        self.meta(collection)?;
        Ok(self.storage.get(collection, id)?.map(|doc| doc.body))
    }

    /// Run a query and return matching bodies, refer to [Options] for
    /// sort, skip, limit and projection.
    pub fn find(&self, collection: &str, filter: &Value, opts: &Options) -> Result<Vec<Value>> {
        let meta = self.meta(collection)?;
        let parsed = Filter::parse(filter)?;

        if !self.cache.is_enabled() {
            return query::find(&self.imgr, &self.storage, collection, &parsed, opts);
        }

        let key = cache_key(collection, filter, opts);
        let version = meta.version.load(SeqCst);
        if let Some(results) = self.cache.get(&key, version) {
            return Ok(results);
        }
        let results = query::find(&self.imgr, &self.storage, collection, &parsed, opts)?;
        self.cache.put(key, version, results.clone());
        Ok(results)
    }

    /// Return the first match, by the natural order of the access path.
    pub fn find_one(&self, collection: &str, filter: &Value) -> Result<Option<Value>> {
        let mut opts = Options::default();
        opts.set_limit(1);
        let mut results = self.find(collection, filter, &opts)?;
        Ok(results.pop())
    }

    /// Count matching documents, running the query pipeline without
    /// materializing projections.
    pub fn count(&self, collection: &str, filter: &Value) -> Result<usize> {
        self.meta(collection)?;
        let parsed = Filter::parse(filter)?;
        query::count(
            &self.imgr,
            &self.storage,
            collection,
            &parsed,
            &Options::default(),
        )
    }

    /// Merge `patch` into every matching document's body, whole-field
    /// replacement, non-atomic across matches. Return the number of
    /// documents written.
    pub fn update(&self, collection: &str, filter: &Value, patch: &Value) -> Result<usize> {
        let meta = self.meta(collection)?;
        let patch_props = match patch {
            Value::Object(props) => props,
            _ => err_at!(InvalidInput, msg: "patch must be an object")?,
        };
        let parsed = Filter::parse(filter)?;

        let _w = meta.mu.lock();
        let matches = query::find(
            &self.imgr,
            &self.storage,
            collection,
            &parsed,
            &Options::default(),
        )?;

        let mut n = 0;
        for body in matches.iter() {
            match self.update_doc(&meta, collection, body, patch_props) {
                Ok(true) => n += 1,
                Ok(false) => (),
                Err(err) => {
                    // earlier matches are already committed; the cache
                    // must not keep serving pre-update results.
                    self.bump(&meta);
                    return Err(err);
                }
            }
        }
        self.bump(&meta);

        debug!(target: "store", "updated {} documents in {}", n, collection);
        Ok(n)
    }

    // merge the patch into one matched document, true when written.
    fn update_doc(
        &self,
        meta: &CollMeta,
        collection: &str,
        body: &Value,
        patch_props: &[Property],
    ) -> Result<bool> {
        let id = match body.get(ID_FIELD).and_then(|v| v.as_str()) {
            Some(id) => id.to_string(),
            None => return Ok(false),
        };
        let mut doc = match self.storage.get(collection, &id)? {
            Some(doc) => doc,
            None => return Ok(false),
        };

        let old_body = doc.body.clone();
        let mut new_body = old_body.clone();
        for prop in patch_props.iter() {
            // the identifier is immutable.
            if prop.key == ID_FIELD {
                continue;
            }
            new_body.set(&prop.key, prop.value.clone());
        }
        if let Some(schema) = &meta.schema {
            schema.validate(&new_body)?
        }

        let delta = new_body.footprint()? - old_body.footprint()?;
        self.check_memory(delta)?;

        self.imgr
            .apply_mutation(collection, &id, Some(&old_body), Some(&new_body))?;
        doc.replace_body(new_body, chrono::Utc::now().timestamp_millis());
        self.storage.put(collection, doc)?;

        self.mem_used.fetch_add(delta, SeqCst);
        meta.footprint.fetch_add(delta, SeqCst);
        Ok(true)
    }

    /// Delete every matching document, purging its entries from every
    /// index bundle. Return the number of documents deleted.
    pub fn delete(&self, collection: &str, filter: &Value) -> Result<usize> {
        let meta = self.meta(collection)?;
        let parsed = Filter::parse(filter)?;

        let _w = meta.mu.lock();
        let matches = query::find(
            &self.imgr,
            &self.storage,
            collection,
            &parsed,
            &Options::default(),
        )?;

        let mut n = 0;
        for body in matches.iter() {
            match self.delete_doc(&meta, collection, body) {
                Ok(true) => n += 1,
                Ok(false) => (),
                Err(err) => {
                    // earlier matches are already purged; the cache
                    // must not keep serving pre-delete results.
                    self.bump(&meta);
                    return Err(err);
                }
            }
        }
        self.bump(&meta);

        debug!(target: "store", "deleted {} documents from {}", n, collection);
        Ok(n)
    }

    // purge one matched document, true when removed.
    fn delete_doc(&self, meta: &CollMeta, collection: &str, body: &Value) -> Result<bool> {
        let id = match body.get(ID_FIELD).and_then(|v| v.as_str()) {
            Some(id) => id.to_string(),
            None => return Ok(false),
        };
        let doc = match self.storage.get(collection, &id)? {
            Some(doc) => doc,
            None => return Ok(false),
        };

        self.imgr
            .apply_mutation(collection, &id, Some(&doc.body), None)?;
        self.storage.remove(collection, &id)?;

        let delta = doc.footprint()?;
        self.mem_used.fetch_sub(delta, SeqCst);
        meta.footprint.fetch_sub(delta, SeqCst);
        meta.n_documents.fetch_sub(1, SeqCst);
        Ok(true)
    }
}

/// Index lifecycle.
impl<S> Store<S>
where
    S: Storage,
{
    /// Create an index bundle on (collection, field), building it from
    /// the documents already present.
    pub fn create_index(&self, collection: &str, field: &str, opts: IndexOpts) -> Result<()> {
        let meta = self.meta(collection)?;
        let _w = meta.mu.lock();

        let scan = self
            .storage
            .iterate(collection)?
            .into_iter()
            .map(|doc| (doc.id, doc.body));
        self.imgr.create(collection, field, opts, scan)?;
        self.bump(&meta);
        Ok(())
    }

    /// Drop the index bundle on (collection, field).
    pub fn drop_index(&self, collection: &str, field: &str) -> Result<()> {
        let meta = self.meta(collection)?;
        let _w = meta.mu.lock();

        self.imgr.drop(collection, field)?;
        self.bump(&meta);
        Ok(())
    }

    /// List the index bundles on `collection`.
    pub fn list_indexes(&self, collection: &str) -> Result<Vec<IndexDef>> {
        self.meta(collection)?;
        Ok(self.imgr.list(collection))
    }
}

/// Snapshot persistence.
impl<S> Store<S>
where
    S: Storage,
{
    /// Assemble a point-in-time snapshot of every collection.
    pub fn to_snapshot(&self) -> Result<Snapshot> {
        let metas = Arc::clone(&self.metas.read());
        let mut collections = vec![];
        for meta in metas.collections.iter() {
            let _w = meta.mu.lock();
            collections.push(CollectionShot {
                name: meta.name.clone(),
                schema: meta.schema.clone(),
                indexes: self.imgr.list(&meta.name),
                documents: self.storage.iterate(&meta.name)?,
            });
        }
        Ok(Snapshot { collections })
    }

    /// Save a snapshot through the persistence collaborator.
    pub fn save(&self, persist: &dyn Persist) -> Result<()> {
        persist.save(&self.to_snapshot()?)
    }

    /// Load the collaborator's snapshot into this, fresh, store.
    /// Documents are treated as opaque; indexes are rebuilt by
    /// replaying every document as an insert mutation. Return false
    /// when the collaborator has nothing saved.
    pub fn load(&self, persist: &dyn Persist) -> Result<bool> {
        let snapshot = match persist.load()? {
            Some(snapshot) => snapshot,
            None => return Ok(false),
        };

        for shot in snapshot.collections.into_iter() {
            self.create_collection(&shot.name, shot.schema)?;
            for def in shot.indexes.iter() {
                self.imgr
                    .create(&shot.name, &def.field, def.opts.clone(), iter::empty())?;
            }

            let meta = self.meta(&shot.name)?;
            let _w = meta.mu.lock();
            for doc in shot.documents.into_iter() {
                let delta = doc.footprint()?;
                self.check_memory(delta)?;

                self.storage.put(&shot.name, doc.clone())?;
                self.imgr
                    .apply_mutation(&shot.name, &doc.id, None, Some(&doc.body))?;

                self.mem_used.fetch_add(delta, SeqCst);
                meta.footprint.fetch_add(delta, SeqCst);
                meta.n_documents.fetch_add(1, SeqCst);
            }
            self.bump(&meta);
            info!(
                target: "store",
                "loaded collection {} with {} documents",
                meta.name, meta.n_documents.load(SeqCst)
            );
        }
        Ok(true)
    }
}

/// Observability.
impl<S> Store<S>
where
    S: Storage,
{
    pub fn to_stats(&self) -> Result<Stats> {
        let metas = Arc::clone(&self.metas.read());
        let mut collections = vec![];
        for meta in metas.collections.iter() {
            collections.push(CollectionStats {
                name: meta.name.clone(),
                n_documents: meta.n_documents.load(SeqCst),
                footprint: meta.footprint.load(SeqCst),
                indexes: self.imgr.to_stats(&meta.name)?,
            });
        }
        Ok(Stats {
            collections,
            cache: self.cache.to_stats(),
            mem_used: self.mem_used.load(SeqCst),
            max_memory: self.config.max_memory,
        })
    }

    /// Validate every index structure in the store, refer to
    /// [IndexManager::validate].
    pub fn validate(&self) -> Result<()> {
        self.imgr.validate()
    }
}

fn cache_key(collection: &str, filter: &Value, opts: &Options) -> Vec<u8> {
    let mut key = vec![];
    key.extend_from_slice(&(collection.len() as u32).to_be_bytes());
    key.extend_from_slice(collection.as_bytes());
    key.extend_from_slice(&filter.to_key_bytes());
    key.extend_from_slice(&opts.to_key_bytes());
    key
}

/// Statistic type, for one collection of the store.
pub struct CollectionStats {
    pub name: String,
    pub n_documents: usize,
    pub footprint: isize,
    pub indexes: Vec<IndexStats>,
}

impl fmt::Display for CollectionStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        writeln!(
            f,
            "collection = {{ name={}, n_documents={}, footprint={} }}",
            self.name, self.n_documents, self.footprint,
        )?;
        for stats in self.indexes.iter() {
            writeln!(f, "{}", stats)?;
        }
        Ok(())
    }
}

impl ToJson for CollectionStats {
    fn to_json(&self) -> String {
        let indexes: Vec<String> = self.indexes.iter().map(|s| s.to_json()).collect();
        format!(
            concat!(
                r#"{{ "name": {:?}, "n_documents": {}, "footprint": {}, "#,
                r#""indexes": [{}] }}"#
            ),
            self.name,
            self.n_documents,
            self.footprint,
            indexes.join(", ")
        )
    }
}

/// Statistic type, for the whole store.
pub struct Stats {
    pub collections: Vec<CollectionStats>,
    pub cache: CacheStats,
    pub mem_used: isize,
    pub max_memory: Option<usize>,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        writeln!(
            f,
            "store = {{ mem_used={}, max_memory={:?} }}",
            self.mem_used, self.max_memory,
        )?;
        writeln!(f, "store.cache = {}", self.cache)?;
        for stats in self.collections.iter() {
            writeln!(f, "{}", stats)?;
        }
        Ok(())
    }
}

impl ToJson for Stats {
    fn to_json(&self) -> String {
        let collections: Vec<String> = self.collections.iter().map(|s| s.to_json()).collect();
        let max_memory = match self.max_memory {
            Some(max) => max.to_string(),
            None => "null".to_string(),
        };
        format!(
            concat!(
                r#"{{ "store": {{ "mem_used": {}, "max_memory": {}, "#,
                r#""cache": {}, "collections": [{}] }} }}"#
            ),
            self.mem_used,
            max_memory,
            self.cache.to_json(),
            collections.join(", ")
        )
    }
}
