//! Module implement the in-memory storage collaborator.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use crate::{db::Document, store::Storage, util::Spinlock, Error, Result};

/// In-memory [Storage] collaborator, the default document map.
///
/// Each collection is a b-tree map keyed by identifier, so full scans
/// iterate in identifier order, stable for the duration of a scan.
#[derive(Clone)]
pub struct MemStore {
    inner: Arc<Spinlock<Inner>>,
}

struct Inner {
    collections: HashMap<String, BTreeMap<String, Document>>,
}

impl Default for MemStore {
    fn default() -> MemStore {
        MemStore::new()
    }
}

impl MemStore {
    pub fn new() -> MemStore {
        let inner = Inner {
            collections: HashMap::new(),
        };
        MemStore {
            inner: Arc::new(Spinlock::new(inner)),
        }
    }
}

impl Storage for MemStore {
    fn create_collection(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.collections.contains_key(name) {
            err_at!(InvalidInput, msg: "collection {} exists", name)?
        }
        inner.collections.insert(name.to_string(), BTreeMap::new());
        Ok(())
    }

    fn drop_collection(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.write();
        match inner.collections.remove(name) {
            Some(_) => Ok(()),
            None => err_at!(UnknownCollection, msg: "{}", name),
        }
    }

    fn put(&self, name: &str, doc: Document) -> Result<()> {
        let mut inner = self.inner.write();
        match inner.collections.get_mut(name) {
            Some(docs) => {
                docs.insert(doc.id.clone(), doc);
                Ok(())
            }
            None => err_at!(UnknownCollection, msg: "{}", name),
        }
    }

    fn remove(&self, name: &str, id: &str) -> Result<bool> {
        let mut inner = self.inner.write();
        match inner.collections.get_mut(name) {
            Some(docs) => Ok(docs.remove(id).is_some()),
            None => err_at!(UnknownCollection, msg: "{}", name),
        }
    }

    fn get(&self, name: &str, id: &str) -> Result<Option<Document>> {
        let inner = self.inner.read();
        match inner.collections.get(name) {
            Some(docs) => Ok(docs.get(id).cloned()),
            None => err_at!(UnknownCollection, msg: "{}", name),
        }
    }

    fn iterate(&self, name: &str) -> Result<Vec<Document>> {
        let inner = self.inner.read();
        match inner.collections.get(name) {
            Some(docs) => Ok(docs.values().cloned().collect()),
            None => err_at!(UnknownCollection, msg: "{}", name),
        }
    }
}

#[cfg(test)]
#[path = "memstore_test.rs"]
mod memstore_test;
