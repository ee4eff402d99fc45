//! Module implement a bounded LRU cache of query results.
//!
//! Entries carry the version stamp of their collection at fill time; a
//! mutation or index change bumps the collection's version, so stale
//! entries fail the stamp check and fall out lazily. The cache is a
//! pure performance device, never observable in results.

use std::{collections::HashMap, fmt, result, sync::Arc};

use crate::{db::{ToJson, Value}, util::Spinlock};

#[derive(Clone)]
pub struct QueryCache {
    limit: usize,
    inner: Arc<Spinlock<Inner>>,
}

struct Inner {
    seq: u64,
    entries: HashMap<Vec<u8>, CEntry>,
    n_hits: usize,
    n_misses: usize,
}

struct CEntry {
    version: u64,
    used: u64,
    results: Vec<Value>,
}

impl QueryCache {
    /// Create a cache bounded to `limit` entries. Zero disables it.
    pub fn new(limit: usize) -> QueryCache {
        let inner = Inner {
            seq: 0,
            entries: HashMap::new(),
            n_hits: 0,
            n_misses: 0,
        };
        QueryCache {
            limit,
            inner: Arc::new(Spinlock::new(inner)),
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.limit > 0
    }

    /// Return the cached results for `key`, provided they were filled
    /// at the supplied collection `version`.
    pub fn get(&self, key: &[u8], version: u64) -> Option<Vec<Value>> {
        if !self.is_enabled() {
            return None;
        }
        let mut inner = self.inner.write();
        inner.seq += 1;
        let seq = inner.seq;

        let stale = match inner.entries.get(key) {
            Some(entry) => entry.version != version,
            None => false,
        };
        if stale {
            inner.entries.remove(key);
        }
        let hit = match inner.entries.get_mut(key) {
            Some(entry) => {
                entry.used = seq;
                Some(entry.results.clone())
            }
            None => None,
        };
        match hit {
            Some(results) => {
                inner.n_hits += 1;
                Some(results)
            }
            None => {
                inner.n_misses += 1;
                None
            }
        }
    }

    /// Fill `key` with results computed at collection `version`,
    /// evicting the least-recently used entry when full.
    pub fn put(&self, key: Vec<u8>, version: u64, results: Vec<Value>) {
        if !self.is_enabled() {
            return;
        }
        let mut inner = self.inner.write();
        inner.seq += 1;
        let used = inner.seq;

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.limit {
            let victim = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.used)
                .map(|(k, _)| k.clone());
            if let Some(victim) = victim {
                inner.entries.remove(&victim);
            }
        }
        inner.entries.insert(
            key,
            CEntry {
                version,
                used,
                results,
            },
        );
    }

    pub fn to_stats(&self) -> CacheStats {
        let inner = self.inner.read();
        CacheStats {
            limit: self.limit,
            n_entries: inner.entries.len(),
            n_hits: inner.n_hits,
            n_misses: inner.n_misses,
        }
    }
}

/// Statistic type, for [QueryCache].
#[derive(Clone, Default)]
pub struct CacheStats {
    pub limit: usize,
    pub n_entries: usize,
    pub n_hits: usize,
    pub n_misses: usize,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        write!(
            f,
            "cache = {{ limit={}, n_entries={}, n_hits={}, n_misses={} }}",
            self.limit, self.n_entries, self.n_hits, self.n_misses,
        )
    }
}

impl ToJson for CacheStats {
    fn to_json(&self) -> String {
        format!(
            concat!(
                r#"{{ "cache": {{ "limit": {}, "n_entries": {}, "#,
                r#""n_hits": {}, "n_misses": {} }} }}"#
            ),
            self.limit, self.n_entries, self.n_hits, self.n_misses,
        )
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod cache_test;
