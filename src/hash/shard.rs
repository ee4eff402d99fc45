//! Module implement a sharded fan-out over [Index] tables.

use std::sync::{
    atomic::{AtomicUsize, Ordering::Relaxed},
    Arc,
};

use crate::{
    db::Value,
    hash::{Index, ShardStats, Stats},
    util, Result,
};

/// Default number of shards.
pub const DEFAULT_SHARDS: usize = 16;

/// Equality index partitioned across independent [Index] shards.
///
/// The shard is selected by a hash word decorrelated from the one used
/// for bucket placement inside a shard, so hot probe chains do not pin
/// hot shards. Shards share nothing; a write latches one shard only.
#[derive(Clone)]
pub struct ShardedIndex {
    name: String,
    inner: Arc<Shards>,
}

struct Shards {
    indexes: Vec<Index>,
    n_ops: Vec<AtomicUsize>,
}

impl ShardedIndex {
    /// Create a new sharded index. `shard_count` is rounded up to a
    /// power of two; each shard starts with `capacity` buckets.
    pub fn new(name: &str, unique: bool, shard_count: usize, capacity: usize) -> Result<ShardedIndex> {
        let shard_count = util::to_pow2(shard_count, 2)?;

        let mut indexes = vec![];
        let mut n_ops = vec![];
        for shard in 0..shard_count {
            let shard_name = format!("{}-shard-{:03}", name, shard);
            indexes.push(Index::new(&shard_name, unique, capacity)?);
            n_ops.push(AtomicUsize::new(0));
        }

        let index = ShardedIndex {
            name: name.to_string(),
            inner: Arc::new(Shards { indexes, n_ops }),
        };
        Ok(index)
    }

    /// Return name of this index instance.
    #[inline]
    pub fn to_name(&self) -> String {
        self.name.clone()
    }

    /// Return the number of shards.
    #[inline]
    pub fn to_shard_count(&self) -> usize {
        self.inner.indexes.len()
    }

    /// Return total number of distinct keys, across shards.
    pub fn len(&self) -> usize {
        self.inner.indexes.iter().map(|ix| ix.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn shard_for(&self, key: &Value) -> usize {
        let (_, shard_hash) = util::hash_pair(&key.to_key_bytes());
        (shard_hash as usize) & (self.inner.indexes.len() - 1)
    }

    /// Forward to [Index::set] on the owning shard.
    pub fn set(&self, key: &Value, id: &str) -> Result<bool> {
        let shard = self.shard_for(key);
        self.inner.n_ops[shard].fetch_add(1, Relaxed);
        self.inner.indexes[shard].set(key, id)
    }

    /// Forward to [Index::remove] on the owning shard.
    pub fn remove(&self, key: &Value, id: &str) -> bool {
        let shard = self.shard_for(key);
        self.inner.n_ops[shard].fetch_add(1, Relaxed);
        self.inner.indexes[shard].remove(key, id)
    }

    /// Forward to [Index::get] on the owning shard.
    pub fn get(&self, key: &Value) -> Option<Vec<String>> {
        let shard = self.shard_for(key);
        self.inner.n_ops[shard].fetch_add(1, Relaxed);
        self.inner.indexes[shard].get(key)
    }

    /// Concatenate per-shard entries. No ordering guarantee across
    /// shards.
    pub fn to_entries(&self) -> Vec<(Value, Vec<String>)> {
        let mut entries = vec![];
        for index in self.inner.indexes.iter() {
            entries.extend(index.to_entries());
        }
        entries
    }

    pub fn footprint(&self) -> Result<isize> {
        let mut size = 0;
        for index in self.inner.indexes.iter() {
            size += index.footprint()?;
        }
        Ok(size)
    }

    /// Return the balance score, max-deviation from mean over mean, of
    /// per-shard request counts. Zero is perfectly balanced.
    pub fn to_balance(&self) -> f64 {
        let counts: Vec<f64> = self
            .inner
            .n_ops
            .iter()
            .map(|n| n.load(Relaxed) as f64)
            .collect();
        let mean = counts.iter().sum::<f64>() / (counts.len() as f64);
        if mean == 0.0 {
            return 0.0;
        }
        let max_dev = counts
            .iter()
            .map(|c| (c - mean).abs())
            .fold(0.0, f64::max);
        max_dev / mean
    }

    pub fn to_stats(&self) -> Result<ShardStats> {
        let mut shards: Vec<Stats> = vec![];
        for index in self.inner.indexes.iter() {
            shards.push(index.to_stats()?);
        }
        Ok(ShardStats {
            name: self.name.clone(),
            shard_count: self.inner.indexes.len(),
            n_ops: self.inner.n_ops.iter().map(|n| n.load(Relaxed)).collect(),
            balance: self.to_balance(),
            shards,
        })
    }

    /// Validate every shard, refer to [Index::validate].
    pub fn validate(&self) -> Result<ShardStats> {
        for index in self.inner.indexes.iter() {
            index.validate()?;
        }
        self.to_stats()
    }
}

#[cfg(test)]
#[path = "shard_test.rs"]
mod shard_test;
