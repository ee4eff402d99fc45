//! Module implement a Robin-Hood open-addressed hash table, mapping an
//! indexed field value to the document identifiers holding that value.

use log::debug;

use std::{
    convert::TryFrom,
    mem,
    sync::{Arc, Mutex},
};

use crate::{
    db::{Footprint, Value},
    hash::{Probe, Stats},
    util::{self, Spinlock},
    Error, Result,
};

/// Default number of buckets in a fresh table.
pub const DEFAULT_CAPACITY: usize = 16;

/// Table is rehashed into double the capacity when occupancy would
/// cross this fraction.
pub const LOAD_FACTOR: f64 = 0.75;

// occupied bucket, carrying every identifier indexed under `key`.
#[derive(Clone)]
struct Slot {
    key: Value,
    hash: u32,
    psl: u32,
    ids: Vec<String>,
}

impl Footprint for Slot {
    fn footprint(&self) -> Result<isize> {
        use std::mem::size_of;

        let mut size = self.ids.capacity() * size_of::<String>();
        for id in self.ids.iter() {
            size += id.capacity();
        }
        let size = err_at!(FailConvert, isize::try_from(size))?;
        Ok(size + self.key.footprint()?)
    }
}

/// Equality index for a single (collection, field) pair.
///
/// Type allow concurrent read access; write operations are serialized
/// on a mutex and latch the table exclusively only for the in-memory
/// update. Equal field values map to a single bucket carrying the full
/// identifier list, so non-unique indexes cost one probe chain per key.
#[derive(Clone)]
pub struct Index {
    name: String,
    unique: bool,

    mu: Arc<Mutex<u32>>,
    inner: Arc<Spinlock<Inner>>,
}

struct Inner {
    buckets: Vec<Option<Slot>>,
    n_keys: usize,
    n_ids: usize,
    n_rehashes: usize,
}

impl Index {
    /// Create a new index. `capacity` is rounded up to a power of two.
    pub fn new(name: &str, unique: bool, capacity: usize) -> Result<Index> {
        let capacity = util::to_pow2(capacity, 2)?;
        let inner = Inner {
            buckets: vec![None; capacity],
            n_keys: 0,
            n_ids: 0,
            n_rehashes: 0,
        };

        let index = Index {
            name: name.to_string(),
            unique,

            mu: Arc::new(Mutex::new(0)),
            inner: Arc::new(Spinlock::new(inner)),
        };
        Ok(index)
    }

    /// Return name of this index instance.
    #[inline]
    pub fn to_name(&self) -> String {
        self.name.clone()
    }

    /// Return whether this index enforces unique keys.
    #[inline]
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Return number of distinct keys in this index.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.read().n_keys
    }

    /// Return whether index is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return total number of (key, identifier) entries.
    #[inline]
    pub fn to_n_ids(&self) -> usize {
        self.inner.read().n_ids
    }
}

impl Index {
    /// Add `id` under `key`. Return true when a fresh (key, id) entry
    /// was created, false when the pair was already present.
    ///
    /// For unique indexes a second, distinct identifier under the same
    /// key fails with `DuplicateKey`.
    pub fn set(&self, key: &Value, id: &str) -> Result<bool> {
        let _w = self.mu.lock();
        let mut inner = self.inner.write();
        inner.set(key, id, self.unique, &self.name)
    }

    /// Remove `id` from under `key`. Return true when the pair was
    /// present. The last identifier of a key frees the bucket with a
    /// backward-shift, keeping the table tombstone-free.
    pub fn remove(&self, key: &Value, id: &str) -> bool {
        let _w = self.mu.lock();
        let mut inner = self.inner.write();
        inner.remove(key, id)
    }

    /// Return the identifiers indexed under `key`.
    pub fn get(&self, key: &Value) -> Option<Vec<String>> {
        let inner = self.inner.read();
        let bucket = inner.lookup(key)?;
        match &inner.buckets[bucket] {
            Some(slot) => Some(slot.ids.clone()),
            None => None,
        }
    }

    /// Return a point-in-time copy of all (key, identifiers) entries.
    /// Order is unspecified.
    pub fn to_entries(&self) -> Vec<(Value, Vec<String>)> {
        let inner = self.inner.read();
        inner
            .buckets
            .iter()
            .filter_map(|b| b.as_ref().map(|s| (s.key.clone(), s.ids.clone())))
            .collect()
    }

    pub fn footprint(&self) -> Result<isize> {
        use std::mem::size_of;

        let inner = self.inner.read();
        let mut size = inner.buckets.capacity() * size_of::<Option<Slot>>();
        for slot in inner.buckets.iter().flatten() {
            size += usize::try_from(slot.footprint()?).unwrap_or(0);
        }
        err_at!(FailConvert, isize::try_from(size))
    }

    pub fn to_stats(&self) -> Result<Stats> {
        let inner = self.inner.read();
        let mut probes = Probe::default();
        for slot in inner.buckets.iter().flatten() {
            probes.sample(slot.psl as usize);
        }
        Ok(Stats {
            name: self.name.clone(),
            capacity: inner.buckets.len(),
            n_keys: inner.n_keys,
            n_ids: inner.n_ids,
            load_factor: (inner.n_keys as f64) / (inner.buckets.len() as f64),
            n_rehashes: inner.n_rehashes,
            probes,
            spin_stats: self.inner.to_stats()?,
        })
    }

    /// Validate the Robin-Hood invariants across every occupied bucket
    /// and return the table's statistics.
    ///
    /// * stored PSL equals the distance from the ideal bucket;
    /// * no empty bucket lies between an entry and its ideal bucket;
    /// * PSLs of consecutive occupied buckets never jump by more
    ///   than one, so lookups can stop early.
    pub fn validate(&self) -> Result<Stats> {
        let inner = self.inner.read();
        let mask = inner.buckets.len() - 1;

        let (mut n_keys, mut n_ids) = (0, 0);
        for (b, slot) in inner.buckets.iter().enumerate() {
            let slot = match slot {
                Some(slot) => slot,
                None => continue,
            };
            n_keys += 1;
            n_ids += slot.ids.len();

            if slot.ids.is_empty() {
                err_at!(Fatal, msg: "{} empty id-list at bucket {}", self.name, b)?;
            }

            let ideal = (slot.hash as usize) & mask;
            let psl = (b + inner.buckets.len() - ideal) & mask;
            if psl != slot.psl as usize {
                err_at!(
                    Fatal,
                    msg: "{} psl mismatch at bucket {}, {} != {}", self.name, b, psl, slot.psl
                )?;
            }
            if slot.psl > 0 {
                let prev = (b + inner.buckets.len() - 1) & mask;
                match &inner.buckets[prev] {
                    Some(prev_slot) if slot.psl > prev_slot.psl + 1 => err_at!(
                        Fatal,
                        msg: "{} psl jump at bucket {}, {} after {}",
                        self.name, b, slot.psl, prev_slot.psl
                    )?,
                    Some(_) => (),
                    None => {
                        err_at!(Fatal, msg: "{} hole before bucket {}", self.name, b)?
                    }
                }
            }
        }

        if n_keys != inner.n_keys {
            err_at!(Fatal, msg: "{} n_keys {} != {}", self.name, n_keys, inner.n_keys)?;
        }
        if n_ids != inner.n_ids {
            err_at!(Fatal, msg: "{} n_ids {} != {}", self.name, n_ids, inner.n_ids)?;
        }

        mem::drop(inner);
        self.to_stats()
    }
}

impl Inner {
    fn set(&mut self, key: &Value, id: &str, unique: bool, name: &str) -> Result<bool> {
        match self.lookup(key) {
            Some(bucket) => {
                let slot = match &mut self.buckets[bucket] {
                    Some(slot) => slot,
                    None => panic!("looked-up bucket is empty! call the programmer"),
                };
                if slot.ids.iter().any(|x| x == id) {
                    Ok(false)
                } else if unique {
                    err_at!(DuplicateKey, msg: "{} key {} already indexed", name, key)
                } else {
                    slot.ids.push(id.to_string());
                    self.n_ids += 1;
                    Ok(true)
                }
            }
            None => {
                if self.would_overload() {
                    self.rehash(name);
                }
                let (hash, _) = util::hash_pair(&key.to_key_bytes());
                self.place(Slot {
                    key: key.clone(),
                    hash,
                    psl: 0,
                    ids: vec![id.to_string()],
                });
                self.n_keys += 1;
                self.n_ids += 1;
                Ok(true)
            }
        }
    }

    fn remove(&mut self, key: &Value, id: &str) -> bool {
        let bucket = match self.lookup(key) {
            Some(bucket) => bucket,
            None => return false,
        };

        let emptied = match &mut self.buckets[bucket] {
            Some(slot) => match slot.ids.iter().position(|x| x == id) {
                Some(pos) => {
                    slot.ids.remove(pos);
                    self.n_ids -= 1;
                    slot.ids.is_empty()
                }
                None => return false,
            },
            None => return false,
        };

        if emptied {
            self.backward_shift(bucket);
            self.n_keys -= 1;
        }
        true
    }

    // free `bucket` and slide the following probe chain back by one,
    // decrementing PSLs, until an empty bucket or a PSL-0 entry.
    fn backward_shift(&mut self, bucket: usize) {
        let mask = self.buckets.len() - 1;
        self.buckets[bucket] = None;

        let mut hole = bucket;
        loop {
            let next = (hole + 1) & mask;
            match &self.buckets[next] {
                Some(slot) if slot.psl > 0 => (),
                _ => break,
            }
            if let Some(mut slot) = self.buckets[next].take() {
                slot.psl -= 1;
                self.buckets[hole] = Some(slot);
            }
            hole = next;
        }
    }

    fn lookup(&self, key: &Value) -> Option<usize> {
        let (hash, _) = util::hash_pair(&key.to_key_bytes());
        let mask = self.buckets.len() - 1;

        let mut bucket = (hash as usize) & mask;
        let mut psl = 0_u32;
        loop {
            match &self.buckets[bucket] {
                None => break None,
                // the invariant: no farther slot can hold this key.
                Some(slot) if psl > slot.psl => break None,
                Some(slot) if slot.hash == hash && &slot.key == key => break Some(bucket),
                Some(_) => {
                    bucket = (bucket + 1) & mask;
                    psl += 1;
                }
            }
        }
    }

    // robin-hood the slot into the table, stealing from entries closer
    // to their ideal bucket than the suitor.
    fn place(&mut self, mut slot: Slot) {
        let mask = self.buckets.len() - 1;
        let mut bucket = (slot.hash as usize) & mask;

        loop {
            match &mut self.buckets[bucket] {
                None => {
                    self.buckets[bucket] = Some(slot);
                    break;
                }
                Some(incumbent) if slot.psl > incumbent.psl => {
                    mem::swap(incumbent, &mut slot);
                }
                Some(_) => (),
            }
            bucket = (bucket + 1) & mask;
            slot.psl += 1;
        }
    }

    // true when one more distinct key would push occupancy beyond the
    // load-factor ceiling.
    fn would_overload(&self) -> bool {
        ((self.n_keys + 1) as f64) / (self.buckets.len() as f64) > LOAD_FACTOR
    }

    // double the table, re-seating every slot from its stored hash,
    // without re-computing key digests.
    fn rehash(&mut self, name: &str) {
        let capacity = self.buckets.len() * 2;
        let old = mem::replace(&mut self.buckets, vec![None; capacity]);
        for slot in old.into_iter().flatten() {
            let mut slot = slot;
            slot.psl = 0;
            self.place(slot);
        }
        self.n_rehashes += 1;
        debug!(
            target: "hashix",
            "{} rehashed into capacity {}, {} keys", name, capacity, self.n_keys
        );
    }
}

#[cfg(test)]
#[path = "index_test.rs"]
mod index_test;
