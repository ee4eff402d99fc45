//! Module implement configuration for the store.

use serde::{Deserialize, Serialize};

use std::{convert::TryFrom, ffi, fs};

use crate::{bplus, hash, Error, Result};

/// Default number of query-cache entries.
pub const DEFAULT_CACHE_LIMIT: usize = 128;

/// Configuration for [Store][crate::store::Store] and the index
/// structures it creates. Starts from [Config::default] and can be
/// loaded from a TOML document.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Initial bucket count for fresh hash indexes, rounded up to a
    /// power of two.
    pub hash_capacity: usize,
    /// Branching factor for fresh ordered indexes, minimum 4.
    pub btree_order: usize,
    /// Maximum entries in the query-result cache, zero disables it.
    pub cache_limit: usize,
    /// Memory ceiling over the sum of document footprints, in bytes.
    /// None lifts the ceiling.
    pub max_memory: Option<usize>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            hash_capacity: hash::DEFAULT_CAPACITY,
            btree_order: bplus::DEFAULT_ORDER,
            cache_limit: DEFAULT_CACHE_LIMIT,
            max_memory: None,
        }
    }
}

impl TryFrom<&str> for Config {
    type Error = Error;

    fn try_from(text: &str) -> Result<Config> {
        let config: Config = err_at!(FailConvert, toml::from_str(text))?;
        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(loc: &ffi::OsStr) -> Result<Config> {
        let text = err_at!(IOError, fs::read_to_string(loc))?;
        Config::try_from(text.as_str())
    }

    pub fn set_hash_capacity(&mut self, capacity: usize) -> &mut Self {
        self.hash_capacity = capacity;
        self
    }

    pub fn set_btree_order(&mut self, order: usize) -> &mut Self {
        self.btree_order = order;
        self
    }

    pub fn set_cache_limit(&mut self, limit: usize) -> &mut Self {
        self.cache_limit = limit;
        self
    }

    pub fn set_max_memory(&mut self, max: Option<usize>) -> &mut Self {
        self.max_memory = max;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.btree_order < 4 {
            err_at!(InvalidInput, msg: "btree_order {} below minimum 4", self.btree_order)?
        }
        if self.hash_capacity == 0 {
            err_at!(InvalidInput, msg: "hash_capacity must be positive")?
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
