use std::{fmt, result};

use crate::{
    db::ToJson,
    util::spinlock,
};

/// Statistic type, captures the probe-sequence-length distribution of a
/// hash table. Robin-Hood displacement keeps the distribution flat; a
/// growing tail is the early sign of a degraded table.
#[derive(Clone)]
pub struct Probe {
    pub samples: usize,
    pub min: usize,
    pub max: usize,
    pub total: usize,
    pub psls: [u64; 64],
}

impl Probe {
    /// Record a sample, the probe-sequence-length of a single occupied
    /// bucket. Lengths beyond the histogram width saturate into the
    /// last slot.
    pub fn sample(&mut self, psl: usize) {
        self.samples += 1;
        self.total += psl;
        self.min = usize::min(self.min, psl);
        self.max = usize::max(self.max, psl);
        self.psls[usize::min(psl, self.psls.len() - 1)] += 1;
    }

    /// Return number of samples recorded.
    pub fn to_samples(&self) -> usize {
        self.samples
    }

    /// Return minimum probe-sequence-length.
    pub fn to_min(&self) -> usize {
        if self.samples == 0 {
            0
        } else {
            self.min
        }
    }

    /// Return maximum probe-sequence-length.
    pub fn to_max(&self) -> usize {
        if self.samples == 0 {
            0
        } else {
            self.max
        }
    }

    /// Return the average probe-sequence-length.
    pub fn to_mean(&self) -> usize {
        if self.samples == 0 {
            0
        } else {
            self.total / self.samples
        }
    }

    /// Return probe-lengths as (percentile, psl) tuples, percentiles
    /// from 91 upto 99.
    pub fn to_percentiles(&self) -> Vec<(u8, usize)> {
        let mut percentiles: Vec<(u8, usize)> = vec![];
        let (mut acc, mut prev_perc) = (0_u64, 90_u8);
        let iter = self.psls.iter().enumerate().filter(|(_, &n)| n > 0);
        for (psl, samples) in iter {
            acc += *samples;
            let perc = ((acc as f64 / (self.samples as f64)) * 100_f64) as u8;
            if perc > prev_perc {
                percentiles.push((perc, psl));
                prev_perc = perc;
            }
        }
        percentiles
    }
}

impl Default for Probe {
    fn default() -> Probe {
        Probe {
            samples: 0,
            min: std::usize::MAX,
            max: std::usize::MIN,
            total: 0,
            psls: [0; 64],
        }
    }
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        let (m, n, x) = (self.to_min(), self.to_mean(), self.to_max());
        let props: Vec<String> = self
            .to_percentiles()
            .into_iter()
            .map(|(perc, psl)| format!(r#""{}" = {}"#, perc, psl))
            .collect();

        write!(
            f,
            "{{ samples={}, min={}, mean={}, max={}, percentiles={{ {} }} }}",
            self.samples,
            m,
            n,
            x,
            props.join(", ")
        )
    }
}

impl ToJson for Probe {
    fn to_json(&self) -> String {
        let props: Vec<String> = self
            .to_percentiles()
            .into_iter()
            .map(|(perc, psl)| format!(r#""{}": {}"#, perc, psl))
            .collect();
        format!(
            concat!(
                r#"{{ "samples": {}, "min": {}, "mean": {}, "max": {}, "#,
                r#""percentiles": {{ {} }} }}"#
            ),
            self.to_samples(),
            self.to_min(),
            self.to_mean(),
            self.to_max(),
            props.join(", ")
        )
    }
}

/// Statistic type, for a single [Index][crate::hash::Index] table.
pub struct Stats {
    pub name: String,
    pub capacity: usize,
    pub n_keys: usize,
    pub n_ids: usize,
    pub load_factor: f64,
    pub n_rehashes: usize,
    pub probes: Probe,
    pub spin_stats: spinlock::Stats,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        writeln!(f, "hash.name = {}", self.name)?;
        writeln!(
            f,
            "hash = {{ capacity={}, n_keys={}, n_ids={}, load_factor={:.3}, n_rehashes={} }}",
            self.capacity, self.n_keys, self.n_ids, self.load_factor, self.n_rehashes,
        )?;
        writeln!(f, "hash.probes = {}", self.probes)?;
        write!(f, "hash.spin_stats = {}", self.spin_stats)
    }
}

impl ToJson for Stats {
    fn to_json(&self) -> String {
        format!(
            concat!(
                r#"{{ "hash": {{ "name": {:?}, "capacity": {}, "n_keys": {}, "#,
                r#""n_ids": {}, "load_factor": {:.3}, "n_rehashes": {}, "#,
                r#""probes": {} }} }}"#
            ),
            self.name,
            self.capacity,
            self.n_keys,
            self.n_ids,
            self.load_factor,
            self.n_rehashes,
            self.probes.to_json(),
        )
    }
}

/// Statistic type, for [ShardedIndex][crate::hash::ShardedIndex].
pub struct ShardStats {
    pub name: String,
    pub shard_count: usize,
    pub n_ops: Vec<usize>,
    pub balance: f64,
    pub shards: Vec<Stats>,
}

impl ShardStats {
    pub fn to_n_keys(&self) -> usize {
        self.shards.iter().map(|s| s.n_keys).sum()
    }

    pub fn to_n_ids(&self) -> usize {
        self.shards.iter().map(|s| s.n_ids).sum()
    }
}

impl fmt::Display for ShardStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        writeln!(f, "sharded.name = {}", self.name)?;
        writeln!(
            f,
            "sharded = {{ shard_count={}, n_keys={}, n_ids={}, balance={:.3} }}",
            self.shard_count,
            self.to_n_keys(),
            self.to_n_ids(),
            self.balance,
        )?;
        for stats in self.shards.iter() {
            writeln!(f, "{}", stats)?;
        }
        Ok(())
    }
}

impl ToJson for ShardStats {
    fn to_json(&self) -> String {
        let shards: Vec<String> = self.shards.iter().map(|s| s.to_json()).collect();
        format!(
            concat!(
                r#"{{ "sharded": {{ "name": {:?}, "shard_count": {}, "#,
                r#""balance": {:.3}, "shards": [{}] }} }}"#
            ),
            self.name,
            self.shard_count,
            self.balance,
            shards.join(", ")
        )
    }
}
