use std::{fmt, result};

use crate::{db::ToJson, util::spinlock};

/// Statistic type, for [Index][crate::bplus::Index] trees.
pub struct Stats {
    pub name: String,
    pub order: usize,
    pub n_count: usize,
    pub height: usize,
    pub n_leaves: usize,
    pub n_internals: usize,
    pub n_splits: usize,
    pub n_merges: usize,
    pub n_borrows: usize,
    pub spin_stats: spinlock::Stats,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        writeln!(f, "bplus.name = {}", self.name)?;
        writeln!(
            f,
            "bplus = {{ order={}, n_count={}, height={}, n_leaves={}, n_internals={} }}",
            self.order, self.n_count, self.height, self.n_leaves, self.n_internals,
        )?;
        writeln!(
            f,
            "bplus = {{ n_splits={}, n_merges={}, n_borrows={} }}",
            self.n_splits, self.n_merges, self.n_borrows,
        )?;
        write!(f, "bplus.spin_stats = {}", self.spin_stats)
    }
}

impl ToJson for Stats {
    fn to_json(&self) -> String {
        format!(
            concat!(
                r#"{{ "bplus": {{ "name": {:?}, "order": {}, "n_count": {}, "#,
                r#""height": {}, "n_leaves": {}, "n_internals": {}, "#,
                r#""n_splits": {}, "n_merges": {}, "n_borrows": {} }} }}"#
            ),
            self.name,
            self.order,
            self.n_count,
            self.height,
            self.n_leaves,
            self.n_internals,
            self.n_splits,
            self.n_merges,
            self.n_borrows,
        )
    }
}
