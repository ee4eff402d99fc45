//! Module implement access-path planning over the parsed filter.

use std::ops::Bound;

use crate::{
    db::Value,
    imgr::{Capability, IndexManager},
    query::{Clause, Cond, Filter},
};

/// Access path chosen for a query.
///
/// Indexed equality wins over an indexed range, which wins over a full
/// scan; ties break on the declaration order of fields in the filter.
#[derive(Clone, Debug)]
pub enum AccessPath {
    /// Point lookup, estimated cost 1.
    EqLookup { field: String, value: Value },
    /// Ordered scan, estimated cost O(log n + k).
    RangeScan {
        field: String,
        lo: Bound<Value>,
        hi: Bound<Value>,
    },
    /// Walk the whole collection.
    FullScan,
}

/// Choose the access path for `filter` on `collection`.
pub fn plan(imgr: &IndexManager, collection: &str, filter: &Filter) -> AccessPath {
    for clause in filter.clauses() {
        let (field, conds) = match clause {
            Clause::Field { field, conds } => (field, conds),
            _ => continue,
        };
        if !imgr.has_index(collection, field, Capability::Equality) {
            continue;
        }
        for cond in conds.iter() {
            if let Cond::Eq(value) = cond {
                return AccessPath::EqLookup {
                    field: field.clone(),
                    value: value.clone(),
                };
            }
        }
    }

    for clause in filter.clauses() {
        let (field, conds) = match clause {
            Clause::Field { field, conds } => (field, conds),
            _ => continue,
        };
        if !imgr.has_index(collection, field, Capability::Range) {
            continue;
        }

        let (mut lo, mut hi) = (Bound::Unbounded, Bound::Unbounded);
        let mut ranged = false;
        for cond in conds.iter() {
            match cond {
                Cond::Gt(value) => {
                    lo = tighten_lo(lo, value, true);
                    ranged = true;
                }
                Cond::Gte(value) => {
                    lo = tighten_lo(lo, value, false);
                    ranged = true;
                }
                Cond::Lt(value) => {
                    hi = tighten_hi(hi, value, true);
                    ranged = true;
                }
                Cond::Lte(value) => {
                    hi = tighten_hi(hi, value, false);
                    ranged = true;
                }
                _ => (),
            }
        }
        if ranged {
            return AccessPath::RangeScan {
                field: field.clone(),
                lo,
                hi,
            };
        }
    }

    AccessPath::FullScan
}

// keep the tighter lower bound, exclusive beats inclusive on ties.
fn tighten_lo(cur: Bound<Value>, value: &Value, exclusive: bool) -> Bound<Value> {
    let candidate = || {
        if exclusive {
            Bound::Excluded(value.clone())
        } else {
            Bound::Included(value.clone())
        }
    };
    match &cur {
        Bound::Unbounded => candidate(),
        Bound::Included(c) if value > c || (value == c && exclusive) => candidate(),
        Bound::Excluded(c) if value > c => candidate(),
        _ => cur,
    }
}

// keep the tighter upper bound, exclusive beats inclusive on ties.
fn tighten_hi(cur: Bound<Value>, value: &Value, exclusive: bool) -> Bound<Value> {
    let candidate = || {
        if exclusive {
            Bound::Excluded(value.clone())
        } else {
            Bound::Included(value.clone())
        }
    };
    match &cur {
        Bound::Unbounded => candidate(),
        Bound::Included(c) if value < c || (value == c && exclusive) => candidate(),
        Bound::Excluded(c) if value < c => candidate(),
        _ => cur,
    }
}

#[cfg(test)]
#[path = "plan_test.rs"]
mod plan_test;
