//! Module implement the query pipeline: filter parsing, access-path
//! planning, execution and a version-stamped result cache.
//!
//! A filter document maps fields to criteria, a criterion being either
//! a literal (equality) or a mapping of operators `eq ne gt gte lt lte
//! in nin exists`; `and`, `or` and `not` compose sub-filters at the top
//! level. The planner walks top-level fields in declaration order and
//! picks the cheapest access path an index can serve; the executor
//! re-evaluates the full filter on every candidate, so a plan is never
//! trusted for correctness, only for enumeration.

mod cache;
mod exec;
mod filter;
mod plan;

pub use cache::{CacheStats, QueryCache};
pub use exec::{count, find, Options, SortOrder};
pub use filter::{Clause, Cond, Filter};
pub use plan::{plan, AccessPath};
