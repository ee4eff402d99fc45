//! Module implement the query executor.
//!
//! Execution order is fixed: enumerate candidates from the planned
//! access path, re-evaluate the full filter as a residual predicate
//! against each live document, then stable sort, then skip, then
//! limit, then projection.

use std::{cmp::Ordering, ops::Bound};

use crate::{
    db::{Value, ID_FIELD},
    imgr::IndexManager,
    query::{plan, AccessPath, Filter},
    store::Storage,
    Result,
};

/// Sort direction for a single key.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Options accepted by find-style queries.
#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Stable multi-key sort; missing fields and nulls sort last
    /// ascending, first descending.
    pub sort: Vec<(String, SortOrder)>,
    /// Dropped before limit applies.
    pub skip: usize,
    /// None means unlimited.
    pub limit: Option<usize>,
    /// Fields to retain; the identifier field is always retained.
    pub projection: Option<Vec<String>>,
}

impl Options {
    pub fn set_sort(&mut self, sort: Vec<(String, SortOrder)>) -> &mut Self {
        self.sort = sort;
        self
    }

    pub fn set_skip(&mut self, skip: usize) -> &mut Self {
        self.skip = skip;
        self
    }

    pub fn set_limit(&mut self, limit: usize) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn set_projection(&mut self, fields: Vec<String>) -> &mut Self {
        self.projection = Some(fields);
        self
    }

    /// Canonical byte encoding, for keying the query cache.
    pub fn to_key_bytes(&self) -> Vec<u8> {
        let mut out = vec![];
        out.extend_from_slice(&(self.sort.len() as u32).to_be_bytes());
        for (field, order) in self.sort.iter() {
            out.extend_from_slice(&(field.len() as u32).to_be_bytes());
            out.extend_from_slice(field.as_bytes());
            out.push(matches!(order, SortOrder::Desc) as u8);
        }
        out.extend_from_slice(&(self.skip as u64).to_be_bytes());
        match self.limit {
            Some(n) => {
                out.push(1);
                out.extend_from_slice(&(n as u64).to_be_bytes());
            }
            None => out.push(0),
        }
        match &self.projection {
            Some(fields) => {
                out.push(1);
                out.extend_from_slice(&(fields.len() as u32).to_be_bytes());
                for field in fields.iter() {
                    out.extend_from_slice(&(field.len() as u32).to_be_bytes());
                    out.extend_from_slice(field.as_bytes());
                }
            }
            None => out.push(0),
        }
        out
    }
}

/// Run the query pipeline and return matching bodies, projected.
pub fn find<S>(
    imgr: &IndexManager,
    storage: &S,
    collection: &str,
    filter: &Filter,
    opts: &Options,
) -> Result<Vec<Value>>
where
    S: Storage,
{
    let mut docs = pipeline(imgr, storage, collection, filter, opts)?;
    if let Some(fields) = &opts.projection {
        docs = docs.iter().map(|body| project(body, fields)).collect();
    }
    Ok(docs)
}

/// Run the same pipeline as [find], skip and limit included, without
/// materializing projections.
pub fn count<S>(
    imgr: &IndexManager,
    storage: &S,
    collection: &str,
    filter: &Filter,
    opts: &Options,
) -> Result<usize>
where
    S: Storage,
{
    Ok(pipeline(imgr, storage, collection, filter, opts)?.len())
}

fn pipeline<S>(
    imgr: &IndexManager,
    storage: &S,
    collection: &str,
    filter: &Filter,
    opts: &Options,
) -> Result<Vec<Value>>
where
    S: Storage,
{
    let mut docs: Vec<Value> = match plan(imgr, collection, filter) {
        AccessPath::EqLookup { field, value } => {
            let ids = imgr.lookup_equal(collection, &field, &value)?;
            fetch(storage, collection, &ids)?
        }
        AccessPath::RangeScan { field, lo, hi } => {
            let ids = imgr.lookup_range(collection, &field, as_ref(&lo), as_ref(&hi))?;
            fetch(storage, collection, &ids)?
        }
        AccessPath::FullScan => storage
            .iterate(collection)?
            .into_iter()
            .map(|doc| doc.body)
            .collect(),
    };

    // the residual predicate keeps results correct with respect to the
    // live document map, whatever the index said.
    docs.retain(|body| filter.matches(body));

    sort_bodies(&mut docs, &opts.sort);

    let limit = opts.limit.unwrap_or(usize::MAX);
    let docs = docs.into_iter().skip(opts.skip).take(limit).collect();
    Ok(docs)
}

fn fetch<S>(storage: &S, collection: &str, ids: &[String]) -> Result<Vec<Value>>
where
    S: Storage,
{
    let mut docs = vec![];
    for id in ids.iter() {
        // an id the index knows but storage misses is a mutation in
        // flight, skip it.
        if let Some(doc) = storage.get(collection, id)? {
            docs.push(doc.body);
        }
    }
    Ok(docs)
}

fn as_ref(bound: &Bound<Value>) -> Bound<&Value> {
    match bound {
        Bound::Unbounded => Bound::Unbounded,
        Bound::Included(value) => Bound::Included(value),
        Bound::Excluded(value) => Bound::Excluded(value),
    }
}

fn sort_bodies(docs: &mut Vec<Value>, keys: &[(String, SortOrder)]) {
    if keys.is_empty() {
        return;
    }
    docs.sort_by(|a, b| {
        for (field, order) in keys.iter() {
            match cmp_key(a.get(field), b.get(field), *order) {
                Ordering::Equal => (),
                ord => return ord,
            }
        }
        Ordering::Equal
    });
}

fn cmp_key(a: Option<&Value>, b: Option<&Value>, order: SortOrder) -> Ordering {
    let asc = order == SortOrder::Asc;
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) if asc => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) if asc => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) if asc => x.cmp(y),
        (Some(x), Some(y)) => y.cmp(x),
    }
}

fn project(body: &Value, fields: &[String]) -> Value {
    match body {
        Value::Object(props) => {
            let props = props
                .iter()
                .filter(|p| p.key == ID_FIELD || fields.iter().any(|f| *f == p.key))
                .cloned()
                .collect();
            Value::Object(props)
        }
        _ => body.clone(),
    }
}

#[cfg(test)]
#[path = "exec_test.rs"]
mod exec_test;
