//! Module implement the B+ tree behind ordered indexes.

use log::debug;

use std::{
    convert::TryFrom,
    mem,
    ops::Bound,
    sync::{Arc, Mutex},
};

use crate::{
    bplus::{Entry, Node, NodeRef, Stats},
    db::{Footprint, Value},
    util::Spinlock,
    Error, Result,
};

/// Default branching factor. Nodes hold at most `order - 1` keys and,
/// root exempt, at least `ceil(order/2) - 1`.
pub const DEFAULT_ORDER: usize = 32;

/// Ordered index for a single (collection, field) pair.
///
/// Type allow concurrent read access; write operations are serialized
/// on a mutex and latch the tree exclusively only for the in-memory
/// update. Underflowing nodes are repaired eagerly, borrowing from a
/// surplus sibling else merging, so lookups never meet deferred debt.
#[derive(Clone)]
pub struct Index {
    name: String,
    unique: bool,

    mu: Arc<Mutex<u32>>,
    inner: Arc<Spinlock<Inner>>,
}

struct Inner {
    order: usize,
    nodes: Vec<Node>,
    free: Vec<NodeRef>,
    root: NodeRef,
    head: NodeRef, // leftmost leaf, start of the chain

    n_count: usize,
    n_splits: usize,
    n_merges: usize,
    n_borrows: usize,
}

impl Index {
    /// Create a new index with branching factor `order`. Trees begin as
    /// a single empty leaf that is also the root.
    pub fn new(name: &str, unique: bool, order: usize) -> Result<Index> {
        if order < 4 {
            err_at!(InvalidInput, msg: "{} order {} below minimum 4", name, order)?
        }
        let inner = Inner {
            order,
            nodes: vec![Node::new_leaf()],
            free: vec![],
            root: 0,
            head: 0,

            n_count: 0,
            n_splits: 0,
            n_merges: 0,
            n_borrows: 0,
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

    /// Return number of (key, identifier) entries in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.read().n_count
    }

    /// Return whether index is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add an entry for `id` under `key`. Return true when a fresh
    /// (key, id) entry was created, false when the pair was already
    /// present.
    ///
    /// For unique indexes a second, distinct identifier under the same
    /// key fails with `DuplicateKey`.
    pub fn set(&self, key: &Value, id: &str) -> Result<bool> {
        let _w = self.mu.lock();
        let mut inner = self.inner.write();
        inner.set(Entry::new(key.clone(), id), self.unique, &self.name)
    }

    /// Remove the (key, id) entry. Return true when it was present.
    pub fn remove(&self, key: &Value, id: &str) -> bool {
        let _w = self.mu.lock();
        let mut inner = self.inner.write();
        inner.remove(&Entry::new(key.clone(), id))
    }

    /// Return the identifiers indexed under `key`, in identifier order.
    pub fn get(&self, key: &Value) -> Vec<String> {
        let inner = self.inner.read();
        let entries = inner.range(Bound::Included(key), Bound::Included(key));
        entries.into_iter().map(|e| e.id).collect()
    }

    /// Return all entries within the bounds, in ascending (key, id)
    /// order. `lo` above `hi` yields empty; absent bounds iterate the
    /// full tree. Cost is O(log n + k).
    pub fn range(&self, lo: Bound<&Value>, hi: Bound<&Value>) -> Vec<Entry> {
        self.inner.read().range(lo, hi)
    }

    /// Full ordered iteration, same as an unbounded [range][Index::range].
    pub fn iter(&self) -> Vec<Entry> {
        self.range(Bound::Unbounded, Bound::Unbounded)
    }

    pub fn footprint(&self) -> Result<isize> {
        use std::mem::size_of;

        let inner = self.inner.read();
        let mut size = inner.nodes.capacity() * size_of::<Node>();
        for node in inner.nodes.iter() {
            let entries = match node {
                Node::Internal { seps, .. } => seps,
                Node::Leaf { entries, .. } => entries,
                Node::Free => continue,
            };
            for entry in entries.iter() {
                size += size_of::<Entry>() + entry.id.capacity();
                size += usize::try_from(entry.key.footprint()?).unwrap_or(0);
            }
        }
        err_at!(FailConvert, isize::try_from(size))
    }

    pub fn to_stats(&self) -> Result<Stats> {
        let inner = self.inner.read();

        let mut height = 1;
        let mut nid = inner.root;
        loop {
            match &inner.nodes[nid] {
                Node::Internal { children, .. } => {
                    height += 1;
                    nid = children[0];
                }
                _ => break,
            }
        }

        let (mut n_leaves, mut n_internals) = (0, 0);
        for node in inner.nodes.iter() {
            match node {
                Node::Internal { .. } => n_internals += 1,
                Node::Leaf { .. } => n_leaves += 1,
                Node::Free => (),
            }
        }

        Ok(Stats {
            name: self.name.clone(),
            order: inner.order,
            n_count: inner.n_count,
            height,
            n_leaves,
            n_internals,
            n_splits: inner.n_splits,
            n_merges: inner.n_merges,
            n_borrows: inner.n_borrows,
            spin_stats: self.inner.to_stats()?,
        })
    }

    /// Validate the tree invariants and return statistics.
    ///
    /// * entries and separators are sorted, strictly;
    /// * non-root nodes respect the occupancy bounds;
    /// * every leaf sits at the same depth;
    /// * the leaf chain concatenation equals in-order traversal.
    pub fn validate(&self) -> Result<Stats> {
        let inner = self.inner.read();
        inner.validate(&self.name)?;
        mem::drop(inner);
        self.to_stats()
    }
}

struct Info {
    depth: usize,
    min: Option<Entry>,
    max: Option<Entry>,
    n_entries: usize,
}

impl Inner {
    #[inline]
    fn min_keys(&self) -> usize {
        (self.order + 1) / 2 - 1
    }

    #[inline]
    fn max_keys(&self) -> usize {
        self.order - 1
    }

    fn alloc(&mut self, node: Node) -> NodeRef {
        match self.free.pop() {
            Some(nid) => {
                self.nodes[nid] = node;
                nid
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn dealloc(&mut self, nid: NodeRef) {
        self.nodes[nid] = Node::Free;
        self.free.push(nid);
    }

    fn set(&mut self, entry: Entry, unique: bool, name: &str) -> Result<bool> {
        let hits = self.range(Bound::Included(&entry.key), Bound::Included(&entry.key));
        if unique {
            if let Some(first) = hits.first() {
                if first.id == entry.id {
                    return Ok(false);
                }
                err_at!(DuplicateKey, msg: "{} key {} already indexed", name, entry.key)?
            }
        } else if hits.iter().any(|e| e.id == entry.id) {
            return Ok(false);
        }

        if let Some((sep, right)) = self.insert_rec(self.root, entry) {
            let root = self.alloc(Node::Internal {
                seps: vec![sep],
                children: vec![self.root, right],
            });
            self.root = root;
            debug!(target: "bplus", "{} root split, tree grows", name);
        }
        self.n_count += 1;
        Ok(true)
    }

    // descend to the target leaf; splits propagate back up as
    // (separator, new-right-node) promotions.
    fn insert_rec(&mut self, nid: NodeRef, entry: Entry) -> Option<(Entry, NodeRef)> {
        let child = match &self.nodes[nid] {
            Node::Internal { seps, children } => Some(children[upper_bound(seps, &entry)]),
            Node::Leaf { .. } => None,
            Node::Free => panic!("descended into freed node! call the programmer"),
        };

        match child {
            Some(cid) => {
                let (sep, right) = self.insert_rec(cid, entry)?;
                let overflow = match &mut self.nodes[nid] {
                    Node::Internal { seps, children } => {
                        let pos = upper_bound(seps, &sep);
                        seps.insert(pos, sep);
                        children.insert(pos + 1, right);
                        seps.len() > self.order - 1
                    }
                    _ => panic!("internal node changed shape! call the programmer"),
                };
                if overflow {
                    Some(self.split_internal(nid))
                } else {
                    None
                }
            }
            None => {
                let overflow = match &mut self.nodes[nid] {
                    Node::Leaf { entries, .. } => {
                        let pos = upper_bound(entries, &entry);
                        entries.insert(pos, entry);
                        entries.len() >= self.order
                    }
                    _ => panic!("leaf node changed shape! call the programmer"),
                };
                if overflow {
                    Some(self.split_leaf(nid))
                } else {
                    None
                }
            }
        }
    }

    // split at the midpoint; the new right leaf becomes the old leaf's
    // next, and its first key is promoted as the separator.
    fn split_leaf(&mut self, nid: NodeRef) -> (Entry, NodeRef) {
        let (right_entries, old_next) = match &mut self.nodes[nid] {
            Node::Leaf { entries, next, .. } => {
                let mid = entries.len() / 2;
                (entries.split_off(mid), *next)
            }
            _ => panic!("splitting a non-leaf! call the programmer"),
        };
        let sep = right_entries[0].clone();

        let right = self.alloc(Node::Leaf {
            entries: right_entries,
            next: old_next,
            prev: Some(nid),
        });
        match &mut self.nodes[nid] {
            Node::Leaf { next, .. } => *next = Some(right),
            _ => panic!("splitting a non-leaf! call the programmer"),
        }
        if let Some(nn) = old_next {
            match &mut self.nodes[nn] {
                Node::Leaf { prev, .. } => *prev = Some(right),
                _ => panic!("chained into a non-leaf! call the programmer"),
            }
        }

        self.n_splits += 1;
        (sep, right)
    }

    fn split_internal(&mut self, nid: NodeRef) -> (Entry, NodeRef) {
        let (promote, right_seps, right_children) = match &mut self.nodes[nid] {
            Node::Internal { seps, children } => {
                let mid = seps.len() / 2;
                let right_seps = seps.split_off(mid + 1);
                let promote = match seps.pop() {
                    Some(sep) => sep,
                    None => panic!("splitting an empty internal! call the programmer"),
                };
                let right_children = children.split_off(mid + 1);
                (promote, right_seps, right_children)
            }
            _ => panic!("splitting a non-internal! call the programmer"),
        };

        let right = self.alloc(Node::Internal {
            seps: right_seps,
            children: right_children,
        });
        self.n_splits += 1;
        (promote, right)
    }

    fn remove(&mut self, target: &Entry) -> bool {
        let (found, _) = self.remove_rec(self.root, target);
        if !found {
            return false;
        }
        self.n_count -= 1;

        // an empty internal root hands over to its single child.
        let new_root = match &self.nodes[self.root] {
            Node::Internal { seps, children } if seps.is_empty() => Some(children[0]),
            _ => None,
        };
        if let Some(nid) = new_root {
            let old = self.root;
            self.dealloc(old);
            self.root = nid;
        }
        true
    }

    // (found, underflow) propagates back up; parents repair an
    // underflowing child before reporting their own occupancy.
    fn remove_rec(&mut self, nid: NodeRef, target: &Entry) -> (bool, bool) {
        let min = self.min_keys();
        let child = match &self.nodes[nid] {
            Node::Internal { seps, children } => {
                let idx = upper_bound(seps, target);
                Some((children[idx], idx))
            }
            Node::Leaf { .. } => None,
            Node::Free => panic!("descended into freed node! call the programmer"),
        };

        match child {
            Some((cid, idx)) => {
                let (found, under) = self.remove_rec(cid, target);
                if under {
                    self.fix_child(nid, idx);
                }
                (found, self.nodes[nid].n_keys() < min)
            }
            None => match &mut self.nodes[nid] {
                Node::Leaf { entries, .. } => {
                    let pos = lower_bound(entries, target);
                    let found = pos < entries.len() && &entries[pos] == target;
                    if found {
                        entries.remove(pos);
                    }
                    (found, found && entries.len() < min)
                }
                _ => panic!("leaf node changed shape! call the programmer"),
            },
        }
    }

    // repair children[idx]: borrow from a surplus sibling, else merge.
    fn fix_child(&mut self, pid: NodeRef, idx: usize) {
        let (left, right) = match &self.nodes[pid] {
            Node::Internal { children, .. } => (
                if idx > 0 { Some(children[idx - 1]) } else { None },
                if idx + 1 < children.len() {
                    Some(children[idx + 1])
                } else {
                    None
                },
            ),
            _ => panic!("fixing child of a non-internal! call the programmer"),
        };

        let min = self.min_keys();
        if let Some(lid) = left {
            if self.nodes[lid].n_keys() > min {
                return self.borrow_left(pid, idx);
            }
        }
        if let Some(rid) = right {
            if self.nodes[rid].n_keys() > min {
                return self.borrow_right(pid, idx);
            }
        }
        if left.is_some() {
            self.merge(pid, idx - 1)
        } else {
            self.merge(pid, idx)
        }
    }

    fn child_at(&self, pid: NodeRef, idx: usize) -> NodeRef {
        match &self.nodes[pid] {
            Node::Internal { children, .. } => children[idx],
            _ => panic!("child of a non-internal! call the programmer"),
        }
    }

    fn replace_sep(&mut self, pid: NodeRef, idx: usize, sep: Entry) -> Entry {
        match &mut self.nodes[pid] {
            Node::Internal { seps, .. } => mem::replace(&mut seps[idx], sep),
            _ => panic!("separator of a non-internal! call the programmer"),
        }
    }

    fn borrow_left(&mut self, pid: NodeRef, idx: usize) {
        let (lid, cid) = (self.child_at(pid, idx - 1), self.child_at(pid, idx));
        let mut left = mem::replace(&mut self.nodes[lid], Node::Free);
        let mut child = mem::replace(&mut self.nodes[cid], Node::Free);

        match (&mut left, &mut child) {
            (Node::Leaf { entries: le, .. }, Node::Leaf { entries: ce, .. }) => {
                let entry = match le.pop() {
                    Some(entry) => entry,
                    None => panic!("borrowing from empty leaf! call the programmer"),
                };
                ce.insert(0, entry);
                let sep = ce[0].clone();
                self.replace_sep(pid, idx - 1, sep);
            }
            (
                Node::Internal { seps: ls, children: lc },
                Node::Internal { seps: cs, children: cc },
            ) => {
                let up = match ls.pop() {
                    Some(sep) => sep,
                    None => panic!("borrowing from empty internal! call the programmer"),
                };
                let moved = match lc.pop() {
                    Some(child) => child,
                    None => panic!("borrowing from empty internal! call the programmer"),
                };
                let down = self.replace_sep(pid, idx - 1, up);
                cs.insert(0, down);
                cc.insert(0, moved);
            }
            _ => panic!("sibling kinds differ! call the programmer"),
        }

        self.nodes[lid] = left;
        self.nodes[cid] = child;
        self.n_borrows += 1;
    }

    fn borrow_right(&mut self, pid: NodeRef, idx: usize) {
        let (cid, rid) = (self.child_at(pid, idx), self.child_at(pid, idx + 1));
        let mut child = mem::replace(&mut self.nodes[cid], Node::Free);
        let mut right = mem::replace(&mut self.nodes[rid], Node::Free);

        match (&mut child, &mut right) {
            (Node::Leaf { entries: ce, .. }, Node::Leaf { entries: re, .. }) => {
                ce.push(re.remove(0));
                let sep = re[0].clone();
                self.replace_sep(pid, idx, sep);
            }
            (
                Node::Internal { seps: cs, children: cc },
                Node::Internal { seps: rs, children: rc },
            ) => {
                let down = self.replace_sep(pid, idx, rs.remove(0));
                cs.push(down);
                cc.push(rc.remove(0));
            }
            _ => panic!("sibling kinds differ! call the programmer"),
        }

        self.nodes[cid] = child;
        self.nodes[rid] = right;
        self.n_borrows += 1;
    }

    // merge children[sep_idx + 1] into children[sep_idx]. For leaves
    // the separator collapses away, for internals it moves down into
    // the surviving node.
    fn merge(&mut self, pid: NodeRef, sep_idx: usize) {
        let (lid, rid) = (self.child_at(pid, sep_idx), self.child_at(pid, sep_idx + 1));

        let sep = match &mut self.nodes[pid] {
            Node::Internal { seps, children } => {
                children.remove(sep_idx + 1);
                seps.remove(sep_idx)
            }
            _ => panic!("merging children of a non-internal! call the programmer"),
        };

        let right = mem::replace(&mut self.nodes[rid], Node::Free);
        let mut chained: Option<NodeRef> = None;
        match (&mut self.nodes[lid], right) {
            (
                Node::Leaf { entries: le, next: ln, .. },
                Node::Leaf { entries: re, next: rn, .. },
            ) => {
                le.extend(re);
                *ln = rn;
                chained = rn;
            }
            (
                Node::Internal { seps: ls, children: lc },
                Node::Internal { seps: rs, children: rc },
            ) => {
                ls.push(sep);
                ls.extend(rs);
                lc.extend(rc);
            }
            _ => panic!("sibling kinds differ! call the programmer"),
        }
        if let Some(nn) = chained {
            match &mut self.nodes[nn] {
                Node::Leaf { prev, .. } => *prev = Some(lid),
                _ => panic!("chained into a non-leaf! call the programmer"),
            }
        }

        self.dealloc(rid);
        self.n_merges += 1;
    }

    // leftmost leaf that can hold `key`, equal-key entries never sit
    // left of it.
    fn descend_leaf(&self, key: &Value) -> NodeRef {
        let mut nid = self.root;
        loop {
            match &self.nodes[nid] {
                Node::Internal { seps, children } => {
                    nid = children[lower_bound_key(seps, key)];
                }
                Node::Leaf { .. } => break nid,
                Node::Free => panic!("descended into freed node! call the programmer"),
            }
        }
    }

    fn range(&self, lo: Bound<&Value>, hi: Bound<&Value>) -> Vec<Entry> {
        let mut out = vec![];
        let mut nid = match lo {
            Bound::Unbounded => self.head,
            Bound::Included(key) | Bound::Excluded(key) => self.descend_leaf(key),
        };

        'chain: loop {
            match &self.nodes[nid] {
                Node::Leaf { entries, next, .. } => {
                    for entry in entries.iter() {
                        if below_lo(entry, lo) {
                            continue;
                        }
                        if above_hi(entry, hi) {
                            break 'chain;
                        }
                        out.push(entry.clone());
                    }
                    match next {
                        Some(nn) => nid = *nn,
                        None => break,
                    }
                }
                _ => panic!("chained into a non-leaf! call the programmer"),
            }
        }
        out
    }

    fn validate(&self, name: &str) -> Result<()> {
        let min = self.min_keys();
        let max = self.max_keys();
        let info = self.validate_rec(self.root, self.root, min, max, name)?;

        if info.n_entries != self.n_count {
            err_at!(Fatal, msg: "{} n_count {} != {}", name, info.n_entries, self.n_count)?;
        }

        // leaf chain must equal in-order traversal, strictly sorted.
        let mut chain = vec![];
        let mut nid = self.head;
        let mut prev_leaf: Option<NodeRef> = None;
        loop {
            match &self.nodes[nid] {
                Node::Leaf { entries, next, prev } => {
                    if *prev != prev_leaf {
                        err_at!(Fatal, msg: "{} bad prev link at leaf {}", name, nid)?;
                    }
                    chain.extend(entries.iter().cloned());
                    match next {
                        Some(nn) => {
                            prev_leaf = Some(nid);
                            nid = *nn;
                        }
                        None => break,
                    }
                }
                _ => err_at!(Fatal, msg: "{} leaf chain hit a non-leaf", name)?,
            }
        }
        for pair in chain.windows(2) {
            if pair[0] >= pair[1] {
                err_at!(Fatal, msg: "{} chain not strictly sorted", name)?;
            }
        }
        let mut inorder = vec![];
        self.collect_rec(self.root, &mut inorder);
        if chain != inorder {
            err_at!(Fatal, msg: "{} chain disagrees with traversal", name)?;
        }

        Ok(())
    }

    fn validate_rec(
        &self,
        nid: NodeRef,
        root: NodeRef,
        min: usize,
        max: usize,
        name: &str,
    ) -> Result<Info> {
        match &self.nodes[nid] {
            Node::Leaf { entries, .. } => {
                if nid != root && entries.len() < min {
                    err_at!(Fatal, msg: "{} leaf {} underfull {}", name, nid, entries.len())?;
                }
                if entries.len() > max {
                    err_at!(Fatal, msg: "{} leaf {} overfull {}", name, nid, entries.len())?;
                }
                Ok(Info {
                    depth: 1,
                    min: entries.first().cloned(),
                    max: entries.last().cloned(),
                    n_entries: entries.len(),
                })
            }
            Node::Internal { seps, children } => {
                if nid != root && seps.len() < min {
                    err_at!(Fatal, msg: "{} internal {} underfull {}", name, nid, seps.len())?;
                }
                if seps.len() > max {
                    err_at!(Fatal, msg: "{} internal {} overfull {}", name, nid, seps.len())?;
                }
                if children.len() != seps.len() + 1 {
                    err_at!(
                        Fatal,
                        msg: "{} internal {} has {} seps, {} children",
                        name, nid, seps.len(), children.len()
                    )?;
                }

                let mut info: Option<Info> = None;
                for (i, child) in children.iter().enumerate() {
                    let ci = self.validate_rec(*child, root, min, max, name)?;
                    // separators route: left subtree < sep, right >= sep.
                    if i > 0 {
                        if let Some(cmin) = &ci.min {
                            if cmin < &seps[i - 1] {
                                err_at!(Fatal, msg: "{} sep above subtree at {}", name, nid)?;
                            }
                        }
                    }
                    if i < seps.len() {
                        if let Some(cmax) = &ci.max {
                            if cmax >= &seps[i] {
                                err_at!(Fatal, msg: "{} sep below subtree at {}", name, nid)?;
                            }
                        }
                    }

                    info = Some(match info {
                        None => Info {
                            depth: ci.depth + 1,
                            min: ci.min,
                            max: ci.max,
                            n_entries: ci.n_entries,
                        },
                        Some(acc) => {
                            if acc.depth != ci.depth + 1 {
                                err_at!(Fatal, msg: "{} uneven leaf depth at {}", name, nid)?;
                            }
                            Info {
                                depth: acc.depth,
                                min: acc.min.or(ci.min),
                                max: ci.max.or(acc.max),
                                n_entries: acc.n_entries + ci.n_entries,
                            }
                        }
                    });
                }
                match info {
                    Some(info) => Ok(info),
                    None => err_at!(Fatal, msg: "{} internal {} without children", name, nid),
                }
            }
            Node::Free => err_at!(Fatal, msg: "{} freed node {} reachable", name, nid),
        }
    }

    fn collect_rec(&self, nid: NodeRef, out: &mut Vec<Entry>) {
        match &self.nodes[nid] {
            Node::Leaf { entries, .. } => out.extend(entries.iter().cloned()),
            Node::Internal { children, .. } => {
                for child in children.iter() {
                    self.collect_rec(*child, out);
                }
            }
            Node::Free => panic!("traversed into freed node! call the programmer"),
        }
    }
}

// first position whose entry is greater than `target`.
fn upper_bound(entries: &[Entry], target: &Entry) -> usize {
    let (mut lo, mut hi) = (0, entries.len());
    while lo < hi {
        let mid = (lo + hi) / 2;
        if entries[mid] <= *target {
            lo = mid + 1
        } else {
            hi = mid
        }
    }
    lo
}

// first position whose entry is not below `target`.
fn lower_bound(entries: &[Entry], target: &Entry) -> usize {
    let (mut lo, mut hi) = (0, entries.len());
    while lo < hi {
        let mid = (lo + hi) / 2;
        if entries[mid] < *target {
            lo = mid + 1
        } else {
            hi = mid
        }
    }
    lo
}

// first position whose key is not below `key`, ignoring identifiers.
fn lower_bound_key(entries: &[Entry], key: &Value) -> usize {
    let (mut lo, mut hi) = (0, entries.len());
    while lo < hi {
        let mid = (lo + hi) / 2;
        if entries[mid].key < *key {
            lo = mid + 1
        } else {
            hi = mid
        }
    }
    lo
}

fn below_lo(entry: &Entry, lo: Bound<&Value>) -> bool {
    match lo {
        Bound::Unbounded => false,
        Bound::Included(key) => entry.key < *key,
        Bound::Excluded(key) => entry.key <= *key,
    }
}

fn above_hi(entry: &Entry, hi: Bound<&Value>) -> bool {
    match hi {
        Bound::Unbounded => false,
        Bound::Included(key) => entry.key > *key,
        Bound::Excluded(key) => entry.key >= *key,
    }
}

#[cfg(test)]
#[path = "index_test.rs"]
mod index_test;
