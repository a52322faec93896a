//! Concurrent construction of schema trees.
//!
//! Nodes live in an append-only arena of atomic slots, so supports can be bumped and links
//! read without locks. The only mutations that need exclusion are creating a child (two
//! workers must not both create the child of `p` for item `i`) and prepending to an item's
//! header chain. Both go through a [`LockBank`]: child creation under the shard of the parent
//! node, header prepends under the shard of the item. A worker holds at most one shard at a
//! time, which rules out deadlock.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use rustc_hash::FxHashMap;
use tracing::info;

use super::{SchemaTree, NIL, ROOT_SENTINEL};
use crate::canonical::CanonicalItems;
use crate::dictionary::{Dictionary, UnknownItems};
use crate::error::{Error, Result};
use crate::item::ItemId;
use crate::locks::{LockBank, LOCK_SHARDS};

const FIRST_SEGMENT_BITS: u32 = 10;
/// Segment `s` holds `2^(FIRST_SEGMENT_BITS + s)` slots; together just under `u32::MAX`.
const SEGMENTS: usize = 22;

struct Slot {
    item: AtomicU32,
    parent: AtomicU32,
    next_same: AtomicU32,
    support: AtomicU32,
}

impl Default for Slot {
    fn default() -> Self {
        Self {
            item: AtomicU32::new(NIL),
            parent: AtomicU32::new(NIL),
            next_same: AtomicU32::new(NIL),
            support: AtomicU32::new(0),
        }
    }
}

/// Slots that never move once allocated, grown by doubling segments.
struct Arena {
    segments: [OnceLock<Box<[Slot]>>; SEGMENTS],
    len: AtomicU32,
}

impl Arena {
    fn new() -> Self {
        Self {
            segments: std::array::from_fn(|_| OnceLock::new()),
            len: AtomicU32::new(0),
        }
    }

    /// Segment and offset of `index`.
    #[inline(always)]
    fn locate(index: u32) -> (usize, usize) {
        let shifted = index as u64 + (1 << FIRST_SEGMENT_BITS);
        let high = 63 - shifted.leading_zeros();
        ((high - FIRST_SEGMENT_BITS) as usize, (shifted - (1 << high)) as usize)
    }

    fn alloc(&self, item: u32, parent: u32) -> Result<u32> {
        let index = self.len.fetch_add(1, Ordering::Relaxed);
        let (segment, offset) = Self::locate(index);
        if index == NIL || segment >= SEGMENTS {
            return Err(Error::CapacityExceeded);
        }
        let slots = self.segments[segment].get_or_init(|| {
            (0 .. 1usize << (FIRST_SEGMENT_BITS as usize + segment)).map(|_| Slot::default()).collect()
        });
        let slot = &slots[offset];
        slot.item.store(item, Ordering::Relaxed);
        slot.parent.store(parent, Ordering::Relaxed);
        Ok(index)
    }

    /// The slot of an allocated node.
    #[inline(always)]
    fn slot(&self, index: u32) -> &Slot {
        let (segment, offset) = Self::locate(index);
        match self.segments[segment].get() {
            Some(slots) => &slots[offset],
            None => unreachable!("node {index} was never allocated"),
        }
    }

    fn len(&self) -> u32 {
        self.len.load(Ordering::Relaxed)
    }
}

/// Builds a [`SchemaTree`] from transactions inserted by any number of threads.
///
/// The dictionary is frozen before the first insertion, so ranks (and with them the
/// shape of every path) cannot change underneath concurrent inserts.
pub struct SchemaTreeBuilder {
    dictionary: Dictionary,
    arena: Arena,
    /// `(parent, item rank) -> child`, sharded by parent.
    children: LockBank<FxHashMap<(u32, u32), u32>>,
    /// Chain heads, item `r` at position `r / LOCK_SHARDS` of shard `r % LOCK_SHARDS`.
    heads: LockBank<Vec<u32>>,
}

impl SchemaTreeBuilder {
    pub fn new(dictionary: Dictionary) -> Self {
        let items = dictionary.len();
        let heads = LockBank::from_fn(|shard| vec![NIL; (items + LOCK_SHARDS - 1 - shard) / LOCK_SHARDS]);
        let arena = Arena::new();
        // The arena is empty, so the root always gets index 0.
        let root = arena.alloc(ROOT_SENTINEL, NIL);
        debug_assert_eq!(root.ok(), Some(0));
        Self {
            dictionary,
            arena,
            children: LockBank::default(),
            heads,
        }
    }

    #[inline] pub fn dictionary(&self) -> &Dictionary { &self.dictionary }
    /// Nodes allocated so far, the root included.
    #[inline] pub fn len(&self) -> usize { self.arena.len() as usize }
    #[inline] pub fn is_empty(&self) -> bool { false }

    /// Transactions inserted so far.
    pub fn transactions(&self) -> u32 {
        self.arena.slot(0).support.load(Ordering::Relaxed)
    }

    /// Inserts one canonical transaction, creating missing nodes and bumping supports along its path.
    ///
    /// Items are checked against the dictionary before anything is touched.
    pub fn insert(&self, transaction: &CanonicalItems) -> Result<()> {
        for item in transaction {
            self.dictionary.check(item)?;
        }
        self.arena.slot(0).support.fetch_add(1, Ordering::Relaxed);
        let mut node = 0;
        for item in transaction {
            node = self.child_or_insert(node, item)?;
            self.arena.slot(node).support.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Canonicalizes `names` against the dictionary, rejecting unknown names, and inserts them.
    pub fn insert_names<S: AsRef<str>>(&self, names: impl IntoIterator<Item = S>) -> Result<()> {
        let transaction = self.dictionary.canonicalize(names, UnknownItems::Reject)?;
        self.insert(&transaction)
    }

    fn child_or_insert(&self, parent: u32, item: ItemId) -> Result<u32> {
        let key = (parent, item.rank());
        let shard = self.children.shard(parent as u64);
        if let Some(&child) = shard.read().get(&key) {
            return Ok(child);
        }
        let child = {
            let mut children = shard.write();
            if let Some(&child) = children.get(&key) {
                return Ok(child);
            }
            let child = self.arena.alloc(item.rank(), parent)?;
            children.insert(key, child);
            child
        };
        self.link_header(item, child);
        Ok(child)
    }

    /// Prepends `node` to the header chain of `item`.
    fn link_header(&self, item: ItemId, node: u32) {
        let rank = item.rank() as u64;
        let mut heads = self.heads.shard(rank).write();
        let head = &mut heads[(rank / LOCK_SHARDS as u64) as usize];
        self.arena.slot(node).next_same.store(*head, Ordering::Relaxed);
        *head = node;
    }

    /// Freezes the tree. Node ids are kept, so header chains read as they were linked.
    pub fn finish(self) -> SchemaTree {
        let nodes = self.arena.len() as usize;
        let mut items = Vec::with_capacity(nodes);
        let mut parents = Vec::with_capacity(nodes);
        let mut supports = Vec::with_capacity(nodes);
        let mut next_same = Vec::with_capacity(nodes);
        for index in 0 .. nodes as u32 {
            let slot = self.arena.slot(index);
            items.push(slot.item.load(Ordering::Relaxed));
            parents.push(slot.parent.load(Ordering::Relaxed));
            supports.push(slot.support.load(Ordering::Relaxed));
            next_same.push(slot.next_same.load(Ordering::Relaxed));
        }

        let mut edges: Vec<(u32, u32, u32)> = self.children
            .into_inner()
            .flat_map(|shard| shard.into_iter())
            .map(|((parent, rank), child)| (parent, rank, child))
            .collect();
        edges.sort_unstable();
        let mut bounds = Vec::with_capacity(nodes + 1);
        bounds.push(0u32);
        let mut kids = Vec::with_capacity(edges.len());
        let mut edges = edges.into_iter().peekable();
        for parent in 0 .. nodes as u32 {
            while let Some((_, _, child)) = edges.next_if(|edge| edge.0 == parent) {
                kids.push(child);
            }
            bounds.push(kids.len() as u32);
        }

        let shards: Vec<Vec<u32>> = self.heads.into_inner().collect();
        let heads = (0 .. self.dictionary.len())
            .map(|rank| shards[rank % LOCK_SHARDS][rank / LOCK_SHARDS])
            .collect();

        let tree = SchemaTree { dictionary: self.dictionary, items, parents, supports, next_same, bounds, kids, heads };
        info!(nodes = tree.len(), transactions = tree.transactions(), "froze schema tree");
        tree
    }
}
