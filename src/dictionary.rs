//! Item dictionaries.
//!
//! A dictionary is built in two phases. A [`Vocabulary`] is shared by counting workers,
//! which [`Vocabulary::observe`] every distinct name of every transaction. Once the
//! corpus has been scanned, [`Vocabulary::finalize_ranks`] consumes it and produces a
//! frozen [`Dictionary`] whose ranks never change again. Because finalizing takes the
//! vocabulary by value, it runs exactly once, and nothing can resolve new names into a
//! dictionary that trees have already been built against.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use rustc_hash::{FxHashMap, FxHasher};
use tracing::{debug, info};

use crate::canonical::CanonicalItems;
use crate::common::HeapSize;
use crate::error::{Error, Result};
use crate::item::{Item, ItemId};
use crate::locks::LockBank;

const TOKEN_BITS: u32 = 24;

/// Where a name was first seen: a transaction position, then a token position within it.
///
/// Token positions saturate at 2^24 - 1 and transaction positions at 2^40 - 1.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FirstSeen(u64);

impl FirstSeen {
    pub fn at(transaction: u64, token: usize) -> Self {
        let token = (token as u64).min((1 << TOKEN_BITS) - 1);
        Self(transaction.min(u64::MAX >> TOKEN_BITS) << TOKEN_BITS | token)
    }
    pub fn transaction(self) -> u64 { self.0 >> TOKEN_BITS }
    pub fn token(self) -> usize { (self.0 & ((1 << TOKEN_BITS) - 1)) as usize }
}

struct Entry {
    first_seen: AtomicU64,
    count: AtomicU64,
}

impl Entry {
    fn record(&self, increment: u64, seen: Option<FirstSeen>) -> FirstSeen {
        self.count.fetch_add(increment, Ordering::Relaxed);
        match seen {
            Some(seen) => FirstSeen(self.first_seen.fetch_min(seen.0, Ordering::Relaxed).min(seen.0)),
            None => FirstSeen(self.first_seen.load(Ordering::Relaxed)),
        }
    }
}

/// The counting phase of a dictionary. Safe to share between threads.
///
/// Ties between equally frequent names are broken by [`FirstSeen`]. Names created through
/// [`Vocabulary::resolve`] or [`Vocabulary::observe`] are numbered in creation order, which
/// depends on thread scheduling once several workers count at once. Workers that know where
/// a name occurs should call [`Vocabulary::observe_at`] instead, which keeps the earliest
/// position reported and so ranks the same way on every run. Use one style per vocabulary.
pub struct Vocabulary {
    shards: LockBank<FxHashMap<Box<str>, Entry>>,
    distinct: AtomicU32,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

fn name_key(name: &str) -> u64 {
    let mut hasher = FxHasher::default();
    name.hash(&mut hasher);
    hasher.finish()
}

impl Vocabulary {
    pub fn new() -> Self {
        Self {
            shards: LockBank::default(),
            distinct: AtomicU32::new(0),
        }
    }

    /// Returns the entry for `name`, creating it if absent.
    ///
    /// Entries are numbered in creation order, which later breaks ties between equally
    /// frequent items.
    pub fn resolve(&self, name: &str) -> FirstSeen {
        self.entry(name, 0, None)
    }

    /// Counts one more transaction containing `name`.
    ///
    /// Callers deduplicate names within a transaction, so that counts are transaction counts.
    pub fn observe(&self, name: &str) -> FirstSeen {
        self.entry(name, 1, None)
    }

    /// Counts one more transaction containing `name`, which occurs there at `seen`.
    ///
    /// Returns the earliest position reported for `name` so far.
    pub fn observe_at(&self, name: &str, seen: FirstSeen) -> FirstSeen {
        self.entry(name, 1, Some(seen))
    }

    fn entry(&self, name: &str, increment: u64, seen: Option<FirstSeen>) -> FirstSeen {
        let shard = self.shards.shard(name_key(name));
        if let Some(entry) = shard.read().get(name) {
            return entry.record(increment, seen);
        }
        let mut shard = shard.write();
        // Another worker may have created the entry between the two acquisitions.
        let entry = shard.entry(name.into()).or_insert_with(|| {
            let created = self.distinct.fetch_add(1, Ordering::Relaxed);
            let first_seen = seen.unwrap_or(FirstSeen::at(created as u64, 0));
            Entry { first_seen: AtomicU64::new(first_seen.0), count: AtomicU64::new(0) }
        });
        entry.record(increment, seen)
    }

    /// Number of distinct names seen so far.
    pub fn len(&self) -> usize {
        self.distinct.load(Ordering::Relaxed) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Assigns dense ranks by descending count, ties broken by first-seen order.
    pub fn finalize_ranks(self) -> Dictionary {
        let mut entries: Vec<(Box<str>, FirstSeen, u64)> = self.shards
            .into_inner()
            .flat_map(|shard| shard.into_iter())
            .map(|(name, entry)| (name, FirstSeen(entry.first_seen.into_inner()), entry.count.into_inner()))
            .collect();
        entries.sort_unstable_by(|a, b| b.2.cmp(&a.2).then(a.1.cmp(&b.1)));

        let items: Vec<Item> = entries
            .into_iter()
            .enumerate()
            .map(|(rank, (name, _, count))| Item::new(name, ItemId(rank as u32), count))
            .collect();
        let dictionary = Dictionary::from_ranked(items);
        info!(items = dictionary.len(), "finalized item ranks");
        dictionary
    }
}

/// How [`Dictionary::canonicalize`] treats names the dictionary does not contain.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnknownItems {
    /// Skip them; queries tolerate vocabulary not seen when the tree was built.
    Drop,
    /// Fail with [`Error::UnknownItem`]; ingestion must not lose items.
    Reject,
}

/// A frozen, ranked item dictionary. `items()[r]` has rank `r`.
#[derive(Clone, Debug, Default)]
pub struct Dictionary {
    items: Vec<Item>,
    index: FxHashMap<Box<str>, ItemId>,
}

impl PartialEq for Dictionary {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}
impl Eq for Dictionary {}

impl Dictionary {
    fn from_ranked(items: Vec<Item>) -> Self {
        let index = items.iter().map(|item| (item.name().into(), item.id())).collect();
        Self { items, index }
    }

    /// Rebuilds a dictionary from `(name, count)` pairs listed in rank order.
    pub fn from_entries<S: Into<Box<str>>>(entries: impl IntoIterator<Item = (S, u64)>) -> Result<Self> {
        let mut items = Vec::new();
        let mut index = FxHashMap::default();
        for (rank, (name, count)) in entries.into_iter().enumerate() {
            let name: Box<str> = name.into();
            let id = ItemId(rank as u32);
            if index.insert(name.clone(), id).is_some() {
                return Err(Error::DuplicateItem(name.into()));
            }
            items.push(Item::new(name, id, count));
        }
        debug!(items = items.len(), "rebuilt dictionary");
        Ok(Self { items, index })
    }

    #[inline] pub fn len(&self) -> usize { self.items.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.items.is_empty() }
    /// Items in rank order.
    #[inline] pub fn items(&self) -> &[Item] { &self.items }

    #[inline]
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id.index())
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&Item> {
        self.index.get(name).map(|id| &self.items[id.index()])
    }

    /// Looks up `name`, failing for names that were never counted.
    pub fn resolve(&self, name: &str) -> Result<&Item> {
        self.get(name).ok_or_else(|| Error::UnknownItem(name.to_string()))
    }

    /// Resolves `names` into a canonical list.
    pub fn canonicalize<S: AsRef<str>>(&self, names: impl IntoIterator<Item = S>, unknown: UnknownItems) -> Result<CanonicalItems> {
        let mut ids = smallvec::SmallVec::<[ItemId; 8]>::new();
        for name in names {
            let name = name.as_ref();
            match (self.get(name), unknown) {
                (Some(item), _) => ids.push(item.id()),
                (None, UnknownItems::Drop) => { }
                (None, UnknownItems::Reject) => return Err(Error::UnknownItem(name.to_string())),
            }
        }
        Ok(CanonicalItems::from_ids(ids))
    }

    /// Resolves `names` into a canonical list, skipping names the dictionary does not contain.
    pub fn canonicalize_known<S: AsRef<str>>(&self, names: impl IntoIterator<Item = S>) -> CanonicalItems {
        names.into_iter().filter_map(|name| self.get(name.as_ref()).map(Item::id)).collect()
    }

    /// Checks that `id` was issued by a dictionary of this size.
    #[inline]
    pub fn check(&self, id: ItemId) -> Result<ItemId> {
        if id.index() < self.len() {
            Ok(id)
        } else {
            Err(Error::ItemOutOfRange { rank: id.rank(), len: self.len() })
        }
    }

    /// The names of `items`, in canonical order.
    pub fn names<'a>(&'a self, items: &'a CanonicalItems) -> impl Iterator<Item = &'a str> + 'a {
        items.iter().filter_map(move |id| self.item(id)).map(Item::name)
    }
}

impl HeapSize for Dictionary {
    fn heap_size(&self) -> (usize, usize) {
        let (l0, c0) = self.items.heap_size();
        let entry = std::mem::size_of::<(Box<str>, ItemId)>();
        let (l1, c1) = self.index.keys().fold((0, 0), |(l, c), name| {
            let (nl, nc) = name.heap_size();
            (l + nl, c + nc)
        });
        (l0 + l1 + entry * self.index.len(), c0 + c1 + entry * self.index.capacity())
    }
}
