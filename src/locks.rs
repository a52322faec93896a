//! A fixed bank of lock shards addressed by identity.
//!
//! Instead of one lock per tree node (too much memory for millions of nodes) or one
//! global lock (no parallelism), mutation of a node or item takes the shard at
//! `key % LOCK_SHARDS`. Two unrelated keys share a shard with probability about
//! `1 / LOCK_SHARDS`; when they do, they merely serialize. Each call site holds a
//! single shard at a time, so there is no lock ordering to get wrong.

use parking_lot::RwLock;

/// Number of shards; prime, so that strided ids spread evenly.
pub const LOCK_SHARDS: usize = 97;

/// `LOCK_SHARDS` reader-writer locks, each owning the state it guards.
pub struct LockBank<T> {
    shards: Box<[RwLock<T>]>,
}

impl<T> LockBank<T> {
    /// Builds the bank, calling `init` once per shard index.
    pub fn from_fn(mut init: impl FnMut(usize) -> T) -> Self {
        let shards = (0 .. LOCK_SHARDS).map(|index| RwLock::new(init(index))).collect();
        Self { shards }
    }

    /// The shard index guarding `key`.
    #[inline(always)]
    pub fn index_of(key: u64) -> usize {
        (key % LOCK_SHARDS as u64) as usize
    }

    /// The shard guarding `key`.
    #[inline(always)]
    pub fn shard(&self, key: u64) -> &RwLock<T> {
        &self.shards[Self::index_of(key)]
    }

    /// Releases the guarded state of every shard, in shard order.
    pub fn into_inner(self) -> impl Iterator<Item = T> {
        self.shards.into_vec().into_iter().map(RwLock::into_inner)
    }
}

impl<T: Default> Default for LockBank<T> {
    fn default() -> Self {
        Self::from_fn(|_| T::default())
    }
}
