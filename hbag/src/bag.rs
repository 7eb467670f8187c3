use std::{
    borrow::Borrow,
    fmt::{self, Debug, Formatter},
    hash::Hash,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use tracing::{debug, trace};

use crate::{counts::Counts, BagConfig, BagError};

mod snapshot;

/// A multiset which can be shared between threads.
///
/// Every bag owns a single reader/writer lock. Operations that may mutate
/// ([`insert_many`](Bag::insert_many), [`remove`](Bag::remove),
/// [`merge`](Bag::merge), [`clear`](Bag::clear)) hold it exclusively for their
/// full duration, queries hold it shared. Each call therefore takes effect
/// atomically. Calls block until the lock is acquired; there is no timeout.
///
/// Counts are `u64` and wrap around on overflow. Use
/// [`checked_insert_many`](Bag::checked_insert_many) to reject overflow instead.
pub struct Bag<K> {
    counts: RwLock<Counts<K>>,
}

impl<K> Default for Bag<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Bag<K> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// `capacity` pre-sizes the storage for that many distinct keys. It has
    /// no other effect.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_inner(Counts::with_capacity(capacity))
    }

    pub fn with_config(config: &BagConfig) -> Self {
        Self::with_capacity(config.capacity)
    }

    fn from_inner(counts: Counts<K>) -> Self {
        Self {
            counts: RwLock::new(counts),
        }
    }

    // Counts never holds a half-applied update, so a poisoned lock is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, Counts<K>> {
        self.counts.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Counts<K>> {
        self.counts.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn get_mut(&mut self) -> &mut Counts<K> {
        self.counts
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn into_inner(self) -> Counts<K> {
        self.counts
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Removes all keys. The allocated storage is kept for reuse.
    pub fn clear(&self) {
        let dropped = self.write().clear();
        debug!(occurrences = dropped, "Cleared bag");
    }

    /// Number of distinct keys.
    pub fn uniq_len(&self) -> usize {
        self.read().uniq_len()
    }

    /// Number of occurrences, duplicates included.
    pub fn len(&self) -> u64 {
        self.read().total()
    }

    /// Whether no key is present. Unlike `len() == 0` this stays correct
    /// after the total wrapped around.
    pub fn is_empty(&self) -> bool {
        self.read().uniq_len() == 0
    }

    /// Whether every key occurs exactly once. An empty bag is unique.
    pub fn is_uniq(&self) -> bool {
        self.read().is_uniq()
    }
}

impl<K: Eq + Hash> Bag<K> {
    /// Builds a bag holding `count` occurrences of each key. Repeated keys add up.
    pub fn from_counts(iter: impl IntoIterator<Item = (K, u64)>) -> Self {
        let mut counts = Counts::default();
        for (key, count) in iter {
            counts.add(key, count);
        }
        Self::from_inner(counts)
    }

    /// Adds one occurrence of `key` and returns the count it had before.
    pub fn insert(&self, key: K) -> u64 {
        self.insert_many(key, 1)
    }

    /// Adds `delta` occurrences of `key` and returns the count it had before.
    ///
    /// With `delta == 0` nothing changes and the current count is returned,
    /// read under the exclusive lock. Counts and [`len`](Bag::len) wrap around
    /// on overflow.
    pub fn insert_many(&self, key: K, delta: u64) -> u64 {
        self.write().add(key, delta)
    }

    /// Like [`insert_many`](Bag::insert_many), but fails without touching the
    /// bag if the count of `key` or the total would overflow.
    pub fn checked_insert_many(&self, key: K, delta: u64) -> Result<u64, BagError> {
        self.write().checked_add(key, delta)
    }

    /// Removes one occurrence of `key` and returns the count it had before,
    /// 0 if it was absent. A key whose count reaches zero is dropped.
    pub fn remove<Q>(&self, key: &Q) -> u64
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.write().remove_one(key)
    }

    /// Adds all occurrences of `other` to `self`. `other` stays unchanged.
    ///
    /// Both locks are held for the whole merge, so a concurrent writer on
    /// `other` can't cause a torn read. They are acquired in address order,
    /// which keeps `a.merge(&b)` racing `b.merge(&a)` from deadlocking.
    /// Merging a bag into itself doubles every count.
    pub fn merge(&self, other: &Bag<K>)
    where
        K: Clone,
    {
        if std::ptr::eq(self, other) {
            let mut counts = self.write();
            trace!(
                keys = counts.uniq_len(),
                occurrences = counts.total(),
                "Merging bag into itself"
            );
            counts.double();
            return;
        }

        let (mut target, source) = if (self as *const Self) < (other as *const Self) {
            let target = self.write();
            (target, other.read())
        } else {
            let source = other.read();
            (self.write(), source)
        };
        trace!(
            keys = source.uniq_len(),
            occurrences = source.total(),
            "Merging bag"
        );
        target.merge_from(&source);
    }

    /// Current count of `key`, `None` if absent. Never `Some(0)`.
    pub fn contains<Q>(&self, key: &Q) -> Option<u64>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.read().get(key)
    }

    /// Current count of `key`, 0 if absent.
    pub fn count<Q>(&self, key: &Q) -> u64
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.contains(key).unwrap_or(0)
    }

    /// Same as [`contains`](Bag::contains), handing the queried key back.
    pub fn get(&self, key: K) -> (K, Option<u64>) {
        let count = self.read().get(&key);
        (key, count)
    }
}

impl<K: Clone> Clone for Bag<K> {
    fn clone(&self) -> Self {
        Self::from_inner(self.read().clone())
    }
}

impl<K: Debug> Debug for Bag<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let counts = self.read();
        f.debug_struct("Bag")
            .field("len", &counts.total())
            .field("counts", counts.as_map())
            .finish()
    }
}

impl<K: Eq + Hash> FromIterator<K> for Bag<K> {
    fn from_iter<T: IntoIterator<Item = K>>(iter: T) -> Self {
        Self::from_inner(iter.into_iter().collect())
    }
}

impl<K: Eq + Hash> Extend<K> for Bag<K> {
    fn extend<T: IntoIterator<Item = K>>(&mut self, iter: T) {
        self.get_mut().extend(iter);
    }
}

impl<const SIZE: usize, K: Eq + Hash> From<[(K, u64); SIZE]> for Bag<K> {
    fn from(input: [(K, u64); SIZE]) -> Self {
        Self::from_counts(input)
    }
}
