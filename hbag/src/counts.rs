use std::{
    borrow::Borrow,
    collections::{hash_map::Entry, HashMap},
    hash::Hash,
};

use tracing::{error, warn};

use crate::BagError;

/// Occurrence counts together with their running sum.
///
/// A key whose count drops to zero is removed, so every stored count is > 0
/// and `total` is the (wrapping) sum of all stored counts.
#[derive(Debug, Clone)]
pub(crate) struct Counts<K> {
    map: HashMap<K, u64>,
    total: u64,
}

impl<K> Default for Counts<K> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<K> Counts<K> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
            total: 0,
        }
    }

    pub(crate) fn total(&self) -> u64 {
        self.total
    }

    pub(crate) fn uniq_len(&self) -> usize {
        self.map.len()
    }

    pub(crate) fn is_uniq(&self) -> bool {
        self.total == self.map.len() as u64
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&K, &u64)> {
        self.map.iter()
    }

    pub(crate) fn as_map(&self) -> &HashMap<K, u64> {
        &self.map
    }

    pub(crate) fn into_map(self) -> HashMap<K, u64> {
        self.map
    }

    /// Returns the number of occurrences dropped. Capacity is kept.
    pub(crate) fn clear(&mut self) -> u64 {
        self.map.clear();
        std::mem::take(&mut self.total)
    }

    /// Adds every count to itself, as if merging a copy of `self` into `self`.
    pub(crate) fn double(&mut self) {
        let added = self.total;
        self.map.retain(|_, count| {
            *count = count.wrapping_add(*count);
            *count != 0
        });
        self.total = self.total.wrapping_add(added);
    }
}

impl<K: Eq + Hash> Counts<K> {
    pub(crate) fn get<Q>(&self, key: &Q) -> Option<u64>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.get(key).copied()
    }

    /// Adds `delta` occurrences of `key` and returns the count it had before.
    ///
    /// Counts and the total wrap around on overflow. A count that wraps to
    /// exactly zero removes the key.
    pub(crate) fn add(&mut self, key: K, delta: u64) -> u64 {
        if delta == 0 {
            return self.get(&key).unwrap_or(0);
        }

        let previous = match self.map.entry(key) {
            Entry::Occupied(mut entry) => {
                let previous = *entry.get();
                let (next, wrapped) = previous.overflowing_add(delta);
                if wrapped {
                    warn!(previous, delta, "Occurrence count wrapped around");
                }
                if next == 0 {
                    entry.remove();
                } else {
                    *entry.get_mut() = next;
                }
                previous
            }
            Entry::Vacant(entry) => {
                entry.insert(delta);
                0
            }
        };

        let (total, wrapped) = self.total.overflowing_add(delta);
        if wrapped {
            warn!(previous = self.total, delta, "Total occurrence count wrapped around");
        }
        self.total = total;
        previous
    }

    /// Like [`Counts::add`], but refuses to wrap. Nothing changes on error.
    pub(crate) fn checked_add(&mut self, key: K, delta: u64) -> Result<u64, BagError> {
        let count = self.get(&key).unwrap_or(0);
        if count.checked_add(delta).is_none() {
            return Err(BagError::Overflow { count, delta });
        }
        if self.total.checked_add(delta).is_none() {
            return Err(BagError::TotalOverflow {
                total: self.total,
                delta,
            });
        }
        Ok(self.add(key, delta))
    }

    /// Removes one occurrence of `key` and returns the count it had before.
    pub(crate) fn remove_one<Q>(&mut self, key: &Q) -> u64
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(count) = self.map.get_mut(key) else {
            return 0;
        };
        let previous = *count;
        debug_assert_ne!(previous, 0, "stored occurrence count of zero");

        match previous {
            0 => {
                error!("Dropping key with a stored occurrence count of zero");
                self.map.remove(key);
                return 0;
            }
            1 => {
                self.map.remove(key);
            }
            _ => *count -= 1,
        }
        self.total = self.total.wrapping_sub(1);
        previous
    }

    pub(crate) fn merge_from(&mut self, other: &Counts<K>)
    where
        K: Clone,
    {
        self.map.reserve(other.map.len());
        for (key, count) in other.iter() {
            self.add(key.clone(), *count);
        }
    }
}

impl<K: Eq + Hash> FromIterator<K> for Counts<K> {
    fn from_iter<T: IntoIterator<Item = K>>(iter: T) -> Self {
        let mut counts = Counts::default();
        counts.extend(iter);
        counts
    }
}

impl<K: Eq + Hash> Extend<K> for Counts<K> {
    fn extend<T: IntoIterator<Item = K>>(&mut self, iter: T) {
        let iter = iter.into_iter();
        self.map.reserve(iter.size_hint().0);
        for key in iter {
            self.add(key, 1);
        }
    }
}
