use std::{
    collections::HashMap,
    fmt::{self, Formatter},
    hash::Hash,
    marker::PhantomData,
};

use serde::{
    de::{Error, MapAccess, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};

use super::Bag;
use crate::{counts::Counts, BagError};

impl<K: Clone> Bag<K> {
    /// Copies the counts out under the shared lock. Iteration order is unspecified.
    pub fn snapshot(&self) -> HashMap<K, u64> {
        self.read().as_map().clone()
    }
}

impl<K> Bag<K> {
    pub fn into_counts(self) -> HashMap<K, u64> {
        self.into_inner().into_map()
    }
}

// Serialized as { key: count, ... }, written while holding the shared lock.
impl<K: Serialize> Serialize for Bag<K> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let counts = self.read();
        serializer.collect_map(counts.iter())
    }
}

impl<'de, K: Deserialize<'de> + Hash + Eq> Deserialize<'de> for Bag<K> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(CountsVisitor::<K>(PhantomData))
    }
}

// The size hint comes from the input and is not trusted beyond this.
const MAX_PREALLOCATED_KEYS: usize = 4096;

struct CountsVisitor<K>(PhantomData<K>);

impl<'de, K: Deserialize<'de> + Hash + Eq> Visitor<'de> for CountsVisitor<K> {
    type Value = Bag<K>;

    fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
        write!(formatter, "a map of keys to non-zero occurrence counts")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let capacity = map.size_hint().unwrap_or(0).min(MAX_PREALLOCATED_KEYS);
        let mut counts = Counts::with_capacity(capacity);
        while let Some((key, count)) = map.next_entry::<K, u64>()? {
            if count == 0 {
                return Err(A::Error::custom(BagError::ZeroCount));
            }
            counts.checked_add(key, count).map_err(A::Error::custom)?;
        }

        Ok(Bag::from_inner(counts))
    }
}
