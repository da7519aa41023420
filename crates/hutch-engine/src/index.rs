use std::collections::BTreeMap;
use std::ops::Bound;

use crate::key::IndexKey;

/// Stable handle into a collection's item arena.
pub type Slot = usize;

/// Ordered multimap from [`IndexKey`] to document slot.
///
/// Entries with equal keys keep insertion order; a per-index sequence number
/// breaks ties inside the backing map, so iteration over an equality run is
/// deterministic.
#[derive(Debug, Clone)]
pub struct CollectionIndex {
    field: String,
    entries: BTreeMap<(IndexKey, u64), Slot>,
    next_seq: u64,
}

impl CollectionIndex {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            entries: BTreeMap::new(),
            next_seq: 0,
        }
    }

    /// The top-level document field this index covers.
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, key: IndexKey, slot: Slot) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert((key, seq), slot);
    }

    /// Remove the single entry for `slot` under `key`, if present.
    pub fn remove(&mut self, key: &IndexKey, slot: Slot) {
        let run: Vec<(IndexKey, u64)> = self
            .entries
            .range(Self::run_bounds(key))
            .filter(|(_, s)| **s == slot)
            .map(|(k, _)| k.clone())
            .collect();
        if let Some(entry_key) = run.into_iter().next() {
            self.entries.remove(&entry_key);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Slots whose key equals `key`, in insertion order.
    pub fn find<'a>(&'a self, key: &IndexKey) -> impl Iterator<Item = Slot> + 'a {
        self.entries.range(Self::run_bounds(key)).map(|(_, s)| *s)
    }

    /// Slots whose key lies in the inclusive range `[min, max]`, in key order.
    pub fn range<'a>(
        &'a self,
        min: &IndexKey,
        max: &IndexKey,
    ) -> impl Iterator<Item = Slot> + 'a {
        self.entries
            .range((
                Bound::Included((min.clone(), 0)),
                Bound::Included((max.clone(), u64::MAX)),
            ))
            .map(|(_, s)| *s)
    }

    /// Full ordered walk.
    pub fn iter(&self) -> impl Iterator<Item = (&IndexKey, Slot)> + '_ {
        self.entries.iter().map(|((k, _), s)| (k, *s))
    }

    fn run_bounds(key: &IndexKey) -> (Bound<(IndexKey, u64)>, Bound<(IndexKey, u64)>) {
        (
            Bound::Included((key.clone(), 0)),
            Bound::Included((key.clone(), u64::MAX)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(v: serde_json::Value) -> IndexKey {
        IndexKey::new(&v).unwrap()
    }

    #[test]
    fn equal_keys_keep_insertion_order() {
        let mut index = CollectionIndex::new("age");
        index.insert(key(json!(20)), 7);
        index.insert(key(json!(20)), 3);
        index.insert(key(json!(20)), 9);
        let run: Vec<Slot> = index.find(&key(json!(20))).collect();
        assert_eq!(run, vec![7, 3, 9]);
    }

    #[test]
    fn find_hits_only_the_equality_run() {
        let mut index = CollectionIndex::new("age");
        index.insert(key(json!(10)), 0);
        index.insert(key(json!(20)), 1);
        index.insert(key(json!(30)), 2);
        assert_eq!(index.find(&key(json!(20))).collect::<Vec<_>>(), vec![1]);
        assert!(index.find(&key(json!(25))).next().is_none());
    }

    #[test]
    fn range_is_inclusive_on_both_bounds() {
        let mut index = CollectionIndex::new("age");
        for (slot, age) in [10, 15, 20, 25, 30].iter().enumerate() {
            index.insert(key(json!(age)), slot);
        }
        let hits: Vec<Slot> = index.range(&key(json!(15)), &key(json!(25))).collect();
        assert_eq!(hits, vec![1, 2, 3]);
    }

    #[test]
    fn remove_targets_one_slot_under_shared_key() {
        let mut index = CollectionIndex::new("age");
        index.insert(key(json!(20)), 1);
        index.insert(key(json!(20)), 2);
        index.remove(&key(json!(20)), 1);
        assert_eq!(index.find(&key(json!(20))).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn iter_yields_keys_in_order() {
        let mut index = CollectionIndex::new("age");
        index.insert(key(json!(30)), 0);
        index.insert(key(json!(10)), 1);
        index.insert(key(json!("x")), 2);
        index.insert(key(json!(null)), 3);
        let slots: Vec<Slot> = index.iter().map(|(_, s)| s).collect();
        assert_eq!(slots, vec![3, 1, 0, 2]);

        let keys: Vec<&IndexKey> = index.iter().map(|(k, _)| k).collect();
        for pair in keys.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn mixed_type_range_follows_type_rank() {
        let mut index = CollectionIndex::new("v");
        index.insert(key(json!(null)), 0);
        index.insert(key(json!(5)), 1);
        index.insert(key(json!("a")), 2);
        let hits: Vec<Slot> = index.range(&key(json!(false)), &key(json!("zzz"))).collect();
        assert_eq!(hits, vec![1, 2]);
    }
}
