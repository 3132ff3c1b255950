use std::collections::HashMap;
use std::iter::FromIterator;

use crate::lalr::SymbolId;

/// Sorted keys with optional per-key data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortedSet<K, D = ()> {
    keys: Vec<K>,
    data: Vec<D>,
}

pub type SymSet = SortedSet<SymbolId>;

impl<K, D> Default for SortedSet<K, D> {
    fn default() -> Self {
        SortedSet {
            keys: Vec::new(),
            data: Vec::new(),
        }
    }
}

impl<K: Ord, D> SortedSet<K, D> {
    pub fn new() -> Self {
        SortedSet::default()
    }

    /// Returns false, keeping the existing data, if the key is already present
    pub fn insert(&mut self, key: K, data: D) -> bool {
        match self.keys.binary_search(&key) {
            Ok(_) => false,
            Err(pos) => {
                self.keys.insert(pos, key);
                self.data.insert(pos, data);
                true
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<&D> {
        self.keys.binary_search(key).ok().map(|pos| &self.data[pos])
    }

    pub fn contains(&self, key: &K) -> bool {
        self.keys.binary_search(key).is_ok()
    }

    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    pub fn data(&self) -> &[D] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [D] {
        &mut self.data
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &D)> {
        self.keys.iter().zip(self.data.iter())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<K: Ord + Clone> SortedSet<K, ()> {
    pub fn add(&mut self, key: K) -> bool {
        self.insert(key, ())
    }

    pub fn remove(&mut self, key: &K) -> bool {
        match self.keys.binary_search(key) {
            Ok(pos) => {
                self.keys.remove(pos);
                self.data.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Add all keys of `other`, returning whether anything was added
    pub fn union(&mut self, other: &SortedSet<K, ()>) -> bool {
        let mut changed = false;
        for key in other.keys.iter() {
            changed |= self.add(key.clone());
        }
        changed
    }
}

impl<K: Ord> FromIterator<K> for SortedSet<K, ()> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut keys: Vec<K> = iter.into_iter().collect();
        keys.sort();
        keys.dedup();
        let data = keys.iter().map(|_| ()).collect();
        SortedSet { keys, data }
    }
}

/// Handle of an interned symbol set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetHandle(usize);

/// Symbol sets deduplicated by content
#[derive(Debug, Clone)]
pub struct SetTable {
    sets: Vec<SymSet>,
    index: HashMap<SymSet, SetHandle>,
}

impl Default for SetTable {
    fn default() -> Self {
        SetTable::new()
    }
}

impl SetTable {
    /// Handle of the empty set, which every table contains
    pub const EMPTY: SetHandle = SetHandle(0);

    pub fn new() -> Self {
        let mut table = SetTable {
            sets: Vec::new(),
            index: HashMap::new(),
        };
        table.intern(SymSet::new());
        table
    }

    pub fn intern(&mut self, set: SymSet) -> SetHandle {
        if let Some(handle) = self.index.get(&set) {
            return *handle;
        }
        let handle = SetHandle(self.sets.len());
        self.sets.push(set.clone());
        self.index.insert(set, handle);
        handle
    }

    pub fn get(&self, handle: SetHandle) -> &SymSet {
        &self.sets[handle.0]
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sorted_insert() {
        let mut set: SortedSet<usize, &str> = SortedSet::new();
        assert!(set.insert(5, "five"));
        assert!(set.insert(1, "one"));
        assert!(!set.insert(5, "again"));
        assert_eq!(set.keys(), &[1, 5]);
        assert_eq!(set.get(&5), Some(&"five"));
        assert_eq!(set.get(&2), None);
    }

    #[test]
    fn test_union() {
        let mut a: SymSet = vec![3, 1].into_iter().collect();
        let b: SymSet = vec![2, 3].into_iter().collect();
        assert!(a.union(&b));
        assert!(!a.union(&b));
        assert_eq!(a.keys(), &[1, 2, 3]);
        assert!(a.remove(&2));
        assert!(!a.contains(&2));
    }

    #[test]
    fn test_interning() {
        let mut table = SetTable::new();
        let a = table.intern(vec![4, 2].into_iter().collect());
        let b = table.intern(vec![2, 4, 4].into_iter().collect());
        assert_eq!(a, b);
        assert_eq!(table.intern(SymSet::new()), SetTable::EMPTY);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(a).keys(), &[2, 4]);
    }
}
