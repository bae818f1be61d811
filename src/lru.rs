use entry::Entry;
use slab::Slab;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::iter::FusedIterator;

mod entry;
mod slab;

pub(crate) type RandomState = ahash::RandomState;

/// Key-value store with least-recently-used eviction.
///
/// Every operation is O(1). Entries are kept in a recency list ordered from most to least recently
/// used; [`Lru::insert`] and [`Lru::get`] move the touched entry to the front. Once the number of
/// entries exceeds the capacity, the entry at the back is evicted.
///
/// A capacity of `0` means the store is unbounded. Entries then only leave the store through
/// [`Lru::remove`] or [`Lru::evict`].
///
/// The store is not synchronized. Callers that share it between threads have to confine it to a
/// single owner.
///
/// # Examples
///
/// ```rust
/// use proxy_cache::Lru;
///
/// // a store with a limited number (2) of slots
/// let mut lru = Lru::with_capacity(2);
///
/// lru.insert("key-a", "a");
/// lru.insert("key-b", "b");
///
/// assert_eq!(lru.get("key-a"), Some(&"a"));
/// assert_eq!(lru.get("key-b"), Some(&"b"));
///
/// // a new key evicts the least recently used one, i.e. "key-a"
/// lru.insert("key-c", "c");
///
/// assert_eq!(lru.to_string(), "key-c:c\nkey-b:b\n");
/// ```
pub struct Lru<K, V, S = RandomState> {
    capacity: usize,
    index: HashMap<K, usize, S>,
    entries: Slab<Entry<K, V>>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<K, V> Lru<K, V, RandomState>
where
    K: Clone + Eq + Hash,
{
    /// Creates a new store holding at most `capacity` entries. A capacity of `0` disables
    /// automatic eviction.
    pub fn with_capacity(capacity: usize) -> Lru<K, V, RandomState> {
        Lru::with_capacity_and_hasher(capacity, Default::default())
    }
}

impl<K, V, S> Lru<K, V, S>
where
    K: Clone + Eq + Hash,
    S: BuildHasher,
{
    /// Creates a new store holding at most `capacity` entries, using `hash_builder` to hash the
    /// keys.
    ///
    /// Nothing is allocated up front. The store grows as entries are inserted.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Lru<K, V, S> {
        Self {
            capacity,
            index: HashMap::with_hasher(hash_builder),
            entries: Slab::new(),
            head: None,
            tail: None,
        }
    }

    /// Inserts a key-value pair as the most recently used entry.
    ///
    /// If the store did have this key present, the value is updated, and the old value is
    /// returned. Otherwise [`None`] is returned and, if the store is bounded and now holds more
    /// entries than its capacity, the least recently used entry is evicted.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&index) = self.index.get(&key) {
            self.promote(index);
            let entry = self
                .entries
                .get_mut(index)
                .expect("an entry must exist for an indexed key");
            return Some(entry.replace_value(value));
        }

        let index = self.entries.insert(Entry::new(key.clone(), value));
        self.push_front(index);
        self.index.insert(key, index);

        if self.capacity != 0 && self.len() > self.capacity {
            self.evict();
        }

        None
    }

    /// Returns the value corresponding to the key and marks the entry as most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let index = *self.index.get(key)?;
        self.promote(index);
        self.entries.get(index).map(|entry| &entry.value)
    }

    /// Returns the value corresponding to the key without touching the recency order.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let index = *self.index.get(key)?;
        self.entries.get(index).map(|entry| &entry.value)
    }

    /// Removes the key from the store, returning its value if the key was present.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let index = self.index.remove(key)?;
        self.unlink(index);
        self.entries.remove(index).map(|entry| entry.value)
    }

    /// Removes the least recently used entry regardless of the capacity.
    ///
    /// Returns [`None`] if the store is empty.
    pub fn evict(&mut self) -> Option<(K, V)> {
        let index = self.tail?;
        self.unlink(index);

        let entry = self
            .entries
            .remove(index)
            .expect("the tail must point to an entry");
        self.index.remove(&entry.key);

        Some(entry.into_pair())
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.index.clear();
        self.entries.clear();
        self.head = None;
        self.tail = None;
    }
}

impl<K, V, S> Lru<K, V, S> {
    /// Returns the number of entries in the store.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the configured capacity. `0` means unbounded.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterates over the entries from the most to the least recently used one.
    ///
    /// Iterating does not change the recency order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            entries: &self.entries,
            cursor: self.head,
            remaining: self.len(),
        }
    }

    fn promote(&mut self, index: usize) {
        if self.head == Some(index) {
            return;
        }

        self.unlink(index);
        self.push_front(index);
    }

    fn push_front(&mut self, index: usize) {
        let old_head = self.head;

        let entry = self
            .entries
            .get_mut(index)
            .expect("an entry must exist before it is linked");
        entry.prev = None;
        entry.next = old_head;

        match old_head {
            Some(head) => {
                self.entries
                    .get_mut(head)
                    .expect("the head must point to an entry")
                    .prev = Some(index);
            }
            None => self.tail = Some(index),
        }

        self.head = Some(index);
    }

    fn unlink(&mut self, index: usize) {
        let entry = self
            .entries
            .get_mut(index)
            .expect("an entry must exist before it is unlinked");
        let (prev, next) = (entry.prev.take(), entry.next.take());

        match prev {
            Some(prev) => {
                self.entries
                    .get_mut(prev)
                    .expect("a linked neighbour must exist")
                    .next = next;
            }
            None => self.head = next,
        }

        match next {
            Some(next) => {
                self.entries
                    .get_mut(next)
                    .expect("a linked neighbour must exist")
                    .prev = prev;
            }
            None => self.tail = prev,
        }
    }
}

impl<K, V, S> fmt::Debug for Lru<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Dumps the entries as `key:value` lines from the most to the least recently used one.
impl<K, V, S> fmt::Display for Lru<K, V, S>
where
    K: fmt::Display,
    V: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.iter() {
            writeln!(f, "{key}:{value}")?;
        }
        Ok(())
    }
}

impl<'a, K, V, S> IntoIterator for &'a Lru<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the entries of an [`Lru`], created by [`Lru::iter`].
pub struct Iter<'a, K, V> {
    entries: &'a Slab<Entry<K, V>>,
    cursor: Option<usize>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.get(self.cursor?)?;
        self.cursor = entry.next;
        self.remaining -= 1;
        Some((&entry.key, &entry.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}
