//! Map: key/value pairs stored in a `Set`.
//!
//! Pair equality and hash delegate to the key comparator alone, and pair
//! disposal releases the key through the key comparator and the value
//! through the value disposer. Insert is an upsert; sub-maps aggregate into
//! their ancestors exactly like sub-sets.

use crate::ops::{Dispose, DropElement, ElementOps};
use crate::set::{self, Set};
use core::fmt;

/// A stored entry.
pub struct Pair<K, V> {
    key: K,
    value: V,
}

impl<K, V> Pair<K, V> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }
}

/// Pair comparator built from a key comparator and a value disposer.
pub struct PairOps<C, D> {
    keys: C,
    values: D,
}

impl<K, V, C, D> ElementOps<Pair<K, V>> for PairOps<C, D>
where
    C: ElementOps<K>,
    D: Dispose<V>,
{
    type Context = C::Context;

    fn equals(&self, cx: &C::Context, a: &Pair<K, V>, b: &Pair<K, V>) -> bool {
        self.keys.equals(cx, &a.key, &b.key)
    }

    fn hash(&self, cx: &C::Context, element: &Pair<K, V>) -> u32 {
        self.keys.hash(cx, &element.key)
    }

    fn dispose(&self, cx: &C::Context, element: Pair<K, V>) {
        let Pair { key, value } = element;
        self.keys.dispose(cx, key);
        self.values.dispose(value);
    }
}

#[repr(transparent)]
pub struct Map<K, V, C, D = DropElement>
where
    C: ElementOps<K>,
    D: Dispose<V>,
{
    set: Set<Pair<K, V>, PairOps<C, D>>,
}

impl<K, V, C> Map<K, V, C>
where
    C: ElementOps<K>,
    C::Context: Default,
{
    #[track_caller]
    pub fn new(keys: C) -> Self {
        Self::with_disposer(keys, DropElement)
    }
}

impl<K, V, C, D> Map<K, V, C, D>
where
    C: ElementOps<K>,
    C::Context: Default,
    D: Dispose<V>,
{
    #[track_caller]
    pub fn with_disposer(keys: C, values: D) -> Self {
        Self::with_context(keys, values, Default::default())
    }
}

impl<K, V, C, D> Map<K, V, C, D>
where
    C: ElementOps<K>,
    D: Dispose<V>,
{
    #[track_caller]
    pub fn with_context(keys: C, values: D, context: C::Context) -> Self {
        Self {
            set: Set::with_context(PairOps { keys, values }, context),
        }
    }

    fn from_set_mut(set: &mut Set<Pair<K, V>, PairOps<C, D>>) -> &mut Self {
        // SAFETY: `Map` is `repr(transparent)` over its only field.
        unsafe { &mut *(set as *mut Set<Pair<K, V>, PairOps<C, D>> as *mut Self) }
    }

    fn key_hash(&self, key: &K) -> u32 {
        self.set.ops().keys.hash(self.set.context(), key)
    }

    /// Insert or replace. A replaced entry has its old key and old value
    /// disposed exactly once.
    pub fn insert(&mut self, key: K, value: V) {
        self.set.insert(Pair { key, value });
    }

    /// Remove the entry for `key` from this map (not from sub-maps).
    pub fn remove(&mut self, key: &K) -> bool {
        let hash = self.key_hash(key);
        self.set
            .remove_where(hash, |ops: &PairOps<C, D>, cx: &C::Context, pair: &Pair<K, V>| {
                ops.keys.equals(cx, &pair.key, key)
            })
    }

    pub fn value(&self, key: &K) -> Option<&V> {
        let hash = self.key_hash(key);
        self.set
            .locate(
                hash,
                &mut |ops: &PairOps<C, D>, cx: &C::Context, pair: &Pair<K, V>| {
                    ops.keys.equals(cx, &pair.key, key)
                },
            )
            .map(|pair| &pair.value)
    }

    pub fn value_mut(&mut self, key: &K) -> Option<&mut V> {
        let hash = self.key_hash(key);
        self.set
            .locate_mut(
                hash,
                &mut |ops: &PairOps<C, D>, cx: &C::Context, pair: &Pair<K, V>| {
                    ops.keys.equals(cx, &pair.key, key)
                },
            )
            .map(|pair| &mut pair.value)
    }

    pub fn has_key(&self, key: &K) -> bool {
        self.value(key).is_some()
    }

    pub fn count(&self) -> usize {
        self.set.count()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn for_each<F: FnMut(&K, &V)>(&self, mut f: F) {
        self.set.for_each(|pair| f(&pair.key, &pair.value))
    }

    /// First entry, in iteration order, accepted by `predicate`.
    pub fn find<F>(&self, mut predicate: F) -> Option<(&K, &V)>
    where
        F: FnMut(&C::Context, &K, &V) -> bool,
    {
        self.set
            .find(|cx, pair| predicate(cx, &pair.key, &pair.value))
            .map(|pair| (&pair.key, &pair.value))
    }

    pub fn iter(&self) -> Iter<'_, K, V, C, D> {
        Iter {
            inner: self.set.iter(),
        }
    }

    /// Dispose every local entry and destroy all sub-maps.
    pub fn clear(&mut self) {
        self.set.clear()
    }

    pub fn context(&self) -> &C::Context {
        self.set.context()
    }

    pub fn set_context(&mut self, context: C::Context) {
        self.set.set_context(context)
    }

    /// Append a new sub-map whose entries are visible from this map.
    #[track_caller]
    pub fn create_sub_map(&mut self) -> &mut Self {
        Self::from_set_mut(self.set.create_sub_set())
    }

    pub fn sub_map_count(&self) -> usize {
        self.set.sub_sets().len()
    }

    pub fn sub_map_mut(&mut self, index: usize) -> Option<&mut Self> {
        self.set.sub_set_mut(index).map(Self::from_set_mut)
    }
}

impl<K, V, C, D> fmt::Debug for Map<K, V, C, D>
where
    K: fmt::Debug,
    V: fmt::Debug,
    C: ElementOps<K>,
    D: Dispose<V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Entries of a map and its sub-maps, depth-first.
pub struct Iter<'a, K, V, C, D>
where
    C: ElementOps<K>,
    D: Dispose<V>,
{
    inner: set::Iter<'a, Pair<K, V>, PairOps<C, D>>,
}

impl<'a, K, V, C, D> Iterator for Iter<'a, K, V, C, D>
where
    C: ElementOps<K>,
    D: Dispose<V>,
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|pair| (&pair.key, &pair.value))
    }
}
