//! Set: fixed-width hash table with hierarchical sub-sets.
//!
//! Elements live in `BUCKET_COUNT` buckets, each an unordered growable
//! array. Equality, hashing and disposal come from an `ElementOps` value
//! shared by the whole tree.
//!
//! Sub-sets aggregate upward: lookups and iteration on a set visit its own
//! buckets, then every sub-set depth-first in creation order. A sub-set
//! never sees what its ancestors hold. Mutations only touch the set they
//! are called on.

use crate::heap::{grow_capacity, reserve_exact, Tracked};
use crate::ops::ElementOps;
use core::fmt;
use core::mem;
use std::rc::Rc;

/// Number of buckets per set (prime).
pub const BUCKET_COUNT: usize = 31;

#[inline]
fn bucket_of(hash: u32) -> usize {
    hash as usize % BUCKET_COUNT
}

struct Bucket<T> {
    elements: Vec<T>,
    storage: Option<Tracked>,
}

impl<T> Bucket<T> {
    fn new() -> Self {
        Self {
            elements: Vec::new(),
            storage: None,
        }
    }

    fn push(&mut self, element: T) {
        if self.elements.len() == self.elements.capacity() {
            let capacity = grow_capacity(self.elements.capacity());
            let additional = capacity - self.elements.len();
            reserve_exact(&mut self.elements, additional);
            let bytes = self.elements.capacity() * mem::size_of::<T>();
            match &mut self.storage {
                Some(storage) => storage.resize(bytes),
                None => self.storage = Some(Tracked::new(bytes, &[])),
            }
        }
        self.elements.push(element);
    }
}

pub struct Set<T, C: ElementOps<T>> {
    ops: Rc<C>,
    context: C::Context,
    buckets: Box<[Bucket<T>]>,
    children: Vec<Set<T, C>>,
    _node: Tracked,
}

impl<T, C> Set<T, C>
where
    C: ElementOps<T>,
    C::Context: Default,
{
    #[track_caller]
    pub fn new(ops: C) -> Self {
        Self::with_context(ops, Default::default())
    }
}

impl<T, C: ElementOps<T>> Set<T, C> {
    #[track_caller]
    pub fn with_context(ops: C, context: C::Context) -> Self {
        Self::node(Rc::new(ops), context)
    }

    #[track_caller]
    fn node(ops: Rc<C>, context: C::Context) -> Self {
        Self {
            ops,
            context,
            buckets: (0..BUCKET_COUNT).map(|_| Bucket::new()).collect(),
            children: Vec::new(),
            _node: Tracked::new(mem::size_of::<Self>(), &[]),
        }
    }

    pub fn ops(&self) -> &C {
        &self.ops
    }

    pub fn context(&self) -> &C::Context {
        &self.context
    }

    /// Replace the context on this set and every descendant.
    pub fn set_context(&mut self, context: C::Context) {
        for child in &mut self.children {
            child.set_context(context.clone());
        }
        self.context = context;
    }

    /// Insert into this set (never a sub-set). An equal element already in
    /// the bucket is disposed and replaced in place.
    pub fn insert(&mut self, element: T) {
        let hash = self.ops.hash(&self.context, &element);
        let Self {
            ops,
            context,
            buckets,
            ..
        } = self;
        let bucket = &mut buckets[bucket_of(hash)];
        match bucket
            .elements
            .iter()
            .position(|e| ops.equals(context, e, &element))
        {
            Some(i) => {
                let old = mem::replace(&mut bucket.elements[i], element);
                ops.dispose(context, old);
            }
            None => bucket.push(element),
        }
    }

    /// Remove and dispose the element equal to `element` from this set only.
    /// The last element of the bucket takes its slot.
    pub fn remove(&mut self, element: &T) -> bool {
        let hash = self.ops.hash(&self.context, element);
        self.remove_where(hash, |ops: &C, cx: &C::Context, e: &T| {
            ops.equals(cx, e, element)
        })
    }

    pub fn exists(&self, element: &T) -> bool {
        self.value(element).is_some()
    }

    /// The stored element equal to `element`, searching sub-sets after the
    /// local buckets.
    pub fn value(&self, element: &T) -> Option<&T> {
        let hash = self.ops.hash(&self.context, element);
        self.locate(hash, &mut |ops: &C, cx: &C::Context, e: &T| {
            ops.equals(cx, e, element)
        })
    }

    /// First element, in iteration order, accepted by `predicate`.
    pub fn find<F>(&self, mut predicate: F) -> Option<&T>
    where
        F: FnMut(&C::Context, &T) -> bool,
    {
        let cx = &self.context;
        self.iter().find(|&e| predicate(cx, e))
    }

    pub fn for_each<F: FnMut(&T)>(&self, f: F) {
        self.iter().for_each(f)
    }

    /// Elements in this set and all sub-sets.
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Copy every element, in iteration order, through `copy`.
    pub fn to_array<U, F>(&self, mut copy: F) -> Vec<U>
    where
        F: FnMut(&C::Context, &T) -> U,
    {
        let mut out = Vec::with_capacity(self.count());
        out.extend(self.iter().map(|e| copy(&self.context, e)));
        out
    }

    pub fn iter(&self) -> Iter<'_, T, C> {
        Iter::new(self)
    }

    /// Dispose every local element and destroy all sub-sets. Ops and
    /// context are kept.
    pub fn clear(&mut self) {
        self.dispose_local();
        self.children.clear();
    }

    /// Append a new, empty sub-set sharing ops and context.
    #[track_caller]
    pub fn create_sub_set(&mut self) -> &mut Self {
        let child = Self::node(Rc::clone(&self.ops), self.context.clone());
        self.children.push(child);
        tracing::trace!(siblings = self.children.len(), "sub-set created");
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn sub_sets(&self) -> &[Self] {
        &self.children
    }

    pub fn sub_set_mut(&mut self, index: usize) -> Option<&mut Self> {
        self.children.get_mut(index)
    }

    pub(crate) fn locate<F>(&self, hash: u32, is_match: &mut F) -> Option<&T>
    where
        F: FnMut(&C, &C::Context, &T) -> bool,
    {
        let ops: &C = &self.ops;
        let local = self.buckets[bucket_of(hash)]
            .elements
            .iter()
            .find(|&e| is_match(ops, &self.context, e));
        if local.is_some() {
            return local;
        }
        self.children
            .iter()
            .find_map(|child| child.locate(hash, is_match))
    }

    pub(crate) fn locate_mut<F>(&mut self, hash: u32, is_match: &mut F) -> Option<&mut T>
    where
        F: FnMut(&C, &C::Context, &T) -> bool,
    {
        let index = bucket_of(hash);
        let Self {
            ops,
            context,
            buckets,
            children,
            ..
        } = self;
        let ops: &C = ops;
        let context: &C::Context = context;
        let elements = &mut buckets[index].elements;
        if let Some(pos) = elements.iter().position(|e| is_match(ops, context, e)) {
            return Some(&mut elements[pos]);
        }
        children
            .iter_mut()
            .find_map(|child| child.locate_mut(hash, is_match))
    }

    pub(crate) fn remove_where<F>(&mut self, hash: u32, mut is_match: F) -> bool
    where
        F: FnMut(&C, &C::Context, &T) -> bool,
    {
        let Self {
            ops,
            context,
            buckets,
            ..
        } = self;
        let ops: &C = ops;
        let context: &C::Context = context;
        let elements = &mut buckets[bucket_of(hash)].elements;
        match elements.iter().position(|e| is_match(ops, context, e)) {
            Some(i) => {
                let old = elements.swap_remove(i);
                ops.dispose(context, old);
                true
            }
            None => false,
        }
    }

    fn dispose_local(&mut self) {
        let Self {
            ops,
            context,
            buckets,
            ..
        } = self;
        for bucket in buckets.iter_mut() {
            for element in bucket.elements.drain(..) {
                ops.dispose(context, element);
            }
        }
    }
}

impl<T, C: ElementOps<T>> Drop for Set<T, C> {
    fn drop(&mut self) {
        // Sub-sets are dropped with `children` afterward.
        self.dispose_local();
    }
}

impl<T: fmt::Debug, C: ElementOps<T>> fmt::Debug for Set<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Depth-first iterator: local buckets in order, then each sub-set.
pub struct Iter<'a, T, C: ElementOps<T>> {
    current: Option<&'a Set<T, C>>,
    bucket: usize,
    index: usize,
    pending: Vec<&'a Set<T, C>>,
}

impl<'a, T, C: ElementOps<T>> Iter<'a, T, C> {
    fn new(root: &'a Set<T, C>) -> Self {
        let mut it = Self {
            current: None,
            bucket: 0,
            index: 0,
            pending: Vec::new(),
        };
        it.enter(root);
        it
    }

    fn enter(&mut self, set: &'a Set<T, C>) {
        self.current = Some(set);
        self.bucket = 0;
        self.index = 0;
        self.pending.extend(set.children.iter().rev());
    }
}

impl<'a, T, C: ElementOps<T>> Iterator for Iter<'a, T, C> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let set = match self.current {
                Some(set) => set,
                None => {
                    let set = self.pending.pop()?;
                    self.enter(set);
                    set
                }
            };
            while let Some(bucket) = set.buckets.get(self.bucket) {
                if let Some(e) = bucket.elements.get(self.index) {
                    self.index += 1;
                    return Some(e);
                }
                self.bucket += 1;
                self.index = 0;
            }
            self.current = None;
        }
    }
}

impl<'a, T, C: ElementOps<T>> IntoIterator for &'a Set<T, C> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::one_at_a_time;
    use std::cell::RefCell;

    // Hash is the value itself, so bucket placement is predictable.
    #[derive(Clone, Default)]
    struct Ident {
        disposed: Rc<RefCell<Vec<u32>>>,
    }

    impl ElementOps<u32> for Ident {
        type Context = ();
        fn equals(&self, _: &(), a: &u32, b: &u32) -> bool {
            a == b
        }
        fn hash(&self, _: &(), e: &u32) -> u32 {
            *e
        }
        fn dispose(&self, _: &(), e: u32) {
            self.disposed.borrow_mut().push(e);
        }
    }

    // Keyed record: equal by name only, so re-inserting replaces.
    #[derive(Clone, Default)]
    struct ByName {
        disposed: Rc<RefCell<Vec<(String, i32)>>>,
    }

    impl ElementOps<(String, i32)> for ByName {
        type Context = ();
        fn equals(&self, _: &(), a: &(String, i32), b: &(String, i32)) -> bool {
            a.0 == b.0
        }
        fn hash(&self, _: &(), e: &(String, i32)) -> u32 {
            one_at_a_time(e.0.as_bytes())
        }
        fn dispose(&self, _: &(), e: (String, i32)) {
            self.disposed.borrow_mut().push(e);
        }
    }

    fn rec(name: &str, v: i32) -> (String, i32) {
        (name.to_string(), v)
    }

    #[test]
    fn insert_then_exists_then_remove() {
        let mut s = Set::new(Ident::default());
        s.insert(7);
        assert!(s.exists(&7));
        assert!(!s.exists(&8));
        assert!(s.remove(&7));
        assert!(!s.exists(&7));
        assert!(!s.remove(&7));
        assert_eq!(*s.ops().disposed.borrow(), [7]);
    }

    #[test]
    fn duplicate_insert_replaces_and_disposes_old_once() {
        let ops = ByName::default();
        let disposed = Rc::clone(&ops.disposed);
        let mut s = Set::new(ops);
        s.insert(rec("a", 1));
        s.insert(rec("a", 2));
        assert_eq!(s.count(), 1);
        assert_eq!(s.value(&rec("a", 0)), Some(&rec("a", 2)));
        assert_eq!(*disposed.borrow(), [rec("a", 1)]);
    }

    #[test]
    fn iteration_is_bucket_order_then_sub_sets_depth_first() {
        let mut s = Set::new(Ident::default());
        for v in [40, 9, 1, 32] {
            s.insert(v);
        }
        {
            let child = s.create_sub_set();
            child.insert(5);
            child.create_sub_set().insert(2);
        }
        s.create_sub_set().insert(0);

        let seen: Vec<u32> = s.iter().copied().collect();
        assert_eq!(seen, [1, 32, 40, 9, 5, 2, 0]);

        let mut visited = Vec::new();
        s.for_each(|e| visited.push(*e));
        assert_eq!(visited, seen);
        assert_eq!(s.count(), 7);
        assert_eq!(s.to_array(|_, e| *e * 10), [10, 320, 400, 90, 50, 20, 0]);
    }

    #[test]
    fn remove_moves_last_into_the_hole() {
        let mut s = Set::new(Ident::default());
        for v in [1, 32, 63] {
            s.insert(v);
        }
        s.remove(&1);
        let seen: Vec<u32> = s.iter().copied().collect();
        assert_eq!(seen, [63, 32]);
    }

    #[test]
    fn sub_set_contents_visible_from_ancestors_only() {
        let mut root = Set::new(Ident::default());
        root.insert(100);
        {
            let child = root.create_sub_set();
            child.insert(200);
            child.create_sub_set().insert(300);
        }

        assert!(root.exists(&200));
        assert!(root.exists(&300));
        assert_eq!(root.find(|_, e| *e > 250), Some(&300));

        let child = root.sub_set_mut(0).unwrap();
        assert!(child.exists(&300));
        assert!(!child.exists(&100), "root content is not visible from a child");
        assert!(child.find(|_, e| *e == 100).is_none());
        assert_eq!(child.count(), 2);
    }

    #[test]
    fn remove_does_not_reach_into_sub_sets() {
        let mut root = Set::new(Ident::default());
        root.create_sub_set().insert(3);
        assert!(!root.remove(&3));
        assert!(root.exists(&3));
    }

    #[test]
    fn context_propagates_to_descendants() {
        #[derive(Clone)]
        struct Threshold;
        impl ElementOps<u32> for Threshold {
            type Context = u32;
            fn equals(&self, _: &u32, a: &u32, b: &u32) -> bool {
                a == b
            }
            fn hash(&self, _: &u32, e: &u32) -> u32 {
                *e
            }
        }

        let mut root = Set::with_context(Threshold, 1);
        root.create_sub_set().create_sub_set().insert(5);
        root.set_context(4);
        assert_eq!(*root.sub_sets()[0].context(), 4);
        assert_eq!(*root.sub_sets()[0].sub_sets()[0].context(), 4);
        assert_eq!(root.find(|limit, e| e > limit), Some(&5));
        root.set_context(9);
        assert_eq!(root.find(|limit, e| e > limit), None);
    }

    #[test]
    fn clear_disposes_locals_and_destroys_sub_sets() {
        let ops = Ident::default();
        let disposed = Rc::clone(&ops.disposed);
        let mut s = Set::new(ops);
        s.insert(1);
        s.create_sub_set().insert(2);
        s.clear();
        assert!(s.is_empty());
        assert!(s.sub_sets().is_empty());
        let mut got = disposed.borrow().clone();
        got.sort();
        assert_eq!(got, [1, 2]);

        // Still usable with the same ops.
        s.insert(3);
        assert!(s.exists(&3));
    }

    #[test]
    fn drop_disposes_whole_tree_once() {
        let ops = Ident::default();
        let disposed = Rc::clone(&ops.disposed);
        {
            let mut s = Set::new(ops);
            for v in 0..50 {
                s.insert(v);
            }
            let child = s.create_sub_set();
            child.insert(1000);
            child.create_sub_set().insert(2000);
        }
        let mut got = disposed.borrow().clone();
        got.sort();
        let mut expected: Vec<u32> = (0..50).collect();
        expected.extend([1000, 2000]);
        assert_eq!(got, expected);
    }

    #[test]
    fn colliding_elements_share_a_bucket() {
        let mut s = Set::new(Ident::default());
        // All land in bucket 0.
        let values: Vec<u32> = (0..20).map(|i| i * BUCKET_COUNT as u32).collect();
        for &v in &values {
            s.insert(v);
        }
        for &v in &values {
            assert!(s.exists(&v));
        }
        assert_eq!(s.iter().copied().collect::<Vec<_>>(), values);
    }

    #[test]
    fn storage_is_registered_with_the_heap() {
        use crate::heap;
        heap::configure(heap::Config::debug());
        {
            let mut s = Set::new(Ident::default());
            s.insert(1);
            assert_eq!(heap::live_count(), 2, "node and one bucket array");
            s.create_sub_set();
            assert_eq!(heap::live_count(), 3);
        }
        assert_eq!(heap::live_count(), 0);
    }
}
