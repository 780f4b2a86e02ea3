//! Vector: growable array with a one-way freeze into shared storage.
//!
//! `Vector` is uniquely owned and is the only type with mutating methods.
//! `freeze` turns it into a `SharedVector`, whose copies alias the same
//! storage. Elements are disposed exactly once, when the last handle goes.
//!
//! ```compile_fail
//! use rc_collections::Vector;
//! let shared = Vector::<i32>::new().freeze();
//! shared.push_back(1);
//! ```

use crate::error::{contract, Error, Result};
use crate::heap::{grow_capacity, reserve_exact, Tracked};
use crate::ops::{Dispose, DropElement};
use crate::share::{release_rc, Released};
use core::fmt;
use core::mem;
use core::ops::Index;
use std::rc::Rc;

pub const DEFAULT_CAPACITY: usize = 16;

struct Storage<T, D: Dispose<T>> {
    elements: Vec<T>,
    disposer: D,
    tracked: Tracked,
}

impl<T, D: Dispose<T>> Storage<T, D> {
    #[track_caller]
    fn with_capacity(disposer: D, capacity: usize) -> Self {
        let mut elements = Vec::new();
        reserve_exact(&mut elements, capacity);
        Self {
            tracked: Tracked::new(elements.capacity() * mem::size_of::<T>(), &[]),
            elements,
            disposer,
        }
    }

    fn reserve_one(&mut self) {
        if self.elements.len() == self.elements.capacity() {
            let capacity = grow_capacity(self.elements.capacity());
            let additional = capacity - self.elements.len();
            reserve_exact(&mut self.elements, additional);
            self.tracked
                .resize(self.elements.capacity() * mem::size_of::<T>());
        }
    }
}

impl<T, D: Dispose<T>> Drop for Storage<T, D> {
    fn drop(&mut self) {
        for element in self.elements.drain(..) {
            self.disposer.dispose(element);
        }
    }
}

/// Uniquely owned, mutable vector.
pub struct Vector<T, D: Dispose<T> = DropElement> {
    storage: Storage<T, D>,
}

impl<T> Vector<T> {
    #[track_caller]
    pub fn new() -> Self {
        Self::with_disposer(DropElement)
    }
}

impl<T> Default for Vector<T> {
    #[track_caller]
    fn default() -> Self {
        Self::new()
    }
}

impl<T, D: Dispose<T>> Vector<T, D> {
    #[track_caller]
    pub fn with_disposer(disposer: D) -> Self {
        Self::with_capacity(disposer, DEFAULT_CAPACITY)
    }

    #[track_caller]
    pub fn with_capacity(disposer: D, capacity: usize) -> Self {
        Self {
            storage: Storage::with_capacity(disposer, capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.storage.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.elements.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.storage.elements.capacity()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.storage.elements.get(index)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.storage.elements
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.storage.elements.iter()
    }

    pub fn push_back(&mut self, element: T) {
        self.storage.reserve_one();
        self.storage.elements.push(element);
    }

    /// Insert at `index`, shifting later elements up. `index == len` appends.
    pub fn insert_at(&mut self, index: usize, element: T) {
        contract!(
            index <= self.len(),
            "insert_at index {} past length {}",
            index,
            self.len()
        );
        self.storage.reserve_one();
        self.storage.elements.insert(index, element);
    }

    pub fn try_insert_at(&mut self, index: usize, element: T) -> Result<()> {
        let len = self.len();
        if index > len {
            return Err(Error::IndexOutOfRange { index, len });
        }
        self.insert_at(index, element);
        Ok(())
    }

    /// Dispose the element at `index`, shifting later elements down.
    pub fn remove_at(&mut self, index: usize) {
        contract!(
            index < self.len(),
            "remove_at index {} out of range for length {}",
            index,
            self.len()
        );
        let old = self.storage.elements.remove(index);
        self.storage.disposer.dispose(old);
    }

    pub fn try_remove_at(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.remove_at(index);
        Ok(())
    }

    /// Replace the element at `index`, disposing the previous one.
    pub fn set_at(&mut self, index: usize, element: T) {
        contract!(
            index < self.len(),
            "set_at index {} out of range for length {}",
            index,
            self.len()
        );
        let old = mem::replace(&mut self.storage.elements[index], element);
        self.storage.disposer.dispose(old);
    }

    pub fn try_set_at(&mut self, index: usize, element: T) -> Result<()> {
        self.check_index(index)?;
        self.set_at(index, element);
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        let len = self.len();
        if index < len {
            Ok(())
        } else {
            Err(Error::IndexOutOfRange { index, len })
        }
    }

    /// Element-wise deep copy into an independent vector.
    #[track_caller]
    pub fn copy_with<F>(&self, copy: F) -> Self
    where
        F: FnMut(&T) -> T,
        D: Clone,
    {
        deep_copy(&self.storage, copy)
    }

    /// Give up mutation for shared, immutable storage.
    pub fn freeze(self) -> SharedVector<T, D> {
        tracing::debug!(len = self.len(), "vector frozen");
        SharedVector {
            storage: Rc::new(self.storage),
        }
    }
}

#[track_caller]
fn deep_copy<T, D, F>(storage: &Storage<T, D>, copy: F) -> Vector<T, D>
where
    D: Dispose<T> + Clone,
    F: FnMut(&T) -> T,
{
    let mut out = Storage::with_capacity(
        storage.disposer.clone(),
        storage.elements.capacity().max(DEFAULT_CAPACITY),
    );
    out.elements.extend(storage.elements.iter().map(copy));
    Vector { storage: out }
}

impl<T, D: Dispose<T>> Index<usize> for Vector<T, D> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.storage.elements[index]
    }
}

impl<T: fmt::Debug, D: Dispose<T>> fmt::Debug for Vector<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Frozen vector. Copies alias the same storage; the storage and its
/// elements are destroyed when the last copy is released.
pub struct SharedVector<T, D: Dispose<T> = DropElement> {
    storage: Rc<Storage<T, D>>,
}

impl<T, D: Dispose<T>> SharedVector<T, D> {
    /// Another handle to the same storage.
    pub fn copy(&self) -> Self {
        Self {
            storage: Rc::clone(&self.storage),
        }
    }

    /// Number of handles sharing the storage.
    pub fn share_count(&self) -> usize {
        Rc::strong_count(&self.storage)
    }

    /// Give back this handle.
    pub fn release(self) -> Released {
        release_rc(self.storage)
    }

    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.storage, &b.storage)
    }

    pub fn len(&self) -> usize {
        self.storage.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.storage.elements.get(index)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.storage.elements
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.storage.elements.iter()
    }

    /// Deep copy into a new, unique, mutable vector.
    #[track_caller]
    pub fn copy_with<F>(&self, copy: F) -> Vector<T, D>
    where
        F: FnMut(&T) -> T,
        D: Clone,
    {
        deep_copy(&self.storage, copy)
    }
}

impl<T, D: Dispose<T>> Clone for SharedVector<T, D> {
    fn clone(&self) -> Self {
        self.copy()
    }
}

impl<T, D: Dispose<T>> Index<usize> for SharedVector<T, D> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.storage.elements[index]
    }
}

impl<T: fmt::Debug, D: Dispose<T>> fmt::Debug for SharedVector<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
