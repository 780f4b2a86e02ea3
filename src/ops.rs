//! Element capabilities for the collections.
//!
//! A `Set` is polymorphic over its element type through an `ElementOps`
//! value: equality, a 32-bit hash, and disposal, all receiving the set's
//! context. Vectors and map values only need `Dispose`.

use crate::hash::{one_at_a_time, BuildOneAtATime};
use core::hash::{BuildHasher, Hash};
use core::marker::PhantomData;

/// Release hook for owned elements. The default simply drops.
pub trait Dispose<T> {
    fn dispose(&self, element: T) {
        drop(element);
    }
}

/// Disposer that only drops.
#[derive(Copy, Clone, Debug, Default)]
pub struct DropElement;

impl<T> Dispose<T> for DropElement {}

/// Comparator bundle for set elements.
///
/// `equals` and `hash` must agree: equal elements hash equal. `Context` is
/// the per-set user context handed to every call; a set and all of its
/// sub-sets share the same value.
pub trait ElementOps<T> {
    type Context: Clone;

    fn equals(&self, cx: &Self::Context, a: &T, b: &T) -> bool;

    fn hash(&self, cx: &Self::Context, element: &T) -> u32;

    fn dispose(&self, cx: &Self::Context, element: T) {
        let _ = cx;
        drop(element);
    }
}

/// Comparator for any `T: Eq + Hash`, hashing through `S`.
#[derive(Copy, Clone, Debug, Default)]
pub struct HashOps<S = BuildOneAtATime> {
    hasher: S,
}

impl HashOps {
    pub const fn new() -> Self {
        Self {
            hasher: BuildOneAtATime,
        }
    }
}

impl<S> HashOps<S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self { hasher }
    }
}

impl<T, S> ElementOps<T> for HashOps<S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    type Context = ();

    fn equals(&self, _: &(), a: &T, b: &T) -> bool {
        a == b
    }

    fn hash(&self, _: &(), element: &T) -> u32 {
        self.hasher.hash_one(element) as u32
    }
}

/// Byte-string comparator: exact equality, one-at-a-time hash.
pub struct ByteStr<T: ?Sized>(PhantomData<fn(&T)>);

/// Byte-string comparator ignoring ASCII case in both equality and hash.
pub struct ByteStrIgnoreCase<T: ?Sized>(PhantomData<fn(&T)>);

macro_rules! marker_impls {
    ($name:ident) => {
        impl<T: ?Sized> $name<T> {
            pub const fn new() -> Self {
                Self(PhantomData)
            }
        }

        impl<T: ?Sized> Default for $name<T> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<T: ?Sized> Clone for $name<T> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<T: ?Sized> Copy for $name<T> {}

        impl<T: ?Sized> core::fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(stringify!($name))
            }
        }
    };
}

marker_impls!(ByteStr);
marker_impls!(ByteStrIgnoreCase);

impl<T: AsRef<[u8]>> ElementOps<T> for ByteStr<T> {
    type Context = ();

    fn equals(&self, _: &(), a: &T, b: &T) -> bool {
        a.as_ref() == b.as_ref()
    }

    fn hash(&self, _: &(), element: &T) -> u32 {
        one_at_a_time(element.as_ref())
    }
}

impl<T: AsRef<[u8]>> ElementOps<T> for ByteStrIgnoreCase<T> {
    type Context = ();

    fn equals(&self, _: &(), a: &T, b: &T) -> bool {
        a.as_ref().eq_ignore_ascii_case(b.as_ref())
    }

    fn hash(&self, _: &(), element: &T) -> u32 {
        let lowered: Vec<u8> = element
            .as_ref()
            .iter()
            .map(u8::to_ascii_lowercase)
            .collect();
        one_at_a_time(&lowered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_ops_default_matches_one_at_a_time_for_byte_writers() {
        struct Raw(&'static [u8]);
        impl PartialEq for Raw {
            fn eq(&self, o: &Self) -> bool {
                self.0 == o.0
            }
        }
        impl Eq for Raw {}
        impl Hash for Raw {
            fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
                state.write(self.0);
            }
        }
        let ops = HashOps::<BuildOneAtATime>::default();
        assert_eq!(ops.hash(&(), &Raw(b"abc")), one_at_a_time(b"abc"));
        assert!(ops.equals(&(), &Raw(b"abc"), &Raw(b"abc")));
    }

    #[test]
    fn ignore_case_agrees_on_equal_elements() {
        let ops = ByteStrIgnoreCase::<&str>::new();
        assert!(ops.equals(&(), &"Label", &"LABEL"));
        assert_eq!(ops.hash(&(), &"Label"), ops.hash(&(), &"lAbEl"));
        assert!(!ops.equals(&(), &"Label", &"Labels"));
    }

    #[test]
    fn byte_str_is_case_sensitive() {
        let ops = ByteStr::<String>::new();
        assert!(!ops.equals(&(), &"a".to_string(), &"A".to_string()));
        assert_eq!(ops.hash(&(), &"abc".to_string()), one_at_a_time(b"abc"));
    }

    #[test]
    fn drop_element_drops() {
        use std::rc::Rc;
        let rc = Rc::new(());
        DropElement.dispose(Rc::clone(&rc));
        assert_eq!(Rc::strong_count(&rc), 1);
    }
}
