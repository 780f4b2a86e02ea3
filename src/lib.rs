//! rc-collections: single-threaded hash sets, maps, vectors and strings
//! with explicit ownership, leak tracking, and shared immutable storage.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a small set of owning containers whose element lifetime is
//!   spelled out by the types, plus a registry that can name every piece
//!   of storage still alive and where it was created.
//! - Layers:
//!   - heap: thread-local registry of live allocations. Raw `Block`s carry
//!     their bytes in the registry; containers own their storage and
//!     register it through a `Tracked` guard.
//!   - ops: `ElementOps` (equality, 32-bit hash, disposal, per-set
//!     context) and `Dispose` for elements that are only ever released.
//!   - Set<T, C>: fixed prime bucket table plus an ordered list of owned
//!     sub-sets whose elements are visible from every ancestor.
//!   - Map<K, V, C, D>: a `Set` of key/value pairs; equality and hash come
//!     from the key alone.
//!   - Vector<T, D> / SharedVector<T, D>: a uniquely owned growable array
//!     that can be frozen into storage shared by count.
//!   - RcStr: shared byte string with copy-on-write helpers; StrBuf
//!     assembles one from appended bytes and formatted text.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` (registry and share counts are not
//!   atomic).
//! - Disposal runs exactly once per element: on replace, remove, clear,
//!   or when the owning container (or the last share) goes away.
//! - Lookups see the whole subtree; `insert`/`remove` touch only the
//!   addressed node.
//! - Allocation failure is fatal: a message goes to stderr and the
//!   process exits with status 1.
//!
//! Contracts
//! - Misuse that the types cannot rule out (index past the end) is checked
//!   by `contract!` in debug builds and with the `strict-contracts`
//!   feature. `try_*` variants report the same conditions as `Error`.
//! - Misuse the types do rule out: mutating a frozen vector (no such
//!   method on `SharedVector`), releasing twice (`release` consumes the
//!   handle), touching a released `Block` (`Error::NotLive`).
//!
//! Hashing
//! - String-like keys hash with the one-at-a-time function over every
//!   byte. `RcStr`'s `Hash` impl writes only its raw bytes, so
//!   `HashOps<BuildOneAtATime>` and `ByteStr` agree on `RcStr` keys.
//!
//! Notes and non-goals
//! - Iteration order is bucket order, then sub-sets depth-first. It is
//!   stable for a given sequence of operations but otherwise unspecified.
//! - Sets never rehash; the bucket count is fixed.
//! - No weak handles to shared storage.

mod error;
pub mod hash;
pub mod heap;
pub mod map;
pub mod ops;
pub mod set;
mod set_proptest;
mod share;
pub mod strbuf;
pub mod string;
pub mod vector;

// Public surface
pub use error::{Error, Result};
pub use hash::{one_at_a_time, BuildOneAtATime, OneAtATime};
pub use map::{Map, Pair, PairOps};
pub use ops::{ByteStr, ByteStrIgnoreCase, Dispose, DropElement, ElementOps, HashOps};
pub use set::Set;
pub use share::Released;
pub use strbuf::StrBuf;
pub use string::RcStr;
pub use vector::{SharedVector, Vector};
