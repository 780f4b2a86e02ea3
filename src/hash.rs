//! Jenkins one-at-a-time hash.
//!
//! `one_at_a_time` is the content hash used for string keys. `OneAtATime`
//! exposes the same mixing as a `core::hash::Hasher`, so any `T: Hash` that
//! feeds its raw bytes through `write` (as `RcStr` does) hashes to the same
//! value through `BuildOneAtATime`.

use core::hash::{BuildHasher, Hasher};

#[inline]
fn mix(mut hash: u32, byte: u8) -> u32 {
    hash = hash.wrapping_add(byte as u32);
    hash = hash.wrapping_add(hash << 10);
    hash ^ (hash >> 6)
}

#[inline]
fn finish(mut hash: u32) -> u32 {
    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 11;
    hash.wrapping_add(hash << 15)
}

/// Hash `bytes` with the one-at-a-time function.
///
/// Every byte is mixed, unlike the variant that advances two bytes per
/// step and only hashes every other byte.
pub fn one_at_a_time(bytes: &[u8]) -> u32 {
    finish(bytes.iter().fold(0, |h, &b| mix(h, b)))
}

/// Streaming one-at-a-time hasher. Finishing mix is applied in `finish`,
/// so the hasher can keep absorbing bytes afterward.
#[derive(Copy, Clone, Debug, Default)]
pub struct OneAtATime {
    hash: u32,
}

impl Hasher for OneAtATime {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        self.hash = bytes.iter().fold(self.hash, |h, &b| mix(h, b));
    }

    #[inline]
    fn finish(&self) -> u64 {
        finish(self.hash) as u64
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct BuildOneAtATime;

impl BuildHasher for BuildOneAtATime {
    type Hasher = OneAtATime;

    fn build_hasher(&self) -> Self::Hasher {
        OneAtATime::default()
    }
}
