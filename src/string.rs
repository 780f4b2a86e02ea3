//! RcStr: reference-counted byte string with copy-on-write helpers.
//!
//! Content is immutable through the shared handle. `concat`, `slice` and
//! the other transforms build a new buffer; the `*_in_place` helpers mutate
//! directly only when this handle is the sole owner, and otherwise repoint
//! the handle at a private clone first.
//!
//! Length is explicit, so embedded zero bytes are ordinary content. The one
//! exception is `compare`, which orders like a C string compare and stops at
//! the first zero byte.

use crate::hash::one_at_a_time;
use crate::heap::Tracked;
use crate::share::{release_rc, Released};
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::iter;
use std::rc::Rc;

struct Buffer {
    bytes: Box<[u8]>,
    storage: Tracked,
}

impl Buffer {
    #[track_caller]
    fn new(bytes: Box<[u8]>) -> Self {
        let storage = Tracked::new(bytes.len(), &bytes);
        Self { bytes, storage }
    }
}

impl Clone for Buffer {
    #[track_caller]
    fn clone(&self) -> Self {
        Self::new(self.bytes.clone())
    }
}

/// Turn a possibly negative index into an in-range position.
///
/// Negative values count back from `len`. `None` when the result still
/// falls outside `0..len`.
pub fn normalize_index(index: isize, len: usize) -> Option<usize> {
    let index = if index < 0 {
        index.checked_add_unsigned(len)?
    } else {
        index
    };
    usize::try_from(index).ok().filter(|&i| i < len)
}

pub struct RcStr(Rc<Buffer>);

/// Build an `RcStr` from `format!`-style arguments.
#[macro_export]
macro_rules! rcstr {
    ($($arg:tt)*) => {
        $crate::RcStr::format(::core::format_args!($($arg)*))
    };
}

impl RcStr {
    #[track_caller]
    pub fn new(bytes: impl AsRef<[u8]>) -> Self {
        Self::from_box(bytes.as_ref().into())
    }

    #[track_caller]
    fn from_box(bytes: Box<[u8]>) -> Self {
        RcStr(Rc::new(Buffer::new(bytes)))
    }

    #[track_caller]
    pub fn empty() -> Self {
        Self::from_box(Box::default())
    }

    /// `len` bytes, each produced by `next(position)`.
    #[track_caller]
    pub fn from_fn(len: usize, next: impl FnMut(usize) -> u8) -> Self {
        Self::from_box((0..len).map(next).collect())
    }

    #[track_caller]
    pub fn spaces(count: usize) -> Self {
        Self::from_fn(count, |_| b' ')
    }

    #[track_caller]
    pub fn format(args: fmt::Arguments<'_>) -> Self {
        match args.as_str() {
            Some(s) => Self::new(s),
            None => Self::from_box(std::fmt::format(args).into_bytes().into_boxed_slice()),
        }
    }

    /// Alias this buffer.
    pub fn copy(&self) -> Self {
        RcStr(Rc::clone(&self.0))
    }

    /// Give back this handle.
    pub fn release(self) -> Released {
        release_rc(self.0)
    }

    pub fn share_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub fn len(&self) -> usize {
        self.0.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0.bytes
    }

    /// UTF-8 view, when the content is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(self.as_bytes()).ok()
    }

    /// Byte at `index`; negative indices count from the end.
    pub fn char_at(&self, index: isize) -> Option<u8> {
        normalize_index(index, self.len()).map(|i| self.as_bytes()[i])
    }

    /// Offset of the first occurrence of `needle`.
    pub fn find(&self, needle: impl AsRef<[u8]>) -> Option<usize> {
        let needle = needle.as_ref();
        if needle.is_empty() {
            return Some(0);
        }
        self.as_bytes()
            .windows(needle.len())
            .position(|window| window == needle)
    }

    pub fn equal_const(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }

    /// Byte-wise ordering that stops at the first zero byte or at the end.
    pub fn compare(&self, other: &RcStr) -> Ordering {
        let a = self.as_bytes().iter().copied().chain(iter::once(0));
        let b = other.as_bytes().iter().copied().chain(iter::once(0));
        for (x, y) in a.zip(b) {
            if x != y || x == 0 {
                return x.cmp(&y);
            }
        }
        Ordering::Equal
    }

    /// One-at-a-time hash of the content.
    pub fn content_hash(&self) -> u32 {
        one_at_a_time(self.as_bytes())
    }

    #[track_caller]
    pub fn concat(&self, other: &RcStr) -> RcStr {
        let mut bytes = Vec::with_capacity(self.len() + other.len());
        bytes.extend_from_slice(self.as_bytes());
        bytes.extend_from_slice(other.as_bytes());
        Self::from_box(bytes.into_boxed_slice())
    }

    /// New string of at most `length` bytes starting at `index`.
    ///
    /// A negative `index` counts from the end. An index outside the string
    /// gives an empty result; an overlong `length` is clamped.
    #[track_caller]
    pub fn slice(&self, index: isize, length: usize) -> RcStr {
        match normalize_index(index, self.len()) {
            Some(start) => {
                let end = start + length.min(self.len() - start);
                Self::new(&self.as_bytes()[start..end])
            }
            None => Self::empty(),
        }
    }

    /// New string with every `search` byte replaced.
    #[track_caller]
    pub fn replace(&self, search: u8, replacement: u8) -> RcStr {
        self.map_bytes(|b| if b == search { replacement } else { b })
    }

    #[track_caller]
    pub fn to_lower(&self) -> RcStr {
        self.map_bytes(|b| b.to_ascii_lowercase())
    }

    #[track_caller]
    fn map_bytes(&self, f: impl FnMut(u8) -> u8) -> RcStr {
        Self::from_box(self.as_bytes().iter().copied().map(f).collect())
    }

    /// Pad with spaces to `|width|` bytes: on the left for a positive
    /// width, on the right for a negative one. Already wide enough strings
    /// come back aliased.
    #[track_caller]
    pub fn align(&self, width: i32) -> RcStr {
        let target = width.unsigned_abs() as usize;
        if self.len() >= target {
            return self.copy();
        }
        let padding = RcStr::spaces(target - self.len());
        if width < 0 {
            self.concat(&padding)
        } else {
            padding.concat(self)
        }
    }

    /// Rewrite CR, LF, CRLF and LFCR as a single LF and append a final LF.
    #[track_caller]
    pub fn canonicalize_line_endings(&self) -> RcStr {
        let src = self.as_bytes();
        let mut out = Vec::with_capacity(src.len() + 1);
        let mut i = 0;
        while i < src.len() {
            match (src[i], src.get(i + 1)) {
                (b'\r', Some(b'\n')) | (b'\n', Some(b'\r')) => {
                    out.push(b'\n');
                    i += 2;
                }
                (b'\r' | b'\n', _) => {
                    out.push(b'\n');
                    i += 1;
                }
                (b, _) => {
                    out.push(b);
                    i += 1;
                }
            }
        }
        out.push(b'\n');
        Self::from_box(out.into_boxed_slice())
    }

    #[track_caller]
    pub fn to_upper_in_place(&mut self) {
        self.transform_in_place(|b| b.to_ascii_uppercase())
    }

    #[track_caller]
    pub fn to_lower_in_place(&mut self) {
        self.transform_in_place(|b| b.to_ascii_lowercase())
    }

    /// Apply `f` to every byte of this handle's content, first detaching
    /// from other holders if the buffer is shared.
    #[track_caller]
    pub fn transform_in_place(&mut self, mut f: impl FnMut(u8) -> u8) {
        if Rc::strong_count(&self.0) != 1 {
            tracing::debug!(
                len = self.len(),
                shares = self.share_count(),
                "string copied on write"
            );
            self.0 = Rc::new(Buffer::new(self.0.bytes.clone()));
        }
        let Buffer { bytes, storage } = Rc::make_mut(&mut self.0);
        for b in bytes.iter_mut() {
            *b = f(*b);
        }
        storage.set_preview(&bytes[..]);
    }
}

impl Clone for RcStr {
    fn clone(&self) -> Self {
        self.copy()
    }
}

impl Default for RcStr {
    #[track_caller]
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for RcStr {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other) || self.as_bytes() == other.as_bytes()
    }
}

impl Eq for RcStr {}

impl PartialEq<str> for RcStr {
    fn eq(&self, other: &str) -> bool {
        self.equal_const(other)
    }
}

impl PartialEq<&str> for RcStr {
    fn eq(&self, other: &&str) -> bool {
        self.equal_const(other)
    }
}

impl Hash for RcStr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(self.as_bytes());
    }
}

impl AsRef<[u8]> for RcStr {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl From<&str> for RcStr {
    #[track_caller]
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for RcStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Debug for RcStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*String::from_utf8_lossy(self.as_bytes()), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::BuildOneAtATime;
    use core::hash::BuildHasher;

    #[test]
    fn normalize_counts_back_from_end() {
        assert_eq!(normalize_index(0, 3), Some(0));
        assert_eq!(normalize_index(-1, 3), Some(2));
        assert_eq!(normalize_index(-3, 3), Some(0));
        assert_eq!(normalize_index(-4, 3), None);
        assert_eq!(normalize_index(3, 3), None);
        assert_eq!(normalize_index(0, 0), None);
    }

    #[test]
    fn slice_handles_negative_and_overlong() {
        let s = RcStr::new("abcdef");
        assert_eq!(s.slice(-3, 2), "de");
        assert_eq!(s.slice(4, 100), "ef");
        assert!(s.slice(6, 1).is_empty());
        assert!(s.slice(-7, 2).is_empty());
        assert!(!RcStr::ptr_eq(&s, &s.slice(0, 6)));
    }

    #[test]
    fn copy_aliases_and_release_reports_shares() {
        let s = RcStr::new("abc");
        let t = s.copy();
        assert!(RcStr::ptr_eq(&s, &t));
        assert_eq!(s.share_count(), 2);
        assert_eq!(t.release(), Released::Shared(1));
        assert_eq!(s.release(), Released::Destroyed);
    }

    #[test]
    fn in_place_transform_detaches_shared_buffer() {
        let original = RcStr::new("Hello World");
        let mut lowered = original.copy();
        lowered.to_lower_in_place();
        assert_eq!(lowered, "hello world");
        assert_eq!(original, "Hello World");
        assert_eq!(original.share_count(), 1);

        let unique_ptr = lowered.as_bytes().as_ptr();
        lowered.to_upper_in_place();
        assert_eq!(lowered, "HELLO WORLD");
        assert_eq!(lowered.as_bytes().as_ptr(), unique_ptr);
    }

    #[test]
    fn compare_stops_at_zero_byte() {
        let a = RcStr::new(b"ab\0x");
        let b = RcStr::new(b"ab\0y");
        assert_eq!(a.compare(&b), Ordering::Equal);
        assert_ne!(a, b);
        assert_eq!(RcStr::new("ab").compare(&RcStr::new("abc")), Ordering::Less);
        assert_eq!(RcStr::new("b").compare(&RcStr::new("abc")), Ordering::Greater);
    }

    #[test]
    fn hash_trait_matches_content_hash() {
        let s = RcStr::new("the key");
        assert_eq!(BuildOneAtATime.hash_one(&s) as u32, s.content_hash());
        assert_eq!(s.content_hash(), RcStr::new("the key").content_hash());
    }

    #[test]
    fn align_pads_either_side() {
        let s = RcStr::new("ab");
        assert_eq!(s.align(5), "   ab");
        assert_eq!(s.align(-4), "ab  ");
        let same = s.align(2);
        assert!(RcStr::ptr_eq(&s, &same));
    }

    #[test]
    fn line_endings_collapse_to_lf() {
        let s = RcStr::new("a\r\nb\n\rc\rd\ne");
        assert_eq!(s.canonicalize_line_endings(), "a\nb\nc\nd\ne\n");
        assert_eq!(RcStr::empty().canonicalize_line_endings(), "\n");
        assert_eq!(RcStr::new("\n\n").canonicalize_line_endings(), "\n\n\n");
    }

    #[test]
    fn queries() {
        let s = rcstr!("{}-{}", "key", 42);
        assert_eq!(s, "key-42");
        assert_eq!(s.char_at(-1), Some(b'2'));
        assert_eq!(s.char_at(6), None);
        assert_eq!(s.find("-4"), Some(3));
        assert_eq!(s.find("x"), None);
        assert_eq!(s.replace(b'-', b'_'), "key_42");
        assert_eq!(RcStr::new("MiXeD").to_lower(), "mixed");
        assert_eq!(RcStr::spaces(3), "   ");
        assert_eq!(RcStr::from_fn(3, |i| b'a' + i as u8), "abc");
        assert_eq!(format!("{s} {s:?}"), "key-42 \"key-42\"");
        assert_eq!(RcStr::new([0xff]).as_str(), None);
    }

    #[test]
    fn leak_preview_follows_in_place_transforms() {
        use crate::heap;
        heap::configure(heap::Config::debug());
        let mut unique = RcStr::new("abcd");
        unique.to_upper_in_place();
        assert_eq!(heap::report_leaks()[0].preview, b"ABCD");

        let mut detached = unique.copy();
        detached.to_lower_in_place();
        let previews: Vec<Vec<u8>> = heap::report_leaks()
            .into_iter()
            .map(|leak| leak.preview)
            .collect();
        assert_eq!(previews, [b"ABCD".to_vec(), b"abcd".to_vec()]);
    }

    #[test]
    fn buffers_register_with_content_preview() {
        use crate::heap;
        heap::configure(heap::Config::debug());
        let s = RcStr::new("leaky value");
        let leaks = heap::report_leaks();
        assert_eq!(leaks.len(), 1);
        assert_eq!(leaks[0].size, 11);
        assert_eq!(leaks[0].preview, b"leaky va");
        drop(s);
        assert_eq!(heap::live_count(), 0);
    }
}
