//! StrBuf: growable byte buffer for assembling an `RcStr` piece by piece.

use crate::heap::{reserve_exact, Tracked, PREVIEW_LEN};
use crate::string::RcStr;
use core::fmt;

pub const INITIAL_CAPACITY: usize = 32;

pub struct StrBuf {
    bytes: Vec<u8>,
    storage: Tracked,
}

impl StrBuf {
    #[track_caller]
    pub fn new() -> Self {
        let mut bytes = Vec::new();
        reserve_exact(&mut bytes, INITIAL_CAPACITY);
        Self {
            storage: Tracked::new(bytes.capacity(), &[]),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Append raw bytes. When they do not fit, the buffer grows to one and
    /// a half times the required length.
    #[track_caller]
    pub fn append_bytes(&mut self, data: impl AsRef<[u8]>) {
        let data = data.as_ref();
        let old_len = self.bytes.len();
        let needed = old_len.saturating_add(data.len());
        if needed > self.bytes.capacity() {
            let target = needed.saturating_add(needed / 2);
            reserve_exact(&mut self.bytes, target - old_len);
            self.storage.resize(self.bytes.capacity());
        }
        self.bytes.extend_from_slice(data);
        if old_len < PREVIEW_LEN {
            self.storage.set_preview(&self.bytes);
        }
    }

    /// Append `format!`-style arguments.
    #[track_caller]
    pub fn append_fmt(&mut self, args: fmt::Arguments<'_>) {
        match args.as_str() {
            Some(s) => self.append_bytes(s),
            None => self.append_bytes(std::fmt::format(args)),
        }
    }

    /// Drop the content, keeping the capacity.
    pub fn clear(&mut self) {
        self.bytes.clear();
        self.storage.set_preview(&[]);
    }

    /// Snapshot the current content as a new string.
    #[track_caller]
    pub fn to_rcstr(&self) -> RcStr {
        RcStr::new(&self.bytes)
    }
}

impl Default for StrBuf {
    #[track_caller]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Write for StrBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append_bytes(s);
        Ok(())
    }
}

impl fmt::Debug for StrBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrBuf")
            .field("content", &String::from_utf8_lossy(&self.bytes))
            .field("capacity", &self.bytes.capacity())
            .finish()
    }
}
