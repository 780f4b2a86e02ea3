//! Allocation registry with debug leak reporting.
//!
//! Every live allocation is a record in a per-thread side table keyed by
//! generational `slotmap` keys, so a handle can never alias a newer
//! allocation after release. Two kinds of records exist:
//! - raw byte blocks (`alloc`/`realloc`/`release`), whose payload lives in
//!   the record itself;
//! - `Tracked` registrations, RAII tokens that the typed collections hold
//!   for their own storage. They carry size, origin and a short preview of
//!   the content, and unlink themselves on drop.
//!
//! The registry is thread-local: the crate is single-threaded and never
//! locks. What gets recorded is governed by `Config`, whose default comes
//! from `debug_assertions` or the `track-allocations` feature.

use crate::error::{contract, Error, Result};
use core::cell::{Cell, RefCell};
use core::fmt;
use core::marker::PhantomData;
use core::panic::Location;
use slotmap::{DefaultKey, SlotMap};
use std::io;

/// Fill pattern for fresh blocks when poisoning is on.
pub const POISON: [u8; 4] = [0xDE, 0xAD, 0xBE, 0xEF];

/// Number of payload bytes shown per leak.
pub const PREVIEW_LEN: usize = 8;

/// Per-thread tracking switches.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Record call sites, register typed storage and enable the leak report.
    pub track_origin: bool,
    /// Fill fresh blocks with `POISON`.
    pub poison: bool,
}

impl Config {
    pub const fn disabled() -> Self {
        Self {
            track_origin: false,
            poison: false,
        }
    }

    pub const fn debug() -> Self {
        Self {
            track_origin: true,
            poison: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        if cfg!(any(debug_assertions, feature = "track-allocations")) {
            Self::debug()
        } else {
            Self::disabled()
        }
    }
}

pub type Origin = Option<&'static Location<'static>>;

#[derive(Debug)]
struct Record {
    size: usize,
    origin: Origin,
    serial: u64,
    // Full payload for blocks, preview for tracked storage.
    bytes: Vec<u8>,
}

impl Record {
    fn leak(&self) -> Leak {
        Leak {
            size: self.size,
            origin: self.origin,
            preview: self.bytes[..self.bytes.len().min(PREVIEW_LEN)].to_vec(),
        }
    }
}

#[derive(Default)]
struct Registry {
    records: SlotMap<DefaultKey, Record>,
    next_serial: u64,
}

impl Registry {
    fn link(&mut self, mut record: Record) -> DefaultKey {
        record.serial = self.next_serial;
        self.next_serial += 1;
        self.records.insert(record)
    }
}

thread_local! {
    static REGISTRY: RefCell<Registry> = RefCell::new(Registry::default());
    static CONFIG: Cell<Config> = Cell::new(Config::default());
}

fn with_registry<R>(f: impl FnOnce(&mut Registry) -> R) -> R {
    REGISTRY.with(|r| f(&mut r.borrow_mut()))
}

/// Install `config` for the current thread and return the previous one.
pub fn configure(config: Config) -> Config {
    CONFIG.with(|c| c.replace(config))
}

pub fn config() -> Config {
    CONFIG.with(|c| c.get())
}

/// Capacity after one growth step of a bucket or vector: x1.5 plus a constant.
pub(crate) fn grow_capacity(capacity: usize) -> usize {
    capacity + capacity / 2 + 4
}

#[cold]
pub(crate) fn out_of_memory(size: usize) -> ! {
    tracing::error!(size, "allocation failed");
    eprintln!("Unable to allocate memory. Critical error, exiting.");
    std::process::exit(1)
}

/// `Vec::reserve_exact` that routes failure (allocator refusal or capacity
/// overflow) to `out_of_memory` instead of aborting.
pub(crate) fn reserve_exact<T>(elements: &mut Vec<T>, additional: usize) {
    if elements.try_reserve_exact(additional).is_err() {
        let total = elements.len().saturating_add(additional);
        out_of_memory(total.saturating_mul(core::mem::size_of::<T>()));
    }
}

fn fill(bytes: &mut Vec<u8>, size: usize, poison: bool) {
    if size > bytes.len() {
        reserve_exact(bytes, size - bytes.len());
    }
    if poison {
        let start = bytes.len();
        bytes.extend((start..size).map(|i| POISON[i & 3]));
    } else {
        bytes.resize(size, 0);
    }
}

/// Handle to a raw byte block issued by `alloc`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Block(DefaultKey);

impl Block {
    /// Size of the block, or `None` once released.
    pub fn size(&self) -> Option<usize> {
        with_registry(|r| r.records.get(self.0).map(|rec| rec.size))
    }

    pub fn is_live(&self) -> bool {
        with_registry(|r| r.records.contains_key(self.0))
    }
}

/// Allocate `size` bytes. Poisoned when the config says so, zeroed otherwise.
/// Heap exhaustion terminates the process.
#[track_caller]
pub fn alloc(size: usize) -> Block {
    contract!(size != 0, "zero-sized allocation");
    let cfg = config();
    let origin = if cfg.track_origin {
        Some(Location::caller())
    } else {
        None
    };
    let mut bytes = Vec::new();
    fill(&mut bytes, size, cfg.poison);
    let key = with_registry(|r| {
        r.link(Record {
            size,
            origin,
            serial: 0,
            bytes,
        })
    });
    tracing::trace!(size, ?origin, "alloc");
    Block(key)
}

/// `realloc(None, n)` allocates, `realloc(Some(b), 0)` releases and yields
/// `None`; otherwise the record is re-linked under a new handle with the
/// common prefix kept and any growth zero-filled.
#[track_caller]
pub fn realloc(block: Option<Block>, size: usize) -> Option<Block> {
    let Some(block) = block else {
        return Some(alloc(size));
    };
    if size == 0 {
        release(block);
        return None;
    }
    let origin = if config().track_origin {
        Some(Location::caller())
    } else {
        None
    };
    let Some(mut record) = with_registry(|r| r.records.remove(block.0)) else {
        contract!(false, "realloc of an allocation that is not live");
        return Some(alloc(size));
    };
    record.bytes.truncate(size);
    fill(&mut record.bytes, size, false);
    record.size = size;
    if origin.is_some() {
        record.origin = origin;
    }
    let key = with_registry(|r| r.link(record));
    tracing::trace!(size, ?origin, "realloc");
    Some(Block(key))
}

/// Release `block`; `Err(NotLive)` when it was already released.
pub fn try_release(block: Block) -> Result<()> {
    let record = with_registry(|r| r.records.remove(block.0)).ok_or(Error::NotLive)?;
    tracing::trace!(size = record.size, "release");
    Ok(())
}

/// Release `block`. Releasing twice is a contract violation.
pub fn release(block: Block) {
    let released = try_release(block);
    contract!(
        released.is_ok(),
        "release of an allocation that is not live"
    );
}

/// Run `f` over the payload of a live block. The registry is borrowed for
/// the duration of `f`, so `f` must not allocate or release.
pub fn with_bytes<R>(block: Block, f: impl FnOnce(&[u8]) -> R) -> Option<R> {
    with_registry(|r| r.records.get(block.0).map(|rec| f(&rec.bytes)))
}

/// Mutable counterpart of `with_bytes`, same restriction on `f`.
pub fn with_bytes_mut<R>(block: Block, f: impl FnOnce(&mut [u8]) -> R) -> Option<R> {
    with_registry(|r| r.records.get_mut(block.0).map(|rec| f(&mut rec.bytes)))
}

/// Registration of storage owned elsewhere. Dropping it unlinks the record.
#[derive(Debug)]
pub struct Tracked {
    key: Option<DefaultKey>,
    _nosend: PhantomData<*mut ()>,
}

impl Tracked {
    /// Register `size` bytes of storage. Nothing is recorded when origin
    /// tracking is off.
    #[track_caller]
    pub fn new(size: usize, preview: &[u8]) -> Self {
        if !config().track_origin {
            return Self::untracked();
        }
        let origin = Location::caller();
        let bytes = preview[..preview.len().min(PREVIEW_LEN)].to_vec();
        let key = with_registry(|r| {
            r.link(Record {
                size,
                origin: Some(origin),
                serial: 0,
                bytes,
            })
        });
        Self {
            key: Some(key),
            _nosend: PhantomData,
        }
    }

    pub const fn untracked() -> Self {
        Self {
            key: None,
            _nosend: PhantomData,
        }
    }

    /// Re-link with a new size and the caller as origin.
    #[track_caller]
    pub fn resize(&mut self, size: usize) {
        let Some(key) = self.key else { return };
        let origin = Location::caller();
        self.key = with_registry(|r| {
            let mut record = r.records.remove(key)?;
            record.size = size;
            record.origin = Some(origin);
            Some(r.link(record))
        });
    }

    /// Replace the recorded content preview, e.g. after the owner rewrote
    /// its leading bytes.
    pub fn set_preview(&mut self, preview: &[u8]) {
        let Some(key) = self.key else { return };
        with_registry(|r| {
            if let Some(record) = r.records.get_mut(key) {
                record.bytes.clear();
                record
                    .bytes
                    .extend_from_slice(&preview[..preview.len().min(PREVIEW_LEN)]);
            }
        });
    }

    pub fn is_tracked(&self) -> bool {
        self.key.is_some()
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            // The registry may already be gone during thread teardown.
            let _ = REGISTRY.try_with(|r| r.borrow_mut().records.remove(key));
        }
    }
}

/// One outstanding allocation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Leak {
    pub size: usize,
    pub origin: Origin,
    pub preview: Vec<u8>,
}

impl fmt::Display for Leak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.origin {
            Some(loc) => write!(f, "Leak at {}:{}", loc.file(), loc.line())?,
            None => f.write_str("Leak at <unknown>")?,
        }
        write!(f, " ({} bytes):", self.size)?;
        for b in &self.preview {
            write!(f, " {:02x}", b)?;
        }
        Ok(())
    }
}

/// Outstanding allocations, oldest first. Empty when tracking is off.
pub fn report_leaks() -> Vec<Leak> {
    if !config().track_origin {
        return Vec::new();
    }
    let mut leaks: Vec<(u64, Leak)> = with_registry(|r| {
        r.records
            .values()
            .map(|rec| (rec.serial, rec.leak()))
            .collect()
    });
    leaks.sort_by_key(|(serial, _)| *serial);
    for (_, leak) in &leaks {
        tracing::warn!(%leak, "allocation still live");
    }
    leaks.into_iter().map(|(_, leak)| leak).collect()
}

/// Write one line per leak to `out`.
pub fn write_leaks<W: io::Write>(out: &mut W) -> io::Result<()> {
    for leak in report_leaks() {
        writeln!(out, "{}", leak)?;
    }
    Ok(())
}

/// Print the leak report to stdout.
pub fn show_leaks() {
    let stdout = io::stdout();
    print_leaks(&mut stdout.lock());
}

fn print_leaks<W: io::Write>(out: &mut W) -> bool {
    match write_leaks(out) {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!(%error, "leak report not written");
            false
        }
    }
}

/// Number of live records, tracked storage included.
pub fn live_count() -> usize {
    with_registry(|r| r.records.len())
}

pub fn live_bytes() -> usize {
    with_registry(|r| r.records.values().map(|rec| rec.size).sum())
}
