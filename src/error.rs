//! Error type and contract checks.
//!
//! Ordinary absence (missing key, element not present) is reported through
//! `Option`/`bool`. `Error` covers the recoverable `try_*` entry points;
//! everything else that is a caller bug goes through `contract!`.

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum Error {
    /// Index-taking operation addressed a slot past the end.
    #[error("index {index} is out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Allocation handle was already released (or belongs to another thread).
    #[error("allocation is not live")]
    NotLive,
}

/// Programmer-error check. Active in debug builds and whenever the
/// `strict-contracts` feature is on; compiled out otherwise.
macro_rules! contract {
    ($cond:expr, $($arg:tt)+) => {
        if cfg!(any(debug_assertions, feature = "strict-contracts")) {
            assert!($cond, $($arg)+);
        }
    };
}

pub(crate) use contract;
