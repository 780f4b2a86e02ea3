//! Outcome of giving back one share of a shared handle.

use std::rc::Rc;

/// Result of an explicit `release`; tells whether the storage went away.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Released {
    /// Other handles remain; carries how many.
    Shared(usize),
    /// This was the last handle and the storage was destroyed.
    Destroyed,
}

impl Released {
    pub fn is_destroyed(self) -> bool {
        matches!(self, Released::Destroyed)
    }
}

pub(crate) fn release_rc<T>(rc: Rc<T>) -> Released {
    let remaining = Rc::strong_count(&rc) - 1;
    drop(rc);
    if remaining == 0 {
        Released::Destroyed
    } else {
        Released::Shared(remaining)
    }
}
