//! Debug-only reentrancy guard for dict entry points.
//!
//! `OrderedDict` calls into caller-supplied `KeyOps` while probing, at a
//! point where its index and log may be mid-update. A `KeyOps` impl that
//! reaches back into the same dict (through a raw pointer or a shared
//! handle) would observe that state, so in debug builds every entry point
//! holds a guard and nested entry panics. Release builds compile the guard
//! away.

use core::cell::Cell;
use core::marker::PhantomData;

/// Per-instance reentrancy tracker. Embed it in a struct and guard entry
/// points with `let _g = self.reentrancy.enter();`.
///
/// `Send` so an owner can move the whole structure behind a lock; never
/// `Sync`, in every build profile, because the structure has no internal
/// locking.
#[derive(Debug)]
pub struct DebugReentrancy {
    #[cfg(debug_assertions)]
    depth: Cell<u32>,
    _nosync: PhantomData<Cell<()>>,
}

impl DebugReentrancy {
    pub const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            depth: Cell::new(0),
            _nosync: PhantomData,
        }
    }

    /// Enter a guarded section. In debug builds, panics if already entered.
    #[inline]
    pub fn enter(&self) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            let d = self.depth.get();
            assert!(d == 0, "reentrancy detected: nested entry into OrderedDict");
            self.depth.set(d + 1);
            ReentrancyGuard { owner: self }
        }

        #[cfg(not(debug_assertions))]
        {
            ReentrancyGuard { _z: PhantomData }
        }
    }

    /// Whether a guard is currently held. Always false in release builds.
    pub fn is_entered(&self) -> bool {
        #[cfg(debug_assertions)]
        {
            self.depth.get() > 0
        }

        #[cfg(not(debug_assertions))]
        {
            false
        }
    }
}

impl Default for DebugReentrancy {
    fn default() -> Self {
        Self::new()
    }
}

// A copy of a guarded structure starts outside any guarded section.
impl Clone for DebugReentrancy {
    fn clone(&self) -> Self {
        Self::new()
    }
}

/// RAII guard returned by `DebugReentrancy::enter`.
pub struct ReentrancyGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            let d = self.owner.depth.get();
            debug_assert!(d > 0);
            self.owner.depth.set(d - 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DebugReentrancy;

    fn assert_send<T: Send>() {}

    #[test]
    fn tracker_is_send() {
        assert_send::<DebugReentrancy>();
    }

    #[test]
    fn guard_releases_on_drop() {
        let r = DebugReentrancy::new();
        {
            let _g = r.enter();
            assert_eq!(r.is_entered(), cfg!(debug_assertions));
        }
        assert!(!r.is_entered());
        let _again = r.enter();
    }

    #[test]
    fn clone_starts_unentered() {
        let r = DebugReentrancy::new();
        let _g = r.enter();
        let c = r.clone();
        assert!(!c.is_entered());
    }
}
