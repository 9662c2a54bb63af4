//! Waiting policies applied while another thread holds the monitor.
//!
//! Finding the monitor held by a different identity is an ordinary state of
//! the acquire protocol, not an error: the acquiring thread waits under a
//! policy chosen as a type parameter, then re-reads the word and retries.
//!
//! Every [`relax`] strategy is a waiting policy that never sleeps: its relax
//! operation runs once per failed attempt and releasing owners have nobody
//! to notify. The [`parking`] module (requires the `parking` feature)
//! provides policies that put the thread to sleep on the lock word instead.
//!
//! [`relax`]: crate::relax
//! [`parking`]: crate::parking

use crate::cfg::atomic::AtomicU32;
use crate::relax::{Loop, Relax, Spin, SpinBackoff};

#[cfg(any(feature = "yield", test))]
use crate::relax::Yield;

#[cfg(feature = "yield")]
use crate::relax::YieldBackoff;

/// The waiting policy that is applied when the monitor is contended.
///
/// A policy value is created per `acquire` call and its [`contended`] hook
/// runs once for each attempt that found the lock held by another thread.
/// The word value passed to the hook is opaque; sleeping policies hand it to
/// the OS as the futex comparand so that a release between the failed
/// attempt and the sleep is never missed.
///
/// [`contended`]: Wait::contended
pub trait Wait {
    /// Initializes the policy state for one acquisition.
    fn new() -> Self;

    /// Waits for the owner to make progress, after an attempt observed the
    /// monitor held by another thread.
    fn contended(&mut self, state: &AtomicU32, observed: u32);

    /// Notifies waiters, if any, that the monitor was released.
    ///
    /// Runs on the final exit, once the word has been written back to its
    /// unlocked state. Policies that never sleep have nothing to do here.
    #[inline(always)]
    fn notify(state: &AtomicU32) {
        let _ = state;
    }
}

impl Wait for Spin {
    #[inline(always)]
    fn new() -> Self {
        Relax::new()
    }

    #[inline(always)]
    fn contended(&mut self, _state: &AtomicU32, _observed: u32) {
        self.relax();
    }
}

impl Wait for Loop {
    #[inline(always)]
    fn new() -> Self {
        Relax::new()
    }

    #[inline(always)]
    fn contended(&mut self, _state: &AtomicU32, _observed: u32) {
        self.relax();
    }
}

impl Wait for SpinBackoff {
    #[inline(always)]
    fn new() -> Self {
        Relax::new()
    }

    #[inline(always)]
    fn contended(&mut self, _state: &AtomicU32, _observed: u32) {
        self.relax();
    }
}

#[cfg(any(feature = "yield", test))]
impl Wait for Yield {
    #[inline(always)]
    fn new() -> Self {
        Relax::new()
    }

    #[inline(always)]
    fn contended(&mut self, _state: &AtomicU32, _observed: u32) {
        self.relax();
    }
}

#[cfg(feature = "yield")]
impl Wait for YieldBackoff {
    #[inline(always)]
    fn new() -> Self {
        Relax::new()
    }

    #[inline(always)]
    fn contended(&mut self, _state: &AtomicU32, _observed: u32) {
        self.relax();
    }
}
