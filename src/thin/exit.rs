//! Policies for how the owner writes the monitor word back while holding it.
//!
//! While a thin monitor is held, no thread other than the owner ever writes
//! its word: claimers only read and compare-and-swap against a zero nest
//! field, and they re-read and retry on any conflicting value. Under that
//! single-writer invariant the exit path does not need atomic read-modify
//! operations at all, and these policies span the range from relying on the
//! invariant completely to paying to defend against mutation it rules out.

use core::sync::atomic::Ordering::{Relaxed, Release};

use crate::word::{SyncWord, ThreadId, Word};

pub(crate) mod sealed {
    use crate::word::{SyncWord, ThreadId, Word};

    /// The write-back operations of an exit policy.
    ///
    /// `reenter` runs for nest increments while the lock stays held;
    /// `exit` runs for the release path, with the word observed right after
    /// the caller's precondition check.
    pub trait ExitPolicy {
        /// Writes an incremented nest count during a reentrant acquisition.
        fn reenter(sync: &SyncWord, new: Word) {
            // Only the owner writes while the lock is held, so a plain
            // relaxed store cannot race with another writer.
            sync.store(new, super::Relaxed);
        }

        /// Writes the decremented state back on release.
        fn exit(sync: &SyncWord, me: ThreadId, observed: Word);
    }
}

use sealed::ExitPolicy;

/// A policy for the write-back on a thin monitor's exit path.
///
/// This trait is sealed: the three policies shipped by this crate are the
/// only implementations, since a write-back that does not uphold the word's
/// invariants would corrupt the owner or nest fields for every other user of
/// the monitor.
pub trait Exit: ExitPolicy {}

/// Computes the word to write back for one release.
fn decremented(me: ThreadId, observed: Word) -> Word {
    match observed.nest() {
        1 => Word::UNLOCKED,
        nest => Word::pack(me, nest - 1),
    }
}

/// Validates the release precondition against an observed word.
///
/// Releasing a monitor that is unlocked, or one held by a different thread,
/// is a contract violation and fatal: it is never signaled to the caller as
/// a recoverable condition.
pub(crate) fn check_release(observed: Word, me: ThreadId) {
    let true = observed.nest() > 0 else { panic_unheld() };
    let true = observed.held_by(me) else { panic_not_owner(me, observed) };
}

/// Writes the whole word back with a single plain store.
///
/// The cheapest exit: one release-ordered store of the recombined word, no
/// retry. Correct because the only concurrent access is a claimer's
/// optimistic read, which retries on any stale value it may observe.
pub struct StoreExit;

impl ExitPolicy for StoreExit {
    fn exit(sync: &SyncWord, me: ThreadId, observed: Word) {
        sync.store(decremented(me, observed), Release);
    }
}

impl Exit for StoreExit {}

/// Writes only the nest halfword back, leaving the owner field untouched.
///
/// Saves recombining owner and nest on nested exits, at the price of
/// requiring an independently addressable sub-word store at the nest field's
/// offset. The final exit still writes the whole zero word, so a balanced
/// acquire/release sequence restores the initial unlocked state bit for bit.
#[cfg(not(all(loom, test)))]
pub struct HalfwordExit;

#[cfg(not(all(loom, test)))]
impl ExitPolicy for HalfwordExit {
    fn reenter(sync: &SyncWord, new: Word) {
        sync.store_nest_half(new.nest() as u16);
    }

    fn exit(sync: &SyncWord, me: ThreadId, observed: Word) {
        match observed.nest() {
            1 => sync.store(Word::UNLOCKED, Release),
            nest => sync.store_nest_half((nest - 1) as u16),
        }
    }
}

#[cfg(not(all(loom, test)))]
impl Exit for HalfwordExit {}

/// Writes the word back with a compare-and-swap, retrying on conflict.
///
/// Strictly the most conservative and most expensive exit. The single-owner
/// invariant already rules out the concurrent mutation this policy defends
/// against; it exists so that the cost of that safety margin can be
/// measured. The precondition is re-validated on every retry.
pub struct ExchangeExit;

impl ExitPolicy for ExchangeExit {
    fn exit(sync: &SyncWord, me: ThreadId, mut observed: Word) {
        loop {
            check_release(observed, me);
            match sync.try_swap_release(observed, decremented(me, observed)) {
                Ok(()) => return,
                Err(word) => observed = word,
            }
        }
    }
}

impl Exit for ExchangeExit {}

/// Panics the thread that released a monitor nobody holds.
#[inline(never)]
#[cold]
fn panic_unheld() -> ! {
    panic!("monitor released while unlocked")
}

/// Panics the thread that released a monitor some other thread holds.
#[inline(never)]
#[cold]
fn panic_not_owner(me: ThreadId, observed: Word) -> ! {
    match observed.holder() {
        Some(owner) => panic!("monitor released by thread {me} but held by thread {owner}"),
        None => panic!("monitor released by thread {me} but held by no thread"),
    }
}
