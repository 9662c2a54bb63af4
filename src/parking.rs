//! Waiting policies that put contended threads to sleep.
//!
//! When a thread is "parked", it goes into a sleeping state until the OS
//! wakes it because an event or condition occurred. This avoids burning CPU
//! time on a condition that may take arbitrarily long to change, at the cost
//! of a system call on the slow paths.
//!
//! These policies park the thread directly on the monitor's state word
//! through the [`atomic_wait`] crate's futex-style interface, which provides
//! unified wait and wake functionality across all major platforms. The word
//! value observed by the failed attempt is handed to the OS as the
//! comparand, so a release that lands between the failed attempt and the
//! sleep is detected and the thread never misses its wake-up. The releasing
//! owner wakes one parked thread on the final exit.
//!
//! Parked threads do not queue fairly: a wake-up only means another attempt,
//! which may lose the claim to a fresh arrival.
//!
//! # Example
//!
//! ```
//! // Requires the `parking` feature.
//! use monlock::parking::SpinThenPark;
//! use monlock::thin::{Monitor, StoreExit};
//! use monlock::ThreadId;
//!
//! let me = ThreadId::new(1).unwrap();
//! let monitor: Monitor<StoreExit, SpinThenPark> = Monitor::new();
//! monitor.acquire(me);
//! monitor.release(me);
//! ```
//!
//! [`atomic_wait`]: https://docs.rs/atomic-wait/latest/atomic_wait

use crate::cfg::atomic::AtomicU32;
use crate::cfg::hint;
use crate::wait::Wait;

/// A default number of attempts before the thread is put to sleep.
const DEFAULT_ATTEMPTS: u32 = 100;

/// A busy-wait spin-loop then thread sleeping policy.
///
/// While trying to acquire the monitor, this policy will initially run a
/// busy-wait spin-loop (signaling the CPU to power down) for a number of
/// attempts and then, if unsuccessful, requests the current thread to be put
/// to sleep on the lock word.
pub struct SpinThenPark {
    attempts: u32,
}

impl Wait for SpinThenPark {
    #[inline(always)]
    fn new() -> Self {
        Self { attempts: 0 }
    }

    #[inline]
    fn contended(&mut self, state: &AtomicU32, observed: u32) {
        if self.attempts < DEFAULT_ATTEMPTS {
            self.attempts += 1;
            hint::spin_loop();
        } else {
            park(state, observed);
        }
    }

    #[inline]
    fn notify(state: &AtomicU32) {
        unpark_one(state);
    }
}

/// A thread yielding then thread sleeping policy.
///
/// While trying to acquire the monitor, this policy will initially request
/// the OS to yield the current thread, for a number of attempts, and then,
/// if unsuccessful, requests the current thread to be put to sleep on the
/// lock word.
#[cfg(feature = "yield")]
#[cfg_attr(docsrs, doc(cfg(feature = "yield")))]
pub struct YieldThenPark {
    attempts: u32,
}

#[cfg(feature = "yield")]
impl Wait for YieldThenPark {
    #[inline(always)]
    fn new() -> Self {
        Self { attempts: 0 }
    }

    #[inline]
    fn contended(&mut self, state: &AtomicU32, observed: u32) {
        if self.attempts < DEFAULT_ATTEMPTS {
            self.attempts += 1;
            std::thread::yield_now();
        } else {
            park(state, observed);
        }
    }

    #[inline]
    fn notify(state: &AtomicU32) {
        unpark_one(state);
    }
}

/// Immediately requests the thread to be put to sleep.
///
/// No attempts are spent spinning: every contended round trip goes through
/// the OS. This is the policy to compare spinning policies against when
/// measuring how much busy-waiting is actually buying.
pub struct ImmediatePark;

impl Wait for ImmediatePark {
    #[inline(always)]
    fn new() -> Self {
        Self
    }

    #[inline]
    fn contended(&mut self, state: &AtomicU32, observed: u32) {
        park(state, observed);
    }

    #[inline]
    fn notify(state: &AtomicU32) {
        unpark_one(state);
    }
}

/// Puts the current thread to sleep while the word still holds the observed
/// value.
///
/// Wakes on a release-side notification or spuriously; either way the caller
/// re-reads the word and decides again.
#[cfg(not(all(loom, test)))]
fn park(state: &AtomicU32, observed: u32) {
    atomic_wait::wait(state, observed);
}

/// Wakes one thread parked on the word, if any.
#[cfg(not(all(loom, test)))]
fn unpark_one(state: &AtomicU32) {
    atomic_wait::wake_one(core::ptr::addr_of!(*state));
}

/// Loom cannot model the OS parking interface; models yield instead so that
/// the scheduler can run the owner.
#[cfg(all(loom, test))]
fn park(_state: &AtomicU32, _observed: u32) {
    loom::thread::yield_now();
}

#[cfg(all(loom, test))]
fn unpark_one(_state: &AtomicU32) {}

#[cfg(all(not(loom), test))]
mod test {
    use super::{ImmediatePark, SpinThenPark};
    use crate::fat;
    use crate::test as suite;
    use crate::thin::{Monitor, StoreExit};

    type ParkingThin = Monitor<StoreExit, SpinThenPark>;
    type ParkingFat = fat::Monitor<ImmediatePark>;

    #[test]
    fn thin_handoff_wakes_the_parked_thread() {
        suite::contended_acquire_succeeds_after_release::<ParkingThin>();
    }

    #[test]
    fn thin_exclusion() {
        suite::lots_and_lots::<ParkingThin>();
    }

    #[test]
    fn fat_handoff_wakes_the_parked_thread() {
        suite::contended_acquire_succeeds_after_release::<ParkingFat>();
    }

    #[test]
    fn fat_exclusion() {
        suite::lots_and_lots::<ParkingFat>();
    }
}
