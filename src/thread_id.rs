//! Per-thread monitor identities.
//!
//! Monitors take the caller's identity as an explicit argument and never
//! look it up themselves. This module provides the obvious assignment
//! scheme for callers that map logical threads onto OS threads: each OS
//! thread gets a process-unique [`ThreadId`] from a global counter on its
//! first call to [`current`], and keeps it for its lifetime.
//!
//! Identities are not reused after a thread exits, so a program that keeps
//! spawning threads will eventually hand out ids past
//! [`ThreadId::THIN_MAX`]; those remain valid for fat monitors while a thin
//! monitor treats them as a capacity violation.

use core::sync::atomic::AtomicU32;
use core::sync::atomic::Ordering::Relaxed;

use crate::word::ThreadId;

/// The next identity to hand out. Zero is the unlocked sentinel, ids start
/// at one.
static NEXT: AtomicU32 = AtomicU32::new(1);

std::thread_local! {
    static CURRENT: ThreadId = assign();
}

/// Takes the next identity off the global counter.
fn assign() -> ThreadId {
    let id = NEXT.fetch_add(1, Relaxed);
    match ThreadId::new(id) {
        Some(id) => id,
        // The counter wrapped: 2^32 - 1 identities were assigned.
        None => panic_exhausted(),
    }
}

/// Panics the thread that exhausted the identity space.
#[inline(never)]
#[cold]
fn panic_exhausted() -> ! {
    panic!("monitor thread identity space exhausted")
}

/// Returns the calling OS thread's monitor identity, assigning one on the
/// first call.
///
/// # Examples
///
/// ```
/// // Requires the `thread_local` feature.
/// use monlock::fat::spins::Monitor;
/// use monlock::thread_id;
///
/// let me = thread_id::current();
/// assert_eq!(me, thread_id::current());
///
/// let monitor = Monitor::new();
/// monitor.acquire(me);
/// monitor.release(me);
/// ```
#[must_use]
pub fn current() -> ThreadId {
    CURRENT.with(|id| *id)
}

#[cfg(all(not(loom), test))]
mod test {
    use std::thread;

    use super::current;

    #[test]
    fn identity_is_stable_within_a_thread() {
        assert_eq!(current(), current());
    }

    #[test]
    fn identities_are_unique_across_threads() {
        let mine = current();
        let theirs = thread::spawn(current).join().expect("thread::spawn failed");
        assert_ne!(mine, theirs);
    }
}
