use crate::fat;
use crate::thin;
use crate::thin::Exit;
use crate::wait::Wait;
use crate::word::ThreadId;

/// A trait over the operations every monitor encoding shares, so that the
/// same property suite can run against all of them.
pub trait Monitor {
    /// Creates a new monitor in the unlocked state.
    fn new() -> Self;

    /// Acquires the monitor on behalf of `me`, waiting if necessary.
    fn acquire(&self, me: ThreadId);

    /// Releases one acquisition held by `me`.
    fn release(&self, me: ThreadId);

    /// Attempts to acquire without waiting.
    fn try_acquire(&self, me: ThreadId) -> bool;

    /// The identity currently holding the monitor.
    fn holder(&self) -> Option<ThreadId>;

    /// The current nest count.
    fn depth(&self) -> usize;

    /// Whether any thread holds the monitor.
    fn is_locked(&self) -> bool;
}

impl<X: Exit, W: Wait> Monitor for thin::Monitor<X, W> {
    fn new() -> Self {
        Self::new()
    }

    fn acquire(&self, me: ThreadId) {
        self.acquire(me);
    }

    fn release(&self, me: ThreadId) {
        self.release(me);
    }

    fn try_acquire(&self, me: ThreadId) -> bool {
        self.try_acquire(me)
    }

    fn holder(&self) -> Option<ThreadId> {
        self.holder()
    }

    fn depth(&self) -> usize {
        self.depth() as usize
    }

    fn is_locked(&self) -> bool {
        self.is_locked()
    }
}

impl<W: Wait> Monitor for fat::Monitor<W> {
    fn new() -> Self {
        Self::new()
    }

    fn acquire(&self, me: ThreadId) {
        self.acquire(me);
    }

    fn release(&self, me: ThreadId) {
        self.release(me);
    }

    fn try_acquire(&self, me: ThreadId) -> bool {
        self.try_acquire(me)
    }

    fn holder(&self) -> Option<ThreadId> {
        self.holder()
    }

    fn depth(&self) -> usize {
        self.depth()
    }

    fn is_locked(&self) -> bool {
        self.is_locked()
    }
}

/// Shorthand for a thread identity known to be valid.
pub fn id(n: u32) -> ThreadId {
    ThreadId::new(n).expect("thread ids in tests are non-zero")
}

#[cfg(not(all(loom, test)))]
pub use suite::*;

#[cfg(not(all(loom, test)))]
mod suite {
    use core::cell::UnsafeCell;
    use std::sync::mpsc::channel;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use std::vec::Vec;

    use super::{id, Monitor};

    const ITERS: u32 = 1000;
    const THREADS: u32 = 4;

    /// A value that is only written while its monitor is held.
    struct Protected<L> {
        monitor: L,
        value: UnsafeCell<u32>,
    }

    // SAFETY: The value is only accessed under the monitor, which serializes
    // all its writers.
    unsafe impl<L: Sync> Sync for Protected<L> {}

    impl<L: Monitor> Protected<L> {
        fn new() -> Self {
            Self { monitor: L::new(), value: UnsafeCell::new(0) }
        }

        /// Increments the value inside a nested critical section.
        fn inc(&self, n: u32) {
            let me = id(n);
            self.monitor.acquire(me);
            self.monitor.acquire(me);
            // SAFETY: We hold the monitor, nobody else touches the value.
            unsafe { *self.value.get() += 1 };
            self.monitor.release(me);
            self.monitor.release(me);
        }

        fn get(&self, n: u32) -> u32 {
            let me = id(n);
            self.monitor.acquire(me);
            // SAFETY: We hold the monitor.
            let value = unsafe { *self.value.get() };
            self.monitor.release(me);
            value
        }
    }

    /// Repeated acquisitions by one identity stack up, and every one of them
    /// must be released before the monitor unlocks.
    pub fn nested_acquire_tracks_depth<L: Monitor>() {
        let me = id(7);
        let monitor = L::new();

        monitor.acquire(me);
        monitor.acquire(me);
        monitor.acquire(me);
        assert_eq!(monitor.depth(), 3);
        assert_eq!(monitor.holder(), Some(me));

        monitor.release(me);
        monitor.release(me);
        assert!(monitor.is_locked());

        monitor.release(me);
        assert_eq!(monitor.depth(), 0);
        assert_eq!(monitor.holder(), None);
        assert!(!monitor.is_locked());
    }

    /// Any balanced sequence of acquisitions and releases leaves the monitor
    /// exactly as it started, claimable by anybody.
    pub fn balanced_sequence_unlocks<L: Monitor>() {
        let me = id(1);
        let other = id(2);
        let monitor = L::new();

        monitor.acquire(me);
        monitor.acquire(me);
        monitor.release(me);
        monitor.acquire(me);
        monitor.release(me);
        monitor.release(me);

        assert!(!monitor.is_locked());
        assert!(monitor.try_acquire(other));
        monitor.release(other);
    }

    /// The monitor serializes all mutations of the protected value.
    pub fn lots_and_lots<L: Monitor + Send + Sync + 'static>() {
        let data = Arc::new(Protected::<L>::new());

        let (tx, rx) = channel();
        for n in 1..=THREADS {
            let data = Arc::clone(&data);
            let tx = tx.clone();
            thread::spawn(move || {
                for _ in 0..ITERS {
                    data.inc(n);
                }
                tx.send(()).unwrap();
            });
        }

        drop(tx);
        for _ in 0..THREADS {
            rx.recv().unwrap();
        }
        assert_eq!(data.get(THREADS + 1), ITERS * THREADS);
    }

    /// `try_acquire` claims a free monitor and re-enters a held one, but
    /// never succeeds for a different identity.
    pub fn try_acquire_contract<L: Monitor>() {
        let me = id(1);
        let other = id(2);
        let monitor = L::new();

        assert!(monitor.try_acquire(me));
        assert!(!monitor.try_acquire(other));
        assert!(monitor.try_acquire(me));
        assert_eq!(monitor.depth(), 2);

        monitor.release(me);
        monitor.release(me);
        assert!(monitor.try_acquire(other));
        monitor.release(other);
    }

    /// A contender blocked on a held monitor acquires it once the holder
    /// releases, and observes itself as the new holder.
    pub fn contended_acquire_succeeds_after_release<L: Monitor + Send + Sync + 'static>() {
        let first = id(1);
        let second = id(2);

        let monitor = Arc::new(L::new());
        let c_monitor = Arc::clone(&monitor);

        monitor.acquire(first);
        assert_eq!(monitor.depth(), 1);

        let contender = thread::spawn(move || {
            c_monitor.acquire(second);
            let holder = c_monitor.holder();
            let depth = c_monitor.depth();
            c_monitor.release(second);
            (holder, depth)
        });

        // Give the contender a chance to actually hit the contended branch.
        thread::sleep(Duration::from_millis(10));
        monitor.release(first);

        let (holder, depth) = contender.join().expect("thread::spawn failed");
        assert_eq!(holder, Some(second));
        assert_eq!(depth, 1);
        assert!(!monitor.is_locked());
    }

    /// Several contenders must all get their turn eventually.
    pub fn every_contender_gets_through<L: Monitor + Send + Sync + 'static>() {
        let monitor = Arc::new(L::new());

        let threads: Vec<_> = (1..=THREADS)
            .map(|n| {
                let monitor = Arc::clone(&monitor);
                thread::spawn(move || {
                    let me = id(n);
                    monitor.acquire(me);
                    assert_eq!(monitor.holder(), Some(me));
                    monitor.release(me);
                })
            })
            .collect();

        for thread in threads {
            thread.join().expect("thread::spawn failed");
        }
        assert!(!monitor.is_locked());
    }

    /// Releasing a monitor nobody holds must die, not silently succeed.
    pub fn release_unheld<L: Monitor>() {
        let monitor = L::new();
        monitor.release(id(1));
    }

    /// Releasing on behalf of the wrong identity must die, not silently
    /// succeed.
    pub fn release_wrong_owner<L: Monitor>() {
        let monitor = L::new();
        monitor.acquire(id(5));
        monitor.release(id(3));
    }
}
