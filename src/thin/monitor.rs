use core::fmt;
use core::marker::PhantomData;
use core::sync::atomic::Ordering::Relaxed;

use crate::wait::Wait;
use crate::word::{SyncWord, ThreadId, Word};

use super::exit::sealed::ExitPolicy;
use super::exit::{check_release, Exit};

/// A reentrant monitor whose whole state lives in one 32-bit word.
///
/// The word packs the owning thread's identity and the nest count; it is
/// claimed from the unlocked state with a single compare-and-swap, and the
/// same identity may acquire the monitor again without blocking, up to the
/// nest field's capacity of 65535 unmatched acquisitions. The owner identity
/// must fit 13 bits, see [`ThreadId::THIN_MAX`].
///
/// The monitor is generic over an exit policy `X`, which decides how the
/// owner writes the word back while holding the lock, and a waiting policy
/// `W`, applied while another thread holds it. The [`stores`], [`halfwords`]
/// and [`exchanges`] modules provide aliases pairing each exit policy with
/// common waiting policies.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
///
/// use monlock::thin::stores::Monitor;
/// use monlock::ThreadId;
///
/// let monitor = Arc::new(Monitor::new());
/// let c_monitor = Arc::clone(&monitor);
///
/// thread::spawn(move || {
///     let me = ThreadId::new(2).unwrap();
///     c_monitor.acquire(me);
///     c_monitor.release(me);
/// })
/// .join().expect("thread::spawn failed");
///
/// let me = ThreadId::new(1).unwrap();
/// monitor.acquire(me);
/// assert_eq!(monitor.holder(), Some(me));
/// monitor.release(me);
/// ```
/// [`stores`]: super::stores
/// [`halfwords`]: super::halfwords
/// [`exchanges`]: super::exchanges
pub struct Monitor<X, W> {
    sync: SyncWord,
    exit: PhantomData<X>,
    wait: PhantomData<W>,
}

impl<X, W> Monitor<X, W> {
    /// Creates a new monitor in the unlocked state (const).
    ///
    /// # Examples
    ///
    /// ```
    /// use monlock::thin::stores::Monitor;
    ///
    /// const MONITOR: Monitor = Monitor::new();
    /// let monitor = Monitor::new();
    /// ```
    #[cfg(not(all(loom, test)))]
    #[inline]
    pub const fn new() -> Self {
        Self { sync: SyncWord::new(), exit: PhantomData, wait: PhantomData }
    }

    /// Creates a new unlocked monitor with Loom primitives (non-const).
    #[cfg(all(loom, test))]
    pub fn new() -> Self {
        Self { sync: SyncWord::new(), exit: PhantomData, wait: PhantomData }
    }

    /// Returns the identity of the thread currently holding the monitor.
    ///
    /// The answer is immediately stale unless the caller is the holder; it
    /// is only useful as a heuristic or from within the critical section.
    ///
    /// # Examples
    ///
    /// ```
    /// use monlock::thin::stores::Monitor;
    /// use monlock::ThreadId;
    ///
    /// let me = ThreadId::new(7).unwrap();
    /// let monitor = Monitor::new();
    ///
    /// assert_eq!(monitor.holder(), None);
    /// monitor.acquire(me);
    /// assert_eq!(monitor.holder(), Some(me));
    /// monitor.release(me);
    /// ```
    #[inline]
    pub fn holder(&self) -> Option<ThreadId> {
        // Relaxed is sufficient because this method only guarantees atomicity.
        self.sync.load(Relaxed).holder()
    }

    /// Returns the number of unmatched acquisitions by the current holder,
    /// zero when the monitor is unlocked.
    ///
    /// Exact from within the critical section, a heuristic anywhere else.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.sync.load(Relaxed).nest()
    }

    /// Returns `true` if some thread currently holds the monitor.
    ///
    /// This method does not provide any synchronization guarantees, so its
    /// only useful as a heuristic, and so must be considered not up to date.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.sync.load(Relaxed).nest() != 0
    }
}

impl<X: Exit, W: Wait> Monitor<X, W> {
    /// Acquires the monitor, waiting until it is available.
    ///
    /// Returns once the calling identity holds the monitor: immediately if
    /// it was unlocked or already held by `me`, otherwise after the waiting
    /// policy has been applied for as long as another thread held it. No
    /// ordering is guaranteed between simultaneous claimers.
    ///
    /// # Panics
    ///
    /// Panics if `me` does not fit the owner field (see
    /// [`ThreadId::THIN_MAX`]), or if the acquisition would push the nest
    /// count past the nest field's capacity. Both are capacity violations of
    /// the packed encoding and are checked, never silently wrapped.
    ///
    /// # Examples
    ///
    /// ```
    /// use monlock::thin::stores::Monitor;
    /// use monlock::ThreadId;
    ///
    /// let me = ThreadId::new(7).unwrap();
    /// let monitor = Monitor::new();
    ///
    /// monitor.acquire(me);
    /// monitor.acquire(me);
    /// assert_eq!(monitor.depth(), 2);
    /// monitor.release(me);
    /// monitor.release(me);
    /// ```
    pub fn acquire(&self, me: ThreadId) {
        let mut wait = W::new();
        let mut sync = self.sync.load(Relaxed);
        loop {
            if sync.nest() == 0 {
                // Unlocked: attempt the claim, retry right away if another
                // thread raced us to the word.
                match self.sync.try_claim(sync, Word::pack(me, 1)) {
                    Ok(()) => return,
                    Err(observed) => sync = observed,
                }
            } else if sync.held_by(me) {
                // Reentrant acquisition: we already hold the word, nobody
                // else may write it, bump the nest count in place.
                X::reenter(&self.sync, Word::pack(me, sync.nest() + 1));
                return;
            } else {
                wait.contended(self.sync.state(), sync.into_raw());
                sync = self.sync.load(Relaxed);
            }
        }
    }

    /// Attempts to acquire the monitor without waiting.
    ///
    /// Returns `true` if the calling identity now holds the monitor (fresh
    /// claim or reentrant acquisition), `false` if another thread holds it.
    ///
    /// # Panics
    ///
    /// Panics on the same capacity violations as [`acquire`].
    ///
    /// # Examples
    ///
    /// ```
    /// use monlock::thin::stores::Monitor;
    /// use monlock::ThreadId;
    ///
    /// let me = ThreadId::new(1).unwrap();
    /// let other = ThreadId::new(2).unwrap();
    /// let monitor = Monitor::new();
    ///
    /// assert!(monitor.try_acquire(me));
    /// assert!(!monitor.try_acquire(other));
    /// monitor.release(me);
    /// ```
    /// [`acquire`]: Monitor::acquire
    pub fn try_acquire(&self, me: ThreadId) -> bool {
        let mut sync = self.sync.load(Relaxed);
        loop {
            if sync.nest() == 0 {
                match self.sync.try_claim(sync, Word::pack(me, 1)) {
                    Ok(()) => return true,
                    Err(observed) => sync = observed,
                }
            } else if sync.held_by(me) {
                X::reenter(&self.sync, Word::pack(me, sync.nest() + 1));
                return true;
            } else {
                return false;
            }
        }
    }

    /// Releases the monitor once.
    ///
    /// Undoes exactly one acquisition by `me`; the monitor returns to the
    /// unlocked state only after as many releases as there were unmatched
    /// acquisitions. The write-back is performed by the exit policy `X`.
    ///
    /// # Panics
    ///
    /// Panics if the monitor is unlocked, or if it is held by an identity
    /// other than `me`. Both are contract violations: they indicate a bug in
    /// the caller and are never reported as recoverable errors.
    ///
    /// # Examples
    ///
    /// ```
    /// use monlock::thin::stores::Monitor;
    /// use monlock::ThreadId;
    ///
    /// let me = ThreadId::new(7).unwrap();
    /// let monitor = Monitor::new();
    ///
    /// monitor.acquire(me);
    /// monitor.release(me);
    /// assert!(!monitor.is_locked());
    /// ```
    pub fn release(&self, me: ThreadId) {
        let observed = self.sync.load(Relaxed);
        check_release(observed, me);
        X::exit(&self.sync, me, observed);
        if observed.nest() == 1 {
            W::notify(self.sync.state());
        }
    }

    /// Acquires the monitor and returns a guard that releases it on drop.
    ///
    /// # Panics
    ///
    /// Panics on the same capacity violations as [`acquire`].
    ///
    /// # Examples
    ///
    /// ```
    /// use monlock::thin::stores::Monitor;
    /// use monlock::ThreadId;
    ///
    /// let me = ThreadId::new(7).unwrap();
    /// let monitor = Monitor::new();
    ///
    /// {
    ///     let _guard = monitor.enter(me);
    ///     assert_eq!(monitor.holder(), Some(me));
    /// }
    /// assert!(!monitor.is_locked());
    /// ```
    /// [`acquire`]: Monitor::acquire
    pub fn enter(&self, me: ThreadId) -> MonitorGuard<'_, X, W> {
        self.acquire(me);
        MonitorGuard { monitor: self, me }
    }

    /// Attempts to acquire the monitor without waiting, returning a guard
    /// that releases it on drop if successful.
    pub fn try_enter(&self, me: ThreadId) -> Option<MonitorGuard<'_, X, W>> {
        self.try_acquire(me).then(|| MonitorGuard { monitor: self, me })
    }
}

impl<X, W> Default for Monitor<X, W> {
    /// Creates an unlocked `Monitor`.
    fn default() -> Self {
        Self::new()
    }
}

impl<X, W> fmt::Debug for Monitor<X, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = self.sync.load(Relaxed);
        let mut d = f.debug_struct("Monitor");
        d.field("holder", &word.holder());
        d.field("depth", &word.nest());
        d.finish()
    }
}

/// An RAII implementation of a scoped monitor acquisition. When this
/// structure is dropped (falls out of scope), the monitor will be released
/// once on behalf of the identity that entered it.
///
/// This structure is returned by the [`enter`] and [`try_enter`] methods on
/// [`Monitor`].
///
/// [`enter`]: Monitor::enter
/// [`try_enter`]: Monitor::try_enter
#[must_use = "if unused the monitor is immediately released"]
pub struct MonitorGuard<'a, X: Exit, W: Wait> {
    monitor: &'a Monitor<X, W>,
    me: ThreadId,
}

impl<X: Exit, W: Wait> MonitorGuard<'_, X, W> {
    /// Returns the identity this guard releases on behalf of.
    #[inline]
    pub const fn owner(&self) -> ThreadId {
        self.me
    }
}

impl<X: Exit, W: Wait> Drop for MonitorGuard<'_, X, W> {
    fn drop(&mut self) {
        self.monitor.release(self.me);
    }
}

impl<X: Exit, W: Wait> fmt::Debug for MonitorGuard<'_, X, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorGuard").field("owner", &self.me).finish()
    }
}

#[cfg(all(not(loom), test))]
mod test {
    use core::sync::atomic::Ordering::Relaxed;

    use crate::relax::Yield;
    use crate::test as suite;
    use crate::thin::exit::{ExchangeExit, HalfwordExit, StoreExit};
    use crate::word::{ThreadId, Word};

    type StoreMonitor = super::Monitor<StoreExit, Yield>;
    type HalfwordMonitor = super::Monitor<HalfwordExit, Yield>;
    type ExchangeMonitor = super::Monitor<ExchangeExit, Yield>;

    #[test]
    fn store_nested_depth() {
        suite::nested_acquire_tracks_depth::<StoreMonitor>();
    }

    #[test]
    fn store_round_trip() {
        suite::balanced_sequence_unlocks::<StoreMonitor>();
    }

    #[test]
    fn store_exclusion() {
        suite::lots_and_lots::<StoreMonitor>();
    }

    #[test]
    fn store_try_acquire() {
        suite::try_acquire_contract::<StoreMonitor>();
    }

    #[test]
    fn store_handoff() {
        suite::contended_acquire_succeeds_after_release::<StoreMonitor>();
    }

    #[test]
    fn store_all_contenders() {
        suite::every_contender_gets_through::<StoreMonitor>();
    }

    #[test]
    #[should_panic(expected = "unlocked")]
    fn store_release_unheld() {
        suite::release_unheld::<StoreMonitor>();
    }

    #[test]
    #[should_panic(expected = "held by thread")]
    fn store_release_wrong_owner() {
        suite::release_wrong_owner::<StoreMonitor>();
    }

    #[test]
    fn halfword_nested_depth() {
        suite::nested_acquire_tracks_depth::<HalfwordMonitor>();
    }

    #[test]
    fn halfword_round_trip() {
        suite::balanced_sequence_unlocks::<HalfwordMonitor>();
    }

    #[test]
    fn halfword_exclusion() {
        suite::lots_and_lots::<HalfwordMonitor>();
    }

    #[test]
    fn halfword_handoff() {
        suite::contended_acquire_succeeds_after_release::<HalfwordMonitor>();
    }

    #[test]
    #[should_panic(expected = "held by thread")]
    fn halfword_release_wrong_owner() {
        suite::release_wrong_owner::<HalfwordMonitor>();
    }

    #[test]
    fn exchange_nested_depth() {
        suite::nested_acquire_tracks_depth::<ExchangeMonitor>();
    }

    #[test]
    fn exchange_round_trip() {
        suite::balanced_sequence_unlocks::<ExchangeMonitor>();
    }

    #[test]
    fn exchange_exclusion() {
        suite::lots_and_lots::<ExchangeMonitor>();
    }

    #[test]
    fn exchange_handoff() {
        suite::contended_acquire_succeeds_after_release::<ExchangeMonitor>();
    }

    #[test]
    #[should_panic(expected = "unlocked")]
    fn exchange_release_unheld() {
        suite::release_unheld::<ExchangeMonitor>();
    }

    // The nested halfword exit only rewrites the nest field, so the owner
    // bits linger until the final exit writes the whole zero word.
    #[test]
    fn halfword_word_states() {
        let me = ThreadId::new(7).unwrap();
        let monitor = HalfwordMonitor::new();

        monitor.acquire(me);
        monitor.acquire(me);
        assert_eq!(monitor.sync.load(Relaxed), Word::pack(me, 2));

        monitor.release(me);
        assert_eq!(monitor.sync.load(Relaxed), Word::pack(me, 1));

        monitor.release(me);
        assert_eq!(monitor.sync.load(Relaxed), Word::UNLOCKED);
    }

    #[test]
    fn store_word_returns_to_zero() {
        let me = ThreadId::new(0x1fff).unwrap();
        let monitor = StoreMonitor::new();
        for _ in 0..3 {
            monitor.acquire(me);
        }
        for _ in 0..3 {
            monitor.release(me);
        }
        assert_eq!(monitor.sync.load(Relaxed), Word::UNLOCKED);
    }

    #[test]
    #[should_panic(expected = "owner field")]
    fn wide_thread_id_is_fatal() {
        let wide = ThreadId::new(ThreadId::THIN_MAX + 1).unwrap();
        let monitor = StoreMonitor::new();
        monitor.acquire(wide);
    }

    #[test]
    fn guard_releases_on_drop() {
        let me = ThreadId::new(3).unwrap();
        let monitor = StoreMonitor::new();
        {
            let guard = monitor.enter(me);
            assert_eq!(guard.owner(), me);
            assert_eq!(monitor.depth(), 1);
        }
        assert!(!monitor.is_locked());
    }

    #[test]
    fn monitor_debug() {
        let me = ThreadId::new(5).unwrap();
        let monitor = StoreMonitor::new();
        assert_eq!("Monitor { holder: None, depth: 0 }", std::format!("{monitor:?}"));
        monitor.acquire(me);
        assert_eq!("Monitor { holder: Some(5), depth: 1 }", std::format!("{monitor:?}"));
        monitor.release(me);
    }
}

#[cfg(all(loom, test))]
mod test {
    use crate::loom::models;
    use crate::relax::Yield;
    use crate::thin::exit::{ExchangeExit, StoreExit};

    type StoreMonitor = super::Monitor<StoreExit, Yield>;
    type ExchangeMonitor = super::Monitor<ExchangeExit, Yield>;

    #[test]
    fn store_acquire_join() {
        models::acquire_join::<StoreMonitor>();
    }

    #[test]
    fn store_nested_acquire_join() {
        models::nested_acquire_join::<StoreMonitor>();
    }

    #[test]
    fn store_try_acquire_join() {
        models::try_acquire_join::<StoreMonitor>();
    }

    #[test]
    fn exchange_acquire_join() {
        models::acquire_join::<ExchangeMonitor>();
    }

    #[test]
    fn exchange_nested_acquire_join() {
        models::nested_acquire_join::<ExchangeMonitor>();
    }
}
