//! Fat monitor implementation.
//!
//! The `fat` monitor keeps the owner identity and the nest count in separate
//! full-width atomic fields instead of packing them into one word. Nothing
//! is gained in footprint or claim cost over the [`thin`] encoding, but
//! neither field has a capacity limit: identities span the whole non-zero
//! 32-bit range and nesting is bounded only by the native word size.
//!
//! The claim protocol is the same in spirit as the thin one: the owner field
//! is claimed with a compare-and-swap, reentrant acquisitions and releases
//! are plain stores by the owner, and the monitor is generic over a waiting
//! policy applied during contention. Threads inside the contended branch
//! register themselves in an explicit counter, observable through
//! [`contenders`].
//!
//! The [`spins`] and [`yields`] modules provide type aliases for [`Monitor`]
//! with common waiting policies.
//!
//! [`thin`]: crate::thin
//! [`contenders`]: Monitor::contenders

use core::fmt;
use core::marker::PhantomData;
use core::sync::atomic::Ordering::{Acquire, Relaxed, Release};

use crate::cfg::atomic::{AtomicU32, AtomicUsize};
use crate::wait::Wait;
use crate::word::ThreadId;

/// A reentrant monitor with separate full-width state fields.
///
/// The `owner` field holds the owning thread's identity (zero when
/// unlocked), `nest` counts unmatched acquisitions, and `contenders` counts
/// threads currently waiting in the contended branch. Only the owner writes
/// `nest`, and `owner` changes hands exclusively through the atomic claim.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
///
/// use monlock::fat::spins::Monitor;
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
pub struct Monitor<W> {
    owner: AtomicU32,
    nest: AtomicUsize,
    contenders: AtomicUsize,
    wait: PhantomData<W>,
}

impl<W> Monitor<W> {
    /// Creates a new monitor in the unlocked state (const).
    ///
    /// # Examples
    ///
    /// ```
    /// use monlock::fat::spins::Monitor;
    ///
    /// const MONITOR: Monitor = Monitor::new();
    /// let monitor = Monitor::new();
    /// ```
    #[cfg(not(all(loom, test)))]
    #[inline]
    pub const fn new() -> Self {
        Self {
            owner: AtomicU32::new(0),
            nest: AtomicUsize::new(0),
            contenders: AtomicUsize::new(0),
            wait: PhantomData,
        }
    }

    /// Creates a new unlocked monitor with Loom primitives (non-const).
    #[cfg(all(loom, test))]
    pub fn new() -> Self {
        Self {
            owner: AtomicU32::new(0),
            nest: AtomicUsize::new(0),
            contenders: AtomicUsize::new(0),
            wait: PhantomData,
        }
    }

    /// Returns the identity of the thread currently holding the monitor.
    ///
    /// Exact from within the critical section, a heuristic anywhere else.
    #[inline]
    pub fn holder(&self) -> Option<ThreadId> {
        ThreadId::new(self.owner.load(Relaxed))
    }

    /// Returns the number of unmatched acquisitions by the current holder,
    /// zero when the monitor is unlocked.
    ///
    /// Exact from within the critical section, a heuristic anywhere else.
    /// The two fields are read independently, so a caller outside the
    /// critical section may observe a freshly claimed monitor before its
    /// nest count is written.
    #[inline]
    pub fn depth(&self) -> usize {
        self.nest.load(Relaxed)
    }

    /// Returns `true` if some thread currently holds the monitor.
    ///
    /// This method does not provide any synchronization guarantees, so its
    /// only useful as a heuristic, and so must be considered not up to date.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.owner.load(Relaxed) != 0
    }

    /// Returns the number of threads currently waiting to claim the monitor.
    ///
    /// Heuristic only: contenders register and deregister themselves around
    /// their waiting loop, and the count never gates release-side wake-ups.
    #[inline]
    pub fn contenders(&self) -> usize {
        self.contenders.load(Relaxed)
    }
}

impl<W: Wait> Monitor<W> {
    /// Acquires the monitor, waiting until it is available.
    ///
    /// Returns once the calling identity holds the monitor. Unlike the thin
    /// encoding there are no capacity limits: any identity is accepted and
    /// nesting is bounded only by the native word size.
    ///
    /// # Examples
    ///
    /// ```
    /// use monlock::fat::spins::Monitor;
    /// use monlock::ThreadId;
    ///
    /// // An identity too wide for the thin encoding's owner field.
    /// let me = ThreadId::new(0x2000).unwrap();
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
        let mut waiting = false;
        loop {
            let owner = self.owner.load(Relaxed);
            if owner == 0 {
                if self.owner.compare_exchange(0, me.get(), Acquire, Relaxed).is_ok() {
                    // The claim orders us after the previous owner's final
                    // release, which left the nest count at zero.
                    self.nest.store(1, Relaxed);
                    break;
                }
            } else if owner == me.get() {
                // Reentrant acquisition: only the owner writes this field.
                let nest = self.nest.load(Relaxed);
                self.nest.store(nest + 1, Relaxed);
                break;
            } else {
                if !waiting {
                    self.contenders.fetch_add(1, Relaxed);
                    waiting = true;
                }
                wait.contended(&self.owner, owner);
            }
        }
        if waiting {
            self.contenders.fetch_sub(1, Relaxed);
        }
    }

    /// Attempts to acquire the monitor without waiting.
    ///
    /// Returns `true` if the calling identity now holds the monitor (fresh
    /// claim or reentrant acquisition), `false` if another thread holds it.
    ///
    /// # Examples
    ///
    /// ```
    /// use monlock::fat::spins::Monitor;
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
    pub fn try_acquire(&self, me: ThreadId) -> bool {
        loop {
            let owner = self.owner.load(Relaxed);
            if owner == 0 {
                if self.owner.compare_exchange(0, me.get(), Acquire, Relaxed).is_ok() {
                    self.nest.store(1, Relaxed);
                    return true;
                }
            } else if owner == me.get() {
                let nest = self.nest.load(Relaxed);
                self.nest.store(nest + 1, Relaxed);
                return true;
            } else {
                return false;
            }
        }
    }

    /// Releases the monitor once.
    ///
    /// Undoes exactly one acquisition by `me`. On the final release the nest
    /// count returns to zero before the owner field is cleared, so no
    /// observer can find an unlocked monitor with a dangling nest count.
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
    /// use monlock::fat::spins::Monitor;
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
        let owner = self.owner.load(Relaxed);
        let true = owner != 0 else { panic_unheld() };
        let true = owner == me.get() else { panic_not_owner(me, owner) };

        let nest = self.nest.load(Relaxed);
        if nest == 1 {
            self.nest.store(0, Relaxed);
            // Publishes the critical section, and the zeroed nest count, to
            // whichever thread claims the owner field next.
            self.owner.store(0, Release);
            W::notify(&self.owner);
        } else {
            self.nest.store(nest - 1, Relaxed);
        }
    }

    /// Acquires the monitor and returns a guard that releases it on drop.
    ///
    /// # Examples
    ///
    /// ```
    /// use monlock::fat::spins::Monitor;
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
    pub fn enter(&self, me: ThreadId) -> MonitorGuard<'_, W> {
        self.acquire(me);
        MonitorGuard { monitor: self, me }
    }

    /// Attempts to acquire the monitor without waiting, returning a guard
    /// that releases it on drop if successful.
    pub fn try_enter(&self, me: ThreadId) -> Option<MonitorGuard<'_, W>> {
        self.try_acquire(me).then(|| MonitorGuard { monitor: self, me })
    }
}

impl<W> Default for Monitor<W> {
    /// Creates an unlocked `Monitor`.
    fn default() -> Self {
        Self::new()
    }
}

impl<W> fmt::Debug for Monitor<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Monitor");
        d.field("holder", &self.holder());
        d.field("depth", &self.depth());
        d.field("contenders", &self.contenders());
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
pub struct MonitorGuard<'a, W: Wait> {
    monitor: &'a Monitor<W>,
    me: ThreadId,
}

impl<W: Wait> MonitorGuard<'_, W> {
    /// Returns the identity this guard releases on behalf of.
    #[inline]
    pub const fn owner(&self) -> ThreadId {
        self.me
    }
}

impl<W: Wait> Drop for MonitorGuard<'_, W> {
    fn drop(&mut self) {
        self.monitor.release(self.me);
    }
}

impl<W: Wait> fmt::Debug for MonitorGuard<'_, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorGuard").field("owner", &self.me).finish()
    }
}

/// Panics the thread that released a monitor nobody holds.
#[inline(never)]
#[cold]
fn panic_unheld() -> ! {
    panic!("monitor released while unlocked")
}

/// Panics the thread that released a monitor some other thread holds.
#[inline(never)]
#[cold]
fn panic_not_owner(me: ThreadId, owner: u32) -> ! {
    panic!("monitor released by thread {me} but held by thread {owner}")
}

/// A fat monitor that implements a `spin` waiting policy.
///
/// During lock contention, this monitor spins while signaling the processor
/// that it is running a busy-wait spin-loop.
pub mod spins {
    use crate::relax::Spin;

    /// A [`fat::Monitor`] that spins during contention.
    ///
    /// # Example
    ///
    /// ```
    /// use monlock::fat::spins::Monitor;
    /// use monlock::ThreadId;
    ///
    /// let me = ThreadId::new(1).unwrap();
    /// let monitor = Monitor::new();
    /// monitor.acquire(me);
    /// monitor.release(me);
    /// ```
    /// [`fat::Monitor`]: super::Monitor
    pub type Monitor = super::Monitor<Spin>;
}

/// A fat monitor that implements a `yield` waiting policy.
///
/// During lock contention, this monitor will yield the current time slice to
/// the OS scheduler.
#[cfg(any(feature = "yield", loom, test))]
#[cfg_attr(docsrs, doc(cfg(feature = "yield")))]
pub mod yields {
    use crate::relax::Yield;

    /// A [`fat::Monitor`] that yields during contention.
    ///
    /// [`fat::Monitor`]: super::Monitor
    pub type Monitor = super::Monitor<Yield>;
}

#[cfg(all(not(loom), test))]
mod test {
    use crate::relax::Yield;
    use crate::test as suite;
    use crate::word::ThreadId;

    type YieldMonitor = super::Monitor<Yield>;

    #[test]
    fn nested_depth() {
        suite::nested_acquire_tracks_depth::<YieldMonitor>();
    }

    #[test]
    fn round_trip() {
        suite::balanced_sequence_unlocks::<YieldMonitor>();
    }

    #[test]
    fn exclusion() {
        suite::lots_and_lots::<YieldMonitor>();
    }

    #[test]
    fn try_acquire() {
        suite::try_acquire_contract::<YieldMonitor>();
    }

    #[test]
    fn handoff() {
        suite::contended_acquire_succeeds_after_release::<YieldMonitor>();
    }

    #[test]
    fn all_contenders() {
        suite::every_contender_gets_through::<YieldMonitor>();
    }

    #[test]
    #[should_panic(expected = "unlocked")]
    fn release_unheld() {
        suite::release_unheld::<YieldMonitor>();
    }

    #[test]
    #[should_panic(expected = "held by thread")]
    fn release_wrong_owner() {
        suite::release_wrong_owner::<YieldMonitor>();
    }

    #[test]
    fn accepts_wide_identities() {
        let wide = ThreadId::new(u32::MAX).unwrap();
        let monitor = YieldMonitor::new();
        monitor.acquire(wide);
        assert_eq!(monitor.holder(), Some(wide));
        monitor.release(wide);
        assert!(!monitor.is_locked());
    }

    #[test]
    fn deep_nesting_beyond_halfword() {
        let me = ThreadId::new(1).unwrap();
        let monitor = YieldMonitor::new();
        let depth = 0x1_0001_usize;
        for _ in 0..depth {
            monitor.acquire(me);
        }
        assert_eq!(monitor.depth(), depth);
        for _ in 0..depth {
            monitor.release(me);
        }
        assert!(!monitor.is_locked());
    }

    #[test]
    fn contenders_settles_to_zero() {
        let me = ThreadId::new(1).unwrap();
        let monitor = YieldMonitor::new();
        monitor.acquire(me);
        assert_eq!(monitor.contenders(), 0);
        monitor.release(me);
        assert_eq!(monitor.contenders(), 0);
    }
}

#[cfg(all(loom, test))]
mod model {
    use crate::loom::models;
    use crate::relax::Yield;

    type YieldMonitor = super::Monitor<Yield>;

    #[test]
    fn acquire_join() {
        models::acquire_join::<YieldMonitor>();
    }

    #[test]
    fn nested_acquire_join() {
        models::nested_acquire_join::<YieldMonitor>();
    }

    #[test]
    fn try_acquire_join() {
        models::try_acquire_join::<YieldMonitor>();
    }
}
