//! Run-time selection of a monitor encoding.
//!
//! The concrete encodings in [`thin`] and [`fat`] fix the state layout and
//! the exit policy in the type. This module instead makes the encoding an
//! explicit configuration value: a [`Strategy`] names one of the four
//! encodings, parses from configuration strings, and
//! [`Monitor::new`](Monitor::new) builds the chosen encoding behind a
//! uniform interface. All encodings coexist in one build, so comparing them
//! does not require recompiling.
//!
//! [`thin`]: crate::thin
//! [`fat`]: crate::fat

use core::fmt;
use core::str::FromStr;

use crate::relax::Spin;
use crate::thin::{ExchangeExit, HalfwordExit, StoreExit};
use crate::wait::Wait;
use crate::word::ThreadId;
use crate::{fat, thin};

/// The monitor encodings that can be chosen at run time.
///
/// # Examples
///
/// ```
/// use monlock::select::Strategy;
///
/// let strategy: Strategy = "halfword".parse().unwrap();
/// assert_eq!(strategy, Strategy::Halfword);
/// assert!("queued".parse::<Strategy>().is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Thin word encoding, plain full-word store on exit.
    Store,
    /// Thin word encoding, halfword store of the nest field on exit.
    Halfword,
    /// Thin word encoding, compare-and-swap on exit.
    Exchange,
    /// Separate full-width fields, no capacity limits.
    Fat,
}

impl Strategy {
    /// The configuration name of this strategy.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Halfword => "halfword",
            Self::Exchange => "exchange",
            Self::Fat => "fat",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "store" => Ok(Self::Store),
            "halfword" => Ok(Self::Halfword),
            "exchange" => Ok(Self::Exchange),
            "fat" => Ok(Self::Fat),
            _ => Err(ParseStrategyError(())),
        }
    }
}

/// An error returned when parsing a [`Strategy`] from a string.
///
/// The accepted names are `store`, `halfword`, `exchange` and `fat`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseStrategyError(());

impl fmt::Display for ParseStrategyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown monitor strategy, expected one of: store, halfword, exchange, fat")
    }
}

/// A reentrant monitor whose encoding is chosen at construction time.
///
/// Every operation dispatches to the encoding the monitor was built with;
/// the contract is identical across encodings. Like the concrete monitors,
/// this type is generic over the waiting policy `W` applied during
/// contention, defaulting to [`Spin`].
///
/// # Examples
///
/// ```
/// use monlock::select::{Monitor, Strategy};
/// use monlock::ThreadId;
///
/// let me = ThreadId::new(7).unwrap();
/// let monitor: Monitor = Monitor::new(Strategy::Exchange);
///
/// monitor.acquire(me);
/// assert_eq!(monitor.holder(), Some(me));
/// monitor.release(me);
/// ```
pub struct Monitor<W: Wait = Spin> {
    inner: Inner<W>,
}

enum Inner<W> {
    Store(thin::Monitor<StoreExit, W>),
    Halfword(thin::Monitor<HalfwordExit, W>),
    Exchange(thin::Monitor<ExchangeExit, W>),
    Fat(fat::Monitor<W>),
}

impl<W: Wait> Monitor<W> {
    /// Creates a new unlocked monitor with the given encoding strategy.
    #[must_use]
    pub const fn new(strategy: Strategy) -> Self {
        let inner = match strategy {
            Strategy::Store => Inner::Store(thin::Monitor::new()),
            Strategy::Halfword => Inner::Halfword(thin::Monitor::new()),
            Strategy::Exchange => Inner::Exchange(thin::Monitor::new()),
            Strategy::Fat => Inner::Fat(fat::Monitor::new()),
        };
        Self { inner }
    }

    /// Returns the strategy this monitor was built with.
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        match self.inner {
            Inner::Store(_) => Strategy::Store,
            Inner::Halfword(_) => Strategy::Halfword,
            Inner::Exchange(_) => Strategy::Exchange,
            Inner::Fat(_) => Strategy::Fat,
        }
    }

    /// Acquires the monitor, waiting until it is available.
    ///
    /// # Panics
    ///
    /// For the thin strategies, panics on the capacity violations described
    /// by [`thin::Monitor::acquire`]. The `fat` strategy has no capacity
    /// limits.
    ///
    /// [`thin::Monitor::acquire`]: thin::Monitor::acquire
    pub fn acquire(&self, me: ThreadId) {
        match &self.inner {
            Inner::Store(monitor) => monitor.acquire(me),
            Inner::Halfword(monitor) => monitor.acquire(me),
            Inner::Exchange(monitor) => monitor.acquire(me),
            Inner::Fat(monitor) => monitor.acquire(me),
        }
    }

    /// Attempts to acquire the monitor without waiting.
    ///
    /// Returns `true` if the calling identity now holds the monitor,
    /// `false` if another thread holds it.
    pub fn try_acquire(&self, me: ThreadId) -> bool {
        match &self.inner {
            Inner::Store(monitor) => monitor.try_acquire(me),
            Inner::Halfword(monitor) => monitor.try_acquire(me),
            Inner::Exchange(monitor) => monitor.try_acquire(me),
            Inner::Fat(monitor) => monitor.try_acquire(me),
        }
    }

    /// Releases the monitor once.
    ///
    /// # Panics
    ///
    /// Panics if the monitor is unlocked or held by an identity other than
    /// `me`, as described by the concrete monitors.
    pub fn release(&self, me: ThreadId) {
        match &self.inner {
            Inner::Store(monitor) => monitor.release(me),
            Inner::Halfword(monitor) => monitor.release(me),
            Inner::Exchange(monitor) => monitor.release(me),
            Inner::Fat(monitor) => monitor.release(me),
        }
    }

    /// Acquires the monitor and returns a guard that releases it on drop.
    pub fn enter(&self, me: ThreadId) -> MonitorGuard<'_, W> {
        self.acquire(me);
        MonitorGuard { monitor: self, me }
    }

    /// Returns the identity of the thread currently holding the monitor.
    ///
    /// Exact from within the critical section, a heuristic anywhere else.
    pub fn holder(&self) -> Option<ThreadId> {
        match &self.inner {
            Inner::Store(monitor) => monitor.holder(),
            Inner::Halfword(monitor) => monitor.holder(),
            Inner::Exchange(monitor) => monitor.holder(),
            Inner::Fat(monitor) => monitor.holder(),
        }
    }

    /// Returns the number of unmatched acquisitions by the current holder,
    /// zero when the monitor is unlocked.
    pub fn depth(&self) -> usize {
        match &self.inner {
            Inner::Store(monitor) => monitor.depth() as usize,
            Inner::Halfword(monitor) => monitor.depth() as usize,
            Inner::Exchange(monitor) => monitor.depth() as usize,
            Inner::Fat(monitor) => monitor.depth(),
        }
    }

    /// Returns `true` if some thread currently holds the monitor.
    ///
    /// This method does not provide any synchronization guarantees, so its
    /// only useful as a heuristic, and so must be considered not up to date.
    pub fn is_locked(&self) -> bool {
        match &self.inner {
            Inner::Store(monitor) => monitor.is_locked(),
            Inner::Halfword(monitor) => monitor.is_locked(),
            Inner::Exchange(monitor) => monitor.is_locked(),
            Inner::Fat(monitor) => monitor.is_locked(),
        }
    }
}

impl<W: Wait> fmt::Debug for Monitor<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Monitor");
        d.field("strategy", &self.strategy());
        d.field("holder", &self.holder());
        d.field("depth", &self.depth());
        d.finish()
    }
}

/// An RAII implementation of a scoped monitor acquisition. When this
/// structure is dropped (falls out of scope), the monitor will be released
/// once on behalf of the identity that entered it.
///
/// This structure is returned by the [`enter`] method on [`Monitor`].
///
/// [`enter`]: Monitor::enter
#[must_use = "if unused the monitor is immediately released"]
pub struct MonitorGuard<'a, W: Wait> {
    monitor: &'a Monitor<W>,
    me: ThreadId,
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

#[cfg(test)]
mod test {
    use super::{Monitor, Strategy};
    use crate::word::ThreadId;

    const STRATEGIES: [Strategy; 4] =
        [Strategy::Store, Strategy::Halfword, Strategy::Exchange, Strategy::Fat];

    #[test]
    fn names_round_trip() {
        for strategy in STRATEGIES {
            assert_eq!(Ok(strategy), strategy.name().parse());
        }
        assert!("spin".parse::<Strategy>().is_err());
    }

    #[test]
    fn every_strategy_honors_the_contract() {
        let me = ThreadId::new(7).unwrap();
        for strategy in STRATEGIES {
            let monitor: Monitor = Monitor::new(strategy);
            assert_eq!(monitor.strategy(), strategy);

            monitor.acquire(me);
            monitor.acquire(me);
            monitor.acquire(me);
            assert_eq!(monitor.holder(), Some(me));
            assert_eq!(monitor.depth(), 3);

            monitor.release(me);
            monitor.release(me);
            monitor.release(me);
            assert_eq!(monitor.holder(), None);
            assert!(!monitor.is_locked());
        }
    }

    #[test]
    fn try_acquire_respects_other_holders() {
        let me = ThreadId::new(1).unwrap();
        let other = ThreadId::new(2).unwrap();
        for strategy in STRATEGIES {
            let monitor: Monitor = Monitor::new(strategy);
            assert!(monitor.try_acquire(me));
            assert!(!monitor.try_acquire(other));
            assert!(monitor.try_acquire(me));
            monitor.release(me);
            monitor.release(me);
        }
    }

    #[test]
    fn guard_releases_on_drop() {
        let me = ThreadId::new(3).unwrap();
        for strategy in STRATEGIES {
            let monitor: Monitor = Monitor::new(strategy);
            drop(monitor.enter(me));
            assert!(!monitor.is_locked());
        }
    }
}
