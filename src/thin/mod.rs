//! Thin monitor implementation.
//!
//! The `thin` monitor packs its whole state into one 32-bit word: a 13-bit
//! owner identity above three reserved tag bits, and a 16-bit nest count in
//! the high halfword. A zero nest field means unlocked. The word is claimed
//! with a single compare-and-swap; reentrant acquisitions and releases are
//! plain writes by the owner, which is the only thread allowed to write the
//! word while the lock is held.
//!
//! This monitor is generic over two policies:
//!
//! - the exit policy, which decides how the owner writes the word back: a
//!   plain full-word store ([`StoreExit`]), a halfword store of the nest
//!   field alone ([`HalfwordExit`]), or a compare-and-swap
//!   ([`ExchangeExit`]). The [`Exit`] documentation covers why anything
//!   cheaper than a compare-and-swap is sound here.
//! - the waiting policy, applied while another thread holds the monitor, as
//!   long as it implements the [`Wait`] trait.
//!
//! The [`stores`], [`halfwords`] and [`exchanges`] modules provide type
//! aliases for [`Monitor`] pairing each exit policy with common waiting
//! policies.
//!
//! [`Wait`]: crate::wait::Wait

pub(crate) mod exit;
mod monitor;

pub use exit::{ExchangeExit, Exit, StoreExit};
pub use monitor::{Monitor, MonitorGuard};

#[cfg(not(all(loom, test)))]
pub use exit::HalfwordExit;

/// A thin monitor whose exit path is one plain full-word store.
///
/// The cheapest exit: the decremented word is written back with a single
/// store and no retry, relying on the single-writer-while-held invariant.
pub mod stores {
    use super::{monitor, StoreExit};
    use crate::relax::Spin;

    /// A [`thin::Monitor`] with the [`StoreExit`] policy, spinning during
    /// contention.
    ///
    /// # Example
    ///
    /// ```
    /// use monlock::thin::stores::Monitor;
    /// use monlock::ThreadId;
    ///
    /// let me = ThreadId::new(1).unwrap();
    /// let monitor = Monitor::new();
    /// monitor.acquire(me);
    /// monitor.release(me);
    /// ```
    /// [`thin::Monitor`]: monitor::Monitor
    pub type Monitor = monitor::Monitor<StoreExit, Spin>;

    /// A plain-store thin monitor that yields to the OS scheduler during
    /// contention.
    #[cfg(any(feature = "yield", loom, test))]
    #[cfg_attr(docsrs, doc(cfg(feature = "yield")))]
    pub mod yields {
        use super::{monitor, StoreExit};
        use crate::relax::Yield;

        /// A [`thin::Monitor`] with the [`StoreExit`] policy, yielding
        /// during contention.
        ///
        /// [`thin::Monitor`]: monitor::Monitor
        pub type Monitor = monitor::Monitor<StoreExit, Yield>;
    }
}

/// A thin monitor whose exit path writes only the nest halfword.
///
/// Nested exits rewrite the 16-bit nest field in place instead of
/// recombining owner and nest, which requires an independently addressable
/// sub-word store on the target. The final exit writes the whole zero word,
/// restoring the initial unlocked state bit for bit.
#[cfg(not(all(loom, test)))]
pub mod halfwords {
    use super::{monitor, HalfwordExit};
    use crate::relax::Spin;

    /// A [`thin::Monitor`] with the [`HalfwordExit`] policy, spinning
    /// during contention.
    ///
    /// # Example
    ///
    /// ```
    /// use monlock::thin::halfwords::Monitor;
    /// use monlock::ThreadId;
    ///
    /// let me = ThreadId::new(1).unwrap();
    /// let monitor = Monitor::new();
    /// monitor.acquire(me);
    /// monitor.acquire(me);
    /// monitor.release(me);
    /// monitor.release(me);
    /// ```
    /// [`thin::Monitor`]: monitor::Monitor
    pub type Monitor = monitor::Monitor<HalfwordExit, Spin>;

    /// A halfword-exit thin monitor that yields to the OS scheduler during
    /// contention.
    #[cfg(any(feature = "yield", test))]
    #[cfg_attr(docsrs, doc(cfg(feature = "yield")))]
    pub mod yields {
        use super::{monitor, HalfwordExit};
        use crate::relax::Yield;

        /// A [`thin::Monitor`] with the [`HalfwordExit`] policy, yielding
        /// during contention.
        ///
        /// [`thin::Monitor`]: monitor::Monitor
        pub type Monitor = monitor::Monitor<HalfwordExit, Yield>;
    }
}

/// A thin monitor whose exit path is a compare-and-swap.
///
/// Strictly the most conservative and most expensive exit policy: it defends
/// against concurrent mutation that the single-owner invariant already rules
/// out. It exists so that the cost of that safety margin can be measured.
pub mod exchanges {
    use super::{monitor, ExchangeExit};
    use crate::relax::Spin;

    /// A [`thin::Monitor`] with the [`ExchangeExit`] policy, spinning
    /// during contention.
    ///
    /// # Example
    ///
    /// ```
    /// use monlock::thin::exchanges::Monitor;
    /// use monlock::ThreadId;
    ///
    /// let me = ThreadId::new(1).unwrap();
    /// let monitor = Monitor::new();
    /// monitor.acquire(me);
    /// monitor.release(me);
    /// ```
    /// [`thin::Monitor`]: monitor::Monitor
    pub type Monitor = monitor::Monitor<ExchangeExit, Spin>;

    /// An exchange-exit thin monitor that yields to the OS scheduler during
    /// contention.
    #[cfg(any(feature = "yield", loom, test))]
    #[cfg_attr(docsrs, doc(cfg(feature = "yield")))]
    pub mod yields {
        use super::{monitor, ExchangeExit};
        use crate::relax::Yield;

        /// A [`thin::Monitor`] with the [`ExchangeExit`] policy, yielding
        /// during contention.
        ///
        /// [`thin::Monitor`]: monitor::Monitor
        pub type Monitor = monitor::Monitor<ExchangeExit, Yield>;
    }
}
