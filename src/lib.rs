//! An implementation of the reentrant per-object lock ("monitor") used by
//! managed-language runtimes, with interchangeable state encodings.
//!
//! A monitor is a mutual exclusion primitive that the same thread may acquire
//! multiple times without deadlocking. Its state is a pair of an owner
//! identity and a nest count, and this crate provides two encodings of that
//! pair under one contract:
//!
//! - a **thin lock**, packing owner and nest count into a single 32-bit word
//!   that is claimed with one compare-and-swap, see [`thin`];
//! - a **fat lock**, keeping owner and nest count in separate full-width
//!   fields with no capacity limits, see [`fat`].
//!
//! The thin lock additionally offers three *exit policies* that differ only
//! in how the owner writes the decremented state back on release: a plain
//! full-word store, a halfword store of the nest field alone, or a
//! compare-and-swap. Release does not semantically require atomicity beyond
//! a plain store, since only the current owner may mutate the word while the
//! lock is held; the policies exist so that the cost of defensive atomicity
//! on the exit path can be measured against that invariant.
//!
//! # Thread identities
//!
//! Monitors do not look up the caller's identity: every operation takes an
//! explicit [`ThreadId`], a non-zero integer that callers assign and keep
//! unique per thread. The thin encoding bounds identities to 13 bits (up to
//! 8191 concurrently distinguishable threads); the fat encoding accepts the
//! full range. With the `thread_local` feature, [`thread_id::current`]
//! assigns a process-unique id to each OS thread on first use.
//!
//! ```
//! use monlock::thin::stores::Monitor;
//! use monlock::ThreadId;
//!
//! let me = ThreadId::new(1).unwrap();
//! let monitor = Monitor::new();
//!
//! monitor.acquire(me);
//! monitor.acquire(me);
//! assert_eq!(monitor.depth(), 2);
//!
//! monitor.release(me);
//! monitor.release(me);
//! assert!(!monitor.is_locked());
//! ```
//!
//! # Contention
//!
//! Lock acquisitions by distinct identities are serialized but not ordered:
//! there is no queue and no fairness guarantee. While another thread holds
//! the lock, `acquire` applies a waiting policy, chosen as a type parameter:
//!
//! - [`relax`] policies busy-wait: [`Spin`] signals the processor that it is
//!   running a spin-loop, [`Yield`] gives the time slice back to the OS
//!   scheduler (requires the `yield` feature), and variants of both perform
//!   exponential backoff.
//! - [`parking`] policies (requires the `parking` feature) put the thread to
//!   sleep on the lock word after a bounded number of attempts, to be woken
//!   by the releasing owner.
//!
//! [Spinlocks are usually not what you want]: prefer a parking policy, or an
//! OS-based mutex altogether, unless busy-waiting for very short periods is
//! exactly the behavior being measured.
//!
//! # Encoding selection
//!
//! The encoding is an explicit configuration choice, not a compile-time
//! switch: all variants coexist in one build. Pick one statically through
//! the alias modules ([`thin::stores`], [`thin::halfwords`],
//! [`thin::exchanges`], [`fat`]), or at run time through
//! [`select::Monitor`], whose [`select::Strategy`] parses from configuration
//! strings.
//!
//! # Features
//!
//! This crate does not provide any default features. Features that can be
//! enabled are:
//!
//! ## yield
//!
//! The `yield` feature requires linking to the standard library, so it is
//! not suitable for `no_std` environments. By enabling the `yield` feature,
//! the [`Yield`] and [`YieldBackoff`] relax policies become available, which
//! cooperatively give up a timeslice to the OS scheduler instead of busy
//! waiting.
//!
//! ## parking
//!
//! The `parking` feature enables the [`parking`] module, whose waiting
//! policies sleep on the lock word during contention instead of spinning,
//! through the [`atomic_wait`] crate's futex-style interface.
//!
//! ## thread_local
//!
//! The `thread_local` feature requires linking to the standard library. It
//! enables the [`thread_id`] module, which hands out a unique [`ThreadId`]
//! per OS thread.
//!
//! [`Spin`]: relax::Spin
//! [`Yield`]: relax::Yield
//! [`YieldBackoff`]: relax::YieldBackoff
//! [`atomic_wait`]: https://docs.rs/atomic-wait/latest/atomic_wait
//! [Spinlocks are usually not what you want]: https://matklad.github.io/2020/01/02/spinlocks-considered-harmful.html

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::inline_always)]
#![allow(clippy::doc_markdown)]
#![warn(rust_2021_compatibility)]
#![warn(missing_docs)]

#[cfg(any(feature = "yield", feature = "thread_local", loom, test))]
extern crate std;

pub mod fat;
pub mod relax;
pub mod thin;
pub mod wait;

#[cfg(not(all(loom, test)))]
pub mod select;

#[cfg(feature = "parking")]
#[cfg_attr(docsrs, doc(cfg(feature = "parking")))]
pub mod parking;

#[cfg(feature = "thread_local")]
#[cfg_attr(docsrs, doc(cfg(feature = "thread_local")))]
pub mod thread_id;

pub use word::ThreadId;

pub(crate) mod cfg;
pub(crate) mod word;

#[cfg(test)]
pub(crate) mod test;

#[cfg(all(loom, test))]
#[cfg(not(tarpaulin))]
pub(crate) mod loom;
