pub mod models {
    use loom::cell::UnsafeCell;
    use loom::sync::Arc;
    use loom::{model, thread};

    use std::vec::Vec;

    use crate::test::{id, Monitor};

    // TODO: Three or more threads make the claim-race models run for too
    // long. Two threads still cover the interesting interleavings: a raced
    // compare-and-swap claim, and a release concurrent with a claim attempt.
    const CONTENDERS: u32 = 2;

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

        /// Increments the value inside the critical section, optionally
        /// through a nested acquisition.
        fn inc(&self, n: u32, nested: bool) {
            let me = id(n);
            self.monitor.acquire(me);
            if nested {
                self.monitor.acquire(me);
            }
            self.value.with_mut(|ptr| unsafe { *ptr += 1 });
            if nested {
                self.monitor.release(me);
            }
            self.monitor.release(me);
        }

        /// Increments the value only if the monitor is immediately free.
        fn try_inc(&self, n: u32) {
            let me = id(n);
            if self.monitor.try_acquire(me) {
                self.value.with_mut(|ptr| unsafe { *ptr += 1 });
                self.monitor.release(me);
            }
        }

        /// Reads the value from inside the critical section.
        fn get(&self, n: u32) -> u32 {
            let me = id(n);
            self.monitor.acquire(me);
            let value = self.value.with(|ptr| unsafe { *ptr });
            self.monitor.release(me);
            value
        }
    }

    /// Evaluates that concurrent `acquire` calls serialize all mutations
    /// against the shared data, therefore no data races.
    pub fn acquire_join<L>()
    where
        L: Monitor + Send + Sync + 'static,
    {
        model(|| {
            let data = Arc::new(Protected::<L>::new());

            let handles: Vec<_> = (1..=CONTENDERS)
                .map(|n| {
                    let data = Arc::clone(&data);
                    thread::spawn(move || data.inc(n, false))
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            assert_eq!(data.get(CONTENDERS + 1), CONTENDERS);
        });
    }

    /// Evaluates that reentrant acquisitions inside the critical section do
    /// not break mutual exclusion between threads.
    pub fn nested_acquire_join<L>()
    where
        L: Monitor + Send + Sync + 'static,
    {
        model(|| {
            let data = Arc::new(Protected::<L>::new());

            let handles: Vec<_> = (1..=CONTENDERS)
                .map(|n| {
                    let data = Arc::clone(&data);
                    thread::spawn(move || data.inc(n, true))
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            assert_eq!(data.get(CONTENDERS + 1), CONTENDERS);
            assert!(!data.monitor.is_locked());
        });
    }

    /// Evaluates that concurrent `try_acquire` calls never hand the monitor
    /// to two identities at once.
    pub fn try_acquire_join<L>()
    where
        L: Monitor + Send + Sync + 'static,
    {
        model(|| {
            let data = Arc::new(Protected::<L>::new());

            let handles: Vec<_> = (1..=CONTENDERS)
                .map(|n| {
                    let data = Arc::clone(&data);
                    thread::spawn(move || data.try_inc(n))
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            let value = data.get(CONTENDERS + 1);
            assert!((0..=CONTENDERS).contains(&value));
        });
    }
}
