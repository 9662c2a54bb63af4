use std::sync::mpsc::channel;
use std::sync::Arc;
use std::thread;

use monlock::select::{Monitor, Strategy};
use monlock::{fat, thin, ThreadId};

const STRATEGIES: [Strategy; 4] =
    [Strategy::Store, Strategy::Halfword, Strategy::Exchange, Strategy::Fat];

fn id(n: u32) -> ThreadId {
    ThreadId::new(n).unwrap()
}

#[test]
fn triple_acquisition_by_one_thread() {
    for strategy in STRATEGIES {
        let monitor: Monitor = Monitor::new(strategy);
        let me = id(7);

        monitor.acquire(me);
        monitor.acquire(me);
        monitor.acquire(me);
        assert_eq!(monitor.depth(), 3, "{strategy}");
        assert_eq!(monitor.holder(), Some(me), "{strategy}");

        monitor.release(me);
        monitor.release(me);
        monitor.release(me);
        assert_eq!(monitor.depth(), 0, "{strategy}");
        assert_eq!(monitor.holder(), None, "{strategy}");
        assert!(!monitor.is_locked(), "{strategy}");
    }
}

#[test]
#[should_panic(expected = "held by thread")]
fn wrong_owner_release_is_fatal() {
    let monitor = thin::stores::Monitor::new();
    monitor.acquire(id(5));
    monitor.release(id(3));
}

#[test]
#[should_panic(expected = "unlocked")]
fn unheld_release_is_fatal() {
    let monitor = fat::spins::Monitor::new();
    monitor.release(id(1));
}

#[test]
fn contender_acquires_after_the_holder_releases() {
    for strategy in STRATEGIES {
        let monitor: Arc<Monitor> = Arc::new(Monitor::new(strategy));
        let c_monitor = Arc::clone(&monitor);
        let (started, running) = channel();

        monitor.acquire(id(1));

        let contender = thread::spawn(move || {
            started.send(()).unwrap();
            c_monitor.acquire(id(2));
            let holder = c_monitor.holder();
            c_monitor.release(id(2));
            holder
        });

        running.recv().unwrap();
        thread::yield_now();
        monitor.release(id(1));

        let holder = contender.join().expect("thread::spawn failed");
        assert_eq!(holder, Some(id(2)), "{strategy}");
        assert!(!monitor.is_locked(), "{strategy}");
    }
}

#[test]
fn racing_claims_serialize() {
    for strategy in STRATEGIES {
        let monitor: Arc<Monitor> = Arc::new(Monitor::new(strategy));

        let threads: Vec<_> = (1..=8)
            .map(|n| {
                let monitor = Arc::clone(&monitor);
                thread::spawn(move || {
                    let me = id(n);
                    for _ in 0..100 {
                        monitor.acquire(me);
                        assert_eq!(monitor.holder(), Some(me));
                        assert_eq!(monitor.depth(), 1);
                        monitor.release(me);
                    }
                })
            })
            .collect();

        for thread in threads {
            thread.join().expect("thread::spawn failed");
        }
        assert!(!monitor.is_locked(), "{strategy}");
    }
}

#[test]
fn guards_release_in_reverse_order() {
    let monitor = thin::exchanges::Monitor::new();
    let me = id(4);
    {
        let outer = monitor.enter(me);
        {
            let inner = monitor.enter(me);
            assert_eq!(inner.owner(), me);
            assert_eq!(monitor.depth(), 2);
        }
        assert_eq!(outer.owner(), me);
        assert_eq!(monitor.depth(), 1);
    }
    assert!(!monitor.is_locked());
}

#[test]
fn strategies_parse_from_configuration() {
    for strategy in STRATEGIES {
        let parsed: Strategy = strategy.name().parse().unwrap();
        assert_eq!(parsed, strategy);
    }
    let err = "thin".parse::<Strategy>().unwrap_err();
    assert!(err.to_string().contains("unknown monitor strategy"));
}

#[test]
fn static_monitors_are_supported() {
    static MONITOR: thin::stores::Monitor = thin::stores::Monitor::new();

    let me = id(1);
    MONITOR.acquire(me);
    assert!(MONITOR.is_locked());
    MONITOR.release(me);
    assert!(!MONITOR.is_locked());
}
