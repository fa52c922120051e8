//! Pool Tests
//!
//! Tests for acquire/release/destroy accounting, blocking, cancellation and
//! close.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use socketmap::pool::{Manager, Pool};
use socketmap::{Context, Error, Result};

// =============================================================================
// Test Manager
// =============================================================================

#[derive(Default)]
struct Counters {
    created: AtomicUsize,
    destroyed: AtomicUsize,
    fail_next: AtomicBool,
}

struct TestManager {
    counters: Arc<Counters>,
}

impl Manager for TestManager {
    type Resource = usize;

    fn create(&self, _ctx: &Context) -> Result<usize> {
        if self.counters.fail_next.swap(false, Ordering::SeqCst) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "refused",
            )));
        }
        Ok(self.counters.created.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn destroy(&self, _resource: usize) {
        self.counters.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

fn pool(capacity: usize) -> (Pool<TestManager>, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    let manager = TestManager {
        counters: counters.clone(),
    };
    (Pool::new(manager, capacity), counters)
}

fn short_ctx(ms: u64) -> Context {
    Context::background()
        .with_timeout(Duration::from_millis(ms))
        .0
}

// =============================================================================
// Acquire / Release / Destroy
// =============================================================================

#[test]
fn test_released_resource_is_reused() {
    let (pool, counters) = pool(2);
    let ctx = Context::background();

    let first = pool.acquire(&ctx).unwrap();
    assert_eq!(*first, 1);
    first.release();

    let second = pool.acquire(&ctx).unwrap();
    assert_eq!(*second, 1);
    assert_eq!(counters.created.load(Ordering::SeqCst), 1);

    let stats = pool.stats();
    assert_eq!(stats.live, 1);
    assert_eq!(stats.idle, 0);
}

#[test]
fn test_resources_created_lazily_up_to_capacity() {
    let (pool, counters) = pool(2);
    let ctx = Context::background();

    let a = pool.acquire(&ctx).unwrap();
    let b = pool.acquire(&ctx).unwrap();
    assert_ne!(*a, *b);
    assert_eq!(counters.created.load(Ordering::SeqCst), 2);

    let err = pool.acquire(&short_ctx(50)).unwrap_err();
    assert!(matches!(err, Error::DeadlineExceeded));
    assert_eq!(counters.created.load(Ordering::SeqCst), 2);
}

#[test]
fn test_destroy_frees_slot() {
    let (pool, counters) = pool(1);
    let ctx = Context::background();

    let conn = pool.acquire(&ctx).unwrap();
    conn.destroy();
    assert_eq!(counters.destroyed.load(Ordering::SeqCst), 1);
    assert_eq!(pool.stats().live, 0);

    let conn = pool.acquire(&short_ctx(200)).unwrap();
    assert_eq!(*conn, 2);
}

#[test]
fn test_broken_resource_destroyed_on_drop() {
    let (pool, counters) = pool(1);
    let ctx = Context::background();

    let mut conn = pool.acquire(&ctx).unwrap();
    assert_eq!(format!("{:?}", conn), "Pooled { broken: false, .. }");
    conn.mark_broken();
    assert_eq!(format!("{:?}", conn), "Pooled { broken: true, .. }");
    drop(conn);

    assert_eq!(counters.destroyed.load(Ordering::SeqCst), 1);
    assert_eq!(pool.stats().idle, 0);
    assert_eq!(*pool.acquire(&ctx).unwrap(), 2);
}

#[test]
fn test_construction_failure_propagates_and_frees_slot() {
    let (pool, counters) = pool(1);
    let ctx = Context::background();

    counters.fail_next.store(true, Ordering::SeqCst);
    let err = pool.acquire(&ctx).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert_eq!(pool.stats().live, 0);

    // The pool itself never retried; the next acquire constructs again.
    assert_eq!(*pool.acquire(&short_ctx(200)).unwrap(), 1);
}

// =============================================================================
// Blocking and Cancellation
// =============================================================================

#[test]
fn test_cancelled_context_fails_before_anything_else() {
    let (pool, counters) = pool(1);
    let (ctx, cancel) = Context::background().with_cancel();
    cancel.cancel();

    assert!(matches!(pool.acquire(&ctx), Err(Error::Cancelled)));
    assert_eq!(counters.created.load(Ordering::SeqCst), 0);
}

#[test]
fn test_cancelled_context_does_not_block_when_exhausted() {
    let (pool, _) = pool(1);
    let _held = pool.acquire(&Context::background()).unwrap();

    let (ctx, cancel) = Context::background().with_cancel();
    cancel.cancel();

    let start = Instant::now();
    assert!(matches!(pool.acquire(&ctx), Err(Error::Cancelled)));
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[test]
fn test_blocked_acquire_wakes_on_release() {
    let (pool, _) = pool(1);
    let held = pool.acquire(&Context::background()).unwrap();

    let waiter = {
        let pool = pool.clone();
        thread::spawn(move || pool.acquire(&short_ctx(2000)).map(|conn| *conn))
    };

    thread::sleep(Duration::from_millis(50));
    held.release();

    assert_eq!(waiter.join().unwrap().unwrap(), 1);
}

#[test]
fn test_blocked_acquire_wakes_on_destroy() {
    let (pool, counters) = pool(1);
    let held = pool.acquire(&Context::background()).unwrap();

    let waiter = {
        let pool = pool.clone();
        thread::spawn(move || pool.acquire(&short_ctx(2000)).map(|conn| *conn))
    };

    thread::sleep(Duration::from_millis(50));
    held.destroy();

    assert_eq!(waiter.join().unwrap().unwrap(), 2);
    assert_eq!(counters.created.load(Ordering::SeqCst), 2);
}

#[test]
fn test_blocked_acquire_wakes_on_cancel() {
    let (pool, _) = pool(1);
    let _held = pool.acquire(&Context::background()).unwrap();
    let (ctx, cancel) = Context::background().with_cancel();

    let waiter = {
        let pool = pool.clone();
        thread::spawn(move || {
            let start = Instant::now();
            let result = pool.acquire(&ctx).map(|conn| *conn);
            (result, start.elapsed())
        })
    };

    thread::sleep(Duration::from_millis(50));
    cancel.cancel();

    let (result, elapsed) = waiter.join().unwrap();
    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(elapsed < Duration::from_secs(1));
}

#[test]
fn test_capacity_never_exceeded() {
    let (pool, counters) = pool(3);
    let in_use = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..10)
        .map(|_| {
            let pool = pool.clone();
            let in_use = in_use.clone();
            let peak = peak.clone();
            thread::spawn(move || {
                for _ in 0..20 {
                    let conn = pool.acquire(&short_ctx(5000)).unwrap();
                    let now = in_use.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(1));
                    in_use.fetch_sub(1, Ordering::SeqCst);
                    drop(conn);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(counters.created.load(Ordering::SeqCst) <= 3);
    assert!(pool.stats().live <= 3);
}

// =============================================================================
// Close
// =============================================================================

#[test]
fn test_close_destroys_idle_and_rejects_acquire() {
    let (pool, counters) = pool(2);
    let ctx = Context::background();

    let a = pool.acquire(&ctx).unwrap();
    let b = pool.acquire(&ctx).unwrap();
    drop(a);
    drop(b);
    assert_eq!(pool.stats().idle, 2);

    pool.close();
    assert_eq!(counters.destroyed.load(Ordering::SeqCst), 2);
    assert!(pool.is_closed());
    assert!(matches!(pool.acquire(&ctx), Err(Error::PoolClosed)));

    // Closing twice is harmless.
    pool.close();
}

#[test]
fn test_close_waits_for_acquired_resources() {
    let (pool, counters) = pool(1);
    let held = pool.acquire(&Context::background()).unwrap();

    let holder = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        held.release();
    });

    let start = Instant::now();
    pool.close();
    assert!(start.elapsed() >= Duration::from_millis(80));
    assert_eq!(counters.destroyed.load(Ordering::SeqCst), 1);
    assert_eq!(pool.stats().live, 0);

    holder.join().unwrap();
}

#[test]
fn test_close_wakes_blocked_acquirer() {
    let (pool, _) = pool(1);
    let held = pool.acquire(&Context::background()).unwrap();

    let waiter = {
        let pool = pool.clone();
        thread::spawn(move || pool.acquire(&Context::background()).map(|conn| *conn))
    };
    thread::sleep(Duration::from_millis(50));

    let closer = {
        let pool = pool.clone();
        thread::spawn(move || pool.close())
    };

    assert!(matches!(waiter.join().unwrap(), Err(Error::PoolClosed)));
    drop(held);
    closer.join().unwrap();
}
