use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use drainpipe::concurrency::barrier::JoinBarrier;
use drainpipe::concurrency::counter::GuardedCounter;
use drainpipe_telemetry::tracing::init_test_tracing;
use tokio::time::{sleep, timeout};

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_increments_are_all_counted() {
    init_test_tracing();

    const WRITERS: i64 = 1000;

    let counter = GuardedCounter::new(0);
    let barrier = JoinBarrier::new();

    for _ in 0..WRITERS {
        let counter = counter.clone();
        barrier.spawn(async move {
            counter.increment().await;
        });
    }
    // Readers interleave with writers and only ever see values in range.
    for _ in 0..10 {
        let counter = counter.clone();
        barrier.spawn(async move {
            let value = counter.get().await;
            assert!((0..=WRITERS).contains(&value));
        });
    }

    timeout(TEST_TIMEOUT, barrier.wait()).await.unwrap();

    assert_eq!(counter.get().await, WRITERS);
}

#[tokio::test(flavor = "multi_thread")]
async fn barrier_waits_for_every_worker() {
    init_test_tracing();

    const WORKERS: usize = 5;

    let barrier = JoinBarrier::new();
    let finished = Arc::new(AtomicUsize::new(0));

    barrier.add(WORKERS);
    for worker in 0..WORKERS {
        let barrier = barrier.clone();
        let finished = finished.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(10 * worker as u64)).await;
            finished.fetch_add(1, Ordering::SeqCst);
            barrier.done();
        });
    }

    timeout(TEST_TIMEOUT, barrier.wait()).await.unwrap();

    assert_eq!(finished.load(Ordering::SeqCst), WORKERS);
    assert_eq!(barrier.pending(), 0);
}
