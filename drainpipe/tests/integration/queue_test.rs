use std::time::Duration;

use drainpipe::concurrency::queue::BoundedQueue;
use drainpipe::error::ErrorKind;
use drainpipe_telemetry::tracing::init_test_tracing;
use tokio::time::{sleep, timeout};

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test(flavor = "multi_thread")]
async fn buffered_items_never_exceed_capacity() {
    init_test_tracing();

    const CAPACITY: usize = 3;
    const ITEMS: usize = 200;

    let queue = BoundedQueue::new(CAPACITY);

    let producers: Vec<_> = (0..4)
        .map(|producer| {
            let sender = queue.sender();
            tokio::spawn(async move {
                for i in 0..ITEMS / 4 {
                    sender.enqueue(producer * 1000 + i).await.unwrap();
                }
            })
        })
        .collect();

    let consumer = {
        let queue = queue.clone();
        tokio::spawn(async move {
            let mut received = 0;
            while queue.dequeue().await.is_some() {
                assert!(queue.len() <= CAPACITY);
                received += 1;
                if received % 10 == 0 {
                    sleep(Duration::from_millis(1)).await;
                }
            }
            received
        })
    };

    for producer in producers {
        producer.await.unwrap();
    }
    queue.close();

    let received = timeout(TEST_TIMEOUT, consumer).await.unwrap().unwrap();
    assert_eq!(received, ITEMS);
}

#[tokio::test(flavor = "multi_thread")]
async fn close_releases_every_blocked_producer() {
    init_test_tracing();

    let queue = BoundedQueue::new(1);
    queue.enqueue(0).await.unwrap();

    let blocked: Vec<_> = (1..=3)
        .map(|i| {
            let sender = queue.sender();
            tokio::spawn(async move { sender.enqueue(i).await })
        })
        .collect();

    sleep(Duration::from_millis(50)).await;
    queue.close();

    for producer in blocked {
        let err = timeout(TEST_TIMEOUT, producer)
            .await
            .unwrap()
            .unwrap()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::QueueClosed);
    }

    // The item buffered before the close is still delivered.
    assert_eq!(queue.dequeue().await, Some(0));
    assert_eq!(queue.dequeue().await, None);
    assert_eq!(queue.dequeue().await, None);
}
