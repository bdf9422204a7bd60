use drainpipe::concurrency::barrier::JoinBarrier;
use drainpipe::concurrency::queue::BoundedQueue;
use drainpipe::drain_error;
use drainpipe::error::{DrainError, DrainResult, ErrorKind};
use drainpipe::workers::producer::ProducerPool;

/// Number of senders and receivers meeting on the rendezvous queue.
const RENDEZVOUS_TASKS: usize = 5;

/// Runs the queue hand-off demos in sequence.
pub async fn run(capacity: usize) -> DrainResult<()> {
    range_drain(capacity).await?;
    partial_drain(capacity).await?;
    hand_off().await?;
    rendezvous().await
}

fn closed_early() -> DrainError {
    drain_error!(
        ErrorKind::QueueClosed,
        "Queue closed before the hand-off completed"
    )
}

/// A consumer drains until the producer closes the queue.
async fn range_drain(capacity: usize) -> DrainResult<()> {
    println!("Drain until close:");

    let queue = BoundedQueue::new(capacity);
    let barrier = JoinBarrier::new();

    let consumer = {
        let queue = queue.clone();
        barrier.spawn(async move {
            while let Some(value) = queue.dequeue().await {
                println!("{value}");
            }
        })
    };

    let producer = {
        let queue = queue.clone();
        barrier.spawn(async move {
            for value in [42, 27, 14] {
                queue.enqueue(value).await?;
            }
            // Without the close the consumer would wait forever.
            queue.close();

            Ok::<_, DrainError>(())
        })
    };

    barrier.wait().await;
    producer.await??;
    consumer.await?;

    Ok(())
}

/// The consumer takes a single value; the second one stays buffered.
async fn partial_drain(capacity: usize) -> DrainResult<()> {
    println!("Buffered queue:");

    let queue = BoundedQueue::new(capacity);
    let barrier = JoinBarrier::new();

    let consumer = {
        let queue = queue.clone();
        barrier.spawn(async move {
            let value = queue.dequeue().await.ok_or_else(closed_early)?;
            println!("{value}");

            Ok::<_, DrainError>(())
        })
    };

    let producer = {
        let sender = queue.sender();
        barrier.spawn(async move {
            sender.enqueue(42).await?;
            sender.enqueue(27).await
        })
    };

    barrier.wait().await;
    producer.await??;
    consumer.await??;

    println!("Left in queue: {}", queue.len());

    Ok(())
}

/// Two tasks exchange one value each way over single-slot queues.
async fn hand_off() -> DrainResult<()> {
    println!("Sender and receiver:");

    let to_up = BoundedQueue::new(1);
    let to_down = BoundedQueue::new(1);
    let barrier = JoinBarrier::new();

    let up = {
        let to_up = to_up.clone();
        let to_down = to_down.sender();
        barrier.spawn(async move {
            let value = to_up.dequeue().await.ok_or_else(closed_early)?;
            println!("Up: {value}");
            to_down.enqueue(27).await
        })
    };

    let down = {
        let to_up = to_up.sender();
        let to_down = to_down.clone();
        barrier.spawn(async move {
            to_up.enqueue(42).await?;
            let value = to_down.dequeue().await.ok_or_else(closed_early)?;
            println!("Down: {value}");

            Ok::<_, DrainError>(())
        })
    };

    barrier.wait().await;
    up.await??;
    down.await??;

    Ok(())
}

/// Many senders and receivers meet on a single-slot queue.
async fn rendezvous() -> DrainResult<()> {
    println!("Many senders and receivers:");

    let queue = BoundedQueue::new(1);
    let barrier = JoinBarrier::new();

    let receivers: Vec<_> = (0..RENDEZVOUS_TASKS)
        .map(|_| {
            let queue = queue.clone();
            barrier.spawn(async move {
                let value = queue.dequeue().await.ok_or_else(closed_early)?;
                println!("{value}");

                Ok::<_, DrainError>(())
            })
        })
        .collect();

    let mut senders = ProducerPool::new();
    for _ in 0..RENDEZVOUS_TASKS {
        let sender = queue.sender();
        senders.spawn(async move { sender.enqueue(42).await });
    }

    senders.wait_all().await?;
    barrier.wait().await;

    let mut errors = Vec::new();
    for receiver in receivers {
        if let Err(err) = receiver.await? {
            errors.push(err);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.into())
    }
}
