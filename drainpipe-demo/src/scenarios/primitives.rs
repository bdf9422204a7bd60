use drainpipe::concurrency::barrier::JoinBarrier;
use drainpipe::concurrency::counter::GuardedCounter;
use tokio::time::Instant;
use tracing::info;

/// Two tasks print a message each while the caller waits on a barrier.
///
/// The first task receives the message before it is replaced, the second one after.
pub async fn wait_group() {
    println!("Join barrier:");

    let started = Instant::now();
    let barrier = JoinBarrier::new();
    barrier.add(2);

    let mut msg = String::from("Hello");
    {
        let barrier = barrier.clone();
        let msg = msg.clone();
        tokio::spawn(async move {
            println!("{msg}");
            barrier.done();
        });
    }

    msg.replace_range(.., "Goodbye");
    {
        let barrier = barrier.clone();
        tokio::spawn(async move {
            println!("{msg}");
            barrier.done();
        });
    }

    barrier.wait().await;
    println!("Time waited: {:?}", started.elapsed());
}

/// Runs `pairs` reader/writer task pairs over one counter.
///
/// Every reader sees a consistent value, but the printed values are not sorted since the
/// lock does not order competing tasks.
pub async fn counter(pairs: usize) {
    println!("Guarded counter:");

    let counter = GuardedCounter::new(0);
    let barrier = JoinBarrier::new();

    for _ in 0..pairs {
        let reader = counter.clone();
        barrier.spawn(async move {
            reader.read_locked(|value| println!("Hello #{value}")).await;
        });

        let writer = counter.clone();
        barrier.spawn(async move {
            writer.increment().await;
        });
    }

    barrier.wait().await;

    let value = counter.get().await;
    info!(value, pairs, "counter scenario finished");
}
