use std::time::Duration;

use drainpipe::error::ErrorKind;
use drainpipe::pipeline::Pipeline;
use drainpipe::sink::memory::MemorySink;
use drainpipe::sink::writer::WriterSink;
use drainpipe::types::{Record, Severity};
use drainpipe_config::shared::{PipelineConfig, QueueConfig, ShutdownConfig, ShutdownProtocol};
use drainpipe_telemetry::tracing::init_test_tracing;
use tokio::time::{Instant, sleep, timeout};

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

fn config(protocol: ShutdownProtocol, capacity: usize, grace_delay_ms: u64) -> PipelineConfig {
    PipelineConfig {
        queue: QueueConfig { capacity },
        shutdown: ShutdownConfig {
            protocol,
            grace_delay_ms,
        },
    }
}

#[tokio::test(start_paused = true)]
async fn start_and_shutdown_records_are_written_two_seconds_apart() {
    init_test_tracing();

    let sink = WriterSink::new(Vec::<u8>::new());
    let mut pipeline =
        Pipeline::new(config(ShutdownProtocol::DelayClose, 50, 100), sink.clone()).unwrap();
    pipeline.start().await.unwrap();

    let started = Instant::now();
    pipeline.log(Severity::Info, "start").await.unwrap();
    sleep(Duration::from_secs(2)).await;
    pipeline.log(Severity::Info, "shutdown").await.unwrap();

    let report = pipeline.shutdown_and_wait().await.unwrap();

    assert_eq!(report.drained, 2);
    assert!(report.queue_closed);
    // Two seconds between the records plus the grace delay.
    assert!(started.elapsed() >= Duration::from_millis(2100));

    let output = sink
        .with_writer(|bytes| String::from_utf8(bytes.clone()).unwrap())
        .await;
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with(" - [INFO] start"));
    assert!(lines[1].ends_with(" - [INFO] shutdown"));
    // `YYYY-MM-DDTHH:MM:SS` prefix.
    assert_eq!(lines[0].find(" - ["), Some(19));
    assert_eq!(&lines[0][10..11], "T");
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_producers_keep_their_own_order() {
    init_test_tracing();

    const PRODUCERS: usize = 4;
    const RECORDS_PER_PRODUCER: usize = 100;

    let sink = MemorySink::new();
    let mut pipeline =
        Pipeline::new(config(ShutdownProtocol::DelayClose, 5, 20), sink.clone()).unwrap();
    pipeline.start().await.unwrap();

    let mut producers = Vec::with_capacity(PRODUCERS);
    for producer in 0..PRODUCERS {
        let sender = pipeline.sender();
        producers.push(tokio::spawn(async move {
            for sequence in 0..RECORDS_PER_PRODUCER {
                let jitter = rand::random::<u64>() % 200;
                sleep(Duration::from_micros(jitter)).await;

                sender
                    .enqueue(Record::info(format!("{producer}:{sequence}")))
                    .await
                    .unwrap();
            }
        }));
    }
    for producer in producers {
        producer.await.unwrap();
    }

    let report = timeout(TEST_TIMEOUT, pipeline.shutdown_and_wait())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.drained as usize, PRODUCERS * RECORDS_PER_PRODUCER);
    assert_eq!(report.abandoned, 0);

    let mut next_sequence = [0usize; PRODUCERS];
    for record in sink.records().await {
        let (producer, sequence) = record.message().split_once(':').unwrap();
        let producer: usize = producer.parse().unwrap();
        let sequence: usize = sequence.parse().unwrap();

        assert_eq!(sequence, next_sequence[producer]);
        next_sequence[producer] += 1;
    }
    assert!(next_sequence.iter().all(|count| *count == RECORDS_PER_PRODUCER));
}

#[tokio::test(flavor = "multi_thread")]
async fn enqueue_after_delay_close_fails() {
    init_test_tracing();

    let sink = MemorySink::new();
    let mut pipeline =
        Pipeline::new(config(ShutdownProtocol::DelayClose, 4, 10), sink.clone()).unwrap();
    let sender = pipeline.sender();
    pipeline.start().await.unwrap();

    sender.enqueue(Record::info("before close")).await.unwrap();
    timeout(TEST_TIMEOUT, pipeline.shutdown_and_wait())
        .await
        .unwrap()
        .unwrap();

    assert!(sender.is_closed());
    let err = sender
        .enqueue(Record::error("after close"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::QueueClosed);
    assert_eq!(sink.lines().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn done_signal_accounts_for_every_record() {
    init_test_tracing();

    const RECORDS: usize = 20;

    let sink = MemorySink::new();
    let mut pipeline =
        Pipeline::new(config(ShutdownProtocol::DoneSignal, RECORDS, 0), sink.clone()).unwrap();
    pipeline.start().await.unwrap();

    for i in 0..RECORDS {
        pipeline
            .log(Severity::Info, format!("record {i}"))
            .await
            .unwrap();
    }

    let report = timeout(TEST_TIMEOUT, pipeline.shutdown_and_wait())
        .await
        .unwrap()
        .unwrap();

    // Records may be lost, but none is duplicated and the drained ones are a prefix.
    assert_eq!(report.drained as usize + report.abandoned, RECORDS);
    let messages: Vec<String> = sink
        .records()
        .await
        .iter()
        .map(|record| record.message().to_owned())
        .collect();
    let expected: Vec<String> = (0..report.drained).map(|i| format!("record {i}")).collect();
    assert_eq!(messages, expected);
}
