//! Demo binary running the drainpipe scenarios.
//!
//! Loads configuration, initializes tracing, starts a multi-threaded runtime and runs the
//! scenario selected on the command line. Rendered records and scenario output go to
//! stdout, diagnostics go to stderr.

use clap::Parser;
use drainpipe_telemetry::tracing::init_tracing;
use tracing::{info, warn};

use crate::cli::Args;
use crate::config::load_demo_config;

mod cli;
mod config;
mod scenarios;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_demo_config()?;

    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME"))?;

    let worker_threads = match config.worker_threads {
        Some(worker_threads) => worker_threads,
        None => std::thread::available_parallelism()?.get(),
    };

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()?
        .block_on(async_main(args, config, worker_threads))
}

async fn async_main(
    args: Args,
    config: drainpipe_config::shared::DemoConfig,
    worker_threads: usize,
) -> anyhow::Result<()> {
    println!("Threads available: {worker_threads}");

    let scenario = args.scenario();
    info!(?scenario, gap_ms = args.gap_ms, "running scenario");

    tokio::select! {
        result = scenarios::run(scenario, &config.pipeline, args.gap()) => result?,
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("sigint (ctrl+c) received, aborting the running scenario"),
                Err(err) => warn!(error = %err, "failed to listen for sigint, aborting"),
            }
            return Ok(());
        }
    }

    println!("Threads available: {worker_threads}");

    Ok(())
}
