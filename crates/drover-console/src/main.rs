#![doc = include_str!("../README.md")]

mod config;
mod console;
mod telemetry;

use anyhow::Context;
use clap::Parser;
use config::{CliArgs, ConsoleConfig};
use console::{Console, spawn_stdin_reader};
use drover::{AnimalSource, CancellationToken, FileSink, LineSink, Pool, queue, spawn_producer};
use std::sync::Arc;
use telemetry::init_telemetry;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ConsoleConfig::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    // The pool is useless without its sink, so failing to open it is fatal.
    let sink: Arc<dyn LineSink> = Arc::new(open_sink(&config)?);

    let (tx, rx) = queue::channel();
    let stop_producer = CancellationToken::new();
    let producer = spawn_producer(
        AnimalSource,
        tx,
        config.generate_interval,
        stop_producer.clone(),
    );

    let pool = match config.stop_timeout {
        Some(limit) => Pool::new().with_stop_timeout(limit),
        None => Pool::new(),
    };
    let pool = Arc::new(pool);
    for _ in 0..config.initial_workers {
        pool.add(rx.clone(), Arc::clone(&sink));
    }

    let interrupt = CancellationToken::new();
    tokio::spawn(shutdown_signal(interrupt.clone()));

    let lines = spawn_stdin_reader().context("failed to start stdin reader")?;
    let mut console = Console::new(
        lines,
        tokio::io::stdout(),
        pool,
        rx,
        sink,
        stop_producer,
    );
    console.run(interrupt).await?;

    producer.await.context("item producer panicked")?;

    tracing::info!("Shut down successfully");
    Ok(())
}

fn open_sink(config: &ConsoleConfig) -> anyhow::Result<FileSink> {
    let sink = if config.append {
        FileSink::append(&config.output)
    } else {
        FileSink::create(&config.output)
    };
    sink.with_context(|| format!("can't open output file {}", config.output.display()))
}

fn log_startup_info(config: &ConsoleConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting drover with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting drover, recording to {}",
            config.output.display()
        );
    }
}

/// Cancels `interrupt` on Ctrl+C or SIGTERM.
async fn shutdown_signal(interrupt: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    interrupt.cancel();
}
