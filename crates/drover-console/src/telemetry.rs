//! Log output for the console.
//!
//! Events go to stderr through `tracing_subscriber::fmt` so they never mix
//! with the prompt on stdout. The level defaults to `info` and can be
//! overridden with `RUST_LOG`, for example:
//!
//! ```bash
//! RUST_LOG=drover=debug drover
//! ```

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .compact(),
        )
        .try_init()?;

    Ok(())
}
