use clap::Parser;
use core::time::Duration;
use std::path::PathBuf;

/// Command-line arguments. Every flag can also be set through the environment
/// (or a `.env` file).
#[derive(Parser, Debug, Clone)]
#[command(version, about = "Interactive dynamic worker pool")]
pub struct CliArgs {
    /// File that workers record consumed items to.
    #[arg(long, env = "DROVER_OUTPUT", default_value = "log.txt")]
    pub output: PathBuf,

    /// Append to the output file instead of truncating it.
    #[arg(long, env = "DROVER_APPEND")]
    pub append: bool,

    /// Delay between generated items, in milliseconds.
    #[arg(long, env = "DROVER_GENERATE_INTERVAL_MS", default_value_t = 500)]
    pub generate_interval_ms: u64,

    /// How long a delete waits for a worker to stop, in milliseconds. 0 waits
    /// forever.
    #[arg(long, env = "DROVER_STOP_TIMEOUT_MS", default_value_t = 0)]
    pub stop_timeout_ms: u64,

    /// Workers to start before the first prompt.
    #[arg(long, env = "DROVER_INITIAL_WORKERS", default_value_t = 0)]
    pub initial_workers: usize,
}

/// Validated console configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub output: PathBuf,
    pub append: bool,
    pub generate_interval: Duration,
    pub stop_timeout: Option<Duration>,
    pub initial_workers: usize,
}

impl TryFrom<CliArgs> for ConsoleConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        anyhow::ensure!(
            args.generate_interval_ms > 0,
            "generate interval must be greater than 0"
        );
        anyhow::ensure!(
            !args.output.as_os_str().is_empty(),
            "output path must not be empty"
        );

        Ok(Self {
            output: args.output,
            append: args.append,
            generate_interval: Duration::from_millis(args.generate_interval_ms),
            stop_timeout: (args.stop_timeout_ms > 0)
                .then(|| Duration::from_millis(args.stop_timeout_ms)),
            initial_workers: args.initial_workers,
        })
    }
}
