//! Line-oriented operator console.
//!
//! The [`Console`] reads commands one line at a time and drives a shared
//! [`Pool`]. Lines arrive over an [`mpsc`] channel rather than from stdin
//! directly: [`spawn_stdin_reader`] feeds the channel from a dedicated thread,
//! and tests feed it by hand.

use drover::{CancellationToken, ItemReceiver, LineSink, Pool, WorkerId};
use std::{
    io::{self, BufRead},
    sync::Arc,
    thread,
};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};

const HELP: &str = "\
Available commands:
  add    - add a worker
  delete - delete a worker
  list   - list active workers
  help   - show this message
  exit   - stop the pool and quit";

/// A parsed console command. Matching ignores case and surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add,
    Delete,
    List,
    Help,
    Exit,
    Unknown(String),
}

impl From<&str> for Command {
    fn from(line: &str) -> Self {
        let line = line.trim();
        match line.to_lowercase().as_str() {
            "add" => Self::Add,
            "delete" => Self::Delete,
            "list" => Self::List,
            "help" => Self::Help,
            "exit" => Self::Exit,
            _ => Self::Unknown(line.to_owned()),
        }
    }
}

/// Reads stdin on a dedicated thread and forwards each line.
///
/// Blocking stdin reads stay off the runtime, so shutdown never waits for the
/// operator to press enter. The thread ends on EOF, on a read error, or once
/// the receiver is dropped.
pub fn spawn_stdin_reader() -> io::Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(16);
    thread::Builder::new()
        .name("drover-stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

/// Interactive control surface for a [`Pool`].
pub struct Console<W> {
    lines: mpsc::Receiver<String>,
    out: W,
    pool: Arc<Pool>,
    input: ItemReceiver,
    sink: Arc<dyn LineSink>,
    producer: CancellationToken,
}

impl<W: AsyncWrite + Unpin> Console<W> {
    /// Creates a console. New workers consume from `input` and record to
    /// `sink`; `producer` is cancelled on exit to stop item generation.
    pub fn new(
        lines: mpsc::Receiver<String>,
        out: W,
        pool: Arc<Pool>,
        input: ItemReceiver,
        sink: Arc<dyn LineSink>,
        producer: CancellationToken,
    ) -> Self {
        Self {
            lines,
            out,
            pool,
            input,
            sink,
            producer,
        }
    }

    pub fn pool(&self) -> &Arc<Pool> {
        &self.pool
    }

    /// Runs the command loop until `exit`, end of input, or `interrupt`, then
    /// stops the producer and finishes the pool.
    ///
    /// # Errors
    ///
    /// Only fails if writing to the console output fails. Pool errors are
    /// reported to the operator and the loop continues.
    pub async fn run(&mut self, interrupt: CancellationToken) -> anyhow::Result<()> {
        self.say(HELP).await?;

        loop {
            self.say("Enter command:").await?;
            let Some(line) = self.next_line(&interrupt).await else {
                break;
            };

            match Command::from(line.as_str()) {
                Command::Add => {
                    let id = self.pool.add(self.input.clone(), Arc::clone(&self.sink));
                    self.say(&format!("Added worker {id}")).await?;
                }
                Command::Delete => {
                    self.say("Enter worker id:").await?;
                    let Some(raw) = self.next_line(&interrupt).await else {
                        break;
                    };
                    self.delete(raw.trim()).await?;
                }
                Command::List => self.list().await?,
                Command::Help => self.say(HELP).await?,
                Command::Exit => break,
                Command::Unknown(raw) => self.say(&format!("Unknown command: {raw}")).await?,
            }
        }

        self.shutdown().await
    }

    async fn next_line(&mut self, interrupt: &CancellationToken) -> Option<String> {
        tokio::select! {
            biased;
            () = interrupt.cancelled() => {
                tracing::info!("Console interrupted");
                None
            }
            line = self.lines.recv() => line,
        }
    }

    async fn delete(&mut self, raw: &str) -> io::Result<()> {
        let Ok(id) = raw.parse::<WorkerId>() else {
            return self.say(&format!("Invalid worker id: {raw}")).await;
        };

        match self.pool.delete(id).await {
            Ok(()) => self.say(&format!("Deleted worker {id}")).await,
            Err(e) => self.say(&format!("delete worker from pool: {e}")).await,
        }
    }

    async fn list(&mut self) -> io::Result<()> {
        let ids = self.pool.worker_ids();
        if ids.is_empty() {
            return self.say("No active workers").await;
        }
        let ids: Vec<_> = ids.iter().map(ToString::to_string).collect();
        self.say(&format!("Active workers: {}", ids.join(", "))).await
    }

    async fn shutdown(&mut self) -> anyhow::Result<()> {
        self.producer.cancel();
        self.say(&format!("Stopping {} workers", self.pool.len()))
            .await?;

        if let Err(e) = self.pool.finish().await {
            tracing::warn!("Pool did not finish cleanly: {e}");
            self.say(&format!("finish worker pool: {e}")).await?;
        }

        self.say("Worker pool stopped").await?;
        Ok(())
    }

    async fn say(&mut self, message: &str) -> io::Result<()> {
        self.out.write_all(message.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await
    }
}
