//! Output sinks shared by every worker in a pool.
//!
//! A [`LineSink`] is written to concurrently by all workers, so each call to
//! [`LineSink::write_line`] must land as one intact line. Both sinks here
//! serialize writers with a [`parking_lot::Mutex`] held for the whole line.

use parking_lot::Mutex;
use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::Path,
};

/// A destination for worker records.
pub trait LineSink: Send + Sync {
    /// Appends `line` followed by a newline as a single atomic write.
    fn write_line(&self, line: &str) -> io::Result<()>;
}

/// Append-only file sink.
#[derive(Debug)]
pub struct FileSink {
    file: Mutex<File>,
}

impl FileSink {
    /// Creates `path`, truncating any previous contents.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::from_file(File::create(path)?))
    }

    /// Opens `path` for appending, creating it if missing.
    pub fn append(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::from_file(file))
    }

    pub fn from_file(file: File) -> Self {
        Self {
            file: Mutex::new(file),
        }
    }
}

impl LineSink for FileSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        // One buffer, one write_all, so a line is never split between writers.
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');

        let mut file = self.file.lock();
        file.write_all(buf.as_bytes())?;
        file.flush()
    }
}

/// In-memory sink that keeps every line it receives.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines written so far, in write order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl LineSink for MemorySink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        self.lines.lock().push(line.to_owned());
        Ok(())
    }
}
