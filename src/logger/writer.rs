//! Log writer module
//!
//! Routes log lines to stdout/stderr or append-mode files. The writer is a
//! process-wide singleton set once at startup; until then lines fall back to
//! the standard streams.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock, PoisonError};

use super::Level;

static LOG_WRITER: OnceLock<LogWriter> = OnceLock::new();

/// Which log a line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    /// Access lines and informational messages
    Access,
    /// Warnings and errors
    Error,
}

enum Sink {
    Stdout,
    Stderr,
    File(File),
}

impl Sink {
    fn open(path: Option<&str>, fallback: Self) -> io::Result<Self> {
        path.map_or(Ok(fallback), |p| open_log_file(p).map(Self::File))
    }

    fn write_line(&mut self, message: &str) {
        match self {
            Self::Stdout => println!("{message}"),
            Self::Stderr => eprintln!("{message}"),
            Self::File(file) => {
                let _ = writeln!(file, "{message}");
            }
        }
    }
}

pub struct LogWriter {
    level: Level,
    access: Mutex<Sink>,
    error: Mutex<Sink>,
}

impl LogWriter {
    fn new(level: Level, access_log_file: Option<&str>, error_log_file: Option<&str>) -> io::Result<Self> {
        Ok(Self {
            level,
            access: Mutex::new(Sink::open(access_log_file, Sink::Stdout)?),
            error: Mutex::new(Sink::open(error_log_file, Sink::Stderr)?),
        })
    }

    pub const fn level(&self) -> Level {
        self.level
    }

    /// Write the line if `level` reaches the configured minimum
    pub fn log(&self, level: Level, stream: Stream, message: &str) {
        if level >= self.level {
            self.write(stream, message);
        }
    }

    pub fn write(&self, stream: Stream, message: &str) {
        let sink = match stream {
            Stream::Access => &self.access,
            Stream::Error => &self.error,
        };
        sink.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write_line(message);
    }
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> io::Result<File> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global writer; fails if already installed or a file cannot be opened
pub fn init(level: Level, access_log_file: Option<&str>, error_log_file: Option<&str>) -> io::Result<()> {
    let writer = LogWriter::new(level, access_log_file, error_log_file)?;
    LOG_WRITER.set(writer).map_err(|_| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "Log writer already initialized",
        )
    })
}

pub fn get() -> Option<&'static LogWriter> {
    LOG_WRITER.get()
}
