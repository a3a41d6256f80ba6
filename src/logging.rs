//! Tracing setup shared by both binaries.
//!
//! Every event is written twice: once to the console in compact form and once, without colour,
//! to a log file (`DOCRANK_LOG_FILE`, or `logs/docrank.log` by default). The server prints to
//! stdout. The CLI prints to stderr because its stdout carries the JSON result.
//!
//! Audit events from [`crate::audit::TracingAuditSink`] use the `audit` target, so
//! `RUST_LOG=audit=info` isolates them.
use std::fs::{File, OpenOptions};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, fmt::writer::BoxMakeWriter, prelude::*};

const DEFAULT_FILTER: &str = "info";
const DEFAULT_LOG_FILE: &str = "logs/docrank.log";

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Console stream receiving log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Console {
    /// Standard output, used by the server.
    #[default]
    Stdout,
    /// Standard error, for tools whose stdout is machine-readable.
    Stderr,
}

impl Console {
    fn writer(self) -> BoxMakeWriter {
        match self {
            Console::Stdout => BoxMakeWriter::new(std::io::stdout),
            Console::Stderr => BoxMakeWriter::new(std::io::stderr),
        }
    }

    fn is_terminal(self) -> bool {
        match self {
            Console::Stdout => std::io::stdout().is_terminal(),
            Console::Stderr => std::io::stderr().is_terminal(),
        }
    }
}

/// Install the global subscriber with console output on stdout.
pub fn init_tracing() {
    init_tracing_to(Console::Stdout);
}

/// Install the global subscriber with console output on `console`.
///
/// `RUST_LOG` controls filtering and defaults to `info`. A second call leaves the first
/// subscriber in place.
pub fn init_tracing_to(console: Console) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let console_layer = fmt::layer()
        .with_writer(console.writer())
        .with_ansi(console.is_terminal())
        .with_target(false)
        .compact();
    let file_layer = file_writer().map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .compact()
    });

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
    if let Err(err) = installed {
        eprintln!("tracing subscriber already installed: {err}");
    }
}

fn log_file_path() -> PathBuf {
    std::env::var_os("DOCRANK_LOG_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
}

fn open_log_file(path: &std::path::Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Non-blocking writer for the log file, or `None` when it cannot be opened.
fn file_writer() -> Option<NonBlocking> {
    let path = log_file_path();
    match open_log_file(&path) {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            // Flushes pending lines when the process exits.
            let _ = FILE_GUARD.set(guard);
            Some(writer)
        }
        Err(err) => {
            eprintln!("log file {} unavailable: {err}", path.display());
            None
        }
    }
}
