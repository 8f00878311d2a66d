//! Logger module
//!
//! Provides logging utilities for the dispatcher including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Error and warning logging with a level threshold
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::Config;
use crate::routing::Route;
use std::net::SocketAddr;
use writer::Stream;

/// Severity threshold, from most to least verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    /// Parse a config value; unknown names mean `Info`
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "debug" | "trace" => Self::Debug,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }
}

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        Level::parse(&config.logging.level),
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

fn emit(level: Level, stream: Stream, message: &str) {
    match writer::get() {
        Some(w) => w.log(level, stream, message),
        None if stream == Stream::Access => println!("{message}"),
        None => eprintln!("{message}"),
    }
}

pub fn log_debug(message: &str) {
    emit(Level::Debug, Stream::Access, &format!("[DEBUG] {message}"));
}

pub fn log_info(message: &str) {
    emit(Level::Info, Stream::Access, message);
}

pub fn log_warning(message: &str) {
    emit(Level::Warn, Stream::Error, &format!("[WARN] {message}"));
}

pub fn log_error(message: &str) {
    emit(Level::Error, Stream::Error, &format!("[ERROR] {message}"));
}

pub fn log_server_start(addr: &SocketAddr, config: &Config, route_count: usize) {
    log_info("======================================");
    log_info("Dispatcher started successfully");
    log_info(&format!("Listening on: http://{addr}"));
    log_info(&format!("Root URL: {}", config.server.root_url));
    log_info(&format!("Root directory: {}", config.server.root_dir));
    log_info(&format!("Registered routes: {route_count}"));
    log_info(&format!("Log level: {}", config.logging.level));
    if let Some(ref path) = config.logging.access_log_file {
        log_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        log_info(&format!("Error log: {path}"));
    }
    log_info("Requests are served one at a time");
    log_info("======================================\n");
}

pub fn log_config(config: &Config) {
    log_debug(&format!("[CONFIG] Effective configuration:\n{}", config.to_toml()));
}

pub fn log_route_registered(route: &Route) {
    let params: Vec<&str> = route.params().iter().map(|p| p.name.as_str()).collect();
    log_info(&format!(
        "[Route] {} /{}{} ({})",
        route.verb(),
        route.path(),
        if route.is_secure() { " [secure]" } else { "" },
        params.join(", ")
    ));
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    log_debug(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    log_error(&format!("Failed to serve connection: {err:?}"));
}

pub fn log_session_created(identity: &str, total: usize) {
    log_debug(&format!("[Session] Created for {identity} ({total} live)"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    emit(Level::Info, Stream::Access, &entry.format(format));
}

pub fn log_shutdown() {
    log_info("\n[Shutdown] Listener stopped");
}
