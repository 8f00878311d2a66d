// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub http: HttpConfig,
    pub access: AccessConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base URL prepended to redirect targets; derived from host/port if empty
    #[serde(default)]
    pub root_url: String,
    /// Directory static files and templates are served from
    pub root_dir: String,
    /// Listen backlog
    pub backlog: u32,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub server_name: String,
    pub max_body_size: u64,
}

/// Access rules applied by the default policy
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct AccessConfig {
    /// Session key whose truthiness grants access to secured routes and files
    pub authorization_key: String,
    /// File extensions anyone may fetch
    pub open_extensions: Vec<String>,
    /// Directories (relative to the root) anyone may fetch from
    #[serde(default)]
    pub open_dirs: Vec<String>,
}

/// Template configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct TemplatesConfig {
    /// Error page relative to `server.root_dir`; a built-in page is used if unset
    #[serde(default)]
    pub error_page: Option<String>,
}
