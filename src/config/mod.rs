// Configuration module entry point
// Layers config file, environment and defaults into a typed Config

mod types;

use std::net::SocketAddr;
use std::path::PathBuf;

pub use types::{
    AccessConfig, Config, HttpConfig, LoggingConfig, ServerConfig, TemplatesConfig,
};

use crate::error::StartupError;

/// Environment variable prefix, e.g. `DISPATCH_SERVER__PORT=9000`
const ENV_PREFIX: &str = "DISPATCH";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, StartupError> {
        let builder = with_defaults(config::Config::builder())?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("access.open_extensions")
                    .with_list_parse_key("access.open_dirs")
                    .try_parsing(true),
            );

        let cfg: Self = builder.build()?.try_deserialize()?;
        Ok(cfg.normalized())
    }

    pub fn load() -> Result<Self, StartupError> {
        Self::load_from("config")
    }

    /// Parse a TOML document on top of the defaults
    pub fn from_toml_str(source: &str) -> Result<Self, StartupError> {
        let cfg: Self = with_defaults(config::Config::builder())?
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(cfg.normalized())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, StartupError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| StartupError::Config(format!("Invalid address: {e}")))
    }

    pub fn root_dir(&self) -> PathBuf {
        PathBuf::from(&self.server.root_dir)
    }

    /// Effective configuration rendered as TOML, for the startup log
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_else(|e| format!("# unable to render: {e}"))
    }

    /// Fill derived values: root URL from host/port, trailing slash
    fn normalized(mut self) -> Self {
        if self.server.root_url.is_empty() {
            self.server.root_url = format!("http://{}:{}/", self.server.host, self.server.port);
        }
        if !self.server.root_url.ends_with('/') {
            self.server.root_url.push('/');
        }
        self
    }
}

fn with_defaults(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
    builder
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8080)?
        .set_default("server.root_url", "")?
        .set_default("server.root_dir", "public")?
        .set_default("server.backlog", 128)?
        .set_default("logging.level", "info")?
        .set_default("logging.access_log", true)?
        .set_default("logging.access_log_format", "combined")?
        .set_default("http.server_name", concat!("dispatchd/", env!("CARGO_PKG_VERSION")))?
        .set_default("http.max_body_size", 1_048_576)? // 1MB
        .set_default("access.authorization_key", "is_authorized")?
        .set_default("access.open_extensions", vec!["html"])?
        .set_default("access.open_dirs", Vec::<String>::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::from_toml_str("").unwrap();
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.root_url, "http://127.0.0.1:8080/");
        assert_eq!(cfg.server.root_dir, "public");
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert_eq!(cfg.access.authorization_key, "is_authorized");
        assert_eq!(cfg.access.open_extensions, vec!["html".to_string()]);
        assert!(cfg.access.open_dirs.is_empty());
        assert_eq!(cfg.templates.error_page, None);
    }

    #[test]
    fn test_overrides_and_trailing_slash() {
        let cfg = Config::from_toml_str(
            r#"
            [server]
            port = 3333
            root_url = "http://localhost:3333"
            root_dir = "site"

            [access]
            open_dirs = ["downloadables"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.port, 3333);
        assert_eq!(cfg.server.root_url, "http://localhost:3333/");
        assert_eq!(cfg.server.root_dir, "site");
        assert_eq!(cfg.access.open_dirs, vec!["downloadables".to_string()]);
        assert_eq!(cfg.access.authorization_key, "is_authorized");
    }

    #[test]
    fn test_socket_addr() {
        let cfg = Config::from_toml_str("").unwrap();
        assert_eq!(cfg.get_socket_addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_invalid_type_is_config_error() {
        let err = Config::from_toml_str("[server]\nport = \"not a port\"").unwrap_err();
        assert!(matches!(err, StartupError::Config(_)));
    }

    #[test]
    fn test_toml_dump_mentions_sections() {
        let dump = Config::from_toml_str("").unwrap().to_toml();
        assert!(dump.contains("[server]"));
        assert!(dump.contains("root_dir = \"public\""));
    }
}
