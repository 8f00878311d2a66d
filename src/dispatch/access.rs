//! Access rules
//!
//! The dispatcher asks an `AccessPolicy` before invoking a secure route or
//! serving a file. `SessionFlagPolicy` is the stock policy: a truthy session
//! flag unlocks everything, and some extensions and directories are open to
//! anyone.

use std::path::{Path, PathBuf};

use crate::config::AccessConfig;
use crate::routing::Route;
use crate::session::Session;

pub trait AccessPolicy: Send + Sync {
    /// May this session invoke `route`?
    fn route_access(&self, route: &Route, session: &Session) -> bool;

    /// May this session fetch `relative_path` (relative to the root)?
    fn file_access(&self, relative_path: &Path, session: &Session) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFlagPolicy {
    flag: String,
    open_extensions: Vec<String>,
    open_dirs: Vec<PathBuf>,
}

impl SessionFlagPolicy {
    /// Only `.html` is open; everything else needs `flag`
    pub fn new(flag: impl Into<String>) -> Self {
        Self {
            flag: flag.into(),
            open_extensions: vec!["html".to_string()],
            open_dirs: Vec::new(),
        }
    }

    pub fn from_config(access: &AccessConfig) -> Self {
        Self {
            flag: access.authorization_key.clone(),
            open_extensions: access
                .open_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            open_dirs: access
                .open_dirs
                .iter()
                .map(|d| PathBuf::from(d.trim_matches('/')))
                .collect(),
        }
    }

    #[must_use]
    pub fn open_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.open_dirs.push(dir.into());
        self
    }

    pub fn flag(&self) -> &str {
        &self.flag
    }

    fn is_authorized(&self, session: &Session) -> bool {
        session.is_truthy(&self.flag)
    }
}

impl AccessPolicy for SessionFlagPolicy {
    fn route_access(&self, route: &Route, session: &Session) -> bool {
        !route.is_secure() || self.is_authorized(session)
    }

    fn file_access(&self, relative_path: &Path, session: &Session) -> bool {
        let open_extension = relative_path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.open_extensions
                    .iter()
                    .any(|open| open.eq_ignore_ascii_case(ext))
            });
        let open_dir = self
            .open_dirs
            .iter()
            .any(|dir| relative_path.starts_with(dir));

        open_extension || open_dir || self.is_authorized(session)
    }
}
