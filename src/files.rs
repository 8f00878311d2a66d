//! Static file serving module
//!
//! Resolves request paths to files under the root directory. Paths that
//! escape the root after canonicalization are treated as missing.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::{DispatchError, StartupError};
use crate::http::mime;
use crate::logger;

const INDEX_FILE: &str = "index.html";

/// A file inside the root, ready to read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// Path relative to the root, used by access rules
    pub relative: PathBuf,
    /// Canonical absolute path
    pub absolute: PathBuf,
}

impl ResolvedFile {
    /// `.html` files go through the template engine
    pub fn is_html(&self) -> bool {
        self.relative
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("html"))
    }

    pub fn content_type(&self) -> &'static str {
        mime::content_type(&self.relative)
    }
}

#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    /// The root must exist and be a directory
    pub fn new(root: &Path) -> Result<Self, StartupError> {
        let root = root
            .canonicalize()
            .map_err(|_| StartupError::RootDirectory(root.to_path_buf()))?;
        if !root.is_dir() {
            return Err(StartupError::RootDirectory(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a normalized request path to an existing file under the root
    pub fn resolve(&self, path: &str) -> Result<ResolvedFile, DispatchError> {
        let mut candidate = self.root.join(file_name_for(path));
        if candidate.is_dir() {
            candidate.push(INDEX_FILE);
        }

        // Missing files are common (404), no need to log
        let Ok(absolute) = candidate.canonicalize() else {
            return Err(DispatchError::FileNotFound);
        };
        let Ok(relative) = absolute.strip_prefix(&self.root).map(Path::to_path_buf) else {
            logger::log_warning(&format!(
                "Path traversal attempt blocked: /{path} -> {}",
                absolute.display()
            ));
            return Err(DispatchError::FileNotFound);
        };
        if !absolute.is_file() {
            return Err(DispatchError::FileNotFound);
        }

        Ok(ResolvedFile { relative, absolute })
    }

    pub async fn read(&self, file: &ResolvedFile) -> Result<Vec<u8>, DispatchError> {
        fs::read(&file.absolute).await.map_err(|e| {
            logger::log_error(&format!(
                "Failed to read file '{}': {e}",
                file.absolute.display()
            ));
            DispatchError::Io(e)
        })
    }
}

/// File a GET path refers to: index for the root or a trailing slash,
/// `.html` appended when the last segment has no extension
pub fn file_name_for(path: &str) -> String {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        INDEX_FILE.to_string()
    } else if path.ends_with('/') {
        format!("{path}{INDEX_FILE}")
    } else if mime::has_extension(path) {
        path.to_string()
    } else {
        format!("{path}.html")
    }
}
