//! Shared error page
//!
//! Every failed request is answered by rendering this template after storing
//! `"{code}: {message}"` under the session's `ErrorMessage` key.

use std::path::Path;

use hyper::StatusCode;

use crate::error::StartupError;
use crate::logger;
use crate::session::Session;
use crate::template;

/// Session key the error text is stored under
pub const ERROR_MESSAGE_KEY: &str = "ErrorMessage";

const BUILTIN_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Error</title>
    <style>
        body { font-family: sans-serif; margin: 4em auto; max-width: 40em; color: #333; }
        h1 { font-size: 1.6em; }
    </style>
</head>
<body>
    <h1>@{{ session.ErrorMessage }}</h1>
    <p><a href="/">Back to the start page</a></p>
</body>
</html>
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPage {
    source: String,
}

impl Default for ErrorPage {
    fn default() -> Self {
        Self {
            source: BUILTIN_PAGE.to_string(),
        }
    }
}

impl ErrorPage {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Read a custom page; failure here stops startup
    pub fn load(path: &Path) -> Result<Self, StartupError> {
        std::fs::read_to_string(path)
            .map(Self::new)
            .map_err(|source| StartupError::ErrorTemplate {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Store the message in the session and render the page.
    /// Falls back to plain text if the page itself fails.
    pub fn render(&self, session: &mut Session, status: StatusCode, message: &str) -> String {
        let text = format!("{}: {}", status.as_u16(), escape_html(message));
        session.set(ERROR_MESSAGE_KEY, text.clone());

        match template::render(session, &self.source) {
            Ok(page) => page,
            Err(e) => {
                logger::log_error(&format!("Error page failed to render: {e}"));
                text
            }
        }
    }
}

/// The stored text ends up inside markup, so markup characters are escaped
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
