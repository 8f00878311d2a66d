//! Routing module
//!
//! Provides the route declaration builder and the registry that resolves an
//! incoming (path, verb) pair to its route.

mod registry;
mod route;

pub use registry::RouteRegistry;
pub use route::{Handler, Outcome, Route, Verb};

/// Strip leading slashes; registry keys and lookups both go through this
pub fn normalize_path(path: &str) -> &str {
    path.trim_start_matches('/')
}
