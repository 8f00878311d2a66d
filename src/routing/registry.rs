//! Route registry
//!
//! Built once at startup. Lookups are exact matches on the normalized path and
//! the verb.

use std::collections::HashMap;

use super::route::{Route, Verb};
use crate::error::StartupError;

#[derive(Debug, Default)]
pub struct RouteRegistry {
    routes: Vec<Route>,
    index: HashMap<(String, Verb), usize>,
}

impl RouteRegistry {
    /// Build the table, failing on the first repeated (path, verb) pair
    pub fn new(routes: impl IntoIterator<Item = Route>) -> Result<Self, StartupError> {
        let mut registry = Self::default();
        for route in routes {
            let key = (route.path().to_string(), route.verb());
            if registry.index.contains_key(&key) {
                return Err(StartupError::DuplicateRoute {
                    path: key.0,
                    verb: key.1.as_str(),
                });
            }
            registry.index.insert(key, registry.routes.len());
            registry.routes.push(route);
        }
        Ok(registry)
    }

    pub fn lookup(&self, path: &str, verb: Verb) -> Option<&Route> {
        let key = (super::normalize_path(path).to_string(), verb);
        self.index.get(&key).map(|&i| &self.routes[i])
    }

    /// Routes in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_route_is_rejected() {
        let result = RouteRegistry::new([Route::get("print"), Route::get("/print")]);
        match result {
            Err(StartupError::DuplicateRoute { path, verb }) => {
                assert_eq!(path, "print");
                assert_eq!(verb, "GET");
            }
            other => panic!("expected duplicate route error, got {other:?}"),
        }
    }

    #[test]
    fn test_same_path_different_verbs() {
        let registry = RouteRegistry::new([Route::get("form"), Route::post("form")]).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup("form", Verb::Get).unwrap().verb(), Verb::Get);
        assert_eq!(registry.lookup("form", Verb::Post).unwrap().verb(), Verb::Post);
    }

    #[test]
    fn test_lookup_normalizes_leading_slash() {
        let registry = RouteRegistry::new([Route::get("margs")]).unwrap();
        assert!(registry.lookup("/margs", Verb::Get).is_some());
        assert!(registry.lookup("margs", Verb::Get).is_some());
        assert!(registry.lookup("margs", Verb::Post).is_none());
        assert!(registry.lookup("margs/", Verb::Get).is_none());
    }

    #[test]
    fn test_iteration_keeps_registration_order() {
        let registry =
            RouteRegistry::new([Route::get("b"), Route::get("a"), Route::post("c")]).unwrap();
        let paths: Vec<_> = registry.iter().map(Route::path).collect();
        assert_eq!(paths, vec!["b", "a", "c"]);
    }
}
