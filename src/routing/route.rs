//! Route declaration
//!
//! Routes are declared with a builder and resolved once into the registry:
//!
//! ```
//! use dispatchd::routing::Route;
//! use dispatchd::binding::{Param, ParamType};
//!
//! let route = Route::get("/margs")
//!     .param(Param::new("a", ParamType::Int).nullable())
//!     .param(Param::new("b", ParamType::Int))
//!     .param(Param::new("c", ParamType::Int).default(21))
//!     .handler(|_session, args| {
//!         Ok(format!("A: {:?} B: {} C: {}", args.opt_int("a")?, args.int("b")?, args.int("c")?))
//!     });
//! assert_eq!(route.path(), "margs");
//! ```

use crate::binding::{Args, Param};
use crate::error::HandlerError;
use crate::session::Session;
use hyper::Method;
use std::fmt;
use std::sync::Arc;

/// HTTP verbs a route can bind to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
}

impl Verb {
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(Self::Get),
            Method::POST => Some(Self::Post),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a handler asks the dispatcher to send back
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Outcome {
    /// Redirect to a path relative to the root URL
    Redirect(String),
    /// 200 with this body
    Text(String),
    /// 200 with an empty body
    #[default]
    Empty,
}

impl Outcome {
    pub fn redirect(target: impl Into<String>) -> Self {
        Self::Redirect(target.into())
    }
}

impl From<String> for Outcome {
    fn from(body: String) -> Self {
        Self::Text(body)
    }
}

impl From<&str> for Outcome {
    fn from(body: &str) -> Self {
        Self::Text(body.to_string())
    }
}

impl From<()> for Outcome {
    fn from((): ()) -> Self {
        Self::Empty
    }
}

/// Type-erased handler function
pub type Handler = Arc<dyn Fn(&mut Session, &Args) -> Result<Outcome, HandlerError> + Send + Sync>;

/// A (path, verb) binding to a handler
#[derive(Clone)]
pub struct Route {
    path: String,
    verb: Verb,
    secure: bool,
    params: Vec<Param>,
    handler: Handler,
}

impl Route {
    pub fn new(verb: Verb, path: &str) -> Self {
        Self {
            path: super::normalize_path(path).to_string(),
            verb,
            secure: false,
            params: Vec::new(),
            handler: Arc::new(|_: &mut Session, _: &Args| Ok(Outcome::Empty)),
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Verb::Get, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Verb::Post, path)
    }

    /// Require the access policy to allow the caller
    #[must_use]
    pub const fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    /// Append a parameter; order matches the argument order
    #[must_use]
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    #[must_use]
    pub fn handler<F, O>(mut self, f: F) -> Self
    where
        F: Fn(&mut Session, &Args) -> Result<O, HandlerError> + Send + Sync + 'static,
        O: Into<Outcome>,
    {
        self.handler = Arc::new(move |session: &mut Session, args: &Args| {
            f(session, args).map(Into::into)
        });
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub const fn verb(&self) -> Verb {
        self.verb
    }

    pub const fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn call(&self, session: &mut Session, args: &Args) -> Result<Outcome, HandlerError> {
        (self.handler)(session, args)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("verb", &self.verb)
            .field("secure", &self.secure)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{bind, FormData, ParamType};

    #[test]
    fn test_leading_slash_is_stripped() {
        assert_eq!(Route::get("/a/b").path(), "a/b");
        assert_eq!(Route::post("form").path(), "form");
    }

    #[test]
    fn test_verb_from_method() {
        assert_eq!(Verb::from_method(&Method::GET), Some(Verb::Get));
        assert_eq!(Verb::from_method(&Method::POST), Some(Verb::Post));
        assert_eq!(Verb::from_method(&Method::PUT), None);
    }

    #[test]
    fn test_default_handler_is_empty() {
        let route = Route::get("noop");
        let mut session = Session::new("127.0.0.1");
        assert_eq!(route.call(&mut session, &Args::default()).unwrap(), Outcome::Empty);
    }

    #[test]
    fn test_handler_can_write_session() {
        let route = Route::get("authorize").handler(|session, _| {
            session.set("is_authorized", true);
            Ok("Authorized.")
        });
        let mut session = Session::new("127.0.0.1");
        let outcome = route.call(&mut session, &Args::default()).unwrap();
        assert_eq!(outcome, Outcome::Text("Authorized.".to_string()));
        assert!(session.is_truthy("is_authorized"));
    }

    #[test]
    fn test_handler_receives_bound_args() {
        let route = Route::post("sum")
            .param(Param::new("x", ParamType::Int))
            .param(Param::new("y", ParamType::Int))
            .handler(|_, args| Ok((args.int("x")? + args.int("y")?).to_string()));
        let args = bind(route.params(), &FormData::parse("x=2&y=3")).unwrap();
        let mut session = Session::new("127.0.0.1");
        assert_eq!(
            route.call(&mut session, &args).unwrap(),
            Outcome::Text("5".to_string())
        );
    }
}
