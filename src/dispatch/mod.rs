//! Request dispatch module
//!
//! Entry point for request processing: classifies each request as a route
//! call or a file fetch, applies access rules, binds parameters, invokes the
//! handler and renders templates. Every failure is answered through the
//! shared error page.
//!
//! The session store lock is held for the whole cycle, so requests are
//! processed one at a time.

mod access;
mod error_page;

pub use access::{AccessPolicy, SessionFlagPolicy};
pub use error_page::{ErrorPage, ERROR_MESSAGE_KEY};

use std::time::Instant;

use tokio::sync::Mutex;

use crate::binding::{bind, FormData};
use crate::config::Config;
use crate::error::{DispatchError, StartupError};
use crate::files::StaticFiles;
use crate::http::{mime, IncomingRequest, Reply};
use crate::logger::{self, AccessLogEntry};
use crate::routing::{normalize_path, Outcome, Route, RouteRegistry, Verb};
use crate::session::{Session, SessionStore};
use crate::template;

/// State of one dispatch cycle
pub struct RequestContext<'a> {
    pub request: &'a IncomingRequest,
    /// Path with leading slashes removed
    pub path: &'a str,
    pub route: Option<&'a Route>,
    pub session: &'a mut Session,
}

/// Which branch answered a request, for the access log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Served {
    Route,
    File,
    Error,
}

impl Served {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Route => "route",
            Self::File => "file",
            Self::Error => "error",
        }
    }
}

pub struct Dispatcher {
    registry: RouteRegistry,
    sessions: Mutex<SessionStore>,
    files: StaticFiles,
    policy: Box<dyn AccessPolicy>,
    error_page: ErrorPage,
    root_url: String,
    server_name: String,
    max_body_size: u64,
    access_log: Option<String>,
}

impl Dispatcher {
    /// Validate startup preconditions and build the route table
    pub fn new(config: &Config, routes: impl IntoIterator<Item = Route>) -> Result<Self, StartupError> {
        let files = StaticFiles::new(&config.root_dir())?;
        let registry = RouteRegistry::new(routes)?;
        let error_page = match config.templates.error_page {
            Some(ref page) => ErrorPage::load(&files.root().join(page))?,
            None => ErrorPage::default(),
        };

        for route in registry.iter() {
            logger::log_route_registered(route);
        }

        Ok(Self {
            registry,
            sessions: Mutex::new(SessionStore::new()),
            files,
            policy: Box::new(SessionFlagPolicy::from_config(&config.access)),
            error_page,
            root_url: config.server.root_url.clone(),
            server_name: config.http.server_name.clone(),
            max_body_size: config.http.max_body_size,
            access_log: config
                .logging
                .access_log
                .then(|| config.logging.access_log_format.clone()),
        })
    }

    /// Replace the stock access policy
    #[must_use]
    pub fn with_policy(mut self, policy: impl AccessPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub const fn registry(&self) -> &RouteRegistry {
        &self.registry
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub const fn max_body_size(&self) -> u64 {
        self.max_body_size
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Run `f` against the session for `identity`, creating it if needed
    pub async fn with_session<R>(&self, identity: &str, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut store = self.sessions.lock().await;
        f(store.get_or_create(identity))
    }

    /// Run one full dispatch cycle
    pub async fn dispatch(&self, request: &IncomingRequest) -> Reply {
        self.run_cycle(request, None).await
    }

    /// Answer a request that failed before dispatch (e.g. an oversized body)
    pub async fn reject(&self, request: &IncomingRequest, error: DispatchError) -> Reply {
        self.run_cycle(request, Some(error)).await
    }

    async fn run_cycle(&self, request: &IncomingRequest, early: Option<DispatchError>) -> Reply {
        let started = Instant::now();
        let identity = request.peer.to_string();

        let mut store = self.sessions.lock().await;
        if store.get(&identity).is_none() {
            store.get_or_create(&identity);
            logger::log_session_created(&identity, store.len());
        }
        let session = store.get_or_create(&identity);

        let mut ctx = RequestContext {
            request,
            path: normalize_path(&request.path),
            route: None,
            session,
        };

        let result = match early {
            Some(error) => Err(error),
            None => self.process(&mut ctx).await,
        };
        let (reply, served) = match result {
            Ok(done) => done,
            Err(error) => (self.abort(ctx.session, &error), Served::Error),
        };
        drop(store);

        self.log_access(request, &reply, served, started);
        reply
    }

    async fn process<'a>(&'a self, ctx: &mut RequestContext<'a>) -> Result<(Reply, Served), DispatchError> {
        let verb = Verb::from_method(&ctx.request.method)
            .ok_or_else(|| DispatchError::UnsupportedMethod(ctx.request.method.to_string()))?;

        if verb == Verb::Post && mime::has_extension(ctx.path) {
            return Err(DispatchError::MethodNotAllowedForFile);
        }

        if let Some(route) = self.registry.lookup(ctx.path, verb) {
            ctx.route = Some(route);
            return self.serve_route(ctx, route).map(|r| (r, Served::Route));
        }

        match verb {
            Verb::Get => self.serve_file(ctx).await.map(|r| (r, Served::File)),
            Verb::Post => Err(DispatchError::RouteNotFound { verb: verb.as_str() }),
        }
    }

    fn serve_route(&self, ctx: &mut RequestContext<'_>, route: &Route) -> Result<Reply, DispatchError> {
        if !self.policy.route_access(route, ctx.session) {
            return Err(DispatchError::AccessDenied);
        }

        let input = match route.verb() {
            Verb::Get => FormData::parse(ctx.request.query.as_deref().unwrap_or_default()),
            Verb::Post => FormData::parse(&String::from_utf8_lossy(&ctx.request.body)),
        };
        let args = bind(route.params(), &input)?;
        let outcome = route.call(ctx.session, &args)?;

        Ok(match outcome {
            Outcome::Redirect(target) => {
                Reply::redirect(format!("{}{}", self.root_url, normalize_path(&target)))
            }
            Outcome::Text(body) => Reply::ok(mime::TEXT, body),
            Outcome::Empty => Reply::empty(),
        })
    }

    async fn serve_file(&self, ctx: &mut RequestContext<'_>) -> Result<Reply, DispatchError> {
        let file = self.files.resolve(ctx.path)?;
        if !self.policy.file_access(&file.relative, ctx.session) {
            return Err(DispatchError::FileAccessDenied);
        }

        let content = self.files.read(&file).await?;
        if file.is_html() {
            let rendered = template::render(ctx.session, &String::from_utf8_lossy(&content))?;
            Ok(Reply::ok(mime::HTML, rendered))
        } else {
            Ok(Reply::ok(file.content_type(), content))
        }
    }

    /// Store the error in the session and answer with the error page
    fn abort(&self, session: &mut Session, error: &DispatchError) -> Reply {
        let status = error.status();
        if status.is_server_error() {
            logger::log_error(&format!("{status}: {error}"));
        } else {
            logger::log_warning(&format!("{status}: {error}"));
        }

        let page = self.error_page.render(session, status, &error.to_string());
        Reply::new(status, mime::HTML, page)
    }

    fn log_access(&self, request: &IncomingRequest, reply: &Reply, served: Served, started: Instant) {
        let Some(ref format) = self.access_log else {
            return;
        };
        let mut entry = AccessLogEntry::new(
            request.peer.to_string(),
            request.method.to_string(),
            request.path.clone(),
        );
        entry.query.clone_from(&request.query);
        entry.status = reply.status.as_u16();
        entry.body_bytes = reply.body.len();
        entry.target = served.as_str();
        entry.referer.clone_from(&request.referer);
        entry.user_agent.clone_from(&request.user_agent);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, format);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{Param, ParamType};
    use crate::error::HandlerError;
    use hyper::{Method, StatusCode};
    use std::net::{IpAddr, Ipv4Addr};
    use std::path::PathBuf;

    const ALICE: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
    const BOB: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

    fn site(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dispatchd-dispatch-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("downloadables")).unwrap();
        std::fs::write(dir.join("index.html"), "Hello @{{ session.name ?? 'stranger' }}").unwrap();
        std::fs::write(dir.join("counter.html"), "@{{ session.n = (session.n ?? 0) + 1 }}").unwrap();
        std::fs::write(dir.join("report.txt"), "secret numbers").unwrap();
        std::fs::write(dir.join("downloadables").join("a.bin"), [0_u8, 1, 2]).unwrap();
        dir
    }

    fn config_for(root: &std::path::Path) -> Config {
        Config::from_toml_str(&format!(
            "[server]\nroot_dir = {:?}\nroot_url = \"http://localhost:8080\"\n[logging]\naccess_log = false\n",
            root.to_string_lossy()
        ))
        .unwrap()
    }

    fn routes() -> Vec<Route> {
        vec![
            Route::get("authorize").handler(|session, _| {
                session.set("is_authorized", true);
                Ok("Authorized.")
            }),
            Route::get("secret").secure().handler(|_, _| Ok("The secret.")),
            Route::get("margs")
                .param(Param::new("a", ParamType::Int).nullable())
                .param(Param::new("b", ParamType::Int))
                .param(Param::new("c", ParamType::Int).default(21))
                .handler(|_, args| {
                    Ok(format!(
                        "A: {} B: {} C: {}",
                        args.value("a"),
                        args.int("b")?,
                        args.int("c")?
                    ))
                }),
            Route::post("form")
                .param(Param::new("text", ParamType::Text))
                .param(Param::new("integer", ParamType::Int))
                .handler(|session, args| {
                    session.set("text", args.text("text")?);
                    Ok(format!("{}|{}", args.text("text")?, args.int("integer")?))
                }),
            Route::post("report.txt").handler(|_, _| Ok("Unreachable.")),
            Route::get("redirector").handler(|_, _| Ok(Outcome::redirect("/index.html"))),
            Route::get("fail").handler(|_, _| -> Result<(), HandlerError> {
                Err(HandlerError::new("boom"))
            }),
            Route::get("name").param(Param::new("v", ParamType::Text)).handler(|session, args| {
                session.set("name", args.text("v")?);
                Ok(())
            }),
        ]
    }

    fn dispatcher(name: &str) -> (Dispatcher, PathBuf) {
        let root = site(name);
        let d = Dispatcher::new(&config_for(&root), routes()).unwrap();
        (d, root)
    }

    fn get(target: &str, peer: IpAddr) -> IncomingRequest {
        IncomingRequest::new(Method::GET, target, peer)
    }

    #[tokio::test]
    async fn test_route_with_params() {
        let (d, root) = dispatcher("params");

        let reply = d.dispatch(&get("/margs?b=2", ALICE)).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.text(), "A:  B: 2 C: 21");

        let reply = d.dispatch(&get("/margs?a=1&b=2&c=3", ALICE)).await;
        assert_eq!(reply.text(), "A: 1 B: 2 C: 3");
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_missing_parameter_is_400() {
        let (d, root) = dispatcher("missing");
        let reply = d.dispatch(&get("/margs?a=1", ALICE)).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert!(reply.text().contains("400: Missing required parameter `b`."));

        let reply = d.dispatch(&get("/margs?b=two", ALICE)).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert!(reply.text().contains("400: Parameter `b` expects"));
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_bad_parameter_value_is_not_reflected() {
        let (d, root) = dispatcher("reflect");
        let reply = d
            .dispatch(&get("/margs?b=%3Cscript%3Ealert(1)%3C%2Fscript%3E", ALICE))
            .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert!(!reply.text().contains("<script>"));
        assert!(!reply.text().contains("alert(1)"));
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_not_found() {
        let (d, root) = dispatcher("notfound");
        assert_eq!(d.dispatch(&get("/nowhere", ALICE)).await.status, StatusCode::NOT_FOUND);

        let post = IncomingRequest::new(Method::POST, "/nowhere", ALICE);
        assert_eq!(d.dispatch(&post).await.status, StatusCode::NOT_FOUND);
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_post_to_file_is_405() {
        let (d, root) = dispatcher("post-file");
        let post = IncomingRequest::new(Method::POST, "/report.txt", ALICE);
        let reply = d.dispatch(&post).await;
        assert_eq!(reply.status, StatusCode::METHOD_NOT_ALLOWED);
        assert!(reply.text().contains("405: POST requests cannot target files."));

        let put = IncomingRequest::new(Method::PUT, "/form", ALICE);
        assert_eq!(d.dispatch(&put).await.status, StatusCode::METHOD_NOT_ALLOWED);
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_post_to_dotted_directory_is_404() {
        let (d, root) = dispatcher("post-dotted-dir");
        let post = IncomingRequest::new(Method::POST, "/api/v1.0/", ALICE);
        let reply = d.dispatch(&post).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert!(reply.text().contains("404: POST route not found."));
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_secure_route_after_authorization() {
        let (d, root) = dispatcher("secure");
        assert_eq!(d.dispatch(&get("/secret", ALICE)).await.status, StatusCode::UNAUTHORIZED);

        let reply = d.dispatch(&get("/authorize", ALICE)).await;
        assert_eq!(reply.text(), "Authorized.");

        let reply = d.dispatch(&get("/secret", ALICE)).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.text(), "The secret.");

        // Another client is still locked out
        assert_eq!(d.dispatch(&get("/secret", BOB)).await.status, StatusCode::UNAUTHORIZED);
        assert_eq!(d.session_count().await, 2);
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_file_access_rules() {
        let (d, root) = dispatcher("file-access");
        let reply = d.dispatch(&get("/report.txt", ALICE)).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert!(reply.text().contains("401: Unauthorized file access."));

        d.with_session("10.0.0.1", |s| s.set("is_authorized", true)).await;
        let reply = d.dispatch(&get("/report.txt", ALICE)).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.content_type, mime::TEXT);
        assert_eq!(reply.text(), "secret numbers");
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_custom_policy_opens_directory() {
        let root = site("policy");
        let d = Dispatcher::new(&config_for(&root), routes())
            .unwrap()
            .with_policy(SessionFlagPolicy::new("is_authorized").open_dir("downloadables"));
        let reply = d.dispatch(&get("/downloadables/a.bin", BOB)).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.content_type, "application/octet-stream");
        assert_eq!(&reply.body[..], &[0_u8, 1, 2]);
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_html_is_templated_per_session() {
        let (d, root) = dispatcher("templated");
        assert_eq!(d.dispatch(&get("/", ALICE)).await.text(), "Hello stranger");

        d.dispatch(&get("/name?v=Alice", ALICE)).await;
        assert_eq!(d.dispatch(&get("/index", ALICE)).await.text(), "Hello Alice");
        assert_eq!(d.dispatch(&get("/index.html", BOB)).await.text(), "Hello stranger");

        assert_eq!(d.dispatch(&get("/counter", BOB)).await.text(), "1");
        assert_eq!(d.dispatch(&get("/counter", BOB)).await.text(), "2");
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_form_body_binding() {
        let (d, root) = dispatcher("form");
        let post = IncomingRequest::new(Method::POST, "/form", ALICE)
            .with_body("text=hi%20there&integer=5");
        let reply = d.dispatch(&post).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.text(), "hi there|5");
        let stored = d.with_session("10.0.0.1", |s| s.get("text").to_string()).await;
        assert_eq!(stored, "hi there");
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_redirect_uses_root_url() {
        let (d, root) = dispatcher("redirect");
        let reply = d.dispatch(&get("/redirector", ALICE)).await;
        assert_eq!(reply.status, StatusCode::FOUND);
        assert_eq!(
            reply.location.as_deref(),
            Some("http://localhost:8080/index.html")
        );
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_handler_error_is_500_and_serving_continues() {
        let (d, root) = dispatcher("handler-error");
        let reply = d.dispatch(&get("/fail", ALICE)).await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(reply.text().contains("500: Handler failed: boom"));

        let reply = d.dispatch(&get("/margs?b=1", ALICE)).await;
        assert_eq!(reply.status, StatusCode::OK);
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_reject_renders_error_page() {
        let (d, root) = dispatcher("reject");
        let post = IncomingRequest::new(Method::POST, "/form", ALICE);
        let reply = d
            .reject(&post, DispatchError::PayloadTooLarge { limit: 16 })
            .await;
        assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
        let message = d
            .with_session("10.0.0.1", |s| s.get(ERROR_MESSAGE_KEY).to_string())
            .await;
        assert_eq!(message, "413: Request body exceeds 16 bytes.");
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn test_startup_errors() {
        let root = site("startup");
        let mut config = config_for(&root);

        let dup = Dispatcher::new(&config, [Route::get("a"), Route::get("/a")]);
        assert!(matches!(dup, Err(StartupError::DuplicateRoute { .. })));

        config.templates.error_page = Some("missing-error.html".to_string());
        assert!(matches!(
            Dispatcher::new(&config, Vec::new()),
            Err(StartupError::ErrorTemplate { .. })
        ));

        config.server.root_dir = root.join("nope").to_string_lossy().into_owned();
        assert!(matches!(
            Dispatcher::new(&config, Vec::new()),
            Err(StartupError::RootDirectory(_))
        ));
        let _ = std::fs::remove_dir_all(root);
    }
}
