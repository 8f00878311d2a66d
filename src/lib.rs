//! Minimal HTTP dispatch framework.
//!
//! Handlers are registered for (path, verb) pairs with a declared parameter
//! schema. Each client gets a session keyed by its IP address. Requests that
//! match no route are served from a root directory, and `.html` files have
//! their `@{{ expression }}` markers evaluated against the caller's session.
//!
//! ```no_run
//! use std::sync::Arc;
//! use dispatchd::binding::{Param, ParamType};
//! use dispatchd::config::Config;
//! use dispatchd::dispatch::Dispatcher;
//! use dispatchd::routing::Route;
//! use dispatchd::server;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let routes = [
//!     Route::get("authorize").handler(|session, _| {
//!         session.set("is_authorized", true);
//!         Ok("Authorized.")
//!     }),
//!     Route::get("print")
//!         .secure()
//!         .param(Param::new("text", ParamType::Text))
//!         .handler(|_, args| Ok(args.text("text")?.to_string())),
//! ];
//! let dispatcher = Arc::new(Dispatcher::new(&config, routes)?);
//! let listener = server::create_listener(config.get_socket_addr()?, config.server.backlog)?;
//! server::start_server_loop(listener, dispatcher, server::shutdown_signal()).await;
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod files;
pub mod http;
pub mod logger;
pub mod routing;
pub mod server;
pub mod session;
pub mod template;
