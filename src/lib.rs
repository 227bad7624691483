//! # webiface
//!
//! **webiface** is a declarative web-interface binder: given an object whose
//! public methods represent application actions, it derives HTTP routes by
//! naming convention, binds each route's parameters from request data
//! (query string, form fields, path placeholders, or injected handles),
//! invokes the handler, and serializes the return value into the response.
//!
//! It is the request-dispatch and parameter-binding core of a server
//! framework, not a web server: the HTTP transport, the URL-matching
//! engine, session storage, templating, and message translation are
//! external collaborators consumed through narrow trait contracts.
//!
//! ## Architecture
//!
//! - [`naming`]: maps a method identifier to an HTTP verb and path segment
//!   by a fixed verb-prefix table and a configurable casing style
//! - [`iface`]: the typed interface declaration model and the route table
//!   builder (nested-interface recursion, trailing-slash complements,
//!   WebSocket upgrade routes, build-time validation)
//! - [`binder`]: per-parameter request binding: source priority rules,
//!   checkbox booleans, gap-terminated sequences, struct decomposition,
//!   the converter cascade, confirmation validation
//! - [`dispatcher`]: the per-request state machine with a one-level
//!   error-recovery re-dispatch to a declared error-display method
//! - [`context`]: the explicit per-request context threaded into handlers
//!   (request/response access, redirects, translation, sessions)
//! - [`session`]: the session store contract and typed
//!   [`SessionVariable`](session::SessionVariable)s
//! - [`server`], [`router`], [`security`], [`translation`]: boundary
//!   contracts for the external collaborators
//!
//! ## Request Flow
//!
//! 1. At startup, [`iface::register_interface`] compiles the interface
//!    description into an immutable route table and hands every entry to
//!    the application's router.
//! 2. The router matches an incoming request and calls the bound route.
//! 3. The dispatcher builds the request context, runs the authentication
//!    hook, binds every declared parameter, validates confirmations, runs
//!    the authorization hook, invokes the handler, and serializes the
//!    result.
//! 4. A binding or handler failure on a route with an error-display target
//!    re-dispatches once, synchronously, to that target with a typed error
//!    payload in the reserved `_error` parameter slot.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use webiface::iface::{
//!     register_interface, HandlerReturn, InterfaceDecl, MethodDecl, ParamDecl, ValueType,
//!     WebInterface, WebInterfaceSettings,
//! };
//! use webiface::naming::CaseStyle;
//!
//! struct UserApi;
//!
//! impl WebInterface for UserApi {
//!     fn describe(&self) -> InterfaceDecl {
//!         InterfaceDecl {
//!             base_path: None,
//!             methods: vec![MethodDecl::handler(
//!                 "getUserProfile",
//!                 vec![ParamDecl::field("name", ValueType::Str)],
//!                 |_ctx, params| {
//!                     let name = params.json("name").cloned().unwrap_or_default();
//!                     Ok(HandlerReturn::Json(serde_json::json!({ "name": name })))
//!                 },
//!             )],
//!         }
//!     }
//! }
//!
//! # fn demo(router: &mut dyn webiface::router::Router) -> anyhow::Result<()> {
//! let settings = WebInterfaceSettings {
//!     url_prefix: "/api".into(),
//!     ignore_trailing_slash: true,
//! };
//! // Registers GET /api/user_profile
//! register_interface(router, Arc::new(UserApi), CaseStyle::LowerUnderscored, &settings)?;
//! # Ok(())
//! # }
//! ```

pub mod binder;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod iface;
pub mod logging;
pub mod naming;
pub mod router;
pub mod security;
pub mod server;
pub mod session;
pub mod translation;

pub use binder::{BoundParams, BoundValue};
pub use context::RequestContext;
pub use dispatcher::{DispatchConfig, DispatchOutcome, Dispatcher};
pub use error::{BindError, DispatchError, FieldError, HttpError, RouteConfigError};
pub use iface::{
    register_interface, register_interface_with, HandlerReturn, InterfaceDecl, MethodDecl,
    ParamDecl, RouteConfig, ValueType, WebInterface, WebInterfaceSettings,
};
pub use naming::CaseStyle;
pub use session::SessionVariable;
