//! External router boundary.
//!
//! Route matching is not implemented here. [`crate::iface::register_interface`]
//! hands each built route to the application's router through
//! [`Router::register`]; the router later calls the bound [`RouteHandler`]
//! with the captured path placeholders exposed on the request handle.
//!
//! The router must support a trailing `*` wildcard marker and must treat a
//! [`HandleResult::NoMatch`] return as "keep looking": a route placeholder
//! that fails type conversion disqualifies the route instead of failing the
//! request, so an overlapping route can still match.

use crate::server::{ServerRequest, ServerResponse};
use std::sync::Arc;

/// One route registration passed to the external router.
pub struct RouteBinding {
    pub method: http::Method,
    /// Path pattern, possibly ending in the `*` wildcard marker
    pub path: String,
    /// Whether this route upgrades to WebSocket instead of running the
    /// ordinary request/response pipeline
    pub websocket: bool,
    pub handler: Arc<dyn RouteHandler>,
}

/// Outcome the router needs from a handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleResult {
    /// The response was produced (successfully or as an error response)
    Handled,
    /// The route disqualified itself; the router should try the next match
    NoMatch,
}

/// Callback the router invokes for a matched route.
pub trait RouteHandler: Send + Sync {
    fn handle(&self, req: Arc<dyn ServerRequest>, resp: Arc<dyn ServerResponse>) -> HandleResult;
}

/// Registration surface of the external router.
pub trait Router {
    fn register(&mut self, binding: RouteBinding);
}
