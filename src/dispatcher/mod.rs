//! Request dispatcher.
//!
//! Drives one request end-to-end over the immutable route table:
//!
//! 1. ContextInit: build the per-request [`crate::context::RequestContext`]
//!    (request/response handles, resolved language, translators).
//! 2. Authenticate: run the interface's authentication hook, if any; a
//!    committed response ends the dispatch as handled.
//! 3. BindParameters: drive the parameter binder over every declared
//!    parameter in order; the first failure short-circuits, and a route
//!    placeholder mismatch disqualifies the route silently.
//! 4. ValidateConfirmations: confirmation parameters must equal their
//!    targets.
//! 5. Authorize: run the authorization hook with bound parameters; denial
//!    is a direct 403-class failure.
//! 6. Invoke: call the handler (after a WebSocket upgrade for stream
//!    routes).
//! 7. Serialize: apply output filters, then write the structured or raw
//!    body.
//!
//! Failures between binding and invocation may escape to error recovery: a
//! single synchronous re-dispatch to the route's error-display target with
//! the mapped payload in the `_error` slot.

mod core;

pub use core::{
    BoundRoute, DispatchConfig, DispatchOutcome, Dispatcher, ResponseFilter,
};
