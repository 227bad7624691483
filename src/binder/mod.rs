//! Parameter binder.
//!
//! Produces a concrete value for one [`crate::iface::ParameterSpec`] from
//! the current request, or fails with a structured error. Source rules, in
//! priority order:
//!
//! 1. authenticated-identity parameters receive the auth hook's value;
//! 2. an attribute-computed parameter runs its function of
//!    (request, response); if that function writes to the response, the
//!    dispatcher stops before invoking the handler;
//! 3. the reserved `_error` slot receives the error payload of an
//!    error-recovery re-dispatch (or its default, or null);
//! 4. request / response / body-stream / WebSocket parameters receive the
//!    live handles;
//! 5. marker-prefixed names read the router's path placeholders; a
//!    conversion failure disqualifies the route silently;
//! 6. booleans use checkbox semantics (present at all ⇒ true);
//! 7. everything else decomposes structurally against query/form fields:
//!    sequences as `name_0, name_1, …` until the first gap, structs one
//!    field per member, leaves through the converter cascade.
//!
//! Confirmation parameters are validated after all parameters bound.

mod core;

pub use core::{
    bind_param, check_confirmations, gather_fields, BindInput, BoundParams, BoundValue,
    MAX_INLINE_PARAMS,
};
