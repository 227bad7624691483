//! Authentication and authorization hook contracts.
//!
//! Both hooks are external collaborators. The authenticated identity is a
//! `serde_json::Value` (claims-map style); a parameter declared with
//! [`crate::iface::ParamSource::AuthInfo`] receives it after the
//! authentication hook ran.
//!
//! An authenticator may write to the response itself (challenge, redirect
//! to a login page); the dispatcher treats a committed response as handled
//! and stops. Authorization runs after parameter binding with the bound
//! values available; a denial surfaces as a 403-class failure and is never
//! routed through error recovery.

use crate::binder::BoundParams;
use crate::server::{ServerRequest, ServerResponse};
use serde_json::Value;

/// External authentication hook.
pub trait Authenticator: Send + Sync {
    /// Authenticate the request, returning the identity value.
    ///
    /// May write to the response and return an error to abort dispatch;
    /// whatever was written is sent as-is.
    fn authenticate(
        &self,
        req: &dyn ServerRequest,
        resp: &dyn ServerResponse,
    ) -> anyhow::Result<Value>;
}

/// External authorization hook, consulted after binding.
pub trait Authorizer: Send + Sync {
    /// Whether the authenticated identity may run this request.
    fn authorize(&self, auth: &Value, params: &BoundParams) -> bool;
}
