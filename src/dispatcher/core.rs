use crate::binder::{self, BindInput, BoundParams, BoundValue};
use crate::context::RequestContext;
use crate::error::{handler_error_status, BindError, DispatchError, FieldError};
use crate::iface::{
    DispatchFailure, EntryAction, HandlerReturn, ParamSource, RouteEntry, RouteTable,
};
use crate::ids::RequestId;
use crate::router::{HandleResult, RouteHandler};
use crate::security::{Authenticator, Authorizer};
use crate::server::{ServerRequest, ServerResponse};
use crate::translation::{IdentityTranslations, TranslationProvider};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Hook applied to a non-void handler return before serialization.
pub trait ResponseFilter: Send + Sync {
    fn apply(&self, ctx: &RequestContext, ret: HandlerReturn) -> HandlerReturn;
}

/// External hooks consulted during dispatch.
pub struct DispatchConfig {
    /// Authentication requirement of the interface; absent means the
    /// Authenticate state is skipped entirely
    pub authenticator: Option<Arc<dyn Authenticator>>,
    /// Authorization hook, run after binding with bound parameters
    pub authorizer: Option<Arc<dyn Authorizer>>,
    pub translations: Arc<dyn TranslationProvider>,
    /// Output-modifier hooks applied to non-void returns, in order
    pub filters: Vec<Arc<dyn ResponseFilter>>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            authenticator: None,
            authorizer: None,
            translations: Arc::new(IdentityTranslations),
            filters: Vec::new(),
        }
    }
}

/// How a dispatch ended, as far as the router is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A response was produced (or the handler wrote one itself)
    Completed,
    /// A route placeholder disqualified this route; try the next match
    NoMatch,
}

/// Per-request pipeline over an immutable route table.
///
/// States run in order: context init, authenticate, bind parameters,
/// validate confirmations, authorize, invoke, serialize. Binding,
/// confirmation, and invocation failures may escape to error recovery: a
/// synchronous, same-task re-dispatch to the entry's error-display target
/// carrying the mapped payload in the reserved `_error` slot. Recovery
/// depth is exactly one; a failure inside the display method propagates
/// unrecovered.
pub struct Dispatcher {
    table: Arc<RouteTable>,
    config: DispatchConfig,
}

impl Dispatcher {
    #[must_use]
    pub fn new(table: Arc<RouteTable>, config: DispatchConfig) -> Self {
        Self { table, config }
    }

    #[must_use]
    pub fn table(&self) -> &Arc<RouteTable> {
        &self.table
    }

    /// Dispatch one request against the entry at `index`.
    pub fn dispatch(
        &self,
        index: usize,
        req: Arc<dyn ServerRequest>,
        resp: Arc<dyn ServerResponse>,
    ) -> Result<DispatchOutcome, DispatchError> {
        self.run(index, req, resp, None, RequestId::new(), false)
    }

    fn run(
        &self,
        index: usize,
        req: Arc<dyn ServerRequest>,
        resp: Arc<dyn ServerResponse>,
        error_payload: Option<Value>,
        request_id: RequestId,
        recovering: bool,
    ) -> Result<DispatchOutcome, DispatchError> {
        let Some(entry) = self.table.entries.get(index) else {
            return Err(DispatchError::Handler {
                status: 500,
                source: anyhow::anyhow!("no route entry at index {index}"),
            });
        };

        // ContextInit
        let ctx = RequestContext::new(
            request_id,
            Arc::clone(&req),
            Arc::clone(&resp),
            Arc::clone(&self.config.translations),
        );
        info!(
            request_id = %request_id,
            method = %entry.method,
            path = %entry.path,
            handler = %entry.source_method,
            recovering,
            "dispatch start"
        );

        // Trailing-slash complements canonicalize instead of binding.
        if let EntryAction::RedirectTo(canonical) = &entry.action {
            let url = req.url();
            let target = match url.split_once('?') {
                Some((_, query)) if !query.is_empty() => format!("{canonical}?{query}"),
                _ => canonical.clone(),
            };
            debug!(request_id = %request_id, target = %target, "canonicalizing trailing slash");
            resp.redirect(&target, 301);
            return Ok(DispatchOutcome::Completed);
        }

        // Authenticate
        let mut auth: Option<Value> = None;
        if let Some(authenticator) = &self.config.authenticator {
            match authenticator.authenticate(req.as_ref(), resp.as_ref()) {
                Ok(identity) => {
                    if resp.committed() {
                        debug!(request_id = %request_id, "authenticator wrote the response; dispatch handled");
                        return Ok(DispatchOutcome::Completed);
                    }
                    auth = Some(identity);
                }
                Err(err) => {
                    // The hook decides the response; fill in a challenge
                    // only if it wrote nothing.
                    warn!(request_id = %request_id, error = %format!("{err:#}"), "authentication failed");
                    if !resp.committed() {
                        resp.set_status(401);
                        resp.write_json(&json!({ "error": "authentication required" }));
                    }
                    return Ok(DispatchOutcome::Completed);
                }
            }
        }

        // BindParameters
        let fields = binder::gather_fields(req.as_ref());
        let path_params = req.path_params();
        let input = BindInput {
            fields: &fields,
            path_params: &path_params,
            auth: auth.as_ref(),
            error_payload: error_payload.as_ref(),
            request: &req,
            response: &resp,
        };
        let mut params = BoundParams::new();
        for spec in &entry.params {
            match binder::bind_param(spec, entry.nesting_style, &input) {
                Ok(value) => {
                    params.push(spec.name.clone(), value);
                    // A computed parameter that wrote to the response is a
                    // terminal point.
                    if spec.compute.is_some() && resp.committed() {
                        debug!(request_id = %request_id, param = %spec.name, "computed parameter wrote the response");
                        return Ok(DispatchOutcome::Completed);
                    }
                }
                Err(BindError::PlaceholderMismatch { name, reason }) => {
                    debug!(request_id = %request_id, placeholder = %name, reason = %reason, "route disqualified");
                    return Ok(DispatchOutcome::NoMatch);
                }
                Err(BindError::Field(field_err)) => {
                    return self.recover_field(entry, field_err, req, resp, request_id, recovering);
                }
                Err(BindError::ConfirmationMismatch { field }) => {
                    let field_err = FieldError::new(field, "confirmation does not match");
                    return self.recover_field(entry, field_err, req, resp, request_id, recovering);
                }
            }
        }

        // ValidateConfirmations
        if let Err(BindError::ConfirmationMismatch { field }) =
            binder::check_confirmations(&entry.params, &params)
        {
            let field_err = FieldError::new(field, "confirmation does not match");
            return self.recover_field(entry, field_err, req, resp, request_id, recovering);
        }

        // Authorize
        if let Some(authorizer) = &self.config.authorizer {
            let identity = auth.clone().unwrap_or(Value::Null);
            if !authorizer.authorize(&identity, &params) {
                warn!(request_id = %request_id, handler = %entry.source_method, "authorization denied");
                return Err(DispatchError::Denied);
            }
        }

        // Invoke
        let EntryAction::Invoke(handler) = &entry.action else {
            // Redirect entries returned above
            return Ok(DispatchOutcome::Completed);
        };
        let mut params = params;
        if entry.websocket {
            // Transport upgrade first; the stream parameter is assigned
            // only inside the upgraded-connection scope.
            match req.upgrade_websocket() {
                Ok(channel) => {
                    if let Some(spec) = entry
                        .params
                        .iter()
                        .find(|s| s.source == ParamSource::WebSocket)
                    {
                        params.replace(&spec.name, BoundValue::WebSocket(channel));
                    }
                }
                Err(err) => {
                    return Err(DispatchError::Handler {
                        status: 500,
                        source: err.context("WebSocket upgrade failed"),
                    });
                }
            }
        }
        let returned = match handler(&ctx, params) {
            Ok(ret) => ret,
            Err(err) => {
                return self.recover_handler(entry, err, req, resp, request_id, recovering);
            }
        };
        if entry.websocket {
            if !matches!(returned, HandlerReturn::Unit) {
                warn!(request_id = %request_id, handler = %entry.source_method, "WebSocket handler returned a value; ignored");
            }
            return Ok(DispatchOutcome::Completed);
        }

        // Serialize
        let mut returned = returned;
        if !matches!(returned, HandlerReturn::Unit) {
            for filter in &self.config.filters {
                returned = filter.apply(&ctx, returned);
            }
        }
        match returned {
            HandlerReturn::Unit => {}
            HandlerReturn::Json(value) => {
                resp.write_json(&value);
            }
            HandlerReturn::Raw(bytes) => {
                let content_type = entry
                    .content_type
                    .as_deref()
                    .unwrap_or("application/octet-stream");
                resp.write_raw(content_type, &bytes);
            }
        }
        info!(request_id = %request_id, handler = %entry.source_method, "dispatch complete");
        Ok(DispatchOutcome::Completed)
    }

    /// Field-scoped failure: reroute to the error display if declared,
    /// else surface as a 400-class error naming the field.
    fn recover_field(
        &self,
        entry: &RouteEntry,
        field_err: FieldError,
        req: Arc<dyn ServerRequest>,
        resp: Arc<dyn ServerResponse>,
        request_id: RequestId,
        recovering: bool,
    ) -> Result<DispatchOutcome, DispatchError> {
        let failure = DispatchFailure {
            message: field_err.message.clone(),
            debug: field_err
                .debug
                .clone()
                .unwrap_or_else(|| field_err.message.clone()),
            field: Some(field_err.field.clone()),
        };
        self.recover(
            entry,
            failure,
            DispatchError::Field(field_err),
            req,
            resp,
            request_id,
            recovering,
        )
    }

    /// Handler-body failure: payload carries no field name; the terminal
    /// status comes from an `HttpError` in the chain when present.
    fn recover_handler(
        &self,
        entry: &RouteEntry,
        err: anyhow::Error,
        req: Arc<dyn ServerRequest>,
        resp: Arc<dyn ServerResponse>,
        request_id: RequestId,
        recovering: bool,
    ) -> Result<DispatchOutcome, DispatchError> {
        let failure = DispatchFailure {
            message: err.to_string(),
            debug: format!("{err:#}"),
            field: None,
        };
        let status = handler_error_status(&err);
        self.recover(
            entry,
            failure,
            DispatchError::Handler {
                status,
                source: err,
            },
            req,
            resp,
            request_id,
            recovering,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn recover(
        &self,
        entry: &RouteEntry,
        failure: DispatchFailure,
        terminal: DispatchError,
        req: Arc<dyn ServerRequest>,
        resp: Arc<dyn ServerResponse>,
        request_id: RequestId,
        recovering: bool,
    ) -> Result<DispatchOutcome, DispatchError> {
        // Recovery runs exactly once per original failure; a failure while
        // running the display method itself propagates unrecovered.
        if recovering {
            return Err(terminal);
        }
        let Some(target) = &entry.error_display else {
            return Err(terminal);
        };
        let payload = (target.map)(&failure);
        info!(
            request_id = %request_id,
            handler = %entry.source_method,
            field = failure.field.as_deref().unwrap_or(""),
            message = %failure.message,
            "rerouting failure to error display"
        );
        self.run(target.entry, req, resp, Some(payload), request_id, true)
    }
}

/// The callback registered with the external router for one route entry.
///
/// Translates terminal dispatch failures into HTTP error responses and
/// `NoMatch` into the router's keep-looking signal.
pub struct BoundRoute {
    pub dispatcher: Arc<Dispatcher>,
    pub index: usize,
}

impl RouteHandler for BoundRoute {
    fn handle(&self, req: Arc<dyn ServerRequest>, resp: Arc<dyn ServerResponse>) -> HandleResult {
        match self.dispatcher.dispatch(self.index, req, Arc::clone(&resp)) {
            Ok(DispatchOutcome::Completed) => HandleResult::Handled,
            Ok(DispatchOutcome::NoMatch) => HandleResult::NoMatch,
            Err(err) => {
                let status = err.status();
                if status >= 500 {
                    error!(status, error = %err, "dispatch failed");
                } else {
                    debug!(status, error = %err, "dispatch rejected");
                }
                if !resp.committed() {
                    resp.set_status(status);
                    let body = match &err {
                        DispatchError::Field(field_err) => json!({
                            "error": field_err.message,
                            "field": field_err.field,
                        }),
                        DispatchError::Denied => json!({ "error": "access denied" }),
                        DispatchError::Handler { source, .. } => json!({
                            "error": source.to_string(),
                        }),
                    };
                    resp.write_json(&body);
                }
                HandleResult::Handled
            }
        }
    }
}
