use crate::binder::BoundParams;
use crate::context::RequestContext;
use crate::server::{ServerRequest, ServerResponse};
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Reserved parameter name receiving the typed error payload during an
/// error-recovery re-dispatch.
pub const ERROR_SLOT: &str = "_error";

/// Leading marker on a parameter name that binds it from the router's
/// captured path placeholders (marker stripped for the lookup).
pub const ROUTE_PARAM_MARKER: char = '_';

/// Settings for one interface registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebInterfaceSettings {
    /// Prefix prepended to every derived path (e.g. `/api`)
    pub url_prefix: String,
    /// Register complementary with/without-trailing-slash paths; the GET
    /// complement redirects to the canonical path
    pub ignore_trailing_slash: bool,
}

/// How struct members decompose into request field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NestingStyle {
    /// `address_city` (default)
    #[default]
    Underscore,
    /// `address.city`
    Dotted,
}

impl NestingStyle {
    #[must_use]
    pub fn separator(self) -> char {
        match self {
            NestingStyle::Underscore => '_',
            NestingStyle::Dotted => '.',
        }
    }
}

/// Validating parser: full conversion with a user-facing error message.
pub type ValidatingParseFn = fn(&str) -> Result<Value, String>;

/// Plain parser: conversion that either succeeds or does not apply.
pub type PlainParseFn = fn(&str) -> Option<Value>;

/// Capability-based string conversion for a custom leaf type.
///
/// Resolution order is fixed: the validating parser, then the plain parser,
/// then the generic string conversion (the raw text as a JSON string).
#[derive(Debug, Clone, Copy)]
pub struct Converter {
    /// Type name used in conversion error messages
    pub type_name: &'static str,
    pub validating: Option<ValidatingParseFn>,
    pub plain: Option<PlainParseFn>,
}

/// Declared shape of a parameter or struct member.
#[derive(Debug, Clone)]
pub enum ValueType {
    /// Checkbox semantics: true iff the field is present at all
    Bool,
    Int,
    Float,
    Str,
    /// `name_0, name_1, …` until the first gap
    Seq(Box<ValueType>),
    /// Decomposed per member as `<name><sep><member>`
    Struct(Vec<FieldDecl>),
    /// Leaf converted through the capability cascade
    Custom(Converter),
}

/// One member of a [`ValueType::Struct`].
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub ty: ValueType,
    pub optional: bool,
    pub default: Option<Value>,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
            default: None,
        }
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Where a parameter's value comes from.
///
/// `Auto` is what declarations normally use; the route table builder
/// resolves it to `ErrorSlot` (reserved name), `RouteParam` (marker prefix),
/// or `QueryOrForm` before any request is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    Auto,
    RouteParam,
    QueryOrForm,
    Request,
    Response,
    Body,
    AuthInfo,
    ErrorSlot,
    WebSocket,
}

/// Attribute-computed parameter: a function of the live request/response.
///
/// May write to the response, in which case the dispatcher stops before
/// invoking the handler.
pub type ComputeFn =
    Arc<dyn Fn(&dyn ServerRequest, &dyn ServerResponse) -> anyhow::Result<Value> + Send + Sync>;

/// One declared handler parameter.
#[derive(Clone)]
pub struct ParamDecl {
    pub name: String,
    pub source: ParamSource,
    pub ty: ValueType,
    pub optional: bool,
    pub default: Option<Value>,
    /// Name of another parameter of the same method this one must equal
    pub confirms: Option<String>,
    pub compute: Option<ComputeFn>,
}

impl ParamDecl {
    /// An ordinary request-sourced parameter (query/form, placeholder, or
    /// error slot, depending on the name).
    pub fn field(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            source: ParamSource::Auto,
            ty,
            optional: false,
            default: None,
            confirms: None,
            compute: None,
        }
    }

    /// The live request handle.
    pub fn request(name: impl Into<String>) -> Self {
        Self::injected(name, ParamSource::Request)
    }

    /// The live response handle.
    pub fn response(name: impl Into<String>) -> Self {
        Self::injected(name, ParamSource::Response)
    }

    /// The raw body input stream.
    pub fn body(name: impl Into<String>) -> Self {
        Self::injected(name, ParamSource::Body)
    }

    /// The authenticated identity value.
    pub fn auth(name: impl Into<String>) -> Self {
        Self::injected(name, ParamSource::AuthInfo)
    }

    /// The bidirectional stream; marks the route as upgrade-capable.
    pub fn websocket(name: impl Into<String>) -> Self {
        Self::injected(name, ParamSource::WebSocket)
    }

    /// The reserved error slot.
    #[must_use]
    pub fn error_slot() -> Self {
        Self::injected(ERROR_SLOT, ParamSource::ErrorSlot)
    }

    fn injected(name: impl Into<String>, source: ParamSource) -> Self {
        Self {
            name: name.into(),
            source,
            ty: ValueType::Str,
            optional: false,
            default: None,
            confirms: None,
            compute: None,
        }
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Declare this parameter a confirmation of `target`.
    #[must_use]
    pub fn confirms(mut self, target: impl Into<String>) -> Self {
        self.confirms = Some(target.into());
        self
    }

    /// Compute the value from the live request/response instead of binding.
    #[must_use]
    pub fn computed<F>(mut self, f: F) -> Self
    where
        F: Fn(&dyn ServerRequest, &dyn ServerResponse) -> anyhow::Result<Value>
            + Send
            + Sync
            + 'static,
    {
        self.compute = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for ParamDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParamDecl")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("ty", &self.ty)
            .field("optional", &self.optional)
            .field("default", &self.default)
            .field("confirms", &self.confirms)
            .field("computed", &self.compute.is_some())
            .finish()
    }
}

/// What a handler produced.
#[derive(Debug)]
pub enum HandlerReturn {
    /// No body; the handler wrote the response itself (e.g. a redirect)
    Unit,
    /// Structured value, serialized as a JSON body
    Json(Value),
    /// Binary body, honoring the route's content-type override
    Raw(Vec<u8>),
}

/// Boxed handler callable: explicit request context plus bound parameters.
pub type HandlerFn =
    Arc<dyn Fn(&RequestContext, BoundParams) -> anyhow::Result<HandlerReturn> + Send + Sync>;

/// Producer of a nested sub-interface instance.
pub type NestedFn = Arc<dyn Fn() -> Arc<dyn WebInterface> + Send + Sync>;

/// What a declared method is.
#[derive(Clone)]
pub enum MethodKind {
    /// A leaf route
    Handler(HandlerFn),
    /// Returns a sub-interface whose methods register under an extended
    /// prefix; must declare zero parameters
    Nested(NestedFn),
}

/// The failure handed to an error-display payload mapping.
#[derive(Debug, Clone)]
pub struct DispatchFailure {
    /// User-facing message of the original failure
    pub message: String,
    /// Verbose debug-only detail
    pub debug: String,
    /// Failing field name; `None` once parameter validation fully
    /// succeeded and only the handler invocation failed
    pub field: Option<String>,
}

/// Pluggable mapping from a dispatch failure to the typed error payload.
pub type ErrorMapFn = Arc<dyn Fn(&DispatchFailure) -> Value + Send + Sync>;

/// Error-display annotation: the target method plus the payload mapping.
#[derive(Clone)]
pub struct ErrorDisplay {
    /// Method name (same interface) re-dispatched to on failure
    pub target: String,
    pub map: ErrorMapFn,
}

impl ErrorDisplay {
    /// Payload is the boolean flag `true`.
    pub fn flag(target: impl Into<String>) -> Self {
        Self::with_map(target, |_| Value::Bool(true))
    }

    /// Payload is the user-facing message string.
    pub fn message(target: impl Into<String>) -> Self {
        Self::with_map(target, |f| Value::String(f.message.clone()))
    }

    /// Payload is the raw debug text of the underlying error.
    pub fn debug_text(target: impl Into<String>) -> Self {
        Self::with_map(target, |f| Value::String(f.debug.clone()))
    }

    /// Payload is `{"message": …, "field": …}` with `field` null for
    /// invocation-time failures.
    pub fn composite(target: impl Into<String>) -> Self {
        Self::with_map(target, |f| {
            json!({
                "message": f.message,
                "field": f.field,
            })
        })
    }

    /// User-defined payload mapping.
    pub fn with_map<F>(target: impl Into<String>, map: F) -> Self
    where
        F: Fn(&DispatchFailure) -> Value + Send + Sync + 'static,
    {
        Self {
            target: target.into(),
            map: Arc::new(map),
        }
    }
}

impl std::fmt::Debug for ErrorDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorDisplay")
            .field("target", &self.target)
            .finish()
    }
}

/// Typed per-method route configuration (the annotation equivalents).
#[derive(Clone, Default)]
pub struct RouteConfig {
    /// Explicit path override, bypassing the naming resolver
    pub path: Option<String>,
    /// Explicit verb override
    pub method: Option<Method>,
    /// Content type used for raw-body returns
    pub content_type: Option<String>,
    /// Exclude this method from routing entirely
    pub no_route: bool,
    pub error_display: Option<ErrorDisplay>,
    /// Field-name style for struct decomposition
    pub nesting_style: NestingStyle,
}

impl RouteConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub fn no_route(mut self) -> Self {
        self.no_route = true;
        self
    }

    #[must_use]
    pub fn error_display(mut self, display: ErrorDisplay) -> Self {
        self.error_display = Some(display);
        self
    }

    #[must_use]
    pub fn nesting_style(mut self, style: NestingStyle) -> Self {
        self.nesting_style = style;
        self
    }
}

/// One declared public method of an interface.
#[derive(Clone)]
pub struct MethodDecl {
    pub name: String,
    pub config: RouteConfig,
    pub params: Vec<ParamDecl>,
    pub kind: MethodKind,
}

impl MethodDecl {
    /// Declare a leaf handler method.
    pub fn handler<F>(name: impl Into<String>, params: Vec<ParamDecl>, f: F) -> Self
    where
        F: Fn(&RequestContext, BoundParams) -> anyhow::Result<HandlerReturn>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            config: RouteConfig::default(),
            params,
            kind: MethodKind::Handler(Arc::new(f)),
        }
    }

    /// Declare a method returning a nested sub-interface.
    pub fn nested<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Arc<dyn WebInterface> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            config: RouteConfig::default(),
            params: Vec::new(),
            kind: MethodKind::Nested(Arc::new(f)),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: RouteConfig) -> Self {
        self.config = config;
        self
    }
}

/// Declared shape of one interface object.
#[derive(Clone, Default)]
pub struct InterfaceDecl {
    /// Interface-level explicit path prefix
    pub base_path: Option<String>,
    pub methods: Vec<MethodDecl>,
}

/// An object whose public methods represent application actions.
///
/// Rust has no runtime reflection, so the interface describes itself
/// explicitly; the description plays the role reflected method signatures
/// play elsewhere and is consumed once, at registration time.
pub trait WebInterface: Send + Sync {
    fn describe(&self) -> InterfaceDecl;
}

/// Resolved parameter specification inside a built route entry.
#[derive(Clone)]
pub struct ParameterSpec {
    pub name: String,
    /// Resolved source; never `Auto` after building
    pub source: ParamSource,
    pub ty: ValueType,
    pub optional: bool,
    pub default: Option<Value>,
    /// Index of the confirmed parameter within the same entry
    pub confirms: Option<usize>,
    pub compute: Option<ComputeFn>,
}

/// What a matched entry does.
#[derive(Clone)]
pub enum EntryAction {
    /// Run the full bind/invoke pipeline
    Invoke(HandlerFn),
    /// Redirect to the canonical path, preserving the query string
    RedirectTo(String),
}

/// Resolved error-display target of an entry.
#[derive(Clone)]
pub struct ErrorTarget {
    /// Index of the display entry in the route table
    pub entry: usize,
    pub map: ErrorMapFn,
}

/// One immutable route produced by the builder.
pub struct RouteEntry {
    pub method: Method,
    pub path: String,
    /// Declared method name this entry was derived from
    pub source_method: String,
    pub params: Vec<ParameterSpec>,
    pub action: EntryAction,
    pub error_display: Option<ErrorTarget>,
    pub content_type: Option<String>,
    pub nesting_style: NestingStyle,
    pub websocket: bool,
}

/// The full route table of one registered interface tree.
///
/// Built once at registration, immutable thereafter, safe for concurrent
/// reads from arbitrarily many request tasks.
#[derive(Default)]
pub struct RouteTable {
    pub entries: Vec<Arc<RouteEntry>>,
}

impl RouteTable {
    /// Ordered `(method, path)` list, mainly for assertions and logging.
    #[must_use]
    pub fn bindings(&self) -> Vec<(Method, String)> {
        self.entries
            .iter()
            .map(|e| (e.method.clone(), e.path.clone()))
            .collect()
    }
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(
                self.entries
                    .iter()
                    .map(|e| (e.method.as_str(), e.path.as_str())),
            )
            .finish()
    }
}
