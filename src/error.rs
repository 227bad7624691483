//! Error taxonomy.
//!
//! Three layers, matching where a failure can arise:
//!
//! - [`RouteConfigError`]: declaration problems caught once, at
//!   registration time, before any request is served
//! - [`BindError`]: per-parameter binding failures, including the
//!   route-disqualifying placeholder mismatch
//! - [`DispatchError`]: terminal per-request failures handed back to the
//!   router callback, each carrying its HTTP status class

use std::error::Error;
use std::fmt;

/// A failure scoped to one named request field.
///
/// `message` is user-facing; `debug` carries verbose detail (raw values,
/// parser output) that only debug-level payload mappings should expose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    pub debug: Option<String>,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            debug: None,
        }
    }

    #[must_use]
    pub fn with_debug(mut self, debug: impl Into<String>) -> Self {
        self.debug = Some(debug.into());
        self
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field '{}': {}", self.field, self.message)
    }
}

impl Error for FieldError {}

/// Outcome of binding one declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// A marker-prefixed parameter failed to convert from its captured
    /// placeholder; the route is disqualified, not the request
    PlaceholderMismatch { name: String, reason: String },
    /// A field-scoped failure attributable to the client's input
    Field(FieldError),
    /// A confirmation parameter did not equal its target
    ConfirmationMismatch { field: String },
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::PlaceholderMismatch { name, reason } => {
                write!(f, "route placeholder '{name}' mismatch: {reason}")
            }
            BindError::Field(err) => err.fmt(f),
            BindError::ConfirmationMismatch { field } => {
                write!(f, "field '{field}' does not confirm its target")
            }
        }
    }
}

impl Error for BindError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BindError::Field(err) => Some(err),
            _ => None,
        }
    }
}

/// A declaration problem detected while building the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteConfigError {
    /// A nested-interface method declared parameters
    NestedWithParams { method: String },
    /// An error-display annotation names a method absent from its interface
    UnknownErrorDisplay { method: String, target: String },
    /// A confirmation references a parameter absent from the same method
    UnknownConfirmationTarget {
        method: String,
        param: String,
        target: String,
    },
    /// A parameter declares itself as its own confirmation target
    SelfConfirmation { method: String, param: String },
    /// A confirmation and its target disagree on optionality
    ConfirmationOptionalityMismatch {
        method: String,
        param: String,
        target: String,
    },
    /// A method declared more than one WebSocket parameter
    MultipleWebSocketParams { method: String },
}

impl fmt::Display for RouteConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteConfigError::NestedWithParams { method } => {
                write!(f, "nested-interface method '{method}' must not declare parameters")
            }
            RouteConfigError::UnknownErrorDisplay { method, target } => {
                write!(f, "method '{method}': error display target '{target}' not found in the same interface")
            }
            RouteConfigError::UnknownConfirmationTarget { method, param, target } => {
                write!(f, "method '{method}': parameter '{param}' confirms unknown parameter '{target}'")
            }
            RouteConfigError::SelfConfirmation { method, param } => {
                write!(f, "method '{method}': parameter '{param}' cannot confirm itself")
            }
            RouteConfigError::ConfirmationOptionalityMismatch { method, param, target } => {
                write!(f, "method '{method}': parameter '{param}' and its confirmation target '{target}' must agree on optionality")
            }
            RouteConfigError::MultipleWebSocketParams { method } => {
                write!(f, "method '{method}' declares more than one WebSocket parameter")
            }
        }
    }
}

impl Error for RouteConfigError {}

/// Handler-raised error carrying an explicit HTTP status.
///
/// Raise (or wrap) one of these inside a handler to control the terminal
/// status; any other handler error reports as 500.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    pub status: u16,
    pub message: String,
}

impl HttpError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.message)
    }
}

impl Error for HttpError {}

/// A terminal dispatch failure, after error recovery (if any) is exhausted.
#[derive(Debug)]
pub enum DispatchError {
    /// Client-attributable input failure; reports as 400
    Field(FieldError),
    /// The authorization hook denied the request; reports as 403
    Denied,
    /// The handler (or the pipeline around it) failed
    Handler { status: u16, source: anyhow::Error },
}

impl DispatchError {
    /// HTTP status class of this failure.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::Field(_) => 400,
            DispatchError::Denied => 403,
            DispatchError::Handler { status, .. } => *status,
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Field(err) => err.fmt(f),
            DispatchError::Denied => write!(f, "access denied"),
            DispatchError::Handler { status, source } => {
                write!(f, "handler failed ({status}): {source}")
            }
        }
    }
}

impl Error for DispatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DispatchError::Field(err) => Some(err),
            DispatchError::Denied => None,
            DispatchError::Handler { source, .. } => Some(source.as_ref()),
        }
    }
}

/// Status an `anyhow` handler error reports with: an [`HttpError`] anywhere
/// in the chain decides, otherwise 500.
#[must_use]
pub fn handler_error_status(err: &anyhow::Error) -> u16 {
    err.downcast_ref::<HttpError>()
        .map_or(500, |http| http.status)
}
