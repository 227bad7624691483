//! Interface declaration model and route table builder.
//!
//! An application describes each interface object explicitly (its public
//! methods, their parameters, and the typed per-method configuration that
//! plays the role of annotations) and [`register_interface`] compiles that
//! description into an immutable [`RouteTable`] at startup:
//!
//! - verb and path derive from the method name via the naming resolver,
//!   unless the configuration overrides them;
//! - methods returning a nested sub-interface recurse the builder under an
//!   extended path prefix (and must declare zero parameters);
//! - trailing-slash complements register alongside the canonical path when
//!   requested, the GET complement as a redirect;
//! - a bidirectional-stream parameter turns the route into a WebSocket
//!   upgrade route.
//!
//! The table is read-only for the lifetime of the process and shared by
//! every request task.

mod build;
mod types;

pub use build::{build_route_table, join_url, register_interface, register_interface_with};
pub use types::{
    ComputeFn, Converter, DispatchFailure, EntryAction, ErrorDisplay, ErrorMapFn, ErrorTarget,
    FieldDecl, HandlerFn, HandlerReturn, InterfaceDecl, MethodDecl, MethodKind, NestedFn,
    NestingStyle, ParamDecl, ParamSource, ParameterSpec, PlainParseFn, RouteConfig, RouteEntry,
    RouteTable, ValidatingParseFn, ValueType, WebInterface, WebInterfaceSettings, ERROR_SLOT,
    ROUTE_PARAM_MARKER,
};
