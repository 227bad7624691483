//! Request/response handle contracts.
//!
//! The HTTP transport lives outside this crate. The dispatcher consumes
//! whatever the server provides through the [`ServerRequest`] and
//! [`ServerResponse`] traits; implementations own their concurrency and
//! I/O. A response write is a terminal point: once [`ServerResponse::committed`]
//! reports `true`, the dispatcher performs no further binding or invocation.

mod request;
mod response;

pub use request::{parse_query_params, ServerRequest, WebSocketChannel};
pub use response::ServerResponse;
