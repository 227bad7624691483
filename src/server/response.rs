use serde_json::Value;

/// Write access to the response of one in-flight request.
///
/// Implementations decide when data actually hits the wire; the dispatcher
/// only requires that [`committed`](ServerResponse::committed) flips to
/// `true` once anything observable was written (status, redirect, body),
/// because a committed response is a terminal point for the dispatch state
/// machine.
pub trait ServerResponse: Send + Sync {
    fn set_status(&self, code: u16);

    fn set_header(&self, name: &str, value: &str);

    /// Issue a redirect to `url` with the given status code.
    fn redirect(&self, url: &str, status: u16);

    /// Write a raw body with an explicit content type.
    fn write_raw(&self, content_type: &str, body: &[u8]);

    /// Write a structured JSON body.
    fn write_json(&self, body: &Value);

    /// Whether anything was written to this response yet.
    fn committed(&self) -> bool;
}
