use crate::session::SessionStore;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

/// Bidirectional message channel handed to a handler after a WebSocket
/// upgrade. Transport framing is the server's concern.
pub trait WebSocketChannel: Send {
    fn send_text(&mut self, text: &str) -> anyhow::Result<()>;

    /// Receive the next text message, `None` when the peer closed.
    fn receive_text(&mut self) -> anyhow::Result<Option<String>>;
}

/// Read access to one in-flight HTTP request, as provided by the external
/// server.
///
/// All accessors take `&self`; the request is shared between the dispatcher
/// and the handler through an `Arc`.
pub trait ServerRequest: Send + Sync {
    /// HTTP method of the request
    fn method(&self) -> http::Method;

    /// Full request URL including the query string
    fn url(&self) -> String;

    /// Path portion of the URL
    fn path(&self) -> String;

    /// Decoded query-string parameters
    fn query(&self) -> HashMap<String, String>;

    /// Decoded form fields (empty when the body is not a form)
    fn form(&self) -> HashMap<String, String>;

    /// Path placeholders captured by the router, name → value
    fn path_params(&self) -> HashMap<String, String>;

    /// Header lookup, case-insensitive name
    fn header(&self, name: &str) -> Option<String>;

    /// Raw body stream. May only be read once.
    fn body_reader(&self) -> anyhow::Result<Box<dyn Read + Send>>;

    /// The session attached to this request, if one exists
    fn session(&self) -> Option<Arc<dyn SessionStore>>;

    /// Return the existing session or create one as a side effect
    fn start_session(&self) -> Arc<dyn SessionStore>;

    /// Drop the session; later reads behave as if none ever existed
    fn terminate_session(&self);

    /// Switch the connection to WebSocket framing and return the channel.
    ///
    /// Only called for routes registered as upgrade-capable. The default
    /// rejects, for servers without WebSocket support.
    fn upgrade_websocket(&self) -> anyhow::Result<Box<dyn WebSocketChannel>> {
        anyhow::bail!("this server does not support WebSocket upgrades")
    }
}

/// Parse query string parameters out of a URL or path.
///
/// Everything after the first `?` is form-url-decoded into a name → value
/// map; later duplicates win.
#[must_use]
pub fn parse_query_params(url: &str) -> HashMap<String, String> {
    match url.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        None => HashMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_parsing_decodes_values() {
        let params = parse_query_params("/items?name=a%20b&count=2");
        assert_eq!(params.get("name").map(String::as_str), Some("a b"));
        assert_eq!(params.get("count").map(String::as_str), Some("2"));
    }

    #[test]
    fn no_query_yields_empty_map() {
        assert!(parse_query_params("/items").is_empty());
    }
}
