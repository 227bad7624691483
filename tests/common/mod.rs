//! Shared test doubles: in-memory request/response handles and a recording
//! router. Route matching itself is the external router's job, so tests
//! look bindings up by method and path and invoke them directly.

// Each test binary uses its own subset of these doubles.
#![allow(dead_code)]

use http::Method;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};
use webiface::router::{RouteBinding, Router};
use webiface::server::{parse_query_params, ServerRequest, ServerResponse, WebSocketChannel};
use webiface::session::{MemorySessionStore, SessionStore};

/// Channel double: scripted incoming messages, sent messages recorded in a
/// shared log the test keeps a handle to.
pub struct MockWebSocketChannel {
    incoming: VecDeque<String>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl WebSocketChannel for MockWebSocketChannel {
    fn send_text(&mut self, text: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn receive_text(&mut self) -> anyhow::Result<Option<String>> {
        Ok(self.incoming.pop_front())
    }
}

/// Request double with settable query/form/path-parameter maps and a
/// lazily-created in-memory session.
pub struct MockRequest {
    method: Method,
    url: String,
    query: HashMap<String, String>,
    form: HashMap<String, String>,
    path_params: HashMap<String, String>,
    headers: HashMap<String, String>,
    body: Vec<u8>,
    websocket: Option<(Vec<String>, Arc<Mutex<Vec<String>>>)>,
    session: Mutex<Option<Arc<MemorySessionStore>>>,
}

impl MockRequest {
    pub fn new(method: Method, url: &str) -> Self {
        Self {
            method,
            query: parse_query_params(url),
            url: url.to_string(),
            form: HashMap::new(),
            path_params: HashMap::new(),
            headers: HashMap::new(),
            body: Vec::new(),
            websocket: None,
            session: Mutex::new(None),
        }
    }

    pub fn get(url: &str) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: &str) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn with_form(mut self, pairs: &[(&str, &str)]) -> Self {
        for (k, v) in pairs {
            self.form.insert(k.to_string(), v.to_string());
        }
        self
    }

    pub fn with_path_param(mut self, name: &str, value: &str) -> Self {
        self.path_params.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_lowercase(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: &[u8]) -> Self {
        self.body = body.to_vec();
        self
    }

    /// Allow a WebSocket upgrade with the given scripted incoming messages.
    pub fn with_websocket(mut self, incoming: &[&str]) -> Self {
        let incoming = incoming.iter().map(|s| s.to_string()).collect();
        self.websocket = Some((incoming, Arc::new(Mutex::new(Vec::new()))));
        self
    }

    /// Log of messages sent over the upgraded channel. Clone the handle
    /// before [`into_arc`](Self::into_arc).
    pub fn websocket_sent(&self) -> Option<Arc<Mutex<Vec<String>>>> {
        self.websocket.as_ref().map(|(_, sent)| Arc::clone(sent))
    }

    pub fn into_arc(self) -> Arc<dyn ServerRequest> {
        Arc::new(self)
    }
}

impl ServerRequest for MockRequest {
    fn method(&self) -> Method {
        self.method.clone()
    }

    fn url(&self) -> String {
        self.url.clone()
    }

    fn path(&self) -> String {
        self.url
            .split_once('?')
            .map(|(p, _)| p.to_string())
            .unwrap_or_else(|| self.url.clone())
    }

    fn query(&self) -> HashMap<String, String> {
        self.query.clone()
    }

    fn form(&self) -> HashMap<String, String> {
        self.form.clone()
    }

    fn path_params(&self) -> HashMap<String, String> {
        self.path_params.clone()
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers.get(&name.to_lowercase()).cloned()
    }

    fn body_reader(&self) -> anyhow::Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.body.clone())))
    }

    fn session(&self) -> Option<Arc<dyn SessionStore>> {
        self.session
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| Arc::clone(s) as Arc<dyn SessionStore>)
    }

    fn start_session(&self) -> Arc<dyn SessionStore> {
        let mut guard = self.session.lock().unwrap();
        let store = guard
            .get_or_insert_with(|| Arc::new(MemorySessionStore::new()))
            .clone();
        store as Arc<dyn SessionStore>
    }

    fn terminate_session(&self) {
        *self.session.lock().unwrap() = None;
    }

    fn upgrade_websocket(&self) -> anyhow::Result<Box<dyn WebSocketChannel>> {
        match &self.websocket {
            Some((incoming, sent)) => Ok(Box::new(MockWebSocketChannel {
                incoming: incoming.iter().cloned().collect(),
                sent: Arc::clone(sent),
            })),
            None => anyhow::bail!("upgrade was not negotiated for this request"),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ResponseState {
    pub status: Option<u16>,
    pub headers: Vec<(String, String)>,
    pub redirect: Option<(String, u16)>,
    pub json: Option<Value>,
    pub raw: Option<(String, Vec<u8>)>,
}

/// Response double recording everything written to it. Any observable
/// write flips `committed`.
#[derive(Debug, Default)]
pub struct MockResponse {
    state: Mutex<ResponseState>,
}

impl MockResponse {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> ResponseState {
        self.state.lock().unwrap().clone()
    }
}

impl ServerResponse for MockResponse {
    fn set_status(&self, code: u16) {
        self.state.lock().unwrap().status = Some(code);
    }

    fn set_header(&self, name: &str, value: &str) {
        self.state
            .lock()
            .unwrap()
            .headers
            .push((name.to_string(), value.to_string()));
    }

    fn redirect(&self, url: &str, status: u16) {
        self.state.lock().unwrap().redirect = Some((url.to_string(), status));
    }

    fn write_raw(&self, content_type: &str, body: &[u8]) {
        self.state.lock().unwrap().raw = Some((content_type.to_string(), body.to_vec()));
    }

    fn write_json(&self, body: &Value) {
        self.state.lock().unwrap().json = Some(body.clone());
    }

    fn committed(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.status.is_some()
            || !state.headers.is_empty()
            || state.redirect.is_some()
            || state.json.is_some()
            || state.raw.is_some()
    }
}

/// Router double that records registrations in order.
#[derive(Default)]
pub struct MapRouter {
    pub bindings: Vec<RouteBinding>,
}

impl MapRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, method: &Method, path: &str) -> Option<&RouteBinding> {
        self.bindings
            .iter()
            .find(|b| &b.method == method && b.path == path)
    }

    pub fn paths(&self) -> Vec<(Method, String)> {
        self.bindings
            .iter()
            .map(|b| (b.method.clone(), b.path.clone()))
            .collect()
    }
}

impl Router for MapRouter {
    fn register(&mut self, binding: RouteBinding) {
        self.bindings.push(binding);
    }
}
