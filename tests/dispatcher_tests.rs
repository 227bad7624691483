//! End-to-end dispatch over registered interfaces: the success path,
//! client-error responses, error-display re-dispatch, the security hooks,
//! trailing-slash canonicalization, and serialization variants.

mod common;

use common::{MapRouter, MockRequest, MockResponse};
use http::Method;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use webiface::binder::BoundParams;
use webiface::error::HttpError;
use webiface::iface::{
    register_interface, register_interface_with, ErrorDisplay, HandlerReturn, InterfaceDecl,
    MethodDecl, ParamDecl, RouteConfig, ValueType, WebInterface, WebInterfaceSettings,
};
use webiface::naming::CaseStyle;
use webiface::router::{HandleResult, RouteHandler};
use webiface::security::{Authenticator, Authorizer};
use webiface::dispatcher::ResponseFilter;
use webiface::server::{ServerRequest, ServerResponse};
use webiface::{DispatchConfig, RequestContext};

fn settings() -> WebInterfaceSettings {
    WebInterfaceSettings::default()
}

fn dispatch(
    router: &MapRouter,
    method: Method,
    route: &str,
    req: MockRequest,
) -> (HandleResult, Arc<MockResponse>) {
    let binding = router
        .find(&method, route)
        .unwrap_or_else(|| panic!("no binding for {method} {route}"));
    let resp = MockResponse::new();
    let result = binding
        .handler
        .handle(req.into_arc(), Arc::clone(&resp) as Arc<dyn ServerResponse>);
    (result, resp)
}

struct DeclInterface(InterfaceDecl);

impl WebInterface for DeclInterface {
    fn describe(&self) -> InterfaceDecl {
        self.0.clone()
    }
}

fn register(decl: InterfaceDecl, config: DispatchConfig) -> MapRouter {
    let mut router = MapRouter::new();
    register_interface_with(
        &mut router,
        Arc::new(DeclInterface(decl)),
        CaseStyle::LowerUnderscored,
        &settings(),
        config,
    )
    .unwrap();
    router
}

#[test]
fn successful_dispatch_serializes_the_return() {
    let decl = InterfaceDecl {
        base_path: None,
        methods: vec![MethodDecl::handler(
            "getGreeting",
            vec![ParamDecl::field("name", ValueType::Str)],
            |_ctx, params| {
                let name = params.json("name").cloned().unwrap_or_default();
                Ok(HandlerReturn::Json(json!({ "greeting": name })))
            },
        )],
    };
    let router = register(decl, DispatchConfig::default());

    let (result, resp) = dispatch(
        &router,
        Method::GET,
        "/greeting",
        MockRequest::get("/greeting?name=ada"),
    );
    assert_eq!(result, HandleResult::Handled);
    assert_eq!(resp.state().json, Some(json!({ "greeting": "ada" })));
}

#[test]
fn missing_required_field_reports_400_with_the_field() {
    let decl = InterfaceDecl {
        base_path: None,
        methods: vec![MethodDecl::handler(
            "getGreeting",
            vec![ParamDecl::field("name", ValueType::Str)],
            |_ctx, _params| Ok(HandlerReturn::Unit),
        )],
    };
    let router = register(decl, DispatchConfig::default());

    let (result, resp) = dispatch(&router, Method::GET, "/greeting", MockRequest::get("/greeting"));
    assert_eq!(result, HandleResult::Handled);
    let state = resp.state();
    assert_eq!(state.status, Some(400));
    assert_eq!(
        state.json.as_ref().and_then(|v| v.get("field")),
        Some(&json!("name"))
    );
}

#[test]
fn confirmation_mismatch_blames_the_confirming_field() {
    let decl = InterfaceDecl {
        base_path: None,
        methods: vec![MethodDecl::handler(
            "setPassword",
            vec![
                ParamDecl::field("password", ValueType::Str),
                ParamDecl::field("password_confirm", ValueType::Str).confirms("password"),
            ],
            |_ctx, _params| Ok(HandlerReturn::Unit),
        )],
    };
    let router = register(decl, DispatchConfig::default());

    let (_, resp) = dispatch(
        &router,
        Method::PUT,
        "/password",
        MockRequest::new(Method::PUT, "/password")
            .with_form(&[("password", "hunter2"), ("password_confirm", "hunter3")]),
    );
    let state = resp.state();
    assert_eq!(state.status, Some(400));
    assert_eq!(
        state.json.as_ref().and_then(|v| v.get("field")),
        Some(&json!("password_confirm"))
    );
}

fn form_with_error_display() -> InterfaceDecl {
    InterfaceDecl {
        base_path: None,
        methods: vec![
            MethodDecl::handler(
                "getForm",
                vec![ParamDecl::error_slot()],
                |_ctx, params| {
                    let slot = params.json("_error").cloned().unwrap_or_default();
                    Ok(HandlerReturn::Json(json!({ "form": true, "error": slot })))
                },
            ),
            MethodDecl::handler(
                "addEntry",
                vec![ParamDecl::field("age", ValueType::Int)],
                |_ctx, _params| anyhow::bail!("entry rejected"),
            )
            .with_config(RouteConfig::new().error_display(ErrorDisplay::composite("getForm"))),
        ],
    }
}

#[test]
fn binding_failure_reroutes_to_the_error_display() {
    let router = register(form_with_error_display(), DispatchConfig::default());

    let (result, resp) = dispatch(
        &router,
        Method::POST,
        "/entry",
        MockRequest::post("/entry").with_form(&[("age", "forty")]),
    );
    assert_eq!(result, HandleResult::Handled);
    let body = resp.state().json.expect("display handler response");
    assert_eq!(body["form"], json!(true));
    assert_eq!(body["error"]["field"], json!("age"));
}

#[test]
fn handler_failure_reroutes_with_a_null_field() {
    let router = register(form_with_error_display(), DispatchConfig::default());

    let (_, resp) = dispatch(
        &router,
        Method::POST,
        "/entry",
        MockRequest::post("/entry").with_form(&[("age", "30")]),
    );
    let body = resp.state().json.expect("display handler response");
    assert_eq!(body["error"]["message"], json!("entry rejected"));
    assert_eq!(body["error"]["field"], json!(null));
}

#[test]
fn recovery_runs_at_most_once() {
    let decl = InterfaceDecl {
        base_path: None,
        methods: vec![
            MethodDecl::handler("getForm", vec![ParamDecl::error_slot()], |_ctx, _params| {
                anyhow::bail!("the display itself is broken")
            }),
            MethodDecl::handler("addEntry", vec![], |_ctx, _params| {
                anyhow::bail!("original failure")
            })
            .with_config(RouteConfig::new().error_display(ErrorDisplay::message("getForm"))),
        ],
    };
    let router = register(decl, DispatchConfig::default());

    let (result, resp) = dispatch(&router, Method::POST, "/entry", MockRequest::post("/entry"));
    assert_eq!(result, HandleResult::Handled);
    let state = resp.state();
    assert_eq!(state.status, Some(500));
    assert_eq!(
        state.json.as_ref().and_then(|v| v.get("error")),
        Some(&json!("the display itself is broken"))
    );
}

#[test]
fn http_error_in_the_handler_chain_decides_the_status() {
    let decl = InterfaceDecl {
        base_path: None,
        methods: vec![MethodDecl::handler("getItem", vec![], |_ctx, _params| {
            Err(anyhow::Error::new(HttpError::new(404, "no such item")))
        })],
    };
    let router = register(decl, DispatchConfig::default());

    let (_, resp) = dispatch(&router, Method::GET, "/item", MockRequest::get("/item"));
    assert_eq!(resp.state().status, Some(404));
}

struct HeaderAuth;

impl Authenticator for HeaderAuth {
    fn authenticate(
        &self,
        req: &dyn ServerRequest,
        resp: &dyn ServerResponse,
    ) -> anyhow::Result<Value> {
        match req.header("authorization") {
            Some(token) if token == "let-me-in" => Ok(json!({ "login": "ada" })),
            Some(_) => anyhow::bail!("bad token"),
            None => {
                // Challenge instead of erroring; the response commits.
                resp.redirect("/login", 302);
                Ok(Value::Null)
            }
        }
    }
}

struct AdminOnly;

impl Authorizer for AdminOnly {
    fn authorize(&self, auth: &Value, _params: &BoundParams) -> bool {
        auth.get("login") == Some(&json!("root"))
    }
}

#[test]
fn authenticated_identity_reaches_auth_parameters() {
    let decl = InterfaceDecl {
        base_path: None,
        methods: vec![MethodDecl::handler(
            "getProfile",
            vec![ParamDecl::auth("user")],
            |_ctx, params| Ok(HandlerReturn::Json(params.json("user").cloned().unwrap_or_default())),
        )],
    };
    let config = DispatchConfig {
        authenticator: Some(Arc::new(HeaderAuth)),
        ..DispatchConfig::default()
    };
    let router = register(decl, config);

    let (_, resp) = dispatch(
        &router,
        Method::GET,
        "/profile",
        MockRequest::get("/profile").with_header("authorization", "let-me-in"),
    );
    assert_eq!(resp.state().json, Some(json!({ "login": "ada" })));
}

#[test]
fn authenticator_writing_the_response_stops_dispatch() {
    let invoked = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&invoked);
    let decl = InterfaceDecl {
        base_path: None,
        methods: vec![MethodDecl::handler("getProfile", vec![], move |_ctx, _params| {
            flag.store(true, Ordering::SeqCst);
            Ok(HandlerReturn::Unit)
        })],
    };
    let config = DispatchConfig {
        authenticator: Some(Arc::new(HeaderAuth)),
        ..DispatchConfig::default()
    };
    let router = register(decl, config);

    let (result, resp) = dispatch(&router, Method::GET, "/profile", MockRequest::get("/profile"));
    assert_eq!(result, HandleResult::Handled);
    assert_eq!(resp.state().redirect, Some(("/login".to_string(), 302)));
    assert!(!invoked.load(Ordering::SeqCst));
}

#[test]
fn failed_authentication_defaults_to_a_401_challenge() {
    let decl = InterfaceDecl {
        base_path: None,
        methods: vec![MethodDecl::handler("getProfile", vec![], |_ctx, _params| {
            Ok(HandlerReturn::Unit)
        })],
    };
    let config = DispatchConfig {
        authenticator: Some(Arc::new(HeaderAuth)),
        ..DispatchConfig::default()
    };
    let router = register(decl, config);

    let (_, resp) = dispatch(
        &router,
        Method::GET,
        "/profile",
        MockRequest::get("/profile").with_header("authorization", "stale"),
    );
    assert_eq!(resp.state().status, Some(401));
}

#[test]
fn authorization_denial_is_a_403_and_skips_the_handler() {
    let invoked = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&invoked);
    let decl = InterfaceDecl {
        base_path: None,
        methods: vec![MethodDecl::handler("getAudit", vec![], move |_ctx, _params| {
            flag.store(true, Ordering::SeqCst);
            Ok(HandlerReturn::Unit)
        })],
    };
    let config = DispatchConfig {
        authenticator: Some(Arc::new(HeaderAuth)),
        authorizer: Some(Arc::new(AdminOnly)),
        ..DispatchConfig::default()
    };
    let router = register(decl, config);

    let (result, resp) = dispatch(
        &router,
        Method::GET,
        "/audit",
        MockRequest::get("/audit").with_header("authorization", "let-me-in"),
    );
    assert_eq!(result, HandleResult::Handled);
    assert_eq!(resp.state().status, Some(403));
    assert!(!invoked.load(Ordering::SeqCst));
}

#[test]
fn computed_parameter_writing_the_response_stops_dispatch() {
    let invoked = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&invoked);
    let decl = InterfaceDecl {
        base_path: None,
        methods: vec![MethodDecl::handler(
            "getReport",
            vec![ParamDecl::field("cached", ValueType::Str).computed(|_req, resp| {
                resp.write_raw("text/plain", b"cached copy");
                Ok(Value::Null)
            })],
            move |_ctx, _params| {
                flag.store(true, Ordering::SeqCst);
                Ok(HandlerReturn::Unit)
            },
        )],
    };
    let router = register(decl, DispatchConfig::default());

    let (result, resp) = dispatch(&router, Method::GET, "/report", MockRequest::get("/report"));
    assert_eq!(result, HandleResult::Handled);
    assert!(resp.state().raw.is_some());
    assert!(!invoked.load(Ordering::SeqCst));
}

#[test]
fn trailing_slash_redirect_preserves_the_query() {
    let decl = InterfaceDecl {
        base_path: None,
        methods: vec![MethodDecl::handler("getItems", vec![], |_ctx, _params| {
            Ok(HandlerReturn::Json(json!([])))
        })],
    };
    let mut router = MapRouter::new();
    register_interface(
        &mut router,
        Arc::new(DeclInterface(decl)),
        CaseStyle::LowerUnderscored,
        &WebInterfaceSettings {
            url_prefix: String::new(),
            ignore_trailing_slash: true,
        },
    )
    .unwrap();

    let (result, resp) = dispatch(
        &router,
        Method::GET,
        "/items/",
        MockRequest::get("/items/?page=2"),
    );
    assert_eq!(result, HandleResult::Handled);
    assert_eq!(resp.state().redirect, Some(("/items?page=2".to_string(), 301)));
}

#[test]
fn trailing_slash_post_complement_runs_the_handler() {
    let decl = InterfaceDecl {
        base_path: None,
        methods: vec![MethodDecl::handler("addItems", vec![], |_ctx, _params| {
            Ok(HandlerReturn::Json(json!({ "created": true })))
        })],
    };
    let mut router = MapRouter::new();
    register_interface(
        &mut router,
        Arc::new(DeclInterface(decl)),
        CaseStyle::LowerUnderscored,
        &WebInterfaceSettings {
            url_prefix: String::new(),
            ignore_trailing_slash: true,
        },
    )
    .unwrap();

    let (result, resp) = dispatch(&router, Method::POST, "/items/", MockRequest::post("/items/"));
    assert_eq!(result, HandleResult::Handled);
    assert_eq!(resp.state().json, Some(json!({ "created": true })));
}

#[test]
fn websocket_routes_hand_the_upgraded_channel_to_the_handler() {
    let decl = InterfaceDecl {
        base_path: None,
        methods: vec![MethodDecl::handler(
            "getEcho",
            vec![ParamDecl::websocket("stream")],
            |_ctx, mut params| {
                let mut channel = params.take_websocket().expect("upgraded channel");
                while let Some(msg) = channel.receive_text()? {
                    channel.send_text(&msg.to_uppercase())?;
                }
                Ok(HandlerReturn::Unit)
            },
        )],
    };
    let router = register(decl, DispatchConfig::default());

    let req = MockRequest::get("/echo").with_websocket(&["hi", "there"]);
    let sent = req.websocket_sent().expect("upgrade negotiated");
    let (result, resp) = dispatch(&router, Method::GET, "/echo", req);
    assert_eq!(result, HandleResult::Handled);
    assert_eq!(*sent.lock().unwrap(), vec!["HI", "THERE"]);
    assert!(!resp.committed(), "stream routes write no HTTP body");
}

#[test]
fn websocket_return_values_are_discarded() {
    let decl = InterfaceDecl {
        base_path: None,
        methods: vec![MethodDecl::handler(
            "getFeed",
            vec![ParamDecl::websocket("stream")],
            |_ctx, _params| Ok(HandlerReturn::Json(json!({ "ignored": true }))),
        )],
    };
    let router = register(decl, DispatchConfig::default());

    let (result, resp) = dispatch(
        &router,
        Method::GET,
        "/feed",
        MockRequest::get("/feed").with_websocket(&[]),
    );
    assert_eq!(result, HandleResult::Handled);
    assert_eq!(resp.state().json, None);
}

#[test]
fn failed_upgrade_is_a_500_class_failure() {
    let decl = InterfaceDecl {
        base_path: None,
        methods: vec![MethodDecl::handler(
            "getFeed",
            vec![ParamDecl::websocket("stream")],
            |_ctx, _params| Ok(HandlerReturn::Unit),
        )],
    };
    let router = register(decl, DispatchConfig::default());

    // Plain request: the double rejects the upgrade.
    let (result, resp) = dispatch(&router, Method::GET, "/feed", MockRequest::get("/feed"));
    assert_eq!(result, HandleResult::Handled);
    assert_eq!(resp.state().status, Some(500));
}

struct Envelope;

impl ResponseFilter for Envelope {
    fn apply(&self, _ctx: &RequestContext, ret: HandlerReturn) -> HandlerReturn {
        match ret {
            HandlerReturn::Json(v) => HandlerReturn::Json(json!({ "data": v })),
            other => other,
        }
    }
}

struct Stamp;

impl ResponseFilter for Stamp {
    fn apply(&self, _ctx: &RequestContext, ret: HandlerReturn) -> HandlerReturn {
        match ret {
            HandlerReturn::Json(mut v) => {
                v["stamped"] = json!(true);
                HandlerReturn::Json(v)
            }
            other => other,
        }
    }
}

#[test]
fn response_filters_apply_in_registration_order() {
    let decl = InterfaceDecl {
        base_path: None,
        methods: vec![MethodDecl::handler("getItem", vec![], |_ctx, _params| {
            Ok(HandlerReturn::Json(json!({ "id": 7 })))
        })],
    };
    let config = DispatchConfig {
        filters: vec![Arc::new(Envelope), Arc::new(Stamp)],
        ..DispatchConfig::default()
    };
    let router = register(decl, config);

    let (_, resp) = dispatch(&router, Method::GET, "/item", MockRequest::get("/item"));
    // Envelope wraps first, then Stamp marks the wrapper.
    assert_eq!(
        resp.state().json,
        Some(json!({ "data": { "id": 7 }, "stamped": true }))
    );
}

#[test]
fn unit_returns_bypass_response_filters() {
    let decl = InterfaceDecl {
        base_path: None,
        methods: vec![MethodDecl::handler("getPing", vec![], |_ctx, _params| {
            Ok(HandlerReturn::Unit)
        })],
    };
    let config = DispatchConfig {
        filters: vec![Arc::new(Envelope)],
        ..DispatchConfig::default()
    };
    let router = register(decl, config);

    let (result, resp) = dispatch(&router, Method::GET, "/ping", MockRequest::get("/ping"));
    assert_eq!(result, HandleResult::Handled);
    assert_eq!(resp.state().json, None);
}

#[test]
fn raw_returns_honor_the_content_type_override() {
    let decl = InterfaceDecl {
        base_path: None,
        methods: vec![MethodDecl::handler("getBadge", vec![], |_ctx, _params| {
            Ok(HandlerReturn::Raw(b"<svg/>".to_vec()))
        })
        .with_config(RouteConfig::new().content_type("image/svg+xml"))],
    };
    let router = register(decl, DispatchConfig::default());

    let (_, resp) = dispatch(&router, Method::GET, "/badge", MockRequest::get("/badge"));
    assert_eq!(
        resp.state().raw,
        Some(("image/svg+xml".to_string(), b"<svg/>".to_vec()))
    );
}

#[test]
fn unit_returns_leave_the_handler_written_response_alone() {
    let decl = InterfaceDecl {
        base_path: None,
        methods: vec![MethodDecl::handler("postLogin", vec![], |ctx, _params| {
            ctx.redirect("/dashboard");
            Ok(HandlerReturn::Unit)
        })],
    };
    let router = register(decl, DispatchConfig::default());

    let (result, resp) = dispatch(&router, Method::POST, "/login", MockRequest::post("/login"));
    assert_eq!(result, HandleResult::Handled);
    let state = resp.state();
    assert_eq!(state.redirect, Some(("/dashboard".to_string(), 302)));
    assert_eq!(state.json, None);
}

#[test]
fn placeholder_mismatch_propagates_as_no_match() {
    let decl = InterfaceDecl {
        base_path: None,
        methods: vec![MethodDecl::handler(
            "getUser",
            vec![ParamDecl::field("_id", ValueType::Int)],
            |_ctx, params| Ok(HandlerReturn::Json(params.json("_id").cloned().unwrap_or_default())),
        )
        .with_config(RouteConfig::new().path("/users/*"))],
    };
    let router = register(decl, DispatchConfig::default());

    let (result, resp) = dispatch(
        &router,
        Method::GET,
        "/users/*",
        MockRequest::get("/users/latest").with_path_param("id", "latest"),
    );
    assert_eq!(result, HandleResult::NoMatch);
    assert!(!resp.committed());

    let (result, resp) = dispatch(
        &router,
        Method::GET,
        "/users/*",
        MockRequest::get("/users/7").with_path_param("id", "7"),
    );
    assert_eq!(result, HandleResult::Handled);
    assert_eq!(resp.state().json, Some(json!(7)));
}
