use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::task::JoinHandle;

use insectid::app::AppContext;
use insectid::backend::{Backend, HttpBackend};
use insectid::config::ClientConfig;
use insectid::identity::{Role, SectionId, SessionState};
use insectid::notify::MemoryNotifier;
use insectid::validation::{AdminForm, SignInForm, SignUpForm};
use insectid::ClientError;

const PASSWORD: &str = "abcdef12";

/// Recorded request: route name, path parameter, `auth-token` header.
type Seen = (String, String, Option<String>);

#[derive(Clone, Default)]
struct MockService {
    issued: Arc<Mutex<u32>>,
    valid: Arc<Mutex<HashSet<String>>>,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl MockService {
    fn record(&self, route: &str, param: &str, headers: &HeaderMap) -> Option<String> {
        let token = headers.get("auth-token").and_then(|v| v.to_str().ok()).map(str::to_string);
        self.seen.lock().push((route.to_string(), param.to_string(), token.clone()));
        token
    }

    fn authorized(&self, token: Option<&str>) -> bool {
        token.map(|t| self.valid.lock().contains(t)).unwrap_or(false)
    }

    fn revoke_all(&self) { self.valid.lock().clear(); }

    fn seen(&self, route: &str) -> Vec<Seen> {
        self.seen.lock().iter().filter(|(r, _, _)| r == route).cloned().collect()
    }
}

async fn sign_in(State(svc): State<MockService>, Json(body): Json<Value>) -> Response {
    if body["password"] != PASSWORD {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if body["useremail"] == "broken@example.com" {
        return Json(json!({ "token": "bad\ntoken" })).into_response();
    }
    let token = {
        let mut n = svc.issued.lock();
        *n += 1;
        format!("tok-{}", *n)
    };
    svc.valid.lock().insert(token.clone());
    Json(json!({ "token": token, "expire_on": 1_700_000_000u64 })).into_response()
}

async fn sign_up(Json(body): Json<Value>) -> Response {
    match body["email"].as_str() {
        Some(e) if e.contains('@') && body["password"] == body["repassword"] => StatusCode::OK.into_response(),
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn check_role(State(svc): State<MockService>, Path(email): Path<String>, headers: HeaderMap) -> Response {
    let token = svc.record("check_role", &email, &headers);
    if !svc.authorized(token.as_deref()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let role = if email.starts_with("keeper@") { "User Administrator" } else { "Model Administrator" };
    Json(role).into_response()
}

async fn user_info(State(svc): State<MockService>, Path(email): Path<String>, headers: HeaderMap) -> Response {
    let token = svc.record("user_info", &email, &headers);
    if !svc.authorized(token.as_deref()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({ "nick_name": "bee", "email": email, "contribution": 12, "role": "Model Administrator" })).into_response()
}

async fn sign_out(State(svc): State<MockService>, Path(email): Path<String>, headers: HeaderMap) -> Response {
    if let Some(t) = svc.record("sign_out", &email, &headers) {
        svc.valid.lock().remove(&t);
    }
    StatusCode::OK.into_response()
}

async fn list_users(State(svc): State<MockService>, Query(q): Query<HashMap<String, String>>, headers: HeaderMap) -> Response {
    let admin = q.get("useremail").cloned().unwrap_or_default();
    let token = svc.record("list_users", &admin, &headers);
    if !svc.authorized(token.as_deref()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!([
        { "username": "ant", "useremail": "ant@example.com", "user_identity": "Common User", "user_contribution": 4 },
        { "username": "wasp", "useremail": "wasp@example.com", "user_identity": "Common User", "user_contribution": 0, "available": false },
    ]))
    .into_response()
}

async fn toggle_users(State(svc): State<MockService>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    // The list travels as a JSON document inside a string.
    let listed = body["user_emails"].as_str().unwrap_or_default().to_string();
    let token = svc.record("toggle_users", &listed, &headers);
    if !svc.authorized(token.as_deref()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    StatusCode::OK.into_response()
}

async fn add_admin(State(svc): State<MockService>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let role = body["role"].as_str().unwrap_or_default().to_string();
    let token = svc.record("add_admin", &role, &headers);
    if !svc.authorized(token.as_deref()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    StatusCode::OK.into_response()
}

async fn authenticate_ssh(State(svc): State<MockService>, Path(email): Path<String>, headers: HeaderMap) -> Response {
    let token = svc.record("authenticate_ssh", &email, &headers);
    if !svc.authorized(token.as_deref()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json("http://127.0.0.1:2222/ssh").into_response()
}

// Serve the mock backend on an ephemeral localhost port. Abort the handle to stop it.
async fn start_mock(svc: MockService) -> (JoinHandle<()>, String) {
    let app = Router::new()
        .route("/sign_in", post(sign_in))
        .route("/sign_up", post(sign_up))
        .route("/user/check_role/{email}", get(check_role))
        .route("/user/info/{email}", post(user_info))
        .route("/sign_out/{email}", get(sign_out))
        .route("/admin/user_manage", get(list_users).post(toggle_users))
        .route("/admin/user_manage/add_admin", post(add_admin))
        .route("/admin/authenticate_ssh/{email}", post(authenticate_ssh))
        .with_state(svc);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind 127.0.0.1:0");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("mock backend task error: {e:?}");
        }
    });
    (handle, format!("http://{addr}"))
}

fn config(base: &str) -> ClientConfig {
    ClientConfig::from_lookup(|_| None).unwrap().with_base_url(base).unwrap()
}

fn connect(config: &ClientConfig) -> (AppContext<HttpBackend>, MemoryNotifier) {
    let notes = MemoryNotifier::new();
    let ctx = AppContext::from_config(config, Arc::new(notes.clone())).expect("context");
    (ctx, notes)
}

fn bee() -> SignInForm { SignInForm::new("bee@example.com", PASSWORD) }

#[tokio::test]
async fn sign_in_attaches_token_to_role_lookup() {
    let svc = MockService::default();
    let (handle, base) = start_mock(svc.clone()).await;
    let (ctx, notes) = connect(&config(&base));

    let state = ctx.sign_in(&bee()).await.unwrap();
    assert_eq!(state, SessionState { signed_in: true, role: Role::ModelAdmin });
    assert!(ctx.visible_sections().contains(&SectionId::WebSsh));
    assert!(!ctx.visible_sections().contains(&SectionId::UserManage));

    let lookups = svc.seen("check_role");
    assert_eq!(lookups.len(), 1);
    assert_eq!(lookups[0].1, "bee@example.com");
    assert_eq!(lookups[0].2.as_deref(), Some("tok-1"));
    assert_eq!(notes.titles(), vec!["Success to sign in!"]);

    let profile = ctx.user_info().await.unwrap();
    assert_eq!(profile.contribution, 12);
    assert_eq!(profile.email, "bee@example.com");

    handle.abort();
}

#[tokio::test]
async fn wrong_password_is_an_authentication_failure() {
    let svc = MockService::default();
    let (handle, base) = start_mock(svc.clone()).await;
    let (ctx, notes) = connect(&config(&base));

    let err = ctx.sign_in(&SignInForm::new("bee@example.com", "wrongpass1")).await.unwrap_err();
    assert!(matches!(err, ClientError::Authentication { .. }), "{err:?}");
    assert_eq!(ctx.state(), SessionState::SIGNED_OUT);
    assert!(svc.seen("check_role").is_empty());
    assert_eq!(notes.titles(), vec!["Failed to sign in!"]);

    handle.abort();
}

#[tokio::test]
async fn expired_token_signs_out_and_stops_sending_it() {
    let svc = MockService::default();
    let (handle, base) = start_mock(svc.clone()).await;
    let (ctx, notes) = connect(&config(&base));
    ctx.sign_in(&bee()).await.unwrap();

    svc.revoke_all();
    let err = ctx.user_info().await.unwrap_err();
    assert!(err.is_authorization(), "{err:?}");
    assert_eq!(ctx.state(), SessionState::SIGNED_OUT);
    assert!(ctx.credential().is_empty());
    assert_eq!(notes.titles().last().map(String::as_str), Some("Your Token Expired!"));

    // The very next request goes out bare.
    let _ = ctx.backend().check_role("bee@example.com").await;
    let last = svc.seen("check_role").pop().unwrap();
    assert_eq!(last.2, None);

    handle.abort();
}

#[tokio::test]
async fn sign_up_statuses_map_to_outcomes() {
    let svc = MockService::default();
    let (handle, base) = start_mock(svc).await;
    let (ctx, notes) = connect(&config(&base));

    let good = SignUpForm {
        username: "hopper".into(),
        email: "hopper@example.com".into(),
        password: PASSWORD.into(),
        repassword: PASSWORD.into(),
    };
    ctx.sign_up(&good).await.unwrap();
    assert_eq!(ctx.state(), SessionState::SIGNED_OUT);

    // Passes local checks but the backend refuses it.
    let rejected = SignUpForm { email: "hopper.example.com".into(), ..good };
    let err = ctx.backend().sign_up(&rejected).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation { .. }), "{err:?}");
    assert_eq!(notes.titles(), vec!["Success to sign up a new account!"]);

    handle.abort();
}

#[tokio::test]
async fn remote_sign_out_carries_the_ended_token() {
    let svc = MockService::default();
    let (handle, base) = start_mock(svc.clone()).await;
    let cfg = ClientConfig::from_lookup(|k| match k {
        "INSECTID_BASE_URL" => Some(base.clone()),
        "INSECTID_REMOTE_SIGN_OUT" => Some("true".to_string()),
        _ => None,
    })
    .unwrap();
    let (ctx, _notes) = connect(&cfg);

    ctx.sign_in(&bee()).await.unwrap();
    assert_eq!(ctx.sign_out().await.unwrap(), SessionState::SIGNED_OUT);

    let outs = svc.seen("sign_out");
    assert_eq!(outs.len(), 1);
    assert_eq!(outs[0].1, "bee@example.com");
    assert_eq!(outs[0].2.as_deref(), Some("tok-1"));
    assert!(svc.valid.lock().is_empty());
    assert!(ctx.credential().is_empty());

    handle.abort();
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let (ctx, notes) = connect(&config("http://127.0.0.1:9"));
    let err = ctx.sign_in(&bee()).await.unwrap_err();
    assert!(matches!(err, ClientError::Network { .. }), "{err:?}");
    assert_eq!(ctx.state(), SessionState::SIGNED_OUT);
    assert_eq!(notes.titles(), vec!["Network Error!"]);
}

#[tokio::test]
async fn file_backed_session_survives_restart() {
    let svc = MockService::default();
    let (handle, base) = start_mock(svc.clone()).await;
    let tmp = TempDir::new().unwrap();
    let cfg = config(&base).with_session_file(tmp.path().join("session.json"));

    {
        let (ctx, _notes) = connect(&cfg);
        ctx.sign_in(&bee()).await.unwrap();
    }

    let (ctx, _notes) = connect(&cfg);
    assert_eq!(ctx.state(), SessionState { signed_in: true, role: Role::Unknown });
    ctx.start().await;
    assert_eq!(ctx.state().role, Role::ModelAdmin);
    let lookups = svc.seen("check_role");
    assert_eq!(lookups.len(), 2);
    assert_eq!(lookups[1].2.as_deref(), Some("tok-1"));

    ctx.sign_out().await.unwrap();
    let (ctx, _notes) = connect(&cfg);
    assert_eq!(ctx.state(), SessionState::SIGNED_OUT);

    handle.abort();
}

#[tokio::test]
async fn token_unfit_for_a_header_is_refused_at_sign_in() {
    let svc = MockService::default();
    let (handle, base) = start_mock(svc.clone()).await;
    let (ctx, notes) = connect(&config(&base));

    let err = ctx.sign_in(&SignInForm::new("broken@example.com", PASSWORD)).await.unwrap_err();
    assert!(matches!(err, ClientError::Internal { .. }), "{err:?}");
    assert_eq!(ctx.state(), SessionState::SIGNED_OUT);
    assert!(ctx.credential().is_empty());
    assert!(svc.seen("check_role").is_empty());
    assert_eq!(notes.titles(), vec!["Unexpected Response!"]);

    handle.abort();
}

fn keeper() -> SignInForm { SignInForm::new("keeper@example.com", PASSWORD) }

#[tokio::test]
async fn user_admin_calls_carry_token_and_query() {
    let svc = MockService::default();
    let (handle, base) = start_mock(svc.clone()).await;
    let (ctx, notes) = connect(&config(&base));
    ctx.sign_in(&keeper()).await.unwrap();
    assert_eq!(ctx.state().role, Role::UserAdmin);

    let users = ctx.list_users().await.unwrap();
    assert_eq!(users.len(), 2);
    assert!(users[0].available);
    assert!(!users[1].available);
    let listed = svc.seen("list_users");
    assert_eq!(listed[0].1, "keeper@example.com");
    assert_eq!(listed[0].2.as_deref(), Some("tok-1"));

    ctx.toggle_users(&["wasp@example.com".to_string()]).await.unwrap();
    assert_eq!(svc.seen("toggle_users")[0].1, r#"["wasp@example.com"]"#);

    let form = AdminForm {
        username: "hornet".into(),
        email: "hornet@example.com".into(),
        password: PASSWORD.into(),
        repassword: PASSWORD.into(),
        role: Role::ModelAdmin,
    };
    ctx.add_admin(&form).await.unwrap();
    let added = svc.seen("add_admin");
    assert_eq!(added[0].1, "Model Administrator");
    assert_eq!(added[0].2.as_deref(), Some("tok-1"));
    assert_eq!(notes.titles().last().map(String::as_str), Some("Success to sign up a new admin!"));

    handle.abort();
}

#[tokio::test]
async fn expired_token_on_admin_call_signs_out() {
    let svc = MockService::default();
    let (handle, base) = start_mock(svc.clone()).await;
    let (ctx, notes) = connect(&config(&base));
    ctx.sign_in(&keeper()).await.unwrap();

    svc.revoke_all();
    let err = ctx.list_users().await.unwrap_err();
    assert!(err.is_authorization(), "{err:?}");
    assert_eq!(ctx.state(), SessionState::SIGNED_OUT);
    assert!(ctx.credential().is_empty());
    assert_eq!(notes.titles().last().map(String::as_str), Some("Your Token Expired!"));

    handle.abort();
}

#[tokio::test]
async fn web_terminal_is_for_model_admins() {
    let svc = MockService::default();
    let (handle, base) = start_mock(svc.clone()).await;
    let (ctx, _notes) = connect(&config(&base));
    ctx.sign_in(&bee()).await.unwrap();

    assert_eq!(ctx.authenticate_ssh().await.unwrap(), "http://127.0.0.1:2222/ssh");
    assert_eq!(svc.seen("authenticate_ssh")[0].2.as_deref(), Some("tok-1"));
    assert!(matches!(ctx.list_users().await.unwrap_err(), ClientError::Guard { .. }));
    assert!(svc.seen("list_users").is_empty());

    handle.abort();
}
