//! End-to-end session behavior against a local stub of the admin API.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use stockroom::config::{ApiConfig, Timeouts};
use stockroom::net::api::ProductsApi;
use stockroom::net::auth::{AuthClient, SessionPhase};
use stockroom::net::http::{HttpRequest, HttpTransport, RequestOptions, TransportError};
use stockroom::net::native::ReqwestTransport;
use stockroom::net::types::Credentials;
use stockroom::pages::login::{LoginError, LoginFlow};
use stockroom::state::session::SessionStore;
use stockroom::util::auth::{RouteDecision, can_enter_protected};

// =============================================================================
// stub server
// =============================================================================

#[derive(Clone)]
struct Stub {
    refresh_ok: Arc<AtomicBool>,
    refreshes: Arc<AtomicUsize>,
    deletes: Arc<AtomicUsize>,
}

impl Stub {
    fn new(refresh_ok: bool) -> Self {
        Self {
            refresh_ok: Arc::new(AtomicBool::new(refresh_ok)),
            refreshes: Arc::new(AtomicUsize::new(0)),
            deletes: Arc::new(AtomicUsize::new(0)),
        }
    }
}

fn session_json(access: &str, refresh: &str) -> Value {
    json!({
        "accessToken": access,
        "refreshToken": refresh,
        "user": { "id": "u1", "name": "Ana", "email": "ana@example.com", "role": "admin" }
    })
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["username"] == "validuser" && body["password"] == "correctpw" {
        Json(session_json("A1", "R1")).into_response()
    } else {
        let body = json!({ "message": "Usuario o contraseña incorrectos" });
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

async fn refresh(State(stub): State<Stub>, Json(body): Json<Value>) -> Response {
    stub.refreshes.fetch_add(1, Ordering::SeqCst);
    if stub.refresh_ok.load(Ordering::SeqCst) && body["refreshToken"] == "R1" {
        Json(session_json("A2", "R2")).into_response()
    } else {
        let body = json!({ "message": "refresh revoked" });
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

async fn list_products() -> Json<Value> {
    Json(json!([{
        "_id": "p1",
        "name": "Bujía NGK Iridium",
        "type": "Económico",
        "price": 1299,
        "stock": 100
    }]))
}

/// Only the rotated credential is accepted, so the first attempt always 401s.
async fn delete_product(
    State(stub): State<Stub>,
    Path(_id): Path<String>,
    headers: HeaderMap,
) -> StatusCode {
    stub.deletes.fetch_add(1, Ordering::SeqCst);
    match headers.get("x-token").and_then(|v| v.to_str().ok()) {
        Some("R2") => StatusCode::NO_CONTENT,
        _ => StatusCode::UNAUTHORIZED,
    }
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "late"
}

async fn spawn_stub(stub: Stub) -> String {
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh-token", post(refresh))
        .route("/api/products", get(list_products))
        .route("/api/products/{id}", delete(delete_product))
        .route("/slow", get(slow))
        .with_state(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
}

fn client(base: &str, timeouts: Timeouts) -> (AuthClient<ReqwestTransport>, ApiConfig) {
    let config = ApiConfig::from_base_url(base).unwrap();
    let transport = ReqwestTransport::new(timeouts).unwrap();
    let endpoints = config.auth_endpoints();
    (
        AuthClient::new(transport, SessionStore::in_memory(), endpoints),
        config,
    )
}

// =============================================================================
// scenarios
// =============================================================================

#[tokio::test]
async fn login_then_expired_token_refreshes_and_retries_once() {
    let stub = Stub::new(true);
    let base = spawn_stub(stub.clone()).await;
    let (auth, config) = client(&base, Timeouts::default());

    let credentials = Credentials::username("validuser", "correctpw");
    LoginFlow::new(&auth).submit(&credentials).await.unwrap();
    assert_eq!(auth.access_token().as_deref(), Some("A1"));
    assert_eq!(can_enter_protected(auth.store()), RouteDecision::Allow);

    let products = ProductsApi::new(&auth, &config.products_url);
    let response = products.delete("p1").await.unwrap();
    assert_eq!(response.status, 204);
    assert_eq!(stub.deletes.load(Ordering::SeqCst), 2);
    assert_eq!(stub.refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(auth.access_token().as_deref(), Some("A2"));
    assert_eq!(auth.phase(), SessionPhase::Active);
}

#[tokio::test]
async fn rejected_refresh_returns_original_401_and_logs_out() {
    let stub = Stub::new(false);
    let base = spawn_stub(stub.clone()).await;
    let (auth, config) = client(&base, Timeouts::default());

    let credentials = Credentials::username("validuser", "correctpw");
    LoginFlow::new(&auth).submit(&credentials).await.unwrap();
    let products = ProductsApi::new(&auth, &config.products_url);
    let response = products.delete("p1").await.unwrap();

    assert_eq!(response.status, 401);
    assert_eq!(stub.deletes.load(Ordering::SeqCst), 1);
    assert_eq!(auth.phase(), SessionPhase::LoggedOut);
    assert_eq!(
        can_enter_protected(auth.store()),
        RouteDecision::RedirectToLogin
    );
}

#[tokio::test]
async fn wrong_password_keeps_tab_logged_out() {
    let base = spawn_stub(Stub::new(true)).await;
    let (auth, _) = client(&base, Timeouts::default());

    let err = LoginFlow::new(&auth)
        .submit(&Credentials::username("validuser", "wrongpass"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        LoginError::Rejected {
            status: 401,
            message: "Usuario o contraseña incorrectos".to_owned(),
        }
    );
    assert_eq!(
        can_enter_protected(auth.store()),
        RouteDecision::RedirectToLogin
    );
}

#[tokio::test]
async fn product_list_is_public() {
    let base = spawn_stub(Stub::new(true)).await;
    let (auth, config) = client(&base, Timeouts::default());
    let products = ProductsApi::new(&auth, &config.products_url).list().await;
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].id, "p1");
}

#[tokio::test]
async fn slow_response_times_out() {
    let base = spawn_stub(Stub::new(true)).await;
    let timeouts = Timeouts {
        request_secs: 1,
        connect_secs: 1,
    };
    let (auth, _) = client(&base, timeouts);
    let err = auth
        .transport()
        .send(HttpRequest::new(
            format!("{base}/slow"),
            RequestOptions::default(),
        ))
        .await
        .unwrap_err();
    assert_eq!(err, TransportError::Timeout { secs: 1 });
}
