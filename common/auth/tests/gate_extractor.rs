use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{FromRef, State};
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use common_auth::{
    Algorithm, AuthContext, AuthGate, Principal, TokenClass, TokenCodec, TokenPolicy,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

#[derive(Clone)]
struct TestState {
    gate: Arc<AuthGate>,
    hits: Arc<AtomicUsize>,
}

impl FromRef<TestState> for Arc<AuthGate> {
    fn from_ref(state: &TestState) -> Self {
        state.gate.clone()
    }
}

async fn whoami(State(state): State<TestState>, auth: AuthContext) -> Json<Principal> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    Json(auth.into_principal())
}

fn access_policy(secret: &str) -> TokenPolicy {
    TokenPolicy::new(TokenClass::Access, secret, Algorithm::HS256, 60).unwrap()
}

fn app() -> (Router, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let state = TestState {
        gate: Arc::new(AuthGate::new(TokenCodec::default(), access_policy("server-secret"))),
        hits: hits.clone(),
    };
    let router = Router::new().route("/whoami", get(whoami)).with_state(state);
    (router, hits)
}

fn admin() -> Principal {
    Principal {
        id: "0001".to_string(),
        username: "admin".to_string(),
        email: "admin@example.com".to_string(),
    }
}

async fn call(router: &Router, authorization: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().uri("/whoami");
    if let Some(value) = authorization {
        builder = builder.header("authorization", value);
    }
    let resp = router
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn no_header_is_rejected_before_handler() {
    let (router, hits) = app();
    let (status, body) = call(&router, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["msg"], json!("please login first"));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn wrong_secret_token_is_rejected_before_handler() {
    let (router, hits) = app();
    let forged = TokenCodec::default()
        .issue(&admin(), &access_policy("attacker-secret"))
        .unwrap();
    let (status, body) = call(&router, Some(&format!("Bearer {forged}"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["msg"], json!("invalid access token or token expired"));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn valid_token_reaches_handler_with_principal() {
    let (router, hits) = app();
    let token = TokenCodec::default()
        .issue(&admin(), &access_policy("server-secret"))
        .unwrap();
    // bare token, no scheme
    let (status, body) = call(&router, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], json!("admin@example.com"));
    assert_eq!(body["username"], json!("admin"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
