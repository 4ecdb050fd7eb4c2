// In-process stand-in for the Daraja gateway, plus request helpers.
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::State,
    http::{header, HeaderMap, Method, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as base64, Engine as _};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::config::{AppConfig, MpesaEnvironment};
use crate::state::AppState;

pub const TEST_TOKEN: &str = "test-access-token";
const CONSUMER_KEY: &str = "test-key";
const CONSUMER_SECRET: &str = "test-secret";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub enum Reply {
    Accept(Value),
    Reject(StatusCode, Option<Value>),
}

#[derive(Clone)]
struct Gateway {
    token_status: StatusCode,
    reply: Reply,
    recorded: Arc<Mutex<Vec<Recorded>>>,
    token_requests: Arc<AtomicUsize>,
}

pub struct FakeGateway {
    pub base_url: String,
    recorded: Arc<Mutex<Vec<Recorded>>>,
    token_requests: Arc<AtomicUsize>,
}

impl FakeGateway {
    pub async fn start(reply: Reply) -> Self {
        Self::start_with_token_status(StatusCode::OK, reply).await
    }

    pub async fn start_with_token_status(token_status: StatusCode, reply: Reply) -> Self {
        let gateway = Gateway {
            token_status,
            reply,
            recorded: Arc::new(Mutex::new(Vec::new())),
            token_requests: Arc::new(AtomicUsize::new(0)),
        };
        let recorded = gateway.recorded.clone();
        let token_requests = gateway.token_requests.clone();

        let app = Router::new()
            .route("/oauth/v1/generate", get(issue_token))
            .fallback(record_payment)
            .with_state(gateway);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        FakeGateway {
            base_url: format!("http://{}", addr),
            recorded,
            token_requests,
        }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn token_requests(&self) -> usize {
        self.token_requests.load(Ordering::SeqCst)
    }
}

async fn issue_token(State(gateway): State<Gateway>, headers: HeaderMap) -> Response {
    gateway.token_requests.fetch_add(1, Ordering::SeqCst);

    let expected = format!("Basic {}", base64.encode(format!("{}:{}", CONSUMER_KEY, CONSUMER_SECRET)));
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if gateway.token_status != StatusCode::OK || presented != Some(expected.as_str()) {
        let status = if gateway.token_status == StatusCode::OK {
            StatusCode::UNAUTHORIZED
        } else {
            gateway.token_status
        };
        return (status, Json(json!({"errorMessage": "Invalid Authentication passed"}))).into_response();
    }

    Json(json!({"access_token": TEST_TOKEN, "expires_in": "3599"})).into_response()
}

async fn record_payment(
    State(gateway): State<Gateway>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    gateway.recorded.lock().unwrap().push(Recorded {
        path: uri.path().to_string(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    match gateway.reply {
        Reply::Accept(body) => (StatusCode::OK, Json(body)).into_response(),
        Reply::Reject(status, Some(body)) => (status, Json(body)).into_response(),
        Reply::Reject(status, None) => status.into_response(),
    }
}

pub fn test_config(base_url: &str) -> AppConfig {
    AppConfig {
        mpesa_consumer_key: CONSUMER_KEY.to_string(),
        mpesa_consumer_secret: CONSUMER_SECRET.to_string(),
        mpesa_short_code: "174379".to_string(),
        mpesa_passkey: "test-passkey".to_string(),
        mpesa_initiator_name: "testapi".to_string(),
        mpesa_security_credential: "test-credential".to_string(),
        mpesa_environment: MpesaEnvironment::Sandbox,
        base_url: base_url.to_string(),
        callback_url: "https://relay.example.com/callback".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
    }
}

pub fn test_state(base_url: &str) -> AppState {
    AppState::new(test_config(base_url)).unwrap()
}

async fn into_parts(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub async fn send_json(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    into_parts(app.oneshot(request).await.unwrap()).await
}

pub async fn send_raw(
    app: Router,
    uri: &str,
    content_type: Option<&str>,
    body: &str,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(Method::POST).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    into_parts(app.oneshot(request).await.unwrap()).await
}
