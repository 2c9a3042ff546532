//! Shared harness: runs the gateway on an ephemeral port with the
//! in-memory store and a seeded administrator.

#![allow(dead_code, clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::{Value, json};

use dispenser_gateway::app_state::AppState;
use dispenser_gateway::auth::JwtConfig;
use dispenser_gateway::persistence::MemoryStore;

/// Seeded admin username.
pub const ADMIN_USERNAME: &str = "test_user";
/// Seeded admin password.
pub const ADMIN_PASSWORD: &str = "test_password";

/// Lowest bcrypt cost, keeps the suite fast.
const TEST_BCRYPT_COST: u32 = 4;

/// A running gateway plus an HTTP client pointed at it.
#[derive(Debug)]
pub struct TestServer {
    /// Bound address.
    pub addr: SocketAddr,
    /// Shared client.
    pub client: reqwest::Client,
}

impl TestServer {
    /// Starts a fresh gateway with an empty in-memory store.
    pub async fn spawn() -> Self {
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            JwtConfig::new("integration-test-secret", 1),
            TEST_BCRYPT_COST,
        );
        if state
            .auth_service
            .ensure_admin(ADMIN_USERNAME, ADMIN_PASSWORD)
            .await
            .is_err()
        {
            panic!("failed to seed admin");
        }

        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("failed to bind ephemeral port");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("listener has no local address");
        };

        let app = dispenser_gateway::app(state);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            client: reqwest::Client::new(),
        }
    }

    /// Absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Logs in as the seeded admin and returns the access token.
    pub async fn admin_token(&self) -> String {
        let (status, body) = self
            .post_json(
                "/auth/login",
                &json!({"username": ADMIN_USERNAME, "password": ADMIN_PASSWORD}),
                None,
            )
            .await;
        assert_eq!(status, reqwest::StatusCode::OK, "login failed: {body}");
        let Some(token) = body.get("access_token").and_then(Value::as_str) else {
            panic!("login response has no access_token: {body}");
        };
        token.to_string()
    }

    /// Sends a GET and returns status plus parsed JSON body.
    pub async fn get(&self, path: &str, token: Option<&str>) -> (reqwest::StatusCode, Value) {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        send(request).await
    }

    /// Sends a POST without a body.
    pub async fn post(&self, path: &str, token: Option<&str>) -> (reqwest::StatusCode, Value) {
        let mut request = self.client.post(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        send(request).await
    }

    /// Sends a POST with a JSON body.
    pub async fn post_json(
        &self,
        path: &str,
        body: &Value,
        token: Option<&str>,
    ) -> (reqwest::StatusCode, Value) {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        send(request).await
    }

    /// Registers a dispenser as admin and returns its id.
    pub async fn register_dispenser(&self, token: &str, flow_volume: f64, price: f64) -> i64 {
        let (status, body) = self
            .post_json(
                "/api/dispenser",
                &json!({"flow_volume": flow_volume, "price": price}),
                Some(token),
            )
            .await;
        assert_eq!(status, reqwest::StatusCode::CREATED, "register failed: {body}");
        let Some(id) = body.get("id").and_then(Value::as_i64) else {
            panic!("register response has no id: {body}");
        };
        id
    }
}

async fn send(request: reqwest::RequestBuilder) -> (reqwest::StatusCode, Value) {
    let Ok(response) = request.send().await else {
        panic!("request failed to send");
    };
    let status = response.status();
    let Ok(text) = response.text().await else {
        panic!("failed to read response body");
    };
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    (status, body)
}

/// Reads a float field from a JSON object.
pub fn f64_field(body: &Value, key: &str) -> f64 {
    let Some(value) = body.get(key).and_then(Value::as_f64) else {
        panic!("missing numeric field {key} in {body}");
    };
    value
}

/// Approximate float equality.
pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}
