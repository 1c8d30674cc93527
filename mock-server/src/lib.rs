//! In-process emulator of the FusionSolar northbound API.
//!
//! Implements just enough of the vendor's behaviour to drive a client end to
//! end: `login` issues an `XSRF-TOKEN` cookie, other operations require the
//! token as a request header and answer 305 without it, and tests can queue
//! arbitrary envelopes (407, 306, ...) ahead of the canned answers.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header::SET_COOKIE, HeaderMap},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{debug, info};
use uuid::Uuid;

pub const TOKEN_COOKIE: &str = "XSRF-TOKEN";

/// failCode the emulator uses for rejected credentials.
pub const BAD_CREDENTIALS: i64 = 20001;

pub const DEMO_STATION: &str = "NE=33554875";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_name: String,
    pub system_code: String,
}

/// One non-login request as the emulator saw it.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub operation: String,
    pub token: Option<String>,
    pub body: Value,
}

struct Inner {
    user_name: String,
    system_code: String,
    tokens: HashSet<String>,
    logins: usize,
    calls: Vec<RecordedCall>,
    scripted: VecDeque<Value>,
}

/// Shared emulator state. Clones observe and control the same server.
#[derive(Clone)]
pub struct MockState {
    inner: Arc<Mutex<Inner>>,
}

impl MockState {
    pub fn new(user_name: &str, system_code: &str) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                user_name: user_name.to_string(),
                system_code: system_code.to_string(),
                tokens: HashSet::new(),
                logins: 0,
                calls: Vec::new(),
                scripted: VecDeque::new(),
            })),
        }
    }

    /// Answer the next operation call with `envelope`, skipping the token check.
    pub fn push_response(&self, envelope: Value) {
        self.inner.lock().scripted.push_back(envelope);
    }

    /// Forget every issued token, as if the server-side sessions timed out.
    pub fn expire_sessions(&self) {
        self.inner.lock().tokens.clear();
    }

    /// Successful logins so far.
    pub fn login_count(&self) -> usize {
        self.inner.lock().logins
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.inner.lock().calls.clone()
    }

    pub fn active_sessions(&self) -> usize {
        self.inner.lock().tokens.len()
    }

    fn login(&self, request: &LoginRequest) -> Option<String> {
        let mut inner = self.inner.lock();
        if request.user_name != inner.user_name || request.system_code != inner.system_code {
            return None;
        }
        let token = Uuid::new_v4().simple().to_string();
        inner.tokens.insert(token.clone());
        inner.logins += 1;
        Some(token)
    }

    fn logout(&self, token: Option<&str>) {
        if let Some(token) = token {
            self.inner.lock().tokens.remove(token);
        }
    }

    fn call(&self, operation: &str, token: Option<String>, body: Value) -> Value {
        let mut inner = self.inner.lock();
        inner.calls.push(RecordedCall {
            operation: operation.to_string(),
            token: token.clone(),
            body: body.clone(),
        });

        if let Some(scripted) = inner.scripted.pop_front() {
            return scripted;
        }
        let authorized = token.is_some_and(|t| inner.tokens.contains(&t));
        if !authorized {
            return failure(305, "USER_MUST_RELOGIN");
        }
        canned(operation, &body)
    }
}

impl Default for MockState {
    fn default() -> Self {
        Self::new("demo", "demo")
    }
}

pub fn app(state: MockState) -> Router {
    Router::new()
        .route("/thirdData/login", post(login))
        .route("/thirdData/logout", post(logout))
        .route("/thirdData/{operation}", post(operation))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, app(state)).await
}

pub fn failure(code: i64, message: &str) -> Value {
    json!({"success": false, "failCode": code, "message": message, "data": null})
}

fn success(data: Value) -> Value {
    json!({"success": true, "failCode": 0, "message": null, "data": data})
}

fn canned(operation: &str, params: &Value) -> Value {
    match operation {
        "getStationList" => success(json!([{
            "stationCode": DEMO_STATION,
            "stationName": "Demo plant",
            "capacity": 9.9,
            "stationAddr": "Brno"
        }])),
        "getKpiStationDay" => {
            let start = params["collectTime"].as_i64().unwrap_or_default();
            let day = 86_400_000i64;
            success(json!([
                {
                    "collectTime": start,
                    "stationCode": params["stationCodes"],
                    "dataItemMap": {"inverter_power": 31.2, "radiation_intensity": "4.1", "theory_power": null}
                },
                {
                    "collectTime": start + day,
                    "stationCode": params["stationCodes"],
                    "dataItemMap": {"inverter_power": 27.0, "radiation_intensity": "3.6", "theory_power": null}
                }
            ]))
        }
        _ => success(json!([])),
    }
}

fn token_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get(TOKEN_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn login(State(state): State<MockState>, Json(request): Json<LoginRequest>) -> Response {
    match state.login(&request) {
        Some(token) => {
            info!(user = %request.user_name, "login accepted");
            let cookie = format!("{TOKEN_COOKIE}={token}; Path=/; HttpOnly");
            ([(SET_COOKIE, cookie)], Json(success(Value::Null))).into_response()
        }
        None => {
            info!(user = %request.user_name, "login rejected");
            Json(failure(BAD_CREDENTIALS, "user name or system code is incorrect")).into_response()
        }
    }
}

async fn logout(State(state): State<MockState>, headers: HeaderMap) -> Json<Value> {
    state.logout(token_of(&headers).as_deref());
    Json(success(Value::Null))
}

async fn operation(
    State(state): State<MockState>,
    Path(operation): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    debug!(%operation, "call");
    Json(state.call(&operation, token_of(&headers), body))
}
