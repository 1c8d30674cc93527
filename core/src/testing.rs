//! Deterministic transport and clock for unit tests.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::Value;

use crate::clock::Clock;
use crate::error::{ApiError, Result};
use crate::http::{HttpRequest, HttpResponse, Transport};

/// Replays queued responses in order and records every request it sees.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, response: HttpResponse) -> &Self {
        self.responses.lock().push_back(response);
        self
    }

    pub(crate) fn push_login(&self, token: &str) -> &Self {
        self.push(login_ok(token))
    }

    pub(crate) fn push_envelope(&self, body: Value) -> &Self {
        self.push(envelope(body))
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Last path segment of every request URL, in order.
    pub(crate) fn operations(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|r| r.url.rsplit('/').next().unwrap_or_default().to_string())
            .collect()
    }

    pub(crate) fn login_count(&self) -> usize {
        self.operations().iter().filter(|op| *op == "login").count()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.responses.lock().len()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().push(request.clone());
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| ApiError::Transport("script exhausted".to_string()))
    }
}

pub(crate) fn envelope(body: Value) -> HttpResponse {
    HttpResponse {
        status: 200,
        headers: vec![("content-type".to_string(), "application/json".to_string())],
        body: body.to_string(),
    }
}

pub(crate) fn login_ok(token: &str) -> HttpResponse {
    let mut response = envelope(serde_json::json!({"success": true, "failCode": 0, "data": null}));
    response
        .headers
        .push(("set-cookie".to_string(), format!("XSRF-TOKEN={token}; Path=/; HttpOnly")));
    response
}

/// Clock whose time only moves when told to, or when something sleeps on it.
pub(crate) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub(crate) fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn advance(&self, by: chrono::TimeDelta) {
        *self.now.lock() += by;
    }

    pub(crate) fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
        if let Ok(delta) = chrono::TimeDelta::from_std(duration) {
            self.advance(delta);
        }
    }
}
