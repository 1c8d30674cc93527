//! Session state and the login/logout exchange.
//!
//! # Design
//! `SessionManager` owns the credentials and a mutex-guarded `Session`. The
//! expiry check and the refresh run under a single lock acquisition, so
//! callers sharing one client never race each other into duplicate logins
//! for the same expiry. Login is never retried here; retry policy belongs to
//! the dispatcher.

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::Credentials;
use crate::envelope;
use crate::error::{ApiError, Result};
use crate::http::{HttpRequest, Transport};

/// Name of both the session cookie and the request header that echoes it.
pub const TOKEN_COOKIE: &str = "XSRF-TOKEN";

/// How long a token is trusted after login without asking the server.
pub const VALIDITY_WINDOW_SECS: i64 = 20 * 60;

/// Authenticated state of one client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// A session that was never established counts as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |at| at <= now)
    }

    fn invalidate(&mut self) {
        self.token = None;
        self.expires_at = None;
    }

    fn establish(&mut self, token: String, now: DateTime<Utc>) {
        self.token = Some(token);
        self.expires_at = Some(now + TimeDelta::seconds(VALIDITY_WINDOW_SECS));
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginBody<'a> {
    user_name: &'a str,
    system_code: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LogoutBody<'a> {
    xsrf_token: &'a str,
}

#[derive(Debug)]
pub struct SessionManager {
    credentials: Credentials,
    base_url: String,
    state: Mutex<Session>,
}

impl SessionManager {
    pub fn new(credentials: Credentials, base_url: &str) -> Self {
        Self {
            credentials,
            base_url: base_url.to_string(),
            state: Mutex::new(Session::default()),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.state.lock().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.lock().token.clone()
    }

    pub fn build_login(&self) -> Result<HttpRequest> {
        HttpRequest::json_post(
            format!("{}/login", self.base_url),
            &LoginBody {
                user_name: &self.credentials.user_name,
                system_code: &self.credentials.system_code,
            },
        )
    }

    /// Drop the current session and authenticate from scratch.
    pub fn login(&self, transport: &dyn Transport, clock: &dyn Clock) -> Result<()> {
        let mut session = self.state.lock();
        self.login_locked(&mut session, transport, clock)
    }

    /// Log in if the stored expiry is at or before `clock.now()`.
    ///
    /// Returns whether a login happened.
    pub fn ensure_fresh(&self, transport: &dyn Transport, clock: &dyn Clock) -> Result<bool> {
        let mut session = self.state.lock();
        if !session.is_expired(clock.now()) {
            return Ok(false);
        }
        debug!(expires_at = ?session.expires_at, "session expired, logging in");
        self.login_locked(&mut session, transport, clock)?;
        Ok(true)
    }

    /// End the server-side session if one is held.
    ///
    /// The local session is cleared whatever the server answers. Without a
    /// token this does nothing.
    pub fn logout(&self, transport: &dyn Transport) -> Result<()> {
        let mut session = self.state.lock();
        let Some(token) = session.token.take() else {
            return Ok(());
        };
        session.invalidate();

        let request = HttpRequest::json_post(
            format!("{}/logout", self.base_url),
            &LogoutBody { xsrf_token: &token },
        )?;
        let request = authorize(request, &token);
        let response = transport.send(&request)?;
        if let Err(e) = envelope::validate(&response) {
            warn!(error = %e, "logout rejected by server");
            return Err(e);
        }
        info!(user = %self.credentials.user_name, "logged out");
        Ok(())
    }

    fn login_locked(
        &self,
        session: &mut Session,
        transport: &dyn Transport,
        clock: &dyn Clock,
    ) -> Result<()> {
        session.invalidate();

        let request = self.build_login()?;
        let response = transport
            .send(&request)
            .map_err(|e| ApiError::Authentication(e.to_string()))?;
        envelope::validate(&response).map_err(|e| ApiError::Authentication(e.to_string()))?;

        let token = response
            .cookie(TOKEN_COOKIE)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                ApiError::Authentication(format!("login response carried no {TOKEN_COOKIE} cookie"))
            })?;

        session.establish(token.to_string(), clock.now());
        info!(
            user = %self.credentials.user_name,
            expires_at = ?session.expires_at,
            "logged in to FusionSolar"
        );
        Ok(())
    }
}

/// Attach the session token the way the server expects it back.
pub fn authorize(request: HttpRequest, token: &str) -> HttpRequest {
    request
        .with_header(TOKEN_COOKIE, token)
        .with_header("cookie", format!("{TOKEN_COOKIE}={token}"))
}
