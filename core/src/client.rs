//! Session-aware request dispatcher for the FusionSolar northbound API.
//!
//! # Design
//! `execute` is the single path every endpoint goes through:
//!
//! 1. Guard: log in if the cached session has expired.
//! 2. POST `{base_url}/{operation}` with the token attached.
//! 3. Validate the envelope and branch on the failure kind. Throttling gets
//!    a bounded linear backoff loop; an invalid session gets exactly one
//!    re-login and one retry; anything else is returned untouched.
//!
//! When the throttle loop gives up it reports the first 407. The session
//! retry reports whatever the retry produced, including a 407.

use std::ops::Deref;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::clock::{throttle_delay, Clock, SystemClock};
use crate::config::ClientConfig;
use crate::envelope;
use crate::error::{ApiError, Result};
use crate::http::{HttpRequest, Transport, UreqTransport};
use crate::session::{authorize, Session, SessionManager};

/// Flat JSON object sent as the body of an operation.
pub type Params = Map<String, Value>;

/// Blocking FusionSolar client.
///
/// Safe to share between threads; the session is refreshed under a lock.
pub struct FusionSolarClient<T = UreqTransport, C = SystemClock> {
    base_url: String,
    max_retry: u32,
    session: SessionManager,
    transport: T,
    clock: C,
}

impl FusionSolarClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = UreqTransport::new(config.timeout);
        Self::with_parts(config, transport, SystemClock)
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }
}

impl<T: Transport, C: Clock> FusionSolarClient<T, C> {
    /// Build a client around a custom transport and clock.
    ///
    /// The transport owns its own timeout, so `config.timeout` is not
    /// consulted here; it only configures the transport built by `new`.
    pub fn with_parts(config: ClientConfig, transport: T, clock: C) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            session: SessionManager::new(config.credentials, &config.base_url),
            base_url: config.base_url,
            max_retry: config.max_retry,
            transport,
            clock,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn max_retry(&self) -> u32 {
        self.max_retry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Copy of the current session state.
    pub fn session_state(&self) -> Session {
        self.session.snapshot()
    }

    /// Authenticate now, replacing any existing session.
    pub fn login(&self) -> Result<()> {
        self.session.login(&self.transport, &self.clock)
    }

    /// End the server-side session. A no-op when not logged in.
    pub fn logout(&self) -> Result<()> {
        self.session.logout(&self.transport)
    }

    /// Log in and hand back a guard for use within a lexical scope.
    ///
    /// Dropping the guard does not log out.
    pub fn session(&self) -> Result<ActiveSession<'_, T, C>> {
        self.login()?;
        Ok(ActiveSession { client: self })
    }

    /// Run one named operation and return the decoded response envelope.
    pub fn execute(&self, operation: &str, params: Params) -> Result<Value> {
        if operation.is_empty() {
            return Err(ApiError::InvalidRequest("operation name is empty".to_string()));
        }

        match self.attempt(operation, &params) {
            Err(throttled @ ApiError::Throttled { .. }) => {
                self.retry_throttled(operation, &params, throttled)
            }
            Err(ApiError::SessionInvalid { code, .. }) => {
                debug!(operation, code, "session rejected, logging back in and retrying");
                self.login()?;
                self.attempt(operation, &params)
            }
            result => result,
        }
    }

    /// POST `{base_url}/{operation}` with `params` as body and the token attached.
    pub fn build_operation(
        &self,
        operation: &str,
        params: &Params,
        token: Option<&str>,
    ) -> Result<HttpRequest> {
        let request = HttpRequest::json_post(format!("{}/{operation}", self.base_url), params)?;
        Ok(match token {
            Some(token) => authorize(request, token),
            None => request,
        })
    }

    /// Guarded single call: refresh an expired session, send, validate.
    fn attempt(&self, operation: &str, params: &Params) -> Result<Value> {
        self.session.ensure_fresh(&self.transport, &self.clock)?;

        let token = self.session.token();
        let request = self.build_operation(operation, params, token.as_deref())?;
        let response = self.transport.send(&request)?;
        envelope::validate(&response)
    }

    fn retry_throttled(&self, operation: &str, params: &Params, original: ApiError) -> Result<Value> {
        for attempt in 1..=self.max_retry {
            let delay = throttle_delay(attempt);
            info!(
                operation,
                attempt,
                delay_secs = delay.as_secs(),
                "throttled (407), sleeping before retry"
            );
            self.clock.sleep(delay);

            match self.attempt(operation, params) {
                Err(ApiError::Throttled { .. }) => continue,
                result => return result,
            }
        }

        warn!(operation, retries = self.max_retry, "still throttled, giving up");
        Err(original)
    }
}

/// Logged-in client borrowed for a scope. Dropping it performs no teardown.
pub struct ActiveSession<'a, T, C> {
    client: &'a FusionSolarClient<T, C>,
}

impl<T, C> Deref for ActiveSession<'_, T, C> {
    type Target = FusionSolarClient<T, C>;

    fn deref(&self) -> &Self::Target {
        self.client
    }
}
