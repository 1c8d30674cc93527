//! Client construction parameters.

use std::fmt;
use std::time::Duration;

use tracing::info;

use crate::error::{ApiError, Result};

/// Vendor's EU data-center endpoint.
pub const DEFAULT_BASE_URL: &str = "https://eu5.fusionsolar.huawei.com/thirdData";

pub const DEFAULT_MAX_RETRY: u32 = 6;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Northbound API account credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_name: String,
    pub system_code: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_name", &self.user_name)
            .field("system_code", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credentials: Credentials,
    pub base_url: String,
    /// Throttle retries after the first attempt.
    pub max_retry: u32,
    /// Whole-request timeout applied by the transport. `None` disables it.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(user_name: impl Into<String>, system_code: impl Into<String>) -> Self {
        Self {
            credentials: Credentials {
                user_name: user_name.into(),
                system_code: system_code.into(),
            },
            base_url: DEFAULT_BASE_URL.to_string(),
            max_retry: DEFAULT_MAX_RETRY,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    /// Build a config from `FUSIONSOLAR_USER` and `FUSIONSOLAR_SYSTEM_CODE`,
    /// with optional `FUSIONSOLAR_BASE_URL` and `FUSIONSOLAR_MAX_RETRY`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let user_name = lookup("FUSIONSOLAR_USER").ok_or_else(|| {
            ApiError::Config("FUSIONSOLAR_USER environment variable not set".to_string())
        })?;
        let system_code = lookup("FUSIONSOLAR_SYSTEM_CODE").ok_or_else(|| {
            ApiError::Config("FUSIONSOLAR_SYSTEM_CODE environment variable not set".to_string())
        })?;

        let mut config = Self::new(user_name, system_code);
        if let Some(base_url) = lookup("FUSIONSOLAR_BASE_URL") {
            config = config.with_base_url(&base_url);
        }
        if let Some(raw) = lookup("FUSIONSOLAR_MAX_RETRY") {
            let max_retry = raw.parse().map_err(|_| {
                ApiError::Config(format!("FUSIONSOLAR_MAX_RETRY is not a number: {raw}"))
            })?;
            config = config.with_max_retry(max_retry);
        }

        info!(base_url = %config.base_url, "FusionSolar config loaded from environment");
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.credentials.user_name.is_empty() {
            return Err(ApiError::Config("user name is empty".to_string()));
        }
        if self.credentials.system_code.is_empty() {
            return Err(ApiError::Config("system code is empty".to_string()));
        }
        if self.base_url.is_empty() {
            return Err(ApiError::Config("base URL is empty".to_string()));
        }
        Ok(())
    }
}
