//! Blocking client for the FusionSolar northbound ("thirdData") API.
//!
//! # Overview
//! Every endpoint is a JSON POST to `{base_url}/{operation}` that answers
//! with a `{ success, failCode, data }` envelope. The client owns the login
//! session, re-authenticates when the cached token is stale or rejected, and
//! backs off when the vendor throttles.
//!
//! # Design
//! - `FusionSolarClient::execute` is the only network path; the named
//!   endpoints in `endpoints` just shape parameters for it.
//! - Session state lives behind a mutex inside `SessionManager`, so one
//!   client can be shared between threads.
//! - HTTP and time go through the `Transport` and `Clock` traits, which keeps
//!   retry and expiry behaviour testable without a network or real sleeps.
//!
//! ```no_run
//! use chrono::Utc;
//! use fusionsolar_core::{ClientConfig, FusionSolarClient};
//!
//! let client = FusionSolarClient::new(ClientConfig::new("api-user", "system-code"))?;
//! let session = client.session()?;
//! let stations = session.get_station_list()?;
//! let table = session.get_kpi_day_table("NE=33554875", Utc::now())?;
//! println!("{stations} / {} rows", table.len());
//! # Ok::<(), fusionsolar_core::ApiError>(())
//! ```

pub mod client;
pub mod clock;
pub mod config;
pub mod endpoints;
pub mod envelope;
pub mod error;
pub mod http;
pub mod session;
pub mod table;

#[cfg(test)]
mod testing;

pub use client::{ActiveSession, FusionSolarClient, Params};
pub use clock::{Clock, SystemClock};
pub use config::{ClientConfig, Credentials, DEFAULT_BASE_URL};
pub use endpoints::{epoch_millis, ControlType};
pub use envelope::{classify, validate, FailureKind};
pub use error::{ApiError, Result};
pub use http::{HttpRequest, HttpResponse, Transport, UreqTransport};
pub use session::{Session, SessionManager};
pub use table::{KpiRow, KpiTable};
