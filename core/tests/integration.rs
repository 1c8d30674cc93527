//! End-to-end client behaviour against the live FusionSolar emulator.
//!
//! # Design
//! Starts the mock server on a random port, then drives the client over real
//! HTTP through `UreqTransport`. Backoff sleeps are recorded instead of
//! slept so throttling scenarios finish instantly.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use fusionsolar_core::{
    ApiError, ClientConfig, Clock, FusionSolarClient, Params, UreqTransport,
};
use mock_server::{failure, MockState, DEMO_STATION};
use parking_lot::Mutex;

/// Real wall clock whose sleeps return immediately.
#[derive(Default)]
struct RecordingClock {
    sleeps: Mutex<Vec<Duration>>,
}

impl Clock for RecordingClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }
}

type Client = FusionSolarClient<UreqTransport, RecordingClock>;

/// Start the emulator on a random port and return its base URL.
fn start_server(state: MockState) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, state).await
        })
        .unwrap();
    });

    format!("http://{addr}/thirdData")
}

fn client_for(base_url: &str, system_code: &str) -> Client {
    let config = ClientConfig::new("demo", system_code).with_base_url(base_url);
    FusionSolarClient::with_parts(
        config,
        UreqTransport::new(Some(Duration::from_secs(5))),
        RecordingClock::default(),
    )
    .unwrap()
}

#[test]
fn login_cookie_is_echoed_on_later_calls() {
    let state = MockState::default();
    let client = client_for(&start_server(state.clone()), "demo");

    let stations = client.get_station_list().unwrap();

    assert_eq!(stations["data"][0]["stationCode"], DEMO_STATION);
    assert_eq!(state.login_count(), 1);
    let token = client.session_state().token().map(str::to_string);
    assert!(token.is_some());
    assert_eq!(state.calls()[0].token, token);
}

#[test]
fn server_side_expiry_triggers_one_relogin() {
    let state = MockState::default();
    let client = client_for(&start_server(state.clone()), "demo");
    client.login().unwrap();
    let old_token = client.session_state().token().map(str::to_string);

    state.expire_sessions();
    let body = client.get_dev_list(DEMO_STATION).unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(state.login_count(), 2);
    let calls = state.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].token, old_token);
    assert_ne!(calls[1].token, old_token);
}

#[test]
fn scripted_session_error_then_success_logs_in_once() {
    let state = MockState::default();
    let client = client_for(&start_server(state.clone()), "demo");
    client.login().unwrap();

    state.push_response(failure(307, "USER_MUST_RELOGIN"));
    let day = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let body = client.get_station_kpi_day(DEMO_STATION, day).unwrap();

    assert_eq!(body["data"][0]["collectTime"], 1704067200000i64);
    assert_eq!(state.login_count(), 2);
    assert_eq!(state.calls()[1].body["collectTime"], 1704067200000i64);
}

#[test]
fn throttling_backs_off_then_succeeds() {
    let state = MockState::default();
    let client = client_for(&start_server(state.clone()), "demo");

    state.push_response(failure(407, "ACCESS_FREQUENCY_IS_TOO_HIGH"));
    state.push_response(failure(407, "ACCESS_FREQUENCY_IS_TOO_HIGH"));
    let body = client.get_station_kpi_real(DEMO_STATION).unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(state.calls().len(), 3);
    let sleeps = client.clock().sleeps.lock().clone();
    assert_eq!(sleeps.len(), 2);
    assert!((23..=30).contains(&sleeps[0].as_secs()));
    assert!((43..=50).contains(&sleeps[1].as_secs()));
}

#[test]
fn throttling_exhaustion_raises_throttled() {
    let state = MockState::default();
    let client = client_for(&start_server(state.clone()), "demo");
    for _ in 0..=client.max_retry() {
        state.push_response(failure(407, "ACCESS_FREQUENCY_IS_TOO_HIGH"));
    }

    let err = client.execute("getKpiStationDay", Params::new()).unwrap_err();

    assert!(matches!(err, ApiError::Throttled { .. }));
    assert_eq!(state.calls().len(), 7);
    assert_eq!(client.clock().sleeps.lock().len(), 6);
}

#[test]
fn unknown_failure_is_not_retried() {
    let state = MockState::default();
    let client = client_for(&start_server(state.clone()), "demo");
    state.push_response(failure(20010, "DEVICE_NOT_EXIST"));

    let err = client.dev_upgrade("1000", 1).unwrap_err();

    match err {
        ApiError::Operation { fail_code, body } => {
            assert_eq!(fail_code, Some(20010));
            assert_eq!(body["message"], "DEVICE_NOT_EXIST");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(state.calls().len(), 1);
}

#[test]
fn bad_credentials_fail_with_authentication_error() {
    let state = MockState::default();
    let client = client_for(&start_server(state.clone()), "wrong");

    let err = client.get_station_list().unwrap_err();

    assert!(matches!(err, ApiError::Authentication(_)));
    assert!(state.calls().is_empty());
}

#[test]
fn kpi_day_table_over_http() {
    let state = MockState::default();
    let client = client_for(&start_server(state.clone()), "demo");
    let day = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    let table = client.get_kpi_day_table(DEMO_STATION, day).unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.rows[0].collect_time, day);
    assert_eq!(table.column("inverter_power"), [Some(31.2), Some(27.0)]);
    assert_eq!(table.column("radiation_intensity"), [Some(4.1), Some(3.6)]);
}

#[test]
fn scoped_session_and_logout() {
    let state = MockState::default();
    let client = client_for(&start_server(state.clone()), "demo");

    {
        let session = client.session().unwrap();
        session.dev_on_off("1000", 1, fusionsolar_core::ControlType::PowerOff).unwrap();
    }
    assert_eq!(state.active_sessions(), 1);
    assert_eq!(state.calls()[0].body["controlType"], 2);

    client.logout().unwrap();
    assert_eq!(state.active_sessions(), 0);
    assert!(client.session_state().token().is_none());
    client.logout().unwrap();
}

#[test]
fn unreachable_server_is_authentication_error() {
    // Bind then drop to get a port nothing listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let client = client_for(&format!("http://127.0.0.1:{port}/thirdData"), "demo");

    let err = client.get_station_list().unwrap_err();
    assert!(matches!(err, ApiError::Authentication(_)));
}
