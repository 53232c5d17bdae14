//! End-to-end discovery and sync against a mock Rescue API.

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rescue_tap_state::{JsonStateBackend, StateBackend};
use rescue_tap_types::error::ErrorCategory;
use tap_logmeinrescue::client::RescueClient;
use tap_logmeinrescue::config::Config;
use tap_logmeinrescue::discovery::{discover, write_catalog};
use tap_logmeinrescue::emitter::SingerEmitter;
use tap_logmeinrescue::report::SyncWindow;
use tap_logmeinrescue::selection::resolve_plan;
use tap_logmeinrescue::streams::StreamRegistry;
use tap_logmeinrescue::sync::SyncContext;
use tap_logmeinrescue::TapError;

const HIERARCHY: &str = "OK\n\
NodeID\tName\tNickname\tEmail\tType\tStatus\tDescription\tParentID\n\
7\tSupport\t\t\tTechnicianGroup\t\t\t\n\
101\tAda\tada\tada@example.com\tTechnician\tOnline\t\t7\n\
102\tBob\t\tbob@example.com\tTechnician\tOffline\t\t7\n";

fn config(server: &MockServer) -> Config {
    Config::from_value(json!({
        "username": "ops@example.com",
        "password": "secret",
        "start_date": "2024-01-01",
        "base_url": format!("{}/API", server.uri()),
    }))
    .unwrap()
}

fn window() -> SyncWindow {
    SyncWindow::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
    )
}

async fn ok(server: &MockServer, endpoint: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/API/{endpoint}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Rescue API with two technicians; only 102 has custom-field rows.
async fn rescue_api() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/API/requestAuthCode.aspx"))
        .and(query_param("email", "ops@example.com"))
        .and(query_param("pwd", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK\nAUTHCODE:abc123\n"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/API/getHierarchy_v2.aspx"))
        .and(query_param("authcode", "abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string(HIERARCHY))
        .mount(&server)
        .await;

    ok(&server, "setReportArea.aspx", "OK").await;
    ok(&server, "setReportDate_v2.aspx", "OK").await;
    ok(&server, "setOutput.aspx", "OK").await;

    Mock::given(method("GET"))
        .and(path("/API/getReport_v2.aspx"))
        .and(query_param("node", "101"))
        .respond_with(ResponseTemplate::new(200).set_body_string("NODATA\n"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/API/getReport_v2.aspx"))
        .and(query_param("node", "102"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("OK\nfield_1\tfield_2\r\nx\ty\r\n"),
        )
        .mount(&server)
        .await;

    server
}

#[tokio::test]
async fn discovery_infers_custom_fields_from_first_non_empty_report() {
    let server = rescue_api().await;
    let client = RescueClient::new(&config(&server)).unwrap();

    let catalog = discover(&client, &StreamRegistry::default(), window())
        .await
        .unwrap();

    let mut out = Vec::new();
    write_catalog(&catalog, &mut out).unwrap();
    let json: Value = serde_json::from_slice(&out).unwrap();

    let streams = json["streams"].as_array().unwrap();
    assert_eq!(streams.len(), 2);
    assert_eq!(streams[0]["stream"], "technicians");
    assert_eq!(streams[0]["key_properties"], json!(["id"]));
    assert_eq!(streams[1]["stream"], "technician_custom_fields");

    let fields: Vec<&str> = catalog.streams[1]
        .schema
        .properties
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(fields, vec!["technician_id", "field_1", "field_2"]);

    let text = String::from_utf8(out).unwrap();
    let pos = |needle: &str| text.find(needle).unwrap();
    assert!(pos("\"technician_id\"") < pos("\"field_1\"") && pos("\"field_1\"") < pos("\"field_2\""));
    assert_eq!(
        streams[1]["schema"]["properties"]["field_2"]["type"],
        json!(["null", "string"])
    );
}

#[tokio::test]
async fn sync_emits_both_streams_and_commits_bookmark() {
    let server = rescue_api().await;
    let client = RescueClient::new(&config(&server)).unwrap();
    let registry = StreamRegistry::default();

    let mut catalog = discover(&client, &registry, window()).await.unwrap();
    for entry in &mut catalog.streams {
        entry.schema.selected = Some(true);
    }
    let plan = resolve_plan(&catalog, &registry).unwrap();

    let mut state = JsonStateBackend::in_memory();
    let mut emitter = SingerEmitter::new(Vec::new());
    let summary = SyncContext {
        client: &client,
        state: &mut state,
        emitter: &mut emitter,
        start_date: window().start,
        run_started_at: window().end,
    }
    .run(&plan)
    .await
    .unwrap();

    assert_eq!(summary.records["technicians"], 2);
    assert_eq!(summary.records["technician_custom_fields"], 1);

    let messages: Vec<Value> = String::from_utf8(emitter.into_inner())
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    let technicians: Vec<&Value> = messages
        .iter()
        .filter(|m| m["type"] == "RECORD" && m["stream"] == "technicians")
        .collect();
    assert_eq!(technicians[0]["record"]["id"], 101);
    assert_eq!(technicians[0]["record"]["parent_id"], 7);
    assert_eq!(technicians[1]["record"]["nickname"], Value::Null);

    let custom = messages
        .iter()
        .find(|m| m["type"] == "RECORD" && m["stream"] == "technician_custom_fields")
        .unwrap();
    assert_eq!(
        custom["record"],
        json!({"field_1": "x", "field_2": "y", "technician_id": 102})
    );

    let last = messages.last().unwrap();
    assert_eq!(last["type"], "STATE");
    assert_eq!(
        last["value"]["bookmarks"]["technician_custom_fields"]["last_synced_until"],
        "2024-06-01T00:00:00Z"
    );
    assert!(state.snapshot().currently_syncing.is_none());
}

#[tokio::test]
async fn rejected_login_is_an_auth_error() {
    let server = MockServer::start().await;
    ok(&server, "requestAuthCode.aspx", "INVALID\n").await;
    let client = RescueClient::new(&config(&server)).unwrap();

    let err = discover(&client, &StreamRegistry::default(), window())
        .await
        .unwrap_err();

    match err {
        TapError::Connector(e) => {
            assert_eq!(e.category, ErrorCategory::Auth);
            assert_eq!(e.code, "INVALID");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn server_error_carries_status() {
    let server = MockServer::start().await;
    ok(&server, "requestAuthCode.aspx", "OK\nAUTHCODE:abc123\n").await;
    Mock::given(method("GET"))
        .and(path("/API/getHierarchy_v2.aspx"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let client = RescueClient::new(&config(&server)).unwrap();

    let err = discover(&client, &StreamRegistry::default(), window())
        .await
        .unwrap_err();

    match err {
        TapError::Connector(e) => {
            assert_eq!(e.category, ErrorCategory::TransientNetwork);
            assert_eq!(e.status, Some(503));
            assert!(e.retryable);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn every_technician_without_reports_fails_discovery() {
    let server = MockServer::start().await;
    ok(&server, "requestAuthCode.aspx", "OK\nAUTHCODE:abc123\n").await;
    ok(&server, "getHierarchy_v2.aspx", HIERARCHY).await;
    ok(&server, "setReportArea.aspx", "OK").await;
    ok(&server, "setReportDate_v2.aspx", "OK").await;
    ok(&server, "setOutput.aspx", "OK").await;
    ok(&server, "getReport_v2.aspx", "OK\nfield_1\n").await;
    let client = RescueClient::new(&config(&server)).unwrap();

    let err = discover(&client, &StreamRegistry::default(), window())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TapError::NoSample { ref stream, attempted: 2 } if stream == "technician_custom_fields"
    ));
}
