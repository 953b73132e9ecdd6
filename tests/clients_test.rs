use pagespeed_monitor::clients::{PageSpeedClient, SheetsClient};
use pagespeed_monitor::config::{Config, SinkBackend};
use pagespeed_monitor::error::{ProbeError, SinkError};
use pagespeed_monitor::models::{DeviceProfile, MetricPair, MetricSet};
use pagespeed_monitor::services::{MetricProbe, PageSpeedProbe, ResultSink, SheetsSink};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pagespeed_config(server: &MockServer) -> Config {
    Config {
        pagespeed_api_base_url: server.uri(),
        pagespeed_api_key: Some("test-key".into()),
        ..Config::default()
    }
}

fn sheets_config(server: &MockServer) -> Config {
    Config {
        sink_backend: SinkBackend::Sheets,
        sheets_api_base_url: server.uri(),
        sheets_spreadsheet_id: "sheet123".into(),
        sheets_access_token: "token".into(),
        ..Config::default()
    }
}

fn probe(server: &MockServer) -> PageSpeedProbe {
    PageSpeedProbe::new(PageSpeedClient::new(&pagespeed_config(server)).unwrap())
}

#[tokio::test]
async fn test_pagespeed_probe_reads_three_metrics() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/runPagespeed"))
        .and(query_param("url", "https://a.com"))
        .and(query_param("strategy", "desktop"))
        .and(query_param("category", "performance"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lighthouseResult": {
                "categories": {"performance": {"score": 0.95}},
                "audits": {
                    "first-contentful-paint": {"numericValue": 1200.0},
                    "speed-index": {"numericValue": 2100.0}
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let metrics = probe(&server)
        .probe("a.com", DeviceProfile::Desktop, &CancellationToken::new())
        .await
        .expect("probe ok");

    assert_eq!(
        metrics,
        MetricSet {
            performance: 95,
            first_contentful_paint: 1.2,
            speed_index: 2.1,
        }
    );
}

#[tokio::test]
async fn test_pagespeed_error_body_is_a_probe_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/runPagespeed"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"code": 429, "message": "Quota exceeded"}
        })))
        .mount(&server)
        .await;

    let err = probe(&server)
        .probe("a.com", DeviceProfile::Mobile, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        ProbeError::Api { code, message, .. } => {
            assert_eq!(code, Some(429));
            assert_eq!(message, "Quota exceeded");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_pagespeed_non_json_failure_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/runPagespeed"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = probe(&server)
        .probe("a.com", DeviceProfile::Mobile, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ProbeError::HttpStatus { status: 502, .. }));
}

#[tokio::test]
async fn test_cancelled_probe_returns_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/runPagespeed"))
        .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(30)))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = probe(&server)
        .probe("a.com", DeviceProfile::Mobile, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ProbeError::Cancelled { .. }));
}

#[tokio::test]
async fn test_sheets_lists_tabs_in_sheet_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/spreadsheets/sheet123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sheets": [
                {"properties": {"sheetId": 2, "title": "b.com", "index": 1}},
                {"properties": {"sheetId": 1, "title": "a.com", "index": 0}}
            ]
        })))
        .mount(&server)
        .await;

    let sink = SheetsSink::new(SheetsClient::new(&sheets_config(&server)).unwrap());
    let domains = sink.list_domains().await.expect("list ok");
    assert_eq!(domains, vec!["a.com".to_string(), "b.com".to_string()]);
}

#[tokio::test]
async fn test_sheets_unreachable_is_source_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/spreadsheets/sheet123"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let sink = SheetsSink::new(SheetsClient::new(&sheets_config(&server)).unwrap());
    let err = sink.list_domains().await.unwrap_err();
    assert!(matches!(err, SinkError::SourceUnavailable { .. }));
}

#[tokio::test]
async fn test_sheets_write_bootstraps_empty_tab() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/spreadsheets/sheet123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sheets": [{"properties": {"sheetId": 7, "title": "a.com", "index": 0}}]
        })))
        .mount(&server)
        .await;
    // 空表头
    Mock::given(method("GET"))
        .and(path_regex(r"^/spreadsheets/sheet123/values/.+"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    // 行标签、日期表头、6 个数值
    Mock::given(method("PUT"))
        .and(path_regex(r"^/spreadsheets/sheet123/values/.+"))
        .and(query_param("valueInputOption", "RAW"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/spreadsheets/sheet123:batchUpdate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let set = MetricSet {
        performance: 95,
        first_contentful_paint: 1.2,
        speed_index: 2.1,
    };
    let sink = SheetsSink::new(SheetsClient::new(&sheets_config(&server)).unwrap());
    sink.write_result("a.com", &MetricPair { mobile: set, desktop: set }, "2024-05-01")
        .await
        .expect("write ok");
}

#[tokio::test]
async fn test_sheets_write_to_missing_tab_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/spreadsheets/sheet123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sheets": []})))
        .mount(&server)
        .await;

    let set = MetricSet {
        performance: 50,
        first_contentful_paint: 3.0,
        speed_index: 6.0,
    };
    let sink = SheetsSink::new(SheetsClient::new(&sheets_config(&server)).unwrap());
    let err = sink
        .write_result("gone.com", &MetricPair { mobile: set, desktop: set }, "2024-05-01")
        .await
        .unwrap_err();
    assert!(matches!(err, SinkError::TabNotFound { .. }));
}

#[tokio::test]
async fn test_sheets_stalled_response_hits_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/spreadsheets/sheet123"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"sheets": []}))
                .set_delay(std::time::Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = Config {
        sheets_request_timeout_secs: 1,
        ..sheets_config(&server)
    };
    let sink = SheetsSink::new(SheetsClient::new(&config).unwrap());

    let started = std::time::Instant::now();
    let err = sink.list_domains().await.unwrap_err();
    assert!(matches!(err, SinkError::SourceUnavailable { .. }));
    assert!(started.elapsed() < std::time::Duration::from_secs(4));
}
