//! Integration tests using wiremock to simulate HTTP servers.

use chrono::{DateTime, TimeZone, Utc};
use outbound::format::PlainFormatter;
use outbound::{Error, Event, EventSink, Flag, Request};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct TestObject {
    id: u32,
    name: String,
    timestamp_utc: DateTime<Utc>,
    value: f64,
}

fn test_object() -> TestObject {
    TestObject {
        id: 7,
        name: "Test Object 7".to_string(),
        timestamp_utc: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap()
            + chrono::Duration::milliseconds(250),
        value: 1.5,
    }
}

struct Unencodable;

impl Serialize for Unencodable {
    fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("cannot encode"))
    }
}

#[derive(Default)]
struct RecordingSink {
    only: Option<Flag>,
    records: Mutex<Vec<(Flag, String, serde_json::Value)>>,
}

impl RecordingSink {
    fn records(&self) -> Vec<(Flag, String, serde_json::Value)> {
        self.records.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn enabled(&self, flag: &Flag) -> bool {
        self.only.is_none_or(|only| only == *flag)
    }

    fn handle(&self, event: &dyn Event) -> outbound::Result<()> {
        let text = event.text(&PlainFormatter)?;
        let json = event.to_json()?;
        self.records.lock().unwrap().push((event.flag(), text, json));
        Ok(())
    }
}

async fn echo_server() -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/echo"))
        .respond_with(|req: &wiremock::Request| {
            ResponseTemplate::new(200).set_body_bytes(req.body.clone())
        })
        .mount(&mock_server)
        .await;
    mock_server
}

#[tokio::test]
async fn test_get_json_with_meta() {
    let mock_server = MockServer::start().await;
    let expected = test_object();

    Mock::given(method("GET"))
        .and(path("/objects/7"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(&expected)
                .insert_header("x-custom-header", "custom-value"),
        )
        .mount(&mock_server)
        .await;

    let response = Request::new()
        .as_get()
        .with_url(format!("{}/objects/7", mock_server.uri()))
        .fetch_json_with_meta::<TestObject>()
        .await
        .unwrap();

    assert_eq!(response.data, expected);
    assert_eq!(response.status(), 200);
    assert_eq!(response.header("x-custom-header"), Some("custom-value"));
    assert!(response
        .meta
        .content_type
        .as_deref()
        .unwrap()
        .starts_with("application/json"));
}

#[tokio::test]
async fn test_post_json_body_round_trip() {
    let mock_server = echo_server().await;
    let sent = test_object();

    let response = Request::new()
        .as_post()
        .with_url(format!("{}/echo", mock_server.uri()))
        .with_json_body(&sent)
        .fetch_json_with_meta::<TestObject>()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.data, sent);
}

#[tokio::test]
async fn test_post_xml_body_round_trip() {
    let mock_server = echo_server().await;
    let sent = test_object();

    let response = Request::new()
        .as_post()
        .with_url(format!("{}/echo", mock_server.uri()))
        .with_xml_body(&sent)
        .fetch_xml_with_meta::<TestObject>()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.data, sent);
    assert!(response.raw_body.starts_with("<TestObject>"));
    assert!(response.raw_body.contains("2024-03-01T12:30:05.250Z"));
}

#[tokio::test]
async fn test_query_string_and_headers_are_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/path/2"))
        .and(query_param("env", "dev"))
        .and(query_param("foo", "bar"))
        .and(header("x-request-id", "abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let body = Request::new()
        .with_url(format!("{}/api/v1/path/2?env=dev", mock_server.uri()))
        .with_query_string("foo", "bar")
        .with_header("X-Request-Id", "abc123")
        .fetch_string()
        .await
        .unwrap();

    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_post_data_basic_auth_and_cookies() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .and(header("cookie", "session=1; theme=dark"))
        .and(body_string("remember=yes&user=alice"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let meta = Request::new()
        .as_post()
        .with_url(format!("{}/login", mock_server.uri()))
        .with_post_data("user", "alice")
        .with_post_data("remember", "yes")
        .with_basic_auth("user", "pass")
        .with_cookie("session", "1")
        .with_cookie("theme", "dark")
        .execute_with_meta()
        .await
        .unwrap();

    assert_eq!(meta.status_code, 204);
}

#[tokio::test]
async fn test_events_are_logged() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/path/2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&mock_server)
        .await;

    let sink = Arc::new(RecordingSink::default());
    let url = format!("{}/api/v1/path/2?env=dev&foo=bar", mock_server.uri());

    Request::new()
        .with_url(&url)
        .with_logger(sink.clone())
        .execute()
        .await
        .unwrap();

    let records = sink.records();
    assert_eq!(records.len(), 2);

    let (flag, text, json) = &records[0];
    assert_eq!(*flag, Flag::REQUEST);
    assert_eq!(text, &format!("GET {}", url));
    assert_eq!(json["flag"], "request");
    assert_eq!(json["req"]["url"], url.as_str());

    let (flag, text, json) = &records[1];
    assert_eq!(*flag, Flag::RESPONSE);
    assert_eq!(text, &format!("200 GET {}\nresponse body\n[]", url));
    assert_eq!(json["flag"], "request.response");
    assert_eq!(json["req"]["verb"], "GET");
    assert_eq!(json["res"]["status_code"], 200);
    assert_eq!(json["body"], "W10=");
}

#[tokio::test]
async fn test_request_body_is_logged() {
    let mock_server = echo_server().await;
    let sink = Arc::new(RecordingSink::default());
    let url = format!("{}/echo", mock_server.uri());

    Request::new()
        .as_post()
        .with_url(&url)
        .with_raw_body(r#"{"a":1}"#)
        .with_logger(sink.clone())
        .execute()
        .await
        .unwrap();

    let records = sink.records();
    assert_eq!(records[0].1, format!("POST {}\nrequest body\n{{\"a\":1}}", url));
    assert_eq!(records[1].1, format!("200 POST {}\nresponse body\n{{\"a\":1}}", url));
}

#[tokio::test]
async fn test_disabled_flags_are_skipped() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let sink = Arc::new(RecordingSink {
        only: Some(Flag::RESPONSE),
        ..RecordingSink::default()
    });

    Request::new()
        .with_url(mock_server.uri())
        .with_logger(sink.clone())
        .execute()
        .await
        .unwrap();

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].0, Flag::RESPONSE);
}

#[tokio::test]
async fn test_error_status_is_not_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/items/1"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
        .mount(&mock_server)
        .await;

    let response = Request::new()
        .as_delete()
        .with_url(format!("{}/items/1", mock_server.uri()))
        .fetch_string_with_meta()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    assert!(!response.meta.is_success());
    assert_eq!(response.data, "Not found");
}

#[tokio::test]
async fn test_deserialization_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(200).set_body_string("invalid json"))
        .mount(&mock_server)
        .await;

    let result = Request::new()
        .with_url(format!("{}/test", mock_server.uri()))
        .fetch_json::<TestObject>()
        .await;

    match result {
        Err(Error::DeserializationFailed {
            raw_response,
            serde_error,
            status,
        }) => {
            assert_eq!(status.as_u16(), 200);
            assert_eq!(raw_response, "invalid json");
            assert!(serde_error.contains("expected"));
        }
        _ => panic!("Expected DeserializationFailed, got {:?}", result),
    }
}

#[tokio::test]
async fn test_invalid_url_fails_before_sending() {
    let sink = Arc::new(RecordingSink::default());

    let result = Request::new()
        .with_url("::not a url::")
        .with_logger(sink.clone())
        .execute()
        .await;

    assert!(matches!(result, Err(Error::InvalidUrl(_))));
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn test_invalid_header_is_configuration_error() {
    let mock_server = MockServer::start().await;

    let result = Request::new()
        .with_url(mock_server.uri())
        .with_header("bad header", "value")
        .execute()
        .await;

    assert!(matches!(result, Err(Error::ConfigurationError(_))));
}

#[tokio::test]
async fn test_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&mock_server)
        .await;

    let result = Request::new()
        .with_url(format!("{}/slow", mock_server.uri()))
        .with_timeout(Duration::from_millis(50))
        .execute()
        .await;

    match result {
        Err(e) => assert!(e.is_timeout(), "Expected timeout, got {:?}", e),
        Ok(_) => panic!("Expected timeout"),
    }
}

#[tokio::test]
async fn test_shared_client() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("pooled"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = reqwest::Client::new();
    for _ in 0..2 {
        let body = Request::new()
            .with_url(mock_server.uri())
            .with_client(client.clone())
            .fetch_raw()
            .await
            .unwrap();
        assert_eq!(body, b"pooled");
    }
}

#[tokio::test]
async fn test_unencodable_body_is_serialization_error() {
    let mock_server = echo_server().await;
    let sink = Arc::new(RecordingSink::default());

    let json = Request::new()
        .as_post()
        .with_url(format!("{}/echo", mock_server.uri()))
        .with_json_body(&Unencodable)
        .with_logger(sink.clone())
        .execute()
        .await;
    match json {
        Err(Error::Serialization(message)) => assert!(message.contains("cannot encode")),
        other => panic!("Expected Serialization, got {:?}", other),
    }

    let xml = Request::new()
        .as_post()
        .with_url(format!("{}/echo", mock_server.uri()))
        .with_xml_body(&Unencodable)
        .execute()
        .await;
    assert!(matches!(xml, Err(Error::Serialization(_))));

    assert!(sink.records().is_empty());
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_replacing_bad_body_sends_good_one() {
    let mock_server = echo_server().await;

    let body = Request::new()
        .as_post()
        .with_url(format!("{}/echo", mock_server.uri()))
        .with_json_body(&Unencodable)
        .with_json_body(&serde_json::json!({"a": 1}))
        .fetch_string()
        .await
        .unwrap();

    assert_eq!(body, r#"{"a":1}"#);
}

#[tokio::test]
async fn test_xml_deserialization_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<TestObject><id>abc</id></TestObject>"),
        )
        .mount(&mock_server)
        .await;

    let result = Request::new()
        .with_url(format!("{}/test", mock_server.uri()))
        .fetch_xml::<TestObject>()
        .await;

    match result {
        Err(Error::DeserializationFailed {
            raw_response,
            status,
            ..
        }) => {
            assert_eq!(status.as_u16(), 200);
            assert_eq!(raw_response, "<TestObject><id>abc</id></TestObject>");
        }
        _ => panic!("Expected DeserializationFailed, got {:?}", result),
    }
}

#[tokio::test]
async fn test_content_type_sent_once() {
    let mock_server = echo_server().await;

    Request::new()
        .as_post()
        .with_url(format!("{}/echo", mock_server.uri()))
        .with_header("Content-Type", "text/plain")
        .with_json_body(&test_object())
        .execute()
        .await
        .unwrap();

    let received = mock_server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let content_types: Vec<_> = received[0]
        .headers
        .get_all("content-type")
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect();
    assert_eq!(content_types, vec!["application/json; charset=utf-8"]);
}
