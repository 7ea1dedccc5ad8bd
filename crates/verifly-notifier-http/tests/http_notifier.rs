//! Integration tests for the HTTP callback notifier
//!
//! A wiremock server stands in for the caller's callback endpoint.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use verifly_core::traits::Notifier;
use verifly_core::{Error, VerificationRecord};
use verifly_notifier_http::HttpNotifier;

const CHALLENGE: &str = "verifly-site-verification=abc123";

fn verified_record(callback_url: String) -> VerificationRecord {
    let mut record = VerificationRecord::new("example.com", callback_url).with_challenge(CHALLENGE);
    record.verified = true;
    record
}

#[tokio::test]
async fn test_posts_record_as_json() {
    let server = MockServer::start().await;
    let callback_url = format!("{}/hooks/verified", server.uri());

    Mock::given(method("POST"))
        .and(path("/hooks/verified"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "domain": "example.com",
            "challenge": CHALLENGE,
            "verified": true,
            "callback_url": callback_url,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("thanks"))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = HttpNotifier::new().unwrap();
    let response = notifier
        .notify(&verified_record(callback_url.clone()))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, "thanks");
    assert!(response.is_success());
}

#[tokio::test]
async fn test_non_2xx_is_returned_not_raised() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let notifier = HttpNotifier::new().unwrap();
    let response = notifier
        .notify(&verified_record(format!("{}/cb", server.uri())))
        .await
        .unwrap();

    assert_eq!(response.status, 503);
    assert_eq!(response.body, "maintenance");
    assert!(!response.is_success());
}

#[tokio::test]
async fn test_unreachable_callback_is_an_error() {
    // Port 9 (discard) on localhost is not expected to accept connections
    let notifier = HttpNotifier::with_timeout(Duration::from_secs(2)).unwrap();

    let err = notifier
        .notify(&verified_record("http://127.0.0.1:9/cb".to_string()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Notify(_)));
}

#[tokio::test]
async fn test_slow_callback_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let notifier = HttpNotifier::with_timeout(Duration::from_millis(200)).unwrap();
    let err = notifier
        .notify(&verified_record(format!("{}/cb", server.uri())))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Notify(_)));
}
