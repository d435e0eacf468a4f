#![allow(unused_must_use)]
//! Status routes: the healthcheck needs no identity, `whoami` reports it.

use salvo::http::StatusCode;

use super::helpers::*;
use marionette_test::core::config::Frontend;

#[test_log::test(tokio::test)]
async fn healthcheck_answers_ok() {
    let service = create_test_service(settings(TLS_CERT_MECHANISM, Frontend::Proxy), rules(""));

    TestRequest::get("/healthcheck")
        .send(&service)
        .await
        .assert_status(StatusCode::OK)
        .assert_body_contains("OK");
}

#[test_log::test(tokio::test)]
async fn whoami_reports_proxied_certificate() {
    let service = create_test_service(settings(TLS_CERT_MECHANISM, Frontend::Proxy), rules(""));

    let response = TestRequest::get("/whoami")
        .proxied_certificate("node1.example.com", "SUCCESS")
        .send(&service)
        .await
        .assert_status(StatusCode::OK);

    let body = response.json();
    assert_eq!(body["name"], "node1.example.com");
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["mechanism"], "tls-cert");
    assert_eq!(body["frontend"], "proxy");
}

#[test_log::test(tokio::test)]
async fn whoami_reports_unverified_peer_as_unauthenticated() {
    let service = create_test_service(settings(TLS_CERT_MECHANISM, Frontend::Proxy), rules(""));

    let response = TestRequest::get("/whoami")
        .proxied_certificate("node1.example.com", "FAILED:expired")
        .send(&service)
        .await
        .assert_status(StatusCode::OK);

    let body = response.json();
    assert_eq!(body["name"], "node1.example.com");
    assert_eq!(body["authenticated"], false);
}
