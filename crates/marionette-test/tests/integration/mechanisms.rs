#![allow(unused_must_use)]
//! Identity as established by each built-in mechanism.

use salvo::http::StatusCode;

use super::helpers::*;
use marionette_test::core::config::Frontend;

const RULES: &str = "\
path /catalog
allow node1
";

#[test_log::test(tokio::test)]
async fn basic_credentials_authenticate_htpasswd_user() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let htpasswd = write_htpasswd(dir.path(), "node1", "s3cret");
    let service = create_test_service(basic_settings(&htpasswd), rules(RULES));

    let response = TestRequest::get("/whoami")
        .basic_auth("node1", "s3cret")
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
    let body = response.json();
    assert_eq!(body["name"], "node1");
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["mechanism"], "basic-credential");

    TestRequest::get("/catalog/node1")
        .basic_auth("node1", "s3cret")
        .send(&service)
        .await
        .assert_authorized();
}

#[test_log::test(tokio::test)]
async fn wrong_password_is_anonymous() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let htpasswd = write_htpasswd(dir.path(), "node1", "s3cret");
    let service = create_test_service(basic_settings(&htpasswd), rules(RULES));

    let response = TestRequest::get("/whoami")
        .basic_auth("node1", "guess")
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
    let body = response.json();
    assert_eq!(body["authenticated"], false);
    assert_ne!(body["name"], "node1");

    TestRequest::get("/catalog/node1")
        .basic_auth("node1", "guess")
        .send(&service)
        .await
        .assert_forbidden();
}

#[test_log::test(tokio::test)]
async fn proxy_without_certificate_headers_is_anonymous() {
    let service = create_test_service(settings(TLS_CERT_MECHANISM, Frontend::Proxy), rules(RULES));

    let response = TestRequest::get("/whoami")
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
    assert_eq!(response.json()["authenticated"], false);
}

#[test_log::test(tokio::test)]
async fn proxied_basic_credentials_trust_the_proxy() {
    let service = create_test_service(
        settings(BASIC_CREDENTIAL_MECHANISM, Frontend::Proxy),
        rules(RULES),
    );

    let response = TestRequest::get("/whoami")
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
    assert_eq!(response.json()["authenticated"], true);
}
