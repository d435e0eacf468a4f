#![allow(unused_must_use)]
//! Authorization integration tests.
//!
//! Every request below enters as `/{kind}/{key}`, is authenticated by the
//! `tls-cert` mechanism behind a proxy, and is checked against the given rule
//! file. An authorized request reaches the terminus, which answers 404.

use salvo::http::StatusCode;

use super::helpers::*;
use marionette_test::core::config::Frontend;

const RULES: &str = "\
# each node reads its own catalog
path /catalog
method find
allow node1.example.com

path /facts
method save
allow *.example.com

path /file/private
method save
allow admin.example.com

path /file
allow *

path /report
deny rogue.example.com
allow *
";

fn service() -> salvo::Service {
    create_test_service(settings(TLS_CERT_MECHANISM, Frontend::Proxy), rules(RULES))
}

#[test_log::test(tokio::test)]
async fn find_allowed_for_named_node() {
    TestRequest::get("/catalog/node1.example.com")
        .proxied_certificate("node1.example.com", "SUCCESS")
        .send(&service())
        .await
        .assert_authorized();
}

#[test_log::test(tokio::test)]
async fn find_forbidden_for_other_node() {
    TestRequest::get("/catalog/node1.example.com")
        .proxied_certificate("node2.example.com", "SUCCESS")
        .send(&service())
        .await
        .assert_forbidden()
        .assert_body_contains("node2.example.com")
        .assert_body_contains("access to /catalog/node1.example.com [find]");
}

#[test_log::test(tokio::test)]
async fn method_restriction_forbids_other_operations() {
    let service = service();

    TestRequest::put("/facts/node1.example.com")
        .proxied_certificate("node1.example.com", "SUCCESS")
        .send(&service)
        .await
        .assert_authorized();

    TestRequest::get("/facts/node1.example.com")
        .proxied_certificate("node1.example.com", "SUCCESS")
        .send(&service)
        .await
        .assert_forbidden();
}

#[test_log::test(tokio::test)]
async fn search_is_distinct_from_find() {
    TestRequest::get("/catalog/")
        .proxied_certificate("node1.example.com", "SUCCESS")
        .send(&service())
        .await
        .assert_forbidden()
        .assert_body_contains("[search]");
}

#[test_log::test(tokio::test)]
async fn longer_path_with_other_methods_falls_through() {
    // /file/private only governs save, so a find falls back to /file.
    TestRequest::get("/file/private/secret.txt")
        .proxied_certificate("node1.example.com", "SUCCESS")
        .send(&service())
        .await
        .assert_authorized();
}

#[test_log::test(tokio::test)]
async fn deny_wins_over_everyone() {
    let service = service();

    TestRequest::put("/report/rogue.example.com")
        .proxied_certificate("rogue.example.com", "SUCCESS")
        .send(&service)
        .await
        .assert_forbidden();

    TestRequest::put("/report/node1.example.com")
        .proxied_certificate("node1.example.com", "SUCCESS")
        .send(&service)
        .await
        .assert_authorized();
}

#[test_log::test(tokio::test)]
async fn unknown_resource_is_forbidden() {
    TestRequest::delete("/status/node1.example.com")
        .proxied_certificate("node1.example.com", "SUCCESS")
        .send(&service())
        .await
        .assert_forbidden()
        .assert_body_contains("[destroy]");
}

#[test_log::test(tokio::test)]
async fn empty_rules_deny_everything() {
    let service = create_test_service(settings(TLS_CERT_MECHANISM, Frontend::Proxy), rules(""));

    for path in ["/catalog/node1", "/file/x", "/facts/node1"] {
        TestRequest::get(path)
            .proxied_certificate("node1.example.com", "SUCCESS")
            .send(&service)
            .await
            .assert_forbidden();
    }
}

#[test_log::test(tokio::test)]
async fn unsupported_method_is_rejected() {
    TestRequest::new(salvo::http::Method::PATCH, "/file/x")
        .proxied_certificate("node1.example.com", "SUCCESS")
        .send(&service())
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED);
}
