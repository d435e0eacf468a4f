#![allow(unused_must_use)]
//! Rule file changes are picked up on the next request; broken edits are not.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use super::helpers::*;
use marionette_test::core::config::Frontend;
use marionette_test::service::auth::AuthorizationConfig;

fn write_rules(path: &Path, contents: &str, age: Duration) {
    std::fs::write(path, contents).expect("Failed to write rule file");
    let file = std::fs::File::options()
        .write(true)
        .open(path)
        .expect("Failed to open rule file");
    file.set_modified(SystemTime::now() - age)
        .expect("Failed to set modification time");
}

#[test_log::test(tokio::test)]
async fn corrupt_edit_keeps_previous_rules() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("auth.conf");
    write_rules(
        &path,
        "path /catalog\nmethod find\nallow n1\n",
        Duration::from_secs(60),
    );

    let authorization =
        Arc::new(AuthorizationConfig::load(&path).expect("Rule file should load"));
    let service = create_test_service(settings(TLS_CERT_MECHANISM, Frontend::Proxy), authorization);

    TestRequest::get("/catalog/n1")
        .proxied_certificate("n1", "SUCCESS")
        .send(&service)
        .await
        .assert_authorized();

    write_rules(
        &path,
        "path /catalog\nallow n1\npath /catalog\ndeny n1\n",
        Duration::from_secs(30),
    );

    TestRequest::get("/catalog/n1")
        .proxied_certificate("n1", "SUCCESS")
        .send(&service)
        .await
        .assert_authorized();
}

#[test_log::test(tokio::test)]
async fn valid_edit_replaces_rules() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("auth.conf");
    write_rules(&path, "path /catalog\nallow n1\n", Duration::from_secs(60));

    let authorization =
        Arc::new(AuthorizationConfig::load(&path).expect("Rule file should load"));
    let service = create_test_service(settings(TLS_CERT_MECHANISM, Frontend::Proxy), authorization);

    TestRequest::get("/catalog/n1")
        .proxied_certificate("n1", "SUCCESS")
        .send(&service)
        .await
        .assert_authorized();

    write_rules(&path, "path /catalog\nallow n2\n", Duration::from_secs(30));

    TestRequest::get("/catalog/n1")
        .proxied_certificate("n1", "SUCCESS")
        .send(&service)
        .await
        .assert_forbidden();
    TestRequest::get("/catalog/n1")
        .proxied_certificate("n2", "SUCCESS")
        .send(&service)
        .await
        .assert_authorized();
}

#[test_log::test(tokio::test)]
async fn missing_file_serves_default_rules() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let authorization = Arc::new(
        AuthorizationConfig::load(dir.path().join("absent.conf")).expect("Defaults should load"),
    );
    let service = create_test_service(settings(TLS_CERT_MECHANISM, Frontend::Proxy), authorization);

    TestRequest::get("/catalog/anyone")
        .proxied_certificate("n1", "FAILED:unknown ca")
        .send(&service)
        .await
        .assert_authorized();
    TestRequest::get("/status/anyone")
        .proxied_certificate("n1", "SUCCESS")
        .send(&service)
        .await
        .assert_forbidden();
}
