#![allow(unused_must_use)]
//! The native front-end: the listener terminates TLS and attaches the
//! verified client certificate to each request.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use salvo::http::StatusCode;
use salvo::prelude::*;

use super::helpers::*;
use marionette_test::core::config::{Frontend, Settings, SslConfig};
use marionette_test::service::error::ServiceError;
use marionette_test::service::mechanism::{
    CertificateStore, FileCertificateStore, MechanismRegistry, NodeResolver, PeerCertificate,
    PeerVerification, ServerOptions, ServerStrategy, StaticResolver, TlsClient, TlsNativeServer,
};

const RULES: &str = "\
path /catalog
allow node1.example.com
";

/// Stands in for the listener: the subject arrives out of band instead of
/// from the TLS session.
#[handler]
async fn attach_certificate(req: &mut Request) {
    let certificate = req
        .headers()
        .get("x-test-peer-subject")
        .and_then(|value| value.to_str().ok())
        .map(PeerCertificate::from_subject);
    if let Some(certificate) = certificate {
        req.extensions_mut().insert(certificate);
    }
}

fn native_settings(ssl_dir: &Path) -> Settings {
    let mut settings = settings(TLS_CERT_MECHANISM, Frontend::Native);
    settings.ssl = SslConfig {
        host_cert: ssl_dir.join("host.pem"),
        host_private_key: ssl_dir.join("host_key.pem"),
        local_ca_cert: ssl_dir.join("ca.pem"),
        ..SslConfig::default()
    };
    for path in [
        &settings.ssl.host_cert,
        &settings.ssl.host_private_key,
        &settings.ssl.local_ca_cert,
    ] {
        std::fs::write(path, "-----BEGIN TEST-----\n").expect("Failed to write TLS material");
    }
    settings
}

/// A registry whose native `tls-cert` server is fed certificates by the
/// front-end.
fn certificate_registry(settings: &Settings) -> MechanismRegistry {
    let store: Arc<dyn CertificateStore> = Arc::new(FileCertificateStore::new(&settings.ssl));
    let resolver: Arc<dyn NodeResolver> = Arc::new(StaticResolver::new());
    let native: Arc<dyn ServerStrategy> =
        Arc::new(TlsNativeServer::new(Arc::clone(&store), resolver).with_peer_certificates());

    let mut registry = MechanismRegistry::new();
    registry.register_mechanism(
        TLS_CERT_MECHANISM,
        Arc::new(TlsClient::new(store)),
        HashMap::from([(Frontend::Native, native)]),
    );
    registry
}

#[test_log::test(tokio::test)]
async fn builtin_native_tls_cert_refuses_to_start() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let settings = native_settings(dir.path());

    let err = builtin_registry(&settings)
        .active_mechanism(&settings.auth)
        .expect("Mechanism should be registered")
        .configure(Frontend::Native)
        .expect_err("Builtin listener cannot read client certificates");

    assert!(matches!(
        err,
        ServiceError::PeerCertificatesUnavailable(Frontend::Native)
    ));
    assert!(err.is_fatal_setup());
}

#[test_log::test(tokio::test)]
async fn native_certificate_identifies_and_authorizes_peer() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let settings = native_settings(dir.path());
    let registry = certificate_registry(&settings);

    let options = registry
        .active_mechanism(&settings.auth)
        .expect("Mechanism should be registered")
        .configure(Frontend::Native)
        .expect("Front-end should be configurable");
    assert!(matches!(
        options,
        ServerOptions::Tls(ref tls) if tls.verification == PeerVerification::VerifyPeer
    ));

    let service = Service::new(
        Router::new()
            .hoop(attach_certificate)
            .push(test_router(settings, &registry, rules(RULES))),
    );

    let response = TestRequest::get("/whoami")
        .header("X-Test-Peer-Subject", "/O=Example/CN=node1.example.com")
        .send(&service)
        .await
        .assert_status(StatusCode::OK);
    let body = response.json();
    assert_eq!(body["name"], "node1.example.com");
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["frontend"], "native");

    TestRequest::get("/catalog/node1.example.com")
        .header("X-Test-Peer-Subject", "/O=Example/CN=node1.example.com")
        .send(&service)
        .await
        .assert_authorized();

    TestRequest::get("/catalog/node1.example.com")
        .send(&service)
        .await
        .assert_forbidden();
}
