#![allow(clippy::expect_used, dead_code)]
//! Test helpers for integration tests.
//!
//! Provides utilities for:
//! - Building the router the binary serves, with an in-memory or on-disk
//!   rule file
//! - Selecting a mechanism and front-end per test
//! - Making HTTP requests and asserting on responses

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use salvo::http::header::HeaderName;
use salvo::http::{Method, StatusCode};
use salvo::prelude::*;
use salvo::test::{RequestBuilder, ResponseExt, TestClient};

use marionette_test::app::app::api::routes;
use marionette_test::app::config::ConfigHandler;
use marionette_test::core::config::{AuthConfig, BasicAuthConfig, Frontend, ServerConfig, Settings};
use marionette_test::service::auth::{AuthorizationConfig, AuthorizationHandler, parse_rights};
use marionette_test::service::mechanism::password::hash_password;
use marionette_test::service::mechanism::{
    FileCertificateStore, MechanismHandler, MechanismRegistry, StaticResolver,
};

pub use marionette_test::service::mechanism::{BASIC_CREDENTIAL_MECHANISM, TLS_CERT_MECHANISM};

/// Settings for `mechanism` served behind `frontend`.
#[must_use]
pub fn settings(mechanism: &str, frontend: Frontend) -> Settings {
    Settings {
        server: ServerConfig {
            frontend,
            ..ServerConfig::default()
        },
        auth: AuthConfig {
            mechanism: Some(mechanism.to_string()),
            basic: None,
        },
        ..Settings::default()
    }
}

/// Settings for `basic-credential` served natively against `htpasswd`.
#[must_use]
pub fn basic_settings(htpasswd: &Path) -> Settings {
    let mut settings = settings(BASIC_CREDENTIAL_MECHANISM, Frontend::Native);
    settings.auth.basic = Some(BasicAuthConfig {
        htpasswd: Some(htpasswd.to_path_buf()),
        ..BasicAuthConfig::default()
    });
    settings
}

/// Writes an htpasswd file holding one user.
///
/// ## Panics
/// Panics if the file cannot be written.
pub fn write_htpasswd(dir: &Path, user: &str, password: &str) -> PathBuf {
    let path = dir.join("htpasswd");
    let hash = hash_password(password).expect("Failed to hash password");
    std::fs::write(&path, format!("{user}:{hash}\n")).expect("Failed to write htpasswd");
    path
}

/// Rules parsed from `contents`, never reloaded from disk.
///
/// ## Panics
/// Panics if `contents` is not a valid rule file.
#[must_use]
pub fn rules(contents: &str) -> Arc<AuthorizationConfig> {
    let rights = parse_rights(contents, "inline").expect("Rule file should parse");
    Arc::new(AuthorizationConfig::from_rights(
        "/nonexistent/marionette/auth.conf",
        rights,
    ))
}

/// The built-in mechanisms, resolving no reverse DNS names.
///
/// ## Panics
/// Panics if a built-in mechanism cannot be constructed.
#[must_use]
pub fn builtin_registry(settings: &Settings) -> MechanismRegistry {
    MechanismRegistry::with_builtin(
        settings,
        Arc::new(FileCertificateStore::new(&settings.ssl)),
        Arc::new(StaticResolver::new()),
    )
    .expect("Built-in mechanisms should register")
}

/// Builds the router the binary serves for `settings`.
///
/// ## Panics
/// Panics if the mechanism cannot be selected or configured.
#[must_use]
pub fn create_test_service(settings: Settings, authorization: Arc<AuthorizationConfig>) -> Service {
    let registry = builtin_registry(&settings);
    let frontend = settings.server.frontend;
    registry
        .active_mechanism(&settings.auth)
        .expect("Mechanism should be registered")
        .configure(frontend)
        .expect("Front-end should be configurable");

    Service::new(test_router(settings, &registry, authorization))
}

/// The application router over `registry`, without configuring the
/// front-end.
///
/// ## Panics
/// Panics if the configured mechanism is not registered.
#[must_use]
pub fn test_router(
    settings: Settings,
    registry: &MechanismRegistry,
    authorization: Arc<AuthorizationConfig>,
) -> Router {
    let mechanism = registry
        .active_mechanism(&settings.auth)
        .expect("Mechanism should be registered");
    let frontend = settings.server.frontend;

    Router::new()
        .hoop(ConfigHandler {
            settings: Arc::new(settings),
        })
        .hoop(MechanismHandler {
            mechanism,
            frontend,
        })
        .hoop(AuthorizationHandler {
            config: authorization,
        })
        .push(routes())
}

/// Test request builder for constructing HTTP requests.
pub struct TestRequest {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
}

impl TestRequest {
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn put(path: &str) -> Self {
        Self::new(Method::PUT, path)
    }

    #[must_use]
    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Presents a client certificate the way a reverse proxy reports it.
    #[must_use]
    pub fn proxied_certificate(self, common_name: &str, verify: &str) -> Self {
        self.header("X-Client-DN", &format!("/O=Example/CN={common_name}"))
            .header("X-Client-Verify", verify)
    }

    #[must_use]
    pub fn basic_auth(self, user: &str, password: &str) -> Self {
        let encoded = STANDARD.encode(format!("{user}:{password}"));
        self.header("Authorization", &format!("Basic {encoded}"))
    }

    /// Sends the request to the test service and returns the response.
    pub async fn send(self, service: &Service) -> TestResponse {
        let url = format!("http://127.0.0.1:5800{}", self.path);

        let mut client = match self.method {
            Method::GET => TestClient::get(&url),
            Method::PUT => TestClient::put(&url),
            Method::DELETE => TestClient::delete(&url),
            _ => RequestBuilder::new(&url, self.method.clone()),
        };
        for (name, value) in self.headers {
            if let Ok(header_name) = HeaderName::try_from(name.as_str()) {
                client = client.add_header(header_name, value, true);
            }
        }

        let mut response = client.send(service).await;
        let status = response
            .status_code
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.take_string().await.unwrap_or_default();

        TestResponse { status, body }
    }
}

/// Represents an HTTP test response for assertions.
pub struct TestResponse {
    pub status: StatusCode,
    pub body: String,
}

impl TestResponse {
    /// Asserts that the response status matches the expected code.
    #[must_use]
    pub fn assert_status(self, expected: StatusCode) -> Self {
        assert_eq!(
            self.status, expected,
            "Expected status {expected} but got {} with body:\n{}",
            self.status, self.body
        );
        self
    }

    /// The request passed authorization and reached the REST terminus.
    #[must_use]
    pub fn assert_authorized(self) -> Self {
        self.assert_status(StatusCode::NOT_FOUND)
            .assert_body_contains("No terminus")
    }

    #[must_use]
    pub fn assert_forbidden(self) -> Self {
        self.assert_status(StatusCode::FORBIDDEN)
            .assert_body_contains("Forbidden request")
    }

    #[must_use]
    pub fn assert_body_contains(self, expected: &str) -> Self {
        assert!(
            self.body.contains(expected),
            "Expected body to contain '{expected}' but got:\n{}",
            self.body
        );
        self
    }

    /// Parses the body as JSON.
    ///
    /// ## Panics
    /// Panics if the body is not JSON.
    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("Body should be JSON")
    }
}
