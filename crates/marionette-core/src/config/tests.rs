//! Tests for configuration module.

use super::*;

#[test_log::test]
fn test_frontend_display() {
    tracing::debug!("Testing frontend display");

    assert_eq!(Frontend::Native.to_string(), "native");
    assert_eq!(Frontend::Proxy.to_string(), "proxy");
}

#[test]
fn test_default_settings_have_no_mechanism() {
    let settings = Settings::default();

    assert!(settings.auth.mechanism.is_none());
    assert_eq!(settings.server.port, 8140);
    assert_eq!(settings.ssl.client_header, "X-Client-DN");
    assert_eq!(
        settings.authorization.rest_authconfig,
        PathBuf::from("auth.conf")
    );
}

#[test]
fn test_proxy_url_disabled_by_none() {
    let config = HttpClientConfig::default();
    assert!(config.proxy_url().is_none());

    let config = HttpClientConfig {
        proxy_host: "squid.example.com".to_string(),
        ..HttpClientConfig::default()
    };
    assert_eq!(
        config.proxy_url().as_deref(),
        Some("http://squid.example.com:3128")
    );
}

#[test]
fn test_timeout_from_seconds() {
    let config = HttpClientConfig {
        timeout_secs: 7,
        ..HttpClientConfig::default()
    };
    assert_eq!(config.timeout(), Duration::from_secs(7));
}

#[test]
fn test_bind_addr() {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        ..ServerConfig::default()
    };
    assert_eq!(config.bind_addr(), "127.0.0.1:8140");
}

#[test]
fn test_environment_keys_use_double_underscore_sections() {
    let variables = config::Map::from([
        ("MARIONETTE_AUTH__MECHANISM".to_string(), "tls-cert".to_string()),
        (
            "MARIONETTE_AUTHORIZATION__REST_AUTHCONFIG".to_string(),
            "/etc/marionette/auth.conf".to_string(),
        ),
        ("MARIONETTE_HTTP_CLIENT__KEEP_ALIVE".to_string(), "true".to_string()),
        ("MARIONETTE_SERVER__FRONTEND".to_string(), "proxy".to_string()),
    ]);

    let settings =
        Settings::load_with(environment().source(Some(variables))).expect("Settings should load");

    assert_eq!(settings.auth.mechanism.as_deref(), Some("tls-cert"));
    assert_eq!(
        settings.authorization.rest_authconfig,
        PathBuf::from("/etc/marionette/auth.conf")
    );
    assert!(settings.http_client.keep_alive);
    assert_eq!(settings.server.frontend, Frontend::Proxy);
    assert_eq!(settings.server.port, 8140);
}
