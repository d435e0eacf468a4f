use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use config::Config;
use serde::Deserialize;

use crate::constants::{
    DEFAULT_HOST_CERT, DEFAULT_HOST_PRIVATE_KEY, DEFAULT_LOCAL_CA_CERT, DEFAULT_REST_AUTHCONFIG,
    DEFAULT_SSL_CLIENT_HEADER, DEFAULT_SSL_CLIENT_VERIFY_HEADER,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub ssl: SslConfig,
    pub authorization: AuthorizationSettings,
    pub http_client: HttpClientConfig,
    pub logging: LoggingConfig,
}

/// The HTTP front-end terminating inbound connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frontend {
    /// The server terminates TLS itself and sees the peer certificate.
    #[default]
    Native,
    /// A reverse proxy terminates TLS and forwards the outcome in headers.
    Proxy,
}

impl Frontend {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Proxy => "proxy",
        }
    }
}

impl std::fmt::Display for Frontend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend: Frontend,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8140,
            frontend: Frontend::Native,
        }
    }
}

impl ServerConfig {
    /// ## Summary
    /// Returns the server address as a string in the format "host:port".
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Name of the process-wide authentication mechanism.
    pub mechanism: Option<String>,
    pub basic: Option<BasicAuthConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BasicAuthConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub htpasswd: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SslConfig {
    pub host_cert: PathBuf,
    pub host_private_key: PathBuf,
    pub local_ca_cert: PathBuf,
    pub client_header: String,
    pub client_verify_header: String,
}

impl Default for SslConfig {
    fn default() -> Self {
        Self {
            host_cert: PathBuf::from(DEFAULT_HOST_CERT),
            host_private_key: PathBuf::from(DEFAULT_HOST_PRIVATE_KEY),
            local_ca_cert: PathBuf::from(DEFAULT_LOCAL_CA_CERT),
            client_header: DEFAULT_SSL_CLIENT_HEADER.to_string(),
            client_verify_header: DEFAULT_SSL_CLIENT_VERIFY_HEADER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationSettings {
    pub rest_authconfig: PathBuf,
}

impl Default for AuthorizationSettings {
    fn default() -> Self {
        Self {
            rest_authconfig: PathBuf::from(DEFAULT_REST_AUTHCONFIG),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpClientConfig {
    pub timeout_secs: u64,
    /// `none` disables proxying.
    pub proxy_host: String,
    pub proxy_port: u16,
    pub keep_alive: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            proxy_host: "none".to_string(),
            proxy_port: 3128,
            keep_alive: false,
        }
    }
}

impl HttpClientConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// ## Summary
    /// Returns the proxy URL, or `None` when proxying is disabled.
    #[must_use]
    pub fn proxy_url(&self) -> Option<String> {
        if self.proxy_host.is_empty() || self.proxy_host == "none" {
            None
        } else {
            Some(format!("http://{}:{}", self.proxy_host, self.proxy_port))
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "debug".to_string(),
        }
    }
}

impl Settings {
    /// ## Summary
    /// Loads configuration from `.env` file and environment variables into a `Settings`.
    /// Environment variables take precedence over `config.toml` values.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Self::load_with(environment())
    }

    fn load_with(environment: config::Environment) -> Result<Self> {
        Ok(Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8140)?
            .set_default("server.frontend", "native")?
            .set_default("ssl.host_cert", DEFAULT_HOST_CERT)?
            .set_default("ssl.host_private_key", DEFAULT_HOST_PRIVATE_KEY)?
            .set_default("ssl.local_ca_cert", DEFAULT_LOCAL_CA_CERT)?
            .set_default("ssl.client_header", DEFAULT_SSL_CLIENT_HEADER)?
            .set_default("ssl.client_verify_header", DEFAULT_SSL_CLIENT_VERIFY_HEADER)?
            .set_default("authorization.rest_authconfig", DEFAULT_REST_AUTHCONFIG)?
            .set_default("http_client.timeout_secs", 120)?
            .set_default("http_client.proxy_host", "none")?
            .set_default("http_client.proxy_port", 3128)?
            .set_default("http_client.keep_alive", false)?
            .set_default("logging.level", "debug")?
            // TOML file
            .add_source(config::File::with_name("config.toml").required(false))
            .add_source(environment)
            .build()?
            .try_deserialize::<Settings>()?)
    }
}

/// ## Summary
/// Environment source, e.g. `MARIONETTE_AUTH__MECHANISM=tls-cert`.
///
/// Sections are separated by `__` because keys such as `rest_authconfig`
/// contain `_` themselves.
fn environment() -> config::Environment {
    config::Environment::with_prefix("MARIONETTE")
        .prefix_separator("_")
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}

#[cfg(test)]
mod tests;
