//! The `basic-credential` mechanism: HTTP Basic credentials checked against
//! an htpasswd file.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use parking_lot::Mutex;
use reqwest::RequestBuilder;
use salvo::async_trait;

use marionette_core::config::BasicAuthConfig;

use super::frontend::PeerRequest;
use super::password::Htpasswd;
use super::resolve::{NodeResolver, resolve_node};
use super::strategy::{Authentication, ClientStrategy, ServerOptions, ServerStrategy};
use crate::error::{ServiceError, ServiceResult};

pub const BASIC_CREDENTIAL_MECHANISM: &str = "basic-credential";

pub struct BasicClient {
    username: Option<String>,
    password: Option<String>,
}

impl BasicClient {
    #[must_use]
    pub fn new(config: &BasicAuthConfig) -> Self {
        Self {
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }
}

impl ClientStrategy for BasicClient {
    fn prepare_request(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(username) => request.basic_auth(username, self.password.as_deref()),
            None => request,
        }
    }
}

/// ## Summary
/// Extracts `(user, password)` from an `Authorization: Basic` header value.
#[must_use]
pub fn decode_basic_credentials(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

pub struct BasicNativeServer {
    htpasswd_path: Option<PathBuf>,
    /// Loaded on first use.
    htpasswd: Mutex<Option<Arc<Htpasswd>>>,
    resolver: Arc<dyn NodeResolver>,
}

impl BasicNativeServer {
    #[must_use]
    pub fn new(config: &BasicAuthConfig, resolver: Arc<dyn NodeResolver>) -> Self {
        Self {
            htpasswd_path: config.htpasswd.clone(),
            htpasswd: Mutex::new(None),
            resolver,
        }
    }

    fn htpasswd(&self) -> ServiceResult<Arc<Htpasswd>> {
        let mut cached = self.htpasswd.lock();
        if let Some(htpasswd) = cached.as_ref() {
            return Ok(Arc::clone(htpasswd));
        }

        let path = self
            .htpasswd_path
            .as_deref()
            .ok_or_else(|| ServiceError::MissingHtpasswd("<unset>".to_string()))?;
        let htpasswd = Arc::new(Htpasswd::load(path)?);
        tracing::info!(path = %path.display(), users = htpasswd.len(), "Loaded htpasswd");
        *cached = Some(Arc::clone(&htpasswd));
        Ok(htpasswd)
    }

    async fn verified_user(&self, request: &dyn PeerRequest) -> Option<String> {
        let (user, password) = request
            .header("authorization")
            .and_then(decode_basic_credentials)?;

        let htpasswd = match self.htpasswd() {
            Ok(htpasswd) => htpasswd,
            Err(err) => {
                tracing::warn!(error = %err, "Cannot verify basic credentials");
                return None;
            }
        };

        // Argon2 is CPU bound.
        let name = user.clone();
        match tokio::task::spawn_blocking(move || htpasswd.verify(&user, &password)).await {
            Ok(true) => Some(name),
            Ok(false) => None,
            Err(err) => {
                tracing::error!(error = %err, "Credential verification task failed");
                None
            }
        }
    }
}

#[async_trait]
impl ServerStrategy for BasicNativeServer {
    fn configure(&self) -> ServiceResult<ServerOptions> {
        self.htpasswd()?;
        Ok(ServerOptions::Plain)
    }

    async fn authenticate(&self, address: IpAddr, request: &dyn PeerRequest) -> Authentication {
        if let Some(user) = self.verified_user(request).await {
            return Authentication::authenticated(user);
        }

        Authentication::anonymous(resolve_node(self.resolver.as_ref(), address).await)
    }
}

/// The proxy already checked the credentials.
pub struct BasicProxyServer {
    resolver: Arc<dyn NodeResolver>,
}

impl BasicProxyServer {
    #[must_use]
    pub fn new(resolver: Arc<dyn NodeResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl ServerStrategy for BasicProxyServer {
    fn configure(&self) -> ServiceResult<ServerOptions> {
        Ok(ServerOptions::Plain)
    }

    async fn authenticate(&self, address: IpAddr, _request: &dyn PeerRequest) -> Authentication {
        Authentication::authenticated(resolve_node(self.resolver.as_ref(), address).await)
    }
}
