//! The `tls-cert` mechanism: identity is the CN of a CA-signed certificate.

use std::net::IpAddr;
use std::sync::Arc;

use parking_lot::RwLock;
use regex::Regex;
use reqwest::ClientBuilder;
use salvo::async_trait;

use marionette_core::config::{Frontend, SslConfig};
use marionette_core::constants::SSL_CLIENT_VERIFY_SUCCESS;

use super::certificate::CertificateStore;
use super::frontend::PeerRequest;
use super::resolve::{NodeResolver, resolve_node};
use super::strategy::{
    Authentication, CaLocation, ClientOptions, ClientStrategy, PeerVerification, ServerOptions,
    ServerStrategy, TlsServerOptions,
};
use crate::error::{ServiceError, ServiceResult};

pub const TLS_CERT_MECHANISM: &str = "tls-cert";

pub struct TlsClient {
    store: Arc<dyn CertificateStore>,
    ca_location: RwLock<CaLocation>,
}

impl TlsClient {
    #[must_use]
    pub fn new(store: Arc<dyn CertificateStore>) -> Self {
        Self {
            store,
            ca_location: RwLock::new(CaLocation::default()),
        }
    }

    #[must_use]
    pub fn ca_location(&self) -> CaLocation {
        *self.ca_location.read()
    }
}

impl ClientStrategy for TlsClient {
    fn init(&self, options: &ClientOptions) -> ServiceResult<()> {
        let location = if options.fingerprint {
            CaLocation::None
        } else {
            CaLocation::Remote
        };
        tracing::debug!(?location, "Initialized tls-cert client");
        *self.ca_location.write() = location;
        Ok(())
    }

    fn uses_tls(&self) -> bool {
        true
    }

    fn setup_outbound_connection(&self, builder: ClientBuilder) -> ServiceResult<ClientBuilder> {
        let builder = builder.https_only(true);
        if self.ca_location() == CaLocation::None {
            return Ok(builder);
        }

        let (Some(certificate), Some(private_key), Some(ca)) = (
            self.store.host_certificate()?,
            self.store.host_private_key()?,
            self.store.ca_certificate()?,
        ) else {
            tracing::debug!("No host certificate yet, connecting without client identity");
            return Ok(builder);
        };

        let mut identity_pem = private_key;
        identity_pem.push(b'\n');
        identity_pem.extend_from_slice(&certificate);

        Ok(builder
            .add_root_certificate(reqwest::Certificate::from_pem(&ca)?)
            .identity(reqwest::Identity::from_pem(&identity_pem)?))
    }
}

/// The listener terminates TLS and hands over the verified certificate.
///
/// Identity comes from the [`PeerCertificate`](super::frontend::PeerCertificate)
/// the front-end attaches to each request. `configure` refuses to run unless
/// the front-end was declared able to do so with
/// [`Self::with_peer_certificates`].
pub struct TlsNativeServer {
    store: Arc<dyn CertificateStore>,
    resolver: Arc<dyn NodeResolver>,
    peer_certificates: bool,
}

impl TlsNativeServer {
    #[must_use]
    pub fn new(store: Arc<dyn CertificateStore>, resolver: Arc<dyn NodeResolver>) -> Self {
        Self {
            store,
            resolver,
            peer_certificates: false,
        }
    }

    /// The front-end attaches the verified client certificate to requests.
    #[must_use]
    pub const fn with_peer_certificates(mut self) -> Self {
        self.peer_certificates = true;
        self
    }
}

#[async_trait]
impl ServerStrategy for TlsNativeServer {
    fn configure(&self) -> ServiceResult<ServerOptions> {
        if !self.peer_certificates {
            return Err(ServiceError::PeerCertificatesUnavailable(Frontend::Native));
        }

        let certificate = self.store.host_certificate()?.ok_or_else(|| {
            ServiceError::MissingCertificate(self.store.host_certificate_path().display().to_string())
        })?;
        let private_key = self.store.host_private_key()?.ok_or_else(|| {
            ServiceError::MissingPrivateKey(self.store.host_private_key_path().display().to_string())
        })?;
        let ca_bundle = self.store.ca_certificate()?.ok_or_else(|| {
            ServiceError::MissingCaCertificate(self.store.ca_certificate_path().display().to_string())
        })?;

        Ok(ServerOptions::Tls(TlsServerOptions {
            private_key,
            certificate,
            ca_bundle,
            ca_bundle_path: self.store.ca_certificate_path().to_path_buf(),
            verification: PeerVerification::VerifyPeer,
        }))
    }

    async fn authenticate(&self, address: IpAddr, request: &dyn PeerRequest) -> Authentication {
        if let Some(name) = request
            .peer_certificate()
            .and_then(|cert| cert.common_name())
        {
            return Authentication::authenticated(name);
        }

        tracing::debug!(%address, "No client certificate presented");
        Authentication::anonymous(resolve_node(self.resolver.as_ref(), address).await)
    }
}

/// A reverse proxy terminated TLS and forwards the outcome in headers.
pub struct TlsProxyServer {
    client_header: String,
    verify_header: String,
    common_name: Regex,
    resolver: Arc<dyn NodeResolver>,
}

impl TlsProxyServer {
    /// ## Errors
    /// Returns `InvalidConfiguration` if the CN matcher cannot be built.
    pub fn new(config: &SslConfig, resolver: Arc<dyn NodeResolver>) -> ServiceResult<Self> {
        let common_name = Regex::new(r"^.*?CN\s*=\s*(.*)")
            .map_err(|e| ServiceError::InvalidConfiguration(format!("Invalid CN matcher: {e}")))?;
        Ok(Self {
            client_header: config.client_header.clone(),
            verify_header: config.client_verify_header.clone(),
            common_name,
            resolver,
        })
    }

    fn common_name<'r>(&self, request: &'r dyn PeerRequest) -> Option<&'r str> {
        let dn = request.header(&self.client_header)?;
        self.common_name
            .captures(dn)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().trim())
            .filter(|name| !name.is_empty())
    }
}

#[async_trait]
impl ServerStrategy for TlsProxyServer {
    fn configure(&self) -> ServiceResult<ServerOptions> {
        Ok(ServerOptions::Plain)
    }

    async fn authenticate(&self, address: IpAddr, request: &dyn PeerRequest) -> Authentication {
        if let Some(name) = self.common_name(request) {
            let verified = request.header(&self.verify_header) == Some(SSL_CLIENT_VERIFY_SUCCESS);
            if !verified {
                tracing::warn!(peer = name, %address, "Proxy reports an unverified client certificate");
            }
            return Authentication {
                authenticated: verified,
                peer_name: name.to_string(),
            };
        }

        Authentication::anonymous(resolve_node(self.resolver.as_ref(), address).await)
    }
}
