use std::net::IpAddr;
use std::path::PathBuf;

use reqwest::{ClientBuilder, RequestBuilder};
use salvo::async_trait;

use super::frontend::PeerRequest;
use crate::error::ServiceResult;

/// Where an agent expects to find the CA it verifies servers against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaLocation {
    #[default]
    Remote,
    /// Fingerprint mode: the CA is not trusted yet.
    None,
}

#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Printing a certificate fingerprint before the CA is known.
    pub fingerprint: bool,
}

/// How outbound calls prove who we are.
///
/// Hooks run in order: `init` once per pool, `setup_outbound_connection`
/// once per client, `prepare_request` per request. Missing material must
/// leave the builder unchanged so that first contact can proceed.
pub trait ClientStrategy: Send + Sync {
    /// ## Errors
    /// Returns an error if the options are unusable for this mechanism.
    fn init(&self, _options: &ClientOptions) -> ServiceResult<()> {
        Ok(())
    }

    /// Whether outbound connections use `https`.
    fn uses_tls(&self) -> bool {
        false
    }

    /// ## Errors
    /// Returns an error if existing material cannot be loaded.
    fn setup_outbound_connection(&self, builder: ClientBuilder) -> ServiceResult<ClientBuilder> {
        Ok(builder)
    }

    fn prepare_request(&self, request: RequestBuilder) -> RequestBuilder {
        request
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerVerification {
    None,
    VerifyPeer,
}

/// Material a front-end needs to terminate TLS itself.
pub struct TlsServerOptions {
    pub private_key: Vec<u8>,
    pub certificate: Vec<u8>,
    pub ca_bundle: Vec<u8>,
    pub ca_bundle_path: PathBuf,
    pub verification: PeerVerification,
}

impl std::fmt::Debug for TlsServerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsServerOptions")
            .field("ca_bundle_path", &self.ca_bundle_path)
            .field("verification", &self.verification)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum ServerOptions {
    Plain,
    Tls(TlsServerOptions),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authentication {
    pub authenticated: bool,
    pub peer_name: String,
}

impl Authentication {
    #[must_use]
    pub fn authenticated(peer_name: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            peer_name: peer_name.into(),
        }
    }

    #[must_use]
    pub fn anonymous(peer_name: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            peer_name: peer_name.into(),
        }
    }
}

/// How inbound requests on one front-end are turned into a peer identity.
#[async_trait]
pub trait ServerStrategy: Send + Sync {
    /// ## Errors
    /// Returns a fatal setup error when required material is absent.
    fn configure(&self) -> ServiceResult<ServerOptions>;

    /// Never fails: without a usable credential the peer is named by reverse
    /// DNS and reported as not authenticated.
    async fn authenticate(&self, address: IpAddr, request: &dyn PeerRequest) -> Authentication;
}
