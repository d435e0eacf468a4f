//! Pluggable authentication mechanisms.
//!
//! ## Module Organization
//!
//! - `basic`: the `basic-credential` mechanism
//! - `certificate`: access to the host's TLS material
//! - `frontend`: the request capabilities a server strategy relies on
//! - `password`: Argon2 hashing and htpasswd files
//! - `registry`: mechanism registration, selection and depot integration
//! - `resolve`: reverse DNS naming of unauthenticated peers
//! - `strategy`: client and server strategy traits
//! - `tls`: the `tls-cert` mechanism

pub mod basic;
pub mod certificate;
pub mod frontend;
pub mod password;
pub mod registry;
pub mod resolve;
pub mod strategy;
pub mod tls;

pub use basic::BASIC_CREDENTIAL_MECHANISM;
pub use certificate::{CertificateStore, FileCertificateStore};
pub use frontend::{PeerCertificate, PeerRequest, SalvoPeerRequest, StaticPeerRequest};
pub use registry::{ActiveMechanism, MechanismHandler, MechanismRegistry, get_mechanism_from_depot};
pub use resolve::{DnsResolver, NodeResolver, StaticResolver, resolve_node};
pub use strategy::{
    Authentication, CaLocation, ClientOptions, ClientStrategy, PeerVerification, ServerOptions,
    ServerStrategy, TlsServerOptions,
};
pub use tls::{TLS_CERT_MECHANISM, TlsClient, TlsNativeServer, TlsProxyServer};
