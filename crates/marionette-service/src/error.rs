use std::time::Duration;

use thiserror::Error;

use marionette_core::config::Frontend;
use marionette_core::types::Operation;

/// Errors raised while building or editing an access-control rule set
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AclError {
    #[error("Right '{0}' is already defined")]
    DuplicateRight(String),

    #[error("Shortname '{shortname}' of right '{name}' is already in use")]
    DuplicateShortname { name: String, shortname: char },

    #[error("'{0}' is not an absolute uri path")]
    InvalidPath(String),

    #[error("Unknown right '{0}'")]
    UnknownRight(String),

    #[error("'{0}' right does not allow method specification")]
    NotAPathRight(String),

    #[error("'{method}' is already in the '{right}' ACL")]
    DuplicateMethod { right: String, method: Operation },

    #[error("'{0}' is not an allowed value for method directive")]
    InvalidMethod(String),

    #[error("Invalid pattern '{0}'")]
    InvalidPattern(String),

    #[error("'method' is only allowed on path rights, '{0}' is a name right")]
    MethodOnNameRight(String),

    #[error("'{0}' found before any right was declared")]
    NoOpenRight(String),

    #[error("Invalid line '{0}'")]
    InvalidLine(String),
}

/// Failures of a background fetch, observed by every waiter of the same response
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("Network error fetching {target}: {message}")]
    Network { target: String, message: String },

    #[error("Timed out after {timeout:?} fetching {target}")]
    Timeout { target: String, timeout: Duration },

    #[error("Could not find any content at {0}")]
    NoContent(String),

    #[error("Remote server answered {status} for {target}")]
    RemoteStatus { target: String, status: u16 },

    #[error("Stream for {0} closed before completion")]
    Closed(String),
}

impl StreamError {
    /// Whether retrying the same request could succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Timeout { .. } | Self::Closed(_)
        )
    }

    pub(crate) fn from_reqwest(target: &str, err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                target: target.to_string(),
                timeout,
            }
        } else {
            Self::Network {
                target: target.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// Service layer errors - combines all error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    CoreError(#[from] marionette_core::error::CoreError),

    #[error(transparent)]
    AclError(#[from] AclError),

    #[error("{source} at {path}:{line}")]
    AuthConfigParse {
        path: String,
        line: usize,
        #[source]
        source: AclError,
    },

    #[error(transparent)]
    StreamError(#[from] StreamError),

    #[error("No authentication mechanism configured, refusing to trust every peer")]
    NoMechanismConfigured,

    #[error("Unknown authentication mechanism '{0}'")]
    UnknownMechanism(String),

    #[error("Authentication mechanism '{mechanism}' has no {frontend} front-end support")]
    UnsupportedFrontend {
        mechanism: String,
        frontend: Frontend,
    },

    #[error("Could not find host certificate at {0}")]
    MissingCertificate(String),

    #[error("Could not find host private key at {0}")]
    MissingPrivateKey(String),

    #[error("Could not find CA certificate at {0}")]
    MissingCaCertificate(String),

    #[error("The {0} front-end cannot read client certificates, serve tls-cert behind the proxy front-end")]
    PeerCertificatesUnavailable(Frontend),

    #[error("Could not find htpasswd file at {0}")]
    MissingHtpasswd(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Reverse lookup failed: {0}")]
    ResolveError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(&'static str),

    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ServiceError {
    /// Errors that must stop the process during startup.
    #[must_use]
    pub const fn is_fatal_setup(&self) -> bool {
        matches!(
            self,
            Self::NoMechanismConfigured
                | Self::UnknownMechanism(_)
                | Self::UnsupportedFrontend { .. }
                | Self::PeerCertificatesUnavailable(_)
                | Self::MissingCertificate(_)
                | Self::MissingPrivateKey(_)
                | Self::MissingCaCertificate(_)
                | Self::MissingHtpasswd(_)
        )
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
