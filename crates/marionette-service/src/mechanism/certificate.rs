//! Access to the host's TLS material, provided by the certificate subsystem.

use std::path::{Path, PathBuf};

use marionette_core::config::SslConfig;

use crate::error::ServiceResult;

/// PEM encoded material on disk; `None` means not issued yet.
pub trait CertificateStore: Send + Sync {
    /// ## Errors
    /// Returns an error if the material exists but cannot be read.
    fn host_certificate(&self) -> ServiceResult<Option<Vec<u8>>>;

    /// ## Errors
    /// Returns an error if the material exists but cannot be read.
    fn host_private_key(&self) -> ServiceResult<Option<Vec<u8>>>;

    /// ## Errors
    /// Returns an error if the material exists but cannot be read.
    fn ca_certificate(&self) -> ServiceResult<Option<Vec<u8>>>;

    fn host_certificate_path(&self) -> &Path;
    fn host_private_key_path(&self) -> &Path;
    fn ca_certificate_path(&self) -> &Path;
}

pub struct FileCertificateStore {
    host_cert: PathBuf,
    host_private_key: PathBuf,
    local_ca_cert: PathBuf,
}

impl FileCertificateStore {
    #[must_use]
    pub fn new(config: &SslConfig) -> Self {
        Self {
            host_cert: config.host_cert.clone(),
            host_private_key: config.host_private_key.clone(),
            local_ca_cert: config.local_ca_cert.clone(),
        }
    }
}

fn read_optional(path: &Path) -> ServiceResult<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::trace!(path = %path.display(), "TLS material not present");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

impl CertificateStore for FileCertificateStore {
    fn host_certificate(&self) -> ServiceResult<Option<Vec<u8>>> {
        read_optional(&self.host_cert)
    }

    fn host_private_key(&self) -> ServiceResult<Option<Vec<u8>>> {
        read_optional(&self.host_private_key)
    }

    fn ca_certificate(&self) -> ServiceResult<Option<Vec<u8>>> {
        read_optional(&self.local_ca_cert)
    }

    fn host_certificate_path(&self) -> &Path {
        &self.host_cert
    }

    fn host_private_key_path(&self) -> &Path {
        &self.host_private_key
    }

    fn ca_certificate_path(&self) -> &Path {
        &self.local_ca_cert
    }
}
