//! Best-effort peer naming by reverse DNS.

use std::collections::HashMap;
use std::net::IpAddr;

use hickory_resolver::TokioAsyncResolver;
use salvo::async_trait;

use crate::error::{ServiceError, ServiceResult};

#[async_trait]
pub trait NodeResolver: Send + Sync {
    /// ## Errors
    /// Returns `ResolveError` when no name is known for the address.
    async fn reverse_lookup(&self, address: IpAddr) -> ServiceResult<String>;
}

/// Reverse lookups against the system's configured name servers.
pub struct DnsResolver {
    inner: TokioAsyncResolver,
}

impl DnsResolver {
    /// ## Errors
    /// Returns `InvalidConfiguration` if the system resolver configuration
    /// cannot be read.
    pub fn from_system_conf() -> ServiceResult<Self> {
        let inner = TokioAsyncResolver::tokio_from_system_conf().map_err(|e| {
            ServiceError::InvalidConfiguration(format!("Failed to read resolver configuration: {e}"))
        })?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl NodeResolver for DnsResolver {
    async fn reverse_lookup(&self, address: IpAddr) -> ServiceResult<String> {
        let lookup = self
            .inner
            .reverse_lookup(address)
            .await
            .map_err(|e| ServiceError::ResolveError(format!("{address}: {e}")))?;

        lookup
            .iter()
            .next()
            .map(|name| name.to_string().trim_end_matches('.').to_string())
            .ok_or_else(|| ServiceError::ResolveError(format!("{address}: no PTR record")))
    }
}

/// A fixed address table, for hosts without usable reverse DNS.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    names: HashMap<IpAddr, String>,
}

impl StaticResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_name(mut self, address: IpAddr, name: &str) -> Self {
        self.names.insert(address, name.to_string());
        self
    }
}

#[async_trait]
impl NodeResolver for StaticResolver {
    async fn reverse_lookup(&self, address: IpAddr) -> ServiceResult<String> {
        self.names
            .get(&address)
            .cloned()
            .ok_or_else(|| ServiceError::ResolveError(format!("{address}: unknown address")))
    }
}

/// ## Summary
/// Names the peer at `address`, falling back to the address itself when the
/// lookup fails.
pub async fn resolve_node(resolver: &dyn NodeResolver, address: IpAddr) -> String {
    match resolver.reverse_lookup(address).await {
        Ok(name) => name,
        Err(err) => {
            tracing::debug!(%address, error = %err, "Reverse lookup failed, using address as peer name");
            address.to_string()
        }
    }
}
