use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use reqwest::ClientBuilder;
use salvo::async_trait;

use marionette_core::config::{AuthConfig, Frontend, Settings};

use super::basic::{BASIC_CREDENTIAL_MECHANISM, BasicClient, BasicNativeServer, BasicProxyServer};
use super::certificate::CertificateStore;
use super::frontend::PeerRequest;
use super::resolve::NodeResolver;
use super::strategy::{Authentication, ClientOptions, ClientStrategy, ServerOptions, ServerStrategy};
use super::tls::{TLS_CERT_MECHANISM, TlsClient, TlsNativeServer, TlsProxyServer};
use crate::error::{ServiceError, ServiceResult};

struct Mechanism {
    name: String,
    client: Arc<dyn ClientStrategy>,
    servers: HashMap<Frontend, Arc<dyn ServerStrategy>>,
}

/// All known mechanisms, by name.
#[derive(Default)]
pub struct MechanismRegistry {
    mechanisms: HashMap<String, Arc<Mechanism>>,
}

impl MechanismRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ## Summary
    /// A registry holding `tls-cert` and `basic-credential`, wired to the
    /// given settings and collaborators.
    ///
    /// ## Errors
    /// Returns an error if a built-in strategy cannot be constructed.
    pub fn with_builtin(
        settings: &Settings,
        store: Arc<dyn CertificateStore>,
        resolver: Arc<dyn NodeResolver>,
    ) -> ServiceResult<Self> {
        let mut registry = Self::new();

        let tls_native: Arc<dyn ServerStrategy> =
            Arc::new(TlsNativeServer::new(Arc::clone(&store), Arc::clone(&resolver)));
        let tls_proxy: Arc<dyn ServerStrategy> =
            Arc::new(TlsProxyServer::new(&settings.ssl, Arc::clone(&resolver))?);
        registry.register_mechanism(
            TLS_CERT_MECHANISM,
            Arc::new(TlsClient::new(store)),
            HashMap::from([(Frontend::Native, tls_native), (Frontend::Proxy, tls_proxy)]),
        );

        let basic = settings.auth.basic.clone().unwrap_or_default();
        let basic_native: Arc<dyn ServerStrategy> =
            Arc::new(BasicNativeServer::new(&basic, Arc::clone(&resolver)));
        let basic_proxy: Arc<dyn ServerStrategy> = Arc::new(BasicProxyServer::new(resolver));
        registry.register_mechanism(
            BASIC_CREDENTIAL_MECHANISM,
            Arc::new(BasicClient::new(&basic)),
            HashMap::from([(Frontend::Native, basic_native), (Frontend::Proxy, basic_proxy)]),
        );

        Ok(registry)
    }

    /// Registers a mechanism, replacing any previous one of the same name.
    pub fn register_mechanism(
        &mut self,
        name: &str,
        client: Arc<dyn ClientStrategy>,
        servers: HashMap<Frontend, Arc<dyn ServerStrategy>>,
    ) {
        let mechanism = Arc::new(Mechanism {
            name: name.to_string(),
            client,
            servers,
        });
        if self.mechanisms.insert(name.to_string(), mechanism).is_some() {
            tracing::warn!(mechanism = name, "Replaced authentication mechanism");
        }
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.mechanisms.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// ## Errors
    /// Returns `UnknownMechanism` if nothing is registered under `name`.
    pub fn select(&self, name: &str) -> ServiceResult<ActiveMechanism> {
        self.mechanisms
            .get(name)
            .map(|mechanism| ActiveMechanism {
                inner: Arc::clone(mechanism),
            })
            .ok_or_else(|| ServiceError::UnknownMechanism(name.to_string()))
    }

    /// ## Summary
    /// Resolves the process-wide mechanism named by `auth.mechanism`.
    ///
    /// ## Errors
    /// Returns `NoMechanismConfigured` when no mechanism is named, and
    /// `UnknownMechanism` for a name that is not registered.
    #[tracing::instrument(skip_all)]
    pub fn active_mechanism(&self, config: &AuthConfig) -> ServiceResult<ActiveMechanism> {
        let name = config
            .mechanism
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(ServiceError::NoMechanismConfigured)?;

        let active = self.select(name)?;
        tracing::info!(mechanism = name, "Selected authentication mechanism");
        Ok(active)
    }
}

/// The mechanism chosen at startup. Cheap to clone and never changes.
#[derive(Clone)]
pub struct ActiveMechanism {
    inner: Arc<Mechanism>,
}

impl ActiveMechanism {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn client(&self) -> &dyn ClientStrategy {
        self.inner.client.as_ref()
    }

    #[must_use]
    pub fn supports(&self, frontend: Frontend) -> bool {
        self.inner.servers.contains_key(&frontend)
    }

    /// ## Errors
    /// Returns `UnsupportedFrontend` if the mechanism has no strategy for it.
    pub fn server(&self, frontend: Frontend) -> ServiceResult<&dyn ServerStrategy> {
        self.inner
            .servers
            .get(&frontend)
            .map(Arc::as_ref)
            .ok_or_else(|| ServiceError::UnsupportedFrontend {
                mechanism: self.inner.name.clone(),
                frontend,
            })
    }

    /// ## Errors
    /// Returns the strategy's fatal setup error, or `UnsupportedFrontend`.
    pub fn configure(&self, frontend: Frontend) -> ServiceResult<ServerOptions> {
        self.server(frontend)?.configure()
    }

    /// ## Summary
    /// Runs the client `init` and `setup_outbound_connection` hooks.
    ///
    /// ## Errors
    /// Returns an error if either hook fails.
    pub fn setup_client(
        &self,
        options: &ClientOptions,
        builder: ClientBuilder,
    ) -> ServiceResult<ClientBuilder> {
        self.client().init(options)?;
        self.client().setup_outbound_connection(builder)
    }

    /// ## Errors
    /// Returns `UnsupportedFrontend` if the mechanism has no strategy for it.
    pub async fn authenticate(
        &self,
        frontend: Frontend,
        address: IpAddr,
        request: &dyn PeerRequest,
    ) -> ServiceResult<Authentication> {
        let auth = self.server(frontend)?.authenticate(address, request).await;
        tracing::debug!(
            mechanism = self.name(),
            %frontend,
            peer = %auth.peer_name,
            authenticated = auth.authenticated,
            "Authenticated peer"
        );
        Ok(auth)
    }
}

impl std::fmt::Debug for ActiveMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveMechanism")
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

/// Injects the active mechanism and the front-end it serves into the depot.
pub struct MechanismHandler {
    pub mechanism: ActiveMechanism,
    pub frontend: Frontend,
}

#[async_trait]
impl salvo::Handler for MechanismHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(self.mechanism.clone());
        depot.inject(self.frontend);
    }
}

/// ## Summary
/// Retrieves the active mechanism and front-end from the depot.
///
/// ## Errors
/// Returns an error if the `MechanismHandler` did not run.
pub fn get_mechanism_from_depot(depot: &salvo::Depot) -> ServiceResult<(ActiveMechanism, Frontend)> {
    let mechanism = depot
        .obtain::<ActiveMechanism>()
        .cloned()
        .map_err(|_err| ServiceError::InvariantViolation("Active mechanism not found in depot"))?;
    let frontend = depot
        .obtain::<Frontend>()
        .copied()
        .map_err(|_err| ServiceError::InvariantViolation("Front-end not found in depot"))?;
    Ok((mechanism, frontend))
}
