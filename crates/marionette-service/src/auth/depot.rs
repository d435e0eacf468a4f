//! Depot helpers carrying authorization context between salvo handlers.

use std::net::IpAddr;
use std::sync::Arc;

use salvo::async_trait;
use serde::Serialize;

use super::authconfig::AuthorizationConfig;
use crate::error::{ServiceError, ServiceResult};

pub mod depot_keys {
    pub const PEER: &str = "__peer";
}

/// The requester as established by the active mechanism.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Peer {
    pub authenticated: bool,
    pub name: String,
    pub address: IpAddr,
}

/// Get the peer stored by the authentication middleware.
///
/// ## Errors
///
/// Returns `InvariantViolation` if authentication did not run for this route.
pub fn get_peer_from_depot(depot: &salvo::Depot) -> ServiceResult<&Peer> {
    depot
        .get::<Peer>(depot_keys::PEER)
        .map_err(|_e| ServiceError::InvariantViolation("Peer not found in depot"))
}

pub struct AuthorizationHandler {
    pub config: Arc<AuthorizationConfig>,
}

#[async_trait]
impl salvo::Handler for AuthorizationHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(Arc::clone(&self.config));
    }
}

/// ## Summary
/// Retrieves the authorization config from the depot.
///
/// ## Errors
/// Returns an error if the authorization config is not found in the depot.
pub fn get_authorization_from_depot(
    depot: &salvo::Depot,
) -> ServiceResult<Arc<AuthorizationConfig>> {
    depot
        .obtain::<Arc<AuthorizationConfig>>()
        .cloned()
        .map_err(|_err| ServiceError::InvariantViolation("Authorization config not found in depot"))
}
