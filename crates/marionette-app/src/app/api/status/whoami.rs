use salvo::prelude::Json;
use salvo::{Depot, Router, handler};
use serde_json::json;

use marionette_core::constants::WHOAMI_ROUTE_COMPONENT;
use marionette_service::auth::get_peer_from_depot;

use crate::config::get_config_from_depot;
use crate::middleware::auth::AuthMiddleware;

/// ## Summary
/// Returns the peer as established by `AuthMiddleware`, together with the
/// mechanism and front-end that established it.
#[handler]
async fn whoami(depot: &Depot) -> Json<serde_json::Value> {
    let mechanism = get_config_from_depot(depot)
        .ok()
        .map(|settings| (settings.auth.mechanism.clone(), settings.server.frontend));

    match get_peer_from_depot(depot) {
        Ok(peer) => Json(json!({
            "name": peer.name,
            "authenticated": peer.authenticated,
            "address": peer.address,
            "mechanism": mechanism.as_ref().and_then(|(name, _)| name.clone()),
            "frontend": mechanism.map(|(_, frontend)| frontend.as_str()),
        })),
        Err(_) => Json(json!({"error":"Peer not found in depot"})),
    }
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(WHOAMI_ROUTE_COMPONENT)
        .hoop(AuthMiddleware)
        .get(whoami)
}
