use std::net::{IpAddr, Ipv4Addr};

use salvo::Depot;
use tracing::error;

use marionette_service::auth::Peer;
use marionette_service::auth::depot::depot_keys;
use marionette_service::mechanism::{SalvoPeerRequest, get_mechanism_from_depot};

/// ## Summary
/// Address of the connected peer, `0.0.0.0` when the listener does not know it.
#[must_use]
pub fn peer_address(req: &salvo::Request) -> IpAddr {
    let remote = req.remote_addr();
    if let Some(v4) = remote.as_ipv4() {
        IpAddr::V4(*v4.ip())
    } else if let Some(v6) = remote.as_ipv6() {
        IpAddr::V6(*v6.ip())
    } else {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    }
}

/// ## Summary
/// Authenticates the peer with the active mechanism and stores a [`Peer`] in
/// the depot.
///
/// An unauthenticated peer is not rejected here; authorization decides what
/// it may access.
///
/// ## Errors
/// Answers 500 if the mechanism is missing from the depot or does not serve
/// the configured front-end.
pub struct AuthMiddleware;

#[salvo::async_trait]
impl salvo::Handler for AuthMiddleware {
    #[tracing::instrument(skip(self, req, depot, res, ctrl), fields(
        method = %req.method(),
        path = %req.uri().path()
    ))]
    async fn handle(
        &self,
        req: &mut salvo::Request,
        depot: &mut Depot,
        res: &mut salvo::Response,
        ctrl: &mut salvo::FlowCtrl,
    ) {
        tracing::trace!("Authenticating request");

        let (mechanism, frontend) = match get_mechanism_from_depot(depot) {
            Ok(found) => found,
            Err(e) => {
                error!(error = %e, "Failed to get mechanism from depot");
                res.status_code(salvo::http::StatusCode::INTERNAL_SERVER_ERROR);
                ctrl.skip_rest();
                return;
            }
        };

        let address = peer_address(req);
        let peer_request = SalvoPeerRequest::new(req);

        match mechanism.authenticate(frontend, address, &peer_request).await {
            Ok(auth) => {
                depot.insert(
                    depot_keys::PEER,
                    Peer {
                        authenticated: auth.authenticated,
                        name: auth.peer_name,
                        address,
                    },
                );
            }
            Err(e) => {
                error!(error = %e, "Authentication failed with error");
                res.status_code(salvo::http::StatusCode::INTERNAL_SERVER_ERROR);
                res.body("Internal Server Error");
                ctrl.skip_rest();
            }
        }
    }
}
