use salvo::Depot;
use salvo::http::{Method, StatusCode};
use tracing::error;

use marionette_core::types::Operation;
use marionette_service::auth::{ResourceRequest, get_authorization_from_depot, get_peer_from_depot};

/// ## Summary
/// Maps an HTTP method on `/{kind}/{key}` to the operation it performs.
///
/// A GET without a key searches the kind; any other GET finds one resource.
#[must_use]
pub fn operation_for(method: &Method, key: &str) -> Option<Operation> {
    match *method {
        Method::GET | Method::HEAD if key.is_empty() => Some(Operation::Search),
        Method::GET | Method::HEAD => Some(Operation::Find),
        Method::PUT | Method::POST => Some(Operation::Save),
        Method::DELETE => Some(Operation::Destroy),
        _ => None,
    }
}

/// ## Summary
/// Checks the authenticated peer against the rights for `/{kind}/{key}`.
///
/// Must run after [`super::auth::AuthMiddleware`].
///
/// ## Errors
/// Answers 403 when the rights deny the request, 405 for methods that map to
/// no operation and 500 when the depot lacks the peer or the rules.
pub struct AuthorizeMiddleware;

#[salvo::async_trait]
impl salvo::Handler for AuthorizeMiddleware {
    #[tracing::instrument(skip_all, fields(
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
        let Some(kind) = req.param::<String>("kind").filter(|kind| !kind.is_empty()) else {
            tracing::debug!("No resource kind in path");
            res.status_code(StatusCode::NOT_FOUND);
            ctrl.skip_rest();
            return;
        };
        let key = req.param::<String>("key").unwrap_or_default();

        let Some(operation) = operation_for(req.method(), &key) else {
            res.status_code(StatusCode::METHOD_NOT_ALLOWED);
            ctrl.skip_rest();
            return;
        };

        let authorization = match get_authorization_from_depot(depot) {
            Ok(config) => config,
            Err(e) => {
                error!(error = %e, "Failed to get authorization config from depot");
                res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
                ctrl.skip_rest();
                return;
            }
        };
        let request = match get_peer_from_depot(depot) {
            Ok(peer) => ResourceRequest::new(&kind, &key, &peer.name, peer.address, operation),
            Err(e) => {
                error!(error = %e, "Failed to get peer from depot");
                res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
                ctrl.skip_rest();
                return;
            }
        };

        if !authorization.authorize_async(&request).await {
            res.status_code(StatusCode::FORBIDDEN);
            res.render(format!("Forbidden request: {request}"));
            ctrl.skip_rest();
        }
    }
}
