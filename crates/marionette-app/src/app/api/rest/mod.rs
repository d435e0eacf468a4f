//! The REST resource space, `/{kind}/{key}`.
//!
//! Resource handlers (catalogs, facts, files, reports) are mounted by the
//! embedding application; on its own this router only authenticates and
//! authorizes, then answers that no terminus serves the kind.

use salvo::http::StatusCode;
use salvo::{Request, Response, Router, handler};

use crate::middleware::auth::AuthMiddleware;
use crate::middleware::authorize::AuthorizeMiddleware;

#[handler]
async fn no_terminus(req: &mut Request, res: &mut Response) {
    let kind = req.param::<String>("kind").unwrap_or_default();
    tracing::debug!(kind = %kind, "No terminus for resource kind");
    res.status_code(StatusCode::NOT_FOUND);
    res.render(format!("No terminus for {kind}"));
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("{kind}/{**key}")
        .hoop(AuthMiddleware)
        .hoop(AuthorizeMiddleware)
        .goal(no_terminus)
}
