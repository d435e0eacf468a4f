mod rest;
mod status;

use salvo::Router;

/// ## Summary
/// Constructs the main router: unauthenticated status routes first, then the
/// authorized REST catch-all.
#[must_use]
pub fn routes() -> Router {
    Router::new().push(status::routes()).push(rest::routes())
}
