use salvo::Router;

mod healthcheck;
mod whoami;

#[must_use]
pub fn routes() -> Router {
    Router::new()
        .push(healthcheck::routes())
        .push(whoami::routes())
}
