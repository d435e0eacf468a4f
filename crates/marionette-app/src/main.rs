use std::sync::Arc;

use salvo::conn::TcpListener;
use salvo::conn::rustls::{Keycert, RustlsConfig};
use salvo::{Listener, Router};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

use marionette_app::app::api::routes;
use marionette_app::config::ConfigHandler;
use marionette_core::config::load_config;
use marionette_service::auth::{AuthorizationConfig, AuthorizationHandler};
use marionette_service::mechanism::{
    DnsResolver, FileCertificateStore, MechanismHandler, MechanismRegistry, PeerVerification,
    ServerOptions,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting Marionette server");

    let config = load_config()?;

    tracing::info!(
        bind = %config.server.bind_addr(),
        frontend = %config.server.frontend,
        mechanism = ?config.auth.mechanism,
        authconfig = %config.authorization.rest_authconfig.display(),
        "Configuration loaded"
    );

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    let registry = MechanismRegistry::with_builtin(
        &config,
        Arc::new(FileCertificateStore::new(&config.ssl)),
        Arc::new(DnsResolver::from_system_conf()?),
    )?;
    let frontend = config.server.frontend;
    let mechanism = registry
        .active_mechanism(&config.auth)
        .inspect_err(|e| tracing::error!(error = %e, "Cannot select authentication mechanism"))?;
    let server_options = mechanism
        .configure(frontend)
        .inspect_err(|e| tracing::error!(error = %e, %frontend, "Cannot configure front-end"))?;

    let authorization = Arc::new(
        AuthorizationConfig::load(&config.authorization.rest_authconfig)
            .inspect_err(|e| tracing::error!(error = %e, "Cannot load authorization rules"))?,
    );

    let bind_addr = config.server.bind_addr();
    let router = Router::new()
        .hoop(ConfigHandler {
            settings: Arc::new(config),
        })
        .hoop(MechanismHandler {
            mechanism,
            frontend,
        })
        .hoop(AuthorizationHandler {
            config: authorization,
        })
        .push(routes());

    match server_options {
        ServerOptions::Tls(tls) => {
            let mut rustls = RustlsConfig::new(
                Keycert::new()
                    .cert(tls.certificate)
                    .key(tls.private_key),
            );
            if tls.verification == PeerVerification::VerifyPeer {
                // Peers without a certificate yet must still reach the CA.
                rustls = rustls.client_auth_optional(tls.ca_bundle);
            }
            let acceptor = TcpListener::new(bind_addr.clone())
                .rustls(rustls)
                .bind()
                .await;
            tracing::info!(ca_bundle = %tls.ca_bundle_path.display(), "Server listening on https://{bind_addr}");
            salvo::Server::new(acceptor).serve(router).await;
        }
        ServerOptions::Plain => {
            let acceptor = TcpListener::new(bind_addr.clone()).bind().await;
            tracing::info!("Server listening on {bind_addr}");
            salvo::Server::new(acceptor).serve(router).await;
        }
    }

    Ok(())
}
