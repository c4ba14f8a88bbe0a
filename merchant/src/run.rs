use axum::Router;
use axum::http::Method;
use dotenvy::dotenv;
use solana_pay::SolanaPayClient;
use solana_pay::chain::RpcPool;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors;

use crate::config::Config;
use crate::handlers::{self, MerchantState};
use crate::util::{SigDown, Telemetry};

/// Starts the transaction-request server.
///
/// - Loads `.env` variables.
/// - Installs the `tracing` subscriber.
/// - Reads the configuration and connects the RPC pool.
/// - Serves `/tx` until SIGTERM or SIGINT.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // solana-client's HTTPS stack needs a process-wide rustls provider.
    let _ = rustls::crypto::CryptoProvider::install_default(
        rustls::crypto::ring::default_provider(),
    );

    dotenv().ok();

    let telemetry = Telemetry::new()
        .with_name(env!("CARGO_PKG_NAME"))
        .with_version(env!("CARGO_PKG_VERSION"))
        .register();

    let config = Config::load()?;

    let pool = RpcPool::from_settings(config.rpc())?;
    tracing::info!(
        cluster = %config.rpc().cluster,
        endpoints = pool.len(),
        recipient = %config.request().recipient(),
        "RPC pool ready"
    );
    let client = SolanaPayClient::new(pool).with_build_options(config.build().clone());
    let state = Arc::new(MerchantState {
        client,
        request: config.request().clone(),
        metadata: config.metadata().clone(),
        message: config.message().map(str::to_string),
    });

    let http_endpoints = Router::new()
        .merge(handlers::routes().with_state(state))
        .layer(telemetry.http_tracing())
        .layer(
            cors::CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(cors::Any),
        );

    let addr = SocketAddr::new(config.host(), config.port());
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .inspect_err(|e| tracing::error!("Failed to bind to {}: {}", addr, e))?;

    let sig_down = SigDown::try_new()?;
    let cancellation_token = sig_down.cancellation_token();
    axum::serve(listener, http_endpoints)
        .with_graceful_shutdown(async move { cancellation_token.cancelled().await })
        .await?;
    sig_down.recv().await;
    tracing::info!("Server stopped");

    Ok(())
}
