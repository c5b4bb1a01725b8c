use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use overlay_api::auth::extension::JwtVerifier;
use overlay_api::config::Config;
use overlay_api::store::postgres::PgStore;
use overlay_api::stream::router::{EventRouter, RouterConfig, RouterHandle};
use overlay_api::upstream::helix::HelixClient;
use overlay_api::AppState;

#[tokio::main]
async fn main() {
    // Load .env file (silently skip if missing; env vars may be set externally)
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;

    let db = overlay_api::db::pool::connect(&config.database_url).await;
    let store = Arc::new(PgStore::new(db));

    let usernames = Arc::new(HelixClient::new(
        &config.helix_url,
        &config.client_id,
        config.helix_token.clone(),
    ));
    let tokens = Arc::new(
        JwtVerifier::from_base64_secret(&config.client_secret)
            .expect("CLIENT_SECRET must be base64 encoded"),
    );

    let router = EventRouter::spawn(RouterConfig {
        queue_capacity: config.subscriber_queue_capacity,
    });

    let cors = cors_layer(&config.cors_origins);
    tracing::info!(origins = ?config.cors_origins, helix_url = %config.helix_url, "overlay-api configured");

    let state = AppState::new(config, router.clone(), store, usernames, tokens);

    let app = Router::new()
        .merge(overlay_api::routes::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "overlay-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(router.clone()))
        .await
        .expect("server error");

    router.shutdown().await;
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(%origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Resolves on ctrl-c after closing the router, which ends every open SSE
/// stream so graceful shutdown does not wait on them forever.
async fn shutdown_signal(router: RouterHandle) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(?err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
    router.shutdown().await;
}
