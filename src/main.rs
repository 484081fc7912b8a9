use algoscreen::application::handlers::screening_handler::{filter_symbols, health_check};
use algoscreen::config::ScreenerConfig;
use algoscreen::domain::repositories::market_data_client::MarketDataClient;
use algoscreen::domain::services::screening::ScreeningService;
use algoscreen::infrastructure::binance_client::BinanceClient;
use algoscreen::rate_limit::{create_rate_limiter, rate_limit_middleware, RateLimiterConfig};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Filter requests are a handful of fields
const MAX_REQUEST_BODY_BYTES: usize = 16 * 1024;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "algoscreen=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ScreenerConfig::from_env();
    info!(
        binance = %config.binance_base_url,
        max_concurrent_fetches = config.max_concurrent_fetches,
        lookback = config.lookback,
        "Starting screener"
    );

    let client: Arc<dyn MarketDataClient> = Arc::new(BinanceClient::new(config.binance_config())?);
    let service = Arc::new(ScreeningService::new(
        client,
        config.max_concurrent_fetches,
        config.lookback,
    ));

    let limiter = create_rate_limiter(RateLimiterConfig {
        requests_per_minute: config.requests_per_minute,
    });

    let api = Router::new()
        .route("/filter", post(filter_symbols))
        .route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
        .with_state(service);

    let app = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES)),
        );

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!("Listening on {}", config.bind_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C signal"),
            Err(e) => error!("Failed to install Ctrl+C handler: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received SIGTERM signal");
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
