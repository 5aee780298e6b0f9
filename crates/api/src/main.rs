//! API server entry point.

use std::sync::Arc;

use api::AppState;
use api::config::{Config, LogFormat};
use payments::{
    InMemoryPaymentLedger, LocalGateway, PaymentGateway, PaymentLedger, PostgresPaymentLedger,
    YooKassaGateway,
};
use rooms::{
    InMemoryRoomStore, InMemoryRouteHistory, PostgresRoomStore, PostgresRouteHistory, RoomStore,
    RouteHistory,
};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn build_state(config: &Config) -> AppState {
    let gateway: Arc<dyn PaymentGateway> = match config.gateway_config() {
        Some(gateway_config) => {
            tracing::info!(base_url = %gateway_config.base_url, "using YooKassa gateway");
            Arc::new(YooKassaGateway::new(gateway_config).expect("failed to build gateway client"))
        }
        None => {
            tracing::warn!("YooKassa credentials not set, using local gateway");
            Arc::new(LocalGateway::new())
        }
    };

    let (room_store, ledger, history): (
        Arc<dyn RoomStore>,
        Arc<dyn PaymentLedger>,
        Arc<dyn RouteHistory>,
    ) = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await
                .expect("failed to connect to database");
            sqlx::migrate!("../../migrations")
                .run(&pool)
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL stores");
            (
                Arc::new(PostgresRoomStore::new(pool.clone())),
                Arc::new(PostgresPaymentLedger::new(pool.clone())),
                Arc::new(PostgresRouteHistory::new(pool)),
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory stores");
            (
                Arc::new(InMemoryRoomStore::new()),
                Arc::new(InMemoryPaymentLedger::new()),
                Arc::new(InMemoryRouteHistory::new()),
            )
        }
    };

    AppState::new(
        room_store,
        ledger,
        gateway,
        history,
        config.payment_return_url.clone(),
    )
}

#[tokio::main]
async fn main() {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env();
    init_tracing(&config);
    tracing::debug!(?config, "configuration loaded");

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Wire stores, gateway and services
    let state = Arc::new(build_state(&config).await);

    // 4. Build the application
    let app = api::create_app(state, metrics_handle);

    // 5. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
