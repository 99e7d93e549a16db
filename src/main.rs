//! hotel-pricing server entry point.
//!
//! Wires persistence, cache and notifier from the environment and starts the
//! Axum HTTP server.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use hotel_pricing::api;
use hotel_pricing::app_state::AppState;
use hotel_pricing::cache::{CacheBackend, MemoryBackend, PriceCache, RedisBackend};
use hotel_pricing::config::{CacheBackendKind, ServiceConfig};
use hotel_pricing::notify::{LogNotifier, Notifier, WebhookNotifier};
use hotel_pricing::persistence::{MemoryStore, OccupancyProvider, PostgresStore, PricingStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env().context("invalid LISTEN_ADDR")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    tracing::info!(addr = %config.listen_addr, "starting hotel-pricing");

    // Persistence
    let (store, occupancy): (Arc<dyn PricingStore>, Arc<dyn OccupancyProvider>) =
        if config.persistence_enabled {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .min_connections(config.database_min_connections)
                .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
                .connect(&config.database_url)
                .await
                .context("connecting to PostgreSQL")?;
            let store = Arc::new(PostgresStore::new(pool));
            if config.run_migrations {
                store.migrate().await.context("running migrations")?;
            }
            tracing::info!("PostgreSQL persistence enabled");
            (
                Arc::clone(&store) as Arc<dyn PricingStore>,
                store as Arc<dyn OccupancyProvider>,
            )
        } else {
            tracing::warn!("persistence disabled, using in-memory store");
            let store = Arc::new(MemoryStore::new());
            (
                Arc::clone(&store) as Arc<dyn PricingStore>,
                store as Arc<dyn OccupancyProvider>,
            )
        };

    // Cache
    let primary: Arc<dyn CacheBackend> = match config.cache.backend {
        CacheBackendKind::Redis => Arc::new(
            RedisBackend::new(&config.cache.redis_url(), config.cache.op_timeout)
                .context("invalid Redis configuration")?,
        ),
        CacheBackendKind::Memory => {
            tracing::warn!("using in-process primary cache");
            Arc::new(MemoryBackend::new())
        }
    };
    let cache = Arc::new(PriceCache::new(
        primary,
        config.cache.key_prefix.clone(),
        config.cache.ttls,
        config.cache.fallback_capacity,
    ));
    if !cache.health_check().await {
        tracing::warn!("primary cache unavailable at startup, serving from fallback");
    }

    // Notifications
    let notifier: Arc<dyn Notifier> = match &config.notifier.webhook_url {
        Some(url) => Arc::new(
            WebhookNotifier::new(
                url.clone(),
                config.notifier.recipient.clone(),
                config.notifier.timeout,
            )
            .context("building webhook notifier")?,
        ),
        None => {
            tracing::info!("NOTIFY_WEBHOOK_URL not set, approval requests are only logged");
            Arc::new(LogNotifier)
        }
    };

    let app_state = AppState::new(store, occupancy, cache, notifier, config.engine.clone());

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
