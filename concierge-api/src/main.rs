use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use concierge_api::{app, worker, AppState};
use concierge_core::providers::KeyValueCache;
use concierge_core::repository::ConciergeStore;
use concierge_store::app_config::Config;
use concierge_store::{DbClient, InMemoryCache, InMemoryStore, RedisClient};
use concierge_trip::{ReservationService, TripContext};
use concierge_vendors::VendorSet;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "concierge_api=debug,concierge_trip=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    info!("Starting AA Voice Concierge API on port {}", config.server.port);

    let store: Arc<dyn ConciergeStore> = match config.database.url.as_deref() {
        Some(url) => {
            let db = DbClient::new(url, &config.database)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            Arc::new(db.store())
        }
        None => {
            warn!("No database configured, using the in-memory store");
            Arc::new(InMemoryStore::new())
        }
    };

    let cache: Arc<dyn KeyValueCache> = match config.redis.url.as_deref() {
        Some(url) => Arc::new(RedisClient::new(url).await.context("Failed to connect to Redis")?),
        None => {
            warn!("No Redis configured, using the in-memory cache");
            Arc::new(InMemoryCache::new())
        }
    };

    let vendors = VendorSet::from_config(&config);
    let trip = TripContext::new(store, cache, vendors, config.business_rules.clone());

    if config.business_rules.seed_demo_data {
        let seeded = ReservationService::new(trip.clone())
            .seed_demo()
            .await
            .context("Failed to seed demo reservations")?;
        info!("Seeded {} demo reservations", seeded);
    }

    let state = AppState::new(trip, &config);
    tokio::spawn(worker::start_reminder_worker(state.clone()));

    let app = app(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("Server error")?;
    Ok(())
}
