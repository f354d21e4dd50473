pub mod domain;
pub mod infra;
pub mod subsystems;

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use axum::extract::FromRef;
use domain::{
    orders::{
        MemoryOrderRepository, OrderFeed, OrderRepository, PendingOrders, PgOrderRepository,
        SweepReport,
    },
    promo::{MemoryPromoRepository, PgPromoRepository, PromoRepository},
    storage::FileStorage,
};
use infra::{DatabaseSettings, Settings};
use jiff::Timestamp;
use sqlx::{PgPool, postgres::PgPoolOptions};
use subsystems::{OrderListener, WebServer};
use tokio_graceful_shutdown::{IntoSubsystem, SubsystemBuilder, Toplevel};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub settings: Settings,
    pub pool: PgPool,
    pub orders: Arc<dyn OrderRepository>,
    pub promos: Arc<dyn PromoRepository>,
    pub feed: OrderFeed,
}

impl AppState {
    /// State backed by in-process repositories. The pool is lazy and never connects unless
    /// something uses it directly.
    pub fn in_memory(
        settings: Settings,
        orders: MemoryOrderRepository,
        promos: Arc<MemoryPromoRepository>,
    ) -> Self {
        let pool = PgPoolOptions::new().connect_lazy_with(settings.database.with_db_name());
        let feed = OrderFeed::default();
        let orders = orders.with_feed(feed.clone()).with_promos(promos.clone());
        Self {
            settings,
            pool,
            orders: Arc::new(orders),
            promos,
            feed,
        }
    }
}

pub fn build_subsystems(state: AppState) -> Toplevel {
    let order_listener = OrderListener::new(state.clone());
    let webserver = WebServer::new(state);

    // Setup and execute subsystem tree
    Toplevel::new(async |s| {
        s.start(SubsystemBuilder::new(
            "OrderListener",
            order_listener.into_subsystem(),
        ));
        s.start(SubsystemBuilder::new(
            "Webserver",
            webserver.into_subsystem(),
        ));
    })
}

pub async fn start_server(state: AppState) -> anyhow::Result<()> {
    build_subsystems(state)
        .catch_signals()
        .handle_shutdown_requests(Duration::from_millis(2000))
        .await
        .map_err(Into::into)
}

pub fn configure_tracing(settings: &Settings) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(
        settings.application.logs_directory.clone(),
        "food_delivery.log",
    );
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(non_blocking)
        .init();
    _guard
}

pub async fn construct_app_state(settings: Settings) -> Result<AppState, anyhow::Error> {
    let pool = construct_db_pool(&settings.database).await?;
    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Failed to run database migrations.")?;

    Ok(AppState {
        orders: Arc::new(PgOrderRepository::new(pool.clone())),
        promos: Arc::new(PgPromoRepository::new(pool.clone())),
        feed: OrderFeed::default(),
        settings,
        pool,
    })
}

pub async fn construct_db_pool(settings: &DatabaseSettings) -> Result<PgPool, anyhow::Error> {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_with(settings.with_db_name())
        .await
        .context("Failed to connect to Postgres database.\n1. Check database is running.\n2. Check Postgres database settings in configuration file(s).")
}

/// Reconciles orders left waiting for payment in the configured local storage.
pub async fn sweep_pending_orders(state: &AppState) -> anyhow::Result<SweepReport> {
    let storage = FileStorage::new(state.settings.cart.storage_directory.as_str())
        .context("Could not open local storage.")?;
    let pending = PendingOrders::new(
        Arc::new(storage),
        state.settings.verification.pending_timeout(),
    );
    pending
        .sweep(state.orders.as_ref(), Timestamp::now())
        .await
        .context("Could not sweep pending orders.")
}
