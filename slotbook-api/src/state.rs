use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use slotbook_catalog::{PricingConfig, PricingEngine, TaxRate};
use slotbook_core::repository::{BookingRepository, BookingStore, CatalogRepository};
use slotbook_core::QueryService;
use slotbook_order::{BookingCoordinator, RandomReference};
use slotbook_store::app_config::{BusinessRules, Config, StorageBackend};
use slotbook_store::{DbClient, MemoryStore, PgBookingStore, StoreBookingRepository, StoreCatalogRepository};

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<BookingCoordinator>,
    pub queries: QueryService,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        bookings: Arc<dyn BookingRepository>,
        store: Arc<dyn BookingStore>,
        rules: &BusinessRules,
    ) -> Self {
        let pricing = PricingEngine::new(PricingConfig {
            tax_rate: TaxRate::from_decimal(rules.tax_rate),
        });
        let coordinator = BookingCoordinator::new(store, pricing, Duration::from_millis(rules.transaction_timeout_ms))
            .with_reference_source(Arc::new(RandomReference::new(rules.reference_length)));

        Self {
            coordinator: Arc::new(coordinator),
            queries: QueryService::new(catalog, bookings, rules.slot_window_days)
                .with_reference_length(rules.reference_length),
        }
    }

    pub fn in_memory(store: MemoryStore, rules: &BusinessRules) -> Self {
        let store = Arc::new(store);
        Self::new(store.clone(), store.clone(), store, rules)
    }

    /// Wires the backend selected by `storage.backend`.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        match config.storage.backend {
            StorageBackend::Memory => {
                let store = MemoryStore::new();
                if config.storage.seed_demo_data {
                    store.seed_demo().await;
                }
                tracing::warn!("Using the in-memory store; bookings are lost on restart");
                Ok(Self::in_memory(store, &config.business_rules))
            }
            StorageBackend::Postgres => {
                let db = DbClient::from_config(&config.database)
                    .await
                    .context("failed to connect to database")?;
                if config.database.run_migrations {
                    db.migrate().await.context("failed to run migrations")?;
                }
                if config.storage.seed_demo_data {
                    slotbook_store::seed::seed_postgres(&db.pool).await?;
                }
                Ok(Self::new(
                    Arc::new(StoreCatalogRepository::new(db.pool.clone())),
                    Arc::new(StoreBookingRepository::new(db.pool.clone())),
                    Arc::new(PgBookingStore::new(db.pool.clone())),
                    &config.business_rules,
                ))
            }
        }
    }
}
