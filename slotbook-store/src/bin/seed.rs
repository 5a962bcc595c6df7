//! # Demo Catalog Seeder
//!
//! Loads the demo experiences, slots and promo codes into Postgres.
//!
//! ## Usage
//! ```bash
//! # Uses database.url from config/, or SLOTBOOK__DATABASE__URL
//! cargo run -p slotbook-store --bin seed
//! ```
//!
//! Safe to re-run: experiences and promos are upserted, existing slots are left alone.

use anyhow::Context;
use slotbook_store::{seed, Config, DbClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slotbook_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("failed to load configuration")?;
    let db = DbClient::from_config(&config.database)
        .await
        .context("failed to connect to database")?;
    db.migrate().await.context("failed to run migrations")?;

    let summary = seed::seed_postgres(&db.pool).await?;
    println!(
        "Seeded {} experiences, {} new slots, {} promos",
        summary.experiences, summary.slots, summary.promos
    );
    Ok(())
}
