pub mod app_config;
pub mod database;
pub mod catalog_repo;
pub mod booking_repo;
pub mod memory;
pub mod seed;

pub use app_config::Config;
pub use database::DbClient;
pub use catalog_repo::StoreCatalogRepository;
pub use booking_repo::{PgBookingStore, StoreBookingRepository};
pub use memory::MemoryStore;
