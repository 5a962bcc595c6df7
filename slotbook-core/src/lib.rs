pub mod booking;
pub mod error;
pub mod repository;
pub mod query;

pub use booking::{Booking, BookingDetails, NewBooking};
pub use error::{CoreError, CoreResult, StoreError, StoreResult};
pub use repository::{BookingRepository, BookingStore, BookingTransaction, CatalogRepository};
pub use query::{ExperienceDetail, QueryService, SlotAvailability, DEFAULT_REFERENCE_LENGTH};

pub use slotbook_catalog as catalog;
