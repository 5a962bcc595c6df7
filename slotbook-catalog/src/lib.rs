pub mod experience;
pub mod promo;
pub mod pricing;
pub mod inventory;

pub use experience::{Experience, Slot};
pub use promo::{Promo, PromoKind};
pub use pricing::{PriceBreakdown, PricingConfig, PricingEngine, PricingError, TaxRate};
pub use inventory::{Reservation, SlotInventory};
