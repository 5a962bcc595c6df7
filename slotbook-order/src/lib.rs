pub mod request;
pub mod reference;
pub mod coordinator;

pub use request::{BookingRequest, ValidBookingRequest};
pub use reference::{RandomReference, ReferenceSource};
pub use coordinator::{BookingConfirmation, BookingCoordinator, MAX_REFERENCE_ATTEMPTS};
