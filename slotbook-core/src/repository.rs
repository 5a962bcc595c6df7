use async_trait::async_trait;
use chrono::NaiveDate;
use slotbook_catalog::{Experience, Promo, Reservation, Slot};

use crate::booking::{Booking, BookingDetails, NewBooking};
use crate::error::StoreResult;

/// Read access to experiences, slots and promos.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Experiences ordered by id, optionally filtered by a case-insensitive title substring.
    async fn list_experiences(&self, search: Option<&str>) -> StoreResult<Vec<Experience>>;

    async fn get_experience(&self, id: i64) -> StoreResult<Option<Experience>>;

    /// Slots of an experience dated within `[from, until]`, ordered by date then time.
    async fn list_slots(
        &self,
        experience_id: i64,
        from: NaiveDate,
        until: Option<NaiveDate>,
    ) -> StoreResult<Vec<Slot>>;

    async fn get_promo(&self, code: &str) -> StoreResult<Option<Promo>>;
}

/// Read access to committed bookings.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn get_booking(&self, id: i64) -> StoreResult<Option<BookingDetails>>;

    async fn get_booking_by_reference(&self, reference: &str) -> StoreResult<Option<BookingDetails>>;
}

/// Opens booking transactions against the durable store.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn BookingTransaction>>;
}

/// One all-or-nothing unit of work. Dropping it without `commit` rolls it back.
#[async_trait]
pub trait BookingTransaction: Send {
    /// The slot and its owning experience.
    async fn load_slot(&mut self, slot_id: i64) -> StoreResult<Option<(Slot, Experience)>>;

    async fn find_promo(&mut self, code: &str) -> StoreResult<Option<Promo>>;

    /// Atomically commits `quantity` seats on the slot iff `booked + quantity <= capacity`.
    ///
    /// Once this returns `Reserved`, no concurrent transaction can observe the
    /// pre-reservation count for the slot until this one ends.
    async fn reserve_seats(&mut self, slot_id: i64, quantity: i32) -> StoreResult<Reservation>;

    /// Inserts the booking row. Returns `None` when the reference is already taken.
    async fn insert_booking(&mut self, booking: &NewBooking) -> StoreResult<Option<Booking>>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
