use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use slotbook_catalog::{PriceBreakdown, PricingEngine, Reservation};
use slotbook_core::{Booking, BookingStore, BookingTransaction, CoreError, CoreResult, NewBooking, StoreError};
use tracing::{debug, error, info, warn};

use crate::reference::{RandomReference, ReferenceSource};
use crate::request::{BookingRequest, ValidBookingRequest};

/// Reference draws per booking before giving up on the transaction.
pub const MAX_REFERENCE_ATTEMPTS: usize = 5;

/// What the caller learns about a committed booking.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub booking_id: i64,
    pub reference: String,
    pub total_cents: i64,
    pub price: PriceBreakdown,
    pub promo_applied: Option<String>,
}

/// Runs the booking transaction: seat reservation, pricing and the booking
/// insert either all commit together or none of them do.
pub struct BookingCoordinator {
    store: Arc<dyn BookingStore>,
    pricing: PricingEngine,
    references: Arc<dyn ReferenceSource>,
    transaction_timeout: Duration,
}

impl BookingCoordinator {
    pub fn new(store: Arc<dyn BookingStore>, pricing: PricingEngine, transaction_timeout: Duration) -> Self {
        Self {
            store,
            pricing,
            references: Arc::new(RandomReference::default()),
            transaction_timeout,
        }
    }

    pub fn with_reference_source(mut self, references: Arc<dyn ReferenceSource>) -> Self {
        self.references = references;
        self
    }

    /// Validates the raw request, then books it.
    pub async fn create_booking(&self, request: BookingRequest) -> CoreResult<BookingConfirmation> {
        let request = request.validate()?;
        self.book(&request).await
    }

    /// Books an already validated request.
    ///
    /// Everything up to the commit runs under the configured timeout. On expiry
    /// the in-flight transaction is dropped, which rolls it back. The commit is
    /// always awaited to completion.
    pub async fn book(&self, request: &ValidBookingRequest) -> CoreResult<BookingConfirmation> {
        let outcome = match tokio::time::timeout(self.transaction_timeout, self.stage(request)).await {
            Ok(Ok(staged)) => staged.commit().await,
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CoreError::Timeout(self.transaction_timeout)),
        };

        match &outcome {
            Ok(confirmation) => info!(
                "Booking {} ({}) committed: slot {}, qty {}, total {} cents",
                confirmation.booking_id, confirmation.reference, request.slot_id, request.quantity, confirmation.total_cents
            ),
            Err(CoreError::CapacityExceeded { requested, available, .. }) => info!(
                "Booking rejected for slot {}: requested {}, available {}",
                request.slot_id, requested, available
            ),
            Err(e @ CoreError::CommitUncertain(_)) => {
                error!("Booking for slot {} may have been committed: {}", request.slot_id, e)
            }
            Err(e) if e.is_transient() => warn!("Booking for slot {} aborted, retryable: {}", request.slot_id, e),
            Err(e) => warn!("Booking for slot {} failed: {}", request.slot_id, e),
        }
        outcome
    }

    /// Runs the booking up to, but not including, the commit.
    async fn stage(&self, request: &ValidBookingRequest) -> CoreResult<StagedBooking> {
        let mut tx = self.store.begin().await?;

        let (slot, experience) = match tx.load_slot(request.slot_id).await? {
            Some(found) => found,
            None => return abort(tx, CoreError::not_found("Slot", request.slot_id)).await,
        };

        if let Some(expected) = request.experience_id {
            if expected != experience.id {
                return abort(tx, CoreError::not_found("Experience", expected)).await;
            }
        }

        // unknown or inactive codes book at full price
        let promo = match request.promo_code.as_deref() {
            Some(code) => tx.find_promo(code).await?.filter(|p| p.active),
            None => None,
        };
        if promo.is_none() && request.promo_code.is_some() {
            debug!("Promo code ignored for slot {}", slot.id);
        }

        match tx.reserve_seats(slot.id, request.quantity).await? {
            Reservation::Reserved { booked, capacity } => {
                debug!("Reserved {} seats on slot {} ({}/{})", request.quantity, slot.id, booked, capacity);
            }
            Reservation::CapacityExceeded { requested, available } => {
                let err = CoreError::CapacityExceeded {
                    slot_id: slot.id,
                    requested,
                    available,
                };
                return abort(tx, err).await;
            }
            Reservation::InvalidQuantity { requested } => {
                return abort(tx, CoreError::validation(format!("qty must be > 0, got {}", requested))).await;
            }
            Reservation::SlotNotFound => {
                return abort(tx, CoreError::not_found("Slot", slot.id)).await;
            }
        }

        let price = match self.pricing.quote(experience.price_cents, request.quantity, promo.as_ref()) {
            Ok(price) => price,
            Err(e) => return abort(tx, e.into()).await,
        };

        let mut new_booking = NewBooking {
            reference: String::new(),
            experience_id: experience.id,
            slot_id: slot.id,
            full_name: request.full_name.clone(),
            email: request.email.clone(),
            quantity: request.quantity,
            price,
            promo_code: promo.as_ref().map(|p| p.code.clone()),
        };

        let mut inserted = None;
        for attempt in 1..=MAX_REFERENCE_ATTEMPTS {
            new_booking.reference = self.references.next_reference();
            if let Some(booking) = tx.insert_booking(&new_booking).await? {
                inserted = Some(booking);
                break;
            }
            warn!("Reference {} already taken (attempt {})", new_booking.reference, attempt);
        }

        let booking = match inserted {
            Some(booking) => booking,
            None => {
                let err = StoreError::Conflict("could not allocate a unique booking reference".to_string());
                return abort(tx, err.into()).await;
            }
        };

        Ok(StagedBooking { tx, booking, new_booking })
    }
}

/// A booking whose writes are done and only await the commit.
struct StagedBooking {
    tx: Box<dyn BookingTransaction>,
    booking: Booking,
    new_booking: NewBooking,
}

impl StagedBooking {
    /// Once COMMIT is sent its outcome is unknown until acknowledged, so a
    /// failure here is `CommitUncertain` and never transient.
    async fn commit(self) -> CoreResult<BookingConfirmation> {
        let StagedBooking { tx, booking, new_booking } = self;
        tx.commit().await.map_err(CoreError::CommitUncertain)?;

        debug!("Booking {} for {}", booking.reference, booking.email);
        Ok(BookingConfirmation {
            booking_id: booking.id,
            reference: booking.reference,
            total_cents: booking.total_cents,
            price: new_booking.price,
            promo_applied: new_booking.promo_code,
        })
    }
}

/// Rolls back and returns `err`. A failed rollback is logged; the store
/// discards the transaction either way.
async fn abort<T>(tx: Box<dyn BookingTransaction>, err: CoreError) -> CoreResult<T> {
    if let Err(rollback_err) = tx.rollback().await {
        warn!("Rollback failed: {}", rollback_err);
    }
    Err(err)
}
