use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slotbook_catalog::{Experience, PriceBreakdown, Slot};
use slotbook_shared::Masked;

/// A booking about to be written inside a booking transaction.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub reference: String,
    pub experience_id: i64,
    pub slot_id: i64,
    pub full_name: Masked<String>,
    pub email: Masked<String>,
    pub quantity: i32,
    pub price: PriceBreakdown,
    /// Code of the promo that was applied, if any.
    pub promo_code: Option<String>,
}

/// A committed booking. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: i64,
    #[serde(rename = "refId")]
    pub reference: String,
    pub experience_id: i64,
    pub slot_id: i64,
    pub full_name: Masked<String>,
    pub email: Masked<String>,
    #[serde(rename = "qty")]
    pub quantity: i32,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    #[serde(rename = "taxesCents")]
    pub tax_cents: i64,
    pub total_cents: i64,
    pub promo_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Materializes a committed row from what was inserted.
    pub fn from_new(id: i64, new: &NewBooking, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            reference: new.reference.clone(),
            experience_id: new.experience_id,
            slot_id: new.slot_id,
            full_name: new.full_name.clone(),
            email: new.email.clone(),
            quantity: new.quantity,
            subtotal_cents: new.price.subtotal_cents,
            discount_cents: new.price.discount_cents,
            tax_cents: new.price.tax_cents,
            total_cents: new.price.total_cents,
            promo_code: new.promo_code.clone(),
            created_at,
        }
    }
}

/// A booking joined with its slot and experience, as served by booking lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub slot: Slot,
    pub experience: Experience,
}
