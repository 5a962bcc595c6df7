use std::sync::Arc;

use chrono::{Days, NaiveDate};
use serde::Serialize;
use slotbook_catalog::{Experience, Promo, Slot};

use crate::booking::BookingDetails;
use crate::error::{CoreError, CoreResult};
use crate::repository::{BookingRepository, CatalogRepository};

/// A slot as shown on an experience page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotAvailability {
    pub id: i64,
    pub slot_date: NaiveDate,
    pub slot_time: String,
    pub capacity: i32,
    pub booked: i32,
    pub available: i32,
}

impl From<Slot> for SlotAvailability {
    fn from(slot: Slot) -> Self {
        let available = slot.available();
        Self {
            id: slot.id,
            slot_date: slot.slot_date,
            slot_time: slot.slot_time,
            capacity: slot.capacity,
            booked: slot.booked,
            available,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperienceDetail {
    pub experience: Experience,
    pub slots: Vec<SlotAvailability>,
}

/// Plain reads behind the browsing and confirmation pages.
#[derive(Clone)]
pub struct QueryService {
    catalog: Arc<dyn CatalogRepository>,
    bookings: Arc<dyn BookingRepository>,
    slot_window_days: Option<u64>,
    reference_length: usize,
}

/// Length of the reference ids handed out with confirmations.
pub const DEFAULT_REFERENCE_LENGTH: usize = 6;

impl QueryService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        bookings: Arc<dyn BookingRepository>,
        slot_window_days: Option<u64>,
    ) -> Self {
        Self {
            catalog,
            bookings,
            slot_window_days,
            reference_length: DEFAULT_REFERENCE_LENGTH,
        }
    }

    pub fn with_reference_length(mut self, reference_length: usize) -> Self {
        self.reference_length = reference_length;
        self
    }

    pub async fn list_experiences(&self, search: Option<&str>) -> CoreResult<Vec<Experience>> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        Ok(self.catalog.list_experiences(search).await?)
    }

    /// The experience with its slots from `today` onward.
    pub async fn experience_detail(&self, id: i64, today: NaiveDate) -> CoreResult<ExperienceDetail> {
        let experience = self
            .catalog
            .get_experience(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Experience", id))?;

        let until = self
            .slot_window_days
            .and_then(|days| today.checked_add_days(Days::new(days)));

        let mut slots = self.catalog.list_slots(id, today, until).await?;
        slots.sort_by(|a, b| a.schedule_key().cmp(&b.schedule_key()));

        Ok(ExperienceDetail {
            experience,
            slots: slots.into_iter().map(SlotAvailability::from).collect(),
        })
    }

    /// `Ok(None)` for unknown or inactive codes.
    pub async fn validate_promo(&self, code: &str) -> CoreResult<Option<Promo>> {
        let code = code.trim();
        if code.is_empty() {
            return Err(CoreError::validation("code required"));
        }
        let promo = self.catalog.get_promo(code).await?;
        Ok(promo.filter(|p| p.active))
    }

    /// Looks a booking up by reference id or numeric id.
    ///
    /// A key shaped like a reference is resolved as a reference first, so an
    /// all-digit reference such as `000001` never lands on booking 1.
    pub async fn find_booking(&self, key: &str) -> CoreResult<BookingDetails> {
        let key = key.trim();
        let reference = key.to_ascii_uppercase();

        let found = if self.is_reference_shaped(&reference) {
            match self.bookings.get_booking_by_reference(&reference).await? {
                Some(details) => Some(details),
                None => self.find_by_id(key).await?,
            }
        } else {
            match key.parse::<i64>() {
                Ok(id) => self.bookings.get_booking(id).await?,
                Err(_) => self.bookings.get_booking_by_reference(&reference).await?,
            }
        };
        found.ok_or_else(|| CoreError::not_found("Booking", key))
    }

    async fn find_by_id(&self, key: &str) -> CoreResult<Option<BookingDetails>> {
        match key.parse::<i64>() {
            Ok(id) => Ok(self.bookings.get_booking(id).await?),
            Err(_) => Ok(None),
        }
    }

    fn is_reference_shaped(&self, key: &str) -> bool {
        key.len() == self.reference_length
            && key.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    }
}
