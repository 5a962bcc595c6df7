use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use slotbook_catalog::{Experience, Promo, Reservation, Slot};
use slotbook_core::repository::{BookingRepository, BookingStore, BookingTransaction, CatalogRepository};
use slotbook_core::{Booking, BookingDetails, NewBooking, StoreResult};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

use crate::seed::{demo_promos, DEMO_EXPERIENCES};

#[derive(Debug, Default)]
struct State {
    experiences: BTreeMap<i64, Experience>,
    slots: BTreeMap<i64, Slot>,
    promos: HashMap<String, Promo>,
    bookings: BTreeMap<i64, Booking>,
    references: HashMap<String, i64>,
    last_experience_id: i64,
    last_slot_id: i64,
    last_booking_id: i64,
}

impl State {
    fn details(&self, booking: &Booking) -> Option<BookingDetails> {
        Some(BookingDetails {
            booking: booking.clone(),
            slot: self.slots.get(&booking.slot_id)?.clone(),
            experience: self.experiences.get(&booking.experience_id)?.clone(),
        })
    }
}

/// Single-process transactional store for development and tests.
///
/// A booking transaction holds the store's one lock from `begin` until it
/// ends, so transactions are serialized. It writes in place and keeps an undo
/// log of the seat counts and bookings it touched; rollback or drop replays
/// the log, so a transaction costs only what it changes.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store preloaded with the demo catalog.
    pub async fn with_demo_data() -> Self {
        let store = Self::new();
        store.seed_demo().await;
        store
    }

    pub async fn seed_demo(&self) {
        for demo in DEMO_EXPERIENCES {
            let experience_id = self
                .add_experience(
                    demo.title,
                    demo.slug,
                    demo.price_cents,
                    Some(demo.image_url),
                    Some(demo.location),
                )
                .await;
            self.set_description(experience_id, demo.description).await;
            for slot in demo.slots {
                if let Some(date) = slot.slot_date() {
                    self.add_slot(experience_id, date, slot.time, slot.capacity).await;
                }
            }
        }
        for promo in demo_promos() {
            self.add_promo(promo).await;
        }
        info!("In-memory store seeded with demo catalog");
    }

    pub async fn add_experience(
        &self,
        title: &str,
        slug: &str,
        price_cents: i64,
        image_url: Option<&str>,
        location: Option<&str>,
    ) -> i64 {
        let mut state = self.state.lock().await;
        state.last_experience_id += 1;
        let id = state.last_experience_id;
        state.experiences.insert(
            id,
            Experience {
                id,
                title: title.to_string(),
                slug: slug.to_string(),
                description: String::new(),
                price_cents,
                image_url: image_url.map(str::to_string),
                location: location.map(str::to_string),
                created_at: Utc::now(),
            },
        );
        id
    }

    async fn set_description(&self, experience_id: i64, description: &str) {
        let mut state = self.state.lock().await;
        if let Some(experience) = state.experiences.get_mut(&experience_id) {
            experience.description = description.to_string();
        }
    }

    pub async fn add_slot(&self, experience_id: i64, slot_date: NaiveDate, slot_time: &str, capacity: i32) -> i64 {
        let mut state = self.state.lock().await;
        state.last_slot_id += 1;
        let id = state.last_slot_id;
        state.slots.insert(
            id,
            Slot {
                id,
                experience_id,
                slot_date,
                slot_time: slot_time.to_string(),
                capacity,
                booked: 0,
            },
        );
        id
    }

    pub async fn add_promo(&self, promo: Promo) {
        let mut state = self.state.lock().await;
        state.promos.insert(promo.code.clone(), promo);
    }

    /// Committed seat count of a slot.
    pub async fn slot_booked(&self, slot_id: i64) -> Option<i32> {
        self.state.lock().await.slots.get(&slot_id).map(|s| s.booked)
    }

    pub async fn booking_count(&self) -> usize {
        self.state.lock().await.bookings.len()
    }

    /// Sum of booking quantities per slot, for checking the ledger against its bookings.
    pub async fn booked_by_bookings(&self, slot_id: i64) -> i32 {
        self.state
            .lock()
            .await
            .bookings
            .values()
            .filter(|b| b.slot_id == slot_id)
            .map(|b| b.quantity)
            .sum()
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn list_experiences(&self, search: Option<&str>) -> StoreResult<Vec<Experience>> {
        let state = self.state.lock().await;
        Ok(state
            .experiences
            .values()
            .filter(|e| search.map_or(true, |s| e.title_matches(s)))
            .cloned()
            .collect())
    }

    async fn get_experience(&self, id: i64) -> StoreResult<Option<Experience>> {
        Ok(self.state.lock().await.experiences.get(&id).cloned())
    }

    async fn list_slots(
        &self,
        experience_id: i64,
        from: NaiveDate,
        until: Option<NaiveDate>,
    ) -> StoreResult<Vec<Slot>> {
        let state = self.state.lock().await;
        let mut slots: Vec<Slot> = state
            .slots
            .values()
            .filter(|s| s.experience_id == experience_id)
            .filter(|s| s.slot_date >= from && until.map_or(true, |u| s.slot_date <= u))
            .cloned()
            .collect();
        slots.sort_by(|a, b| a.schedule_key().cmp(&b.schedule_key()));
        Ok(slots)
    }

    async fn get_promo(&self, code: &str) -> StoreResult<Option<Promo>> {
        Ok(self.state.lock().await.promos.get(code).cloned())
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn get_booking(&self, id: i64) -> StoreResult<Option<BookingDetails>> {
        let state = self.state.lock().await;
        Ok(state.bookings.get(&id).and_then(|b| state.details(b)))
    }

    async fn get_booking_by_reference(&self, reference: &str) -> StoreResult<Option<BookingDetails>> {
        let state = self.state.lock().await;
        Ok(state
            .references
            .get(reference)
            .and_then(|id| state.bookings.get(id))
            .and_then(|b| state.details(b)))
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn BookingTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(MemoryTransaction {
            guard,
            undo: Vec::new(),
            committed: false,
        }))
    }
}

enum Undo {
    Booked { slot_id: i64, previous: i32 },
    Inserted { id: i64, reference: String, previous_last_id: i64 },
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<State>,
    undo: Vec<Undo>,
    committed: bool,
}

impl MemoryTransaction {
    fn undo_all(&mut self) {
        while let Some(change) = self.undo.pop() {
            match change {
                Undo::Booked { slot_id, previous } => {
                    if let Some(slot) = self.guard.slots.get_mut(&slot_id) {
                        slot.booked = previous;
                    }
                }
                Undo::Inserted { id, reference, previous_last_id } => {
                    self.guard.bookings.remove(&id);
                    self.guard.references.remove(&reference);
                    self.guard.last_booking_id = previous_last_id;
                }
            }
        }
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if !self.committed {
            self.undo_all();
        }
    }
}

#[async_trait]
impl BookingTransaction for MemoryTransaction {
    async fn load_slot(&mut self, slot_id: i64) -> StoreResult<Option<(Slot, Experience)>> {
        let Some(slot) = self.guard.slots.get(&slot_id) else {
            return Ok(None);
        };
        Ok(self
            .guard
            .experiences
            .get(&slot.experience_id)
            .map(|e| (slot.clone(), e.clone())))
    }

    async fn find_promo(&mut self, code: &str) -> StoreResult<Option<Promo>> {
        Ok(self.guard.promos.get(code).cloned())
    }

    async fn reserve_seats(&mut self, slot_id: i64, quantity: i32) -> StoreResult<Reservation> {
        let Some(slot) = self.guard.slots.get_mut(&slot_id) else {
            return Ok(Reservation::SlotNotFound);
        };
        let mut inventory = slot.inventory();
        let outcome = inventory.try_reserve(quantity);
        if outcome.is_reserved() {
            self.undo.push(Undo::Booked { slot_id, previous: slot.booked });
            slot.booked = inventory.booked;
        }
        Ok(outcome)
    }

    async fn insert_booking(&mut self, booking: &NewBooking) -> StoreResult<Option<Booking>> {
        let state = &mut *self.guard;
        if state.references.contains_key(&booking.reference) {
            return Ok(None);
        }
        let previous_last_id = state.last_booking_id;
        state.last_booking_id += 1;
        let id = state.last_booking_id;
        let row = Booking::from_new(id, booking, Utc::now());
        state.references.insert(row.reference.clone(), id);
        state.bookings.insert(id, row.clone());
        self.undo.push(Undo::Inserted {
            id,
            reference: row.reference.clone(),
            previous_last_id,
        });
        Ok(Some(row))
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut tx = self;
        tx.committed = true;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        let mut tx = self;
        tx.undo_all();
        Ok(())
    }
}
