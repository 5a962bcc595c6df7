//! Drives the booking coordinator over the Postgres store.
//! `DATABASE_URL=postgres://... cargo test -p slotbook-order -- --ignored`

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Days, NaiveDate, Utc};
use serde_json::json;
use slotbook_catalog::{PricingConfig, PricingEngine, TaxRate};
use slotbook_core::{CoreError, QueryService, StoreError};
use slotbook_order::{BookingCoordinator, BookingRequest, RandomReference, ReferenceSource};
use slotbook_store::app_config::DatabaseConfig;
use slotbook_store::{DbClient, PgBookingStore, StoreBookingRepository, StoreCatalogRepository};
use uuid::Uuid;

struct Fixture {
    db: DbClient,
    experience_id: i64,
    slot_id: i64,
}

/// A fresh experience at 999 cents with one slot tomorrow.
async fn setup(capacity: i32) -> Fixture {
    let config = DatabaseConfig {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
        max_connections: 5,
        acquire_timeout_secs: 3,
        run_migrations: true,
    };
    let db = DbClient::from_config(&config).await.unwrap();
    db.migrate().await.unwrap();

    let slug = format!("booking-test-{}", Uuid::new_v4().simple());
    let (experience_id,): (i64,) = sqlx::query_as(
        "INSERT INTO experiences (title, slug, price_cents) VALUES ('Booking test', $1, 999) RETURNING id",
    )
    .bind(&slug)
    .fetch_one(&db.pool)
    .await
    .unwrap();

    let slot_id = add_slot(&db, experience_id, days_from_today(1), capacity).await;
    Fixture { db, experience_id, slot_id }
}

fn days_from_today(days: i64) -> NaiveDate {
    let today = Utc::now().date_naive();
    if days >= 0 {
        today.checked_add_days(Days::new(days as u64)).unwrap()
    } else {
        today.checked_sub_days(Days::new(days.unsigned_abs())).unwrap()
    }
}

async fn add_slot(db: &DbClient, experience_id: i64, date: NaiveDate, capacity: i32) -> i64 {
    let (slot_id,): (i64,) = sqlx::query_as(
        "INSERT INTO slots (experience_id, slot_date, slot_time, capacity) VALUES ($1, $2, '07:00', $3) RETURNING id",
    )
    .bind(experience_id)
    .bind(date)
    .bind(capacity)
    .fetch_one(&db.pool)
    .await
    .unwrap();
    slot_id
}

async fn booked(db: &DbClient, slot_id: i64) -> i32 {
    let (booked,): (i32,) = sqlx::query_as("SELECT booked FROM slots WHERE id = $1")
        .bind(slot_id)
        .fetch_one(&db.pool)
        .await
        .unwrap();
    booked
}

async fn booking_rows(db: &DbClient, slot_id: i64) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bookings WHERE slot_id = $1")
        .bind(slot_id)
        .fetch_one(&db.pool)
        .await
        .unwrap();
    count
}

fn coordinator(db: &DbClient) -> BookingCoordinator {
    let pricing = PricingEngine::new(PricingConfig {
        tax_rate: TaxRate::from_decimal(0.06),
    });
    BookingCoordinator::new(Arc::new(PgBookingStore::new(db.pool.clone())), pricing, Duration::from_secs(5))
}

fn booking(slot_id: i64, qty: i32) -> BookingRequest {
    serde_json::from_value(json!({ "name": "Jane Doe", "email": "jane@example.com", "slotId": slot_id, "qty": qty }))
        .unwrap()
}

fn unique_reference() -> String {
    Uuid::new_v4().simple().to_string()[..6].to_ascii_uppercase()
}

/// Hands out scripted references, then random ones.
struct ScriptedReference {
    script: Mutex<VecDeque<String>>,
    fallback: RandomReference,
}

impl ScriptedReference {
    fn new(script: Vec<String>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: RandomReference::default(),
        }
    }
}

impl ReferenceSource for ScriptedReference {
    fn next_reference(&self) -> String {
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| self.fallback.next_reference())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_simultaneous_bookings_for_last_seats() {
    let fx = setup(5).await;
    let coordinator = Arc::new(coordinator(&fx.db));

    let mut handles = Vec::new();
    for _ in 0..2 {
        let coordinator = coordinator.clone();
        let slot_id = fx.slot_id;
        handles.push(tokio::spawn(async move { coordinator.create_booking(booking(slot_id, 3)).await }));
    }

    let mut succeeded = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(CoreError::CapacityExceeded { requested: 3, available: 2, .. }) => rejected += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!((succeeded, rejected), (1, 1));
    assert_eq!(booked(&fx.db, fx.slot_id).await, 3);
    assert_eq!(booking_rows(&fx.db, fx.slot_id).await, 1);
}

#[tokio::test]
#[ignore]
async fn test_rejected_bookings_leave_no_trace() {
    let fx = setup(2).await;
    let coordinator = coordinator(&fx.db);

    let err = coordinator.create_booking(booking(fx.slot_id, 3)).await.unwrap_err();
    assert!(matches!(err, CoreError::CapacityExceeded { requested: 3, available: 2, .. }));
    assert_eq!(booked(&fx.db, fx.slot_id).await, 0);
    assert_eq!(booking_rows(&fx.db, fx.slot_id).await, 0);

    let mut wrong_experience = booking(fx.slot_id, 1);
    wrong_experience.experience_id = Some(fx.experience_id + 1_000_000);
    let err = coordinator.create_booking(wrong_experience).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { entity: "Experience", .. }));
    assert_eq!(booked(&fx.db, fx.slot_id).await, 0);
}

#[tokio::test]
#[ignore]
async fn test_reference_collision_uses_the_next_draw() {
    let fx = setup(5).await;
    let taken = unique_reference();
    let fresh = unique_reference();
    let references = Arc::new(ScriptedReference::new(vec![taken.clone(), taken.clone(), fresh.clone()]));
    let coordinator = coordinator(&fx.db).with_reference_source(references);

    let first = coordinator.create_booking(booking(fx.slot_id, 1)).await.unwrap();
    assert_eq!(first.reference, taken);
    let second = coordinator.create_booking(booking(fx.slot_id, 2)).await.unwrap();
    assert_eq!(second.reference, fresh);

    assert_eq!(booked(&fx.db, fx.slot_id).await, 3);
    assert_eq!(booking_rows(&fx.db, fx.slot_id).await, 2);
}

#[tokio::test]
#[ignore]
async fn test_exhausted_references_roll_back_the_reservation() {
    let fx = setup(5).await;
    let taken = unique_reference();
    let script = vec![taken.clone(); 1 + slotbook_order::MAX_REFERENCE_ATTEMPTS];
    let coordinator = coordinator(&fx.db).with_reference_source(Arc::new(ScriptedReference::new(script)));

    coordinator.create_booking(booking(fx.slot_id, 1)).await.unwrap();
    let err = coordinator.create_booking(booking(fx.slot_id, 2)).await.unwrap_err();
    assert!(matches!(err, CoreError::Store(StoreError::Conflict(_))));

    assert_eq!(booked(&fx.db, fx.slot_id).await, 1);
    assert_eq!(booking_rows(&fx.db, fx.slot_id).await, 1);
}

#[tokio::test]
#[ignore]
async fn test_committed_booking_is_found_by_id_and_reference() {
    let fx = setup(5).await;
    let mut request = booking(fx.slot_id, 2);
    request.experience_id = Some(fx.experience_id);
    let confirmation = coordinator(&fx.db).create_booking(request).await.unwrap();

    let queries = QueryService::new(
        Arc::new(StoreCatalogRepository::new(fx.db.pool.clone())),
        Arc::new(StoreBookingRepository::new(fx.db.pool.clone())),
        None,
    );

    let by_id = queries.find_booking(&confirmation.booking_id.to_string()).await.unwrap();
    assert_eq!(by_id.booking.reference, confirmation.reference);
    assert_eq!(by_id.booking.quantity, 2);
    // 1998 + 6% tax 120
    assert_eq!(by_id.booking.total_cents, 2118);
    assert_eq!(by_id.booking.email.expose(), "jane@example.com");
    assert_eq!(by_id.slot.id, fx.slot_id);
    assert_eq!(by_id.slot.booked, 2);
    assert_eq!(by_id.experience.id, fx.experience_id);

    let by_reference = queries.find_booking(&confirmation.reference.to_lowercase()).await.unwrap();
    assert_eq!(by_reference, by_id);
}

#[tokio::test]
#[ignore]
async fn test_experience_detail_honours_slot_window() {
    let fx = setup(5).await;
    add_slot(&fx.db, fx.experience_id, days_from_today(10), 5).await;
    add_slot(&fx.db, fx.experience_id, days_from_today(-1), 5).await;

    let catalog = Arc::new(StoreCatalogRepository::new(fx.db.pool.clone()));
    let bookings = Arc::new(StoreBookingRepository::new(fx.db.pool.clone()));
    let today = Utc::now().date_naive();

    let windowed = QueryService::new(catalog.clone(), bookings.clone(), Some(5));
    let detail = windowed.experience_detail(fx.experience_id, today).await.unwrap();
    let ids: Vec<i64> = detail.slots.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![fx.slot_id]);

    let unbounded = QueryService::new(catalog, bookings, None);
    let detail = unbounded.experience_detail(fx.experience_id, today).await.unwrap();
    assert_eq!(detail.slots.len(), 2);
    assert_eq!(detail.slots[0].id, fx.slot_id);
}
