//! Runs against a disposable database:
//! `DATABASE_URL=postgres://... cargo test -p slotbook-store -- --ignored`

use std::sync::Arc;

use chrono::NaiveDate;
use slotbook_core::repository::BookingStore;
use slotbook_store::app_config::DatabaseConfig;
use slotbook_store::{DbClient, PgBookingStore};
use uuid::Uuid;

async fn setup(capacity: i32) -> (DbClient, i64) {
    let config = DatabaseConfig {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
        max_connections: 5,
        acquire_timeout_secs: 3,
        run_migrations: true,
    };
    let db = DbClient::from_config(&config).await.unwrap();
    db.migrate().await.unwrap();

    let slug = format!("ledger-test-{}", Uuid::new_v4().simple());
    let (experience_id,): (i64,) = sqlx::query_as(
        "INSERT INTO experiences (title, slug, price_cents) VALUES ('Ledger test', $1, 100) RETURNING id",
    )
    .bind(&slug)
    .fetch_one(&db.pool)
    .await
    .unwrap();

    let (slot_id,): (i64,) = sqlx::query_as(
        "INSERT INTO slots (experience_id, slot_date, slot_time, capacity) VALUES ($1, $2, '07:00', $3) RETURNING id",
    )
    .bind(experience_id)
    .bind(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap())
    .bind(capacity)
    .fetch_one(&db.pool)
    .await
    .unwrap();

    (db, slot_id)
}

async fn booked(db: &DbClient, slot_id: i64) -> i32 {
    let (booked,): (i32,) = sqlx::query_as("SELECT booked FROM slots WHERE id = $1")
        .bind(slot_id)
        .fetch_one(&db.pool)
        .await
        .unwrap();
    booked
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_simultaneous_reservations_never_oversell() {
    let (db, slot_id) = setup(5).await;
    let store = Arc::new(PgBookingStore::new(db.pool.clone()));

    let mut handles = Vec::new();
    for _ in 0..2 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let mut tx = store.begin().await.unwrap();
            let outcome = tx.reserve_seats(slot_id, 3).await.unwrap();
            if outcome.is_reserved() {
                tx.commit().await.unwrap();
            } else {
                tx.rollback().await.unwrap();
            }
            outcome
        }));
    }

    let mut reserved = 0;
    for handle in handles {
        if handle.await.unwrap().is_reserved() {
            reserved += 1;
        }
    }

    assert_eq!(reserved, 1);
    assert_eq!(booked(&db, slot_id).await, 3);
}

#[tokio::test]
#[ignore]
async fn test_dropped_transaction_rolls_back() {
    let (db, slot_id) = setup(5).await;
    let store = PgBookingStore::new(db.pool.clone());

    {
        let mut tx = store.begin().await.unwrap();
        assert!(tx.reserve_seats(slot_id, 2).await.unwrap().is_reserved());
    }

    assert_eq!(booked(&db, slot_id).await, 0);
}
