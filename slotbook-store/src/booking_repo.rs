use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use slotbook_catalog::{Experience, Promo, Reservation, Slot, SlotInventory};
use slotbook_core::repository::{BookingRepository, BookingStore, BookingTransaction};
use slotbook_core::{Booking, BookingDetails, NewBooking, StoreResult};
use slotbook_shared::Masked;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use crate::catalog_repo::PromoRow;

/// Opens Postgres transactions for the booking coordinator.
#[derive(Clone)]
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn begin(&self) -> StoreResult<Box<dyn BookingTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgBookingTransaction { tx }))
    }
}

/// Dropping the inner sqlx transaction without commit rolls it back.
pub struct PgBookingTransaction {
    tx: Transaction<'static, Postgres>,
}

#[derive(sqlx::FromRow)]
struct SlotWithExperienceRow {
    id: i64,
    experience_id: i64,
    slot_date: NaiveDate,
    slot_time: String,
    capacity: i32,
    booked: i32,
    title: String,
    slug: String,
    description: String,
    price_cents: i64,
    image_url: Option<String>,
    location: Option<String>,
    experience_created_at: DateTime<Utc>,
}

impl SlotWithExperienceRow {
    fn split(self) -> (Slot, Experience) {
        let slot = Slot {
            id: self.id,
            experience_id: self.experience_id,
            slot_date: self.slot_date,
            slot_time: self.slot_time,
            capacity: self.capacity,
            booked: self.booked,
        };
        let experience = Experience {
            id: self.experience_id,
            title: self.title,
            slug: self.slug,
            description: self.description,
            price_cents: self.price_cents,
            image_url: self.image_url,
            location: self.location,
            created_at: self.experience_created_at,
        };
        (slot, experience)
    }
}

#[async_trait]
impl BookingTransaction for PgBookingTransaction {
    async fn load_slot(&mut self, slot_id: i64) -> StoreResult<Option<(Slot, Experience)>> {
        let row = sqlx::query_as::<_, SlotWithExperienceRow>(
            r#"
            SELECT s.id, s.experience_id, s.slot_date, s.slot_time, s.capacity, s.booked,
                   e.title, e.slug, e.description, e.price_cents, e.image_url, e.location,
                   e.created_at AS experience_created_at
            FROM slots s
            JOIN experiences e ON e.id = s.experience_id
            WHERE s.id = $1
            "#,
        )
        .bind(slot_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(SlotWithExperienceRow::split))
    }

    async fn find_promo(&mut self, code: &str) -> StoreResult<Option<Promo>> {
        let row = sqlx::query_as::<_, PromoRow>("SELECT code, kind, value, active FROM promos WHERE code = $1")
            .bind(code)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.map(Promo::try_from).transpose()
    }

    async fn reserve_seats(&mut self, slot_id: i64, quantity: i32) -> StoreResult<Reservation> {
        if quantity <= 0 {
            return Ok(Reservation::InvalidQuantity { requested: quantity });
        }

        // The row lock taken here is held until this transaction ends.
        let reserved: Option<(i32, i32)> = sqlx::query_as(
            r#"
            UPDATE slots
            SET booked = booked + $1
            WHERE id = $2 AND booked::bigint + $1::bigint <= capacity
            RETURNING booked, capacity
            "#,
        )
        .bind(quantity)
        .bind(slot_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        if let Some((booked, capacity)) = reserved {
            debug!("Slot {} now at {}/{}", slot_id, booked, capacity);
            return Ok(Reservation::Reserved { booked, capacity });
        }

        let current: Option<(i32, i32)> = sqlx::query_as("SELECT capacity, booked FROM slots WHERE id = $1")
            .bind(slot_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(match current {
            Some((capacity, booked)) => Reservation::CapacityExceeded {
                requested: quantity,
                available: SlotInventory::new(capacity, booked).available(),
            },
            None => Reservation::SlotNotFound,
        })
    }

    async fn insert_booking(&mut self, booking: &NewBooking) -> StoreResult<Option<Booking>> {
        let inserted: Option<(i64, DateTime<Utc>)> = sqlx::query_as(
            r#"
            INSERT INTO bookings (reference, experience_id, slot_id, full_name, email, quantity,
                                  subtotal_cents, discount_cents, tax_cents, total_cents, promo_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (reference) DO NOTHING
            RETURNING id, created_at
            "#,
        )
        .bind(&booking.reference)
        .bind(booking.experience_id)
        .bind(booking.slot_id)
        .bind(booking.full_name.expose())
        .bind(booking.email.expose())
        .bind(booking.quantity)
        .bind(booking.price.subtotal_cents)
        .bind(booking.price.discount_cents)
        .bind(booking.price.tax_cents)
        .bind(booking.price.total_cents)
        .bind(booking.promo_code.as_deref())
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(inserted.map(|(id, created_at)| Booking::from_new(id, booking, created_at)))
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// Committed bookings, read outside any booking transaction.
pub struct StoreBookingRepository {
    pool: PgPool,
}

impl StoreBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_details(&self, filter: &str, key: BookingKey<'_>) -> StoreResult<Option<BookingDetails>> {
        let sql = format!(
            r#"
            SELECT b.id, b.reference, b.experience_id, b.slot_id, b.full_name, b.email, b.quantity,
                   b.subtotal_cents, b.discount_cents, b.tax_cents, b.total_cents, b.promo_code, b.created_at,
                   s.slot_date, s.slot_time, s.capacity, s.booked,
                   e.title, e.slug, e.description, e.price_cents, e.image_url, e.location,
                   e.created_at AS experience_created_at
            FROM bookings b
            JOIN slots s ON s.id = b.slot_id
            JOIN experiences e ON e.id = b.experience_id
            WHERE {}
            "#,
            filter
        );

        let query = sqlx::query_as::<_, BookingDetailsRow>(&sql);
        let query = match key {
            BookingKey::Id(id) => query.bind(id),
            BookingKey::Reference(reference) => query.bind(reference.to_string()),
        };
        let row = query.fetch_optional(&self.pool).await?;

        Ok(row.map(BookingDetails::from))
    }
}

enum BookingKey<'a> {
    Id(i64),
    Reference(&'a str),
}

#[derive(sqlx::FromRow)]
struct BookingDetailsRow {
    id: i64,
    reference: String,
    experience_id: i64,
    slot_id: i64,
    full_name: String,
    email: String,
    quantity: i32,
    subtotal_cents: i64,
    discount_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    promo_code: Option<String>,
    created_at: DateTime<Utc>,
    slot_date: NaiveDate,
    slot_time: String,
    capacity: i32,
    booked: i32,
    title: String,
    slug: String,
    description: String,
    price_cents: i64,
    image_url: Option<String>,
    location: Option<String>,
    experience_created_at: DateTime<Utc>,
}

impl From<BookingDetailsRow> for BookingDetails {
    fn from(row: BookingDetailsRow) -> Self {
        BookingDetails {
            booking: Booking {
                id: row.id,
                reference: row.reference,
                experience_id: row.experience_id,
                slot_id: row.slot_id,
                full_name: Masked::new(row.full_name),
                email: Masked::new(row.email),
                quantity: row.quantity,
                subtotal_cents: row.subtotal_cents,
                discount_cents: row.discount_cents,
                tax_cents: row.tax_cents,
                total_cents: row.total_cents,
                promo_code: row.promo_code,
                created_at: row.created_at,
            },
            slot: Slot {
                id: row.slot_id,
                experience_id: row.experience_id,
                slot_date: row.slot_date,
                slot_time: row.slot_time,
                capacity: row.capacity,
                booked: row.booked,
            },
            experience: Experience {
                id: row.experience_id,
                title: row.title,
                slug: row.slug,
                description: row.description,
                price_cents: row.price_cents,
                image_url: row.image_url,
                location: row.location,
                created_at: row.experience_created_at,
            },
        }
    }
}

#[async_trait]
impl BookingRepository for StoreBookingRepository {
    async fn get_booking(&self, id: i64) -> StoreResult<Option<BookingDetails>> {
        self.fetch_details("b.id = $1", BookingKey::Id(id)).await
    }

    async fn get_booking_by_reference(&self, reference: &str) -> StoreResult<Option<BookingDetails>> {
        self.fetch_details("b.reference = $1", BookingKey::Reference(reference)).await
    }
}
