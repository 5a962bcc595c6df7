use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use slotbook_catalog::{Experience, Promo, PromoKind, Slot};
use slotbook_core::repository::CatalogRepository;
use slotbook_core::{StoreError, StoreResult};
use sqlx::PgPool;

pub struct StoreCatalogRepository {
    pool: PgPool,
}

impl StoreCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
pub(crate) struct ExperienceRow {
    id: i64,
    title: String,
    slug: String,
    description: String,
    price_cents: i64,
    image_url: Option<String>,
    location: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ExperienceRow> for Experience {
    fn from(row: ExperienceRow) -> Self {
        Experience {
            id: row.id,
            title: row.title,
            slug: row.slug,
            description: row.description,
            price_cents: row.price_cents,
            image_url: row.image_url,
            location: row.location,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct SlotRow {
    id: i64,
    experience_id: i64,
    slot_date: NaiveDate,
    slot_time: String,
    capacity: i32,
    booked: i32,
}

impl From<SlotRow> for Slot {
    fn from(row: SlotRow) -> Self {
        Slot {
            id: row.id,
            experience_id: row.experience_id,
            slot_date: row.slot_date,
            slot_time: row.slot_time,
            capacity: row.capacity,
            booked: row.booked,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PromoRow {
    code: String,
    kind: String,
    value: i64,
    active: bool,
}

impl TryFrom<PromoRow> for Promo {
    type Error = StoreError;

    fn try_from(row: PromoRow) -> Result<Self, Self::Error> {
        let kind: PromoKind = row
            .kind
            .parse()
            .map_err(|e| StoreError::CorruptRow(format!("promo {}: {}", row.code, e)))?;
        Ok(Promo {
            code: row.code,
            kind,
            value: row.value,
            active: row.active,
        })
    }
}

pub(crate) const EXPERIENCE_COLUMNS: &str =
    "id, title, slug, description, price_cents, image_url, location, created_at";

pub(crate) const SLOT_COLUMNS: &str = "id, experience_id, slot_date, slot_time, capacity, booked";

/// Escapes LIKE wildcards so user input matches literally.
fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl CatalogRepository for StoreCatalogRepository {
    async fn list_experiences(&self, search: Option<&str>) -> StoreResult<Vec<Experience>> {
        let rows = match search {
            Some(search) => {
                let sql = format!(
                    "SELECT {} FROM experiences WHERE title ILIKE $1 ESCAPE '\\' ORDER BY id",
                    EXPERIENCE_COLUMNS
                );
                sqlx::query_as::<_, ExperienceRow>(&sql)
                    .bind(like_pattern(search))
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!("SELECT {} FROM experiences ORDER BY id", EXPERIENCE_COLUMNS);
                sqlx::query_as::<_, ExperienceRow>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows.into_iter().map(Experience::from).collect())
    }

    async fn get_experience(&self, id: i64) -> StoreResult<Option<Experience>> {
        let sql = format!("SELECT {} FROM experiences WHERE id = $1", EXPERIENCE_COLUMNS);
        let row = sqlx::query_as::<_, ExperienceRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Experience::from))
    }

    async fn list_slots(
        &self,
        experience_id: i64,
        from: NaiveDate,
        until: Option<NaiveDate>,
    ) -> StoreResult<Vec<Slot>> {
        let sql = format!(
            r#"
            SELECT {} FROM slots
            WHERE experience_id = $1
              AND slot_date >= $2
              AND ($3::date IS NULL OR slot_date <= $3)
            ORDER BY slot_date, slot_time
            "#,
            SLOT_COLUMNS
        );
        let rows = sqlx::query_as::<_, SlotRow>(&sql)
            .bind(experience_id)
            .bind(from)
            .bind(until)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Slot::from).collect())
    }

    async fn get_promo(&self, code: &str) -> StoreResult<Option<Promo>> {
        let row = sqlx::query_as::<_, PromoRow>("SELECT code, kind, value, active FROM promos WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Promo::try_from).transpose()
    }
}
