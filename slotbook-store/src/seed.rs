//! Demo catalog shared by the `seed` binary and the in-memory backend.

use chrono::NaiveDate;
use slotbook_catalog::{Promo, PromoKind};
use slotbook_core::StoreResult;
use sqlx::PgPool;
use tracing::info;

pub struct DemoExperience {
    pub title: &'static str,
    pub slug: &'static str,
    pub description: &'static str,
    pub price_cents: i64,
    pub image_url: &'static str,
    pub location: &'static str,
    pub slots: &'static [DemoSlot],
}

pub struct DemoSlot {
    pub date: (i32, u32, u32),
    pub time: &'static str,
    pub capacity: i32,
}

impl DemoSlot {
    pub fn slot_date(&self) -> Option<NaiveDate> {
        let (y, m, d) = self.date;
        NaiveDate::from_ymd_opt(y, m, d)
    }
}

pub const DEMO_EXPERIENCES: &[DemoExperience] = &[
    DemoExperience {
        title: "Kayaking",
        slug: "kayaking",
        description: "Curated small-group kayaking experience. Helmet and life jackets included.",
        price_cents: 99900,
        image_url: "/images/kayak1.jpg",
        location: "Udupi, Karnataka",
        slots: &[
            DemoSlot { date: (2025, 10, 22), time: "07:00", capacity: 6 },
            DemoSlot { date: (2025, 10, 22), time: "09:00", capacity: 10 },
            DemoSlot { date: (2025, 10, 23), time: "11:00", capacity: 8 },
        ],
    },
    DemoExperience {
        title: "Nandi Hills Sunrise",
        slug: "nandi-hills",
        description: "Sunrise trek to Nandi Hills.",
        price_cents: 89900,
        image_url: "/images/nandi.jpg",
        location: "Bangalore",
        slots: &[
            DemoSlot { date: (2025, 10, 23), time: "06:00", capacity: 12 },
            DemoSlot { date: (2025, 10, 24), time: "06:00", capacity: 12 },
        ],
    },
];

pub fn demo_promos() -> Vec<Promo> {
    vec![
        Promo {
            code: "SAVE10".to_string(),
            kind: PromoKind::Percent,
            value: 10,
            active: true,
        },
        Promo {
            code: "FLAT100".to_string(),
            kind: PromoKind::Flat,
            value: 10000,
            active: true,
        },
    ]
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub experiences: usize,
    pub slots: usize,
    pub promos: usize,
}

/// Upserts the demo catalog. Re-running it never duplicates slots and never
/// touches booked counts.
pub async fn seed_postgres(pool: &PgPool) -> StoreResult<SeedSummary> {
    let mut tx = pool.begin().await?;
    let mut summary = SeedSummary::default();

    for demo in DEMO_EXPERIENCES {
        let (experience_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO experiences (title, slug, description, price_cents, image_url, location)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (slug) DO UPDATE
            SET title = EXCLUDED.title,
                description = EXCLUDED.description,
                price_cents = EXCLUDED.price_cents,
                image_url = EXCLUDED.image_url,
                location = EXCLUDED.location
            RETURNING id
            "#,
        )
        .bind(demo.title)
        .bind(demo.slug)
        .bind(demo.description)
        .bind(demo.price_cents)
        .bind(demo.image_url)
        .bind(demo.location)
        .fetch_one(&mut *tx)
        .await?;
        summary.experiences += 1;

        for slot in demo.slots {
            let Some(slot_date) = slot.slot_date() else {
                continue;
            };
            let result = sqlx::query(
                r#"
                INSERT INTO slots (experience_id, slot_date, slot_time, capacity)
                SELECT $1, $2, $3, $4
                WHERE NOT EXISTS (
                    SELECT 1 FROM slots WHERE experience_id = $1 AND slot_date = $2 AND slot_time = $3
                )
                "#,
            )
            .bind(experience_id)
            .bind(slot_date)
            .bind(slot.time)
            .bind(slot.capacity)
            .execute(&mut *tx)
            .await?;
            summary.slots += result.rows_affected() as usize;
        }
    }

    for promo in demo_promos() {
        sqlx::query(
            r#"
            INSERT INTO promos (code, kind, value, active)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (code) DO UPDATE
            SET kind = EXCLUDED.kind, value = EXCLUDED.value, active = EXCLUDED.active
            "#,
        )
        .bind(&promo.code)
        .bind(promo.kind.as_str())
        .bind(promo.value)
        .bind(promo.active)
        .execute(&mut *tx)
        .await?;
        summary.promos += 1;
    }

    tx.commit().await?;
    info!(
        "Seeded {} experiences, {} new slots, {} promos",
        summary.experiences, summary.slots, summary.promos
    );
    Ok(summary)
}
