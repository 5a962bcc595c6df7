use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::inventory::SlotInventory;

/// A bookable activity. The price is read at booking time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    /// Unit price in minor currency units.
    pub price_cents: i64,
    pub image_url: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Experience {
    /// Case-insensitive substring match on the title. A blank needle matches everything.
    pub fn title_matches(&self, needle: &str) -> bool {
        let needle = needle.trim();
        needle.is_empty() || self.title.to_lowercase().contains(&needle.to_lowercase())
    }
}

/// One dated instance of an experience with a fixed capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: i64,
    pub experience_id: i64,
    pub slot_date: NaiveDate,
    /// Display label such as `07:00`.
    pub slot_time: String,
    pub capacity: i32,
    /// Committed quantity across all bookings of this slot.
    pub booked: i32,
}

impl Slot {
    pub fn inventory(&self) -> SlotInventory {
        SlotInventory::new(self.capacity, self.booked)
    }

    pub fn available(&self) -> i32 {
        self.inventory().available()
    }

    /// Ordering used for listings: by date, then time label.
    pub fn schedule_key(&self) -> (NaiveDate, &str) {
        (self.slot_date, self.slot_time.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn experience(title: &str) -> Experience {
        Experience {
            id: 1,
            title: title.to_string(),
            slug: "kayaking".to_string(),
            description: String::new(),
            price_cents: 99900,
            image_url: None,
            location: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_title_matching_is_case_insensitive() {
        let exp = experience("Sunrise Kayaking");
        assert!(exp.title_matches("kayak"));
        assert!(exp.title_matches("SUNRISE"));
        assert!(exp.title_matches("   "));
        assert!(!exp.title_matches("trek"));
    }

    #[test]
    fn test_experience_serializes_camel_case() {
        let json = serde_json::to_value(experience("Kayaking")).unwrap();
        assert_eq!(json["priceCents"], 99900);
        assert!(json.get("imageUrl").is_some());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_slot_availability() {
        let slot = Slot {
            id: 7,
            experience_id: 1,
            slot_date: NaiveDate::from_ymd_opt(2025, 10, 22).unwrap(),
            slot_time: "07:00".to_string(),
            capacity: 6,
            booked: 4,
        };
        assert_eq!(slot.available(), 2);
    }
}
