use serde::{Deserialize, Serialize};

/// Seat counters for one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotInventory {
    pub capacity: i32,
    pub booked: i32,
}

/// Outcome of a seat reservation attempt. Rejections are values, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Reservation {
    Reserved { booked: i32, capacity: i32 },
    CapacityExceeded { requested: i32, available: i32 },
    InvalidQuantity { requested: i32 },
    SlotNotFound,
}

impl Reservation {
    pub fn is_reserved(&self) -> bool {
        matches!(self, Reservation::Reserved { .. })
    }
}

impl SlotInventory {
    pub fn new(capacity: i32, booked: i32) -> Self {
        Self { capacity, booked }
    }

    pub fn available(&self) -> i32 {
        (self.capacity - self.booked).max(0)
    }

    /// `booked + quantity <= capacity`, committing the seats only when it holds.
    pub fn try_reserve(&mut self, quantity: i32) -> Reservation {
        if quantity <= 0 {
            return Reservation::InvalidQuantity { requested: quantity };
        }

        match self.booked.checked_add(quantity) {
            Some(next) if next <= self.capacity => {
                self.booked = next;
                Reservation::Reserved {
                    booked: self.booked,
                    capacity: self.capacity,
                }
            }
            _ => Reservation::CapacityExceeded {
                requested: quantity,
                available: self.available(),
            },
        }
    }
}
