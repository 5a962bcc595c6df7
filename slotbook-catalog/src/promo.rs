use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromoKind {
    /// `value` is in percentage points.
    Percent,
    /// `value` is an amount in minor currency units.
    Flat,
}

impl PromoKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromoKind::Percent => "percent",
            PromoKind::Flat => "flat",
        }
    }
}

impl fmt::Display for PromoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromoKind {
    type Err = UnknownPromoKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percent" => Ok(PromoKind::Percent),
            "flat" => Ok(PromoKind::Flat),
            other => Err(UnknownPromoKind(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown promo type: {0}")]
pub struct UnknownPromoKind(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promo {
    pub code: String,
    #[serde(rename = "type")]
    pub kind: PromoKind,
    pub value: i64,
    pub active: bool,
}

impl Promo {
    /// Discount this promo grants on `subtotal_cents`. Inactive promos grant nothing.
    ///
    /// Percent discounts truncate toward zero. The result is never negative but
    /// may exceed the subtotal; callers clamp the discounted amount at zero.
    pub fn discount_for(&self, subtotal_cents: i64) -> Option<i64> {
        if !self.active {
            return Some(0);
        }
        let discount = match self.kind {
            PromoKind::Percent => subtotal_cents.checked_mul(self.value)? / 100,
            PromoKind::Flat => self.value,
        };
        Some(discount.max(0))
    }
}
