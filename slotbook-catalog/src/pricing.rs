use serde::{Deserialize, Serialize};

use crate::promo::Promo;

/// Tax rate in basis points (600 = 6%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Converts a decimal rate such as `0.06` to basis points.
    pub fn from_decimal(rate: f64) -> Self {
        TaxRate((rate * 10_000.0).round().max(0.0) as u32)
    }

    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// `round(amount * rate)` with halves rounded up, in integer arithmetic.
    pub fn apply(&self, amount_cents: i64) -> Option<i64> {
        let scaled = amount_cents.checked_mul(self.0 as i64)?;
        Some((scaled + 5_000) / 10_000)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate(600)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingConfig {
    pub tax_rate: TaxRate,
}

/// Result of pricing one booking. All amounts in minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub unit_price_cents: i64,
    pub quantity: i32,
    /// `unit_price * quantity`, before any discount.
    pub gross_cents: i64,
    /// Amount actually taken off the gross.
    pub discount_cents: i64,
    /// Gross minus discount, never below zero. Tax is charged on this.
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("Quantity must be positive, got {0}")]
    InvalidQuantity(i32),

    #[error("Unit price must not be negative, got {0}")]
    NegativePrice(i64),

    #[error("Price calculation overflowed")]
    Overflow,
}

/// Deterministic booking price calculator. No I/O.
#[derive(Debug, Clone, Default)]
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    /// Price `quantity` seats at `unit_price_cents`, applying `promo` if it is active.
    pub fn quote(
        &self,
        unit_price_cents: i64,
        quantity: i32,
        promo: Option<&Promo>,
    ) -> Result<PriceBreakdown, PricingError> {
        if quantity <= 0 {
            return Err(PricingError::InvalidQuantity(quantity));
        }
        if unit_price_cents < 0 {
            return Err(PricingError::NegativePrice(unit_price_cents));
        }

        let gross_cents = unit_price_cents
            .checked_mul(quantity as i64)
            .ok_or(PricingError::Overflow)?;

        let discount = match promo {
            Some(promo) => promo.discount_for(gross_cents).ok_or(PricingError::Overflow)?,
            None => 0,
        };

        let subtotal_cents = (gross_cents - discount).max(0);
        let tax_cents = self
            .config
            .tax_rate
            .apply(subtotal_cents)
            .ok_or(PricingError::Overflow)?;
        let total_cents = subtotal_cents
            .checked_add(tax_cents)
            .ok_or(PricingError::Overflow)?;

        Ok(PriceBreakdown {
            unit_price_cents,
            quantity,
            gross_cents,
            discount_cents: gross_cents - subtotal_cents,
            subtotal_cents,
            tax_cents,
            total_cents,
        })
    }
}
