use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use slotbook_core::{CoreError, CoreResult};
use slotbook_shared::Masked;

/// Booking payload as posted by the checkout page.
///
/// Every field is optional at this stage so that missing fields are reported
/// together by [`BookingRequest::validate`] instead of as a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    #[serde(default, alias = "fullName", alias = "full_name")]
    pub name: Option<Masked<String>>,
    #[serde(default)]
    pub email: Option<Masked<String>>,
    #[serde(default, alias = "slot_id", deserialize_with = "lenient_int")]
    pub slot_id: Option<i64>,
    #[serde(default, alias = "experience_id", deserialize_with = "lenient_int")]
    pub experience_id: Option<i64>,
    #[serde(default, alias = "quantity", deserialize_with = "lenient_int")]
    pub qty: Option<i64>,
    #[serde(default, alias = "promo_code")]
    pub promo_code: Option<String>,
}

/// A request that passed validation; the coordinator only accepts these.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidBookingRequest {
    pub full_name: Masked<String>,
    pub email: Masked<String>,
    pub slot_id: i64,
    pub experience_id: Option<i64>,
    pub quantity: i32,
    pub promo_code: Option<String>,
}

impl BookingRequest {
    pub fn validate(self) -> CoreResult<ValidBookingRequest> {
        let name = non_blank(self.name);
        let email = non_blank(self.email);

        let mut missing = Vec::new();
        if name.is_none() {
            missing.push("name");
        }
        if email.is_none() {
            missing.push("email");
        }
        if self.slot_id.is_none() {
            missing.push("slotId");
        }
        if self.qty.is_none() {
            missing.push("qty");
        }

        let (Some(full_name), Some(email), Some(slot_id), Some(qty)) = (name, email, self.slot_id, self.qty) else {
            return Err(CoreError::validation(format!("missing fields: {}", missing.join(", "))));
        };

        if !looks_like_email(&email) {
            return Err(CoreError::validation("email is not a valid address"));
        }
        if slot_id <= 0 {
            return Err(CoreError::validation("slotId must be a positive id"));
        }
        if let Some(experience_id) = self.experience_id {
            if experience_id <= 0 {
                return Err(CoreError::validation("experienceId must be a positive id"));
            }
        }
        if qty <= 0 {
            return Err(CoreError::validation("qty must be > 0"));
        }
        let quantity = i32::try_from(qty).map_err(|_| CoreError::validation("qty is too large"))?;

        let promo_code = self
            .promo_code
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty());

        Ok(ValidBookingRequest {
            full_name: Masked::new(full_name),
            email: Masked::new(email),
            slot_id,
            experience_id: self.experience_id,
            quantity,
            promo_code,
        })
    }
}

fn non_blank(value: Option<Masked<String>>) -> Option<String> {
    value
        .map(|v| v.into_inner().trim().to_string())
        .filter(|v| !v.is_empty())
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace),
        None => false,
    }
}

/// Accepts `3`, `3.0`, `"3"` or null. Blank strings count as absent.
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Int(i64),
        Float(f64),
        Text(String),
    }

    match Option::<Loose>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Loose::Int(v)) => Ok(Some(v)),
        Some(Loose::Float(f)) if f.fract() == 0.0 && f.abs() < 9.0e15 => Ok(Some(f as i64)),
        Some(Loose::Float(f)) => Err(D::Error::custom(format!("expected an integer, got {}", f))),
        Some(Loose::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Loose::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected an integer, got {:?}", s))),
    }
}
