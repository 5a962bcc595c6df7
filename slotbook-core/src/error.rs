use std::time::Duration;

use slotbook_catalog::PricingError;

/// Failures talking to the durable store. Nothing is committed when one is returned.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Transaction conflict: {0}")]
    Conflict(String),

    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => StoreError::PoolExhausted,
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                // serialization_failure, deadlock_detected
                Some("40001") | Some("40P01") => StoreError::Conflict(db_err.message().to_string()),
                _ => StoreError::Database(db_err.message().to_string()),
            },
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::CorruptRow(err.to_string())
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Migration(err.to_string())
    }
}

/// Domain errors surfaced by the booking coordinator and the query service.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Not enough seats on slot {slot_id}: requested {requested}, available {available}")]
    CapacityExceeded {
        slot_id: i64,
        requested: i32,
        available: i32,
    },

    #[error("Booking transaction timed out after {0:?}")]
    Timeout(Duration),

    /// The commit was sent but not acknowledged. The booking may exist.
    #[error("Booking commit outcome unknown: {0}")]
    CommitUncertain(StoreError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Whether the whole request may be retried as-is. Nothing was committed in these cases.
    /// `CommitUncertain` is never transient.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoreError::Timeout(_)
                | CoreError::Store(StoreError::PoolExhausted)
                | CoreError::Store(StoreError::Conflict(_))
        )
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
