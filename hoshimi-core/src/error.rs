use hoshimi_model::JstTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("not found")]
    NotFound,

    /// The stored plan for the day is frozen; ordinary saves must not touch
    /// it. Callers treat this as "already handled", not as a failure.
    #[error("plan for {0} is fixed")]
    PlanFixed(JstTime),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid stored record: {0}")]
    InvalidRecord(String),

    #[error("notification transport error: {0}")]
    Notify(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
