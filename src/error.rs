use thiserror::Error;

/// Reasons a model reply could not be turned into a [`crate::models::TripRecord`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("reply is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("reply JSON is not an object")]
    NotAnObject,

    #[error("required field `{0}` is missing")]
    MissingField(&'static str),

    #[error("field `{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum TripRelayError {
    /// Required provider credential or setting is absent.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The completion provider rejected or failed the request.
    #[error("{0}")]
    Provider(String),

    /// The completion endpoint could not be reached or reported a failure.
    #[error("Relay error: {0}")]
    Relay(String),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("Pool creation error: {0}")]
    PoolCreation(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, TripRelayError>;
