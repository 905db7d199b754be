// Error taxonomy for ingestion and queries.
// Process glue (config, bootstrap, main) stays on anyhow.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PriceError {
    /// Caller-correctable input problem (window spec, aggregation, time range).
    #[error("invalid request: {0}")]
    Validation(String),

    /// Transport failure or non-success status from the price source.
    #[error("price source unavailable: {0}")]
    SourceUnavailable(String),

    /// Price source answered, but the body could not be decoded.
    #[error("price source response could not be decoded: {0}")]
    Decode(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl PriceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Short machine-readable name, used in HTTP error bodies and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            PriceError::Validation(_) => "validation",
            PriceError::SourceUnavailable(_) => "source_unavailable",
            PriceError::Decode(_) => "decode",
            PriceError::Storage(_) => "storage",
        }
    }
}

pub type PriceResult<T> = Result<T, PriceError>;
