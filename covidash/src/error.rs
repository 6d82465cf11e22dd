//! Error types.

#[derive(thiserror::Error, Debug)]
pub enum CovidashError {
    #[error("Wrapped anyhow error: {0}")]
    AnyhowError(#[from] anyhow::Error),
    #[error("Failed to fetch '{url}': HTTP status {status}")]
    FailedFetch { url: String, status: u16 },
    #[error("Column '{column}' not found in {table}")]
    MissingColumn { column: String, table: String },
    #[error("Invalid source location: {0}")]
    InvalidSource(String),
    #[error("Unparsable date '{value}' for {country}")]
    InvalidDate { country: String, value: String },
    #[error("Wrapped polars error: {0}")]
    PolarsError(#[from] polars::error::PolarsError),
    #[error("Wrapped IO error: {0}")]
    IOError(#[from] std::io::Error),
}

pub type CovidashResult<T> = Result<T, CovidashError>;
