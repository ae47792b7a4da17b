use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("The API request returned an error: {0}")]
    ApiError(String),

    #[error("Failed to deserialize the API response: {0}")]
    Deserialization(String),

    #[error("Invalid data format from API: {0}")]
    InvalidData(String),

    #[error("{venue} did not respond within {secs}s")]
    Timeout { venue: String, secs: u64 },

    #[error("No data source could supply {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("Only {available} bars available for {symbol}, {required} required")]
    InsufficientHistory {
        symbol: String,
        required: usize,
        available: usize,
    },
}

impl ApiError {
    /// True for the two outcomes that mean "skip this symbol for this run".
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            ApiError::DataUnavailable { .. } | ApiError::InsufficientHistory { .. }
        )
    }
}
