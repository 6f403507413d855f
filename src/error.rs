use thiserror::Error;

#[derive(Error, Debug)]
pub enum BalanceSheetError {
    #[error("Invalid engine options: {0}")]
    InvalidOptions(String),

    #[error("Balance sheet does not balance: Assets ({assets}) != Liabilities ({liabilities}), difference {difference}")]
    BalanceMismatch {
        assets: f64,
        liabilities: f64,
        difference: f64,
    },

    #[error("Failed to fetch ledger rows: {0}")]
    FetchFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Ledger API returned status {status}: {message}")]
    ApiStatus { status: u16, message: String },

    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, BalanceSheetError>;
