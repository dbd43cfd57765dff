// src/errors.rs
use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BotError>;

/// Typed failures surfaced by collaborators and the core.
///
/// The engine matches on the variant to decide between retrying, skipping
/// the symbol and aborting the current cycle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BotError {
    // -- Network ------------------------------------------------------------
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    // -- Exchange -----------------------------------------------------------
    #[error("exchange rejected request (code {code:?}): {reason}")]
    ExchangeRejection { code: Option<i64>, reason: String },

    // -- Configuration ------------------------------------------------------
    #[error("configuration error: {0}")]
    Configuration(String),

    // -- Market data --------------------------------------------------------
    #[error("no market data available for any basket member")]
    NoDataAvailable,

    // -- Sizing -------------------------------------------------------------
    #[error("insufficient funds: order needs {required}, allowed {allowed}")]
    InsufficientFunds { required: Decimal, allowed: Decimal },

    // -- Storage ------------------------------------------------------------
    #[error("storage error: {0}")]
    Storage(String),
}

impl BotError {
    pub fn rejection(reason: impl Into<String>) -> Self {
        BotError::ExchangeRejection {
            code: None,
            reason: reason.into(),
        }
    }

    /// Network hiccups that are expected to clear on their own.
    pub fn is_transient(&self) -> bool {
        matches!(self, BotError::TransientNetwork(_))
    }
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        BotError::TransientNetwork(err.to_string())
    }
}

impl From<std::io::Error> for BotError {
    fn from(err: std::io::Error) -> Self {
        BotError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Storage(err.to_string())
    }
}
