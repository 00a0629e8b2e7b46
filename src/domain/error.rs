//! Domain error types.

use chrono::NaiveDateTime;
use std::fmt;

/// Failure category reported by a broker for a single submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrokerErrorKind {
    Rejected,
    InsufficientFunds,
    Timeout,
}

impl fmt::Display for BrokerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokerErrorKind::Rejected => write!(f, "rejected"),
            BrokerErrorKind::InsufficientFunds => write!(f, "insufficient funds"),
            BrokerErrorKind::Timeout => write!(f, "timeout"),
        }
    }
}

/// A broker's refusal to fill an order. Always recoverable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("broker {kind}: {message}")]
pub struct BrokerError {
    pub kind: BrokerErrorKind,
    pub message: String,
}

impl BrokerError {
    pub fn new(kind: BrokerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Coarse error family, used to decide whether the run may continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Validation,
    Broker,
    DataGap,
    Io,
}

/// Top-level error type for stockbot.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid input: {reason}")]
    Validation { reason: String },

    #[error("unknown asset {asset}")]
    UnknownAsset { asset: String },

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("data gap for {asset}: {reason}")]
    DataGap { asset: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn validation(reason: impl Into<String>) -> Self {
        EngineError::Validation {
            reason: reason.into(),
        }
    }

    /// Timestamps that fail to advance strictly.
    pub fn out_of_order(asset: &str, previous: NaiveDateTime, current: NaiveDateTime) -> Self {
        EngineError::DataGap {
            asset: asset.to_string(),
            reason: format!("timestamp {current} does not follow {previous}"),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EngineError::ConfigParse { .. }
            | EngineError::ConfigMissing { .. }
            | EngineError::ConfigInvalid { .. } => ErrorCategory::Configuration,
            EngineError::Validation { .. } | EngineError::UnknownAsset { .. } => {
                ErrorCategory::Validation
            }
            EngineError::Broker(_) => ErrorCategory::Broker,
            EngineError::DataGap { .. } => ErrorCategory::DataGap,
            EngineError::Io(_) => ErrorCategory::Io,
        }
    }

    /// Per-step errors that leave the run alive.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Validation | ErrorCategory::Broker
        )
    }
}

impl From<&EngineError> for std::process::ExitCode {
    fn from(err: &EngineError) -> Self {
        let code: u8 = match err.category() {
            ErrorCategory::Io => 1,
            ErrorCategory::Configuration => 2,
            ErrorCategory::DataGap => 3,
            ErrorCategory::Validation => 4,
            ErrorCategory::Broker => 5,
        };
        std::process::ExitCode::from(code)
    }
}

/// Failure kinds of the prediction path.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("prediction failed: {0}")]
    Internal(String),
}
