//! Core error type.
//!
//! Settings problems are the bulk of what lives here: every construction path
//! in the workspace reads named keys, and a bad key must abort the run before
//! the first tick.  Sub-crates wrap `CoreError` as one variant of their own
//! error enums via `#[from]`.

use thiserror::Error;

use crate::HostId;

/// The top-level error type for `opp-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("missing setting {0}")]
    MissingSetting(String),

    #[error("invalid value {value:?} for setting {key}: {reason}")]
    InvalidSetting {
        key:    String,
        value:  String,
        reason: String,
    },

    #[error("setting {key} must be a single value or two comma separated values, got {value:?}")]
    MalformedRange { key: String, value: String },

    #[error("host {0} not found")]
    HostNotFound(HostId),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub(crate) fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        CoreError::InvalidSetting {
            key:    key.to_owned(),
            value:  value.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Shorthand result type for all `opp-*` crates.
pub type CoreResult<T> = Result<T, CoreError>;
