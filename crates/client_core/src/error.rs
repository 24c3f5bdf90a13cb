//! Error taxonomy for stage loads and mutations.

use shared::error::ApiException;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The request was superseded by a newer one for the same stage.
    #[error("request for stage '{stage}' was superseded")]
    Aborted { stage: String },
    /// `status` is the HTTP status when the backend answered at all.
    #[error("network error: {cause}")]
    Network { cause: String, status: Option<u16> },
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },
    #[error("stage '{0}' is already registered")]
    DuplicateStage(String),
    #[error("stage '{0}' is not registered")]
    UnknownStage(String),
    #[error("controller has been unmounted")]
    Unmounted,
}

impl LoadError {
    pub fn network(cause: &anyhow::Error) -> Self {
        Self::Network {
            cause: format!("{cause:#}"),
            status: http_status(cause),
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

fn http_status(err: &anyhow::Error) -> Option<u16> {
    err.chain().find_map(|source| {
        if let Some(api) = source.downcast_ref::<ApiException>() {
            return Some(api.status);
        }
        source
            .downcast_ref::<reqwest::Error>()
            .and_then(reqwest::Error::status)
            .map(|status| status.as_u16())
    })
}
