use serde::{Deserialize, Serialize};

use super::domain::PostalAddress;

/// Structured outcome reported by the postal validation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationStatus {
    /// Clean canonical match.
    Matched(PostalAddress),
    /// The service recognised the address but wants more detail, usually a
    /// missing or invalid unit number.
    NeedsMoreInformation {
        guidance: String,
        best_guess: Option<PostalAddress>,
    },
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidatorError {
    #[error("postal validator unavailable: {0}")]
    Unavailable(String),
    #[error("postal validator returned a malformed response: {0}")]
    Malformed(String),
}

/// Client for the external postal validation service.
pub trait PostalValidator: Send + Sync {
    fn validate(&self, components: &PostalAddress) -> Result<ValidationStatus, ValidatorError>;
}
