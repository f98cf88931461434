use serde::{Deserialize, Serialize};

use super::domain::{DocumentRef, UserId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    #[error("document '{0}' was rejected")]
    Rejected(String),
}

/// Uploaded income-proof document, as received from the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedDocument {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// External file store; only the returned reference is persisted.
pub trait DocumentStore: Send + Sync {
    fn store(&self, user_id: UserId, document: UploadedDocument) -> Result<DocumentRef, DocumentError>;
}
