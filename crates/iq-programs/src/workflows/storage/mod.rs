//! Persistence errors shared by every repository trait, plus the in-memory
//! store used by the demo service and tests.

mod memory;

pub use memory::InMemoryStore;

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("enrolled record is protected from deletion")]
    Protected,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
