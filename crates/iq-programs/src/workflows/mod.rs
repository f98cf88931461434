pub mod address;
pub mod catalog;
pub mod eligibility;
pub mod enrollment;
pub mod router;
pub mod service;
pub mod storage;

#[cfg(test)]
mod tests;

pub use router::benefits_router;
pub use service::{BenefitsService, Collaborators, ServiceError};
