use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::workflows::catalog::{EligibilityProgramId, ProgramId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account fields the enrollment engine reads and stamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub phone: Option<String>,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub renewal_mode: bool,
    /// Renewal progress, page name to status.
    #[serde(default)]
    pub last_renewal_action: BTreeMap<String, String>,
}

impl UserProfile {
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            phone: None,
            last_completed_at: None,
            renewal_mode: false,
            last_renewal_action: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HousingTenure {
    Rent,
    Own,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Household {
    pub user_id: UserId,
    pub tenure: HousingTenure,
    pub duration_at_address: String,
    pub household_size: u32,
    /// Set by finalization to the lowest threshold across selections.
    pub income_as_fraction_of_ami: Option<Decimal>,
    pub income_verified: bool,
}

/// Identifier returned by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef(pub String);

/// A user's claim to an income-proof program. Its presence drives the AMI
/// computation; the document is informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilitySelection {
    pub user_id: UserId,
    pub program_id: EligibilityProgramId,
    pub document: Option<DocumentRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub user_id: UserId,
    pub program_id: ProgramId,
    pub applied_at: DateTime<Utc>,
    pub enrolled_at: Option<DateTime<Utc>>,
    pub is_enrolled: bool,
}

impl EnrollmentRecord {
    pub fn applied(user_id: UserId, program_id: ProgramId, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            program_id,
            applied_at: at,
            enrolled_at: None,
            is_enrolled: false,
        }
    }
}

/// Who or what caused an enrollment change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOrigin {
    User,
    AutoApply,
    Renewal,
    Admin,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentChange {
    Applied,
    Enrolled,
    Lapsed,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentHistoryEntry {
    pub user_id: UserId,
    pub program_id: ProgramId,
    pub change: EnrollmentChange,
    pub origin: ChangeOrigin,
    pub at: DateTime<Utc>,
}
