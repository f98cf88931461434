use chrono::{DateTime, Datelike, Months, Utc};
use serde::{Deserialize, Serialize};

use super::domain::EnrollmentRecord;
use crate::workflows::catalog::{AssistanceProgram, ProgramCatalog};

/// Dashboard status of a held program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    Pending,
    Active,
    Renewal,
}

impl EnrollmentStatus {
    pub fn of(record: &EnrollmentRecord, program: &AssistanceProgram, needs_renewal: bool) -> Self {
        if !record.is_enrolled {
            EnrollmentStatus::Pending
        } else if needs_renewal && !program.is_lifetime() {
            EnrollmentStatus::Renewal
        } else {
            EnrollmentStatus::Active
        }
    }
}

/// True once the shortest renewal interval in the catalog has elapsed since
/// the user's last completed application. Users who never completed one and
/// catalogs with only lifetime programs never need renewal.
pub fn needs_renewal(
    last_completed_at: Option<DateTime<Utc>>,
    catalog: &ProgramCatalog,
    now: DateTime<Utc>,
) -> bool {
    let (Some(completed), Some(years)) = (last_completed_at, catalog.shortest_renewal_interval())
    else {
        return false;
    };

    match completed.checked_add_months(Months::new(years.saturating_mul(12))) {
        Some(due) => due <= now,
        None => false,
    }
}

/// Calendar-year renewal: the "renew now" action opens during the year the
/// shortest interval comes due.
pub fn renew_now_enabled(
    last_completed_at: Option<DateTime<Utc>>,
    catalog: &ProgramCatalog,
    now: DateTime<Utc>,
) -> bool {
    let (Some(completed), Some(years)) = (last_completed_at, catalog.shortest_renewal_interval())
    else {
        return false;
    };

    i64::from(now.year()) == i64::from(completed.year()) + i64::from(years)
}
