use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::workflows::address::{AddressAttribute, AddressRecord};

/// Identifier of an assistance ("IQ") program catalog row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProgramId(pub u32);

impl std::fmt::Display for ProgramId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an income-proof eligibility program catalog row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EligibilityProgramId(pub u32);

impl std::fmt::Display for EligibilityProgramId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Address conditions an assistance program may demand of the applicant's
/// eligibility address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressRequirement {
    InServiceArea,
    CityCovered,
    BroadbandService,
}

/// Every requirement paired with the address attribute it checks.
pub const REQUIREMENT_ATTRIBUTES: [(AddressRequirement, AddressAttribute); 3] = [
    (
        AddressRequirement::InServiceArea,
        AddressAttribute::InServiceArea,
    ),
    (AddressRequirement::CityCovered, AddressAttribute::CityCovered),
    (
        AddressRequirement::BroadbandService,
        AddressAttribute::BroadbandService,
    ),
];

/// Document-backed income-proof category (e.g. SNAP, Medicaid).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityProgram {
    pub id: EligibilityProgramId,
    pub program_name: String,
    pub friendly_name: String,
    pub ami_threshold: Decimal,
    pub is_active: bool,
}

/// A benefit users can be enrolled in once eligible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistanceProgram {
    pub id: ProgramId,
    pub program_name: String,
    pub friendly_name: String,
    pub ami_threshold: Decimal,
    pub is_active: bool,
    pub enable_autoapply: bool,
    pub requirements: BTreeSet<AddressRequirement>,
    /// `None` means lifetime enrollment.
    pub renewal_interval_years: Option<u32>,
}

impl AssistanceProgram {
    pub fn requires(&self, requirement: AddressRequirement) -> bool {
        self.requirements.contains(&requirement)
    }

    pub fn is_lifetime(&self) -> bool {
        self.renewal_interval_years.is_none()
    }

    /// Whether every declared address requirement holds for `address`.
    pub fn address_qualifies(&self, address: &AddressRecord) -> bool {
        REQUIREMENT_ATTRIBUTES
            .iter()
            .filter(|(requirement, _)| self.requires(*requirement))
            .all(|(_, attribute)| address.attribute(*attribute))
    }
}

/// Point-in-time view of both catalogs, loaded once per evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramCatalog {
    eligibility: BTreeMap<EligibilityProgramId, EligibilityProgram>,
    assistance: BTreeMap<ProgramId, AssistanceProgram>,
}

impl ProgramCatalog {
    pub fn new(
        eligibility: impl IntoIterator<Item = EligibilityProgram>,
        assistance: impl IntoIterator<Item = AssistanceProgram>,
    ) -> Self {
        Self {
            eligibility: eligibility
                .into_iter()
                .map(|program| (program.id, program))
                .collect(),
            assistance: assistance
                .into_iter()
                .map(|program| (program.id, program))
                .collect(),
        }
    }

    pub fn assistance_program(&self, id: ProgramId) -> Option<&AssistanceProgram> {
        self.assistance.get(&id)
    }

    pub fn eligibility_program(&self, id: EligibilityProgramId) -> Option<&EligibilityProgram> {
        self.eligibility.get(&id)
    }

    /// Assistance programs ordered by id.
    pub fn assistance_programs(&self) -> impl Iterator<Item = &AssistanceProgram> {
        self.assistance.values()
    }

    pub fn eligibility_programs(&self) -> impl Iterator<Item = &EligibilityProgram> {
        self.eligibility.values()
    }

    /// Shortest renewal interval among active programs that renew at all.
    pub fn shortest_renewal_interval(&self) -> Option<u32> {
        self.assistance
            .values()
            .filter(|program| program.is_active)
            .filter_map(|program| program.renewal_interval_years)
            .min()
    }

    /// Display name for a program id, falling back to the raw id for
    /// programs removed from the catalog.
    pub fn program_name(&self, id: ProgramId) -> String {
        self.assistance
            .get(&id)
            .map(|program| program.program_name.clone())
            .unwrap_or_else(|| format!("program #{}", id.0))
    }

    pub fn friendly_name(&self, id: ProgramId) -> String {
        self.assistance
            .get(&id)
            .map(|program| program.friendly_name.clone())
            .unwrap_or_else(|| format!("program #{}", id.0))
    }

    pub fn upsert_assistance(&mut self, program: AssistanceProgram) {
        self.assistance.insert(program.id, program);
    }

    pub fn upsert_eligibility(&mut self, program: EligibilityProgram) {
        self.eligibility.insert(program.id, program);
    }
}
