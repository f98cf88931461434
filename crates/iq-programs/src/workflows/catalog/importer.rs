use std::collections::{BTreeSet, HashSet};
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use super::domain::{AddressRequirement, AssistanceProgram, ProgramId};
use super::validation::{validate_program, CatalogError};

#[derive(Debug)]
pub enum CatalogImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Threshold { row: usize, value: String },
    RenewalInterval { row: usize, value: String },
    DuplicateId { row: usize, id: ProgramId },
    Invalid { row: usize, source: CatalogError },
}

impl std::fmt::Display for CatalogImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogImportError::Io(err) => write!(f, "failed to read program catalog: {}", err),
            CatalogImportError::Csv(err) => write!(f, "invalid program catalog CSV: {}", err),
            CatalogImportError::Threshold { row, value } => {
                write!(f, "row {row}: ami_threshold '{value}' is not a decimal")
            }
            CatalogImportError::RenewalInterval { row, value } => {
                write!(f, "row {row}: renewal_interval_years '{value}' is not a whole number")
            }
            CatalogImportError::DuplicateId { row, id } => {
                write!(f, "row {row}: program id {} appears more than once", id.0)
            }
            CatalogImportError::Invalid { row, source } => write!(f, "row {row}: {source}"),
        }
    }
}

impl std::error::Error for CatalogImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogImportError::Io(err) => Some(err),
            CatalogImportError::Csv(err) => Some(err),
            CatalogImportError::Invalid { source, .. } => Some(source),
            CatalogImportError::Threshold { .. }
            | CatalogImportError::RenewalInterval { .. }
            | CatalogImportError::DuplicateId { .. } => None,
        }
    }
}

impl From<std::io::Error> for CatalogImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for CatalogImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Loads assistance program rows from a CSV export, validating each row the
/// same way an administrator edit is validated.
pub struct CatalogImporter;

impl CatalogImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<AssistanceProgram>, CatalogImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<AssistanceProgram>, CatalogImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut programs = Vec::new();
        let mut seen = HashSet::new();

        for (index, record) in csv_reader.deserialize::<ProgramRow>().enumerate() {
            // Header is line 1.
            let row = index + 2;
            let parsed = record?;
            let program = parsed.into_program(row)?;

            if !seen.insert(program.id) {
                return Err(CatalogImportError::DuplicateId {
                    row,
                    id: program.id,
                });
            }

            validate_program(&program).map_err(|source| CatalogImportError::Invalid { row, source })?;
            programs.push(program);
        }

        Ok(programs)
    }
}

#[derive(Debug, Deserialize)]
struct ProgramRow {
    id: u32,
    program_name: String,
    #[serde(default)]
    friendly_name: String,
    ami_threshold: String,
    #[serde(deserialize_with = "flag")]
    is_active: bool,
    #[serde(deserialize_with = "flag")]
    enable_autoapply: bool,
    #[serde(default, deserialize_with = "flag")]
    requires_is_in_service_area: bool,
    #[serde(default, deserialize_with = "flag")]
    requires_is_city_covered: bool,
    #[serde(default, deserialize_with = "flag")]
    requires_has_broadband: bool,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    renewal_interval_years: Option<String>,
}

impl ProgramRow {
    fn into_program(self, row: usize) -> Result<AssistanceProgram, CatalogImportError> {
        let ami_threshold = Decimal::from_str(&self.ami_threshold).map_err(|_| {
            CatalogImportError::Threshold {
                row,
                value: self.ami_threshold.clone(),
            }
        })?;

        let renewal_interval_years = match self.renewal_interval_years {
            Some(raw) => Some(
                raw.parse::<u32>()
                    .map_err(|_| CatalogImportError::RenewalInterval { row, value: raw.clone() })?,
            ),
            None => None,
        };

        let mut requirements = BTreeSet::new();
        for (requirement, declared) in [
            (
                AddressRequirement::InServiceArea,
                self.requires_is_in_service_area,
            ),
            (AddressRequirement::CityCovered, self.requires_is_city_covered),
            (
                AddressRequirement::BroadbandService,
                self.requires_has_broadband,
            ),
        ] {
            if declared {
                requirements.insert(requirement);
            }
        }

        let friendly_name = if self.friendly_name.is_empty() {
            self.program_name.clone()
        } else {
            self.friendly_name
        };

        Ok(AssistanceProgram {
            id: ProgramId(self.id),
            program_name: self.program_name,
            friendly_name,
            ami_threshold,
            is_active: self.is_active,
            enable_autoapply: self.enable_autoapply,
            requirements,
            renewal_interval_years,
        })
    }
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(true),
        "" | "false" | "f" | "no" | "n" | "0" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "expected a boolean flag, found '{other}'"
        ))),
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
