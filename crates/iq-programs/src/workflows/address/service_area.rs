use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::domain::{PostalAddress, ServiceAreaFlags};
use crate::config::ServiceAreaConfig;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeocodeCandidate {
    pub location: Coordinate,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("lookup endpoint unavailable: {0}")]
    Unavailable(String),
    #[error("lookup endpoint returned an error: {0}")]
    Endpoint(String),
}

/// Municipal address-point geocoder. Candidates are ordered best first.
pub trait Geocoder: Send + Sync {
    fn candidates(&self, street_and_zip: &str) -> Result<Vec<GeocodeCandidate>, LookupError>;
}

/// Broadband inventory query; `None` when no inventory feature covers the
/// point.
pub trait BroadbandLookup: Send + Sync {
    fn inventory_status(&self, location: Coordinate) -> Result<Option<String>, LookupError>;
}

/// Service-area polygon query returning the number of intersecting polygons.
pub trait ServiceAreaLookup: Send + Sync {
    fn intersecting_polygons(&self, location: Coordinate) -> Result<usize, LookupError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadbandStatus {
    Available,
    ComingSoon,
    Unknown,
}

impl BroadbandStatus {
    pub fn is_available(self) -> bool {
        matches!(self, BroadbandStatus::Available)
    }
}

/// Thresholds and vocabularies that decide serviceability.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceAreaPolicy {
    pub municipality: String,
    pub geocode_min_score: f64,
    pub released_statuses: Vec<String>,
}

impl From<&ServiceAreaConfig> for ServiceAreaPolicy {
    fn from(config: &ServiceAreaConfig) -> Self {
        Self {
            municipality: config.municipality.clone(),
            geocode_min_score: config.geocode_min_score,
            released_statuses: config.released_statuses.clone(),
        }
    }
}

impl Default for ServiceAreaPolicy {
    fn default() -> Self {
        Self::from(&ServiceAreaConfig::default())
    }
}

impl ServiceAreaPolicy {
    pub fn classify_broadband(&self, status: &str) -> BroadbandStatus {
        let status = status.trim().to_lowercase();
        if self
            .released_statuses
            .iter()
            .any(|released| *released == status)
        {
            BroadbandStatus::Available
        } else {
            BroadbandStatus::ComingSoon
        }
    }
}

/// Derives service-area flags for a canonical address from the geocoder and
/// GIS lookups. Lookup failures never escape; they resolve to `false`.
#[derive(Clone)]
pub struct ServiceAreaResolver {
    geocoder: Arc<dyn Geocoder>,
    broadband: Arc<dyn BroadbandLookup>,
    service_area: Arc<dyn ServiceAreaLookup>,
    policy: ServiceAreaPolicy,
}

impl ServiceAreaResolver {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        broadband: Arc<dyn BroadbandLookup>,
        service_area: Arc<dyn ServiceAreaLookup>,
        policy: ServiceAreaPolicy,
    ) -> Self {
        Self {
            geocoder,
            broadband,
            service_area,
            policy,
        }
    }

    pub fn policy(&self) -> &ServiceAreaPolicy {
        &self.policy
    }

    /// Geocode `"<street line>, <zip>"` and query both GIS layers at the hit.
    pub fn determine(&self, address: &PostalAddress) -> ServiceAreaFlags {
        let street_and_zip = format!("{}, {}", address.address2, address.zip5);

        let Some(location) = self.locate(&street_and_zip) else {
            if address
                .city
                .trim()
                .eq_ignore_ascii_case(self.policy.municipality.trim())
            {
                error!(
                    street = %street_and_zip,
                    city = %address.city,
                    "municipality address outside service area"
                );
            }
            return ServiceAreaFlags::default();
        };

        let broadband = self.broadband_status(location);
        info!(street = %street_and_zip, broadband = ?broadband, "broadband status resolved");

        let is_in_service_area = self.in_service_area(location);
        info!(street = %street_and_zip, is_in_service_area, "service area resolved");

        ServiceAreaFlags {
            is_in_service_area,
            has_broadband_service: broadband.is_available(),
        }
    }

    fn locate(&self, street_and_zip: &str) -> Option<Coordinate> {
        match self.geocoder.candidates(street_and_zip) {
            Ok(candidates) => candidates
                .first()
                .filter(|best| best.score > self.policy.geocode_min_score)
                .map(|best| best.location),
            Err(err) => {
                warn!(street = %street_and_zip, error = %err, "geocoder lookup failed");
                None
            }
        }
    }

    pub fn broadband_status(&self, location: Coordinate) -> BroadbandStatus {
        match self.broadband.inventory_status(location) {
            Ok(Some(status)) => self.policy.classify_broadband(&status),
            Ok(None) => BroadbandStatus::ComingSoon,
            Err(err) => {
                warn!(error = %err, "broadband lookup failed");
                BroadbandStatus::Unknown
            }
        }
    }

    pub fn in_service_area(&self, location: Coordinate) -> bool {
        match self.service_area.intersecting_polygons(location) {
            Ok(count) => count > 0,
            Err(err) => {
                warn!(error = %err, "service area lookup failed");
                false
            }
        }
    }
}
