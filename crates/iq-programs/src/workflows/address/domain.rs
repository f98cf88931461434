use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::workflows::enrollment::UserId;

/// Identifier of a canonical address record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AddressId(pub u64);

/// Content hash of the normalized address fields; unique per record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AddressHash(pub String);

/// Address fields as the applicant typed them. `address1` is the street
/// line, `address2` the apartment/unit line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInput {
    pub address1: String,
    #[serde(default)]
    pub address2: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
}

/// Address components in the postal validator's convention, where
/// `address1` carries the secondary (unit) line and `address2` the primary
/// street line. This is the reverse of [`AddressInput`] and
/// [`AddressRecord`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalAddress {
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub state: String,
    pub zip5: String,
}

impl PostalAddress {
    /// Raw structured fields, swapped into validator order.
    pub fn from_input(input: &AddressInput) -> Self {
        Self {
            address1: input.address2.trim().to_string(),
            address2: input.address1.trim().to_string(),
            city: input.city.trim().to_string(),
            state: input.state.trim().to_string(),
            zip5: input.zip_code.trim().to_string(),
        }
    }

    /// Stored record fields, swapped back into validator order.
    pub fn from_record(record: &AddressRecord) -> Self {
        Self {
            address1: record.address2.clone(),
            address2: record.address1.clone(),
            city: record.city.clone(),
            state: record.state.clone(),
            zip5: record.zip_code.clone(),
        }
    }

    /// Fields in internal order, for display on the correction prompt.
    pub fn to_input(&self) -> AddressInput {
        AddressInput {
            address1: self.address2.clone(),
            address2: self.address1.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            zip_code: self.zip5.clone(),
        }
    }
}

/// Uppercased address fields in internal order, ready to be hashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalAddress {
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

impl CanonicalAddress {
    pub fn from_postal(validated: &PostalAddress) -> Self {
        Self {
            address1: canonical_part(&validated.address2),
            address2: canonical_part(&validated.address1),
            city: canonical_part(&validated.city),
            state: canonical_part(&validated.state),
            zip_code: canonical_part(&validated.zip5),
        }
    }

    pub fn hash(&self) -> AddressHash {
        let mut hasher = Sha256::new();
        for (index, part) in [
            &self.address1,
            &self.address2,
            &self.city,
            &self.state,
            &self.zip_code,
        ]
        .into_iter()
        .enumerate()
        {
            if index > 0 {
                // Unit separator keeps "12 A" + "B" distinct from "12 AB" + "".
                hasher.update([0x1f]);
            }
            hasher.update(part.as_bytes());
        }
        AddressHash(format!("{:x}", hasher.finalize()))
    }

    /// Case-insensitive comparison against what the applicant entered.
    pub fn matches_input(&self, input: &AddressInput) -> bool {
        self.address1 == canonical_part(&input.address1)
            && self.address2 == canonical_part(&input.address2)
            && self.city == canonical_part(&input.city)
            && self.state == canonical_part(&input.state)
            && self.zip_code == canonical_part(&input.zip_code)
    }
}

/// Trim, collapse inner whitespace and uppercase a single address part.
pub fn canonical_part(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Serviceability flags derived from the geocoder and GIS lookups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAreaFlags {
    pub is_in_service_area: bool,
    pub has_broadband_service: bool,
}

/// Boolean address attributes that program requirements are checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressAttribute {
    InServiceArea,
    CityCovered,
    BroadbandService,
}

/// Canonical, deduplicated address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub id: AddressId,
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub hash: AddressHash,
    pub is_in_service_area: bool,
    pub is_city_covered: bool,
    pub has_broadband_service: bool,
    pub is_verified: bool,
}

impl AddressRecord {
    pub fn attribute(&self, attribute: AddressAttribute) -> bool {
        match attribute {
            AddressAttribute::InServiceArea => self.is_in_service_area,
            AddressAttribute::CityCovered => self.is_city_covered,
            AddressAttribute::BroadbandService => self.has_broadband_service,
        }
    }

    /// Record the serviceability outcome and mark the address verified.
    /// City coverage tracks the service-area result.
    pub fn apply_service_area(&mut self, flags: ServiceAreaFlags) {
        self.is_in_service_area = flags.is_in_service_area;
        self.is_city_covered = flags.is_in_service_area;
        self.has_broadband_service = flags.has_broadband_service;
        self.is_verified = true;
    }
}

/// Address record fields before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressDraft {
    pub address: CanonicalAddress,
    pub hash: AddressHash,
    pub flags: ServiceAreaFlags,
}

impl AddressDraft {
    pub fn into_record(self, id: AddressId) -> AddressRecord {
        let mut record = AddressRecord {
            id,
            address1: self.address.address1,
            address2: self.address.address2,
            city: self.address.city,
            state: self.address.state,
            zip_code: self.address.zip_code,
            hash: self.hash,
            is_in_service_area: false,
            is_city_covered: false,
            has_broadband_service: false,
            is_verified: false,
        };
        record.apply_service_area(self.flags);
        record
    }
}

/// Per-user pointers to the eligibility and mailing address records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAddressLink {
    pub user_id: UserId,
    pub eligibility_address_id: AddressId,
    pub mailing_address_id: AddressId,
}
