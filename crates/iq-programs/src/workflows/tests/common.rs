use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::workflows::address::{
    canonical_part, AddressDraft, AddressInput, AddressLabel, AddressRecord,
    AddressRepository, AddressTagger, BroadbandLookup, CanonicalAddress, Coordinate,
    GeocodeCandidate, Geocoder, LookupError, PostalAddress, PostalValidator, ServiceAreaFlags,
    ServiceAreaLookup, ServiceAreaPolicy, ServiceAreaResolver, TagError, TaggedAddress,
    UserAddressLink, ValidationStatus, ValidatorError,
};
use crate::workflows::catalog::{
    AddressRequirement, AssistanceProgram, EligibilityProgram, EligibilityProgramId,
    ProgramCatalog, ProgramId,
};
use crate::workflows::enrollment::{
    ApplicantRepository, DocumentError, DocumentRef, DocumentStore, EligibilitySelection,
    EnrollmentRecord, EnrollmentRepository, Household, HousingTenure, Notifier, NotifierError,
    UploadedDocument, UserId, UserProfile,
};
use crate::workflows::storage::InMemoryStore;

pub(crate) const NEEDS_UNIT: &str = "Default address: The address you entered was found but more information is needed (such as an apartment, suite, or box number) to match to a specific address.";

pub(crate) fn decimal(raw: &str) -> Decimal {
    Decimal::from_str(raw).expect("valid decimal literal")
}

pub(crate) fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(crate) fn requirements(list: &[AddressRequirement]) -> BTreeSet<AddressRequirement> {
    list.iter().copied().collect()
}

pub(crate) fn assistance_program(
    id: u32,
    name: &str,
    threshold: &str,
    requires: &[AddressRequirement],
) -> AssistanceProgram {
    AssistanceProgram {
        id: ProgramId(id),
        program_name: name.to_lowercase().replace(' ', "_"),
        friendly_name: name.to_string(),
        ami_threshold: decimal(threshold),
        is_active: true,
        enable_autoapply: true,
        requirements: requirements(requires),
        renewal_interval_years: Some(1),
    }
}

pub(crate) fn eligibility_program(id: u32, name: &str, threshold: &str) -> EligibilityProgram {
    EligibilityProgram {
        id: EligibilityProgramId(id),
        program_name: name.to_lowercase(),
        friendly_name: name.to_string(),
        ami_threshold: decimal(threshold),
        is_active: true,
    }
}

/// Grocery (service area, 0.6), Recreation (city covered, 0.3), Connexion
/// (broadband, 0.6, lifetime, explicit apply) and SPIN (service area, 0.3,
/// two-year interval).
pub(crate) fn standard_catalog() -> ProgramCatalog {
    let grocery = assistance_program(1, "Grocery Rebate", "0.6", &[AddressRequirement::InServiceArea]);
    let recreation = assistance_program(2, "Recreation", "0.3", &[AddressRequirement::CityCovered]);
    let mut connexion = assistance_program(
        3,
        "Connexion",
        "0.6",
        &[AddressRequirement::BroadbandService],
    );
    connexion.renewal_interval_years = None;
    connexion.enable_autoapply = false;
    let mut spin = assistance_program(4, "SPIN", "0.3", &[AddressRequirement::InServiceArea]);
    spin.renewal_interval_years = Some(2);

    ProgramCatalog::new(
        [
            eligibility_program(1, "SNAP", "0.3"),
            eligibility_program(2, "Medicaid", "0.5"),
            eligibility_program(3, "Free and Reduced Lunch", "0.6"),
        ],
        [grocery, recreation, connexion, spin],
    )
}

pub(crate) fn address_input(street: &str, unit: &str) -> AddressInput {
    AddressInput {
        address1: street.to_string(),
        address2: unit.to_string(),
        city: "Fort Collins".to_string(),
        state: "CO".to_string(),
        zip_code: "80521".to_string(),
    }
}

pub(crate) fn canonical_postal(street: &str, unit: &str) -> PostalAddress {
    PostalAddress {
        address1: unit.to_uppercase(),
        address2: street.to_uppercase(),
        city: "FORT COLLINS".to_string(),
        state: "CO".to_string(),
        zip5: "80521".to_string(),
    }
}

/// Insert a verified address with the given flags directly into the store.
pub(crate) fn store_address(
    store: &InMemoryStore,
    street: &str,
    flags: ServiceAreaFlags,
) -> AddressRecord {
    let canonical = CanonicalAddress::from_postal(&canonical_postal(street, ""));
    let hash = canonical.hash();
    store
        .insert_address(AddressDraft {
            address: canonical,
            hash,
            flags,
        })
        .expect("address inserts")
}

pub(crate) fn in_area(broadband: bool) -> ServiceAreaFlags {
    ServiceAreaFlags {
        is_in_service_area: true,
        has_broadband_service: broadband,
    }
}

pub(crate) fn outside_area() -> ServiceAreaFlags {
    ServiceAreaFlags::default()
}

/// Seed a user with a household and linked eligibility address.
pub(crate) fn seed_user(
    store: &InMemoryStore,
    user: u64,
    address: &AddressRecord,
    income: Option<&str>,
) -> UserId {
    let user_id = UserId(user);
    let mut profile = UserProfile::new(user_id, format!("user{user}@example.org"));
    profile.phone = Some(format!("970555{user:04}"));
    store.save_user(profile).expect("user saves");
    store
        .save_household(Household {
            user_id,
            tenure: HousingTenure::Rent,
            duration_at_address: "More than 3 Years".to_string(),
            household_size: 2,
            income_as_fraction_of_ami: income.map(decimal),
            income_verified: true,
        })
        .expect("household saves");
    store
        .link_user(UserAddressLink {
            user_id,
            eligibility_address_id: address.id,
            mailing_address_id: address.id,
        })
        .expect("link saves");
    user_id
}

pub(crate) fn select(store: &InMemoryStore, user_id: UserId, program: u32) {
    store
        .save_eligibility_selection(EligibilitySelection {
            user_id,
            program_id: EligibilityProgramId(program),
            document: Some(DocumentRef(format!("doc-{}-{program}", user_id.0))),
        })
        .expect("selection saves");
}

pub(crate) fn hold(store: &InMemoryStore, user_id: UserId, program: u32, enrolled: bool) {
    let mut record = EnrollmentRecord::applied(user_id, ProgramId(program), at(2023, 1, 10));
    if enrolled {
        record.is_enrolled = true;
        record.enrolled_at = Some(at(2023, 2, 1));
    }
    store.create_enrollment(record).expect("enrollment creates");
}

pub(crate) fn held_programs(store: &InMemoryStore, user_id: UserId) -> Vec<u32> {
    store
        .enrollments(user_id)
        .expect("enrollments load")
        .into_iter()
        .map(|record| record.program_id.0)
        .collect()
}

/// Tagger whose every parse is ambiguous.
pub(crate) struct AmbiguousTagger;

impl AddressTagger for AmbiguousTagger {
    fn tag(&self, text: &str) -> Result<TaggedAddress, TagError> {
        Err(TagError::RepeatedLabel {
            label: AddressLabel::OccupancyIdentifier,
            input: text.to_string(),
        })
    }
}

/// Postal validator backed by a fixed list of canonical addresses.
///
/// An address with a unit only matches when the submitted secondary line
/// carries the same unit id; with `unit_prefix_required` it must also be in
/// `Unit <id>` form.
#[derive(Default)]
pub(crate) struct FakeValidator {
    known: Vec<PostalAddress>,
    unit_prefix_required: bool,
    unavailable: bool,
    calls: Mutex<Vec<PostalAddress>>,
}

impl FakeValidator {
    pub(crate) fn knowing(known: Vec<PostalAddress>) -> Self {
        Self {
            known,
            ..Self::default()
        }
    }

    pub(crate) fn requiring_unit_prefix(mut self) -> Self {
        self.unit_prefix_required = true;
        self
    }

    pub(crate) fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<PostalAddress> {
        self.calls.lock().expect("validator mutex poisoned").clone()
    }
}

impl PostalValidator for FakeValidator {
    fn validate(&self, components: &PostalAddress) -> Result<ValidationStatus, ValidatorError> {
        self.calls
            .lock()
            .expect("validator mutex poisoned")
            .push(components.clone());

        if self.unavailable {
            return Err(ValidatorError::Unavailable("connection refused".to_string()));
        }

        let street = canonical_part(&components.address2);
        let Some(known) = self
            .known
            .iter()
            .find(|known| known.address2 == street && known.zip5 == components.zip5.trim())
        else {
            return Ok(ValidationStatus::NotFound);
        };

        if known.address1.is_empty() {
            return Ok(ValidationStatus::Matched(known.clone()));
        }

        let needs_more = || ValidationStatus::NeedsMoreInformation {
            guidance: NEEDS_UNIT.to_string(),
            best_guess: Some(PostalAddress {
                address1: String::new(),
                ..known.clone()
            }),
        };

        let secondary = canonical_part(&components.address1);
        if secondary.is_empty() || (self.unit_prefix_required && !secondary.starts_with("UNIT ")) {
            return Ok(needs_more());
        }

        let unit_id = |line: &str| line.split_whitespace().last().map(str::to_string);
        if unit_id(&secondary) == unit_id(&known.address1) {
            Ok(ValidationStatus::Matched(known.clone()))
        } else {
            Ok(needs_more())
        }
    }
}

pub(crate) struct StaticGeocoder {
    result: Result<Vec<GeocodeCandidate>, LookupError>,
    queries: Mutex<Vec<String>>,
}

impl StaticGeocoder {
    pub(crate) fn hit(score: f64) -> Self {
        Self::with(Ok(vec![GeocodeCandidate {
            location: Coordinate { x: 3_127_000.5, y: 1_451_000.25 },
            score,
        }]))
    }

    pub(crate) fn with(result: Result<Vec<GeocodeCandidate>, LookupError>) -> Self {
        Self {
            result,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn queries(&self) -> Vec<String> {
        self.queries.lock().expect("geocoder mutex poisoned").clone()
    }
}

impl Geocoder for StaticGeocoder {
    fn candidates(&self, street_and_zip: &str) -> Result<Vec<GeocodeCandidate>, LookupError> {
        self.queries
            .lock()
            .expect("geocoder mutex poisoned")
            .push(street_and_zip.to_string());
        self.result.clone()
    }
}

pub(crate) struct StaticBroadband(pub(crate) Result<Option<String>, LookupError>);

impl BroadbandLookup for StaticBroadband {
    fn inventory_status(&self, _location: Coordinate) -> Result<Option<String>, LookupError> {
        self.0.clone()
    }
}

/// Polygon lookup whose answer can change between calls.
#[derive(Default)]
pub(crate) struct SwitchablePolygons {
    count: AtomicUsize,
    failing: bool,
}

impl SwitchablePolygons {
    pub(crate) fn intersecting(count: usize) -> Self {
        Self {
            count: AtomicUsize::new(count),
            failing: false,
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            count: AtomicUsize::new(0),
            failing: true,
        }
    }

    pub(crate) fn set(&self, count: usize) {
        self.count.store(count, Ordering::SeqCst);
    }
}

impl ServiceAreaLookup for SwitchablePolygons {
    fn intersecting_polygons(&self, _location: Coordinate) -> Result<usize, LookupError> {
        if self.failing {
            return Err(LookupError::Endpoint("400: invalid geometry".to_string()));
        }
        Ok(self.count.load(Ordering::SeqCst))
    }
}

pub(crate) fn resolver(
    geocoder: Arc<StaticGeocoder>,
    broadband: Arc<StaticBroadband>,
    polygons: Arc<SwitchablePolygons>,
) -> ServiceAreaResolver {
    ServiceAreaResolver::new(geocoder, broadband, polygons, ServiceAreaPolicy::default())
}

/// Resolver that finds every address inside the service area with broadband.
pub(crate) fn serviceable_resolver() -> ServiceAreaResolver {
    resolver(
        Arc::new(StaticGeocoder::hit(98.5)),
        Arc::new(StaticBroadband(Ok(Some("Released".to_string())))),
        Arc::new(SwitchablePolygons::intersecting(1)),
    )
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    fail: bool,
    sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }

    fn record(&self, message: String) -> Result<(), NotifierError> {
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(message);
        if self.fail {
            Err(NotifierError::Transport("smtp timeout".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Notifier for RecordingNotifier {
    fn send_welcome_email(&self, email: &str) -> Result<(), NotifierError> {
        self.record(format!("email:{email}"))
    }

    fn send_welcome_sms(&self, phone: &str) -> Result<(), NotifierError> {
        self.record(format!("sms:{phone}"))
    }
}

#[derive(Default)]
pub(crate) struct MemoryDocuments {
    stored: Mutex<Vec<String>>,
}

impl DocumentStore for MemoryDocuments {
    fn store(&self, user_id: UserId, document: UploadedDocument) -> Result<DocumentRef, DocumentError> {
        if document.bytes.is_empty() {
            return Err(DocumentError::Rejected(document.file_name));
        }
        let mut stored = self.stored.lock().expect("documents mutex poisoned");
        stored.push(document.file_name.clone());
        Ok(DocumentRef(format!("{}/{}/{}", user_id.0, stored.len(), document.file_name)))
    }
}
