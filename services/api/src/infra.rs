use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

use iq_programs::config::{
    AppConfig, AppEnvironment, CatalogConfig, LogFormat, ServerConfig, ServiceAreaConfig,
    TelemetryConfig,
};
use iq_programs::error::AppError;
use iq_programs::workflows::address::{
    canonical_part, BroadbandLookup, Coordinate, GeocodeCandidate, Geocoder, LookupError,
    PostalAddress, PostalValidator, RuleBasedTagger, ServiceAreaLookup, ServiceAreaPolicy,
    ServiceAreaResolver, ValidationStatus, ValidatorError,
};
use iq_programs::workflows::catalog::{
    AssistanceProgram, CatalogImporter, CatalogService, EligibilityProgram, EligibilityProgramId,
    ProgramCatalog,
};
use iq_programs::workflows::enrollment::{
    DocumentError, DocumentRef, DocumentStore, Notifier, NotifierError, UploadedDocument, UserId,
};
use iq_programs::workflows::storage::InMemoryStore;
use iq_programs::workflows::{BenefitsService, Collaborators};

pub(crate) type AppService = BenefitsService<InMemoryStore, LoggingNotifier>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Assistance programs offered when no catalog CSV is configured.
pub(crate) const DEFAULT_CATALOG_CSV: &str = "\
id,program_name,friendly_name,ami_threshold,is_active,enable_autoapply,requires_is_in_service_area,requires_is_city_covered,requires_has_broadband,renewal_interval_years
1,grocery,Grocery Tax Rebate,0.6,true,true,true,false,false,1
2,recreation,Recreation Reduced Fee,0.3,true,true,false,true,false,1
3,connexion,Connexion Internet,0.6,true,false,false,false,true,
4,spin,SPIN Transit Pass,0.3,true,true,true,false,false,2
";

pub(crate) fn default_eligibility_programs() -> Vec<EligibilityProgram> {
    [
        (1, "snap", "SNAP", 3),
        (2, "medicaid", "Medicaid", 5),
        (3, "freereducedlunch", "Free and Reduced Lunch", 6),
        (4, "leap", "LEAP", 6),
        (5, "ami_verification", "Income Verification", 6),
    ]
    .into_iter()
    .map(|(id, name, friendly, tenths)| EligibilityProgram {
        id: EligibilityProgramId(id),
        program_name: name.to_string(),
        friendly_name: friendly.to_string(),
        ami_threshold: Decimal::new(tenths, 1),
        is_active: true,
    })
    .collect()
}

/// Assistance programs from `path`, or the built-in set.
pub(crate) fn load_assistance_programs(
    path: Option<&Path>,
) -> Result<Vec<AssistanceProgram>, AppError> {
    let programs = match path {
        Some(path) => CatalogImporter::from_path(path)?,
        None => CatalogImporter::from_reader(DEFAULT_CATALOG_CSV.as_bytes())?,
    };
    Ok(programs)
}

/// Configuration for offline commands that never bind a socket or read the
/// environment.
pub(crate) fn local_config() -> AppConfig {
    AppConfig {
        environment: AppEnvironment::Development,
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        telemetry: TelemetryConfig {
            log_level: "warn".to_string(),
            format: LogFormat::Compact,
        },
        service_area: ServiceAreaConfig::default(),
        catalog: CatalogConfig::default(),
    }
}

pub(crate) struct Wiring {
    pub(crate) service: Arc<AppService>,
    pub(crate) store: Arc<InMemoryStore>,
    pub(crate) notifier: Arc<LoggingNotifier>,
}

/// Build the service over an in-memory store seeded with the configured
/// catalog and the demo address directory.
pub(crate) fn build_service(config: &AppConfig) -> Result<Wiring, AppError> {
    let store = Arc::new(InMemoryStore::with_catalog(ProgramCatalog::new(
        default_eligibility_programs(),
        Vec::new(),
    )));
    let seeded = CatalogService::new(Arc::clone(&store))
        .seed(load_assistance_programs(config.catalog.path.as_deref())?)?;
    info!(programs = seeded, "assistance program catalog seeded");

    let directory = Arc::new(AddressDirectory::demo());
    let service_area = ServiceAreaResolver::new(
        directory.clone(),
        directory.clone(),
        directory.clone(),
        ServiceAreaPolicy::from(&config.service_area),
    );
    let notifier = Arc::new(LoggingNotifier::default());
    let service = BenefitsService::new(
        Arc::clone(&store),
        Collaborators {
            tagger: Arc::new(RuleBasedTagger),
            validator: directory,
            service_area,
            documents: Arc::new(InMemoryDocumentStore::default()),
            notifier: Arc::clone(&notifier),
        },
    );
    Ok(Wiring {
        service: Arc::new(service),
        store,
        notifier,
    })
}

struct DirectoryEntry {
    postal: PostalAddress,
    /// Units that exist at the building; empty for single-family addresses.
    units: Vec<String>,
    location: Coordinate,
    broadband: Option<String>,
    in_service_area: bool,
}

/// Local stand-in for the postal validator, geocoder and GIS layers, backed by
/// a fixed list of known addresses.
pub(crate) struct AddressDirectory {
    entries: Vec<DirectoryEntry>,
}

impl AddressDirectory {
    pub(crate) fn demo() -> Self {
        let entry = |street: &str, zip: &str, units: &[&str], x: f64, broadband: Option<&str>, served: bool| {
            DirectoryEntry {
                postal: PostalAddress {
                    address1: String::new(),
                    address2: street.to_string(),
                    city: "FORT COLLINS".to_string(),
                    state: "CO".to_string(),
                    zip5: zip.to_string(),
                },
                units: units.iter().map(|unit| unit.to_string()).collect(),
                location: Coordinate { x, y: 1_450_000.0 },
                broadband: broadband.map(str::to_string),
                in_service_area: served,
            }
        };

        Self {
            entries: vec![
                entry("300 LAPORTE AVE", "80521", &["1", "2", "3"], 3_120_001.0, Some("Released"), true),
                entry("281 N COLLEGE AVE", "80524", &[], 3_120_002.0, Some("Planned"), true),
                entry("4500 E COUNTY ROAD 38", "80525", &[], 3_120_003.0, None, false),
            ],
        }
    }

    fn by_street(&self, street: &str, zip: &str) -> Option<&DirectoryEntry> {
        let street = canonical_part(street);
        let zip = zip.trim();
        self.entries
            .iter()
            .find(|entry| entry.postal.address2 == street && (zip.is_empty() || entry.postal.zip5 == zip))
    }

    fn at(&self, location: Coordinate) -> Option<&DirectoryEntry> {
        self.entries.iter().find(|entry| entry.location == location)
    }
}

impl PostalValidator for AddressDirectory {
    fn validate(&self, components: &PostalAddress) -> Result<ValidationStatus, ValidatorError> {
        let Some(entry) = self.by_street(&components.address2, &components.zip5) else {
            return Ok(ValidationStatus::NotFound);
        };
        if entry.units.is_empty() {
            return Ok(ValidationStatus::Matched(entry.postal.clone()));
        }

        let secondary = canonical_part(&components.address1);
        match secondary
            .strip_prefix("UNIT ")
            .filter(|unit| entry.units.iter().any(|known| known == unit))
        {
            Some(unit) => Ok(ValidationStatus::Matched(PostalAddress {
                address1: format!("UNIT {unit}"),
                ..entry.postal.clone()
            })),
            None => Ok(ValidationStatus::NeedsMoreInformation {
                guidance: "Default address: The address you entered was found but more information is needed (such as an apartment, suite, or box number) to match to a specific address.".to_string(),
                best_guess: Some(entry.postal.clone()),
            }),
        }
    }
}

impl Geocoder for AddressDirectory {
    fn candidates(&self, street_and_zip: &str) -> Result<Vec<GeocodeCandidate>, LookupError> {
        let (street, zip) = street_and_zip
            .rsplit_once(',')
            .unwrap_or((street_and_zip, ""));
        Ok(self
            .by_street(street, zip)
            .map(|entry| GeocodeCandidate {
                location: entry.location,
                score: 100.0,
            })
            .into_iter()
            .collect())
    }
}

impl BroadbandLookup for AddressDirectory {
    fn inventory_status(&self, location: Coordinate) -> Result<Option<String>, LookupError> {
        Ok(self.at(location).and_then(|entry| entry.broadband.clone()))
    }
}

impl ServiceAreaLookup for AddressDirectory {
    fn intersecting_polygons(&self, location: Coordinate) -> Result<usize, LookupError> {
        Ok(self
            .at(location)
            .map(|entry| usize::from(entry.in_service_area))
            .unwrap_or(0))
    }
}

/// Writes welcome messages to the log instead of an e-mail/SMS gateway.
#[derive(Default)]
pub(crate) struct LoggingNotifier {
    sent: Mutex<Vec<String>>,
}

impl LoggingNotifier {
    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for LoggingNotifier {
    fn send_welcome_email(&self, email: &str) -> Result<(), NotifierError> {
        info!(recipient = %email, "welcome email queued");
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(format!("email:{email}"));
        Ok(())
    }

    fn send_welcome_sms(&self, phone: &str) -> Result<(), NotifierError> {
        info!(recipient = %phone, "welcome sms queued");
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(format!("sms:{phone}"));
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryDocumentStore {
    documents: Mutex<HashMap<String, UploadedDocument>>,
}

impl DocumentStore for InMemoryDocumentStore {
    fn store(&self, user_id: UserId, document: UploadedDocument) -> Result<DocumentRef, DocumentError> {
        if document.bytes.is_empty() {
            return Err(DocumentError::Rejected(document.file_name));
        }
        let mut guard = self.documents.lock().expect("document mutex poisoned");
        let key = format!("users/{}/{}-{}", user_id.0, guard.len() + 1, document.file_name);
        guard.insert(key.clone(), document);
        Ok(DocumentRef(key))
    }
}
