//! Address resolution: free-text tagging, bounded validator retries,
//! canonical deduplicated records and service-area determination.

pub mod domain;
mod normalizer;
pub mod pipeline;
pub mod repository;
pub mod service_area;
pub mod tagger;
pub mod validator;


pub use domain::{
    canonical_part, AddressAttribute, AddressDraft, AddressHash, AddressId, AddressInput,
    AddressRecord, CanonicalAddress, PostalAddress, ServiceAreaFlags, UserAddressLink,
};
pub use normalizer::{compose_free_text, normalize_secondary_line};
pub use pipeline::{
    AddressResolutionPipeline, AddressWorkflow, CorrectionPrompt, ResolutionOutcome,
    ResolutionPass, ResolvedAddress, StepResult, WorkflowId,
};
pub use repository::AddressRepository;
pub use service_area::{
    BroadbandLookup, BroadbandStatus, Coordinate, GeocodeCandidate, Geocoder, LookupError,
    ServiceAreaLookup, ServiceAreaPolicy, ServiceAreaResolver,
};
pub use tagger::{
    AddressClassification, AddressLabel, AddressTagger, RuleBasedTagger, TagError, TaggedAddress,
};
pub use validator::{PostalValidator, ValidationStatus, ValidatorError};
