use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::domain::{
    AddressDraft, AddressId, AddressInput, AddressRecord, CanonicalAddress, PostalAddress,
    UserAddressLink,
};
use super::normalizer::{compose_free_text, normalize_secondary_line};
use super::repository::AddressRepository;
use super::service_area::ServiceAreaResolver;
use super::tagger::AddressTagger;
use super::validator::{PostalValidator, ValidationStatus};
use crate::workflows::enrollment::UserId;
use crate::workflows::storage::RepositoryError;

const DEFAULT_ADDRESS_PREFIX: &str = "Default address: ";
const UNVERIFIED_GUIDANCE: &str =
    "We couldn't verify this address. Please go back and re-enter it.";

/// Resolution strategies, attempted in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPass {
    /// Tag the literal input and validate the tagged components.
    Literal,
    /// As `Literal`, with the secondary line rewritten to `Unit <id>`.
    NormalizedSecondary,
    /// Validate the structured fields as entered, without tagging.
    RawFields,
}

impl ResolutionPass {
    pub fn index(self) -> u8 {
        match self {
            ResolutionPass::Literal => 0,
            ResolutionPass::NormalizedSecondary => 1,
            ResolutionPass::RawFields => 2,
        }
    }

    fn next(self) -> Option<Self> {
        match self {
            ResolutionPass::Literal => Some(ResolutionPass::NormalizedSecondary),
            ResolutionPass::NormalizedSecondary => Some(ResolutionPass::RawFields),
            ResolutionPass::RawFields => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowId(pub u64);

/// Explicit state of one address-correction sequence. It can be persisted
/// between requests and handed back to [`AddressResolutionPipeline::resume`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressWorkflow {
    pub workflow_id: WorkflowId,
    pub pass: ResolutionPass,
    /// Fields exactly as entered.
    pub entered: AddressInput,
    /// Fields submitted on the current pass; secondary-line rewrites persist.
    pub partial_address: AddressInput,
    pub last_validator_message: Option<String>,
    pub best_guess: Option<PostalAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    Continue(AddressWorkflow),
    Matched {
        workflow: AddressWorkflow,
        validated: PostalAddress,
    },
    Exhausted(AddressWorkflow),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAddress {
    pub record: AddressRecord,
    /// Canonical fields equal the entered fields, ignoring case.
    pub matches_input: bool,
    pub resolved_on: ResolutionPass,
    pub reused_existing: bool,
}

/// Shown when every pass failed to produce a clean match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionPrompt {
    pub workflow_id: WorkflowId,
    pub entered: AddressInput,
    pub guidance: String,
    pub best_guess: Option<AddressInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    Resolved(ResolvedAddress),
    NeedsCorrection(CorrectionPrompt),
}

/// Drives the bounded three-pass resolution against the postal validator and
/// turns a clean match into a deduplicated [`AddressRecord`].
pub struct AddressResolutionPipeline<R> {
    repository: Arc<R>,
    tagger: Arc<dyn AddressTagger>,
    validator: Arc<dyn PostalValidator>,
    service_area: ServiceAreaResolver,
    next_workflow: AtomicU64,
}

impl<R> AddressResolutionPipeline<R>
where
    R: AddressRepository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        tagger: Arc<dyn AddressTagger>,
        validator: Arc<dyn PostalValidator>,
        service_area: ServiceAreaResolver,
    ) -> Self {
        Self {
            repository,
            tagger,
            validator,
            service_area,
            next_workflow: AtomicU64::new(1),
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    pub fn begin(&self, input: AddressInput) -> AddressWorkflow {
        let workflow_id = WorkflowId(self.next_workflow.fetch_add(1, Ordering::Relaxed));
        AddressWorkflow {
            workflow_id,
            pass: ResolutionPass::Literal,
            partial_address: input.clone(),
            entered: input,
            last_validator_message: None,
            best_guess: None,
        }
    }

    pub fn resolve(&self, input: AddressInput) -> Result<ResolutionOutcome, RepositoryError> {
        let workflow = self.begin(input);
        self.resume(workflow)
    }

    /// Run the remaining passes of `workflow` to completion.
    pub fn resume(&self, workflow: AddressWorkflow) -> Result<ResolutionOutcome, RepositoryError> {
        let mut workflow = workflow;
        loop {
            match self.step(workflow) {
                StepResult::Continue(next) => workflow = next,
                StepResult::Matched {
                    workflow,
                    validated,
                } => {
                    let resolved =
                        self.canonicalize(&workflow.entered, &validated, workflow.pass)?;
                    return Ok(ResolutionOutcome::Resolved(resolved));
                }
                StepResult::Exhausted(workflow) => {
                    return Ok(ResolutionOutcome::NeedsCorrection(correction_prompt(workflow)));
                }
            }
        }
    }

    /// Execute the current pass once and advance the state.
    pub fn step(&self, mut workflow: AddressWorkflow) -> StepResult {
        debug!(
            workflow = workflow.workflow_id.0,
            pass = workflow.pass.index(),
            "address resolution pass"
        );

        let components = match workflow.pass {
            ResolutionPass::Literal | ResolutionPass::NormalizedSecondary => {
                let text = compose_free_text(&workflow.partial_address);
                match self.tagger.tag(&text) {
                    Ok(tagged) => tagged.components(),
                    Err(err) => {
                        debug!(
                            workflow = workflow.workflow_id.0,
                            error = %err,
                            "ambiguous address parse; validating raw fields"
                        );
                        workflow.pass = ResolutionPass::RawFields;
                        return StepResult::Continue(workflow);
                    }
                }
            }
            ResolutionPass::RawFields => PostalAddress::from_input(&workflow.partial_address),
        };

        match self.validator.validate(&components) {
            Ok(ValidationStatus::Matched(validated)) => {
                return StepResult::Matched {
                    workflow,
                    validated,
                };
            }
            Ok(ValidationStatus::NeedsMoreInformation {
                guidance,
                best_guess,
            }) => {
                info!(
                    workflow = workflow.workflow_id.0,
                    pass = workflow.pass.index(),
                    guidance = %guidance,
                    "postal validator needs more information"
                );
                workflow.last_validator_message = Some(
                    guidance
                        .replace(DEFAULT_ADDRESS_PREFIX, "")
                        .trim()
                        .to_string(),
                );
                if best_guess.is_some() {
                    workflow.best_guess = best_guess;
                }
            }
            Ok(ValidationStatus::NotFound) => {
                debug!(
                    workflow = workflow.workflow_id.0,
                    pass = workflow.pass.index(),
                    "postal validator found no match"
                );
            }
            Err(err) => {
                warn!(
                    workflow = workflow.workflow_id.0,
                    pass = workflow.pass.index(),
                    error = %err,
                    "postal validator call failed"
                );
            }
        }

        advance(workflow)
    }

    /// Map validator output to an address record, reusing any record with the
    /// same content hash.
    pub fn canonicalize(
        &self,
        entered: &AddressInput,
        validated: &PostalAddress,
        resolved_on: ResolutionPass,
    ) -> Result<ResolvedAddress, RepositoryError> {
        let canonical = CanonicalAddress::from_postal(validated);
        let hash = canonical.hash();
        let matches_input = canonical.matches_input(entered);

        if let Some(record) = self.repository.find_by_hash(&hash)? {
            debug!(address_hash = %hash.0, "reusing existing address record");
            return Ok(ResolvedAddress {
                record,
                matches_input,
                resolved_on,
                reused_existing: true,
            });
        }

        let flags = self.service_area.determine(validated);
        let draft = AddressDraft {
            address: canonical,
            hash: hash.clone(),
            flags,
        };

        let (record, reused_existing) = match self.repository.insert_address(draft) {
            Ok(record) => {
                info!(
                    address_id = record.id.0,
                    address_hash = %hash.0,
                    is_in_service_area = record.is_in_service_area,
                    has_broadband_service = record.has_broadband_service,
                    "address record created"
                );
                (record, false)
            }
            // Another request stored the same address first.
            Err(RepositoryError::Conflict) => (
                self.repository
                    .find_by_hash(&hash)?
                    .ok_or(RepositoryError::NotFound)?,
                true,
            ),
            Err(err) => return Err(err),
        };

        Ok(ResolvedAddress {
            record,
            matches_input,
            resolved_on,
            reused_existing,
        })
    }

    /// Refresh the service-area flags of a stored record without revalidating
    /// its fields.
    pub fn recheck(&self, address_id: AddressId) -> Result<AddressRecord, RepositoryError> {
        let mut record = self.repository.fetch_address(address_id)?;
        let postal = PostalAddress::from_record(&record);
        let flags = self.service_area.determine(&postal);
        record.apply_service_area(flags);
        self.repository.update_address(record.clone())?;
        info!(
            address_id = record.id.0,
            is_in_service_area = record.is_in_service_area,
            has_broadband_service = record.has_broadband_service,
            "address service area rechecked"
        );
        Ok(record)
    }

    /// Point the user at an eligibility address and a mailing address, which
    /// defaults to the eligibility address.
    pub fn link_user_address(
        &self,
        user_id: UserId,
        eligibility: AddressId,
        mailing: Option<AddressId>,
    ) -> Result<UserAddressLink, RepositoryError> {
        let mailing = mailing.unwrap_or(eligibility);
        self.repository.fetch_address(eligibility)?;
        if mailing != eligibility {
            self.repository.fetch_address(mailing)?;
        }

        let link = UserAddressLink {
            user_id,
            eligibility_address_id: eligibility,
            mailing_address_id: mailing,
        };
        self.repository.link_user(link)?;
        Ok(link)
    }
}

fn advance(mut workflow: AddressWorkflow) -> StepResult {
    let Some(next) = workflow.pass.next() else {
        return StepResult::Exhausted(workflow);
    };

    if workflow.partial_address.address2.trim().is_empty() {
        // Nothing to rewrite on the normalization pass.
        workflow.pass = ResolutionPass::RawFields;
    } else {
        if next == ResolutionPass::NormalizedSecondary {
            workflow.partial_address.address2 =
                normalize_secondary_line(&workflow.partial_address.address2);
        }
        workflow.pass = next;
    }

    StepResult::Continue(workflow)
}

fn correction_prompt(workflow: AddressWorkflow) -> CorrectionPrompt {
    CorrectionPrompt {
        workflow_id: workflow.workflow_id,
        entered: workflow.entered,
        guidance: workflow
            .last_validator_message
            .unwrap_or_else(|| UNVERIFIED_GUIDANCE.to_string()),
        best_guess: workflow.best_guess.as_ref().map(PostalAddress::to_input),
    }
}
