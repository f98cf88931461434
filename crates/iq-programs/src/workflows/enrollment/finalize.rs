use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::domain::UserId;
use super::lifecycle::{ApplyMode, EligibilityContext, EnrollmentError, EnrollmentLifecycle};
use super::repository::EnrollmentStore;
use crate::workflows::catalog::ProgramId;
use crate::workflows::eligibility::lowest_ami_threshold;
use crate::workflows::storage::RepositoryError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifierError {
    #[error("notification transport failed: {0}")]
    Transport(String),
}

/// Welcome messages sent once an application completes.
pub trait Notifier: Send + Sync {
    fn send_welcome_email(&self, email: &str) -> Result<(), NotifierError>;
    fn send_welcome_sms(&self, phone: &str) -> Result<(), NotifierError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationTarget {
    Broadcast,
    Dashboard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalSummary {
    pub app_renewed: bool,
    pub renewal_eligible: Vec<String>,
    pub renewal_ineligible: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeOutcome {
    pub target: NavigationTarget,
    pub income_as_fraction_of_ami: Decimal,
    pub applied: Vec<ProgramId>,
    pub renewal: Option<RenewalSummary>,
}

#[derive(Debug, thiserror::Error)]
pub enum FinalizeError {
    #[error("user {0} has no eligibility selections to finalize")]
    NoEligibilitySelections(UserId),
    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Completes an application: derives household AMI from the eligibility
/// selections, then enrolls or renews.
pub struct ApplicationFinalizer<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    lifecycle: EnrollmentLifecycle<S>,
}

impl<S, N> ApplicationFinalizer<S, N>
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>) -> Self {
        let lifecycle = EnrollmentLifecycle::new(Arc::clone(&store));
        Self {
            store,
            notifier,
            lifecycle,
        }
    }

    pub fn finalize_application(
        &self,
        user_id: UserId,
        renewal_mode: bool,
        update_user: bool,
    ) -> Result<FinalizeOutcome, FinalizeError> {
        self.finalize_application_at(user_id, renewal_mode, update_user, Utc::now())
    }

    pub fn finalize_application_at(
        &self,
        user_id: UserId,
        renewal_mode: bool,
        update_user: bool,
        now: DateTime<Utc>,
    ) -> Result<FinalizeOutcome, FinalizeError> {
        debug!(user_id = user_id.0, renewal_mode, update_user, "finalizing application");

        let catalog = self.store.catalog()?;
        let selections = self.store.eligibility_selections(user_id)?;
        let income = lowest_ami_threshold(&selections, &catalog)
            .ok_or(FinalizeError::NoEligibilitySelections(user_id))?;

        // Household, address link and profile must all exist before anything
        // is written.
        let EligibilityContext { mut household, .. } = self.lifecycle.eligibility_context(user_id)?;
        let mut profile = self.store.user(user_id)?;

        household.income_as_fraction_of_ami = Some(income);
        if renewal_mode {
            household.income_verified = false;
        }
        self.store.save_household(household)?;

        if renewal_mode {
            profile.renewal_mode = true;
            profile.last_completed_at = Some(now);
            profile.last_renewal_action.clear();
            self.store.save_user(profile)?;

            let renewal = self.lifecycle.renew(user_id, now)?;
            info!(user_id = user_id.0, income = %income, "renewal application finalized");
            return Ok(FinalizeOutcome {
                target: NavigationTarget::Dashboard,
                income_as_fraction_of_ami: income,
                applied: renewal.applied,
                renewal: Some(RenewalSummary {
                    app_renewed: true,
                    renewal_eligible: renewal.renewal_eligible,
                    renewal_ineligible: renewal.renewal_ineligible,
                }),
            });
        }

        if update_user {
            profile.last_completed_at = Some(now);
            self.store.save_user(profile.clone())?;
        }

        let applied = self
            .lifecycle
            .apply_eligible(user_id, &ApplyMode::AutoApply, now)?;

        if update_user {
            self.send_welcome(user_id, &profile.email, profile.phone.as_deref());
        }

        info!(
            user_id = user_id.0,
            income = %income,
            applied = applied.len(),
            "application finalized"
        );
        Ok(FinalizeOutcome {
            target: NavigationTarget::Broadcast,
            income_as_fraction_of_ami: income,
            applied,
            renewal: None,
        })
    }

    fn send_welcome(&self, user_id: UserId, email: &str, phone: Option<&str>) {
        if let Err(err) = self.notifier.send_welcome_email(email) {
            warn!(user_id = user_id.0, error = %err, "welcome email failed");
        }
        if let Some(phone) = phone.filter(|phone| !phone.trim().is_empty()) {
            if let Err(err) = self.notifier.send_welcome_sms(phone) {
                warn!(user_id = user_id.0, error = %err, "welcome sms failed");
            }
        }
    }
}
