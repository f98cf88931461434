use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::RepositoryError;
use crate::workflows::address::{
    AddressDraft, AddressHash, AddressId, AddressRecord, AddressRepository, UserAddressLink,
};
use crate::workflows::catalog::{
    AssistanceProgram, CatalogRepository, EligibilityProgram, ProgramCatalog, ProgramId,
};
use crate::workflows::enrollment::{
    ApplicantRepository, EligibilitySelection, EnrollmentHistoryEntry, EnrollmentRecord,
    EnrollmentRepository, Household, UserId, UserProfile,
};

#[derive(Default)]
struct State {
    catalog: ProgramCatalog,
    addresses: BTreeMap<AddressId, AddressRecord>,
    address_hashes: HashMap<AddressHash, AddressId>,
    next_address_id: u64,
    links: HashMap<UserId, UserAddressLink>,
    users: BTreeMap<UserId, UserProfile>,
    households: HashMap<UserId, Household>,
    selections: HashMap<UserId, Vec<EligibilitySelection>>,
    enrollments: HashMap<UserId, BTreeMap<ProgramId, EnrollmentRecord>>,
    history: Vec<EnrollmentHistoryEntry>,
}

/// Process-local store backing every repository trait. One lock guards all
/// tables, so each call is atomic.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: ProgramCatalog) -> Self {
        let store = Self::default();
        store.lock().catalog = catalog;
        store
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("store mutex poisoned")
    }

    pub fn address_count(&self) -> usize {
        self.lock().addresses.len()
    }

    pub fn addresses(&self) -> Vec<AddressRecord> {
        self.lock().addresses.values().cloned().collect()
    }
}

impl CatalogRepository for InMemoryStore {
    fn catalog(&self) -> Result<ProgramCatalog, RepositoryError> {
        Ok(self.lock().catalog.clone())
    }

    fn save_assistance_program(&self, program: AssistanceProgram) -> Result<(), RepositoryError> {
        self.lock().catalog.upsert_assistance(program);
        Ok(())
    }

    fn save_eligibility_program(&self, program: EligibilityProgram) -> Result<(), RepositoryError> {
        self.lock().catalog.upsert_eligibility(program);
        Ok(())
    }
}

impl AddressRepository for InMemoryStore {
    fn find_by_hash(&self, hash: &AddressHash) -> Result<Option<AddressRecord>, RepositoryError> {
        let guard = self.lock();
        Ok(guard
            .address_hashes
            .get(hash)
            .and_then(|id| guard.addresses.get(id))
            .cloned())
    }

    fn fetch_address(&self, id: AddressId) -> Result<AddressRecord, RepositoryError> {
        self.lock()
            .addresses
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    fn insert_address(&self, draft: AddressDraft) -> Result<AddressRecord, RepositoryError> {
        let mut guard = self.lock();
        if guard.address_hashes.contains_key(&draft.hash) {
            return Err(RepositoryError::Conflict);
        }
        guard.next_address_id += 1;
        let id = AddressId(guard.next_address_id);
        let record = draft.into_record(id);
        guard.address_hashes.insert(record.hash.clone(), id);
        guard.addresses.insert(id, record.clone());
        Ok(record)
    }

    fn update_address(&self, record: AddressRecord) -> Result<(), RepositoryError> {
        let mut guard = self.lock();
        match guard.addresses.get_mut(&record.id) {
            Some(existing) if existing.hash == record.hash => {
                *existing = record;
                Ok(())
            }
            Some(_) => Err(RepositoryError::Conflict),
            None => Err(RepositoryError::NotFound),
        }
    }

    fn link_user(&self, link: UserAddressLink) -> Result<(), RepositoryError> {
        self.lock().links.insert(link.user_id, link);
        Ok(())
    }

    fn user_link(&self, user_id: UserId) -> Result<Option<UserAddressLink>, RepositoryError> {
        Ok(self.lock().links.get(&user_id).copied())
    }
}

impl ApplicantRepository for InMemoryStore {
    fn user(&self, user_id: UserId) -> Result<UserProfile, RepositoryError> {
        self.lock()
            .users
            .get(&user_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    fn save_user(&self, profile: UserProfile) -> Result<(), RepositoryError> {
        self.lock().users.insert(profile.id, profile);
        Ok(())
    }

    fn user_ids(&self) -> Result<Vec<UserId>, RepositoryError> {
        Ok(self.lock().users.keys().copied().collect())
    }

    fn household(&self, user_id: UserId) -> Result<Option<Household>, RepositoryError> {
        Ok(self.lock().households.get(&user_id).cloned())
    }

    fn save_household(&self, household: Household) -> Result<(), RepositoryError> {
        self.lock().households.insert(household.user_id, household);
        Ok(())
    }

    fn eligibility_selections(
        &self,
        user_id: UserId,
    ) -> Result<Vec<EligibilitySelection>, RepositoryError> {
        Ok(self
            .lock()
            .selections
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    fn save_eligibility_selection(
        &self,
        selection: EligibilitySelection,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.lock();
        let selections = guard.selections.entry(selection.user_id).or_default();
        match selections
            .iter_mut()
            .find(|existing| existing.program_id == selection.program_id)
        {
            Some(existing) => *existing = selection,
            None => selections.push(selection),
        }
        Ok(())
    }
}

impl EnrollmentRepository for InMemoryStore {
    fn enrollments(&self, user_id: UserId) -> Result<Vec<EnrollmentRecord>, RepositoryError> {
        Ok(self
            .lock()
            .enrollments
            .get(&user_id)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }

    fn create_enrollment(&self, record: EnrollmentRecord) -> Result<(), RepositoryError> {
        let mut guard = self.lock();
        let records = guard.enrollments.entry(record.user_id).or_default();
        if records.contains_key(&record.program_id) {
            return Err(RepositoryError::Conflict);
        }
        records.insert(record.program_id, record);
        Ok(())
    }

    fn update_enrollment(&self, record: EnrollmentRecord) -> Result<(), RepositoryError> {
        let mut guard = self.lock();
        let existing = guard
            .enrollments
            .get_mut(&record.user_id)
            .and_then(|records| records.get_mut(&record.program_id))
            .ok_or(RepositoryError::NotFound)?;
        *existing = record;
        Ok(())
    }

    fn delete_enrollment(
        &self,
        user_id: UserId,
        program_id: ProgramId,
    ) -> Result<EnrollmentRecord, RepositoryError> {
        let mut guard = self.lock();
        let records = guard
            .enrollments
            .get_mut(&user_id)
            .ok_or(RepositoryError::NotFound)?;
        match records.get(&program_id) {
            Some(record) if record.is_enrolled => Err(RepositoryError::Protected),
            Some(_) => records.remove(&program_id).ok_or(RepositoryError::NotFound),
            None => Err(RepositoryError::NotFound),
        }
    }

    fn lapse_enrollments(
        &self,
        user_id: UserId,
        programs: &[ProgramId],
    ) -> Result<Vec<EnrollmentRecord>, RepositoryError> {
        let mut guard = self.lock();
        let Some(records) = guard.enrollments.get_mut(&user_id) else {
            return Ok(Vec::new());
        };
        Ok(programs
            .iter()
            .filter_map(|program_id| records.remove(program_id))
            .collect())
    }

    fn append_history(&self, entry: EnrollmentHistoryEntry) -> Result<(), RepositoryError> {
        self.lock().history.push(entry);
        Ok(())
    }

    fn history(&self, user_id: UserId) -> Result<Vec<EnrollmentHistoryEntry>, RepositoryError> {
        Ok(self
            .lock()
            .history
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .cloned()
            .collect())
    }
}
