use super::domain::{AddressDraft, AddressHash, AddressId, AddressRecord, UserAddressLink};
use crate::workflows::enrollment::UserId;
use crate::workflows::storage::RepositoryError;

/// Storage abstraction for canonical address records and user links.
pub trait AddressRepository: Send + Sync {
    fn find_by_hash(&self, hash: &AddressHash) -> Result<Option<AddressRecord>, RepositoryError>;
    fn fetch_address(&self, id: AddressId) -> Result<AddressRecord, RepositoryError>;
    /// Persist a new record. Fails with [`RepositoryError::Conflict`] when a
    /// record with the same hash already exists.
    fn insert_address(&self, draft: AddressDraft) -> Result<AddressRecord, RepositoryError>;
    fn update_address(&self, record: AddressRecord) -> Result<(), RepositoryError>;
    /// Replace the user's address link.
    fn link_user(&self, link: UserAddressLink) -> Result<(), RepositoryError>;
    fn user_link(&self, user_id: UserId) -> Result<Option<UserAddressLink>, RepositoryError>;
}
