mod finalize;

use std::sync::Arc;

use crate::workflows::storage::InMemoryStore;
use crate::workflows::tests::common::standard_catalog;

pub(super) fn catalog_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::with_catalog(standard_catalog()))
}
