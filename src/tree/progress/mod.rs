//! Research progress per item, partitioned by signed-in user and optionally
//! written through to a durable backend.

mod backend;
mod entry;
mod persisted;
mod store;

pub use backend::{LocalStorageBackend, MemoryBackend, ProgressBackend, StorageError};
pub use entry::ProgressEntry;
pub use store::{Namespace, PersistenceMode, ProgressStore, SubscriptionId};
