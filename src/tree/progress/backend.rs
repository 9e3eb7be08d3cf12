use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;

/// Backend failures. Never fatal to the store.
#[derive(Debug, Error)]
pub enum StorageError {
	/// The backend could not be reached.
	#[error("storage is unavailable: {0}")]
	Unavailable(String),

	/// A partition could not be encoded or was not a JSON object.
	#[error("stored progress is malformed: {0}")]
	Malformed(#[from] serde_json::Error),
}

/// Durable key/value store the progress partitions are written to.
pub trait ProgressBackend {
	/// `None` when nothing is stored under `key`.
	fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
	/// Replaces whatever is stored under `key`.
	fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;
	/// Deleting a missing key succeeds.
	fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// The browser's `window.localStorage`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStorageBackend;

impl LocalStorageBackend {
	fn storage() -> Result<web_sys::Storage, StorageError> {
		let window =
			web_sys::window().ok_or_else(|| StorageError::Unavailable("no window".into()))?;
		window
			.local_storage()
			.map_err(|e| StorageError::Unavailable(format!("{e:?}")))?
			.ok_or_else(|| StorageError::Unavailable("localStorage disabled".into()))
	}
}

impl ProgressBackend for LocalStorageBackend {
	fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
		Self::storage()?
			.get_item(key)
			.map_err(|e| StorageError::Unavailable(format!("{e:?}")))
	}

	fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
		Self::storage()?
			.set_item(key, value)
			.map_err(|e| StorageError::Unavailable(format!("{e:?}")))
	}

	fn remove(&self, key: &str) -> Result<(), StorageError> {
		Self::storage()?
			.remove_item(key)
			.map_err(|e| StorageError::Unavailable(format!("{e:?}")))
	}
}

/// In-process backend. Clones share the same map, so a test can keep a
/// handle and inspect what the store wrote.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
	data: Rc<RefCell<HashMap<String, String>>>,
	offline: Rc<Cell<bool>>,
}

impl MemoryBackend {
	/// Empty and online.
	pub fn new() -> Self {
		Self::default()
	}

	/// Makes every call fail with `Unavailable` until switched back.
	pub fn set_offline(&self, offline: bool) {
		self.offline.set(offline);
	}

	/// Raw stored value, bypassing the offline switch.
	pub fn get(&self, key: &str) -> Option<String> {
		self.data.borrow().get(key).cloned()
	}

	/// Seeds a raw value, bypassing the offline switch.
	pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
		self.data.borrow_mut().insert(key.into(), value.into());
	}

	fn check(&self) -> Result<(), StorageError> {
		if self.offline.get() {
			return Err(StorageError::Unavailable("backend offline".into()));
		}
		Ok(())
	}
}

impl ProgressBackend for MemoryBackend {
	fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
		self.check()?;
		Ok(self.get(key))
	}

	fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
		self.check()?;
		self.insert(key, value);
		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), StorageError> {
		self.check()?;
		self.data.borrow_mut().remove(key);
		Ok(())
	}
}
