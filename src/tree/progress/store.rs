use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use log::{debug, warn};

use super::backend::{MemoryBackend, ProgressBackend, StorageError};
use super::entry::ProgressEntry;
use super::persisted;
use crate::config::ProgressConfig;
use crate::tree::item::ItemId;

/// Whether the store writes through to its backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PersistenceMode {
	/// Every mutation is written through to the backend.
	#[default]
	Durable,
	/// Mutations live in memory only.
	Ephemeral,
}

/// A per-user partition of progress. `Guest` is used when nobody is signed in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Namespace {
	/// Nobody signed in.
	#[default]
	Guest,
	/// A signed-in user's id.
	User(String),
}

impl Namespace {
	/// Blank or missing ids map to `Guest`.
	pub fn from_user(user: Option<&str>) -> Self {
		match user.map(str::trim) {
			Some(id) if !id.is_empty() => Self::User(id.to_string()),
			_ => Self::Guest,
		}
	}
}

impl fmt::Display for Namespace {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Guest => write!(f, "guest"),
			Self::User(id) => write!(f, "user:{id}"),
		}
	}
}

/// Handle returned by [`ProgressStore::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Partition = BTreeMap<ItemId, ProgressEntry>;

/// Process-wide research progress, partitioned by namespace.
///
/// Every mutating call bumps [`version`](Self::version) and then invokes all
/// subscribers synchronously with the new version. Durable write failures are
/// logged and otherwise ignored: memory stays authoritative for the session.
pub struct ProgressStore {
	config: ProgressConfig,
	backend: Box<dyn ProgressBackend>,
	active: Namespace,
	partitions: HashMap<Namespace, Partition>,
	/// Partitions already merged with what the backend held.
	hydrated: HashSet<Namespace>,
	version: u64,
	next_subscription: u64,
	subscribers: Vec<(SubscriptionId, Box<dyn FnMut(u64)>)>,
}

impl ProgressStore {
	/// Starts on the guest namespace, loading it when durable.
	pub fn new(config: ProgressConfig, backend: impl ProgressBackend + 'static) -> Self {
		let mut store = Self {
			config,
			backend: Box::new(backend),
			active: Namespace::Guest,
			partitions: HashMap::new(),
			hydrated: HashSet::new(),
			version: 0,
			next_subscription: 0,
			subscribers: Vec::new(),
		};
		store.hydrate(&Namespace::Guest);
		store
	}

	/// Memory-only store, never touching a durable backend.
	pub fn ephemeral() -> Self {
		Self::new(
			ProgressConfig {
				mode: PersistenceMode::Ephemeral,
				..ProgressConfig::default()
			},
			MemoryBackend::new(),
		)
	}

	/// Bumped by every mutation, namespace switch and mode change.
	pub fn version(&self) -> u64 {
		self.version
	}

	/// The active namespace.
	pub fn namespace(&self) -> &Namespace {
		&self.active
	}

	/// Current persistence mode.
	pub fn mode(&self) -> PersistenceMode {
		self.config.mode
	}

	/// The item's entry, or the default when nothing is recorded.
	pub fn get(&self, id: ItemId) -> ProgressEntry {
		self.partition().get(&id).copied().unwrap_or_default()
	}

	/// See [`ProgressEntry::is_done`].
	pub fn is_done(&self, id: ItemId, cap: Option<f64>) -> bool {
		self.get(id).is_done(cap)
	}

	/// Returns `false` without touching anything when `value` is not finite.
	pub fn set_accumulated(&mut self, id: ItemId, value: f64, cap: Option<f64>) -> bool {
		let mut entry = self.get(id);
		if !entry.set_accumulated(value, cap) {
			debug!("ignoring non-finite progress {value} for item {id}");
			return false;
		}
		self.partition_mut().insert(id, entry);
		self.commit();
		true
	}

	/// Ticking fills the item to its cap; unticking a full item empties it.
	pub fn set_completed(&mut self, id: ItemId, completed: bool, cap: Option<f64>) {
		let mut entry = self.get(id);
		entry.set_completed(completed, cap);
		self.partition_mut().insert(id, entry);
		self.commit();
	}

	/// Removes one entry, or the whole active namespace when `id` is `None`.
	pub fn clear(&mut self, id: Option<ItemId>) {
		match id {
			Some(id) => {
				self.partition_mut().remove(&id);
			}
			None => self.partition_mut().clear(),
		}
		self.commit();
	}

	/// Copy of the active namespace.
	pub fn export_all(&self) -> BTreeMap<ItemId, ProgressEntry> {
		self.partition().clone()
	}

	/// With `merge`, imported entries overwrite matching ids and keep the rest;
	/// without it the active namespace is replaced.
	pub fn import_all(&mut self, entries: BTreeMap<ItemId, ProgressEntry>, merge: bool) {
		let sanitized = entries.into_iter().map(|(id, mut e)| {
			if !e.accumulated.is_finite() || e.accumulated < 0.0 {
				e.accumulated = 0.0;
			}
			(id, e)
		});
		let partition = self.partition_mut();
		if !merge {
			partition.clear();
		}
		partition.extend(sanitized);
		self.commit();
	}

	/// Makes `user`'s partition active (`None` selects the guest partition).
	pub fn switch_namespace(&mut self, user: Option<&str>) {
		let next = Namespace::from_user(user);
		debug!("switching progress namespace {} -> {}", self.active, next);
		self.hydrate(&next);
		self.active = next;
		self.bump();
	}

	/// Going durable reloads the active namespace and writes it back.
	pub fn set_persistence_mode(&mut self, mode: PersistenceMode) {
		if self.config.mode == mode {
			return;
		}
		self.config.mode = mode;
		if mode == PersistenceMode::Durable {
			// The backend may have moved on while we were memory-only.
			self.hydrated.clear();
			let active = self.active.clone();
			self.hydrate(&active);
			self.persist();
		}
		self.bump();
	}

	/// Registers a callback run with the new version after every change.
	pub fn subscribe(&mut self, callback: impl FnMut(u64) + 'static) -> SubscriptionId {
		let id = SubscriptionId(self.next_subscription);
		self.next_subscription += 1;
		self.subscribers.push((id, Box::new(callback)));
		id
	}

	/// Returns whether `id` was still registered.
	pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
		let before = self.subscribers.len();
		self.subscribers.retain(|(sid, _)| *sid != id);
		self.subscribers.len() != before
	}

	fn partition(&self) -> &Partition {
		static EMPTY: Partition = BTreeMap::new();
		self.partitions.get(&self.active).unwrap_or(&EMPTY)
	}

	/// Retries a failed load first, so a mutation never races stored data.
	fn partition_mut(&mut self) -> &mut Partition {
		let active = self.active.clone();
		self.hydrate(&active);
		self.partitions.entry(active).or_default()
	}

	fn storage_key(&self, ns: &Namespace) -> String {
		format!("{}:{}", self.config.key_prefix, ns)
	}

	/// Merges what the backend holds for `ns` under the in-memory entries.
	fn hydrate(&mut self, ns: &Namespace) {
		if self.config.mode != PersistenceMode::Durable || self.hydrated.contains(ns) {
			return;
		}
		match self.load(ns) {
			Ok(stored) => {
				let partition = self.partitions.entry(ns.clone()).or_default();
				for (id, entry) in stored {
					partition.entry(id).or_insert(entry);
				}
				self.hydrated.insert(ns.clone());
			}
			Err(e) => warn!("could not load progress for {ns}: {e}"),
		}
	}

	fn load(&self, ns: &Namespace) -> Result<Partition, StorageError> {
		match self.backend.load(&self.storage_key(ns))? {
			Some(raw) => Ok(persisted::decode(&raw)?),
			None => Ok(Partition::new()),
		}
	}

	fn persist(&self) {
		if self.config.mode != PersistenceMode::Durable {
			return;
		}
		// Writing a partition that was never loaded would replace what is stored.
		if !self.hydrated.contains(&self.active) {
			warn!("progress for {} not persisted: stored entries were never loaded", self.active);
			return;
		}
		let key = self.storage_key(&self.active);
		let result = if self.partition().is_empty() {
			self.backend.remove(&key)
		} else {
			persisted::encode(self.partition())
				.map_err(StorageError::from)
				.and_then(|raw| self.backend.save(&key, &raw))
		};
		if let Err(e) = result {
			warn!("progress for {} not persisted: {e}", self.active);
		}
	}

	fn commit(&mut self) {
		self.persist();
		self.bump();
	}

	fn bump(&mut self) {
		self.version += 1;
		let version = self.version;
		for (_, callback) in &mut self.subscribers {
			callback(version);
		}
	}
}

impl fmt::Debug for ProgressStore {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ProgressStore")
			.field("namespace", &self.active)
			.field("mode", &self.config.mode)
			.field("version", &self.version)
			.field("entries", &self.partition().len())
			.field("subscribers", &self.subscribers.len())
			.finish()
	}
}
