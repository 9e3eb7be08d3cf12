//! User-facing edits to progress. Each command checks that the item is
//! unlocked and that the input is usable before touching the store, and says
//! why when it refuses. Refusals never mutate anything.

use thiserror::Error;

use super::item::{Item, ItemId};
use super::progress::{ProgressEntry, ProgressStore};
use super::resolver::DependencyResolver;

/// Why a command was refused.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum CommandError {
	/// The id is not in the current tree.
	#[error("unknown item #{0}")]
	UnknownItem(ItemId),

	/// Predecessors are still outstanding.
	#[error("research first: {}", .missing.join(", "))]
	Locked {
		/// The refused item.
		id: ItemId,
		/// Names of the outstanding predecessors.
		missing: Vec<String>,
	},

	/// Input that does not parse to a finite number.
	#[error("{0:?} is not a valid research point value")]
	InvalidValue(String),
}

/// What an accepted command left behind, for the caller to display.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CommandOutcome {
	/// The edited item.
	pub id: ItemId,
	/// Its entry after the edit.
	pub entry: ProgressEntry,
	/// Whether it now counts as researched.
	pub done: bool,
}

fn unlocked<'r>(
	resolver: &'r DependencyResolver,
	store: &ProgressStore,
	id: ItemId,
) -> Result<&'r Item, CommandError> {
	let item = resolver.item(id).ok_or(CommandError::UnknownItem(id))?;
	let missing = resolver.missing_predecessors(id, store);
	if missing.is_empty() {
		Ok(item)
	} else {
		Err(CommandError::Locked {
			id,
			missing: missing.into_iter().map(|p| resolver.display_name(p)).collect(),
		})
	}
}

fn outcome(store: &ProgressStore, item: &Item) -> CommandOutcome {
	let entry = store.get(item.id);
	CommandOutcome {
		id: item.id,
		entry,
		done: entry.is_done(item.cap()),
	}
}

/// Parses a user-typed value (`"12 000"`, `"4,500"` and `" 800 "` are all
/// accepted) and stores it, clamped to the item's cost.
pub fn request_set_accumulated(
	store: &mut ProgressStore,
	resolver: &DependencyResolver,
	id: ItemId,
	raw: &str,
) -> Result<CommandOutcome, CommandError> {
	let item = unlocked(resolver, store, id)?;
	let cleaned: String = raw
		.chars()
		.filter(|c| !c.is_whitespace() && *c != ',' && *c != '_')
		.collect();
	let value = cleaned
		.parse::<f64>()
		.ok()
		.filter(|v| v.is_finite())
		.ok_or_else(|| CommandError::InvalidValue(raw.to_string()))?;

	store.set_accumulated(id, value, item.cap());
	Ok(outcome(store, item))
}

/// Flips the derived completion state of `id`.
pub fn request_toggle_completed(
	store: &mut ProgressStore,
	resolver: &DependencyResolver,
	id: ItemId,
) -> Result<CommandOutcome, CommandError> {
	let item = unlocked(resolver, store, id)?;
	let done = store.is_done(id, item.cap());
	store.set_completed(id, !done, item.cap());
	Ok(outcome(store, item))
}
