//! Progression tree core: items and edges, variant folders, unlock rules,
//! grid layout and research progress. Nothing in here touches the DOM except
//! the `localStorage` progress backend.

pub mod catalog;
pub mod commands;
pub mod estimate;
pub mod grouping;
pub mod item;
pub mod layout;
pub mod progress;
pub mod resolver;

pub use catalog::{TreeData, import_tree};
pub use commands::{request_set_accumulated, request_toggle_completed};
pub use grouping::ExpansionState;
pub use item::{Edge, Item, ItemId, ItemType, sibling_order};
pub use layout::{GridPos, TreeLayout, compute_layout};
pub use progress::{PersistenceMode, ProgressEntry, ProgressStore};
pub use resolver::DependencyResolver;
