//! Tree data as delivered for one nation/class selection, plus the importer
//! for hand-maintained key-based tree files.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::item::{BattleRatings, Edge, Item, ItemId, ItemType};

/// Why tree data could not be read.
#[derive(Debug, Error)]
pub enum CatalogError {
	/// Malformed payload.
	#[error("tree data is not valid JSON: {0}")]
	Json(#[from] serde_json::Error),

	/// A vehicle's `type` is not one of the known kinds.
	#[error("vehicle {key:?} has unknown type {kind:?}")]
	UnknownType {
		/// Vehicle key.
		key: String,
		/// The unrecognised type.
		kind: String,
	},

	/// Keys must be unique within an import file.
	#[error("vehicle key {0:?} appears more than once")]
	DuplicateKey(String),
}

/// Items and edges of one tree, as served.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeData {
	/// Items in delivery order.
	pub nodes: Vec<Item>,
	/// Prerequisite edges, in the order primary parents are decided.
	#[serde(default)]
	pub edges: Vec<Edge>,
}

impl TreeData {
	/// Parses `{"nodes": [...], "edges": [...]}`.
	pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
		Ok(serde_json::from_str(raw)?)
	}

	/// Linear lookup by id.
	pub fn item(&self, id: ItemId) -> Option<&Item> {
		self.nodes.iter().find(|n| n.id == id)
	}

	/// Case-insensitive name search, for the highlight set.
	pub fn search(&self, query: &str) -> HashSet<ItemId> {
		let query = query.trim().to_lowercase();
		if query.is_empty() {
			return HashSet::new();
		}
		self.nodes
			.iter()
			.filter(|n| n.name.to_lowercase().contains(&query))
			.map(|n| n.id)
			.collect()
	}
}

#[derive(Debug, Deserialize)]
struct ImportFile {
	#[serde(default)]
	vehicles: Vec<ImportVehicle>,
}

#[derive(Debug, Deserialize)]
struct ImportVehicle {
	key: String,
	name: String,
	rank: u32,
	#[serde(default, rename = "type")]
	kind: Option<String>,
	#[serde(flatten)]
	ratings: BattleRatings,
	#[serde(default)]
	rp_cost: Option<u32>,
	#[serde(default)]
	folder_of: Option<String>,
	#[serde(default)]
	edges: ImportEdges,
}

#[derive(Debug, Default, Deserialize)]
struct ImportEdges {
	#[serde(default)]
	parents: Vec<String>,
	#[serde(default)]
	children: Vec<String>,
}

/// What an import produced and what it had to skip.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportReport {
	/// Items imported.
	pub items: usize,
	/// Edges imported, after deduplication.
	pub edges: usize,
	/// Skipped references, one line each.
	pub warnings: Vec<String>,
}

/// Builds tree data from `{"vehicles": [...]}` where items reference each
/// other by `key`. Ids are handed out from 1 in file order. References to
/// unknown keys are reported and skipped.
pub fn import_tree(raw: &str) -> Result<(TreeData, ImportReport), CatalogError> {
	let file: ImportFile = serde_json::from_str(raw)?;
	let mut report = ImportReport::default();

	let mut ids: HashMap<&str, ItemId> = HashMap::new();
	for (n, v) in file.vehicles.iter().enumerate() {
		if ids.insert(v.key.as_str(), ItemId(n as u32 + 1)).is_some() {
			return Err(CatalogError::DuplicateKey(v.key.clone()));
		}
	}

	let mut nodes = Vec::with_capacity(file.vehicles.len());
	for v in &file.vehicles {
		let kind = match &v.kind {
			None => ItemType::Researchable,
			Some(raw) => ItemType::parse(raw).ok_or_else(|| CatalogError::UnknownType {
				key: v.key.clone(),
				kind: raw.clone(),
			})?,
		};
		let folder_of = v.folder_of.as_deref().and_then(|anchor| {
			let id = ids.get(anchor).copied();
			if id.is_none() {
				report.warnings.push(format!("folder '{anchor}' not found for '{}'", v.key));
			}
			id
		});
		nodes.push(Item {
			id: ids[v.key.as_str()],
			name: v.name.clone(),
			rank: v.rank,
			ratings: v.ratings,
			rp_cost: v.rp_cost,
			kind,
			folder_of,
		});
	}
	report.items = nodes.len();

	let mut seen = HashSet::new();
	let mut edges = Vec::new();
	for v in &file.vehicles {
		let this = ids[v.key.as_str()];
		let links = v
			.edges
			.children
			.iter()
			.map(|k| (k, "child", true))
			.chain(v.edges.parents.iter().map(|k| (k, "parent", false)));
		for (other_key, role, is_child) in links {
			let Some(&other) = ids.get(other_key.as_str()) else {
				report
					.warnings
					.push(format!("{role} '{other_key}' not found for '{}'", v.key));
				continue;
			};
			let edge = if is_child {
				Edge {
					parent: this,
					child: other,
				}
			} else {
				Edge {
					parent: other,
					child: this,
				}
			};
			if seen.insert(edge) {
				edges.push(edge);
			}
		}
	}
	report.edges = edges.len();

	for w in &report.warnings {
		warn!("import: {w}");
	}
	debug!("imported {} items and {} edges", report.items, report.edges);
	Ok((TreeData { nodes, edges }, report))
}
