//! Items and prerequisite edges as they arrive from the tree catalog.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identity of an item in the progression graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// How an item is obtained.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
	/// Unlocked by spending research points in the tree.
	#[default]
	#[serde(rename = "tree", alias = "researchable")]
	Researchable,
	/// Bought outright.
	Premium,
	/// Limited release, bought outright.
	Collector,
}

impl ItemType {
	/// Case-insensitive; blank reads as researchable.
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"" | "tree" | "researchable" => Some(Self::Researchable),
			"premium" => Some(Self::Premium),
			"collector" => Some(Self::Collector),
			_ => None,
		}
	}
}

/// The three independent battle-rating scales. Any of them may be unknown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BattleRatings {
	/// Arcade battles.
	#[serde(default, rename = "br_ab")]
	pub arcade: Option<f64>,
	/// Realistic battles.
	#[serde(default, rename = "br_rb")]
	pub realistic: Option<f64>,
	/// Simulator battles.
	#[serde(default, rename = "br_sb")]
	pub simulator: Option<f64>,
}

/// Scale accessors in preference order. Both the sibling comparator and the
/// layout child-sort go through this list.
const RATING_PREFERENCE: [fn(&BattleRatings) -> Option<f64>; 3] = [
	|r| r.realistic,
	|r| r.arcade,
	|r| r.simulator,
];

impl BattleRatings {
	/// First known scale in preference order, or `0.0` when none is set.
	pub fn preferred(&self) -> f64 {
		RATING_PREFERENCE
			.iter()
			.find_map(|scale| scale(self))
			.unwrap_or(0.0)
	}
}

/// One node of the progression tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
	/// Unique within one tree.
	pub id: ItemId,
	/// Display name.
	pub name: String,
	/// Tier, starting at 1. Roots are ordered by it.
	pub rank: u32,
	/// Battle ratings, flattened into the item record.
	#[serde(flatten)]
	pub ratings: BattleRatings,
	/// Research points needed to unlock.
	#[serde(default)]
	pub rp_cost: Option<u32>,
	/// How the item is obtained.
	#[serde(default, rename = "type")]
	pub kind: ItemType,
	/// Anchor item this one is a variant of. Grouping only, never a graph edge.
	#[serde(default)]
	pub folder_of: Option<ItemId>,
}

impl Item {
	/// A researchable item with no cost or ratings.
	pub fn new(id: u32, name: impl Into<String>, rank: u32) -> Self {
		Self {
			id: ItemId(id),
			name: name.into(),
			rank,
			ratings: BattleRatings::default(),
			rp_cost: None,
			kind: ItemType::Researchable,
			folder_of: None,
		}
	}

	/// Sets the research cost.
	pub fn with_cost(mut self, rp_cost: u32) -> Self {
		self.rp_cost = Some(rp_cost);
		self
	}

	/// Sets the realistic battle rating.
	pub fn with_realistic_br(mut self, br: f64) -> Self {
		self.ratings.realistic = Some(br);
		self
	}

	/// Files this item as a variant of `anchor`.
	pub fn in_folder_of(mut self, anchor: u32) -> Self {
		self.folder_of = Some(ItemId(anchor));
		self
	}

	/// Progress cap, present only when the item has a positive cost.
	pub fn cap(&self) -> Option<f64> {
		self.rp_cost.filter(|&c| c > 0).map(f64::from)
	}

	/// Whether the item sits in another item's folder.
	pub fn is_variant(&self) -> bool {
		self.folder_of.is_some()
	}
}

/// `child` requires `parent` to be researched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
	/// The prerequisite.
	#[serde(rename = "parent_id")]
	pub parent: ItemId,
	/// The item it unlocks.
	#[serde(rename = "child_id")]
	pub child: ItemId,
}

impl Edge {
	/// Edge from `parent` to `child`.
	pub fn new(parent: u32, child: u32) -> Self {
		Self {
			parent: ItemId(parent),
			child: ItemId(child),
		}
	}
}

/// Shared ordering for siblings in a variant group and children of a layout
/// node: rank, then preferred battle rating, then name.
pub fn sibling_order(a: &Item, b: &Item) -> Ordering {
	a.rank
		.cmp(&b.rank)
		.then_with(|| a.ratings.preferred().total_cmp(&b.ratings.preferred()))
		.then_with(|| a.name.cmp(&b.name))
}

/// Ordering for layout roots: rank, then name.
pub fn root_order(a: &Item, b: &Item) -> Ordering {
	a.rank.cmp(&b.rank).then_with(|| a.name.cmp(&b.name))
}
