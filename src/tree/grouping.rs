//! Variant folders: splitting items into laid-out primaries and the variant
//! lists hanging off them, plus the set of currently expanded folders.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::item::{Item, ItemId, sibling_order};

/// Items split by `folder_of`.
#[derive(Clone, Debug, Default)]
pub struct Grouping {
	/// Items without `folder_of`; these are the ones the layout places.
	pub primary: Vec<Item>,
	/// Anchor id to its variants, each list in sibling order.
	pub variants_by_anchor: BTreeMap<ItemId, Vec<Item>>,
}

impl Grouping {
	/// Keeps primaries in input order.
	pub fn partition(nodes: &[Item]) -> Self {
		let mut primary = Vec::new();
		let mut variants_by_anchor: BTreeMap<ItemId, Vec<Item>> = BTreeMap::new();

		for node in nodes {
			match node.folder_of {
				Some(anchor) => variants_by_anchor.entry(anchor).or_default().push(node.clone()),
				None => primary.push(node.clone()),
			}
		}
		for variants in variants_by_anchor.values_mut() {
			variants.sort_by(sibling_order);
		}

		Self {
			primary,
			variants_by_anchor,
		}
	}

	/// Variants filed under `anchor`, empty when it has none.
	pub fn variants(&self, anchor: ItemId) -> &[Item] {
		self.variants_by_anchor
			.get(&anchor)
			.map(Vec::as_slice)
			.unwrap_or(&[])
	}

	/// The variant ordered immediately before `item` in its folder, if any.
	pub fn previous_sibling(&self, item: &Item) -> Option<ItemId> {
		let anchor = item.folder_of?;
		let siblings = self.variants(anchor);
		let pos = siblings.iter().position(|s| s.id == item.id)?;
		pos.checked_sub(1).map(|prev| siblings[prev].id)
	}
}

/// Which variant folders are open.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpansionState {
	expanded: BTreeSet<ItemId>,
}

impl ExpansionState {
	/// All folders closed.
	pub fn new() -> Self {
		Self::default()
	}

	/// Flips the anchor's membership; returns whether it is now expanded.
	pub fn toggle(&mut self, anchor: ItemId) -> bool {
		if self.expanded.remove(&anchor) {
			false
		} else {
			self.expanded.insert(anchor);
			true
		}
	}

	/// Whether the folder under `anchor` is open.
	pub fn is_expanded(&self, anchor: ItemId) -> bool {
		self.expanded.contains(&anchor)
	}

	/// Opens every folder containing a highlighted variant. Never closes any.
	pub fn expand_for_highlight(&mut self, grouping: &Grouping, highlighted: &HashSet<ItemId>) {
		if highlighted.is_empty() {
			return;
		}
		for (anchor, variants) in &grouping.variants_by_anchor {
			if variants.iter().any(|v| highlighted.contains(&v.id)) {
				self.expanded.insert(*anchor);
			}
		}
	}

	/// Open anchors in id order.
	pub fn expanded(&self) -> impl Iterator<Item = ItemId> + '_ {
		self.expanded.iter().copied()
	}
}
