//! Unlock rules over the prerequisite graph and variant folders.

use std::collections::{BTreeSet, HashMap};

use super::grouping::Grouping;
use super::item::{Edge, Item, ItemId};
use super::progress::ProgressStore;

/// Answers "what must be researched before this item" and "is it unlocked".
///
/// Every incoming edge counts here, not only the primary parent the layout
/// uses. Edges naming an unknown item are ignored.
#[derive(Clone, Debug, Default)]
pub struct DependencyResolver {
	items: HashMap<ItemId, Item>,
	parents: HashMap<ItemId, Vec<ItemId>>,
	grouping: Grouping,
}

impl DependencyResolver {
	/// Indexes `nodes` and every edge between known items.
	pub fn new(nodes: &[Item], edges: &[Edge]) -> Self {
		let items: HashMap<ItemId, Item> = nodes.iter().map(|n| (n.id, n.clone())).collect();
		let mut parents: HashMap<ItemId, Vec<ItemId>> = HashMap::new();
		for edge in edges {
			if items.contains_key(&edge.parent) && items.contains_key(&edge.child) {
				parents.entry(edge.child).or_default().push(edge.parent);
			}
		}

		Self {
			items,
			parents,
			grouping: Grouping::partition(nodes),
		}
	}

	/// Looks up an item by id.
	pub fn item(&self, id: ItemId) -> Option<&Item> {
		self.items.get(&id)
	}

	/// Variant folders of the indexed items.
	pub fn grouping(&self) -> &Grouping {
		&self.grouping
	}

	/// Graph parents, plus the folder anchor and the preceding variant for
	/// items inside a folder.
	pub fn required_predecessors(&self, id: ItemId) -> BTreeSet<ItemId> {
		let mut required: BTreeSet<ItemId> = self
			.parents
			.get(&id)
			.into_iter()
			.flatten()
			.copied()
			.collect();

		if let Some(item) = self.items.get(&id) {
			if let Some(anchor) = item.folder_of {
				required.insert(anchor);
			}
			if let Some(prev) = self.grouping.previous_sibling(item) {
				required.insert(prev);
			}
		}
		required.remove(&id);
		required
	}

	/// Done flag, or accumulated points at the item's cost.
	pub fn is_done(&self, id: ItemId, progress: &ProgressStore) -> bool {
		let cap = self.items.get(&id).and_then(Item::cap);
		progress.is_done(id, cap)
	}

	/// Predecessors that are not done yet, in id order.
	pub fn missing_predecessors(&self, id: ItemId, progress: &ProgressStore) -> Vec<ItemId> {
		self.required_predecessors(id)
			.into_iter()
			.filter(|p| !self.is_done(*p, progress))
			.collect()
	}

	/// True once every required predecessor is done. Roots always can.
	pub fn can_research(&self, id: ItemId, progress: &ProgressStore) -> bool {
		self.required_predecessors(id)
			.iter()
			.all(|p| self.is_done(*p, progress))
	}

	/// Display name for notices; falls back to the raw id.
	pub fn display_name(&self, id: ItemId) -> String {
		self.items
			.get(&id)
			.map(|i| i.name.clone())
			.unwrap_or_else(|| format!("#{id}"))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn tree() -> (Vec<Item>, Vec<Edge>) {
		let nodes = vec![
			Item::new(1, "A", 1).with_cost(100),
			Item::new(2, "B", 2).with_cost(200),
			Item::new(3, "C", 2).with_cost(200),
			Item::new(4, "D", 3).with_cost(300),
			Item::new(5, "P", 3).with_cost(500),
			Item::new(6, "V1", 3).with_cost(500).in_folder_of(5),
			Item::new(7, "V2", 3).with_cost(500).in_folder_of(5),
		];
		let edges = vec![
			Edge::new(1, 2),
			Edge::new(1, 3),
			Edge::new(2, 4),
			Edge::new(3, 4),
			Edge::new(4, 5),
			Edge::new(4, 7),
			Edge::new(99, 3),
		];
		(nodes, edges)
	}

	fn ids(raw: &[u32]) -> BTreeSet<ItemId> {
		raw.iter().copied().map(ItemId).collect()
	}

	#[test]
	fn all_parents_count_not_just_primary() {
		let (nodes, edges) = tree();
		let resolver = DependencyResolver::new(&nodes, &edges);
		assert_eq!(resolver.required_predecessors(ItemId(4)), ids(&[2, 3]));
		assert_eq!(resolver.required_predecessors(ItemId(3)), ids(&[1]));
	}

	#[test]
	fn variants_require_anchor_and_previous_sibling() {
		let (nodes, edges) = tree();
		let resolver = DependencyResolver::new(&nodes, &edges);
		assert_eq!(resolver.required_predecessors(ItemId(6)), ids(&[5]));
		assert_eq!(resolver.required_predecessors(ItemId(7)), ids(&[4, 5, 6]));
	}

	#[test]
	fn roots_are_always_researchable() {
		let (nodes, edges) = tree();
		let resolver = DependencyResolver::new(&nodes, &edges);
		let store = ProgressStore::ephemeral();
		assert!(resolver.required_predecessors(ItemId(1)).is_empty());
		assert!(resolver.can_research(ItemId(1), &store));
		assert!(resolver.can_research(ItemId(404), &store));
	}

	#[test]
	fn previous_variant_gates_the_next() {
		let (nodes, edges) = tree();
		let resolver = DependencyResolver::new(&nodes, &edges);
		let mut store = ProgressStore::ephemeral();
		for id in [4, 5] {
			store.set_completed(ItemId(id), true, resolver.item(ItemId(id)).and_then(Item::cap));
		}
		assert!(!resolver.can_research(ItemId(7), &store));
		assert_eq!(resolver.missing_predecessors(ItemId(7), &store), [ItemId(6)]);

		store.set_accumulated(ItemId(6), 500.0, Some(500.0));
		assert!(resolver.can_research(ItemId(7), &store));
	}

	#[test]
	fn threshold_counts_as_done_without_flag() {
		let (nodes, edges) = tree();
		let resolver = DependencyResolver::new(&nodes, &edges);
		let mut store = ProgressStore::ephemeral();
		store.set_accumulated(ItemId(1), 100.0, None);
		assert!(!store.get(ItemId(1)).completed);
		assert!(resolver.can_research(ItemId(2), &store));
		assert!(!resolver.can_research(ItemId(4), &store));
	}

	#[test]
	fn can_research_is_repeatable() {
		let (nodes, edges) = tree();
		let resolver = DependencyResolver::new(&nodes, &edges);
		let store = ProgressStore::ephemeral();
		let first = resolver.can_research(ItemId(2), &store);
		assert_eq!(first, resolver.can_research(ItemId(2), &store));
		assert_eq!(store.version(), 0);
	}
}
