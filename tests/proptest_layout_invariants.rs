//! Property-based invariant tests for the lane layout.
//!
//! 1. The same input always produces the same layout.
//! 2. Every distinct item gets exactly one cell and no two items share one.
//! 3. A child sits one row below its primary parent; roots sit on row 0.
//! 4. Root columns strictly increase in rank/name order.
//! 5. A first child never sits left of its parent.
//! 6. A later sibling sits right of its parent and of every column used by
//!    the subtrees of the siblings before it.
//! 7. With a single root, every first child shares its parent's column.
//! 8. Cycles and edges naming unknown items never lose or duplicate items.
//! 9. Replaying placement order (roots in rank/name order, then depth-first
//!    in sibling order), every later sibling lands right of every item
//!    placed before it.

use std::collections::{BTreeMap, HashSet};

use proptest::prelude::*;
use tech_tree_canvas::tree::{Edge, Item, ItemId, TreeLayout, compute_layout, sibling_order};

// ── Helpers ─────────────────────────────────────────────────────────────

/// Items `1..=n` and edges that only ever point from a lower id to a higher
/// one, so the graph is acyclic. Extra cross edges come first so the primary
/// parent is not always the tree edge.
#[derive(Clone, Debug)]
struct Forest {
	nodes: Vec<Item>,
	edges: Vec<Edge>,
}

fn item_strategy(id: u32) -> impl Strategy<Value = Item> {
	(1u32..=4, prop::option::of(1u32..=12)).prop_map(move |(rank, br)| {
		let item = Item::new(id, format!("V{id:02}"), rank);
		match br {
			Some(br) => item.with_realistic_br(f64::from(br) / 2.0),
			None => item,
		}
	})
}

fn nodes_strategy(max: u32) -> impl Strategy<Value = Vec<Item>> {
	(1..=max).prop_flat_map(|n| (1..=n).map(item_strategy).collect::<Vec<_>>())
}

fn forest_strategy(single_root: bool) -> impl Strategy<Value = Forest> {
	nodes_strategy(24).prop_flat_map(move |nodes| {
		let n = nodes.len() as u32;
		let parents = prop::collection::vec((any::<bool>(), any::<u32>()), n as usize);
		let extras = prop::collection::vec((any::<u32>(), any::<u32>()), 0..8);
		(Just(nodes), parents, extras).prop_map(move |(nodes, parents, extras)| {
			let n = nodes.len() as u32;
			let mut edges = Vec::new();
			for (a, b) in extras {
				let (a, b) = (a % n + 1, b % n + 1);
				if a != b {
					edges.push(Edge::new(a.min(b), a.max(b)));
				}
			}
			for (child, (linked, raw)) in (2..=n).zip(parents.into_iter().skip(1)) {
				if single_root || linked {
					edges.push(Edge::new(raw % (child - 1) + 1, child));
				}
			}
			Forest { nodes, edges }
		})
	})
}

/// Arbitrary edges over `1..=n + 4`, cycles and unknown ids included.
fn tangled_strategy() -> impl Strategy<Value = (Vec<Item>, Vec<Edge>)> {
	nodes_strategy(16).prop_flat_map(|nodes| {
		let n = nodes.len() as u32;
		let edges = prop::collection::vec((1..=n + 4, 1..=n + 4), 0..40)
			.prop_map(|pairs| pairs.into_iter().map(|(p, c)| Edge::new(p, c)).collect());
		(Just(nodes), edges)
	})
}

/// First parent per child in edge order, and each parent's primary children
/// in sibling order.
fn primary_children(nodes: &[Item], edges: &[Edge]) -> BTreeMap<ItemId, Vec<ItemId>> {
	let by_id: BTreeMap<ItemId, &Item> = nodes.iter().map(|n| (n.id, n)).collect();
	let mut seen = HashSet::new();
	let mut children: BTreeMap<ItemId, Vec<ItemId>> = BTreeMap::new();
	for e in edges {
		if e.parent != e.child && seen.insert(e.child) {
			children.entry(e.parent).or_default().push(e.child);
		}
	}
	for list in children.values_mut() {
		list.sort_by(|a, b| sibling_order(by_id[a], by_id[b]));
	}
	children
}

fn subtree_columns(
	layout: &TreeLayout,
	children: &BTreeMap<ItemId, Vec<ItemId>>,
	root: ItemId,
) -> Vec<u32> {
	let mut cols = Vec::new();
	let mut stack = vec![root];
	while let Some(id) = stack.pop() {
		cols.push(layout.position(id).unwrap().col);
		if let Some(kids) = children.get(&id) {
			stack.extend(kids.iter().copied());
		}
	}
	cols
}

/// Ids in the order the layout places them, each flagged when it is a child
/// other than the first in its parent's list.
fn placement_order(nodes: &[Item], children: &BTreeMap<ItemId, Vec<ItemId>>) -> Vec<(ItemId, bool)> {
	let with_parent: HashSet<ItemId> = children.values().flatten().copied().collect();
	let mut roots: Vec<&Item> = nodes.iter().filter(|n| !with_parent.contains(&n.id)).collect();
	roots.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.name.cmp(&b.name)));

	let mut order = Vec::new();
	for root in roots {
		let mut stack = vec![(root.id, false)];
		while let Some((id, later_sibling)) = stack.pop() {
			order.push((id, later_sibling));
			if let Some(kids) = children.get(&id) {
				stack.extend(kids.iter().enumerate().rev().map(|(i, &kid)| (kid, i > 0)));
			}
		}
	}
	order
}

fn assert_one_cell_each(nodes: &[Item], layout: &TreeLayout) -> Result<(), TestCaseError> {
	let ids: HashSet<ItemId> = nodes.iter().map(|n| n.id).collect();
	prop_assert_eq!(layout.len(), ids.len());
	let mut cells = HashSet::new();
	for (&id, &pos) in &layout.positions {
		prop_assert!(ids.contains(&id), "unknown item {} was placed", id);
		prop_assert!(cells.insert(pos), "cell {:?} holds two items", pos);
		prop_assert_eq!(layout.item_at(pos), Some(id));
		prop_assert!(pos.row <= layout.max_row && pos.col <= layout.max_col);
	}
	Ok(())
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Determinism
// ═════════════════════════════════════════════════════════════════════════

proptest! {
	#[test]
	fn layout_is_deterministic(f in forest_strategy(false)) {
		prop_assert_eq!(compute_layout(&f.nodes, &f.edges), compute_layout(&f.nodes, &f.edges));
	}
}

// ═════════════════════════════════════════════════════════════════════════
// 2. One cell per item
// ═════════════════════════════════════════════════════════════════════════

proptest! {
	#[test]
	fn every_item_gets_its_own_cell(f in forest_strategy(false)) {
		let layout = compute_layout(&f.nodes, &f.edges);
		assert_one_cell_each(&f.nodes, &layout)?;
	}
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Rows follow primary parents
// ═════════════════════════════════════════════════════════════════════════

proptest! {
	#[test]
	fn child_sits_one_row_below_primary_parent(f in forest_strategy(false)) {
		let layout = compute_layout(&f.nodes, &f.edges);
		let children = primary_children(&f.nodes, &f.edges);
		let with_parent: HashSet<ItemId> = children.values().flatten().copied().collect();

		for node in &f.nodes {
			if !with_parent.contains(&node.id) {
				prop_assert_eq!(layout.position(node.id).unwrap().row, 0);
			}
		}
		for (parent, kids) in &children {
			let row = layout.position(*parent).unwrap().row;
			for kid in kids {
				prop_assert_eq!(layout.position(*kid).unwrap().row, row + 1);
			}
		}
	}
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Roots run left to right
// ═════════════════════════════════════════════════════════════════════════

proptest! {
	#[test]
	fn root_columns_strictly_increase(f in forest_strategy(false)) {
		let layout = compute_layout(&f.nodes, &f.edges);
		let with_parent: HashSet<ItemId> = f.edges.iter().map(|e| e.child).collect();
		let mut roots: Vec<&Item> = f.nodes.iter().filter(|n| !with_parent.contains(&n.id)).collect();
		roots.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.name.cmp(&b.name)));

		let cols: Vec<u32> = roots.iter().map(|r| layout.position(r.id).unwrap().col).collect();
		for pair in cols.windows(2) {
			prop_assert!(pair[0] < pair[1], "root columns {:?} not increasing", cols);
		}
	}
}

// ═════════════════════════════════════════════════════════════════════════
// 5 & 6. Sibling lanes
// ═════════════════════════════════════════════════════════════════════════

proptest! {
	#[test]
	fn siblings_open_lanes_to_the_right(f in forest_strategy(false)) {
		let layout = compute_layout(&f.nodes, &f.edges);
		let children = primary_children(&f.nodes, &f.edges);

		for (parent, kids) in &children {
			let parent_col = layout.position(*parent).unwrap().col;
			let first_col = layout.position(kids[0]).unwrap().col;
			prop_assert!(first_col >= parent_col);

			let mut used = subtree_columns(&layout, &children, kids[0]);
			for kid in &kids[1..] {
				let col = layout.position(*kid).unwrap().col;
				prop_assert!(col > parent_col);
				let widest = used.iter().copied().max().unwrap_or(0);
				prop_assert!(col > widest, "sibling {} at {} overlaps lanes up to {}", kid, col, widest);
				used.extend(subtree_columns(&layout, &children, *kid));
			}
		}
	}
}

// ═════════════════════════════════════════════════════════════════════════
// 7. Single tree keeps first children straight down
// ═════════════════════════════════════════════════════════════════════════

proptest! {
	#[test]
	fn single_root_first_child_shares_column(f in forest_strategy(true)) {
		let layout = compute_layout(&f.nodes, &f.edges);
		let children = primary_children(&f.nodes, &f.edges);
		prop_assert_eq!(layout.position(ItemId(1)).unwrap().row, 0);
		prop_assert!(layout.positions.values().filter(|p| p.row == 0).count() == 1);

		for (parent, kids) in &children {
			prop_assert_eq!(
				layout.position(kids[0]).unwrap().col,
				layout.position(*parent).unwrap().col,
				"first child {} of {} left its parent's column", kids[0], parent
			);
		}
	}
}

// ═════════════════════════════════════════════════════════════════════════
// 8. Cycles and dangling edges
// ═════════════════════════════════════════════════════════════════════════

proptest! {
	#[test]
	fn tangled_graphs_still_place_everything((nodes, edges) in tangled_strategy()) {
		let layout = compute_layout(&nodes, &edges);
		assert_one_cell_each(&nodes, &layout)?;
		prop_assert_eq!(layout, compute_layout(&nodes, &edges));
	}
}

// ═════════════════════════════════════════════════════════════════════════
// 9. Later siblings clear everything placed before them
// ═════════════════════════════════════════════════════════════════════════

proptest! {
	#[test]
	fn later_siblings_clear_every_earlier_lane(f in forest_strategy(false)) {
		let layout = compute_layout(&f.nodes, &f.edges);
		let children = primary_children(&f.nodes, &f.edges);
		let order = placement_order(&f.nodes, &children);
		prop_assert_eq!(order.len(), layout.len());

		let mut widest = 0;
		for (id, later_sibling) in order {
			let col = layout.position(id).unwrap().col;
			if later_sibling {
				prop_assert!(col > widest, "sibling {} at {} is not right of column {}", id, col, widest);
			}
			widest = widest.max(col);
		}
	}
}
