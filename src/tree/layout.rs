//! Lane layout: assigns every item a `(row, col)` grid cell.
//!
//! Each child is positioned under its primary parent, the first parent seen
//! when scanning edges in input order. The first child (in sibling order)
//! drops straight below its parent. Every later sibling opens a fresh lane to
//! the right of everything placed so far. Roots sit on row 0, left to right
//! in rank/name order. A column is only ever taken at a row where it is still
//! free, scanning rightwards from the preferred column.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, warn};

use super::item::{Edge, Item, ItemId, root_order, sibling_order};

/// A grid cell. Rows grow downwards, columns rightwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPos {
	/// Depth below the root row.
	pub row: u32,
	/// Lane index.
	pub col: u32,
}

impl GridPos {
	/// Cell at `row`, `col`.
	pub fn new(row: u32, col: u32) -> Self {
		Self { row, col }
	}
}

/// Every laid-out item's cell, indexed both ways.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeLayout {
	/// Cell of each item.
	pub positions: BTreeMap<ItemId, GridPos>,
	cells: BTreeMap<GridPos, ItemId>,
	/// Deepest row in use, `0` when empty.
	pub max_row: u32,
	/// Rightmost column in use, `0` when empty.
	pub max_col: u32,
}

impl TreeLayout {
	/// Cell of `id`, if it was laid out.
	pub fn position(&self, id: ItemId) -> Option<GridPos> {
		self.positions.get(&id).copied()
	}

	/// Item occupying `pos`.
	pub fn item_at(&self, pos: GridPos) -> Option<ItemId> {
		self.cells.get(&pos).copied()
	}

	/// Number of laid-out items.
	pub fn len(&self) -> usize {
		self.positions.len()
	}

	/// No items were laid out.
	pub fn is_empty(&self) -> bool {
		self.positions.is_empty()
	}

	/// Grid size as `(columns, rows)`; `(0, 0)` for an empty layout.
	pub fn dimensions(&self) -> (u32, u32) {
		if self.is_empty() {
			(0, 0)
		} else {
			(self.max_col + 1, self.max_row + 1)
		}
	}
}

/// Items addressed by index, with primary-parent children lists.
struct Arena<'a> {
	items: Vec<&'a Item>,
	children: Vec<Vec<usize>>,
	has_parent: Vec<bool>,
}

impl<'a> Arena<'a> {
	fn build(nodes: &'a [Item], edges: &[Edge]) -> Self {
		let mut items = Vec::with_capacity(nodes.len());
		let mut index: HashMap<ItemId, usize> = HashMap::with_capacity(nodes.len());
		for node in nodes {
			if !index.contains_key(&node.id) {
				index.insert(node.id, items.len());
				items.push(node);
			}
		}

		let mut children = vec![Vec::new(); items.len()];
		let mut has_parent = vec![false; items.len()];
		for edge in edges {
			let (Some(&parent), Some(&child)) = (index.get(&edge.parent), index.get(&edge.child))
			else {
				continue;
			};
			if parent == child || has_parent[child] {
				continue;
			}
			has_parent[child] = true;
			children[parent].push(child);
		}
		for list in &mut children {
			list.sort_by(|&a, &b| sibling_order(items[a], items[b]));
		}

		Self {
			items,
			children,
			has_parent,
		}
	}

	fn sorted_by_root_order(&self, mut indices: Vec<usize>) -> Vec<usize> {
		indices.sort_by(|&a, &b| root_order(self.items[a], self.items[b]));
		indices
	}
}

struct Frame {
	node: usize,
	row: u32,
	col: u32,
	next_child: usize,
}

#[derive(Default)]
struct Placer {
	occupied: HashSet<(u32, u32)>,
	placed: Vec<Option<GridPos>>,
	max_row: u32,
	max_col: u32,
}

impl Placer {
	fn first_free_column(&self, row: u32, from: u32) -> u32 {
		let mut col = from;
		while self.occupied.contains(&(row, col)) {
			col += 1;
		}
		col
	}

	fn occupy(&mut self, node: usize, row: u32, preferred: u32) -> u32 {
		let col = self.first_free_column(row, preferred);
		self.occupied.insert((row, col));
		self.placed[node] = Some(GridPos::new(row, col));
		self.max_row = self.max_row.max(row);
		self.max_col = self.max_col.max(col);
		col
	}

	/// Depth-first placement of `root` and its unplaced descendants. Uses an
	/// explicit stack, and already placed nodes are skipped, so a cycle in
	/// the input cannot loop.
	fn place_tree(&mut self, arena: &Arena<'_>, root: usize, preferred: u32) -> u32 {
		let root_col = self.occupy(root, 0, preferred);
		let mut stack = vec![Frame {
			node: root,
			row: 0,
			col: root_col,
			next_child: 0,
		}];

		while let Some(frame) = stack.last_mut() {
			let children = &arena.children[frame.node];
			while frame.next_child < children.len() && self.placed[children[frame.next_child]].is_some()
			{
				frame.next_child += 1;
			}
			let Some(&child) = children.get(frame.next_child) else {
				stack.pop();
				continue;
			};

			let preferred = if frame.next_child == 0 {
				frame.col
			} else {
				self.max_col + 1
			};
			frame.next_child += 1;
			let row = frame.row + 1;
			let col = self.occupy(child, row, preferred);
			stack.push(Frame {
				node: child,
				row,
				col,
				next_child: 0,
			});
		}
		root_col
	}
}

/// Lays out `nodes`, ignoring edges whose endpoints are missing. Duplicate
/// ids keep their first occurrence. Items stranded on a cycle start their own
/// lane as extra roots.
pub fn compute_layout(nodes: &[Item], edges: &[Edge]) -> TreeLayout {
	let arena = Arena::build(nodes, edges);
	let mut placer = Placer {
		placed: vec![None; arena.items.len()],
		..Placer::default()
	};

	let roots = arena.sorted_by_root_order(
		(0..arena.items.len())
			.filter(|&i| !arena.has_parent[i])
			.collect(),
	);
	let mut next_root_col = 0;
	for root in roots {
		let col = placer.place_tree(&arena, root, next_root_col);
		next_root_col = col + 1;
	}

	// Anything still unplaced hangs off a primary-parent cycle.
	let stranded = arena.sorted_by_root_order(
		(0..arena.items.len())
			.filter(|&i| placer.placed[i].is_none())
			.collect(),
	);
	for node in stranded {
		if placer.placed[node].is_some() {
			continue;
		}
		warn!(
			"item {} is part of a parent cycle, placing it as a root",
			arena.items[node].id
		);
		let col = placer.place_tree(&arena, node, next_root_col);
		next_root_col = col + 1;
	}

	let mut layout = TreeLayout {
		max_row: placer.max_row,
		max_col: placer.max_col,
		..TreeLayout::default()
	};
	for (node, pos) in placer.placed.iter().enumerate() {
		if let Some(pos) = *pos {
			let id = arena.items[node].id;
			layout.positions.insert(id, pos);
			layout.cells.insert(pos, id);
		}
	}
	let (cols, rows) = layout.dimensions();
	debug!("laid out {} items on a {cols}x{rows} grid", layout.len());
	layout
}
