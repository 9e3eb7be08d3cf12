use std::collections::{HashMap, HashSet};

use crate::config::CanvasConfig;
use crate::tree::{
	DependencyResolver, ExpansionState, GridPos, Item, ItemId, ProgressStore, TreeData, TreeLayout,
	compute_layout,
};

pub const BADGE_SIZE: f64 = 18.0;

/// What the render surface needs per item: lock icon and progress bar.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NodeStatus {
	pub locked: bool,
	pub done: bool,
	pub accumulated: f64,
	pub cap: Option<f64>,
}

impl NodeStatus {
	pub fn fraction(&self) -> f64 {
		match self.cap {
			_ if self.done => 1.0,
			Some(cap) => (self.accumulated / cap).clamp(0.0, 1.0),
			None => 0.0,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
	pub x: f64,
	pub y: f64,
	pub w: f64,
	pub h: f64,
}

impl Rect {
	pub fn contains(&self, px: f64, py: f64) -> bool {
		px >= self.x && px <= self.x + self.w && py >= self.y && py <= self.y + self.h
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hit {
	Node(ItemId),
	Variant(ItemId),
	FolderBadge(ItemId),
}

#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub moved: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<ItemId>,
	/// Predecessors and dependents of the hovered item.
	pub related: HashSet<ItemId>,
	pub highlight_t: f64,
	pub prev_node: Option<ItemId>,
	pub prev_related: HashSet<ItemId>,
	delay_t: f64,
}

pub struct TechTreeState {
	pub tree: TreeData,
	pub resolver: DependencyResolver,
	pub layout: TreeLayout,
	pub expansion: ExpansionState,
	pub highlighted: HashSet<ItemId>,
	pub config: CanvasConfig,
	pub transform: ViewTransform,
	pub pan: PanState,
	pub hover: HoverState,
	pub width: f64,
	pub height: f64,
	status: HashMap<ItemId, NodeStatus>,
	status_version: Option<u64>,
}

impl TechTreeState {
	pub fn new(tree: &TreeData, config: CanvasConfig, width: f64, height: f64) -> Self {
		let mut state = Self {
			tree: TreeData::default(),
			resolver: DependencyResolver::default(),
			layout: TreeLayout::default(),
			expansion: ExpansionState::new(),
			highlighted: HashSet::new(),
			config,
			transform: ViewTransform {
				x: config.margin,
				y: config.margin,
				k: 1.0,
			},
			pan: PanState::default(),
			hover: HoverState::default(),
			width,
			height,
			status: HashMap::new(),
			status_version: None,
		};
		state.load(tree);
		state
	}

	/// Replaces the tree and recomputes the layout. Expansion survives for
	/// anchors that still exist.
	pub fn load(&mut self, tree: &TreeData) {
		self.tree = tree.clone();
		self.resolver = DependencyResolver::new(&tree.nodes, &tree.edges);
		self.layout = compute_layout(&self.resolver.grouping().primary, &tree.edges);

		let mut expansion = ExpansionState::new();
		for anchor in self.expansion.expanded() {
			if !self.resolver.grouping().variants(anchor).is_empty() {
				expansion.toggle(anchor);
			}
		}
		self.expansion = expansion;
		self.hover = HoverState::default();
		self.status.clear();
		self.status_version = None;
		let highlighted = std::mem::take(&mut self.highlighted);
		self.set_highlight(highlighted);
	}

	/// Recomputes lock and progress state when the store moved on.
	pub fn refresh_status(&mut self, progress: &ProgressStore) {
		if self.status_version == Some(progress.version()) {
			return;
		}
		self.status = self
			.tree
			.nodes
			.iter()
			.map(|item| (item.id, self.compute_status(item, progress)))
			.collect();
		self.status_version = Some(progress.version());
	}

	fn compute_status(&self, item: &Item, progress: &ProgressStore) -> NodeStatus {
		let entry = progress.get(item.id);
		NodeStatus {
			locked: !self.resolver.can_research(item.id, progress),
			done: entry.is_done(item.cap()),
			accumulated: entry.accumulated_within(item.cap()),
			cap: item.cap(),
		}
	}

	pub fn status(&self, id: ItemId) -> NodeStatus {
		self.status.get(&id).copied().unwrap_or_default()
	}

	pub fn set_highlight(&mut self, ids: HashSet<ItemId>) {
		self.expansion
			.expand_for_highlight(self.resolver.grouping(), &ids);
		self.highlighted = ids;
	}

	pub fn toggle_expanded(&mut self, anchor: ItemId) -> bool {
		self.expansion.toggle(anchor)
	}

	pub fn cell_rect(&self, pos: GridPos) -> Rect {
		let c = &self.config;
		Rect {
			x: f64::from(pos.col) * c.cell_width,
			y: f64::from(pos.row) * c.cell_height,
			w: c.node_width,
			h: c.node_height,
		}
	}

	pub fn node_rect(&self, id: ItemId) -> Option<Rect> {
		self.layout.position(id).map(|pos| self.cell_rect(pos))
	}

	pub fn badge_rect(&self, anchor: ItemId) -> Option<Rect> {
		if self.resolver.grouping().variants(anchor).is_empty() {
			return None;
		}
		let node = self.node_rect(anchor)?;
		Some(Rect {
			x: node.x + node.w - BADGE_SIZE / 2.0,
			y: node.y - BADGE_SIZE / 2.0,
			w: BADGE_SIZE,
			h: BADGE_SIZE,
		})
	}

	/// Rows of the variant panel hanging below an expanded anchor.
	pub fn variant_rects(&self, anchor: ItemId) -> Vec<(ItemId, Rect)> {
		if !self.expansion.is_expanded(anchor) {
			return Vec::new();
		}
		let Some(node) = self.node_rect(anchor) else {
			return Vec::new();
		};
		let row_h = self.config.variant_row_height;
		self.resolver
			.grouping()
			.variants(anchor)
			.iter()
			.enumerate()
			.map(|(i, v)| {
				let rect = Rect {
					x: node.x + 8.0,
					y: node.y + node.h + 4.0 + i as f64 * row_h,
					w: node.w,
					h: row_h - 2.0,
				};
				(v.id, rect)
			})
			.collect()
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// Topmost thing under a screen point: open panels, then badges, then
	/// grid nodes.
	pub fn hit_test(&self, sx: f64, sy: f64) -> Option<Hit> {
		let (gx, gy) = self.screen_to_graph(sx, sy);

		for anchor in self.expansion.expanded() {
			if let Some((id, _)) = self
				.variant_rects(anchor)
				.into_iter()
				.find(|(_, r)| r.contains(gx, gy))
			{
				return Some(Hit::Variant(id));
			}
		}
		for anchor in self.resolver.grouping().variants_by_anchor.keys() {
			if self.badge_rect(*anchor).is_some_and(|r| r.contains(gx, gy)) {
				return Some(Hit::FolderBadge(*anchor));
			}
		}
		let col = (gx / self.config.cell_width).floor();
		let row = (gy / self.config.cell_height).floor();
		if col < 0.0 || row < 0.0 {
			return None;
		}
		let pos = GridPos::new(row as u32, col as u32);
		let id = self.layout.item_at(pos)?;
		self.cell_rect(pos).contains(gx, gy).then_some(Hit::Node(id))
	}

	pub fn set_hover(&mut self, node: Option<ItemId>) {
		if self.hover.node == node {
			return;
		}
		let was_hovering = self.hover.node.is_some();

		// Keep the previous set around so it can fade out.
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_related = std::mem::take(&mut self.hover.related);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_related.clear();
		}

		self.hover.node = node;
		self.hover.related.clear();

		if let Some(id) = node {
			if !was_hovering {
				self.hover.delay_t = 0.0;
			}
			self.hover.related = self.resolver.required_predecessors(id).into_iter().collect();
			self.hover.related.extend(
				self.tree
					.edges
					.iter()
					.filter(|e| e.parent == id)
					.map(|e| e.child),
			);
		}
	}

	pub fn is_highlighted(&self, id: ItemId) -> bool {
		self.hover.node == Some(id)
			|| self.hover.related.contains(&id)
			|| self.hover.prev_node == Some(id)
			|| self.hover.prev_related.contains(&id)
	}

	pub fn is_hovered(&self, id: ItemId) -> bool {
		self.hover.node == Some(id) || self.hover.prev_node == Some(id)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	pub fn tick(&mut self, dt: f64) {
		let (target, delay, speed) = if self.hover.node.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if self.hover.node.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_related.clear();
			}
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tree::Edge;

	fn tree() -> TreeData {
		TreeData {
			nodes: vec![
				Item::new(1, "A", 1).with_cost(100),
				Item::new(2, "B", 2).with_cost(100),
				Item::new(3, "C", 2).with_cost(100),
				Item::new(4, "B2", 2).with_cost(100).in_folder_of(2),
			],
			edges: vec![Edge::new(1, 2), Edge::new(1, 3)],
		}
	}

	fn state() -> TechTreeState {
		let mut s = TechTreeState::new(&tree(), CanvasConfig::default(), 800.0, 600.0);
		s.transform = ViewTransform { x: 0.0, y: 0.0, k: 1.0 };
		s
	}

	#[test]
	fn variants_stay_out_of_the_grid() {
		let s = state();
		assert_eq!(s.layout.len(), 3);
		assert_eq!(s.layout.position(ItemId(4)), None);
	}

	#[test]
	fn hit_test_resolves_nodes_badges_and_panels() {
		let mut s = state();
		let c = s.config;
		assert_eq!(s.hit_test(10.0, 10.0), Some(Hit::Node(ItemId(1))));
		assert_eq!(s.hit_test(c.node_width + 5.0, 10.0), None);
		assert_eq!(s.hit_test(-5.0, 10.0), None);

		let badge = s.badge_rect(ItemId(2)).unwrap();
		assert_eq!(
			s.hit_test(badge.x + 1.0, badge.y + 1.0),
			Some(Hit::FolderBadge(ItemId(2)))
		);
		assert!(s.badge_rect(ItemId(3)).is_none());

		assert!(s.toggle_expanded(ItemId(2)));
		let (id, row) = s.variant_rects(ItemId(2))[0];
		assert_eq!(id, ItemId(4));
		assert_eq!(s.hit_test(row.x + 2.0, row.y + 2.0), Some(Hit::Variant(ItemId(4))));
	}

	#[test]
	fn status_tracks_store_version() {
		let mut s = state();
		let mut store = ProgressStore::ephemeral();
		s.refresh_status(&store);
		assert!(s.status(ItemId(2)).locked);
		assert!(!s.status(ItemId(1)).locked);

		store.set_accumulated(ItemId(1), 50.0, Some(100.0));
		s.refresh_status(&store);
		assert_eq!(s.status(ItemId(1)).fraction(), 0.5);

		store.set_completed(ItemId(1), true, Some(100.0));
		s.refresh_status(&store);
		assert!(!s.status(ItemId(2)).locked);
		assert!(s.status(ItemId(4)).locked);
	}

	#[test]
	fn status_never_shows_points_above_cost() {
		let mut s = state();
		let mut store = ProgressStore::ephemeral();
		let mut imported = std::collections::BTreeMap::new();
		imported.insert(
			ItemId(1),
			crate::tree::ProgressEntry {
				accumulated: 1500.0,
				completed: false,
			},
		);
		store.import_all(imported, true);
		s.refresh_status(&store);

		let status = s.status(ItemId(1));
		assert_eq!(status.accumulated, 100.0);
		assert_eq!(status.cap, Some(100.0));
		assert!(status.done);
		assert_eq!(status.fraction(), 1.0);
	}

	#[test]
	fn hover_collects_predecessors_and_dependents() {
		let mut s = state();
		s.set_hover(Some(ItemId(1)));
		assert!(s.is_highlighted(ItemId(2)));
		assert!(s.is_highlighted(ItemId(3)));
		s.set_hover(Some(ItemId(4)));
		assert!(s.is_highlighted(ItemId(2)));
		assert!(!s.is_highlighted(ItemId(3)));
		s.set_hover(None);
		assert!(s.is_hovered(ItemId(4)));
	}

	#[test]
	fn highlight_expands_and_reload_keeps_expansion() {
		let mut s = state();
		s.set_highlight([ItemId(4)].into_iter().collect());
		assert!(s.expansion.is_expanded(ItemId(2)));

		s.load(&tree());
		assert!(s.expansion.is_expanded(ItemId(2)));
		assert!(s.highlighted.contains(&ItemId(4)));
	}
}
