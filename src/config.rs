//! Tunables for the progress store and the tree canvas. Components take these
//! as props; `Default` gives the values the app ships with.

use crate::tree::progress::PersistenceMode;

/// How and where progress is stored.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressConfig {
	/// Prefix of every durable key; the namespace is appended after a `:`.
	pub key_prefix: String,
	/// Starting mode; the store can switch later.
	pub mode: PersistenceMode,
}

impl Default for ProgressConfig {
	fn default() -> Self {
		Self {
			key_prefix: "tech-tree-progress".into(),
			mode: PersistenceMode::Durable,
		}
	}
}

/// Grid-to-canvas geometry, in world units before zoom.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasConfig {
	/// Horizontal pitch of one grid column.
	pub cell_width: f64,
	/// Vertical pitch of one grid row.
	pub cell_height: f64,
	/// Card width, less than the column pitch.
	pub node_width: f64,
	/// Card height, less than the row pitch.
	pub node_height: f64,
	/// Blank border around the grid.
	pub margin: f64,
	/// Height of one row in an expanded variant panel.
	pub variant_row_height: f64,
}

impl Default for CanvasConfig {
	fn default() -> Self {
		Self {
			cell_width: 150.0,
			cell_height: 90.0,
			node_width: 130.0,
			node_height: 56.0,
			margin: 40.0,
			variant_row_height: 26.0,
		}
	}
}
