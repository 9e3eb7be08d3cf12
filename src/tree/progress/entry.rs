use serde::{Deserialize, Serialize};

/// Per-item research progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
	/// Research points earned so far.
	pub accumulated: f64,
	/// Explicitly marked researched.
	pub completed: bool,
}

impl ProgressEntry {
	/// Explicit flag OR accumulated reaching a positive cap.
	pub fn is_done(&self, cap: Option<f64>) -> bool {
		self.completed || matches!(positive(cap), Some(c) if self.accumulated >= c)
	}

	/// Accumulated points measured against `cap`, never above a positive cap.
	/// Imported and legacy entries are stored as given, so they can exceed it.
	pub fn accumulated_within(&self, cap: Option<f64>) -> f64 {
		match positive(cap) {
			Some(c) => self.accumulated.min(c),
			None => self.accumulated,
		}
	}

	/// Clamps to `[0, cap]` for a positive cap, `>= 0` otherwise, and
	/// recomputes the flag against the cap. Non-finite input is refused.
	pub(crate) fn set_accumulated(&mut self, value: f64, cap: Option<f64>) -> bool {
		if !value.is_finite() {
			return false;
		}
		match positive(cap) {
			Some(c) => {
				self.accumulated = value.clamp(0.0, c);
				self.completed = self.accumulated >= c;
			}
			None => self.accumulated = value.max(0.0),
		}
		true
	}

	pub(crate) fn set_completed(&mut self, completed: bool, cap: Option<f64>) {
		self.completed = completed;
		if let Some(c) = positive(cap) {
			if completed {
				self.accumulated = c;
			} else if self.accumulated >= c {
				self.accumulated = 0.0;
			}
		}
	}
}

pub(crate) fn positive(cap: Option<f64>) -> Option<f64> {
	cap.filter(|c| c.is_finite() && *c > 0.0)
}
