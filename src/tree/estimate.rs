//! Time-to-unlock estimates from a player profile or recent battle samples,
//! and the progress snapshot shipped to the remote estimate service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::item::{Item, ItemId};
use super::progress::ProgressStore;

/// Premium accounts earn double research points.
pub const PREMIUM_RP_MULTIPLIER: f64 = 2.0;

/// The player's typical session, before bonuses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileParams {
	/// Base research points per battle.
	#[serde(default)]
	pub avg_rp_per_battle: u32,
	/// Length of one battle.
	#[serde(default)]
	pub avg_battle_minutes: u32,
	/// Premium account.
	#[serde(default)]
	pub has_premium: bool,
	/// `50` means +50%.
	#[serde(default)]
	pub booster_percent: Option<u32>,
	/// Crew skill bonus, same scale as the booster.
	#[serde(default)]
	pub skill_bonus_percent: Option<u32>,
}

fn percent(p: Option<u32>) -> f64 {
	1.0 + f64::from(p.unwrap_or(0)) / 100.0
}

/// Base points with premium, booster and skill multiplied in. Never negative.
pub fn effective_rp_per_battle(profile: &ProfileParams) -> f64 {
	let mut mult = 1.0;
	if profile.has_premium {
		mult *= PREMIUM_RP_MULTIPLIER;
	}
	mult *= percent(profile.booster_percent) * percent(profile.skill_bonus_percent);
	(f64::from(profile.avg_rp_per_battle) * mult).max(0.0)
}

/// One battle as reported by the player, bonuses included.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BattleSample {
	/// Points earned.
	pub rp: f64,
	/// Battle length; `0` when unknown.
	#[serde(default)]
	pub minutes: f64,
	/// Premium was active.
	#[serde(default)]
	pub premium: bool,
	/// Booster that was active, in percent.
	#[serde(default)]
	pub booster_percent: Option<u32>,
}

impl BattleSample {
	/// RP with the premium and booster bonuses taken back out.
	fn base_rp(&self) -> f64 {
		let mut denom = 1.0;
		if self.premium {
			denom *= PREMIUM_RP_MULTIPLIER;
		}
		denom *= percent(self.booster_percent);
		self.rp / denom
	}
}

/// Averages over recent battles, in the same units as [`ProfileParams`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BattleSummary {
	/// Usable samples that went into the averages.
	pub samples: usize,
	/// Base points, bonuses removed.
	pub avg_rp_per_battle: u32,
	/// Over samples with a positive duration only.
	pub avg_battle_minutes: u32,
}

/// Averages base RP over all usable samples and minutes over the samples
/// that report a positive duration. Non-finite samples are skipped.
pub fn summarize_recent_battles(samples: &[BattleSample]) -> BattleSummary {
	let usable: Vec<_> = samples
		.iter()
		.filter(|s| s.rp.is_finite() && s.minutes.is_finite())
		.collect();
	if usable.is_empty() {
		return BattleSummary::default();
	}

	let base_sum: f64 = usable.iter().map(|s| s.base_rp()).sum();
	let minutes: Vec<f64> = usable
		.iter()
		.map(|s| s.minutes)
		.filter(|m| *m > 0.0)
		.collect();
	let avg_minutes = if minutes.is_empty() {
		0.0
	} else {
		minutes.iter().sum::<f64>() / minutes.len() as f64
	};

	BattleSummary {
		samples: usable.len(),
		avg_rp_per_battle: (base_sum / usable.len() as f64).round_ties_even().max(0.0) as u32,
		avg_battle_minutes: avg_minutes.round_ties_even() as u32,
	}
}

/// Why an estimate could not be made.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum EstimateError {
	/// The item is not bought with research points.
	#[error("{0} has no research cost")]
	NoCost(String),
}

/// Battles and time left until an item unlocks.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UnlockEstimate {
	/// The estimated item.
	pub item: ItemId,
	/// Its research cost.
	pub rp_cost: u32,
	/// Points already earned.
	pub rp_current: u32,
	/// Cost minus current, floored at zero.
	pub rp_remaining: u32,
	/// Points per battle after bonuses.
	pub effective_rp_per_battle: f64,
	/// `None` when the profile earns nothing per battle.
	pub battles_needed: Option<u64>,
	/// Battles times battle length.
	pub minutes_needed: Option<u64>,
	/// Minutes as hours, to two decimals.
	pub hours_needed: Option<f64>,
	/// Averages that replaced the profile's, when samples were given.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub base_from_recent: Option<BattleSummary>,
}

/// Estimate from the profile alone. Fails only for items without a cost.
pub fn estimate_to_unlock(
	item: &Item,
	current_rp: u32,
	profile: &ProfileParams,
) -> Result<UnlockEstimate, EstimateError> {
	let cost = item
		.rp_cost
		.filter(|&c| c > 0)
		.ok_or_else(|| EstimateError::NoCost(item.name.clone()))?;
	let effective = effective_rp_per_battle(profile);
	let remaining = cost.saturating_sub(current_rp);

	let battles = if remaining == 0 {
		Some(0)
	} else if effective <= 0.0 {
		None
	} else {
		Some((f64::from(remaining) / effective).ceil() as u64)
	};
	let minutes = battles.map(|b| b * u64::from(profile.avg_battle_minutes));
	let hours = minutes.map(|m| (m as f64 / 60.0 * 100.0).round_ties_even() / 100.0);

	Ok(UnlockEstimate {
		item: item.id,
		rp_cost: cost,
		rp_current: current_rp,
		rp_remaining: remaining,
		effective_rp_per_battle: effective,
		battles_needed: battles,
		minutes_needed: minutes,
		hours_needed: hours,
		base_from_recent: None,
	})
}

/// Like [`estimate_to_unlock`], but recent samples (when any are usable)
/// replace the profile's averages. Premium, booster and skill still apply.
pub fn estimate(
	item: &Item,
	current_rp: u32,
	profile: &ProfileParams,
	recent: &[BattleSample],
) -> Result<UnlockEstimate, EstimateError> {
	let summary = (!recent.is_empty()).then(|| summarize_recent_battles(recent));
	let mut effective_profile = *profile;
	if let Some(s) = summary.filter(|s| s.samples > 0) {
		effective_profile.avg_rp_per_battle = s.avg_rp_per_battle;
		effective_profile.avg_battle_minutes = s.avg_battle_minutes;
	}

	let mut result = estimate_to_unlock(item, current_rp, &effective_profile)?;
	result.base_from_recent = summary;
	Ok(result)
}

/// One item's row in a [`ProgressSnapshot`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
	/// Accumulated points, capped at the cost.
	pub rp_current: f64,
	/// Researched, by flag or by threshold.
	pub done: bool,
}

/// `item_id -> {rp_current, done}` for every item with recorded progress.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressSnapshot(pub BTreeMap<ItemId, SnapshotEntry>);

impl ProgressSnapshot {
	/// Completion uses each item's cost, so threshold-reached entries are
	/// reported done even if never ticked. Points are capped at the cost.
	pub fn capture(store: &ProgressStore, items: &[Item]) -> Self {
		let caps: BTreeMap<ItemId, Option<f64>> = items.iter().map(|i| (i.id, i.cap())).collect();
		Self(
			store
				.export_all()
				.into_iter()
				.map(|(id, entry)| {
					let cap = caps.get(&id).copied().flatten();
					let snapshot = SnapshotEntry {
						rp_current: entry.accumulated_within(cap),
						done: entry.is_done(cap),
					};
					(id, snapshot)
				})
				.collect(),
		)
	}

	/// Request body for the estimate service.
	pub fn to_json(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string(self)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn profile() -> ProfileParams {
		ProfileParams {
			avg_rp_per_battle: 1000,
			avg_battle_minutes: 12,
			..ProfileParams::default()
		}
	}

	#[test]
	fn multipliers_stack() {
		let p = ProfileParams {
			has_premium: true,
			booster_percent: Some(50),
			skill_bonus_percent: Some(10),
			..profile()
		};
		assert!((effective_rp_per_battle(&p) - 3300.0).abs() < 1e-9);
		assert_eq!(effective_rp_per_battle(&profile()), 1000.0);
	}

	#[test]
	fn summary_strips_bonuses() {
		let samples = [
			BattleSample {
				rp: 2000.0,
				minutes: 10.0,
				premium: true,
				booster_percent: None,
			},
			BattleSample {
				rp: 1500.0,
				minutes: 0.0,
				premium: false,
				booster_percent: Some(50),
			},
			BattleSample {
				rp: f64::NAN,
				..BattleSample::default()
			},
		];
		let summary = summarize_recent_battles(&samples);
		assert_eq!(summary.samples, 2);
		assert_eq!(summary.avg_rp_per_battle, 1000);
		assert_eq!(summary.avg_battle_minutes, 10);
		assert_eq!(summarize_recent_battles(&[]), BattleSummary::default());
	}

	#[test]
	fn estimate_rounds_battles_up() {
		let item = Item::new(1, "Tiger", 4).with_cost(12_500);
		let est = estimate_to_unlock(&item, 2_000, &profile()).unwrap();
		assert_eq!(est.rp_remaining, 10_500);
		assert_eq!(est.battles_needed, Some(11));
		assert_eq!(est.minutes_needed, Some(132));
		assert_eq!(est.hours_needed, Some(2.2));
	}

	#[test]
	fn estimate_edge_cases() {
		let item = Item::new(1, "Tiger", 4).with_cost(500);
		let done = estimate_to_unlock(&item, 900, &ProfileParams::default()).unwrap();
		assert_eq!(done.battles_needed, Some(0));

		let stuck = estimate_to_unlock(&item, 0, &ProfileParams::default()).unwrap();
		assert_eq!(stuck.battles_needed, None);
		assert_eq!(stuck.hours_needed, None);

		let free = Item::new(2, "Gift", 1);
		assert_eq!(
			estimate_to_unlock(&free, 0, &profile()),
			Err(EstimateError::NoCost("Gift".into()))
		);
	}

	#[test]
	fn recent_samples_override_profile_averages() {
		let item = Item::new(1, "Tiger", 4).with_cost(4_000);
		let recent = [BattleSample {
			rp: 500.0,
			minutes: 20.0,
			premium: false,
			booster_percent: None,
		}];
		let p = ProfileParams {
			has_premium: true,
			..profile()
		};
		let est = estimate(&item, 0, &p, &recent).unwrap();
		assert_eq!(est.effective_rp_per_battle, 1000.0);
		assert_eq!(est.battles_needed, Some(4));
		assert_eq!(est.minutes_needed, Some(80));
		assert_eq!(est.base_from_recent.map(|s| s.samples), Some(1));
	}

	#[test]
	fn snapshot_reports_derived_completion() {
		let items = vec![
			Item::new(1, "A", 1).with_cost(100),
			Item::new(2, "B", 1).with_cost(100),
		];
		let mut store = ProgressStore::ephemeral();
		store.set_accumulated(ItemId(1), 100.0, None);
		store.set_accumulated(ItemId(2), 40.0, Some(100.0));

		let snapshot = ProgressSnapshot::capture(&store, &items);
		assert!(snapshot.0[&ItemId(1)].done);
		assert!(!snapshot.0[&ItemId(2)].done);
		assert_eq!(
			snapshot.to_json().unwrap(),
			r#"{"1":{"rp_current":100.0,"done":true},"2":{"rp_current":40.0,"done":false}}"#
		);
	}

	#[test]
	fn averages_round_half_to_even() {
		let samples = [
			BattleSample {
				rp: 1001.0,
				minutes: 10.0,
				..BattleSample::default()
			},
			BattleSample {
				rp: 1000.0,
				minutes: 11.0,
				..BattleSample::default()
			},
		];
		let summary = summarize_recent_battles(&samples);
		assert_eq!(summary.avg_rp_per_battle, 1000);
		assert_eq!(summary.avg_battle_minutes, 10);

		let odd = [
			BattleSample {
				rp: 1002.0,
				minutes: 13.0,
				..BattleSample::default()
			},
			BattleSample {
				rp: 1001.0,
				minutes: 12.0,
				..BattleSample::default()
			},
		];
		let summary = summarize_recent_battles(&odd);
		assert_eq!(summary.avg_rp_per_battle, 1002);
		assert_eq!(summary.avg_battle_minutes, 12);
	}

	#[test]
	fn snapshot_caps_stored_points_at_cost() {
		use crate::config::ProgressConfig;
		use crate::tree::progress::{MemoryBackend, ProgressEntry};

		let items = vec![
			Item::new(5, "Legacy", 3).with_cost(1000),
			Item::new(6, "Imported", 3).with_cost(1000),
			Item::new(7, "Free", 1),
		];
		let backend = MemoryBackend::new();
		backend.insert("tech-tree-progress:guest", r#"{"5": 1500}"#);
		let mut store = ProgressStore::new(ProgressConfig::default(), backend);

		let imported = [(6, 99_999.0), (7, 750.0)]
			.into_iter()
			.map(|(id, rp)| {
				let entry = ProgressEntry {
					accumulated: rp,
					completed: false,
				};
				(ItemId(id), entry)
			})
			.collect();
		store.import_all(imported, true);

		let snapshot = ProgressSnapshot::capture(&store, &items);
		assert_eq!(
			snapshot.to_json().unwrap(),
			r#"{"5":{"rp_current":1000.0,"done":true},"6":{"rp_current":1000.0,"done":true},"7":{"rp_current":750.0,"done":false}}"#
		);
	}
}
