use leptos::prelude::*;

use super::tech_tree::SharedProgress;
use crate::tree::estimate::{BattleSample, ProfileParams, UnlockEstimate, estimate};
use crate::tree::{ItemId, TreeData};

fn parse_count(raw: &str) -> Option<u32> {
	raw.trim().parse().ok()
}

fn parse_amount(raw: &str) -> f64 {
	raw.trim()
		.parse::<f64>()
		.ok()
		.filter(|v| v.is_finite() && *v >= 0.0)
		.unwrap_or(0.0)
}

fn blank_zero(v: f64) -> String {
	if v == 0.0 { String::new() } else { v.to_string() }
}

fn describe(est: &UnlockEstimate) -> String {
	match (est.battles_needed, est.minutes_needed, est.hours_needed) {
		(Some(0), ..) => "Nothing left to research.".to_string(),
		(Some(battles), Some(minutes), Some(hours)) => {
			format!("{battles} battles, {minutes} min ({hours} h)")
		}
		_ => "No research points per battle yet.".to_string(),
	}
}

/// Time-to-unlock estimate for the focused item, from the player's profile
/// or from the battles entered below it.
#[component]
pub fn EstimatePanel(
	#[prop(into)] data: Signal<TreeData>,
	progress: SharedProgress,
	focus: RwSignal<Option<ItemId>>,
	version: RwSignal<u64>,
) -> impl IntoView {
	let profile = RwSignal::new(ProfileParams {
		avg_rp_per_battle: 1000,
		avg_battle_minutes: 10,
		..ProfileParams::default()
	});
	let samples = RwSignal::new(Vec::<BattleSample>::new());
	let draft = RwSignal::new(BattleSample::default());
	let result = RwSignal::new(None::<Result<(String, UnlockEstimate), String>>);

	Effect::new(move |_| {
		let _ = version.get();
		let (tree, profile, recent) = (data.get(), profile.get(), samples.get());
		let Some(item) = focus.get().and_then(|id| tree.item(id).cloned()) else {
			result.set(None);
			return;
		};
		let Ok(store) = progress.try_borrow() else {
			return;
		};
		let current = store.get(item.id).accumulated_within(item.cap()).round_ties_even() as u32;
		drop(store);

		let outcome = estimate(&item, current, &profile, &recent)
			.map(|est| (item.name.clone(), est))
			.map_err(|e| e.to_string());
		result.set(Some(outcome));
	});

	let add_battle = move |_| {
		let sample = draft.get_untracked();
		if sample.rp > 0.0 {
			samples.update(|list| list.push(sample));
			draft.set(BattleSample::default());
		}
	};

	view! {
		<div class="estimate-panel">
			<h2>"Time to unlock"</h2>
			{move || match result.get() {
				None => view! { <p>"Point at an item to estimate it."</p> }.into_any(),
				Some(Err(reason)) => view! { <p>{reason}</p> }.into_any(),
				Some(Ok((name, est))) => {
					let basis = est
						.base_from_recent
						.filter(|s| s.samples > 0)
						.map(|s| {
							format!(
								"Based on {} recent battles: {} RP, {} min each.",
								s.samples,
								s.avg_rp_per_battle,
								s.avg_battle_minutes,
							)
						});
					view! {
						<p>
							<strong>{name}</strong>
							{format!(" {} / {} RP", est.rp_current, est.rp_cost)}
						</p>
						<p>{describe(&est)}</p>
						<p class="estimate-basis">{basis}</p>
					}
						.into_any()
				}
			}}

			<fieldset class="profile">
				<legend>"Profile"</legend>
				<label>
					"RP per battle"
					<input
						type="number"
						min="0"
						prop:value=move || profile.get().avg_rp_per_battle.to_string()
						on:input=move |ev| {
							if let Some(v) = parse_count(&event_target_value(&ev)) {
								profile.update(|p| p.avg_rp_per_battle = v);
							}
						}
					/>
				</label>
				<label>
					"Minutes per battle"
					<input
						type="number"
						min="0"
						prop:value=move || profile.get().avg_battle_minutes.to_string()
						on:input=move |ev| {
							if let Some(v) = parse_count(&event_target_value(&ev)) {
								profile.update(|p| p.avg_battle_minutes = v);
							}
						}
					/>
				</label>
				<label>
					<input
						type="checkbox"
						prop:checked=move || profile.get().has_premium
						on:change=move |ev| profile.update(|p| p.has_premium = event_target_checked(&ev))
					/>
					"Premium"
				</label>
				<label>
					"Booster %"
					<input
						type="number"
						min="0"
						on:input=move |ev| {
							let v = parse_count(&event_target_value(&ev));
							profile.update(|p| p.booster_percent = v);
						}
					/>
				</label>
				<label>
					"Skill bonus %"
					<input
						type="number"
						min="0"
						on:input=move |ev| {
							let v = parse_count(&event_target_value(&ev));
							profile.update(|p| p.skill_bonus_percent = v);
						}
					/>
				</label>
			</fieldset>

			<fieldset class="recent-battles">
				<legend>{move || format!("Recent battles ({})", samples.get().len())}</legend>
				<input
					type="number"
					min="0"
					placeholder="RP earned"
					prop:value=move || blank_zero(draft.get().rp)
					on:input=move |ev| draft.update(|d| d.rp = parse_amount(&event_target_value(&ev)))
				/>
				<input
					type="number"
					min="0"
					placeholder="Minutes"
					prop:value=move || blank_zero(draft.get().minutes)
					on:input=move |ev| {
						draft.update(|d| d.minutes = parse_amount(&event_target_value(&ev)))
					}
				/>
				<label>
					<input
						type="checkbox"
						prop:checked=move || draft.get().premium
						on:change=move |ev| draft.update(|d| d.premium = event_target_checked(&ev))
					/>
					"Premium"
				</label>
				<input
					type="number"
					min="0"
					placeholder="Booster %"
					prop:value=move || {
						draft.get().booster_percent.map(|b| b.to_string()).unwrap_or_default()
					}
					on:input=move |ev| {
						draft.update(|d| d.booster_percent = parse_count(&event_target_value(&ev)))
					}
				/>
				<button on:click=add_battle>"Add battle"</button>
				<button on:click=move |_| samples.set(Vec::new())>"Clear"</button>
			</fieldset>
		</div>
	}
}
