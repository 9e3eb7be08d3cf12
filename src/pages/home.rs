use leptos::prelude::*;
use log::{error, info, warn};

use crate::components::estimate_panel::EstimatePanel;
use crate::components::tech_tree::{TechTreeCanvas, share};
use crate::config::ProgressConfig;
use crate::tree::estimate::ProgressSnapshot;
use crate::tree::progress::LocalStorageBackend;
use crate::tree::{ItemId, PersistenceMode, ProgressStore, TreeData, import_tree};

/// Bundled ground-forces tree used until a selection is fetched.
fn sample_tree() -> TreeData {
	match import_tree(include_str!("../../data/sample_tree.json")) {
		Ok((tree, report)) => {
			if !report.warnings.is_empty() {
				warn!("sample tree has {} dangling references", report.warnings.len());
			}
			tree
		}
		Err(e) => {
			error!("bundled sample tree failed to load: {e}");
			TreeData::default()
		}
	}
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let tree = sample_tree();
	let progress = share(ProgressStore::new(
		ProgressConfig::default(),
		LocalStorageBackend,
	));

	let search = RwSignal::new(String::new());
	let notice = RwSignal::new(None::<String>);
	let focus = RwSignal::new(None::<ItemId>);
	let version = RwSignal::new(progress.borrow().version());
	let stats = RwSignal::new((0usize, 0usize));
	let user = RwSignal::new(String::new());
	let durable = RwSignal::new(progress.borrow().mode() == PersistenceMode::Durable);

	let data = {
		let tree = tree.clone();
		Signal::derive(move || tree.clone())
	};
	let highlight = {
		let tree = tree.clone();
		Signal::derive(move || tree.search(&search.get()))
	};

	progress.borrow_mut().subscribe(move |v| version.set(v));

	let (progress_stats, tree_stats) = (progress.clone(), tree.clone());
	Effect::new(move |_| {
		let _ = version.get();
		let Ok(store) = progress_stats.try_borrow() else {
			return;
		};
		let done = tree_stats
			.nodes
			.iter()
			.filter(|i| store.is_done(i.id, i.cap()))
			.count();
		stats.set((done, tree_stats.nodes.len()));
	});

	let progress_login = progress.clone();
	let on_login = move |_| {
		let id = user.get_untracked();
		progress_login.borrow_mut().switch_namespace(Some(&id));
		info!("progress namespace is now {}", progress_login.borrow().namespace());
	};

	let progress_guest = progress.clone();
	let on_guest = move |_| {
		user.set(String::new());
		progress_guest.borrow_mut().switch_namespace(None);
	};

	let progress_mode = progress.clone();
	let on_mode = move |ev| {
		let on = event_target_checked(&ev);
		durable.set(on);
		let mode = if on {
			PersistenceMode::Durable
		} else {
			PersistenceMode::Ephemeral
		};
		progress_mode.borrow_mut().set_persistence_mode(mode);
	};

	let (progress_export, tree_export) = (progress.clone(), tree.clone());
	let on_export = move |_| {
		let snapshot = ProgressSnapshot::capture(&progress_export.borrow(), &tree_export.nodes);
		match snapshot.to_json() {
			Ok(json) => info!("progress snapshot: {json}"),
			Err(e) => error!("could not serialise progress snapshot: {e}"),
		}
	};

	view! {
		<div class="fullscreen-graph">
			<TechTreeCanvas
				data=data
				progress=progress.clone()
				highlight=highlight
				notice=notice
				focus=focus
				fullscreen=true
			/>
			<div class="graph-overlay">
				<h1>"Research Tree"</h1>
				<p class="subtitle">
					"Click to mark researched. Shift-click to enter RP. Drag to pan, scroll to zoom."
				</p>
				<p class="stats">
					{move || {
						let (done, total) = stats.get();
						format!("{done} / {total} researched")
					}}
				</p>
				<input
					type="search"
					placeholder="Search vehicles"
					prop:value=move || search.get()
					on:input=move |ev| search.set(event_target_value(&ev))
				/>
				<div class="account">
					<input
						type="text"
						placeholder="User id"
						prop:value=move || user.get()
						on:input=move |ev| user.set(event_target_value(&ev))
					/>
					<button on:click=on_login>"Sign in"</button>
					<button on:click=on_guest>"Guest"</button>
					<label>
						<input type="checkbox" prop:checked=move || durable.get() on:change=on_mode />
						"Remember progress"
					</label>
					<button on:click=on_export>"Export"</button>
				</div>
				<p class="notice">{move || notice.get()}</p>
				<EstimatePanel data=data progress=progress.clone() focus=focus version=version />
			</div>
		</div>
	}
}
