use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use leptos::prelude::*;
use log::{debug, info};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::render;
use super::state::{Hit, TechTreeState};
use super::types::SharedProgress;
use crate::config::CanvasConfig;
use crate::tree::{ItemId, TreeData, request_set_accumulated, request_toggle_completed};

/// Pointer travel below which a press counts as a click rather than a pan.
const CLICK_SLOP: f64 = 4.0;

fn canvas_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

fn window_size(window: &Window) -> Option<(f64, f64)> {
	Some((
		window.inner_width().ok()?.as_f64()?,
		window.inner_height().ok()?.as_f64()?,
	))
}

/// Canvas rendering of a progression tree.
///
/// Click an item to toggle it researched, shift-click to type its research
/// points, click a `+N` badge to open its variant folder. Refusals (locked
/// items, unusable numbers) are written to `notice`. The last item under the
/// pointer is written to `focus` and stays there when the pointer leaves.
#[component]
pub fn TechTreeCanvas(
	#[prop(into)] data: Signal<TreeData>,
	progress: SharedProgress,
	#[prop(into)] highlight: Signal<HashSet<ItemId>>,
	notice: RwSignal<Option<String>>,
	focus: RwSignal<Option<ItemId>>,
	#[prop(default = CanvasConfig::default())] config: CanvasConfig,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<TechTreeState>>> = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (state_init, animate_init, resize_cb_init, progress_init) = (
		state.clone(),
		animate.clone(),
		resize_cb.clone(),
		progress.clone(),
	);

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};

		let (w, h) = if fullscreen {
			window_size(&window).unwrap_or((800.0, 600.0))
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.unwrap_or(800.0)
				}),
				height.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_height() as f64)
						.unwrap_or(600.0)
				}),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			return;
		};
		let mut initial = TechTreeState::new(&data.get_untracked(), config, w, h);
		initial.set_highlight(highlight.get_untracked());
		*state_init.borrow_mut() = Some(initial);
		info!("tech tree canvas mounted at {w}x{h}");

		if fullscreen {
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let Some((nw, nh)) = web_sys::window().as_ref().and_then(window_size) else {
					return;
				};
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(ref mut s) = *state_resize.borrow_mut() {
					s.resize(nw, nh);
				}
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (state_anim, animate_inner, progress_anim) =
			(state_init.clone(), animate_init.clone(), progress_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if let Some(ref mut s) = *state_anim.borrow_mut() {
				if let Ok(store) = progress_anim.try_borrow() {
					s.refresh_status(&store);
				}
				s.tick(0.016);
				render::render(s, &ctx);
			}
			if let Some(ref cb) = *animate_inner.borrow() {
				if let Some(win) = web_sys::window() {
					let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
				}
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	// New tree data for the current selection: lay it out again.
	let state_data = state.clone();
	Effect::new(move |_| {
		let tree = data.get();
		if let Some(ref mut s) = *state_data.borrow_mut() {
			s.load(&tree);
			debug!("tech tree reloaded with {} items", tree.nodes.len());
		}
	});

	let state_hl = state.clone();
	Effect::new(move |_| {
		let ids = highlight.get();
		if let Some(ref mut s) = *state_hl.borrow_mut() {
			s.set_highlight(ids);
		}
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_md.borrow_mut() {
			s.pan.active = true;
			s.pan.moved = false;
			s.pan.start_x = x;
			s.pan.start_y = y;
			s.pan.transform_start_x = s.transform.x;
			s.pan.transform_start_y = s.transform.y;
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_mm.borrow_mut() {
			if s.pan.active {
				let (dx, dy) = (x - s.pan.start_x, y - s.pan.start_y);
				if dx.abs() > CLICK_SLOP || dy.abs() > CLICK_SLOP {
					s.pan.moved = true;
				}
				if s.pan.moved {
					s.transform.x = s.pan.transform_start_x + dx;
					s.transform.y = s.pan.transform_start_y + dy;
				}
			} else {
				let hovered = match s.hit_test(x, y) {
					Some(Hit::Node(id)) | Some(Hit::Variant(id)) => Some(id),
					_ => None,
				};
				if hovered.is_some() && focus.get_untracked() != hovered {
					focus.set(hovered);
				}
				s.set_hover(hovered);
			}
		}
	};

	let (state_mu, progress_mu) = (state.clone(), progress.clone());
	let on_mouseup = move |ev: MouseEvent| {
		let point = canvas_point(canvas_ref, &ev);
		let mut guard = state_mu.borrow_mut();
		let Some(s) = guard.as_mut() else {
			return;
		};
		let was_click = s.pan.active && !s.pan.moved;
		s.pan.active = false;
		let Some((x, y)) = point.filter(|_| was_click) else {
			return;
		};

		let target = match s.hit_test(x, y) {
			Some(Hit::FolderBadge(anchor)) => {
				let open = s.toggle_expanded(anchor);
				debug!("folder {anchor} expanded: {open}");
				return;
			}
			Some(Hit::Node(id)) | Some(Hit::Variant(id)) => id,
			None => return,
		};

		let result = if ev.shift_key() {
			let current = progress_mu.borrow().get(target).accumulated;
			let answer = web_sys::window().and_then(|w| {
				w.prompt_with_message_and_default(
					&format!("Research points for {}", s.resolver.display_name(target)),
					&format!("{current:.0}"),
				)
				.ok()
				.flatten()
			});
			let Some(raw) = answer else {
				return;
			};
			request_set_accumulated(&mut progress_mu.borrow_mut(), &s.resolver, target, &raw)
		} else {
			request_toggle_completed(&mut progress_mu.borrow_mut(), &s.resolver, target)
		};

		match result {
			Ok(outcome) => {
				debug!("item {} now at {:?}", outcome.id, outcome.entry);
				notice.set(None);
			}
			Err(e) => notice.set(Some(e.to_string())),
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.pan.active = false;
			s.set_hover(None);
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_wh.borrow_mut() {
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			let new_k = (s.transform.k * factor).clamp(0.2, 4.0);
			let ratio = new_k / s.transform.k;
			s.transform.x = x - (x - s.transform.x) * ratio;
			s.transform.y = y - (y - s.transform.y) * ratio;
			s.transform.k = new_k;
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="tech-tree-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: pointer;"
		/>
	}
}
