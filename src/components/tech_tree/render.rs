use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::{BADGE_SIZE, NodeStatus, Rect, TechTreeState};
use crate::tree::{ItemId, ItemType};

const BACKGROUND: &str = "#1a1a2e";
const LABEL_CHARS: usize = 18;

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

pub fn render(state: &TechTreeState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_edges(state, ctx);
	draw_nodes(state, ctx);
	draw_variant_panels(state, ctx);
	ctx.restore();
}

fn fill_color(status: &NodeStatus, kind: ItemType) -> &'static str {
	match (status.done, status.locked, kind) {
		(true, _, _) => "#2e7d4f",
		(false, true, _) => "#3a3a48",
		(false, false, ItemType::Premium) => "#8a6d1f",
		(false, false, ItemType::Collector) => "#6d3f8a",
		(false, false, ItemType::Researchable) => "#2b5c8a",
	}
}

fn truncate(label: &str) -> String {
	if label.chars().count() <= LABEL_CHARS {
		label.to_string()
	} else {
		let mut short: String = label.chars().take(LABEL_CHARS - 1).collect();
		short.push('…');
		short
	}
}

fn draw_edges(state: &TechTreeState, ctx: &CanvasRenderingContext2d) {
	let t = ease_out_cubic(state.hover.highlight_t);
	let dash = js_sys::Array::of2(&JsValue::from_f64(6.0), &JsValue::from_f64(4.0));

	for edge in &state.tree.edges {
		let (Some(from), Some(to)) = (state.node_rect(edge.parent), state.node_rect(edge.child))
		else {
			continue;
		};
		let is_highlighted = state.is_highlighted(edge.parent) && state.is_highlighted(edge.child);
		let alpha = if is_highlighted {
			0.6 + 0.35 * t
		} else {
			0.6 - 0.45 * t
		};
		let locked = state.status(edge.child).locked;

		ctx.set_stroke_style_str(&format!("rgba(100, 180, 255, {alpha})"));
		ctx.set_line_width(if is_highlighted { 2.0 + t } else { 1.5 });
		if locked {
			let _ = ctx.set_line_dash(&dash);
		} else {
			let _ = ctx.set_line_dash(&js_sys::Array::new());
		}

		let (x1, y1) = (from.x + from.w / 2.0, from.y + from.h);
		let (x2, y2) = (to.x + to.w / 2.0, to.y);
		let mid_y = y1 + (y2 - y1) / 2.0;
		ctx.begin_path();
		ctx.move_to(x1, y1);
		ctx.line_to(x1, mid_y);
		ctx.line_to(x2, mid_y);
		ctx.line_to(x2, y2);
		ctx.stroke();
	}
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}

fn draw_card(
	state: &TechTreeState,
	ctx: &CanvasRenderingContext2d,
	id: ItemId,
	rect: Rect,
	alpha: f64,
) {
	let Some(item) = state.resolver.item(id) else {
		return;
	};
	let status = state.status(id);

	ctx.set_global_alpha(alpha);
	ctx.set_fill_style_str(fill_color(&status, item.kind));
	ctx.fill_rect(rect.x, rect.y, rect.w, rect.h);

	// progress bar along the bottom edge
	let bar_h = (rect.h * 0.1).max(3.0);
	ctx.set_fill_style_str("rgba(0, 0, 0, 0.35)");
	ctx.fill_rect(rect.x, rect.y + rect.h - bar_h, rect.w, bar_h);
	ctx.set_fill_style_str("#7fd17f");
	ctx.fill_rect(
		rect.x,
		rect.y + rect.h - bar_h,
		rect.w * status.fraction(),
		bar_h,
	);

	if state.highlighted.contains(&id) {
		ctx.set_stroke_style_str("#ffd54a");
		ctx.set_line_width(2.5);
		ctx.stroke_rect(rect.x - 2.0, rect.y - 2.0, rect.w + 4.0, rect.h + 4.0);
	}

	let font_px = (rect.h * 0.24).clamp(9.0, 13.0);
	ctx.set_fill_style_str("white");
	ctx.set_font(&format!("{font_px}px sans-serif"));
	let mut label = truncate(&item.name);
	if status.locked {
		label = format!("🔒 {label}");
	}
	let _ = ctx.fill_text(&label, rect.x + 6.0, rect.y + font_px + 4.0);

	if rect.h > 40.0 {
		ctx.set_fill_style_str("rgba(255, 255, 255, 0.7)");
		ctx.set_font(&format!("{}px sans-serif", font_px - 2.0));
		let detail = match status.cap {
			Some(cap) => format!("{:.0} / {cap:.0} RP", status.accumulated),
			None => format!("rank {}", item.rank),
		};
		let _ = ctx.fill_text(&detail, rect.x + 6.0, rect.y + 2.0 * font_px + 8.0);
	}
	ctx.set_global_alpha(1.0);
}

fn draw_nodes(state: &TechTreeState, ctx: &CanvasRenderingContext2d) {
	let (has_highlight, t) = (
		state.has_active_highlight(),
		ease_out_cubic(state.hover.highlight_t),
	);

	for (&id, &pos) in &state.layout.positions {
		let rect = state.cell_rect(pos);
		let alpha = if has_highlight && !state.is_highlighted(id) {
			1.0 - 0.6 * t
		} else {
			1.0
		};
		draw_card(state, ctx, id, rect, alpha);

		if state.is_hovered(id) && t > 0.01 {
			ctx.set_stroke_style_str(&format!("rgba(255, 255, 255, {})", 0.8 * t));
			ctx.set_line_width(1.5);
			ctx.stroke_rect(rect.x - 1.0, rect.y - 1.0, rect.w + 2.0, rect.h + 2.0);
		}

		if let Some(badge) = state.badge_rect(id) {
			let count = state.resolver.grouping().variants(id).len();
			let text = if state.expansion.is_expanded(id) {
				"−".to_string()
			} else {
				format!("+{count}")
			};
			ctx.set_fill_style_str("#e0e0f0");
			ctx.fill_rect(badge.x, badge.y, badge.w, badge.h);
			ctx.set_fill_style_str(BACKGROUND);
			ctx.set_font("10px sans-serif");
			let _ = ctx.fill_text(&text, badge.x + 3.0, badge.y + BADGE_SIZE - 5.0);
		}
	}
}

fn draw_variant_panels(state: &TechTreeState, ctx: &CanvasRenderingContext2d) {
	for anchor in state.expansion.expanded() {
		let rows = state.variant_rects(anchor);
		let (Some((_, first)), Some((_, last))) = (rows.first(), rows.last()) else {
			continue;
		};
		ctx.set_fill_style_str("rgba(10, 10, 20, 0.85)");
		ctx.fill_rect(
			first.x - 3.0,
			first.y - 3.0,
			first.w + 6.0,
			last.y + last.h - first.y + 6.0,
		);
		for (id, rect) in &rows {
			draw_card(state, ctx, *id, *rect, 1.0);
		}
	}
}
