use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;
use log::{error, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::config::ForceGraphConfig;
use super::geometry::Point;
use super::state::{Callbacks, ForceGraphState};
use super::surface::CanvasSurface;
use super::types::GraphData;

/// Pointer travel, in pixels, that turns a press into a drag or pan.
const CLICK_TOLERANCE: f64 = 3.0;
/// Wheel events in line units scroll this many pixels per line.
const WHEEL_LINE_PX: f64 = 25.0;
const DOM_DELTA_LINE: u32 = 1;

#[derive(Clone, Copy, Debug, Default)]
struct PressState {
	down: Option<Point>,
	moved: bool,
}

/// Shared access to the state behind a mounted [`ForceGraphCanvas`], for
/// imperative calls such as emitting particles or framing the graph.
///
/// Create one, pass a clone as the component's `handle` prop and keep the
/// other. Calls made before the component mounts do nothing.
#[derive(Clone, Default)]
pub struct ForceGraphHandle {
	state: Rc<RefCell<Option<ForceGraphState>>>,
}

impl ForceGraphHandle {
	/// A handle not yet attached to any component.
	pub fn new() -> Self {
		Self::default()
	}

	/// Whether a component has initialized state behind this handle.
	pub fn is_mounted(&self) -> bool {
		self.state.try_borrow().is_ok_and(|s| s.is_some())
	}

	/// Run `f` against the mounted state. Returns `None` before mount, or
	/// when called re-entrantly from one of the graph's own callbacks.
	pub fn with<R>(&self, f: impl FnOnce(&mut ForceGraphState) -> R) -> Option<R> {
		match self.state.try_borrow_mut() {
			Ok(mut state) => state.as_mut().map(f),
			Err(_) => {
				warn!("force-graph: handle used from inside a graph callback, ignored");
				None
			}
		}
	}

	/// Send a single particle down the link at index `link`.
	pub fn emit_particle(&self, link: usize) -> bool {
		self.with(|s| s.emit_particle(link)).unwrap_or(false)
	}

	/// See [`ForceGraphState::pause_animation`].
	pub fn pause_animation(&self) {
		self.with(ForceGraphState::pause_animation);
	}

	/// See [`ForceGraphState::resume_animation`].
	pub fn resume_animation(&self) {
		self.with(ForceGraphState::resume_animation);
	}

	/// Fit all visible nodes, leaving `padding` screen pixels at the edges.
	pub fn zoom_to_fit(&self, padding: f64) {
		self.with(|s| s.zoom_to_fit(padding));
	}

	/// Center the view on a point in graph coordinates.
	pub fn center_at(&self, p: Point) {
		self.with(|s| s.center_at(p));
	}

	/// Restart the layout at full heat.
	pub fn d3_reheat_simulation(&self) {
		self.with(|s| s.d3_reheat_simulation(now_ms()));
	}
}

struct Surfaces {
	visible: CanvasSurface,
	shadow: CanvasSurface,
}

fn now_ms() -> f64 {
	js_sys::Date::now()
}

fn window_size(window: &Window) -> Option<(f64, f64)> {
	Some((
		window.inner_width().ok()?.as_f64()?,
		window.inner_height().ok()?.as_f64()?,
	))
}

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
	canvas.get_context("2d").ok()??.dyn_into().ok()
}

fn pointer_position(canvas: &HtmlCanvasElement, ev: &MouseEvent) -> Point {
	let rect = canvas.get_bounding_client_rect();
	Point::new(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	)
}

/// Interactive force-directed graph on a canvas, with a hidden shadow canvas
/// for hit testing.
#[component]
pub fn ForceGraphCanvas(
	/// Graph to show. Every change replaces the whole dataset.
	#[prop(into)]
	data: Signal<GraphData>,
	/// Configuration. Changes are applied live; invalid ones are logged and
	/// ignored.
	#[prop(optional, into)]
	config: Option<Signal<ForceGraphConfig, LocalStorage>>,
	/// Interaction and frame hooks.
	#[prop(optional)]
	callbacks: Option<Callbacks>,
	/// Handle for imperative calls from outside.
	#[prop(optional)]
	handle: Option<ForceGraphHandle>,
	/// Size to the window and follow its resizes.
	#[prop(default = false)]
	fullscreen: bool,
	/// Fixed width. Defaults to the parent's width.
	#[prop(default = None)]
	width: Option<f64>,
	/// Fixed height. Defaults to the parent's height.
	#[prop(default = None)]
	height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let shadow_ref = NodeRef::<leptos::html::Canvas>::new();
	let state = handle.unwrap_or_default().state;
	let surfaces: Rc<RefCell<Option<Surfaces>>> = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let press = Rc::new(RefCell::new(PressState::default()));
	let tooltip = RwSignal::new(None::<(String, Point)>);

	let (state_init, surfaces_init, animate_init, resize_cb_init) = (
		state.clone(),
		surfaces.clone(),
		animate.clone(),
		resize_cb.clone(),
	);
	Effect::new(move |_| {
		let (Some(canvas), Some(shadow)) = (canvas_ref.get(), shadow_ref.get()) else {
			return;
		};
		if state_init.borrow().is_some() {
			return;
		}
		let canvas: HtmlCanvasElement = canvas.into();
		let shadow: HtmlCanvasElement = shadow.into();
		let Some(window) = web_sys::window() else {
			error!("force-graph: no window");
			return;
		};

		let (w, h) = if fullscreen {
			window_size(&window).unwrap_or((800.0, 600.0))
		} else {
			let parent = canvas.parent_element();
			(
				width.unwrap_or_else(|| parent.as_ref().map(|p| p.client_width() as f64).unwrap_or(800.0)),
				height.unwrap_or_else(|| parent.as_ref().map(|p| p.client_height() as f64).unwrap_or(600.0)),
			)
		};
		for c in [&canvas, &shadow] {
			c.set_width(w as u32);
			c.set_height(h as u32);
		}
		let (Some(ctx), Some(shadow_ctx)) = (context_2d(&canvas), context_2d(&shadow)) else {
			error!("force-graph: 2d canvas context unavailable");
			return;
		};
		*surfaces_init.borrow_mut() = Some(Surfaces {
			visible: CanvasSurface::new(ctx, w, h),
			shadow: CanvasSurface::new(shadow_ctx, w, h),
		});

		let initial = config.map(|c| c.get_untracked()).unwrap_or_default();
		let mut graph_state = match ForceGraphState::new(initial, w, h) {
			Ok(s) => s,
			Err(err) => {
				error!("force-graph: {err}");
				return;
			}
		};
		if let Some(callbacks) = callbacks.clone() {
			graph_state.callbacks = callbacks;
		}
		// errors are logged by the state; the canvas stays empty
		let _ = graph_state.set_graph_data(data.get_untracked(), now_ms());
		*state_init.borrow_mut() = Some(graph_state);

		if fullscreen {
			let (state_resize, surfaces_resize) = (state_init.clone(), surfaces_init.clone());
			let (canvas_resize, shadow_resize) = (canvas.clone(), shadow.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let Some((nw, nh)) = web_sys::window().as_ref().and_then(window_size) else {
					return;
				};
				for c in [&canvas_resize, &shadow_resize] {
					c.set_width(nw as u32);
					c.set_height(nh as u32);
				}
				if let Some(s) = surfaces_resize.borrow_mut().as_mut() {
					s.visible.resize(nw, nh);
					s.shadow.resize(nw, nh);
				}
				if let Some(s) = state_resize.borrow_mut().as_mut() {
					s.resize(nw, nh);
				}
			}));
			if let Some(cb) = resize_cb_init.borrow().as_ref() {
				let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (state_anim, surfaces_anim, animate_inner) =
			(state_init.clone(), surfaces_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if let (Some(s), Some(surfaces)) = (
				state_anim.borrow_mut().as_mut(),
				surfaces_anim.borrow_mut().as_mut(),
			) {
				s.frame(now_ms(), &mut surfaces.visible, Some(&mut surfaces.shadow));
				let tip = s.tooltip().zip(s.pointer());
				if tooltip.get_untracked() != tip {
					tooltip.set(tip);
				}
			}
			if let (Some(cb), Some(window)) = (animate_inner.borrow().as_ref(), web_sys::window()) {
				let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(cb) = animate_init.borrow().as_ref() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let state_data = state.clone();
	Effect::new(move |prev: Option<()>| {
		let next = data.get();
		// the first run is covered by initialization
		if prev.is_some()
			&& let Some(s) = state_data.borrow_mut().as_mut()
			&& let Err(err) = s.set_graph_data(next, now_ms())
		{
			warn!("force-graph: keeping previous data: {err}");
		}
	});

	if let Some(config) = config {
		let state_config = state.clone();
		Effect::new(move |prev: Option<()>| {
			let next = config.get();
			if prev.is_some()
				&& let Some(s) = state_config.borrow_mut().as_mut()
				&& let Err(err) = s.set_config(next, now_ms())
			{
				warn!("force-graph: keeping previous config: {err}");
			}
		});
	}

	let canvas_el = move || -> Option<HtmlCanvasElement> { canvas_ref.get().map(Into::into) };

	let (state_md, press_md) = (state.clone(), press.clone());
	let on_mousedown = move |ev: MouseEvent| {
		let Some(canvas) = canvas_el() else {
			return;
		};
		let p = pointer_position(&canvas, &ev);
		*press_md.borrow_mut() = PressState {
			down: Some(p),
			moved: false,
		};
		if let Some(s) = state_md.borrow_mut().as_mut() {
			s.set_pointer(Some(p));
			if !s.drag_start() {
				s.pan_start(p);
			}
		}
	};

	let (state_mm, press_mm) = (state.clone(), press.clone());
	let on_mousemove = move |ev: MouseEvent| {
		let Some(canvas) = canvas_el() else {
			return;
		};
		let p = pointer_position(&canvas, &ev);
		{
			let mut press = press_mm.borrow_mut();
			if let Some(down) = press.down
				&& down.distance(p) > CLICK_TOLERANCE
			{
				press.moved = true;
			}
		}
		if let Some(s) = state_mm.borrow_mut().as_mut() {
			s.set_pointer(Some(p));
			if s.is_dragging() {
				s.drag_to(p, now_ms());
			} else {
				s.pan_to(p);
			}
		}
	};

	let (state_mu, press_mu) = (state.clone(), press.clone());
	let on_mouseup = move |ev: MouseEvent| {
		// secondary buttons are handled by contextmenu
		if ev.button() != 0 {
			return;
		}
		let press = std::mem::take(&mut *press_mu.borrow_mut());
		if let Some(s) = state_mu.borrow_mut().as_mut() {
			s.drag_end();
			s.pan_end();
			if press.down.is_some() && !press.moved {
				s.click();
			}
		}
	};

	let (state_ml, press_ml) = (state.clone(), press.clone());
	let on_mouseleave = move |_: MouseEvent| {
		*press_ml.borrow_mut() = PressState::default();
		if let Some(s) = state_ml.borrow_mut().as_mut() {
			s.drag_end();
			s.pan_end();
			s.set_pointer(None);
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some(canvas) = canvas_el() else {
			return;
		};
		let p = pointer_position(&canvas, &ev);
		let delta = match ev.delta_mode() {
			DOM_DELTA_LINE => ev.delta_y() * WHEEL_LINE_PX,
			_ => ev.delta_y(),
		};
		if let Some(s) = state_wh.borrow_mut().as_mut() {
			s.wheel_zoom(p, delta, now_ms());
		}
	};

	let state_cm = state.clone();
	let on_contextmenu = move |ev: MouseEvent| {
		let Some(canvas) = canvas_el() else {
			return;
		};
		if let Some(s) = state_cm.borrow_mut().as_mut() {
			s.set_pointer(Some(pointer_position(&canvas, &ev)));
			if s.right_click() {
				ev.prevent_default();
			}
		}
	};

	view! {
		<div class="force-graph-container" style="position: relative;">
			<canvas
				node_ref=canvas_ref
				class="force-graph-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
				on:contextmenu=on_contextmenu
				style="display: block; cursor: grab;"
			/>
			<canvas node_ref=shadow_ref class="force-graph-shadow" style="display: none;" />
			{move || {
				tooltip
					.get()
					.map(|(text, at)| {
						view! {
							<div
								class="graph-tooltip"
								style=format!("position: absolute; left: {}px; top: {}px;", at.x, at.y)
							>
								{text}
							</div>
						}
					})
			}}
		</div>
	}
}
