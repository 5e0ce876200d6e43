//! Per-instance graph state: loading, frames, interaction and the view.

use std::collections::HashMap;
use std::rc::Rc;

use log::{error, info, warn};

use super::color_registry::ColorRegistry;
use super::config::ForceGraphConfig;
use super::engine::{EngineEvent, ForceSimulationAdapter};
use super::error::GraphError;
use super::geometry::Point;
use super::hit::{HoverChange, ShadowHitTester};
use super::render::{self, RenderMode, RenderPipeline};
use super::simulation::Force;
use super::surface::DrawSurface;
use super::types::{Graph, GraphData, GraphLink, GraphNode, ObjectKind, ObjectRef};

/// Categorical palette for auto-colored objects.
const AUTO_COLORS: &[&str] = &[
	"#a6cee3", "#1f78b4", "#b2df8a", "#33a02c", "#fb9a99", "#e31a1c", "#fdbf6f", "#ff7f00",
	"#cab2d6", "#6a3d9a", "#ffff99", "#b15928",
];

/// `alpha_target` held while a node is dragged.
const DRAG_ALPHA_TARGET: f64 = 0.3;
/// Quiet period after the last wheel step before a zoom gesture ends.
const WHEEL_END_DELAY_MS: f64 = 150.0;

/// Screen placement of the graph: `screen = graph * k + (x, y)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	/// Horizontal translation in screen pixels.
	pub x: f64,
	/// Vertical translation in screen pixels.
	pub y: f64,
	/// Scale, also the global scale handed to painters.
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

#[derive(Clone, Copy, Debug)]
struct DragState {
	node: usize,
	was_pinned: bool,
}

#[derive(Clone, Copy, Debug)]
struct PanState {
	last: Point,
	moved: bool,
}

/// Axis-aligned bounds of the visible nodes, in graph coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
	/// Top-left corner.
	pub min: Point,
	/// Bottom-right corner.
	pub max: Point,
}

impl BoundingBox {
	/// Midpoint of the box.
	pub fn center(&self) -> Point {
		Point::new((self.min.x + self.max.x) / 2.0, (self.min.y + self.max.y) / 2.0)
	}
}

type Hook = Option<Rc<dyn Fn()>>;
type HoverHook<T> = Option<Rc<dyn Fn(Option<&T>, Option<&T>)>>;
type FrameHook = Option<Rc<dyn Fn(&mut dyn DrawSurface, f64)>>;
type ObjectHook<T> = Option<Rc<dyn Fn(&T)>>;
type ZoomHook = Option<Rc<dyn Fn(ViewTransform)>>;

/// Caller hooks. Hover hooks get `(hovered, previous)` user data; the
/// previous object is only passed when it was of the same kind.
#[derive(Clone, Default)]
pub struct Callbacks {
	/// After every engine tick.
	pub on_engine_tick: Hook,
	/// Once, when the engine cools down.
	pub on_engine_stop: Hook,
	/// Pointer moved onto or off a node.
	pub on_node_hover: HoverHook<GraphNode>,
	/// Pointer moved onto or off a link.
	pub on_link_hover: HoverHook<GraphLink>,
	/// Primary click on a node.
	pub on_node_click: ObjectHook<GraphNode>,
	/// Primary click on a link.
	pub on_link_click: ObjectHook<GraphLink>,
	/// Primary click on empty space.
	pub on_background_click: Hook,
	/// Secondary click on a node. Suppresses the browser context menu.
	pub on_node_right_click: ObjectHook<GraphNode>,
	/// Secondary click on a link. Suppresses the browser context menu.
	pub on_link_right_click: ObjectHook<GraphLink>,
	/// Secondary click on empty space.
	pub on_background_right_click: Hook,
	/// Every frame of a drag, after the node moved.
	pub on_node_drag: ObjectHook<GraphNode>,
	/// Release of a dragged node.
	pub on_node_drag_end: ObjectHook<GraphNode>,
	/// Every change of the view transform.
	pub on_zoom: ZoomHook,
	/// End of a pan, wheel or programmatic view change.
	pub on_zoom_end: ZoomHook,
	/// Painted under the graph, in graph coordinates.
	pub on_render_frame_pre: FrameHook,
	/// Painted over the graph, in graph coordinates.
	pub on_render_frame_post: FrameHook,
}

/// Everything one graph instance needs between frames.
pub struct ForceGraphState {
	graph: Graph,
	config: ForceGraphConfig,
	engine: ForceSimulationAdapter,
	registry: ColorRegistry<ObjectRef>,
	hit: ShadowHitTester,
	/// Hooks fired from frames and interactions.
	pub callbacks: Callbacks,
	transform: ViewTransform,
	width: f64,
	height: f64,
	pointer: Option<Point>,
	drag: Option<DragState>,
	pan: Option<PanState>,
	/// Time at which a pending wheel gesture reports its end.
	wheel_end_ms: Option<f64>,
	animation_running: bool,
}

impl ForceGraphState {
	/// Empty state for a `width` by `height` surface. Fails on an invalid config.
	pub fn new(config: ForceGraphConfig, width: f64, height: f64) -> Result<Self, GraphError> {
		config.validate()?;
		Ok(Self {
			graph: Graph::default(),
			engine: ForceSimulationAdapter::new(&config),
			registry: ColorRegistry::new(),
			hit: ShadowHitTester::new(config.hover_throttle),
			config,
			callbacks: Callbacks::default(),
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			width,
			height,
			pointer: None,
			drag: None,
			pan: None,
			wheel_end_ms: None,
			animation_running: true,
		})
	}

	/// Current view transform.
	pub fn transform(&self) -> ViewTransform {
		self.transform
	}

	/// Surface size in pixels, as `(width, height)`.
	pub fn size(&self) -> (f64, f64) {
		(self.width, self.height)
	}

	/// The loaded graph.
	pub fn graph(&self) -> &Graph {
		&self.graph
	}

	/// Current data, positions included.
	pub fn graph_data(&self) -> GraphData {
		self.graph.to_data()
	}

	/// The active configuration.
	pub fn config(&self) -> &ForceGraphConfig {
		&self.config
	}

	/// The layout engine.
	pub fn engine(&self) -> &ForceSimulationAdapter {
		&self.engine
	}

	/// Mutable access to the layout engine.
	pub fn engine_mut(&mut self) -> &mut ForceSimulationAdapter {
		&mut self.engine
	}

	/// Replace the whole dataset. On error the previous graph stays loaded
	/// and keeps rendering.
	pub fn set_graph_data(&mut self, data: GraphData, now_ms: f64) -> Result<(), GraphError> {
		self.load(data, now_ms).inspect_err(|err| error!("force-graph load failed: {err}"))
	}

	fn load(&mut self, data: GraphData, now_ms: f64) -> Result<(), GraphError> {
		let mut graph = Graph::from_data(data)?;
		auto_color(&mut graph, &self.config);
		render::refresh_particles(&mut graph, &self.config);
		self.engine.load(&mut graph, &self.config, now_ms)?;

		info!(
			"force-graph loading {} nodes {} links",
			graph.nodes.len(),
			graph.links.len()
		);
		self.registry.reset();
		let mut unregistered = 0;
		for (i, node) in graph.nodes.iter_mut().enumerate() {
			node.index_color = self.registry.register(ObjectRef::Node(i));
			unregistered += usize::from(node.index_color.is_none());
		}
		for (i, link) in graph.links.iter_mut().enumerate() {
			link.index_color = self.registry.register(ObjectRef::Link(i));
			unregistered += usize::from(link.index_color.is_none());
		}
		if unregistered > 0 {
			warn!("color registry full, {unregistered} objects will not respond to the pointer");
		}

		self.graph = graph;
		self.hit.reset();
		self.drag = None;
		Ok(())
	}

	/// Swap in a new configuration. DAG constraints and particles are
	/// recomputed, and a change to the DAG layout reheats the engine so it
	/// takes effect. On error the previous configuration stays in place.
	pub fn set_config(&mut self, config: ForceGraphConfig, now_ms: f64) -> Result<(), GraphError> {
		config.validate()?;
		let dag_changed = dag_inputs_differ(&self.config, &config);
		self.engine.apply_dag(&mut self.graph, &config)?;
		self.engine.apply_config(&config);
		if dag_changed {
			self.engine.reheat(now_ms);
		}
		self.hit.set_throttle(config.hover_throttle);
		self.hit.invalidate();
		if !config.enable_pointer_interaction {
			self.hit.reset();
		}
		self.config = config;
		render::refresh_particles(&mut self.graph, &self.config);
		let k = self.transform.k.clamp(self.config.min_zoom, self.config.max_zoom);
		if k != self.transform.k {
			let center = Point::new(self.width / 2.0, self.height / 2.0);
			self.zoom_at(center, k / self.transform.k);
			self.notify_zoom_end();
		}
		Ok(())
	}

	/// Track a new surface size. The view transform is kept.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
		self.hit.invalidate();
	}

	/// Run one animation frame: hit-test, tick, then paint. The shadow
	/// surface is repainted on its own throttled cadence, and before the
	/// hit-test when its pixels predate the current data.
	pub fn frame(
		&mut self,
		now_ms: f64,
		visible: &mut dyn DrawSurface,
		mut shadow: Option<&mut dyn DrawSurface>,
	) {
		if let Some(end) = self.wheel_end_ms
			&& now_ms >= end
		{
			self.wheel_end_ms = None;
			self.notify_zoom_end();
		}
		if !self.animation_running {
			return;
		}
		let interactive = self.config.enable_pointer_interaction;
		let mut shadow_painted = false;
		if interactive
			&& self.hit.is_invalidated()
			&& let Some(shadow) = shadow.as_deref_mut()
			&& self.hit.repaint_due(now_ms)
		{
			render::update_control_points(&mut self.graph, &self.config);
			self.paint(shadow, RenderMode::Shadow);
			shadow_painted = true;
		}
		if interactive && let Some(shadow) = shadow.as_deref() {
			let changes = self
				.hit
				.hit_test(shadow, &self.registry, self.pointer, self.drag.is_some());
			self.dispatch_hover(&changes);
		}

		match self.engine.tick(&mut self.graph, now_ms) {
			Some(EngineEvent::Ticked) => {
				if let Some(cb) = &self.callbacks.on_engine_tick {
					cb();
				}
			}
			Some(EngineEvent::Stopped) => {
				if let Some(cb) = &self.callbacks.on_engine_stop {
					cb();
				}
			}
			None => {}
		}
		render::update_control_points(&mut self.graph, &self.config);
		render::advance_particles(&mut self.graph, &self.config);

		self.paint(visible, RenderMode::Visible);
		if interactive
			&& !shadow_painted
			&& let Some(shadow) = shadow.as_deref_mut()
			&& self.hit.repaint_due(now_ms)
		{
			self.paint(shadow, RenderMode::Shadow);
		}
	}

	fn paint(&self, surface: &mut dyn DrawSurface, mode: RenderMode) {
		let t = self.transform;
		surface.clear();
		let visible = mode == RenderMode::Visible;
		if visible && let Some(background) = &self.config.background_color {
			surface.fill_background(background);
		}
		surface.set_transform(t.k, t.x, t.y);
		if visible && let Some(cb) = &self.callbacks.on_render_frame_pre {
			cb(surface, t.k);
		}
		RenderPipeline::new(&self.config, t.k, mode).paint(&self.graph, surface);
		if visible && let Some(cb) = &self.callbacks.on_render_frame_post {
			cb(surface, t.k);
		}
	}

	fn dispatch_hover(&self, changes: &[HoverChange]) {
		for change in changes {
			match change.kind {
				ObjectKind::Node => {
					if let Some(cb) = &self.callbacks.on_node_hover {
						cb(self.node_data(change.object), self.node_data(change.previous));
					}
				}
				ObjectKind::Link => {
					if let Some(cb) = &self.callbacks.on_link_hover {
						cb(self.link_data(change.object), self.link_data(change.previous));
					}
				}
			}
		}
	}

	fn node_data(&self, obj: Option<ObjectRef>) -> Option<&GraphNode> {
		match obj? {
			ObjectRef::Node(i) => self.graph.nodes.get(i).map(|n| &n.data),
			ObjectRef::Link(_) => None,
		}
	}

	fn link_data(&self, obj: Option<ObjectRef>) -> Option<&GraphLink> {
		match obj? {
			ObjectRef::Link(i) => self.graph.links.get(i).map(|l| &l.data),
			ObjectRef::Node(_) => None,
		}
	}

	/// The object under the pointer as of the last shadow sample.
	pub fn hovered(&self) -> Option<ObjectRef> {
		self.hit.hovered()
	}

	/// Label of the hovered object, if it has a non-empty one.
	pub fn tooltip(&self) -> Option<String> {
		let label = match self.hit.hovered()? {
			ObjectRef::Node(i) => self.config.node_label.resolve(self.graph.nodes.get(i)?),
			ObjectRef::Link(i) => self.config.link_label.resolve(self.graph.links.get(i)?),
		};
		label.filter(|l| !l.is_empty())
	}

	/// Pointer position in surface pixels; `None` once it left the canvas.
	pub fn set_pointer(&mut self, pointer: Option<Point>) {
		self.pointer = pointer;
	}

	/// Last pointer position in screen pixels, `None` once it left.
	pub fn pointer(&self) -> Option<Point> {
		self.pointer
	}

	/// Dispatch a click on whatever is hovered.
	pub fn click(&self) {
		match self.hit.hovered() {
			Some(ObjectRef::Node(i)) => {
				if let (Some(cb), Some(node)) = (&self.callbacks.on_node_click, self.graph.nodes.get(i)) {
					cb(&node.data);
				}
			}
			Some(ObjectRef::Link(i)) => {
				if let (Some(cb), Some(link)) = (&self.callbacks.on_link_click, self.graph.links.get(i)) {
					cb(&link.data);
				}
			}
			None => {
				if let Some(cb) = &self.callbacks.on_background_click {
					cb();
				}
			}
		}
	}

	/// Dispatch a secondary-button click on whatever is hovered. Returns
	/// whether a handler was registered for it, so the host can suppress
	/// its own context menu.
	pub fn right_click(&self) -> bool {
		match self.hit.hovered() {
			Some(ObjectRef::Node(i)) => match (&self.callbacks.on_node_right_click, self.graph.nodes.get(i)) {
				(Some(cb), Some(node)) => {
					cb(&node.data);
					true
				}
				_ => false,
			},
			Some(ObjectRef::Link(i)) => match (&self.callbacks.on_link_right_click, self.graph.links.get(i)) {
				(Some(cb), Some(link)) => {
					cb(&link.data);
					true
				}
				_ => false,
			},
			None => match &self.callbacks.on_background_right_click {
				Some(cb) => {
					cb();
					true
				}
				None => false,
			},
		}
	}

	/// Whether a node drag is in progress.
	pub fn is_dragging(&self) -> bool {
		self.drag.is_some()
	}

	/// Grab the hovered node. Returns whether a drag started.
	pub fn drag_start(&mut self) -> bool {
		if !self.config.enable_node_drag || !self.config.enable_pointer_interaction {
			return false;
		}
		let Some(ObjectRef::Node(i)) = self.hit.hovered() else {
			return false;
		};
		let Some(node) = self.graph.nodes.get_mut(i) else {
			return false;
		};
		self.drag = Some(DragState {
			node: i,
			was_pinned: node.fx.is_some() || node.fy.is_some(),
		});
		node.fx = Some(node.x);
		node.fy = Some(node.y);
		true
	}

	/// Move the dragged node under the pointer at `screen` and keep the
	/// engine warm.
	pub fn drag_to(&mut self, screen: Point, now_ms: f64) {
		let Some(drag) = self.drag else {
			return;
		};
		let p = self.screen_to_graph(screen);
		let Some(node) = self.graph.nodes.get_mut(drag.node) else {
			return;
		};
		node.fx = Some(p.x);
		node.fy = Some(p.y);
		node.x = p.x;
		node.y = p.y;
		self.engine.simulation_mut().alpha_target = DRAG_ALPHA_TARGET;
		self.engine.resume(now_ms);
		if let Some(cb) = &self.callbacks.on_node_drag {
			cb(&node.data);
		}
	}

	/// Drop the dragged node. Nodes pinned before the drag stay pinned
	/// where they were dropped.
	pub fn drag_end(&mut self) {
		let Some(drag) = self.drag.take() else {
			return;
		};
		self.engine.simulation_mut().alpha_target = 0.0;
		let Some(node) = self.graph.nodes.get_mut(drag.node) else {
			return;
		};
		if !drag.was_pinned {
			node.fx = None;
			node.fy = None;
		}
		if let Some(cb) = &self.callbacks.on_node_drag_end {
			cb(&node.data);
		}
	}

	/// Map a screen pixel to graph coordinates.
	pub fn screen_to_graph(&self, screen: Point) -> Point {
		let t = self.transform;
		Point::new((screen.x - t.x) / t.k, (screen.y - t.y) / t.k)
	}

	/// Inverse of [`ForceGraphState::screen_to_graph`].
	pub fn graph_to_screen(&self, p: Point) -> Point {
		let t = self.transform;
		Point::new(p.x * t.k + t.x, p.y * t.k + t.y)
	}

	fn notify_zoom(&self) {
		if let Some(cb) = &self.callbacks.on_zoom {
			cb(self.transform);
		}
	}

	fn notify_zoom_end(&self) {
		if let Some(cb) = &self.callbacks.on_zoom_end {
			cb(self.transform);
		}
	}

	/// Translate the view by a screen-pixel offset.
	pub fn pan_by(&mut self, dx: f64, dy: f64) {
		self.transform.x += dx;
		self.transform.y += dy;
		self.notify_zoom();
	}

	/// Scale by `factor` around the screen point `at`, within the configured
	/// zoom range.
	pub fn zoom_at(&mut self, at: Point, factor: f64) {
		let t = &mut self.transform;
		let k = (t.k * factor).clamp(self.config.min_zoom, self.config.max_zoom);
		let ratio = k / t.k;
		t.x = at.x - (at.x - t.x) * ratio;
		t.y = at.y - (at.y - t.y) * ratio;
		t.k = k;
		self.notify_zoom();
	}

	/// Begin a background pan at `screen`. Returns `false` when panning is
	/// disabled.
	pub fn pan_start(&mut self, screen: Point) -> bool {
		if !self.config.enable_pan_interaction {
			return false;
		}
		self.pan = Some(PanState {
			last: screen,
			moved: false,
		});
		true
	}

	/// Follow the pointer during a pan.
	pub fn pan_to(&mut self, screen: Point) {
		let Some(pan) = self.pan.as_mut() else {
			return;
		};
		let (dx, dy) = (screen.x - pan.last.x, screen.y - pan.last.y);
		pan.last = screen;
		pan.moved = true;
		self.pan_by(dx, dy);
	}

	/// Finish a pan, reporting the zoom end if the view moved.
	pub fn pan_end(&mut self) {
		if let Some(pan) = self.pan.take()
			&& pan.moved
		{
			self.notify_zoom_end();
		}
	}

	/// Whether a background pan is in progress.
	pub fn is_panning(&self) -> bool {
		self.pan.is_some()
	}

	/// One wheel step at `at`. Positive `delta_y` zooms out. The zoom end is
	/// reported by the first frame after the wheel has been quiet for a
	/// moment.
	pub fn wheel_zoom(&mut self, at: Point, delta_y: f64, now_ms: f64) {
		if !self.config.enable_zoom_interaction || delta_y == 0.0 {
			return;
		}
		// same response curve as d3-zoom's default wheel delta
		let factor = 2f64.powf(-delta_y * 0.002);
		self.zoom_at(at, factor);
		self.wheel_end_ms = Some(now_ms + WHEEL_END_DELAY_MS);
	}

	/// Put graph point `p` in the middle of the surface, keeping the scale.
	pub fn center_at(&mut self, p: Point) {
		let k = self.transform.k;
		self.transform.x = self.width / 2.0 - p.x * k;
		self.transform.y = self.height / 2.0 - p.y * k;
		self.notify_zoom();
		self.notify_zoom_end();
	}

	/// Bounds of the visible nodes, `None` when there are none.
	pub fn graph_bbox(&self) -> Option<BoundingBox> {
		self.graph
			.nodes
			.iter()
			.filter(|n| n.x.is_finite() && n.y.is_finite())
			.filter(|n| self.config.node_visibility.resolve_or(n, true))
			.fold(None, |bbox: Option<BoundingBox>, n| {
				let p = Point::new(n.x, n.y);
				Some(match bbox {
					None => BoundingBox { min: p, max: p },
					Some(b) => BoundingBox {
						min: Point::new(b.min.x.min(p.x), b.min.y.min(p.y)),
						max: Point::new(b.max.x.max(p.x), b.max.y.max(p.y)),
					},
				})
			})
	}

	/// Center the visible nodes and scale them to fill the view, leaving
	/// `padding` screen pixels on each side.
	pub fn zoom_to_fit(&mut self, padding: f64) {
		let Some(bbox) = self.graph_bbox() else {
			return;
		};
		let (w, h) = (bbox.max.x - bbox.min.x, bbox.max.y - bbox.min.y);
		let fit = [
			(w > 0.0).then(|| (self.width - 2.0 * padding) / w),
			(h > 0.0).then(|| (self.height - 2.0 * padding) / h),
		];
		let k = match fit.into_iter().flatten().reduce(f64::min) {
			Some(k) if k > 0.0 => k.clamp(self.config.min_zoom, self.config.max_zoom),
			_ => self.transform.k,
		};
		self.transform.k = k;
		self.center_at(bbox.center());
	}

	/// `false` while paused.
	pub fn is_animating(&self) -> bool {
		self.animation_running
	}

	/// Freeze ticking, painting and hit-testing. Graph state is kept.
	pub fn pause_animation(&mut self) {
		self.animation_running = false;
	}

	/// Restart frames after [`ForceGraphState::pause_animation`].
	pub fn resume_animation(&mut self) {
		self.animation_running = true;
	}

	/// Restart the layout at full heat.
	pub fn d3_reheat_simulation(&mut self, now_ms: f64) {
		self.engine.reheat(now_ms);
	}

	/// Look up a named force, e.g. `"charge"`.
	pub fn d3_force(&self, name: &str) -> Option<&dyn Force> {
		self.engine.force(name)
	}

	/// Install, replace or remove (`None`) a named force.
	pub fn set_d3_force(&mut self, name: &str, force: Option<Box<dyn Force>>) -> Option<Box<dyn Force>> {
		self.engine.set_force(name, force)
	}

	/// Send a single particle down link `link`. Returns `false` for an
	/// unknown link.
	pub fn emit_particle(&mut self, link: usize) -> bool {
		match self.graph.links.get_mut(link) {
			Some(l) => {
				render::emit_particle(l);
				true
			}
			None => false,
		}
	}

	/// Rebuild looping particles after the particle count changed.
	pub fn refresh_particles(&mut self) {
		render::refresh_particles(&mut self.graph, &self.config);
	}
}

/// Whether switching from `old` to `new` changes the DAG layout.
fn dag_inputs_differ(old: &ForceGraphConfig, new: &ForceGraphConfig) -> bool {
	let filter_changed = match (&old.dag_node_filter, &new.dag_node_filter) {
		(None, None) => false,
		(Some(a), Some(b)) => !Rc::ptr_eq(a, b),
		_ => true,
	};
	old.dag_mode != new.dag_mode || old.dag_level_distance != new.dag_level_distance || filter_changed
}

/// Give uncolored objects a palette color keyed by the configured
/// accessor. Keys get colors in order of first appearance.
fn auto_color(graph: &mut Graph, config: &ForceGraphConfig) {
	let mut scale: HashMap<String, usize> = HashMap::new();
	let mut color_for = |key: String| {
		let next = scale.len();
		AUTO_COLORS[*scale.entry(key).or_insert(next) % AUTO_COLORS.len()].to_string()
	};
	if let Some(by) = &config.node_auto_color_by {
		for node in &mut graph.nodes {
			if node.data.color.is_none()
				&& let Some(key) = by.resolve(node)
			{
				node.data.color = Some(color_for(key));
			}
		}
	}
	if let Some(by) = &config.link_auto_color_by {
		for link in &mut graph.links {
			if link.data.color.is_none()
				&& let Some(key) = by.resolve(link)
			{
				link.data.color = Some(color_for(key));
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;
	use std::time::Duration;

	use pretty_assertions::assert_eq;

	use super::*;
	use crate::components::force_graph::config::{DagMode, NodeAccessor};
	use crate::components::force_graph::engine::EngineState;
	use crate::components::force_graph::surface::{DrawOp, RecordingSurface};

	fn data(nodes: &[&str], links: &[(&str, &str)]) -> GraphData {
		GraphData {
			nodes: nodes.iter().map(|id| GraphNode::new(*id)).collect(),
			links: links.iter().map(|(s, t)| GraphLink::new(*s, *t)).collect(),
		}
	}

	fn state(config: ForceGraphConfig) -> ForceGraphState {
		ForceGraphState::new(config, 100.0, 100.0).unwrap()
	}

	/// Paint `obj`'s registry color under the pointer at (10, 10).
	fn hover(state: &ForceGraphState, shadow: &mut RecordingSurface, obj: Option<ObjectRef>) {
		let rgb = match obj {
			Some(ObjectRef::Node(i)) => state.graph().nodes[i].index_color(),
			Some(ObjectRef::Link(i)) => state.graph().links[i].index_color(),
			None => None,
		};
		let [r, g, b] = rgb.map(|c| [c.r, c.g, c.b]).unwrap_or([0, 0, 0]);
		shadow.set_pixel(10, 10, [r, g, b, 255]);
	}

	fn frame(state: &mut ForceGraphState, now: f64, shadow: &mut RecordingSurface) -> RecordingSurface {
		let mut visible = RecordingSurface::new(100.0, 100.0);
		state.frame(now, &mut visible, Some(shadow));
		visible
	}

	#[test]
	fn rejects_invalid_config() {
		let err = ForceGraphState::new(ForceGraphConfig::default().node_rel_size(-1.0), 1.0, 1.0);
		assert!(matches!(err, Err(GraphError::Config(_))));
	}

	#[test]
	fn load_registers_every_object() {
		let mut s = state(ForceGraphConfig::default());
		s.set_graph_data(data(&["a", "b"], &[("a", "b")]), 0.0).unwrap();
		let colors: Vec<_> = s
			.graph()
			.nodes
			.iter()
			.map(|n| n.index_color())
			.chain(s.graph().links.iter().map(|l| l.index_color()))
			.collect();
		assert!(colors.iter().all(Option::is_some));
		assert_eq!(s.registry.lookup(colors[2].unwrap()), Some(&ObjectRef::Link(0)));
	}

	#[test]
	fn failed_load_keeps_previous_graph() {
		let mut s = state(ForceGraphConfig::default().dag_mode(Some(DagMode::Td)));
		s.set_graph_data(data(&["a", "b"], &[("a", "b")]), 0.0).unwrap();

		let err = s.set_graph_data(data(&["x"], &[("x", "ghost")]), 0.0).unwrap_err();
		assert!(matches!(err, GraphError::MissingTarget { .. }));
		let err = s
			.set_graph_data(data(&["x", "y"], &[("x", "y"), ("y", "x")]), 0.0)
			.unwrap_err();
		assert!(matches!(err, GraphError::Dag(_)));

		assert_eq!(s.graph().nodes.len(), 2);
		assert_eq!(s.graph().nodes[0].id(), "a");
	}

	#[test]
	fn auto_color_fills_only_missing_colors() {
		let mut input = data(&["a", "b", "c"], &[]);
		input.nodes[0].group = Some(1);
		input.nodes[1].group = Some(2);
		input.nodes[2].group = Some(1);
		input.nodes[2].color = Some("black".into());
		let mut s = state(ForceGraphConfig::default().node_auto_color_by(NodeAccessor::field("group")));
		s.set_graph_data(input, 0.0).unwrap();
		let colors: Vec<_> = s.graph().nodes.iter().map(|n| n.data.color.clone()).collect();
		assert_eq!(
			colors,
			vec![
				Some(AUTO_COLORS[0].to_string()),
				Some(AUTO_COLORS[1].to_string()),
				Some("black".to_string())
			]
		);
	}

	#[test]
	fn frame_ticks_and_reports_engine_stop_once() {
		let ticks = Rc::new(RefCell::new((0, 0)));
		let mut s = state(ForceGraphConfig::default().cooldown_ticks(Some(2)));
		let (t, st) = (ticks.clone(), ticks.clone());
		s.callbacks.on_engine_tick = Some(Rc::new(move || t.borrow_mut().0 += 1));
		s.callbacks.on_engine_stop = Some(Rc::new(move || st.borrow_mut().1 += 1));
		s.set_graph_data(data(&["a", "b"], &[("a", "b")]), 0.0).unwrap();

		let mut shadow = RecordingSurface::new(100.0, 100.0);
		for i in 0..5 {
			frame(&mut s, i as f64, &mut shadow);
		}
		assert_eq!(*ticks.borrow(), (2, 1));
	}

	#[test]
	fn frame_paints_with_view_transform_and_hooks() {
		let mut s = state(ForceGraphConfig::default().background_color("white"));
		s.callbacks.on_render_frame_pre = Some(Rc::new(|surface: &mut dyn DrawSurface, _: f64| surface.set_fill("pre")));
		s.callbacks.on_render_frame_post = Some(Rc::new(|surface: &mut dyn DrawSurface, _: f64| surface.set_fill("post")));
		s.set_graph_data(data(&["a"], &[]), 0.0).unwrap();
		let mut shadow = RecordingSurface::new(100.0, 100.0);
		let visible = frame(&mut s, 0.0, &mut shadow);

		assert_eq!(
			visible.ops[..4].to_vec(),
			vec![
				DrawOp::Clear,
				DrawOp::FillBackground("white".into()),
				DrawOp::SetTransform(1.0, 50.0, 50.0),
				DrawOp::SetFill("pre".into()),
			]
		);
		assert_eq!(visible.ops.last(), Some(&DrawOp::SetFill("post".into())));
		assert!(!shadow.ops.contains(&DrawOp::FillBackground("white".into())));
		assert!(!shadow.ops.contains(&DrawOp::SetFill("pre".into())));
	}

	#[test]
	fn shadow_repaint_is_throttled() {
		let mut s = state(ForceGraphConfig::default().hover_throttle(Duration::from_millis(100)));
		s.set_graph_data(data(&["a"], &[]), 0.0).unwrap();
		let mut shadow = RecordingSurface::new(100.0, 100.0);
		let clears = |shadow: &RecordingSurface| shadow.count(|op| *op == DrawOp::Clear);

		frame(&mut s, 0.0, &mut shadow);
		frame(&mut s, 50.0, &mut shadow);
		assert_eq!(clears(&shadow), 1);
		frame(&mut s, 100.0, &mut shadow);
		assert_eq!(clears(&shadow), 2);
	}

	#[test]
	fn hover_callbacks_receive_user_data() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let mut s = state(ForceGraphConfig::default());
		let (nl, ll) = (log.clone(), log.clone());
		s.callbacks.on_node_hover = Some(Rc::new(move |cur: Option<&GraphNode>, prev: Option<&GraphNode>| {
			nl.borrow_mut()
				.push(format!("node {:?} {:?}", cur.map(|n| &n.id), prev.map(|n| &n.id)))
		}));
		s.callbacks.on_link_hover = Some(Rc::new(move |cur: Option<&GraphLink>, prev: Option<&GraphLink>| {
			ll.borrow_mut().push(format!(
				"link {:?} {:?}",
				cur.map(|l| &l.source),
				prev.map(|l| &l.source)
			))
		}));
		s.set_graph_data(data(&["a", "b"], &[("a", "b")]), 0.0).unwrap();
		s.set_pointer(Some(Point::new(10.0, 10.0)));
		let mut shadow = RecordingSurface::new(100.0, 100.0);

		for (now, obj) in [
			(0.0, Some(ObjectRef::Node(0))),
			(1.0, Some(ObjectRef::Node(1))),
			(2.0, Some(ObjectRef::Link(0))),
			(3.0, None),
		] {
			hover(&s, &mut shadow, obj);
			frame(&mut s, now, &mut shadow);
		}
		assert_eq!(
			*log.borrow(),
			vec![
				r#"node Some("a") None"#,
				r#"node Some("b") Some("a")"#,
				r#"node None Some("b")"#,
				r#"link Some("a") None"#,
				r#"link None Some("a")"#,
			]
		);
	}

	#[test]
	fn tooltip_and_click_follow_hover() {
		let clicked = Rc::new(RefCell::new(Vec::new()));
		let mut input = data(&["a"], &[]);
		input.nodes[0].label = Some("Alpha".into());
		let mut s = state(ForceGraphConfig::default());
		let (c1, c2) = (clicked.clone(), clicked.clone());
		s.callbacks.on_node_click = Some(Rc::new(move |n: &GraphNode| c1.borrow_mut().push(n.id.clone())));
		s.callbacks.on_background_click = Some(Rc::new(move || c2.borrow_mut().push("bg".into())));
		s.set_graph_data(input, 0.0).unwrap();
		s.set_pointer(Some(Point::new(10.0, 10.0)));
		let mut shadow = RecordingSurface::new(100.0, 100.0);

		s.click();
		hover(&s, &mut shadow, Some(ObjectRef::Node(0)));
		frame(&mut s, 0.0, &mut shadow);
		assert_eq!(s.tooltip(), Some("Alpha".to_string()));
		s.click();
		assert_eq!(*clicked.borrow(), vec!["bg".to_string(), "a".to_string()]);
	}

	#[test]
	fn drag_pins_then_releases() {
		let mut s = state(ForceGraphConfig::default());
		s.set_graph_data(data(&["a", "b"], &[("a", "b")]), 0.0).unwrap();
		s.set_pointer(Some(Point::new(10.0, 10.0)));
		let mut shadow = RecordingSurface::new(100.0, 100.0);
		hover(&s, &mut shadow, Some(ObjectRef::Node(1)));
		frame(&mut s, 0.0, &mut shadow);

		assert!(s.drag_start());
		s.drag_to(Point::new(60.0, 70.0), 1.0);
		let node = &s.graph().nodes[1];
		assert_eq!((node.fx, node.fy), (Some(10.0), Some(20.0)));
		assert_eq!(s.engine().simulation().alpha_target, DRAG_ALPHA_TARGET);

		// hovering something else mid-drag changes nothing
		hover(&s, &mut shadow, Some(ObjectRef::Node(0)));
		frame(&mut s, 2.0, &mut shadow);
		assert_eq!(s.hovered(), Some(ObjectRef::Node(1)));

		s.drag_end();
		let node = &s.graph().nodes[1];
		assert_eq!((node.fx, node.fy), (None, None));
		assert_eq!(s.engine().simulation().alpha_target, 0.0);
		assert!(!s.is_dragging());
	}

	#[test]
	fn drag_needs_a_hovered_node_and_drag_enabled() {
		let mut s = state(ForceGraphConfig::default());
		s.set_graph_data(data(&["a"], &[]), 0.0).unwrap();
		assert!(!s.drag_start());

		let mut s = state(ForceGraphConfig::default().enable_node_drag(false));
		s.set_graph_data(data(&["a"], &[]), 0.0).unwrap();
		s.set_pointer(Some(Point::new(10.0, 10.0)));
		let mut shadow = RecordingSurface::new(100.0, 100.0);
		hover(&s, &mut shadow, Some(ObjectRef::Node(0)));
		frame(&mut s, 0.0, &mut shadow);
		assert!(!s.drag_start());
	}

	#[test]
	fn paused_frames_do_nothing() {
		let mut s = state(ForceGraphConfig::default());
		s.set_graph_data(data(&["a", "b"], &[("a", "b")]), 0.0).unwrap();
		let before = s.graph_data();
		s.pause_animation();
		s.pause_animation();
		let mut shadow = RecordingSurface::new(100.0, 100.0);
		let visible = frame(&mut s, 1.0, &mut shadow);
		assert!(visible.ops.is_empty() && shadow.ops.is_empty());
		assert_eq!(s.graph_data(), before);

		s.resume_animation();
		assert!(!frame(&mut s, 2.0, &mut shadow).ops.is_empty());
	}

	#[test]
	fn view_transform_round_trips_points() {
		let mut s = state(ForceGraphConfig::default());
		s.zoom_at(Point::new(20.0, 30.0), 2.0);
		s.pan_by(5.0, -5.0);
		let p = Point::new(3.0, -7.0);
		let back = s.screen_to_graph(s.graph_to_screen(p));
		assert!((back.x - p.x).abs() < 1e-9 && (back.y - p.y).abs() < 1e-9);
		// the zoom anchor stays put
		let mut s = state(ForceGraphConfig::default());
		let anchor = Point::new(20.0, 30.0);
		let before = s.screen_to_graph(anchor);
		s.zoom_at(anchor, 4.0);
		assert_eq!(s.screen_to_graph(anchor), before);
	}

	#[test]
	fn zoom_to_fit_frames_the_nodes() {
		let mut input = data(&["a", "b"], &[]);
		(input.nodes[0].x, input.nodes[0].y) = (Some(-10.0), Some(0.0));
		(input.nodes[1].x, input.nodes[1].y) = (Some(30.0), Some(10.0));
		let mut s = state(ForceGraphConfig::default());
		s.set_graph_data(input, 0.0).unwrap();

		let bbox = s.graph_bbox().unwrap();
		assert_eq!(bbox.min, Point::new(-10.0, 0.0));
		assert_eq!(bbox.max, Point::new(30.0, 10.0));

		s.zoom_to_fit(10.0);
		assert_eq!(s.transform().k, 2.0);
		assert_eq!(s.graph_to_screen(Point::new(-10.0, 0.0)), Point::new(10.0, 40.0));
		assert_eq!(s.graph_to_screen(Point::new(30.0, 10.0)), Point::new(90.0, 60.0));
	}

	#[test]
	fn set_config_reapplies_dag_and_particles() {
		let mut s = state(ForceGraphConfig::default());
		s.set_graph_data(data(&["a", "b"], &[("a", "b")]), 0.0).unwrap();
		s.set_config(
			ForceGraphConfig::default()
				.dag_mode(Some(DagMode::Td))
				.link_directional_particles(3.0),
			0.0,
		)
		.unwrap();
		assert!(s.graph().nodes.iter().all(|n| n.fy.is_some()));
		assert_eq!(s.graph().links[0].photons.len(), 3);

		assert!(
			s.set_config(ForceGraphConfig::default().d3_alpha_decay(2.0), 0.0)
				.is_err()
		);
		assert_eq!(s.config().dag_mode, Some(DagMode::Td));
	}

	#[test]
	fn dag_change_after_settling_reheats_and_moves_nodes() {
		let config = ForceGraphConfig::default().cooldown_ticks(Some(5));
		let mut s = state(config.clone());
		s.set_graph_data(data(&["a", "b", "c"], &[("a", "b"), ("b", "c")]), 0.0).unwrap();
		let mut shadow = RecordingSurface::new(100.0, 100.0);
		for i in 0..10 {
			frame(&mut s, i as f64, &mut shadow);
		}
		assert_eq!(s.engine().state(), EngineState::Stopped);

		// unrelated changes leave a settled engine alone
		s.set_config(config.clone().link_width(2.0), 10.0).unwrap();
		assert_eq!(s.engine().state(), EngineState::Stopped);

		let dag = config.dag_mode(Some(DagMode::Td)).dag_level_distance(50.0);
		s.set_config(dag, 11.0).unwrap();
		assert_eq!(s.engine().state(), EngineState::Running);
		frame(&mut s, 12.0, &mut shadow);
		let ys: Vec<_> = s.graph().nodes.iter().map(|n| n.y).collect();
		assert_eq!(ys, vec![-50.0, 0.0, 50.0]);
	}

	#[test]
	fn zoom_range_comes_from_config() {
		let mut s = state(ForceGraphConfig::default().zoom_range(0.5, 2.0));
		for _ in 0..20 {
			s.zoom_at(Point::new(50.0, 50.0), 1.5);
		}
		assert_eq!(s.transform().k, 2.0);
		for _ in 0..20 {
			s.zoom_at(Point::new(50.0, 50.0), 0.5);
		}
		assert_eq!(s.transform().k, 0.5);

		// narrowing the range pulls the current scale inside it
		s.set_config(ForceGraphConfig::default().zoom_range(1.0, 3.0), 0.0)
			.unwrap();
		assert_eq!(s.transform().k, 1.0);
	}

	#[test]
	fn pan_gesture_reports_zoom_and_end() {
		let events = Rc::new(RefCell::new(Vec::new()));
		let mut s = state(ForceGraphConfig::default());
		let (z, ze) = (events.clone(), events.clone());
		s.callbacks.on_zoom = Some(Rc::new(move |t: ViewTransform| z.borrow_mut().push(("zoom", t.x, t.y))));
		s.callbacks.on_zoom_end = Some(Rc::new(move |t: ViewTransform| ze.borrow_mut().push(("end", t.x, t.y))));

		assert!(s.pan_start(Point::new(10.0, 10.0)));
		s.pan_to(Point::new(15.0, 10.0));
		s.pan_to(Point::new(15.0, 20.0));
		s.pan_end();
		assert!(!s.is_panning());
		assert_eq!(
			*events.borrow(),
			vec![("zoom", 55.0, 50.0), ("zoom", 55.0, 60.0), ("end", 55.0, 60.0)]
		);

		// a press without movement is not a pan
		events.borrow_mut().clear();
		s.pan_start(Point::new(0.0, 0.0));
		s.pan_end();
		assert!(events.borrow().is_empty());

		let mut s = state(ForceGraphConfig::default().enable_pan_interaction(false));
		assert!(!s.pan_start(Point::new(10.0, 10.0)));
		s.pan_to(Point::new(40.0, 40.0));
		assert_eq!(s.transform(), ViewTransform { x: 50.0, y: 50.0, k: 1.0 });
	}

	#[test]
	fn wheel_zoom_ends_after_a_quiet_frame() {
		let ends = Rc::new(RefCell::new(0));
		let mut s = state(ForceGraphConfig::default());
		let e = ends.clone();
		s.callbacks.on_zoom_end = Some(Rc::new(move |_: ViewTransform| *e.borrow_mut() += 1));
		let mut shadow = RecordingSurface::new(100.0, 100.0);

		s.wheel_zoom(Point::new(50.0, 50.0), -500.0, 0.0);
		assert_eq!(s.transform().k, 2.0);
		frame(&mut s, 100.0, &mut shadow);
		assert_eq!(*ends.borrow(), 0);
		frame(&mut s, 150.0, &mut shadow);
		frame(&mut s, 300.0, &mut shadow);
		assert_eq!(*ends.borrow(), 1);

		let mut s = state(ForceGraphConfig::default().enable_zoom_interaction(false));
		s.wheel_zoom(Point::new(50.0, 50.0), -500.0, 0.0);
		assert_eq!(s.transform().k, 1.0);
	}

	#[test]
	fn programmatic_view_changes_report_start_and_end() {
		let events = Rc::new(RefCell::new(Vec::new()));
		let mut input = data(&["a", "b"], &[]);
		(input.nodes[0].x, input.nodes[0].y) = (Some(0.0), Some(0.0));
		(input.nodes[1].x, input.nodes[1].y) = (Some(20.0), Some(20.0));
		let mut s = state(ForceGraphConfig::default());
		let (z, ze) = (events.clone(), events.clone());
		s.callbacks.on_zoom = Some(Rc::new(move |_: ViewTransform| z.borrow_mut().push("zoom")));
		s.callbacks.on_zoom_end = Some(Rc::new(move |_: ViewTransform| ze.borrow_mut().push("end")));
		s.set_graph_data(input, 0.0).unwrap();

		s.center_at(Point::new(20.0, 20.0));
		assert_eq!(s.graph_to_screen(Point::new(20.0, 20.0)), Point::new(50.0, 50.0));
		s.zoom_to_fit(0.0);
		assert_eq!(s.transform().k, 5.0);
		assert_eq!(*events.borrow(), vec!["zoom", "end", "zoom", "end"]);
	}

	#[test]
	fn right_click_follows_hover() {
		let clicked = Rc::new(RefCell::new(Vec::new()));
		let mut s = state(ForceGraphConfig::default());
		s.set_graph_data(data(&["a", "b"], &[("a", "b")]), 0.0).unwrap();
		assert!(!s.right_click());

		let (c1, c2, c3) = (clicked.clone(), clicked.clone(), clicked.clone());
		s.callbacks.on_node_right_click = Some(Rc::new(move |n: &GraphNode| c1.borrow_mut().push(n.id.clone())));
		s.callbacks.on_link_right_click =
			Some(Rc::new(move |l: &GraphLink| c2.borrow_mut().push(format!("{}-{}", l.source, l.target))));
		s.callbacks.on_background_right_click = Some(Rc::new(move || c3.borrow_mut().push("bg".into())));
		s.set_pointer(Some(Point::new(10.0, 10.0)));
		let mut shadow = RecordingSurface::new(100.0, 100.0);

		assert!(s.right_click());
		for (now, obj) in [(0.0, ObjectRef::Node(1)), (1.0, ObjectRef::Link(0))] {
			hover(&s, &mut shadow, Some(obj));
			frame(&mut s, now, &mut shadow);
			assert!(s.right_click());
		}
		assert_eq!(*clicked.borrow(), vec!["bg".to_string(), "b".to_string(), "a-b".to_string()]);
	}

	#[test]
	fn first_frame_after_reload_ignores_stale_shadow() {
		let hovered = Rc::new(RefCell::new(Vec::new()));
		let mut s = state(ForceGraphConfig::default());
		let h = hovered.clone();
		s.callbacks.on_node_hover = Some(Rc::new(move |cur: Option<&GraphNode>, _: Option<&GraphNode>| {
			h.borrow_mut().push(cur.map(|n| n.id.clone()))
		}));
		s.set_graph_data(data(&["a", "b"], &[]), 0.0).unwrap();
		s.set_pointer(Some(Point::new(10.0, 10.0)));
		let mut shadow = RecordingSurface::new(100.0, 100.0).wiping_on_clear();

		frame(&mut s, 0.0, &mut shadow);
		hover(&s, &mut shadow, Some(ObjectRef::Node(1)));
		frame(&mut s, 1.0, &mut shadow);
		assert_eq!(s.hovered(), Some(ObjectRef::Node(1)));

		// same registry color now belongs to "y", but nothing painted it yet
		s.set_graph_data(data(&["x", "y"], &[]), 2.0).unwrap();
		frame(&mut s, 3.0, &mut shadow);
		assert_eq!(s.hovered(), None);
		assert_eq!(*hovered.borrow(), vec![Some("b".to_string())]);
	}

	#[test]
	fn looping_particle_returns_after_one_period() {
		let mut s = state(
			ForceGraphConfig::default()
				.link_directional_particles(1.0)
				.link_directional_particle_speed(0.25),
		);
		s.set_graph_data(data(&["a", "b"], &[("a", "b")]), 0.0).unwrap();
		let mut shadow = RecordingSurface::new(100.0, 100.0);
		let ratio = |s: &ForceGraphState| s.graph().links[0].photons[0].progress_ratio;

		assert_eq!(ratio(&s), 0.0);
		frame(&mut s, 0.0, &mut shadow);
		frame(&mut s, 1.0, &mut shadow);
		assert!((ratio(&s) - 0.5).abs() < 1e-12);
		frame(&mut s, 2.0, &mut shadow);
		frame(&mut s, 3.0, &mut shadow);
		assert!(ratio(&s).abs() < 1e-12);
		assert_eq!(s.graph().links[0].photons.len(), 1);
	}

	#[test]
	fn emitted_particles_travel_once() {
		let mut s = state(ForceGraphConfig::default().link_directional_particle_speed(0.5));
		s.set_graph_data(data(&["a", "b"], &[("a", "b")]), 0.0).unwrap();
		assert!(s.emit_particle(0));
		assert!(!s.emit_particle(7));
		let mut shadow = RecordingSurface::new(100.0, 100.0);
		frame(&mut s, 0.0, &mut shadow);
		frame(&mut s, 1.0, &mut shadow);
		assert_eq!(s.graph().links[0].photons.len(), 1);
		frame(&mut s, 2.0, &mut shadow);
		assert!(s.graph().links[0].photons.is_empty());
	}

	#[test]
	fn custom_forces_can_be_swapped() {
		let mut s = state(ForceGraphConfig::default());
		assert!(s.d3_force("charge").is_some());
		assert!(s.set_d3_force("charge", None).is_some());
		assert!(s.d3_force("charge").is_none());
		assert!(s.d3_force("link").is_some());
	}
}
