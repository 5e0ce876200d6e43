//! Per-instance configuration, validated once and passed by reference.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::accessor::Accessor;
use super::color_registry::Rgb;
use super::error::ConfigError;
use super::surface::DrawSurface;
use super::types::{Graph, Link, Node};

/// Per-node value source.
pub type NodeAccessor<T> = Accessor<Node, T>;
/// Per-link value source.
pub type LinkAccessor<T> = Accessor<Link, T>;

/// Custom node painter: `(node, surface, global_scale)`.
pub type NodePaintFn = Rc<dyn Fn(&Node, &mut dyn DrawSurface, f64)>;
/// Custom link painter: `(link, graph, surface, global_scale)`.
pub type LinkPaintFn = Rc<dyn Fn(&Link, &Graph, &mut dyn DrawSurface, f64)>;
/// Custom shadow-canvas painter, given the object's registry color.
pub type NodeAreaPaintFn = Rc<dyn Fn(&Node, Rgb, &mut dyn DrawSurface, f64)>;
/// Link counterpart of [`NodeAreaPaintFn`].
pub type LinkAreaPaintFn = Rc<dyn Fn(&Link, &Graph, Rgb, &mut dyn DrawSurface, f64)>;
/// Receives each cycle found while layering, as a closed id path.
pub type DagErrorFn = Rc<dyn Fn(&[String])>;

/// Layout constraint applied from topological depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DagMode {
	/// Top-down.
	Td,
	/// Bottom-up.
	Bu,
	/// Left-to-right.
	Lr,
	/// Right-to-left.
	Rl,
	/// Rings that shrink with depth, leaves at the center.
	RadialIn,
	/// Rings that grow with depth, roots at the center.
	RadialOut,
}

impl DagMode {
	/// Whether depth drives a radius rather than a pinned axis.
	pub fn is_radial(self) -> bool {
		matches!(self, DagMode::RadialIn | DagMode::RadialOut)
	}

	/// Parse a mode where `"none"` or an empty string turns DAG layout off.
	pub fn parse_optional(s: &str) -> Result<Option<Self>, String> {
		match s {
			"" | "none" => Ok(None),
			other => other.parse().map(Some),
		}
	}
}

impl FromStr for DagMode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"td" => Ok(DagMode::Td),
			"bu" => Ok(DagMode::Bu),
			"lr" => Ok(DagMode::Lr),
			"rl" => Ok(DagMode::Rl),
			"radialin" => Ok(DagMode::RadialIn),
			"radialout" => Ok(DagMode::RadialOut),
			other => Err(format!("unknown dag mode: {other}")),
		}
	}
}

/// How a custom paint hook combines with the default painting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanvasObjectMode {
	/// Only the hook paints.
	#[default]
	Replace,
	/// The hook paints under the default.
	Before,
	/// The hook paints over the default.
	After,
}

impl FromStr for CanvasObjectMode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"replace" => Ok(CanvasObjectMode::Replace),
			"before" => Ok(CanvasObjectMode::Before),
			"after" => Ok(CanvasObjectMode::After),
			other => Err(format!("unknown canvas object mode: {other}")),
		}
	}
}

/// Everything that shapes one graph: painting, layout, DAG mode and
/// interaction. Build it with the consuming setters below and check it with
/// [`ForceGraphConfig::validate`].
#[derive(Clone)]
pub struct ForceGraphConfig {
	/// CSS color painted under the graph. Transparent when unset.
	pub background_color: Option<String>,

	/// Radius per unit of `sqrt(val)`.
	pub node_rel_size: f64,
	/// Node size value. The painted radius is `sqrt(val) * node_rel_size`.
	pub node_val: NodeAccessor<f64>,
	/// Node fill. Unset values fall back to auto color, then the default.
	pub node_color: NodeAccessor<String>,
	/// Group key for palette colors on nodes without an explicit color.
	pub node_auto_color_by: Option<NodeAccessor<String>>,
	/// Tooltip text while hovered.
	pub node_label: NodeAccessor<String>,
	/// Hidden nodes are neither painted nor hit, and hide their links.
	pub node_visibility: NodeAccessor<bool>,
	/// Custom painter for nodes.
	pub node_canvas_object: Option<NodePaintFn>,
	/// Where `node_canvas_object` runs relative to the default circle.
	pub node_canvas_object_mode: NodeAccessor<CanvasObjectMode>,
	/// Custom hit area, painted in the node's registry color.
	pub node_pointer_area_paint: Option<NodeAreaPaintFn>,

	/// Link stroke. Unset values fall back to auto color, then the default.
	pub link_color: LinkAccessor<String>,
	/// Group key for palette colors on links without an explicit color.
	pub link_auto_color_by: Option<LinkAccessor<String>>,
	/// Tooltip text while hovered.
	pub link_label: LinkAccessor<String>,
	/// Hidden links are neither painted nor hit.
	pub link_visibility: LinkAccessor<bool>,
	/// Stroke width in graph units.
	pub link_width: LinkAccessor<f64>,
	/// Dash pattern. Solid when unset or empty.
	pub link_line_dash: LinkAccessor<Vec<f64>>,
	/// Bend as a fraction of the link length. Self-loops use it as loop size.
	pub link_curvature: LinkAccessor<f64>,
	/// Custom painter for links.
	pub link_canvas_object: Option<LinkPaintFn>,
	/// Where `link_canvas_object` runs relative to the default stroke.
	pub link_canvas_object_mode: LinkAccessor<CanvasObjectMode>,
	/// Custom hit area, painted in the link's registry color.
	pub link_pointer_area_paint: Option<LinkAreaPaintFn>,
	/// Arrow head length. No arrow at 0.
	pub link_directional_arrow_length: LinkAccessor<f64>,
	/// Arrow position along the link, from 0 at the source to 1 at the target.
	pub link_directional_arrow_rel_pos: LinkAccessor<f64>,
	/// Falls back to `link_color` when unset.
	pub link_directional_arrow_color: Option<LinkAccessor<String>>,
	/// Particles kept moving along each link.
	pub link_directional_particles: LinkAccessor<f64>,
	/// Progress per tick, as a fraction of the link length.
	pub link_directional_particle_speed: LinkAccessor<f64>,
	/// Particle diameter.
	pub link_directional_particle_width: LinkAccessor<f64>,
	/// Falls back to `link_color` when unset.
	pub link_directional_particle_color: Option<LinkAccessor<String>>,
	/// Extra shadow-canvas stroke width for links.
	pub link_hover_precision: f64,

	/// Depth-driven layout. `None` lays the graph out freely.
	pub dag_mode: Option<DagMode>,
	/// Auto-derived from node count and depth when unset.
	pub dag_level_distance: Option<f64>,
	/// Nodes rejected here are left out of depth computation and pinning.
	pub dag_node_filter: Option<Rc<dyn Fn(&Node) -> bool>>,
	/// Cycle handler. Cycles are fatal to the layout when unset.
	pub on_dag_error: Option<DagErrorFn>,

	/// The layout stops once alpha falls below this.
	pub d3_alpha_min: f64,
	/// Fraction of the remaining alpha lost per tick.
	pub d3_alpha_decay: f64,
	/// Fraction of velocity lost per tick.
	pub d3_velocity_decay: f64,
	/// Ticks run synchronously at load, before the first paint.
	pub warmup_ticks: usize,
	/// `None` never stops on tick count.
	pub cooldown_ticks: Option<usize>,
	/// Wall time after which the layout stops.
	pub cooldown_time: Duration,

	/// Hover, click and tooltips. Turning it off also skips shadow painting.
	pub enable_pointer_interaction: bool,
	/// Dragging nodes.
	pub enable_node_drag: bool,
	/// Wheel zooming.
	pub enable_zoom_interaction: bool,
	/// Dragging the background to pan.
	pub enable_pan_interaction: bool,
	/// Smallest view scale.
	pub min_zoom: f64,
	/// Largest view scale.
	pub max_zoom: f64,
	/// Minimum delay between shadow canvas repaints.
	pub hover_throttle: Duration,
}

impl Default for ForceGraphConfig {
	fn default() -> Self {
		Self {
			background_color: None,

			node_rel_size: 4.0,
			node_val: Accessor::field("val"),
			node_color: Accessor::field("color"),
			node_auto_color_by: None,
			node_label: Accessor::field("label"),
			node_visibility: Accessor::Constant(true),
			node_canvas_object: None,
			node_canvas_object_mode: Accessor::Constant(CanvasObjectMode::Replace),
			node_pointer_area_paint: None,

			link_color: Accessor::field("color"),
			link_auto_color_by: None,
			link_label: Accessor::field("label"),
			link_visibility: Accessor::Constant(true),
			link_width: Accessor::Constant(1.0),
			link_line_dash: Accessor::field("dash"),
			link_curvature: Accessor::Constant(0.0),
			link_canvas_object: None,
			link_canvas_object_mode: Accessor::Constant(CanvasObjectMode::Replace),
			link_pointer_area_paint: None,
			link_directional_arrow_length: Accessor::Constant(0.0),
			link_directional_arrow_rel_pos: Accessor::Constant(0.5),
			link_directional_arrow_color: None,
			link_directional_particles: Accessor::Constant(0.0),
			link_directional_particle_speed: Accessor::Constant(0.01),
			link_directional_particle_width: Accessor::Constant(4.0),
			link_directional_particle_color: None,
			link_hover_precision: 4.0,

			dag_mode: None,
			dag_level_distance: None,
			dag_node_filter: None,
			on_dag_error: None,

			d3_alpha_min: 0.0,
			d3_alpha_decay: 0.0228,
			d3_velocity_decay: 0.4,
			warmup_ticks: 0,
			cooldown_ticks: None,
			cooldown_time: Duration::from_millis(15_000),

			enable_pointer_interaction: true,
			enable_node_drag: true,
			enable_zoom_interaction: true,
			enable_pan_interaction: true,
			min_zoom: 0.01,
			max_zoom: 1000.0,
			hover_throttle: Duration::from_millis(800),
		}
	}
}

impl ForceGraphConfig {
	/// Reject values that would break layout or painting.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !(self.node_rel_size > 0.0) {
			return Err(ConfigError::NodeRelSize(self.node_rel_size));
		}
		for (name, value) in [
			("d3_alpha_min", self.d3_alpha_min),
			("d3_alpha_decay", self.d3_alpha_decay),
			("d3_velocity_decay", self.d3_velocity_decay),
		] {
			if !(0.0..=1.0).contains(&value) {
				return Err(ConfigError::OutOfUnitRange { name, value });
			}
		}
		if let Some(d) = self.dag_level_distance
			&& !(d > 0.0)
		{
			return Err(ConfigError::DagLevelDistance(d));
		}
		if !(self.link_hover_precision >= 0.0) {
			return Err(ConfigError::HoverPrecision(self.link_hover_precision));
		}
		if !(self.min_zoom > 0.0 && self.min_zoom <= self.max_zoom) {
			return Err(ConfigError::ZoomRange {
				min: self.min_zoom,
				max: self.max_zoom,
			});
		}
		Ok(())
	}

	/// Sets `background_color`.
	pub fn background_color(mut self, color: impl Into<String>) -> Self {
		self.background_color = Some(color.into());
		self
	}

	/// Sets `node_rel_size`.
	pub fn node_rel_size(mut self, size: f64) -> Self {
		self.node_rel_size = size;
		self
	}

	/// Sets `node_val`.
	pub fn node_val(mut self, val: impl Into<NodeAccessor<f64>>) -> Self {
		self.node_val = val.into();
		self
	}

	/// Sets `node_color`.
	pub fn node_color(mut self, color: impl Into<NodeAccessor<String>>) -> Self {
		self.node_color = color.into();
		self
	}

	/// Sets `node_auto_color_by`.
	pub fn node_auto_color_by(mut self, by: impl Into<NodeAccessor<String>>) -> Self {
		self.node_auto_color_by = Some(by.into());
		self
	}

	/// Sets `node_label`.
	pub fn node_label(mut self, label: impl Into<NodeAccessor<String>>) -> Self {
		self.node_label = label.into();
		self
	}

	/// Sets `node_visibility`.
	pub fn node_visibility(mut self, visible: impl Into<NodeAccessor<bool>>) -> Self {
		self.node_visibility = visible.into();
		self
	}

	/// Paint nodes with `paint`, placed by `mode`.
	pub fn node_canvas_object(
		mut self,
		paint: impl Fn(&Node, &mut dyn DrawSurface, f64) + 'static,
		mode: impl Into<NodeAccessor<CanvasObjectMode>>,
	) -> Self {
		self.node_canvas_object = Some(Rc::new(paint));
		self.node_canvas_object_mode = mode.into();
		self
	}

	/// Replace the default circular hit area.
	pub fn node_pointer_area_paint(
		mut self,
		paint: impl Fn(&Node, Rgb, &mut dyn DrawSurface, f64) + 'static,
	) -> Self {
		self.node_pointer_area_paint = Some(Rc::new(paint));
		self
	}

	/// Sets `link_color`.
	pub fn link_color(mut self, color: impl Into<LinkAccessor<String>>) -> Self {
		self.link_color = color.into();
		self
	}

	/// Sets `link_auto_color_by`.
	pub fn link_auto_color_by(mut self, by: impl Into<LinkAccessor<String>>) -> Self {
		self.link_auto_color_by = Some(by.into());
		self
	}

	/// Sets `link_label`.
	pub fn link_label(mut self, label: impl Into<LinkAccessor<String>>) -> Self {
		self.link_label = label.into();
		self
	}

	/// Sets `link_visibility`.
	pub fn link_visibility(mut self, visible: impl Into<LinkAccessor<bool>>) -> Self {
		self.link_visibility = visible.into();
		self
	}

	/// Sets `link_width`.
	pub fn link_width(mut self, width: impl Into<LinkAccessor<f64>>) -> Self {
		self.link_width = width.into();
		self
	}

	/// Dash pattern. Takes an accessor so patterns can vary per link.
	pub fn link_line_dash(mut self, dash: LinkAccessor<Vec<f64>>) -> Self {
		self.link_line_dash = dash;
		self
	}

	/// Sets `link_curvature`.
	pub fn link_curvature(mut self, curvature: impl Into<LinkAccessor<f64>>) -> Self {
		self.link_curvature = curvature.into();
		self
	}

	/// Paint links with `paint`, placed by `mode`.
	pub fn link_canvas_object(
		mut self,
		paint: impl Fn(&Link, &Graph, &mut dyn DrawSurface, f64) + 'static,
		mode: impl Into<LinkAccessor<CanvasObjectMode>>,
	) -> Self {
		self.link_canvas_object = Some(Rc::new(paint));
		self.link_canvas_object_mode = mode.into();
		self
	}

	/// Replace the default stroked hit area.
	pub fn link_pointer_area_paint(
		mut self,
		paint: impl Fn(&Link, &Graph, Rgb, &mut dyn DrawSurface, f64) + 'static,
	) -> Self {
		self.link_pointer_area_paint = Some(Rc::new(paint));
		self
	}

	/// Sets `link_directional_arrow_length`.
	pub fn link_directional_arrow_length(mut self, length: impl Into<LinkAccessor<f64>>) -> Self {
		self.link_directional_arrow_length = length.into();
		self
	}

	/// Sets `link_directional_arrow_rel_pos`.
	pub fn link_directional_arrow_rel_pos(mut self, pos: impl Into<LinkAccessor<f64>>) -> Self {
		self.link_directional_arrow_rel_pos = pos.into();
		self
	}

	/// Sets `link_directional_arrow_color`.
	pub fn link_directional_arrow_color(mut self, color: impl Into<LinkAccessor<String>>) -> Self {
		self.link_directional_arrow_color = Some(color.into());
		self
	}

	/// Sets `link_directional_particles`.
	pub fn link_directional_particles(mut self, count: impl Into<LinkAccessor<f64>>) -> Self {
		self.link_directional_particles = count.into();
		self
	}

	/// Sets `link_directional_particle_speed`.
	pub fn link_directional_particle_speed(mut self, speed: impl Into<LinkAccessor<f64>>) -> Self {
		self.link_directional_particle_speed = speed.into();
		self
	}

	/// Sets `link_directional_particle_width`.
	pub fn link_directional_particle_width(mut self, width: impl Into<LinkAccessor<f64>>) -> Self {
		self.link_directional_particle_width = width.into();
		self
	}

	/// Sets `link_directional_particle_color`.
	pub fn link_directional_particle_color(
		mut self,
		color: impl Into<LinkAccessor<String>>,
	) -> Self {
		self.link_directional_particle_color = Some(color.into());
		self
	}

	/// Sets `link_hover_precision`.
	pub fn link_hover_precision(mut self, precision: f64) -> Self {
		self.link_hover_precision = precision;
		self
	}

	/// Sets `dag_mode`.
	pub fn dag_mode(mut self, mode: Option<DagMode>) -> Self {
		self.dag_mode = mode;
		self
	}

	/// Fixed spacing between depth levels.
	pub fn dag_level_distance(mut self, distance: f64) -> Self {
		self.dag_level_distance = Some(distance);
		self
	}

	/// Restrict DAG layering to nodes passing `filter`.
	pub fn dag_node_filter(mut self, filter: impl Fn(&Node) -> bool + 'static) -> Self {
		self.dag_node_filter = Some(Rc::new(filter));
		self
	}

	/// Keep laying out when a cycle is found, reporting it to `handler`.
	pub fn on_dag_error(mut self, handler: impl Fn(&[String]) + 'static) -> Self {
		self.on_dag_error = Some(Rc::new(handler));
		self
	}

	/// Sets `d3_alpha_min`.
	pub fn d3_alpha_min(mut self, alpha_min: f64) -> Self {
		self.d3_alpha_min = alpha_min;
		self
	}

	/// Sets `d3_alpha_decay`.
	pub fn d3_alpha_decay(mut self, alpha_decay: f64) -> Self {
		self.d3_alpha_decay = alpha_decay;
		self
	}

	/// Sets `d3_velocity_decay`.
	pub fn d3_velocity_decay(mut self, velocity_decay: f64) -> Self {
		self.d3_velocity_decay = velocity_decay;
		self
	}

	/// Sets `warmup_ticks`.
	pub fn warmup_ticks(mut self, ticks: usize) -> Self {
		self.warmup_ticks = ticks;
		self
	}

	/// Stop after this many ticks. `None` disables the tick limit.
	pub fn cooldown_ticks(mut self, ticks: Option<usize>) -> Self {
		self.cooldown_ticks = ticks;
		self
	}

	/// Sets `cooldown_time`.
	pub fn cooldown_time(mut self, time: Duration) -> Self {
		self.cooldown_time = time;
		self
	}

	/// Sets `enable_pointer_interaction`.
	pub fn enable_pointer_interaction(mut self, enable: bool) -> Self {
		self.enable_pointer_interaction = enable;
		self
	}

	/// Sets `enable_node_drag`.
	pub fn enable_node_drag(mut self, enable: bool) -> Self {
		self.enable_node_drag = enable;
		self
	}

	/// Sets `hover_throttle`.
	pub fn hover_throttle(mut self, delay: Duration) -> Self {
		self.hover_throttle = delay;
		self
	}

	/// Sets `enable_zoom_interaction`.
	pub fn enable_zoom_interaction(mut self, enable: bool) -> Self {
		self.enable_zoom_interaction = enable;
		self
	}

	/// Sets `enable_pan_interaction`.
	pub fn enable_pan_interaction(mut self, enable: bool) -> Self {
		self.enable_pan_interaction = enable;
		self
	}

	/// Scale bounds for wheel zoom and zoom-to-fit.
	pub fn zoom_range(mut self, min: f64, max: f64) -> Self {
		self.min_zoom = min;
		self.max_zoom = max;
		self
	}
}

impl fmt::Debug for ForceGraphConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ForceGraphConfig")
			.field("node_rel_size", &self.node_rel_size)
			.field("node_val", &self.node_val)
			.field("link_width", &self.link_width)
			.field("link_curvature", &self.link_curvature)
			.field("dag_mode", &self.dag_mode)
			.field("dag_level_distance", &self.dag_level_distance)
			.field("d3_alpha_min", &self.d3_alpha_min)
			.field("d3_alpha_decay", &self.d3_alpha_decay)
			.field("d3_velocity_decay", &self.d3_velocity_decay)
			.field("cooldown_ticks", &self.cooldown_ticks)
			.field("cooldown_time", &self.cooldown_time)
			.field("min_zoom", &self.min_zoom)
			.field("max_zoom", &self.max_zoom)
			.finish_non_exhaustive()
	}
}
