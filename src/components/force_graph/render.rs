//! Per-frame painting of links, arrows, particles and nodes.
//!
//! The same pipeline paints the visible surface and the shadow surface. In
//! [`RenderMode::Shadow`] every object is filled with its registry color,
//! shapes are padded so thin objects stay hit-testable, and particles are
//! left out.

use std::collections::HashMap;
use std::f64::consts::FRAC_PI_2;

use super::config::{CanvasObjectMode, ForceGraphConfig};
use super::geometry::{ControlPoints, LinkPath, Point, control_points};
use super::surface::DrawSurface;
use super::types::{Graph, Link, Node, Photon};

/// Fill for nodes with no color and no auto color.
pub const DEFAULT_NODE_COLOR: &str = "rgba(31, 120, 180, 0.92)";
/// Stroke for links with no color and no auto color.
pub const DEFAULT_LINK_COLOR: &str = "rgba(0,0,0,0.15)";
/// Arrow fill when neither the arrow nor the link has a color.
pub const DEFAULT_ARROW_COLOR: &str = "rgba(0,0,0,0.28)";
/// Particle fill when neither the particle nor the link has a color.
pub const DEFAULT_PARTICLE_COLOR: &str = "rgba(0,0,0,0.28)";

const ARROW_WH_RATIO: f64 = 1.6;
const ARROW_VLEN_RATIO: f64 = 0.2;
/// Shadow shapes grow by this many screen pixels.
const SHADOW_PAD: f64 = 1.0;

/// Which canvas a pass targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
	/// What the user sees.
	#[default]
	Visible,
	/// Flat registry colors for pixel hit-testing.
	Shadow,
}

/// Default node radius: `sqrt(val) * node_rel_size`, with a missing or zero
/// `val` counting as 1.
pub fn node_radius(config: &ForceGraphConfig, node: &Node) -> f64 {
	let val = config
		.node_val
		.resolve(node)
		.filter(|v| *v != 0.0 && !v.is_nan())
		.unwrap_or(1.0);
	val.max(0.0).sqrt() * config.node_rel_size
}

/// Recompute every link's curve from its curvature and current endpoints.
pub fn update_control_points(graph: &mut Graph, config: &ForceGraphConfig) {
	for link in &mut graph.links {
		let (s, t) = (&graph.nodes[link.source], &graph.nodes[link.target]);
		let curvature = config.link_curvature.resolve_or(link, 0.0);
		link.control_points = control_points(Point::new(s.x, s.y), Point::new(t.x, t.y), curvature);
	}
}

/// Rebuild each link's looping particles from the particle count accessor.
/// Single-hop particles still in flight are kept.
pub fn refresh_particles(graph: &mut Graph, config: &ForceGraphConfig) {
	for link in &mut graph.links {
		let count = config.link_directional_particles.resolve_or(link, 0.0);
		let count = if count.is_finite() { count.abs().round() as usize } else { 0 };
		let in_flight: Vec<Photon> = link.photons.iter().copied().filter(|p| p.single_hop).collect();
		link.photons = (0..count)
			.map(|i| Photon {
				progress_ratio: i as f64 / count as f64,
				single_hop: false,
			})
			.chain(in_flight)
			.collect();
	}
}

/// Launch one particle that travels the link once.
pub fn emit_particle(link: &mut Link) {
	link.photons.push(Photon {
		progress_ratio: 0.0,
		single_hop: true,
	});
}

/// Move every particle one frame along its link. Looping particles wrap
/// around; single-hop particles are dropped once past the end.
pub fn advance_particles(graph: &mut Graph, config: &ForceGraphConfig) {
	for link in &mut graph.links {
		if link.photons.is_empty() {
			continue;
		}
		let speed = config.link_directional_particle_speed.resolve_or(link, 0.01);
		link.photons.retain_mut(|photon| {
			photon.progress_ratio += speed;
			if photon.single_hop {
				return photon.progress_ratio <= 1.0;
			}
			if !(0.0..1.0).contains(&photon.progress_ratio) {
				photon.progress_ratio = photon.progress_ratio.rem_euclid(1.0);
			}
			true
		});
	}
}

fn has_coords(node: &Node) -> bool {
	node.x.is_finite() && node.y.is_finite()
}

fn link_path(graph: &Graph, link: &Link) -> LinkPath {
	let (s, t) = graph.endpoints(link);
	LinkPath::new(Point::new(s.x, s.y), Point::new(t.x, t.y), link.control_points)
}

fn trace(surface: &mut dyn DrawSurface, path: &LinkPath) {
	surface.move_to(path.start.x, path.start.y);
	match path.control {
		None => surface.line_to(path.end.x, path.end.y),
		Some(ControlPoints::Quadratic(c)) => surface.quadratic_curve_to(c.x, c.y, path.end.x, path.end.y),
		Some(ControlPoints::Cubic(a, b)) => {
			surface.bezier_curve_to(a.x, a.y, b.x, b.y, path.end.x, path.end.y)
		}
	}
}

/// Links that share a stroke style, in first-seen order.
#[derive(Default)]
struct StrokeBatches {
	slots: HashMap<(String, u64, Vec<u64>), usize>,
	batches: Vec<StrokeBatch>,
}

struct StrokeBatch {
	color: String,
	width: f64,
	dash: Vec<f64>,
	links: Vec<usize>,
}

impl StrokeBatches {
	fn push(&mut self, color: String, width: f64, dash: Vec<f64>, link: usize) {
		let key = (color, width.to_bits(), dash.iter().map(|d| d.to_bits()).collect());
		let slot = *self.slots.entry(key).or_insert_with_key(|(color, _, _)| {
			self.batches.push(StrokeBatch {
				color: color.clone(),
				width,
				dash,
				links: Vec::new(),
			});
			self.batches.len() - 1
		});
		self.batches[slot].links.push(link);
	}
}

/// One paint pass over a graph, at a fixed scale and mode.
pub struct RenderPipeline<'a> {
	config: &'a ForceGraphConfig,
	global_scale: f64,
	mode: RenderMode,
}

impl<'a> RenderPipeline<'a> {
	/// Pass for `config` at view scale `global_scale`.
	pub fn new(config: &'a ForceGraphConfig, global_scale: f64, mode: RenderMode) -> Self {
		Self {
			config,
			global_scale,
			mode,
		}
	}

	fn is_shadow(&self) -> bool {
		self.mode == RenderMode::Shadow
	}

	/// Paint one frame from current positions. The caller owns clearing and
	/// the view transform.
	pub fn paint(&self, graph: &Graph, surface: &mut dyn DrawSurface) {
		let visible_nodes: Vec<bool> = graph
			.nodes
			.iter()
			.map(|n| self.config.node_visibility.resolve_or(n, true))
			.collect();
		let visible_links: Vec<usize> = graph
			.links
			.iter()
			.enumerate()
			.filter(|(_, l)| {
				visible_nodes[l.source]
					&& visible_nodes[l.target]
					&& has_coords(&graph.nodes[l.source])
					&& has_coords(&graph.nodes[l.target])
					&& self.config.link_visibility.resolve_or(l, true)
			})
			.map(|(i, _)| i)
			.collect();

		self.paint_links(graph, &visible_links, surface);
		self.paint_arrows(graph, &visible_links, surface);
		if !self.is_shadow() {
			self.paint_particles(graph, &visible_links, surface);
		}
		self.paint_nodes(graph, &visible_nodes, surface);
	}

	fn paint_nodes(&self, graph: &Graph, visible: &[bool], surface: &mut dyn DrawSurface) {
		let k = self.global_scale;
		surface.save();
		for (node, _) in graph.nodes.iter().zip(visible).filter(|(n, v)| **v && has_coords(n)) {
			if self.is_shadow() {
				let Some(color) = node.index_color() else {
					continue;
				};
				match &self.config.node_pointer_area_paint {
					Some(paint) => {
						surface.save();
						paint(node, color, surface, k);
						surface.restore();
					}
					None => self.fill_circle(surface, node, &color.to_hex(), SHADOW_PAD / k),
				}
				continue;
			}

			let custom = self.config.node_canvas_object.as_ref();
			let mode = match custom {
				Some(_) => self
					.config
					.node_canvas_object_mode
					.resolve_or(node, CanvasObjectMode::Replace),
				None => CanvasObjectMode::Replace,
			};
			let run_custom = |surface: &mut dyn DrawSurface| {
				if let Some(paint) = custom {
					surface.save();
					paint(node, surface, k);
					surface.restore();
				}
			};

			if custom.is_some() && mode != CanvasObjectMode::After {
				run_custom(surface);
				if mode == CanvasObjectMode::Replace {
					continue;
				}
			}
			let color = self
				.config
				.node_color
				.resolve(node)
				.unwrap_or_else(|| DEFAULT_NODE_COLOR.to_string());
			self.fill_circle(surface, node, &color, 0.0);
			if mode == CanvasObjectMode::After {
				run_custom(surface);
			}
		}
		surface.restore();
	}

	fn fill_circle(&self, surface: &mut dyn DrawSurface, node: &Node, color: &str, pad: f64) {
		surface.begin_path();
		surface.arc(node.x, node.y, node_radius(self.config, node) + pad);
		surface.set_fill(color);
		surface.fill();
	}

	fn paint_links(&self, graph: &Graph, visible: &[usize], surface: &mut dyn DrawSurface) {
		let k = self.global_scale;
		let mut before = Vec::new();
		let mut after = Vec::new();
		let mut batches = StrokeBatches::default();

		surface.save();
		for &i in visible {
			let link = &graph.links[i];
			if self.is_shadow() {
				let Some(color) = link.index_color() else {
					continue;
				};
				if let Some(paint) = &self.config.link_pointer_area_paint {
					surface.save();
					paint(link, graph, color, surface, k);
					surface.restore();
					continue;
				}
				let width = self.link_width(link) + self.config.link_hover_precision;
				batches.push(color.to_hex(), width / k + SHADOW_PAD / k, Vec::new(), i);
				continue;
			}

			if self.config.link_canvas_object.is_some() {
				match self
					.config
					.link_canvas_object_mode
					.resolve_or(link, CanvasObjectMode::Replace)
				{
					CanvasObjectMode::Replace => {
						before.push(i);
						continue;
					}
					CanvasObjectMode::Before => before.push(i),
					CanvasObjectMode::After => after.push(i),
				}
			}
			let color = self
				.config
				.link_color
				.resolve(link)
				.unwrap_or_else(|| DEFAULT_LINK_COLOR.to_string());
			let dash = self.config.link_line_dash.resolve(link).unwrap_or_default();
			batches.push(color, self.link_width(link) / k, dash, i);
		}

		self.run_link_hooks(graph, &before, surface);
		for batch in &batches.batches {
			surface.begin_path();
			for &i in &batch.links {
				trace(surface, &link_path(graph, &graph.links[i]));
			}
			surface.set_stroke(&batch.color);
			surface.set_line_width(batch.width);
			surface.set_line_dash(&batch.dash);
			surface.stroke();
		}
		self.run_link_hooks(graph, &after, surface);
		surface.restore();
	}

	fn run_link_hooks(&self, graph: &Graph, links: &[usize], surface: &mut dyn DrawSurface) {
		let Some(paint) = &self.config.link_canvas_object else {
			return;
		};
		for &i in links {
			surface.save();
			paint(&graph.links[i], graph, surface, self.global_scale);
			surface.restore();
		}
	}

	/// Resolved width in graph units; zero or missing counts as 1.
	fn link_width(&self, link: &Link) -> f64 {
		self.config
			.link_width
			.resolve(link)
			.filter(|w| *w != 0.0 && !w.is_nan())
			.unwrap_or(1.0)
	}

	fn paint_arrows(&self, graph: &Graph, visible: &[usize], surface: &mut dyn DrawSurface) {
		surface.save();
		for &i in visible {
			let link = &graph.links[i];
			let length = self.config.link_directional_arrow_length.resolve_or(link, 0.0);
			if !(length > 0.0) || !length.is_finite() {
				continue;
			}
			let color = if self.is_shadow() {
				match link.index_color() {
					Some(c) => c.to_hex(),
					None => continue,
				}
			} else {
				self.config
					.link_directional_arrow_color
					.as_ref()
					.unwrap_or(&self.config.link_color)
					.resolve(link)
					.unwrap_or_else(|| DEFAULT_ARROW_COLOR.to_string())
			};
			let rel_pos = self
				.config
				.link_directional_arrow_rel_pos
				.resolve_or(link, 0.5)
				.clamp(0.0, 1.0);
			let (source, target) = graph.endpoints(link);
			let start_r = node_radius(self.config, source);
			let end_r = node_radius(self.config, target);
			let path = link_path(graph, link);
			if let Some([head, left, notch, right]) = arrow_shape(&path, start_r, end_r, length, rel_pos) {
				surface.begin_path();
				surface.move_to(head.x, head.y);
				surface.line_to(left.x, left.y);
				surface.line_to(notch.x, notch.y);
				surface.line_to(right.x, right.y);
				surface.set_fill(&color);
				surface.fill();
			}
		}
		surface.restore();
	}

	fn paint_particles(&self, graph: &Graph, visible: &[usize], surface: &mut dyn DrawSurface) {
		surface.save();
		for &i in visible {
			let link = &graph.links[i];
			if link.photons.is_empty() {
				continue;
			}
			let width = self.config.link_directional_particle_width.resolve_or(link, 4.0);
			let radius = (width / 2.0).max(0.0) / self.global_scale.sqrt();
			let color = self
				.config
				.link_directional_particle_color
				.as_ref()
				.unwrap_or(&self.config.link_color)
				.resolve(link)
				.unwrap_or_else(|| DEFAULT_PARTICLE_COLOR.to_string());
			let path = link_path(graph, link);
			surface.set_fill(&color);
			for photon in &link.photons {
				let p = path.point_at(photon.progress_ratio);
				surface.begin_path();
				surface.arc(p.x, p.y, radius);
				surface.fill();
			}
		}
		surface.restore();
	}
}

/// Concave arrowhead as `[head, tail corner, notch, tail corner]`. The arrow
/// sits between the endpoint radii, `rel_pos` of the way along the free
/// stretch of the path.
fn arrow_shape(path: &LinkPath, start_r: f64, end_r: f64, length: f64, rel_pos: f64) -> Option<[Point; 4]> {
	let line_len = path.length();
	if !(line_len > 0.0) {
		return None;
	}
	let pos = start_r + length + (line_len - start_r - end_r - length) * rel_pos;
	let head = path.point_at(pos / line_len);
	let tail = path.point_at((pos - length) / line_len);
	let notch = path.point_at((pos - length * (1.0 - ARROW_VLEN_RATIO)) / line_len);

	let angle = (head.y - tail.y).atan2(head.x - tail.x) - FRAC_PI_2;
	let half = length / ARROW_WH_RATIO / 2.0;
	let (dx, dy) = (half * angle.cos(), half * angle.sin());
	Some([
		head,
		Point::new(tail.x + dx, tail.y + dy),
		notch,
		Point::new(tail.x - dx, tail.y - dy),
	])
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::components::force_graph::accessor::Accessor;
	use crate::components::force_graph::config::NodeAccessor;
	use crate::components::force_graph::color_registry::Rgb;
	use crate::components::force_graph::surface::{DrawOp, RecordingSurface};
	use crate::components::force_graph::types::{GraphData, GraphLink, GraphNode};

	const EPS: f64 = 1e-9;

	fn node_at(id: &str, x: f64, y: f64) -> GraphNode {
		GraphNode {
			x: Some(x),
			y: Some(y),
			..GraphNode::new(id)
		}
	}

	fn graph(nodes: Vec<GraphNode>, links: &[(&str, &str)]) -> Graph {
		Graph::from_data(GraphData {
			nodes,
			links: links.iter().map(|(s, t)| GraphLink::new(*s, *t)).collect(),
		})
		.unwrap()
	}

	fn paint(graph: &Graph, config: &ForceGraphConfig, mode: RenderMode) -> RecordingSurface {
		let mut surface = RecordingSurface::new(200.0, 200.0);
		RenderPipeline::new(config, 1.0, mode).paint(graph, &mut surface);
		surface
	}

	fn position(surface: &RecordingSurface, op: &DrawOp) -> usize {
		surface.ops.iter().position(|o| o == op).unwrap()
	}

	#[test]
	fn node_radius_follows_sqrt_of_val() {
		let g = graph(
			vec![node_at("a", 0.0, 0.0).with_val(4.0), node_at("b", 10.0, 0.0).with_val(1.0)],
			&[],
		);
		let config = ForceGraphConfig::default().node_rel_size(2.0);
		let radii: Vec<f64> = paint(&g, &config, RenderMode::Visible)
			.arcs()
			.into_iter()
			.map(|(_, _, r)| r)
			.collect();
		assert_eq!(radii, vec![4.0, 2.0]);
	}

	#[test]
	fn missing_zero_and_negative_vals() {
		let g = graph(
			vec![
				node_at("a", 0.0, 0.0),
				node_at("b", 0.0, 0.0).with_val(0.0),
				node_at("c", 0.0, 0.0).with_val(-9.0),
			],
			&[],
		);
		let config = ForceGraphConfig::default();
		let radii: Vec<f64> = g.nodes.iter().map(|n| node_radius(&config, n)).collect();
		assert_eq!(radii, vec![4.0, 4.0, 0.0]);
	}

	#[test]
	fn nodes_use_own_color_or_default() {
		let mut colored = node_at("a", 0.0, 0.0);
		colored.color = Some("red".into());
		let g = graph(vec![colored, node_at("b", 5.0, 5.0)], &[]);
		let surface = paint(&g, &ForceGraphConfig::default(), RenderMode::Visible);
		let fills: Vec<&DrawOp> = surface.ops.iter().filter(|op| matches!(op, DrawOp::SetFill(_))).collect();
		assert_eq!(
			fills,
			vec![
				&DrawOp::SetFill("red".into()),
				&DrawOp::SetFill(DEFAULT_NODE_COLOR.into())
			]
		);
	}

	#[test]
	fn hidden_nodes_and_their_links_are_skipped_on_both_surfaces() {
		let g = graph(
			vec![node_at("a", 0.0, 0.0), node_at("b", 50.0, 0.0), node_at("c", 0.0, 50.0)],
			&[("a", "b"), ("a", "c")],
		);
		let config = ForceGraphConfig::default().node_visibility(Accessor::func(|n: &Node| n.id() != "b"));
		for mode in [RenderMode::Visible, RenderMode::Shadow] {
			let mut g = g.clone();
			for (i, node) in g.nodes.iter_mut().enumerate() {
				node.index_color = Some(Rgb::from_int(i as u32 + 1));
			}
			for (i, link) in g.links.iter_mut().enumerate() {
				link.index_color = Some(Rgb::from_int(i as u32 + 10));
			}
			let surface = paint(&g, &config, mode);
			assert_eq!(surface.arcs().len(), 2);
			assert_eq!(surface.count(|op| matches!(op, DrawOp::LineTo(..))), 1);
			assert!(!surface.arcs().iter().any(|(x, _, _)| *x == 50.0));
		}
	}

	#[test]
	fn links_are_batched_by_style() {
		let g = graph(
			vec![node_at("a", 0.0, 0.0), node_at("b", 10.0, 0.0), node_at("c", 0.0, 10.0)],
			&[("a", "b"), ("b", "c"), ("c", "a")],
		);
		let config = ForceGraphConfig::default()
			.link_width(Accessor::func(|l: &Link| if l.source == 2 { 3.0_f64 } else { 1.0 }));
		let surface = paint(&g, &config, RenderMode::Visible);
		assert_eq!(surface.count(|op| *op == DrawOp::Stroke), 2);
		assert_eq!(surface.count(|op| matches!(op, DrawOp::MoveTo(..))), 3);
		assert!(surface.ops.contains(&DrawOp::SetLineWidth(3.0)));
		assert!(surface.ops.contains(&DrawOp::SetStroke(DEFAULT_LINK_COLOR.into())));
	}

	#[test]
	fn link_width_and_dash_are_scaled_and_applied() {
		let mut g = graph(vec![node_at("a", 0.0, 0.0), node_at("b", 10.0, 0.0)], &[("a", "b")]);
		g.links[0].data = GraphLink::new("a", "b").with_attr("dash", serde_json::json!([2.0, 1.0]));
		let config = ForceGraphConfig::default().link_width(4.0);
		let mut surface = RecordingSurface::new(100.0, 100.0);
		RenderPipeline::new(&config, 2.0, RenderMode::Visible).paint(&g, &mut surface);
		assert!(surface.ops.contains(&DrawOp::SetLineWidth(2.0)));
		assert!(surface.ops.contains(&DrawOp::SetLineDash(vec![2.0, 1.0])));
	}

	#[test]
	fn curved_and_looped_links_draw_bezier_paths() {
		let mut g = graph(
			vec![node_at("a", 0.0, 0.0), node_at("b", 10.0, 0.0)],
			&[("a", "b"), ("b", "b")],
		);
		let config = ForceGraphConfig::default().link_curvature(0.5);
		update_control_points(&mut g, &config);
		assert!(matches!(g.links[0].control_points, Some(ControlPoints::Quadratic(_))));
		assert_eq!(
			g.links[1].control_points.map(|c| c.values()),
			Some(vec![10.0, -35.0, 45.0, 0.0])
		);

		let surface = paint(&g, &config, RenderMode::Visible);
		assert_eq!(surface.count(|op| matches!(op, DrawOp::QuadraticCurveTo(..))), 1);
		assert_eq!(surface.count(|op| matches!(op, DrawOp::BezierCurveTo(..))), 1);
		assert_eq!(surface.count(|op| matches!(op, DrawOp::LineTo(..))), 0);
	}

	#[test]
	fn zero_curvature_clears_control_points() {
		let mut g = graph(vec![node_at("a", 0.0, 0.0), node_at("b", 10.0, 0.0)], &[("a", "b")]);
		update_control_points(&mut g, &ForceGraphConfig::default().link_curvature(0.3));
		assert!(g.links[0].control_points.is_some());
		update_control_points(&mut g, &ForceGraphConfig::default());
		assert_eq!(g.links[0].control_points, None);
	}

	#[test]
	fn arrowhead_sits_between_node_radii() {
		let g = graph(vec![node_at("a", 0.0, 0.0), node_at("b", 100.0, 0.0)], &[("a", "b")]);
		let config = ForceGraphConfig::default()
			.link_directional_arrow_length(10.0)
			.link_directional_arrow_rel_pos(1.0);
		let surface = paint(&g, &config, RenderMode::Visible);

		let start = position(&surface, &DrawOp::MoveTo(92.0, 0.0));
		let [left, notch, right] = [1, 2, 3].map(|i| match &surface.ops[start + i] {
			DrawOp::LineTo(x, y) => (*x, *y),
			other => panic!("unexpected {other:?}"),
		});
		assert!((left.0 - 82.0).abs() < EPS && (left.1 + 3.125).abs() < EPS);
		assert!((notch.0 - 84.0).abs() < EPS && notch.1.abs() < EPS);
		assert!((right.0 - 82.0).abs() < EPS && (right.1 - 3.125).abs() < EPS);
		assert_eq!(surface.ops[start + 4], DrawOp::SetFill(DEFAULT_ARROW_COLOR.into()));
	}

	#[test]
	fn arrow_at_start_clears_source_node() {
		let path = LinkPath::new(Point::new(0.0, 0.0), Point::new(100.0, 0.0), None);
		let [head, left, notch, _] = arrow_shape(&path, 4.0, 4.0, 10.0, 0.0).unwrap();
		assert!((head.x - 14.0).abs() < EPS);
		assert!((notch.x - 6.0).abs() < EPS);
		assert!((left.x - 4.0).abs() < EPS);
	}

	#[test]
	fn no_arrows_without_length() {
		let g = graph(vec![node_at("a", 0.0, 0.0), node_at("b", 100.0, 0.0)], &[("a", "b")]);
		let surface = paint(&g, &ForceGraphConfig::default(), RenderMode::Visible);
		assert_eq!(surface.count(|op| *op == DrawOp::Fill), 2);
	}

	#[test]
	fn particles_wrap_and_single_hops_expire() {
		let mut g = graph(vec![node_at("a", 0.0, 0.0), node_at("b", 100.0, 0.0)], &[("a", "b")]);
		let config = ForceGraphConfig::default()
			.link_directional_particles(2.0)
			.link_directional_particle_speed(0.25);
		refresh_particles(&mut g, &config);
		emit_particle(&mut g.links[0]);
		let start: Vec<f64> = g.links[0].photons.iter().map(|p| p.progress_ratio).collect();
		assert_eq!(start, vec![0.0, 0.5, 0.0]);

		for _ in 0..4 {
			advance_particles(&mut g, &config);
		}
		let ratios: Vec<f64> = g.links[0].photons.iter().map(|p| p.progress_ratio).collect();
		assert_eq!(ratios, vec![0.0, 0.5, 1.0]);

		advance_particles(&mut g, &config);
		assert_eq!(g.links[0].photons.len(), 2);
		assert!(g.links[0].photons.iter().all(|p| !p.single_hop));
	}

	#[test]
	fn refresh_keeps_in_flight_single_hops() {
		let mut g = graph(vec![node_at("a", 0.0, 0.0), node_at("b", 1.0, 0.0)], &[("a", "b")]);
		emit_particle(&mut g.links[0]);
		g.links[0].photons[0].progress_ratio = 0.4;
		refresh_particles(&mut g, &ForceGraphConfig::default().link_directional_particles(-3.4));
		let photons = &g.links[0].photons;
		assert_eq!(photons.len(), 4);
		assert_eq!(
			photons[3],
			Photon {
				progress_ratio: 0.4,
				single_hop: true
			}
		);
	}

	#[test]
	fn particles_ride_the_link_and_skip_the_shadow() {
		let mut g = graph(vec![node_at("a", 0.0, 0.0), node_at("b", 100.0, 0.0)], &[("a", "b")]);
		for (i, node) in g.nodes.iter_mut().enumerate() {
			node.index_color = Some(Rgb::from_int(i as u32 + 1));
		}
		g.links[0].index_color = Some(Rgb::from_int(3));
		let config = ForceGraphConfig::default()
			.link_directional_particles(1.0)
			.link_directional_particle_width(6.0);
		refresh_particles(&mut g, &config);
		g.links[0].photons[0].progress_ratio = 0.25;

		let mut surface = RecordingSurface::new(200.0, 200.0);
		RenderPipeline::new(&config, 4.0, RenderMode::Visible).paint(&g, &mut surface);
		assert_eq!(surface.arcs()[0], (25.0, 0.0, 1.5));

		let shadow = paint(&g, &config, RenderMode::Shadow);
		assert_eq!(shadow.arcs().len(), 2);
	}

	#[test]
	fn particles_follow_curves() {
		let mut g = graph(vec![node_at("a", 0.0, 0.0), node_at("b", 10.0, 0.0)], &[("a", "b")]);
		let config = ForceGraphConfig::default()
			.link_curvature(1.0)
			.link_directional_particles(1.0);
		update_control_points(&mut g, &config);
		refresh_particles(&mut g, &config);
		g.links[0].photons[0].progress_ratio = 0.5;
		let surface = paint(&g, &config, RenderMode::Visible);
		let (x, y, _) = surface.arcs()[0];
		let expected = link_path(&g, &g.links[0]).point_at(0.5);
		assert!((x - expected.x).abs() < EPS && (y - expected.y).abs() < EPS);
		assert!(y.abs() > 1.0);
	}

	#[test]
	fn shadow_paints_registry_colors_with_padding() {
		let mut g = graph(
			vec![node_at("a", 0.0, 0.0), node_at("b", 10.0, 0.0), node_at("c", 20.0, 0.0)],
			&[("a", "b")],
		);
		g.nodes[0].index_color = Some(Rgb::new(0, 0, 1));
		g.nodes[1].index_color = Some(Rgb::new(0, 0, 2));
		g.links[0].index_color = Some(Rgb::new(0, 0, 3));
		let config = ForceGraphConfig::default().link_width(2.0);

		let mut surface = RecordingSurface::new(100.0, 100.0);
		RenderPipeline::new(&config, 2.0, RenderMode::Shadow).paint(&g, &mut surface);
		// unregistered node c is not hit-testable
		assert_eq!(surface.arcs(), vec![(0.0, 0.0, 4.5), (10.0, 0.0, 4.5)]);
		assert!(surface.ops.contains(&DrawOp::SetFill("#000001".into())));
		assert!(surface.ops.contains(&DrawOp::SetStroke("#000003".into())));
		assert!(surface.ops.contains(&DrawOp::SetLineWidth(3.5)));
	}

	fn marker(name: &'static str) -> impl Fn(&Node, &mut dyn DrawSurface, f64) {
		move |_, surface, _| surface.set_fill(name)
	}

	#[test]
	fn node_paint_modes() {
		let g = graph(vec![node_at("a", 0.0, 0.0)], &[]);
		let default_fill = DrawOp::SetFill(DEFAULT_NODE_COLOR.into());
		let hook = DrawOp::SetFill("hook".into());

		let replace = ForceGraphConfig::default().node_canvas_object(marker("hook"), CanvasObjectMode::Replace);
		let surface = paint(&g, &replace, RenderMode::Visible);
		assert!(surface.arcs().is_empty());
		assert!(surface.ops.contains(&hook));

		let before = ForceGraphConfig::default().node_canvas_object(marker("hook"), CanvasObjectMode::Before);
		let surface = paint(&g, &before, RenderMode::Visible);
		assert!(position(&surface, &hook) < position(&surface, &default_fill));

		let after = ForceGraphConfig::default().node_canvas_object(marker("hook"), CanvasObjectMode::After);
		let surface = paint(&g, &after, RenderMode::Visible);
		assert!(position(&surface, &hook) > position(&surface, &default_fill));
	}

	#[test]
	fn node_paint_mode_can_vary_per_node() {
		let g = graph(
			vec![
				node_at("a", 0.0, 0.0).with_attr("mode", "replace"),
				node_at("b", 5.0, 0.0).with_attr("mode", "after"),
			],
			&[],
		);
		let config = ForceGraphConfig::default().node_canvas_object(marker("hook"), NodeAccessor::field("mode"));
		let surface = paint(&g, &config, RenderMode::Visible);
		assert_eq!(surface.arcs().len(), 1);
		assert_eq!(surface.count(|op| *op == DrawOp::SetFill("hook".into())), 2);
	}

	#[test]
	fn link_paint_modes() {
		let g = graph(vec![node_at("a", 0.0, 0.0), node_at("b", 10.0, 0.0)], &[("a", "b")]);
		let hook = |_: &Link, _: &Graph, surface: &mut dyn DrawSurface, _: f64| surface.set_stroke("hook");
		let hook_op = DrawOp::SetStroke("hook".into());

		let replace = ForceGraphConfig::default().link_canvas_object(hook, CanvasObjectMode::Replace);
		let surface = paint(&g, &replace, RenderMode::Visible);
		assert_eq!(surface.count(|op| *op == DrawOp::Stroke), 0);
		assert!(surface.ops.contains(&hook_op));

		let after = ForceGraphConfig::default().link_canvas_object(hook, CanvasObjectMode::After);
		let surface = paint(&g, &after, RenderMode::Visible);
		assert!(position(&surface, &hook_op) > position(&surface, &DrawOp::Stroke));
	}

	#[test]
	fn pointer_area_hooks_replace_shadow_shapes() {
		let mut g = graph(vec![node_at("a", 0.0, 0.0), node_at("b", 10.0, 0.0)], &[("a", "b")]);
		g.nodes[0].index_color = Some(Rgb::new(0, 0, 1));
		g.links[0].index_color = Some(Rgb::new(0, 0, 3));
		let config = ForceGraphConfig::default()
			.node_pointer_area_paint(|_, color, surface, _| surface.set_fill(&format!("area {color}")))
			.link_pointer_area_paint(|_, _, color, surface, _| surface.set_stroke(&format!("area {color}")));
		let surface = paint(&g, &config, RenderMode::Shadow);
		assert!(surface.arcs().is_empty());
		assert!(surface.ops.contains(&DrawOp::SetFill("area #000001".into())));
		assert!(surface.ops.contains(&DrawOp::SetStroke("area #000003".into())));
		assert_eq!(surface.count(|op| *op == DrawOp::Stroke), 0);
	}

	#[test]
	fn links_without_coordinates_are_skipped() {
		let mut g = graph(vec![node_at("a", 0.0, 0.0), node_at("b", 10.0, 0.0)], &[("a", "b")]);
		g.nodes[1].x = f64::NAN;
		let surface = paint(&g, &ForceGraphConfig::default(), RenderMode::Visible);
		assert_eq!(surface.count(|op| matches!(op, DrawOp::MoveTo(..))), 0);
		assert_eq!(surface.arcs().len(), 1);
	}
}
