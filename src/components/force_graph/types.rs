//! Caller-facing graph data and the simulation-owned arena built from it.

use std::collections::HashMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::color_registry::Rgb;
use super::error::GraphError;
use super::geometry::ControlPoints;

const INITIAL_RADIUS: f64 = 10.0;

/// A node as supplied by the caller.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
	/// Unique within one dataset. Links refer to nodes by it.
	pub id: String,
	/// Read by the default `node_label` accessor.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub label: Option<String>,
	/// Read by the default `node_color` accessor.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub color: Option<String>,
	/// Free-form grouping, usable as an auto-color key.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub group: Option<u32>,
	/// Read by the default `node_val` accessor.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub val: Option<f64>,
	/// Initial position. Spiral placement when unset.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub x: Option<f64>,
	/// Initial position. Spiral placement when unset.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub y: Option<f64>,
	/// Pins the node horizontally.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fx: Option<f64>,
	/// Pins the node vertically.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fy: Option<f64>,
	/// Any other properties, reachable through field accessors.
	#[serde(flatten)]
	pub attrs: Map<String, Value>,
}

impl GraphNode {
	/// Node with only an id.
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			..Default::default()
		}
	}

	/// Set `val`.
	pub fn with_val(mut self, val: f64) -> Self {
		self.val = Some(val);
		self
	}

	/// Add an extra attribute for field accessors.
	pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.attrs.insert(key.into(), value.into());
		self
	}
}

/// A directed link as supplied by the caller. Endpoints are node ids.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
	/// Id of the source node.
	pub source: String,
	/// Id of the target node.
	pub target: String,
	/// Read by the default `link_label` accessor.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub label: Option<String>,
	/// Read by the default `link_color` accessor.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub color: Option<String>,
	/// Any other properties, reachable through field accessors.
	#[serde(flatten)]
	pub attrs: Map<String, Value>,
}

impl GraphLink {
	/// Link from `source` to `target`.
	pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
			..Default::default()
		}
	}

	/// Add an extra attribute for field accessors.
	pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.attrs.insert(key.into(), value.into());
		self
	}
}

/// A full dataset, replaced as a whole on every load.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
	/// Nodes, with unique ids.
	pub nodes: Vec<GraphNode>,
	/// Links between those nodes.
	pub links: Vec<GraphLink>,
}

/// Simulation-owned node: the caller's data plus kinematic state.
#[derive(Clone, Debug)]
pub struct Node {
	/// The caller's node, as supplied.
	pub data: GraphNode,
	/// Current position.
	pub x: f64,
	/// Current position.
	pub y: f64,
	/// Velocity applied on the next tick.
	pub vx: f64,
	/// Velocity applied on the next tick.
	pub vy: f64,
	/// Horizontal pin. Overrides `x` every tick.
	pub fx: Option<f64>,
	/// Vertical pin. Overrides `y` every tick.
	pub fy: Option<f64>,
	pub(crate) index_color: Option<Rgb>,
}

impl Node {
	/// The caller's id.
	pub fn id(&self) -> &str {
		&self.data.id
	}

	/// Shadow-canvas color, `None` when the registry was full.
	pub fn index_color(&self) -> Option<Rgb> {
		self.index_color
	}
}

/// A particle travelling along a link.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Photon {
	/// Position along the link, in `[0, 1)`.
	pub progress_ratio: f64,
	/// Emitted once and dropped after one pass, instead of looping.
	pub single_hop: bool,
}

/// A link resolved against the node arena. `source` and `target` index
/// into [`Graph::nodes`].
#[derive(Clone, Debug)]
pub struct Link {
	/// The caller's link, as supplied.
	pub data: GraphLink,
	/// Index of the source node.
	pub source: usize,
	/// Index of the target node.
	pub target: usize,
	/// Curve parameters, refreshed each frame. `None` for straight links.
	pub control_points: Option<ControlPoints>,
	/// Particles currently on the link.
	pub photons: Vec<Photon>,
	pub(crate) index_color: Option<Rgb>,
}

impl Link {
	/// Shadow-canvas color, `None` when the registry was full.
	pub fn index_color(&self) -> Option<Rgb> {
		self.index_color
	}
}

/// Whether an [`ObjectRef`] names a node or a link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
	/// A node.
	Node,
	/// A link.
	Link,
}

/// Handle to a node or link inside a [`Graph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectRef {
	/// Index into [`Graph::nodes`].
	Node(usize),
	/// Index into [`Graph::links`].
	Link(usize),
}

impl ObjectRef {
	/// Node or link.
	pub fn kind(self) -> ObjectKind {
		match self {
			ObjectRef::Node(_) => ObjectKind::Node,
			ObjectRef::Link(_) => ObjectKind::Link,
		}
	}
}

/// Node arena plus resolved links. The node list owns every node; links
/// only hold indices into it.
#[derive(Clone, Debug, Default)]
pub struct Graph {
	/// Nodes in input order.
	pub nodes: Vec<Node>,
	/// Links in input order.
	pub links: Vec<Link>,
	index: HashMap<String, usize>,
}

impl Graph {
	/// Ingest caller data, resolving link endpoints to node indices once.
	/// Nodes without a position are laid out on a phyllotaxis spiral.
	pub fn from_data(data: GraphData) -> Result<Self, GraphError> {
		let initial_angle = PI * (3.0 - 5f64.sqrt());
		let mut index = HashMap::with_capacity(data.nodes.len());
		let mut nodes = Vec::with_capacity(data.nodes.len());

		for (i, node) in data.nodes.into_iter().enumerate() {
			if index.insert(node.id.clone(), i).is_some() {
				return Err(GraphError::DuplicateNode(node.id));
			}
			let radius = INITIAL_RADIUS * (0.5 + i as f64).sqrt();
			let angle = i as f64 * initial_angle;
			nodes.push(Node {
				x: node.x.unwrap_or(radius * angle.cos()),
				y: node.y.unwrap_or(radius * angle.sin()),
				vx: 0.0,
				vy: 0.0,
				fx: node.fx,
				fy: node.fy,
				data: node,
				index_color: None,
			});
		}

		let links = data
			.links
			.into_iter()
			.enumerate()
			.map(|(i, link)| {
				let source = *index.get(&link.source).ok_or_else(|| GraphError::MissingSource {
					link: i,
					id: link.source.clone(),
				})?;
				let target = *index.get(&link.target).ok_or_else(|| GraphError::MissingTarget {
					link: i,
					id: link.target.clone(),
				})?;
				Ok(Link {
					data: link,
					source,
					target,
					control_points: None,
					photons: Vec::new(),
					index_color: None,
				})
			})
			.collect::<Result<Vec<_>, GraphError>>()?;

		Ok(Self {
			nodes,
			links,
			index,
		})
	}

	/// Arena index of the node with `id`.
	pub fn node_index(&self, id: &str) -> Option<usize> {
		self.index.get(id).copied()
	}

	/// Node with `id`.
	pub fn node(&self, id: &str) -> Option<&Node> {
		self.node_index(id).map(|i| &self.nodes[i])
	}

	/// Source and target of `link`.
	pub fn endpoints(&self, link: &Link) -> (&Node, &Node) {
		(&self.nodes[link.source], &self.nodes[link.target])
	}

	/// No nodes and no links.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty() && self.links.is_empty()
	}

	/// Export the current state, positions included.
	pub fn to_data(&self) -> GraphData {
		GraphData {
			nodes: self
				.nodes
				.iter()
				.map(|n| GraphNode {
					x: Some(n.x),
					y: Some(n.y),
					fx: n.fx,
					fy: n.fy,
					..n.data.clone()
				})
				.collect(),
			links: self.links.iter().map(|l| l.data.clone()).collect(),
		}
	}
}
