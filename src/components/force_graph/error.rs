//! Error taxonomy for data loading, DAG layering and configuration.

use thiserror::Error;

/// Failures raised while computing DAG depths.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DagError {
	/// A link references a source id absent from the node set.
	#[error("Missing source node with id: {0}")]
	MissingSource(String),
	/// A link references a target id absent from the node set.
	#[error("Missing target node with id: {0}")]
	MissingTarget(String),
	/// The graph contains a loop. Ids are ordered along the loop and the first
	/// id is repeated at the end.
	#[error("Invalid DAG structure! Found cycle in node path: {}.", .0.join(" -> "))]
	Cycle(Vec<String>),
}

/// Failures raised when a configuration does not validate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
	/// `node_rel_size` is zero, negative or NaN.
	#[error("node_rel_size must be positive, got {0}")]
	NodeRelSize(f64),
	/// A ratio such as an alpha parameter fell outside `[0, 1]`.
	#[error("{name} must be within [0, 1], got {value}")]
	OutOfUnitRange {
		/// Setting name.
		name: &'static str,
		/// Rejected value.
		value: f64,
	},
	/// An explicit level distance that is not positive.
	#[error("dag_level_distance must be positive, got {0}")]
	DagLevelDistance(f64),
	/// Negative link hover padding.
	#[error("link_hover_precision must not be negative, got {0}")]
	HoverPrecision(f64),
	/// Zoom bounds that are not positive or are inverted.
	#[error("zoom range must satisfy 0 < min <= max, got [{min}, {max}]")]
	ZoomRange {
		/// Smallest scale.
		min: f64,
		/// Largest scale.
		max: f64,
	},
}

/// Failures raised while ingesting graph data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
	/// Link `link` names a source id that no node carries.
	#[error("link {link} references missing source node with id: {id}")]
	MissingSource {
		/// Link index in the input.
		link: usize,
		/// The unresolved id.
		id: String,
	},
	/// Link `link` names a target id that no node carries.
	#[error("link {link} references missing target node with id: {id}")]
	MissingTarget {
		/// Link index in the input.
		link: usize,
		/// The unresolved id.
		id: String,
	},
	/// Two nodes share an id.
	#[error("duplicate node id: {0}")]
	DuplicateNode(String),
	/// DAG layering failed and no `on_dag_error` handler was set.
	#[error(transparent)]
	Dag(#[from] DagError),
	/// The configuration was rejected.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
