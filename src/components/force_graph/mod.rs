//! Canvas force-directed graph: data model, layout engine, painting and
//! shadow-canvas hit testing, hosted by the [`ForceGraphCanvas`] component.

pub mod accessor;
pub mod color_registry;
mod component;
pub mod config;
pub mod dag;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod hit;
pub mod render;
pub mod simulation;
pub mod state;
pub mod surface;
pub mod types;

pub use accessor::Accessor;
pub use component::{ForceGraphCanvas, ForceGraphHandle};
pub use config::{CanvasObjectMode, DagMode, ForceGraphConfig};
pub use error::{ConfigError, DagError, GraphError};
pub use geometry::Point;
pub use state::{Callbacks, ForceGraphState, ViewTransform};
pub use types::{GraphData, GraphLink, GraphNode, Link, Node};
