//! Tick / cooldown state machine around the [`Simulation`], plus DAG mode
//! constraints.

use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, warn};

use super::config::{DagMode, ForceGraphConfig};
use super::dag::{DagLayering, Endpoint};
use super::error::DagError;
use super::simulation::{Force, RadialForce, Simulation};
use super::types::{Graph, Node};

/// Force slot used by the radial DAG modes.
pub const DAG_RADIAL_FORCE: &str = "dagRadial";
const DAG_LEVEL_NODE_RATIO: f64 = 2.0;
const RADIAL_LEVEL_SCALE: f64 = 0.7;

/// Lifecycle of the layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
	/// No data loaded.
	Idle,
	/// Ticking every frame.
	Running,
	/// Cooled down, or stopped by cooldown limits. Reheat restarts it.
	Stopped,
}

/// Outcome of a frame's [`ForceSimulationAdapter::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineEvent {
	/// The layout advanced one step.
	Ticked,
	/// Fired once, on the frame the engine stops.
	Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
	X,
	Y,
}

/// A pin set by DAG mode, with the value it replaced.
struct DagPin {
	node: usize,
	axis: Axis,
	previous: Option<f64>,
}

/// Drives a [`Simulation`] from frames: cooldown, warmup, reheat and DAG constraints.
pub struct ForceSimulationAdapter {
	simulation: Simulation,
	state: EngineState,
	tick_count: usize,
	started_ms: f64,
	cooldown_ticks: Option<usize>,
	cooldown_time_ms: f64,
	dag_pins: Vec<DagPin>,
}

impl ForceSimulationAdapter {
	/// Idle engine with the default forces and `config`'s decay settings.
	pub fn new(config: &ForceGraphConfig) -> Self {
		let mut engine = Self {
			simulation: Simulation::with_default_forces(),
			state: EngineState::Idle,
			tick_count: 0,
			started_ms: 0.0,
			cooldown_ticks: None,
			cooldown_time_ms: 0.0,
			dag_pins: Vec::new(),
		};
		engine.apply_config(config);
		engine
	}

	/// Take over engine parameters. Does not touch the running state.
	pub fn apply_config(&mut self, config: &ForceGraphConfig) {
		self.simulation.alpha_min = config.d3_alpha_min;
		self.simulation.alpha_decay = config.d3_alpha_decay;
		self.simulation.velocity_decay = config.d3_velocity_decay;
		self.cooldown_ticks = config.cooldown_ticks;
		self.cooldown_time_ms = config.cooldown_time.as_secs_f64() * 1000.0;
	}

	/// Current lifecycle state.
	pub fn state(&self) -> EngineState {
		self.state
	}

	/// Current heat.
	pub fn alpha(&self) -> f64 {
		self.simulation.alpha()
	}

	/// The wrapped simulation.
	pub fn simulation(&self) -> &Simulation {
		&self.simulation
	}

	/// Mutable access to the wrapped simulation.
	pub fn simulation_mut(&mut self) -> &mut Simulation {
		&mut self.simulation
	}

	/// Named force, if installed.
	pub fn force(&self, name: &str) -> Option<&dyn Force> {
		self.simulation.force(name)
	}

	/// Named force, downcast to `T`.
	pub fn force_as<T: Force + 'static>(&mut self, name: &str) -> Option<&mut T> {
		self.simulation.force_as(name)
	}

	/// Install, replace or remove (`None`) one named force.
	pub fn set_force(&mut self, name: &str, force: Option<Box<dyn Force>>) -> Option<Box<dyn Force>> {
		self.simulation.set_force(name, force)
	}

	/// Prepare a freshly ingested graph: DAG constraints, warmup ticks, then
	/// a reheat. On error nothing in the engine has changed.
	pub fn load(&mut self, graph: &mut Graph, config: &ForceGraphConfig, now_ms: f64) -> Result<(), DagError> {
		let plan = DagPlan::compute(graph, config)?;
		// pins of the previous graph refer to nodes that are gone
		self.dag_pins.clear();
		self.install_dag(graph, config, plan);

		self.state = EngineState::Stopped;
		self.simulation.set_alpha(1.0);
		for _ in 0..config.warmup_ticks {
			self.simulation.tick(&mut graph.nodes, &graph.links);
		}
		if graph.nodes.is_empty() {
			self.state = EngineState::Idle;
		} else {
			self.reset_countdown(now_ms);
		}
		Ok(())
	}

	/// Recompute DAG constraints on the current graph, e.g. after the mode
	/// changed. Pins set for a previous mode are released first.
	pub fn apply_dag(&mut self, graph: &mut Graph, config: &ForceGraphConfig) -> Result<(), DagError> {
		let plan = DagPlan::compute(graph, config)?;
		self.release_dag_pins(graph);
		self.install_dag(graph, config, plan);
		Ok(())
	}

	fn release_dag_pins(&mut self, graph: &mut Graph) {
		for pin in self.dag_pins.drain(..) {
			if let Some(node) = graph.nodes.get_mut(pin.node) {
				match pin.axis {
					Axis::X => node.fx = pin.previous,
					Axis::Y => node.fy = pin.previous,
				}
			}
		}
	}

	fn install_dag(&mut self, graph: &mut Graph, config: &ForceGraphConfig, plan: Option<DagPlan>) {
		let Some(plan) = plan else {
			self.simulation.set_force(DAG_RADIAL_FORCE, None);
			return;
		};
		let filter = config.dag_node_filter.clone();
		let passes = move |node: &Node| filter.as_ref().is_none_or(|f| f(node));

		let mode = plan.mode;
		match mode {
			DagMode::Td | DagMode::Bu | DagMode::Lr | DagMode::Rl => {
				self.simulation.set_force(DAG_RADIAL_FORCE, None);
				let sign = if matches!(mode, DagMode::Bu | DagMode::Rl) { -1.0 } else { 1.0 };
				let axis = if matches!(mode, DagMode::Lr | DagMode::Rl) { Axis::X } else { Axis::Y };
				for (i, node) in graph.nodes.iter_mut().enumerate() {
					if !passes(node) {
						continue;
					}
					let Some(&depth) = plan.depths.get(node.id()) else {
						continue;
					};
					let value = (depth as f64 - plan.max_depth as f64 / 2.0) * plan.level_distance * sign;
					let slot = match axis {
						Axis::X => &mut node.fx,
						Axis::Y => &mut node.fy,
					};
					self.dag_pins.push(DagPin {
						node: i,
						axis,
						previous: slot.replace(value),
					});
				}
			}
			DagMode::RadialIn | DagMode::RadialOut => {
				let DagPlan {
					depths,
					max_depth,
					level_distance,
					..
				} = plan;
				let depths = Rc::new(depths);
				let radius = move |node: &Node| {
					let depth = depths.get(node.id()).copied().unwrap_or(0);
					let level = if mode == DagMode::RadialIn { max_depth.saturating_sub(depth) } else { depth };
					level as f64 * level_distance
				};
				let force = RadialForce::new(radius).strength(move |node| if passes(node) { 1.0 } else { 0.0 });
				self.simulation.set_force(DAG_RADIAL_FORCE, Some(Box::new(force)));
			}
		}
	}

	/// Restart the cooldown countdown at full heat.
	pub fn reheat(&mut self, now_ms: f64) {
		if self.state == EngineState::Idle {
			return;
		}
		self.simulation.set_alpha(1.0);
		self.reset_countdown(now_ms);
	}

	/// Restart the cooldown countdown at the current heat, e.g. while a node
	/// is dragged.
	pub fn resume(&mut self, now_ms: f64) {
		if self.state != EngineState::Idle {
			self.reset_countdown(now_ms);
		}
	}

	fn reset_countdown(&mut self, now_ms: f64) {
		self.tick_count = 0;
		self.started_ms = now_ms;
		self.state = EngineState::Running;
	}

	/// Advance one frame. Returns `None` unless the engine is running.
	pub fn tick(&mut self, graph: &mut Graph, now_ms: f64) -> Option<EngineEvent> {
		if self.state != EngineState::Running {
			return None;
		}
		self.tick_count += 1;
		let alpha_min = self.simulation.alpha_min;
		let too_many = self.cooldown_ticks.is_some_and(|max| self.tick_count > max);
		let too_long = now_ms - self.started_ms > self.cooldown_time_ms;
		let too_cool = alpha_min > 0.0 && self.simulation.alpha() < alpha_min;
		if too_many || too_long || too_cool {
			self.state = EngineState::Stopped;
			debug!(
				"force engine stopped after {} ticks, alpha {:.4}",
				self.tick_count - 1,
				self.simulation.alpha()
			);
			return Some(EngineEvent::Stopped);
		}
		self.simulation.tick(&mut graph.nodes, &graph.links);
		Some(EngineEvent::Ticked)
	}
}

/// Depth layering result for the configured DAG mode.
struct DagPlan {
	mode: DagMode,
	depths: HashMap<String, usize>,
	max_depth: usize,
	level_distance: f64,
}

impl DagPlan {
	fn compute(graph: &Graph, config: &ForceGraphConfig) -> Result<Option<Self>, DagError> {
		let Some(mode) = config.dag_mode else {
			return Ok(None);
		};
		let mut layering = DagLayering::new(|n: &Node| n.id().to_string());
		if let Some(filter) = config.dag_node_filter.clone() {
			layering = layering.node_filter(move |n| filter(n));
		}
		if let Some(handler) = config.on_dag_error.clone() {
			layering = layering.on_loop(move |ids| {
				warn!("{}", DagError::Cycle(ids.to_vec()));
				handler(ids)
			});
		}
		let links = graph.links.iter().map(|l| {
			let (s, t) = graph.endpoints(l);
			(Endpoint::Node(s), Endpoint::Node(t))
		});
		let depths = layering.depths(&graph.nodes, links)?;

		let max_depth = depths.values().copied().max().unwrap_or(0);
		let level_distance = config.dag_level_distance.unwrap_or_else(|| {
			let scale = if mode.is_radial() { RADIAL_LEVEL_SCALE } else { 1.0 };
			graph.nodes.len() as f64 / max_depth.max(1) as f64 * DAG_LEVEL_NODE_RATIO * scale
		});
		Ok(Some(Self {
			mode,
			depths,
			max_depth,
			level_distance,
		}))
	}
}
