//! CPU force-integration engine with named, swappable forces.
//!
//! Velocity-Verlet stepping with an annealing `alpha`, in the manner of
//! d3-force. Built-in forces: springs along links, pairwise charge,
//! centering and radial attraction.

use std::any::Any;
use std::rc::Rc;

use super::types::{Link, Node};

const ALPHA_MIN: f64 = 0.001;
const ALPHA_DECAY: f64 = 0.0228;
const VELOCITY_DECAY: f64 = 0.4;

/// Tiny deterministic offset used to separate coincident nodes.
fn jiggle(seed: usize) -> f64 {
	(seed as f64 + 1.0) * 1e-6
}

/// Offset from node `i` towards a coincident node `j`. Antisymmetric in
/// `(i, j)` so the pair is pushed in opposite directions, and the two axes
/// use different seeds so the push is not always diagonal.
fn pair_jiggle(i: usize, j: usize) -> (f64, f64) {
	let (lo, hi) = (i.min(j), i.max(j));
	let sign = if i < j { 1.0 } else { -1.0 };
	(sign * jiggle(lo + hi), sign * jiggle(lo * 7 + hi * 3))
}

/// A force adjusts node velocities once per tick, scaled by `alpha`.
pub trait Force {
	/// Add this force's contribution to each node's `vx`/`vy`.
	fn apply(&mut self, nodes: &mut [Node], links: &[Link], alpha: f64);
	/// Downcasting support for reading a force back by name.
	fn as_any(&self) -> &dyn Any;
	/// Mutable counterpart of [`Force::as_any`].
	fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Velocity-Verlet style integrator cooled by `alpha`, as in d3-force.
pub struct Simulation {
	alpha: f64,
	/// Below this alpha the simulation counts as cool.
	pub alpha_min: f64,
	/// Fraction of the gap to `alpha_target` closed per tick.
	pub alpha_decay: f64,
	/// Alpha converges here. Raised while dragging.
	pub alpha_target: f64,
	/// Fraction of velocity lost per tick.
	pub velocity_decay: f64,
	forces: Vec<(String, Box<dyn Force>)>,
}

impl Default for Simulation {
	fn default() -> Self {
		Self {
			alpha: 1.0,
			alpha_min: ALPHA_MIN,
			alpha_decay: ALPHA_DECAY,
			alpha_target: 0.0,
			velocity_decay: VELOCITY_DECAY,
			forces: Vec::new(),
		}
	}
}

impl Simulation {
	/// Simulation with no forces.
	pub fn new() -> Self {
		Self::default()
	}

	/// Simulation with `link`, `charge` and `center` forces installed.
	pub fn with_default_forces() -> Self {
		let mut sim = Self::new();
		sim.set_force("link", Some(Box::new(LinkForce::default())));
		sim.set_force("charge", Some(Box::new(ManyBodyForce::default())));
		sim.set_force("center", Some(Box::new(CenterForce::default())));
		sim
	}

	/// Current heat.
	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	/// Set the heat directly, e.g. `1.0` to reheat.
	pub fn set_alpha(&mut self, alpha: f64) {
		self.alpha = alpha;
	}

	/// Whether alpha fell below `alpha_min`.
	pub fn is_cool(&self) -> bool {
		self.alpha < self.alpha_min
	}

	/// Named force, if installed.
	pub fn force(&self, name: &str) -> Option<&dyn Force> {
		self.forces
			.iter()
			.find(|(n, _)| n == name)
			.map(|(_, f)| f.as_ref())
	}

	/// Mutable named force.
	pub fn force_mut(&mut self, name: &str) -> Option<&mut dyn Force> {
		match self.forces.iter_mut().find(|(n, _)| n == name) {
			Some((_, f)) => Some(f.as_mut()),
			None => None,
		}
	}

	/// Typed access to a named force, e.g. to tune a [`LinkForce`].
	pub fn force_as<T: Force + 'static>(&mut self, name: &str) -> Option<&mut T> {
		self.force_mut(name)?.as_any_mut().downcast_mut::<T>()
	}

	/// Install, replace or (with `None`) remove a named force, returning the
	/// previous one. Other forces are left untouched.
	pub fn set_force(
		&mut self,
		name: &str,
		force: Option<Box<dyn Force>>,
	) -> Option<Box<dyn Force>> {
		let pos = self.forces.iter().position(|(n, _)| n == name);
		match (pos, force) {
			(Some(i), Some(f)) => Some(std::mem::replace(&mut self.forces[i].1, f)),
			(Some(i), None) => Some(self.forces.remove(i).1),
			(None, Some(f)) => {
				self.forces.push((name.to_string(), f));
				None
			}
			(None, None) => None,
		}
	}

	/// Installed force names, in application order.
	pub fn force_names(&self) -> impl Iterator<Item = &str> {
		self.forces.iter().map(|(n, _)| n.as_str())
	}

	/// Advance one step.
	pub fn tick(&mut self, nodes: &mut [Node], links: &[Link]) {
		self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;

		for (_, force) in &mut self.forces {
			force.apply(nodes, links, self.alpha);
		}

		let keep = 1.0 - self.velocity_decay;
		for node in nodes.iter_mut() {
			match node.fx {
				Some(fx) => {
					node.x = fx;
					node.vx = 0.0;
				}
				None => {
					node.vx *= keep;
					node.x += node.vx;
				}
			}
			match node.fy {
				Some(fy) => {
					node.y = fy;
					node.vy = 0.0;
				}
				None => {
					node.vy *= keep;
					node.y += node.vy;
				}
			}
		}
	}
}

/// Spring between linked nodes.
#[derive(Clone, Debug)]
pub struct LinkForce {
	/// Rest length.
	pub distance: f64,
	/// Overrides the degree-based default strength when set.
	pub strength: Option<f64>,
}

impl Default for LinkForce {
	fn default() -> Self {
		Self {
			distance: 30.0,
			strength: None,
		}
	}
}

impl Force for LinkForce {
	fn apply(&mut self, nodes: &mut [Node], links: &[Link], alpha: f64) {
		let mut degree = vec![0usize; nodes.len()];
		for link in links {
			degree[link.source] += 1;
			degree[link.target] += 1;
		}

		for (i, link) in links.iter().enumerate() {
			let (s, t) = (link.source, link.target);
			if s == t {
				continue;
			}
			let (ds, dt) = (degree[s] as f64, degree[t] as f64);
			let strength = self.strength.unwrap_or(1.0 / ds.min(dt));
			let bias = ds / (ds + dt);

			let mut x = nodes[t].x + nodes[t].vx - nodes[s].x - nodes[s].vx;
			let mut y = nodes[t].y + nodes[t].vy - nodes[s].y - nodes[s].vy;
			if x == 0.0 {
				x = jiggle(i);
			}
			if y == 0.0 {
				y = jiggle(i);
			}
			let l = (x * x + y * y).sqrt();
			let l = (l - self.distance) / l * alpha * strength;
			x *= l;
			y *= l;

			nodes[t].vx -= x * bias;
			nodes[t].vy -= y * bias;
			nodes[s].vx += x * (1.0 - bias);
			nodes[s].vy += y * (1.0 - bias);
		}
	}

	fn as_any(&self) -> &dyn Any {
		self
	}

	fn as_any_mut(&mut self) -> &mut dyn Any {
		self
	}
}

/// Pairwise charge between every two nodes. Negative strength repels.
#[derive(Clone, Debug)]
pub struct ManyBodyForce {
	/// Negative repels, positive attracts.
	pub strength: f64,
	/// Pairs closer than this act as if this far apart.
	pub distance_min: f64,
	/// Pairs farther apart are ignored.
	pub distance_max: f64,
}

impl Default for ManyBodyForce {
	fn default() -> Self {
		Self {
			strength: -30.0,
			distance_min: 1.0,
			distance_max: f64::INFINITY,
		}
	}
}

impl Force for ManyBodyForce {
	fn apply(&mut self, nodes: &mut [Node], _links: &[Link], alpha: f64) {
		let (min2, max2) = (
			self.distance_min * self.distance_min,
			self.distance_max * self.distance_max,
		);
		let deltas: Vec<(f64, f64)> = (0..nodes.len())
			.map(|i| {
				let mut acc = (0.0, 0.0);
				for j in 0..nodes.len() {
					if i == j {
						continue;
					}
					let mut x = nodes[j].x - nodes[i].x;
					let mut y = nodes[j].y - nodes[i].y;
					if x == 0.0 || y == 0.0 {
						let (jx, jy) = pair_jiggle(i, j);
						if x == 0.0 {
							x = jx;
						}
						if y == 0.0 {
							y = jy;
						}
					}
					let mut l = x * x + y * y;
					if l >= max2 {
						continue;
					}
					if l < min2 {
						l = (min2 * l).sqrt();
					}
					let w = self.strength * alpha / l;
					acc.0 += x * w;
					acc.1 += y * w;
				}
				acc
			})
			.collect();

		for (node, (dx, dy)) in nodes.iter_mut().zip(deltas) {
			node.vx += dx;
			node.vy += dy;
		}
	}

	fn as_any(&self) -> &dyn Any {
		self
	}

	fn as_any_mut(&mut self) -> &mut dyn Any {
		self
	}
}

/// Translates all nodes so their mean position sits on `(x, y)`.
#[derive(Clone, Debug)]
pub struct CenterForce {
	/// Target center.
	pub x: f64,
	/// Target center.
	pub y: f64,
	/// `1.0` recenters fully each tick.
	pub strength: f64,
}

impl Default for CenterForce {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			strength: 1.0,
		}
	}
}

impl Force for CenterForce {
	fn apply(&mut self, nodes: &mut [Node], _links: &[Link], _alpha: f64) {
		if nodes.is_empty() {
			return;
		}
		let n = nodes.len() as f64;
		let (sx, sy) = nodes
			.iter()
			.fold((0.0, 0.0), |(sx, sy), node| (sx + node.x, sy + node.y));
		let (dx, dy) = (
			(sx / n - self.x) * self.strength,
			(sy / n - self.y) * self.strength,
		);
		for node in nodes.iter_mut() {
			node.x -= dx;
			node.y -= dy;
		}
	}

	fn as_any(&self) -> &dyn Any {
		self
	}

	fn as_any_mut(&mut self) -> &mut dyn Any {
		self
	}
}

/// Pulls each node towards a circle of per-node radius around `(x, y)`.
#[derive(Clone)]
pub struct RadialForce {
	/// Circle center.
	pub x: f64,
	/// Circle center.
	pub y: f64,
	/// Target distance from the center per node.
	pub radius: Rc<dyn Fn(&Node) -> f64>,
	/// Pull per node. `0.0` leaves a node free.
	pub strength: Rc<dyn Fn(&Node) -> f64>,
}

impl RadialForce {
	/// Force towards `radius` with strength 0.1 for every node.
	pub fn new(radius: impl Fn(&Node) -> f64 + 'static) -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			radius: Rc::new(radius),
			strength: Rc::new(|_| 0.1),
		}
	}

	/// Per-node pull.
	pub fn strength(mut self, strength: impl Fn(&Node) -> f64 + 'static) -> Self {
		self.strength = Rc::new(strength);
		self
	}
}

impl Force for RadialForce {
	fn apply(&mut self, nodes: &mut [Node], _links: &[Link], alpha: f64) {
		for node in nodes.iter_mut() {
			let mut dx = node.x - self.x;
			let mut dy = node.y - self.y;
			if dx == 0.0 {
				dx = 1e-6;
			}
			if dy == 0.0 {
				dy = 1e-6;
			}
			let r = (dx * dx + dy * dy).sqrt();
			let k = ((self.radius)(node) - r) * (self.strength)(node) * alpha / r;
			node.vx += dx * k;
			node.vy += dy * k;
		}
	}

	fn as_any(&self) -> &dyn Any {
		self
	}

	fn as_any_mut(&mut self) -> &mut dyn Any {
		self
	}
}
