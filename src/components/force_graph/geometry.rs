//! Link path geometry: curvature control points and bezier evaluation.

use std::f64::consts::FRAC_PI_2;

/// Zero-length links loop out by this many units per unit of curvature.
pub const LOOP_SCALE: f64 = 70.0;
const LENGTH_SAMPLES: usize = 64;

/// A 2D position, in screen or graph coordinates depending on context.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	/// Horizontal coordinate.
	pub x: f64,
	/// Vertical coordinate, growing downwards.
	pub y: f64,
}

impl Point {
	/// Point at `(x, y)`.
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// Euclidean distance to `other`.
	pub fn distance(self, other: Point) -> f64 {
		(other.x - self.x).hypot(other.y - self.y)
	}
}

/// Bezier parameters of a curved link, between its two endpoints.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ControlPoints {
	/// A single control point.
	Quadratic(Point),
	/// Self-referencing or coincident endpoints.
	Cubic(Point, Point),
}

impl ControlPoints {
	/// Flat coordinates, in drawing order.
	pub fn values(&self) -> Vec<f64> {
		match self {
			ControlPoints::Quadratic(p) => vec![p.x, p.y],
			ControlPoints::Cubic(a, b) => vec![a.x, a.y, b.x, b.y],
		}
	}
}

/// Control points for a link with the given curvature. Zero curvature is a
/// straight line.
pub fn control_points(start: Point, end: Point, curvature: f64) -> Option<ControlPoints> {
	if curvature == 0.0 || !curvature.is_finite() {
		return None;
	}
	let l = start.distance(end);
	if l > 0.0 {
		let a = (end.y - start.y).atan2(end.x - start.x);
		let d = l * curvature;
		Some(ControlPoints::Quadratic(Point::new(
			(start.x + end.x) / 2.0 + d * (a - FRAC_PI_2).cos(),
			(start.y + end.y) / 2.0 + d * (a - FRAC_PI_2).sin(),
		)))
	} else {
		let d = curvature * LOOP_SCALE;
		Some(ControlPoints::Cubic(
			Point::new(end.x, end.y - d),
			Point::new(end.x + d, end.y),
		))
	}
}

/// A straight or curved link path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkPath {
	/// Source end.
	pub start: Point,
	/// Target end.
	pub end: Point,
	/// Straight when `None`.
	pub control: Option<ControlPoints>,
}

impl LinkPath {
	/// Path from `start` to `end`.
	pub fn new(start: Point, end: Point, control: Option<ControlPoints>) -> Self {
		Self {
			start,
			end,
			control,
		}
	}

	/// Point at parameter `t` in `[0, 1]`, on the same curve the link is
	/// stroked with.
	pub fn point_at(&self, t: f64) -> Point {
		let (s, e) = (self.start, self.end);
		match self.control {
			None => Point::new(s.x + (e.x - s.x) * t, s.y + (e.y - s.y) * t),
			Some(ControlPoints::Quadratic(c)) => {
				let mt = 1.0 - t;
				let (a, b, d) = (mt * mt, 2.0 * mt * t, t * t);
				Point::new(a * s.x + b * c.x + d * e.x, a * s.y + b * c.y + d * e.y)
			}
			Some(ControlPoints::Cubic(c1, c2)) => {
				let mt = 1.0 - t;
				let (a, b, c, d) = (mt * mt * mt, 3.0 * mt * mt * t, 3.0 * mt * t * t, t * t * t);
				Point::new(
					a * s.x + b * c1.x + c * c2.x + d * e.x,
					a * s.y + b * c1.y + c * c2.y + d * e.y,
				)
			}
		}
	}

	/// Arc length. Curves are approximated by a polyline.
	pub fn length(&self) -> f64 {
		if self.control.is_none() {
			return self.start.distance(self.end);
		}
		let mut prev = self.start;
		(1..=LENGTH_SAMPLES)
			.map(|i| {
				let p = self.point_at(i as f64 / LENGTH_SAMPLES as f64);
				let d = prev.distance(p);
				prev = p;
				d
			})
			.sum()
	}
}
