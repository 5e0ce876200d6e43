//! Pointer hit-testing by reading back the shadow surface.

use std::time::Duration;

use super::color_registry::{ColorRegistry, Rgb};
use super::geometry::Point;
use super::surface::DrawSurface;
use super::types::{ObjectKind, ObjectRef};

/// One hover callback to fire. `object` is the newly hovered object of this
/// kind, or `None` when the pointer left the kind altogether. `previous`
/// is the object of the same kind hovered before, if any.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HoverChange {
	/// Which hover hook to fire.
	pub kind: ObjectKind,
	/// Newly hovered object.
	pub object: Option<ObjectRef>,
	/// Object hovered before.
	pub previous: Option<ObjectRef>,
}

/// Turns shadow pixels under the pointer into hover state.
#[derive(Clone, Debug)]
pub struct ShadowHitTester {
	throttle_ms: f64,
	last_paint_ms: Option<f64>,
	hovered: Option<ObjectRef>,
}

impl ShadowHitTester {
	/// Tester that repaints at most once per `throttle`.
	pub fn new(throttle: Duration) -> Self {
		Self {
			throttle_ms: throttle.as_secs_f64() * 1000.0,
			last_paint_ms: None,
			hovered: None,
		}
	}

	/// Change the repaint interval.
	pub fn set_throttle(&mut self, throttle: Duration) {
		self.throttle_ms = throttle.as_secs_f64() * 1000.0;
	}

	/// Currently hovered object.
	pub fn hovered(&self) -> Option<ObjectRef> {
		self.hovered
	}

	/// Whether the shadow surface should be repainted at `now_ms`. A `true`
	/// answer starts the next throttle window.
	pub fn repaint_due(&mut self, now_ms: f64) -> bool {
		let due = self.last_paint_ms.is_none_or(|last| now_ms - last >= self.throttle_ms);
		if due {
			self.last_paint_ms = Some(now_ms);
		}
		due
	}

	/// Whether the shadow surface has not been painted since the last
	/// [`invalidate`](Self::invalidate), so its pixels cannot be trusted.
	pub fn is_invalidated(&self) -> bool {
		self.last_paint_ms.is_none()
	}

	/// Force a repaint on the next frame, e.g. after the data changed.
	pub fn invalidate(&mut self) {
		self.last_paint_ms = None;
	}

	/// Forget the hovered object without firing callbacks. Object handles
	/// from a replaced dataset are meaningless.
	pub fn reset(&mut self) {
		self.hovered = None;
		self.invalidate();
	}

	/// Decode the shadow pixel under `pointer`, given in surface pixels.
	pub fn sample(
		&self,
		shadow: &dyn DrawSurface,
		registry: &ColorRegistry<ObjectRef>,
		pointer: Option<Point>,
	) -> Option<ObjectRef> {
		let p = pointer?;
		let [r, g, b, _] = shadow.read_pixel(p.x, p.y)?;
		registry.lookup(Rgb::new(r, g, b)).copied()
	}

	/// Sample and update the hover state for one frame. Nothing happens
	/// while a drag is in progress.
	pub fn hit_test(
		&mut self,
		shadow: &dyn DrawSurface,
		registry: &ColorRegistry<ObjectRef>,
		pointer: Option<Point>,
		dragging: bool,
	) -> Vec<HoverChange> {
		if dragging {
			return Vec::new();
		}
		let hit = self.sample(shadow, registry, pointer);
		self.update(hit)
	}

	/// Move the hover to `hit`, returning the callbacks to fire in order.
	pub fn update(&mut self, hit: Option<ObjectRef>) -> Vec<HoverChange> {
		if hit == self.hovered {
			return Vec::new();
		}
		let prev = std::mem::replace(&mut self.hovered, hit);
		let prev_kind = prev.map(ObjectRef::kind);
		let kind = hit.map(ObjectRef::kind);

		let mut changes = Vec::with_capacity(2);
		if let Some(prev_kind) = prev_kind
			&& Some(prev_kind) != kind
		{
			changes.push(HoverChange {
				kind: prev_kind,
				object: None,
				previous: prev,
			});
		}
		if let Some(kind) = kind {
			changes.push(HoverChange {
				kind,
				object: hit,
				previous: if prev_kind == Some(kind) { prev } else { None },
			});
		}
		changes
	}
}
