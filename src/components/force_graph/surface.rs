//! Minimal immediate-mode drawing interface shared by the visible and the
//! shadow canvas.

use std::collections::HashMap;
use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

/// Canvas-like drawing target. Coordinates are in the current transform's
/// space, except where noted.
pub trait DrawSurface {
	/// Width in pixels.
	fn width(&self) -> f64;
	/// Height in pixels.
	fn height(&self) -> f64;
	/// Push transform and style state.
	fn save(&mut self);
	/// Pop the state pushed by the matching `save`.
	fn restore(&mut self);
	/// Replace the current transform with a uniform scale then translate.
	fn set_transform(&mut self, k: f64, x: f64, y: f64);
	/// Wipe the whole surface to transparent, regardless of transform.
	fn clear(&mut self);
	/// Fill the whole surface, regardless of transform.
	fn fill_background(&mut self, color: &str);
	/// Start a new, empty path.
	fn begin_path(&mut self);
	/// Join the current point back to the subpath start.
	fn close_path(&mut self);
	/// Start a subpath at `(x, y)`.
	fn move_to(&mut self, x: f64, y: f64);
	/// Straight segment to `(x, y)`.
	fn line_to(&mut self, x: f64, y: f64);
	/// Quadratic bezier segment with control point `(cpx, cpy)`.
	fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64);
	/// Cubic bezier segment with two control points.
	fn bezier_curve_to(&mut self, c1x: f64, c1y: f64, c2x: f64, c2y: f64, x: f64, y: f64);
	/// Add a full circle to the current path.
	fn arc(&mut self, x: f64, y: f64, r: f64);
	/// CSS color for subsequent fills.
	fn set_fill(&mut self, color: &str);
	/// CSS color for subsequent strokes.
	fn set_stroke(&mut self, color: &str);
	/// Stroke width in current units.
	fn set_line_width(&mut self, width: f64);
	/// Dash pattern. Empty means solid.
	fn set_line_dash(&mut self, dash: &[f64]);
	/// Fill the current path.
	fn fill(&mut self);
	/// Stroke the current path.
	fn stroke(&mut self);
	/// RGBA of the device pixel at `(x, y)`, if the surface supports read-back.
	fn read_pixel(&self, x: f64, y: f64) -> Option<[u8; 4]>;
}

/// [`DrawSurface`] over a browser 2D canvas context.
pub struct CanvasSurface {
	ctx: CanvasRenderingContext2d,
	width: f64,
	height: f64,
}

impl CanvasSurface {
	/// Surface over `ctx`, whose canvas is `width` by `height` pixels.
	pub fn new(ctx: CanvasRenderingContext2d, width: f64, height: f64) -> Self {
		Self { ctx, width, height }
	}

	/// Track a canvas resize.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}

	/// The wrapped context.
	pub fn context(&self) -> &CanvasRenderingContext2d {
		&self.ctx
	}
}

impl DrawSurface for CanvasSurface {
	fn width(&self) -> f64 {
		self.width
	}

	fn height(&self) -> f64 {
		self.height
	}

	fn save(&mut self) {
		self.ctx.save();
	}

	fn restore(&mut self) {
		self.ctx.restore();
	}

	fn set_transform(&mut self, k: f64, x: f64, y: f64) {
		let _ = self.ctx.set_transform(k, 0.0, 0.0, k, x, y);
	}

	fn clear(&mut self) {
		self.ctx.save();
		let _ = self.ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
		self.ctx.clear_rect(0.0, 0.0, self.width, self.height);
		self.ctx.restore();
	}

	fn fill_background(&mut self, color: &str) {
		self.ctx.save();
		let _ = self.ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
		self.ctx.set_fill_style_str(color);
		self.ctx.fill_rect(0.0, 0.0, self.width, self.height);
		self.ctx.restore();
	}

	fn begin_path(&mut self) {
		self.ctx.begin_path();
	}

	fn close_path(&mut self) {
		self.ctx.close_path();
	}

	fn move_to(&mut self, x: f64, y: f64) {
		self.ctx.move_to(x, y);
	}

	fn line_to(&mut self, x: f64, y: f64) {
		self.ctx.line_to(x, y);
	}

	fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64) {
		self.ctx.quadratic_curve_to(cpx, cpy, x, y);
	}

	fn bezier_curve_to(&mut self, c1x: f64, c1y: f64, c2x: f64, c2y: f64, x: f64, y: f64) {
		self.ctx.bezier_curve_to(c1x, c1y, c2x, c2y, x, y);
	}

	fn arc(&mut self, x: f64, y: f64, r: f64) {
		self.ctx.move_to(x + r, y);
		let _ = self.ctx.arc(x, y, r, 0.0, 2.0 * PI);
	}

	fn set_fill(&mut self, color: &str) {
		self.ctx.set_fill_style_str(color);
	}

	fn set_stroke(&mut self, color: &str) {
		self.ctx.set_stroke_style_str(color);
	}

	fn set_line_width(&mut self, width: f64) {
		self.ctx.set_line_width(width);
	}

	fn set_line_dash(&mut self, dash: &[f64]) {
		let segments: js_sys::Array = dash.iter().map(|d| JsValue::from_f64(*d)).collect();
		let _ = self.ctx.set_line_dash(&segments);
	}

	fn fill(&mut self) {
		self.ctx.fill();
	}

	fn stroke(&mut self) {
		self.ctx.stroke();
	}

	fn read_pixel(&self, x: f64, y: f64) -> Option<[u8; 4]> {
		if !(0.0..self.width).contains(&x) || !(0.0..self.height).contains(&y) {
			return None;
		}
		let data = self.ctx.get_image_data(x, y, 1.0, 1.0).ok()?.data().0;
		match data[..] {
			[r, g, b, a, ..] => Some([r, g, b, a]),
			_ => None,
		}
	}
}

/// One recorded [`DrawSurface`] call. Each variant is named after the
/// method it records and carries its arguments.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
	Save,
	Restore,
	SetTransform(f64, f64, f64),
	Clear,
	FillBackground(String),
	BeginPath,
	ClosePath,
	MoveTo(f64, f64),
	LineTo(f64, f64),
	QuadraticCurveTo(f64, f64, f64, f64),
	BezierCurveTo(f64, f64, f64, f64, f64, f64),
	Arc(f64, f64, f64),
	SetFill(String),
	SetStroke(String),
	SetLineWidth(f64),
	SetLineDash(Vec<f64>),
	Fill,
	Stroke,
}

/// In-memory surface that records calls and serves preset pixels.
#[derive(Clone, Debug, Default)]
pub struct RecordingSurface {
	/// Calls recorded so far.
	pub ops: Vec<DrawOp>,
	pixels: HashMap<(i64, i64), [u8; 4]>,
	wipe_on_clear: bool,
	width: f64,
	height: f64,
}

impl RecordingSurface {
	/// Empty surface with no preset pixels.
	pub fn new(width: f64, height: f64) -> Self {
		Self {
			width,
			height,
			..Default::default()
		}
	}

	/// Make `clear` drop preset pixels, like a real canvas would.
	pub fn wiping_on_clear(mut self) -> Self {
		self.wipe_on_clear = true;
		self
	}

	/// Preset what `read_pixel` returns at `(x, y)`.
	pub fn set_pixel(&mut self, x: i64, y: i64, rgba: [u8; 4]) {
		self.pixels.insert((x, y), rgba);
	}

	/// Drain the recorded calls.
	pub fn take_ops(&mut self) -> Vec<DrawOp> {
		std::mem::take(&mut self.ops)
	}

	/// Circles added to paths, as `(x, y, r)`.
	pub fn arcs(&self) -> Vec<(f64, f64, f64)> {
		self.ops
			.iter()
			.filter_map(|op| match op {
				DrawOp::Arc(x, y, r) => Some((*x, *y, *r)),
				_ => None,
			})
			.collect()
	}

	/// Recorded calls matching `pred`.
	pub fn count(&self, pred: impl Fn(&DrawOp) -> bool) -> usize {
		self.ops.iter().filter(|op| pred(op)).count()
	}
}

impl DrawSurface for RecordingSurface {
	fn width(&self) -> f64 {
		self.width
	}

	fn height(&self) -> f64 {
		self.height
	}

	fn save(&mut self) {
		self.ops.push(DrawOp::Save);
	}

	fn restore(&mut self) {
		self.ops.push(DrawOp::Restore);
	}

	fn set_transform(&mut self, k: f64, x: f64, y: f64) {
		self.ops.push(DrawOp::SetTransform(k, x, y));
	}

	fn clear(&mut self) {
		self.ops.push(DrawOp::Clear);
		if self.wipe_on_clear {
			self.pixels.clear();
		}
	}

	fn fill_background(&mut self, color: &str) {
		self.ops.push(DrawOp::FillBackground(color.to_string()));
	}

	fn begin_path(&mut self) {
		self.ops.push(DrawOp::BeginPath);
	}

	fn close_path(&mut self) {
		self.ops.push(DrawOp::ClosePath);
	}

	fn move_to(&mut self, x: f64, y: f64) {
		self.ops.push(DrawOp::MoveTo(x, y));
	}

	fn line_to(&mut self, x: f64, y: f64) {
		self.ops.push(DrawOp::LineTo(x, y));
	}

	fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64) {
		self.ops.push(DrawOp::QuadraticCurveTo(cpx, cpy, x, y));
	}

	fn bezier_curve_to(&mut self, c1x: f64, c1y: f64, c2x: f64, c2y: f64, x: f64, y: f64) {
		self.ops.push(DrawOp::BezierCurveTo(c1x, c1y, c2x, c2y, x, y));
	}

	fn arc(&mut self, x: f64, y: f64, r: f64) {
		self.ops.push(DrawOp::Arc(x, y, r));
	}

	fn set_fill(&mut self, color: &str) {
		self.ops.push(DrawOp::SetFill(color.to_string()));
	}

	fn set_stroke(&mut self, color: &str) {
		self.ops.push(DrawOp::SetStroke(color.to_string()));
	}

	fn set_line_width(&mut self, width: f64) {
		self.ops.push(DrawOp::SetLineWidth(width));
	}

	fn set_line_dash(&mut self, dash: &[f64]) {
		self.ops.push(DrawOp::SetLineDash(dash.to_vec()));
	}

	fn fill(&mut self) {
		self.ops.push(DrawOp::Fill);
	}

	fn stroke(&mut self) {
		self.ops.push(DrawOp::Stroke);
	}

	fn read_pixel(&self, x: f64, y: f64) -> Option<[u8; 4]> {
		if !(0.0..self.width).contains(&x) || !(0.0..self.height).contains(&y) {
			return None;
		}
		Some(
			self.pixels
				.get(&(x.floor() as i64, y.floor() as i64))
				.copied()
				.unwrap_or([0, 0, 0, 0]),
		)
	}
}
