//! Constant / field-name / function accessors for per-object properties.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use super::config::CanvasObjectMode;
use super::types::{Link, Node};

/// Named property lookup, used by [`Accessor::Field`].
pub trait Attributes {
	/// Value of property `name`, if present.
	fn attr(&self, name: &str) -> Option<Value>;
}

/// Conversion from a looked-up property value.
pub trait FromAttr: Sized {
	/// `None` when the value has the wrong shape.
	fn from_attr(value: &Value) -> Option<Self>;
}

impl FromAttr for f64 {
	fn from_attr(value: &Value) -> Option<Self> {
		value.as_f64()
	}
}

impl FromAttr for bool {
	fn from_attr(value: &Value) -> Option<Self> {
		match value {
			Value::Bool(b) => Some(*b),
			Value::Null => Some(false),
			Value::Number(n) => n.as_f64().map(|n| n != 0.0),
			Value::String(s) => Some(!s.is_empty()),
			Value::Array(_) | Value::Object(_) => Some(true),
		}
	}
}

impl FromAttr for String {
	fn from_attr(value: &Value) -> Option<Self> {
		match value {
			Value::String(s) => Some(s.clone()),
			Value::Number(n) => Some(n.to_string()),
			_ => None,
		}
	}
}

impl FromAttr for Vec<f64> {
	fn from_attr(value: &Value) -> Option<Self> {
		value.as_array()?.iter().map(Value::as_f64).collect()
	}
}

impl FromAttr for CanvasObjectMode {
	fn from_attr(value: &Value) -> Option<Self> {
		value.as_str()?.parse().ok()
	}
}

/// A property that is either the same for every object, read from a named
/// field, or computed from the object.
pub enum Accessor<O, T> {
	/// The same value for every object.
	Constant(T),
	/// Read the named attribute, converting it with [`FromAttr`].
	Field(String),
	/// Computed per object. `None` falls back to the caller's default.
	Fn(Rc<dyn Fn(&O) -> Option<T>>),
}

impl<O, T> Accessor<O, T> {
	/// Read attribute `name`.
	pub fn field(name: impl Into<String>) -> Self {
		Accessor::Field(name.into())
	}

	/// Compute the value with `f`.
	pub fn func(f: impl Fn(&O) -> T + 'static) -> Self {
		Accessor::Fn(Rc::new(move |o| Some(f(o))))
	}

	/// Like [`Accessor::func`], for functions that may yield nothing.
	pub fn func_opt(f: impl Fn(&O) -> Option<T> + 'static) -> Self {
		Accessor::Fn(Rc::new(f))
	}
}

impl<O: Attributes, T: FromAttr + Clone> Accessor<O, T> {
	/// Value for `obj`. `None` when a field is absent or has the wrong type.
	pub fn resolve(&self, obj: &O) -> Option<T> {
		match self {
			Accessor::Constant(v) => Some(v.clone()),
			Accessor::Field(name) => obj.attr(name).as_ref().and_then(T::from_attr),
			Accessor::Fn(f) => f(obj),
		}
	}

	/// Value for `obj`, or `default`.
	pub fn resolve_or(&self, obj: &O, default: T) -> T {
		self.resolve(obj).unwrap_or(default)
	}
}

impl<O, T: Clone> Clone for Accessor<O, T> {
	fn clone(&self) -> Self {
		match self {
			Accessor::Constant(v) => Accessor::Constant(v.clone()),
			Accessor::Field(name) => Accessor::Field(name.clone()),
			Accessor::Fn(f) => Accessor::Fn(Rc::clone(f)),
		}
	}
}

impl<O, T: fmt::Debug> fmt::Debug for Accessor<O, T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Accessor::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
			Accessor::Field(name) => f.debug_tuple("Field").field(name).finish(),
			Accessor::Fn(_) => f.write_str("Fn(..)"),
		}
	}
}

impl<O> From<f64> for Accessor<O, f64> {
	fn from(v: f64) -> Self {
		Accessor::Constant(v)
	}
}

impl<O> From<bool> for Accessor<O, bool> {
	fn from(v: bool) -> Self {
		Accessor::Constant(v)
	}
}

impl<O> From<&str> for Accessor<O, String> {
	fn from(v: &str) -> Self {
		Accessor::Constant(v.to_string())
	}
}

impl<O> From<CanvasObjectMode> for Accessor<O, CanvasObjectMode> {
	fn from(v: CanvasObjectMode) -> Self {
		Accessor::Constant(v)
	}
}

impl Attributes for Node {
	fn attr(&self, name: &str) -> Option<Value> {
		let d = &self.data;
		match name {
			"id" => Some(Value::from(d.id.clone())),
			"label" => d.label.clone().map(Value::from),
			"color" => d.color.clone().map(Value::from),
			"group" => d.group.map(Value::from),
			"val" => d.val.map(Value::from),
			"x" => Some(Value::from(self.x)),
			"y" => Some(Value::from(self.y)),
			"vx" => Some(Value::from(self.vx)),
			"vy" => Some(Value::from(self.vy)),
			"fx" => self.fx.map(Value::from),
			"fy" => self.fy.map(Value::from),
			_ => d.attrs.get(name).cloned(),
		}
	}
}

impl Attributes for Link {
	fn attr(&self, name: &str) -> Option<Value> {
		let d = &self.data;
		match name {
			"source" => Some(Value::from(d.source.clone())),
			"target" => Some(Value::from(d.target.clone())),
			"label" => d.label.clone().map(Value::from),
			"color" => d.color.clone().map(Value::from),
			_ => d.attrs.get(name).cloned(),
		}
	}
}
