//! Bijection between registered objects and flat 24-bit colors.
//!
//! The low bits of a color carry the registry index, the high bits a
//! checksum of that index. Pixels sampled at anti-aliased shape edges are
//! blends of neighbouring colors; they decode to an index whose checksum
//! almost never matches, so [`ColorRegistry::lookup`] rejects them.

use std::fmt;

/// Checksum bits per color; the rest address objects.
pub const DEFAULT_CHECKSUM_BITS: u32 = 6;
const COLOR_BITS: u32 = 24;
// Spreads checksums of neighbouring low indices across the checksum range.
const ENTROPY: u32 = 123;

/// An opaque 24-bit color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
	/// Red channel.
	pub r: u8,
	/// Green channel.
	pub g: u8,
	/// Blue channel.
	pub b: u8,
}

impl Rgb {
	/// Color from its channels.
	pub const fn new(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b }
	}

	/// Color from the low 24 bits of `n`, as `0xRRGGBB`.
	pub fn from_int(n: u32) -> Self {
		Self {
			r: ((n >> 16) & 0xff) as u8,
			g: ((n >> 8) & 0xff) as u8,
			b: (n & 0xff) as u8,
		}
	}

	/// Inverse of [`Rgb::from_int`].
	pub fn to_int(self) -> u32 {
		((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
	}

	/// CSS hex form, e.g. `#0a0b0c`.
	pub fn to_hex(self) -> String {
		format!("#{:06x}", self.to_int())
	}
}

impl fmt::Display for Rgb {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{:06x}", self.to_int())
	}
}

/// Registry of objects addressable by color. Index 0 is reserved for the
/// background and never handed out.
#[derive(Clone, Debug)]
pub struct ColorRegistry<T> {
	entries: Vec<T>,
	checksum_bits: u32,
}

impl<T> Default for ColorRegistry<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> ColorRegistry<T> {
	/// Empty registry with [`DEFAULT_CHECKSUM_BITS`].
	pub fn new() -> Self {
		Self::with_checksum_bits(DEFAULT_CHECKSUM_BITS)
	}

	/// More checksum bits reject more blended colors but shrink capacity.
	pub fn with_checksum_bits(bits: u32) -> Self {
		Self {
			entries: Vec::new(),
			checksum_bits: bits.min(COLOR_BITS - 1),
		}
	}

	fn index_bits(&self) -> u32 {
		COLOR_BITS - self.checksum_bits
	}

	fn checksum(&self, index: u32) -> u32 {
		index.wrapping_mul(ENTROPY) & ((1 << self.checksum_bits) - 1)
	}

	/// Number of slots, the reserved background slot included.
	pub fn capacity(&self) -> usize {
		1 << self.index_bits()
	}

	/// Registered objects.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// No objects registered.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Whether [`ColorRegistry::register`] would fail.
	pub fn is_full(&self) -> bool {
		self.entries.len() + 1 >= self.capacity()
	}

	/// Store `obj` and return its color, or `None` once the registry is full.
	pub fn register(&mut self, obj: T) -> Option<Rgb> {
		if self.is_full() {
			return None;
		}
		self.entries.push(obj);
		let index = self.entries.len() as u32;
		let cs = self.checksum(index);
		Some(Rgb::from_int(index | (cs << self.index_bits())))
	}

	/// Decode a sampled pixel. Background, failed checksums and indices past
	/// the end all yield `None`.
	pub fn lookup(&self, rgb: Rgb) -> Option<&T> {
		let n = rgb.to_int();
		if n == 0 {
			return None;
		}
		let index_bits = self.index_bits();
		let index = n & ((1 << index_bits) - 1);
		let cs = n >> index_bits;
		if index == 0 || cs != self.checksum(index) {
			return None;
		}
		self.entries.get(index as usize - 1)
	}

	/// Forget every object. Colors handed out before are reused.
	pub fn reset(&mut self) {
		self.entries.clear();
	}
}
