//! Math type re-exports and UI-specific geometry types.
//!
//! This module re-exports the `glam` vector type used for positions, sizes,
//! scales and pivots, and provides the small value types a package stores
//! (rectangles, margins, RGBA colors).

// Re-export glam types
pub use glam::{Vec2, IVec2};

use std::fmt;

/// Axis-aligned rectangle with single precision.
#[derive(Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Left edge.
    #[inline]
    pub fn x_min(&self) -> f32 {
        self.x
    }

    /// Right edge.
    #[inline]
    pub fn x_max(&self) -> f32 {
        self.x + self.width
    }

    /// Top edge.
    #[inline]
    pub fn y_min(&self) -> f32 {
        self.y
    }

    /// Bottom edge.
    #[inline]
    pub fn y_max(&self) -> f32 {
        self.y + self.height
    }

    /// Get the center of the rectangle.
    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Get the size of the rectangle.
    #[inline]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rect({}, {}, {}x{})", self.x, self.y, self.width, self.height)
    }
}

/// Integer margin, stored in the package's top/bottom/left/right order.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct Margin {
    pub top: i32,
    pub bottom: i32,
    pub left: i32,
    pub right: i32,
}

/// 8-bit RGBA color.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);
    pub const BLACK: Self = Self::rgba(0, 0, 0, 255);

    /// Create a color from its channels.
    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Channels as floats in `0..=255`.
    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r as f32, self.g as f32, self.b as f32, self.a as f32]
    }

    /// Build from float channels, rounding and clamping to `0..=255`.
    #[inline]
    pub fn from_array(c: [f32; 4]) -> Self {
        let q = |v: f32| v.round().clamp(0.0, 255.0) as u8;
        Self::rgba(q(c[0]), q(c[1]), q(c[2]), q(c[3]))
    }

    /// Parse `#rrggbb` or `#aarrggbb`.
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#')?;
        let v = u32::from_str_radix(hex, 16).ok()?;
        let [a, r, g, b] = v.to_be_bytes();
        match hex.len() {
            6 => Some(Self::rgba(r, g, b, 255)),
            8 => Some(Self::rgba(r, g, b, a)),
            _ => None,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

/// Linear interpolation between two floats.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
