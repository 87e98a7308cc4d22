//! Geometry primitives for element bounds and scroll offsets.

use std::ops::{Add, Sub};

/// A point in document coordinates.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
}

impl Point {
    /// Construct a point.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The origin.
    pub fn zero() -> Self {
        Self::default()
    }
}

impl Add for Point {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x.saturating_add(other.x), self.y.saturating_add(other.y))
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x.saturating_sub(other.x), self.y.saturating_sub(other.y))
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// A rectangle with a signed origin and unsigned size.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct Rect {
    /// Top-left corner.
    pub tl: Point,
    /// Width.
    pub w: u32,
    /// Height.
    pub h: u32,
}

impl Rect {
    /// Construct a rectangle from coordinates and size.
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self {
            tl: Point { x, y },
            w,
            h,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        (self.tl.x as i64 + self.w as i64).clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        (self.tl.y as i64 + self.h as i64).clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }

    /// Does the rect contain the point? The right and bottom edges are exclusive.
    pub fn contains_point(&self, p: impl Into<Point>) -> bool {
        let p = p.into();
        p.x >= self.tl.x && p.x < self.right() && p.y >= self.tl.y && p.y < self.bottom()
    }

    /// Return this rect moved by `delta`.
    pub fn shift(&self, delta: Point) -> Self {
        Self {
            tl: self.tl + delta,
            w: self.w,
            h: self.h,
        }
    }
}
