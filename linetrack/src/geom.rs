//! Points and directed lines in normalized image space
//!
//! All coordinates live in `[0, 1]` with `x` growing to the right and `y`
//! growing downwards, matching image row order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// A point in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn dot(self, other: Point) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Squared euclidean distance to another point
    pub fn distance_sq(self, other: Point) -> f32 {
        let d = self - other;
        d.dot(d)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Point {
    type Output = Point;

    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A directed line segment from `a` to `b`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub a: Point,
    pub b: Point,
}

impl Line {
    pub const fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }

    /// Shorthand for `Line::new(Point::new(ax, ay), Point::new(bx, by))`
    pub const fn from_coords(ax: f32, ay: f32, bx: f32, by: f32) -> Self {
        Self::new(Point::new(ax, ay), Point::new(bx, by))
    }

    /// Vector from `a` to `b`
    pub fn direction(&self) -> Point {
        self.b - self.a
    }

    /// True iff `p` lies strictly on the right of `a -> b`.
    ///
    /// Points exactly on the line are on the `false` side.
    pub fn side(&self, p: Point) -> bool {
        let d = self.direction();
        (p.x - self.a.x) * d.y - (p.y - self.a.y) * d.x < 0.0
    }

    /// Line through `p` perpendicular to this one.
    ///
    /// The returned line starts at `p` and its end lies on the `side == true`
    /// half-plane of this line. Its own `side == true` half-plane is then the
    /// region behind `p` when walking from `a` to `b`.
    pub fn normal(&self, p: Point) -> Line {
        let d = self.direction();
        Line::new(p, Point::new(p.x - d.y, p.y + d.x))
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.a, self.b)
    }
}
