//! Math types and glam re-exports.
//!
//! We re-export [glam](https://docs.rs/glam)'s [`Vec2`] so users don't need to
//! depend on it directly. Continuous coordinates (screen positions, local
//! points, stretch) are plain `Vec2`s. [`Vector2d`] wraps one with a memoized
//! length and angle for the places that ask for them repeatedly (tangents,
//! incoming directions). [`Rect`] is an integer pixel rectangle, used for
//! sprite source regions and mask bounds.

use std::cell::Cell;
use std::fmt;

pub use glam::Vec2;

/// A 2D vector that caches its length and angle.
///
/// Both caches are filled on first request and dropped by every mutation.
/// Equality only looks at the components.
#[derive(Clone, Default)]
pub struct Vector2d {
    x: f32,
    y: f32,
    length: Cell<Option<f32>>,
    angle: Cell<Option<f32>>,
}

impl Vector2d {
    pub const fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            length: Cell::new(None),
            angle: Cell::new(None),
        }
    }

    /// Unit vector pointing at `angle` radians (0 = +x, clockwise in y-down screen space).
    pub fn from_angle(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        let v = Self::new(cos, sin);
        v.length.set(Some(1.0));
        v.angle.set(Some(angle));
        v
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn set_x(&mut self, x: f32) {
        self.x = x;
        self.invalidate();
    }

    pub fn set_y(&mut self, y: f32) {
        self.y = y;
        self.invalidate();
    }

    pub fn set(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
        self.invalidate();
    }

    /// Euclidean length, computed once per value.
    pub fn length(&self) -> f32 {
        if let Some(len) = self.length.get() {
            return len;
        }
        let len = self.x.hypot(self.y);
        self.length.set(Some(len));
        len
    }

    /// Angle from the +x axis in radians, in `(-π, π]`.
    pub fn angle(&self) -> f32 {
        if let Some(angle) = self.angle.get() {
            return angle;
        }
        let angle = self.y.atan2(self.x);
        self.angle.set(Some(angle));
        angle
    }

    /// Rotate in place by `angle` radians. The cached length survives.
    pub fn rotate(&mut self, angle: f32) {
        let len = self.length.get();
        let v = rotate(self.as_vec2(), angle);
        self.x = v.x;
        self.y = v.y;
        self.invalidate();
        self.length.set(len);
    }

    /// A copy scaled to unit length. Zero stays zero.
    pub fn normalized(&self) -> Self {
        let len = self.length();
        if len <= f32::EPSILON {
            return Self::default();
        }
        let v = Self::new(self.x / len, self.y / len);
        v.length.set(Some(1.0));
        v.angle.set(self.angle.get());
        v
    }

    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product. Positive when `other` lies
    /// clockwise of `self` in y-down screen space.
    pub fn cross(&self, other: &Self) -> f32 {
        cross(self.as_vec2(), other.as_vec2())
    }

    pub fn as_vec2(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    fn invalidate(&mut self) {
        self.length.set(None);
        self.angle.set(None);
    }
}

impl PartialEq for Vector2d {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl fmt::Debug for Vector2d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector2d({}, {})", self.x, self.y)
    }
}

impl From<Vec2> for Vector2d {
    fn from(v: Vec2) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<&Vector2d> for Vec2 {
    fn from(v: &Vector2d) -> Self {
        v.as_vec2()
    }
}

impl std::ops::Add for &Vector2d {
    type Output = Vector2d;

    fn add(self, rhs: Self) -> Vector2d {
        Vector2d::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for &Vector2d {
    type Output = Vector2d;

    fn sub(self, rhs: Self) -> Vector2d {
        Vector2d::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Neg for &Vector2d {
    type Output = Vector2d;

    fn neg(self) -> Vector2d {
        Vector2d::new(-self.x, -self.y)
    }
}

/// Rotate `v` around the origin by `angle` radians.
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    Vec2::from_angle(angle).rotate(v)
}

/// Mirror `p` across the vertical and/or horizontal axis of a `size` box
/// anchored at the origin.
pub fn reflect(p: Vec2, size: Vec2, flip_x: bool, flip_y: bool) -> Vec2 {
    Vec2::new(
        if flip_x { size.x - p.x } else { p.x },
        if flip_y { size.y - p.y } else { p.y },
    )
}

/// Z component of `a × b`.
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// An integer pixel rectangle. `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const ZERO: Self = Self::from_ltrb(0, 0, 0, 0);

    pub const fn from_ltrb(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Build from an origin and a size.
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::from_ltrb(x, y, x + width, y + height)
    }

    /// A rect anchored at the origin.
    pub const fn from_size(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub const fn width(&self) -> i32 {
        self.right - self.left
    }

    pub const fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// `true` when both dimensions are strictly positive.
    pub const fn is_positive(&self) -> bool {
        self.width() > 0 && self.height() > 0
    }

    pub fn top_left(&self) -> Vec2 {
        Vec2::new(self.left as f32, self.top as f32)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width() as f32, self.height() as f32)
    }

    /// Center in the rect's own coordinates (absolute, not relative to `top_left`).
    pub fn center(&self) -> Vec2 {
        self.top_left() + self.size() * 0.5
    }

    /// Integer containment, exclusive on the far edges.
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }

    /// Continuous containment, exclusive on the far edges.
    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.left as f32
            && p.x < self.right as f32
            && p.y >= self.top as f32
            && p.y < self.bottom as f32
    }

    /// The four corners in clockwise order (y-down), starting at the top-left.
    pub fn corners(&self) -> [Vec2; 4] {
        let (l, t, r, b) = (
            self.left as f32,
            self.top as f32,
            self.right as f32,
            self.bottom as f32,
        );
        [
            Vec2::new(l, t),
            Vec2::new(r, t),
            Vec2::new(r, b),
            Vec2::new(l, b),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn vector_caches_are_invalidated_on_mutation() {
        let mut v = Vector2d::new(3.0, 4.0);
        assert_eq!(v.length(), 5.0);
        v.set_x(0.0);
        assert_eq!(v.length(), 4.0, "stale length after set_x");
        assert!((v.angle() - FRAC_PI_2).abs() < 1e-6);
        v.set(-1.0, 0.0);
        assert!((v.angle() - PI).abs() < 1e-6, "stale angle after set");
    }

    #[test]
    fn rotate_keeps_length() {
        let mut v = Vector2d::new(2.0, 0.0);
        let _ = v.length();
        v.rotate(FRAC_PI_2);
        assert!(v.x().abs() < 1e-6);
        assert!((v.y() - 2.0).abs() < 1e-6);
        assert_eq!(v.length(), 2.0);
    }

    #[test]
    fn normalized_zero_stays_zero() {
        assert_eq!(Vector2d::default().normalized(), Vector2d::default());
        let n = Vector2d::new(0.0, -7.0).normalized();
        assert!((n.y() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cross_sign_matches_screen_orientation() {
        let right = Vector2d::new(1.0, 0.0);
        let down = Vector2d::new(0.0, 1.0);
        assert!(right.cross(&down) > 0.0);
        assert!(down.cross(&right) < 0.0);
    }

    #[test]
    fn rect_dimensions_and_containment() {
        let r = Rect::new(2, 3, 10, 4);
        assert_eq!(r.width(), 10);
        assert_eq!(r.height(), 4);
        assert!(r.contains(2, 3));
        assert!(!r.contains(12, 3));
        assert_eq!(r.center(), Vec2::new(7.0, 5.0));
        assert!(!Rect::new(0, 0, 0, 5).is_positive());
    }

    #[test]
    fn reflect_mirrors_inside_box() {
        let p = reflect(Vec2::new(1.0, 2.0), Vec2::new(10.0, 4.0), true, true);
        assert_eq!(p, Vec2::new(9.0, 2.0));
    }
}
