//! # Transform: Screen Space ⇄ Local Rectangle Space
//!
//! Every sprite and every collision shape is a *source rectangle* of some
//! surface, placed on screen by a handful of parameters. [`Placement`] bundles
//! them and maps points both ways:
//!
//! ```text
//!   local (surface pixels)                         screen
//!   ┌──────────── rect ───────────┐
//!   │ p - top_left                │   to_screen   position + scale ·
//!   │   → mirror for flips        │ ────────────►   (pivot + R(θ)·(p' - pivot))
//!   │   → pivot = center + offset │ ◄────────────
//!   └─────────────────────────────┘    to_local    exact inverse, flip last
//! ```
//!
//! `position` is where the rect's top-left lands when there is no rotation and
//! no scaling. Rotation turns around the rect center shifted by
//! `rotation_offset`. Scale applies after rotation, relative to the top-left.
//!
//! Rendering culls with these transforms and the collision engine tests masks
//! with them, so `to_local(to_screen(p)) == p` has to hold within float
//! tolerance for every non-degenerate scale.

use crate::math::{Rect, Vec2, reflect, rotate};

/// Placement of a source rectangle on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Screen position of the rect's top-left corner before rotation.
    pub position: Vec2,
    /// Source rectangle in surface pixels.
    pub rect: Rect,
    pub flip_h: bool,
    pub flip_v: bool,
    /// Rotation in radians, clockwise in y-down screen space.
    pub rotation: f32,
    /// Pivot offset from the rect center.
    pub rotation_offset: Vec2,
    /// Non-uniform scale. Must be non-zero on both axes for `to_local`.
    pub scale: Vec2,
}

impl Placement {
    /// An unrotated, unscaled, unflipped placement.
    pub fn new(position: Vec2, rect: Rect) -> Self {
        Self {
            position,
            rect,
            flip_h: false,
            flip_v: false,
            rotation: 0.0,
            rotation_offset: Vec2::ZERO,
            scale: Vec2::ONE,
        }
    }

    pub fn with_rotation(mut self, rotation: f32, offset: Vec2) -> Self {
        self.rotation = rotation;
        self.rotation_offset = offset;
        self
    }

    pub fn with_flip(mut self, flip_h: bool, flip_v: bool) -> Self {
        self.flip_h = flip_h;
        self.flip_v = flip_v;
        self
    }

    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    /// Rotation pivot relative to the rect's top-left.
    pub fn pivot(&self) -> Vec2 {
        self.rect.size() * 0.5 + self.rotation_offset
    }

    /// `false` when either scale axis collapses the shape to nothing.
    pub fn is_invertible(&self) -> bool {
        self.scale.x.abs() > f32::EPSILON && self.scale.y.abs() > f32::EPSILON
    }

    /// Map a point in surface pixel coordinates to screen coordinates.
    pub fn to_screen(&self, local: Vec2) -> Vec2 {
        let size = self.rect.size();
        let pivot = self.pivot();

        let p = local - self.rect.top_left();
        let p = reflect(p, size, self.flip_h, self.flip_v);
        let p = rotate(p - pivot, self.rotation) + pivot;
        p * self.scale + self.position
    }

    /// Map a screen point back into surface pixel coordinates.
    ///
    /// Degenerate (zero) scale axes are treated as 1 so the result stays finite;
    /// callers that care check [`is_invertible`](Self::is_invertible) first.
    pub fn to_local(&self, screen: Vec2) -> Vec2 {
        let size = self.rect.size();
        let pivot = self.pivot();
        let scale = Vec2::new(
            if self.scale.x.abs() > f32::EPSILON { self.scale.x } else { 1.0 },
            if self.scale.y.abs() > f32::EPSILON { self.scale.y } else { 1.0 },
        );

        let p = (screen - self.position) / scale;
        let p = rotate(p - pivot, -self.rotation) + pivot;
        let p = reflect(p, size, self.flip_h, self.flip_v);
        p + self.rect.top_left()
    }

    /// Map a direction (not a point) into screen orientation: flips, rotation, scale.
    pub fn vector_to_screen(&self, v: Vec2) -> Vec2 {
        let v = Vec2::new(
            if self.flip_h { -v.x } else { v.x },
            if self.flip_v { -v.y } else { v.y },
        );
        rotate(v, self.rotation) * self.scale
    }

    /// Map a screen direction into local orientation.
    pub fn vector_to_local(&self, v: Vec2) -> Vec2 {
        let scale = Vec2::new(
            if self.scale.x.abs() > f32::EPSILON { self.scale.x } else { 1.0 },
            if self.scale.y.abs() > f32::EPSILON { self.scale.y } else { 1.0 },
        );
        let v = rotate(v / scale, -self.rotation);
        Vec2::new(
            if self.flip_h { -v.x } else { v.x },
            if self.flip_v { -v.y } else { v.y },
        )
    }

    /// The rect's four corners in screen space, clockwise from the local top-left.
    pub fn screen_corners(&self) -> [Vec2; 4] {
        self.rect.corners().map(|c| self.to_screen(c))
    }

    /// Screen-space center of the source rect.
    pub fn screen_center(&self) -> Vec2 {
        self.to_screen(self.rect.center())
    }

    /// Radius of the circle around [`screen_center`](Self::screen_center)
    /// enclosing the scaled rect.
    pub fn bounding_radius(&self) -> f32 {
        (self.rect.size() * self.scale.abs()).length() * 0.5
    }
}

/// Scale that stretches `rect` to `stretch`, per axis.
///
/// `None` means "no stretch requested" (scale 1). A zero-size rect axis also
/// yields 1: there is nothing to stretch.
pub fn stretch_scale(rect: &Rect, stretch: Option<Vec2>) -> Vec2 {
    let Some(stretch) = stretch else {
        return Vec2::ONE;
    };
    let w = rect.width();
    let h = rect.height();
    Vec2::new(
        if w != 0 { stretch.x / w as f32 } else { 1.0 },
        if h != 0 { stretch.y / h as f32 } else { 1.0 },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{PI, TAU};

    fn assert_close(a: Vec2, b: Vec2, what: &str) {
        assert!(
            (a - b).length() < 1e-3,
            "{what}: expected {b:?}, got {a:?}"
        );
    }

    #[test]
    fn identity_is_a_translation() {
        let p = Placement::new(Vec2::new(100.0, 50.0), Rect::new(16, 0, 16, 16));
        assert_close(p.to_screen(Vec2::new(16.0, 0.0)), Vec2::new(100.0, 50.0), "top-left");
        assert_close(p.to_screen(Vec2::new(20.0, 3.0)), Vec2::new(104.0, 53.0), "interior");
    }

    #[test]
    fn round_trip_over_parameter_grid() {
        let rects = [Rect::new(0, 0, 10, 10), Rect::new(5, 7, 33, 12)];
        let rotations = [0.0, 0.3, PI / 2.0, 2.5, -1.1];
        let flips = [(false, false), (true, false), (false, true), (true, true)];
        let scales = [Vec2::ONE, Vec2::new(2.0, 0.5), Vec2::new(-1.5, 3.0)];
        let points = [Vec2::new(0.0, 0.0), Vec2::new(3.5, 9.25), Vec2::new(-40.0, 12.0)];

        for rect in rects {
            for &rotation in &rotations {
                for &(fh, fv) in &flips {
                    for &scale in &scales {
                        let placement = Placement::new(Vec2::new(31.0, -12.0), rect)
                            .with_rotation(rotation, Vec2::new(2.0, -3.0))
                            .with_flip(fh, fv)
                            .with_scale(scale);
                        for &p in &points {
                            let back = placement.to_local(placement.to_screen(p));
                            assert_close(back, p, "round trip");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn full_turn_is_identity() {
        let base = Placement::new(Vec2::new(40.0, 40.0), Rect::new(0, 0, 20, 10))
            .with_rotation(0.7, Vec2::new(3.0, 1.0));
        let turned = Placement {
            rotation: base.rotation + TAU,
            ..base
        };
        let p = Vec2::new(13.0, 2.0);
        assert_close(turned.to_screen(p), base.to_screen(p), "2π periodicity");
    }

    #[test]
    fn half_turn_swaps_corners() {
        let p = Placement::new(Vec2::ZERO, Rect::new(0, 0, 10, 20)).with_rotation(PI, Vec2::ZERO);
        assert_close(p.to_screen(Vec2::ZERO), Vec2::new(10.0, 20.0), "corner after π");
    }

    #[test]
    fn flip_mirrors_within_rect() {
        let p = Placement::new(Vec2::ZERO, Rect::new(0, 0, 10, 10)).with_flip(true, false);
        assert_close(p.to_screen(Vec2::new(2.0, 3.0)), Vec2::new(8.0, 3.0), "h-flip");
    }

    #[test]
    fn vectors_round_trip() {
        let p = Placement::new(Vec2::ZERO, Rect::new(0, 0, 8, 8))
            .with_rotation(0.9, Vec2::ZERO)
            .with_flip(true, false)
            .with_scale(Vec2::new(2.0, 3.0));
        let v = Vec2::new(1.0, -2.0);
        assert_close(p.vector_to_local(p.vector_to_screen(v)), v, "vector round trip");
    }

    #[test]
    fn stretch_scale_guards_zero_rects() {
        assert_eq!(stretch_scale(&Rect::new(0, 0, 10, 20), None), Vec2::ONE);
        assert_eq!(
            stretch_scale(&Rect::new(0, 0, 10, 20), Some(Vec2::new(20.0, 10.0))),
            Vec2::new(2.0, 0.5)
        );
        assert_eq!(
            stretch_scale(&Rect::new(0, 0, 0, 20), Some(Vec2::new(20.0, 10.0))),
            Vec2::new(1.0, 0.5)
        );
    }

    #[test]
    fn bounding_radius_is_half_scaled_diagonal() {
        let p = Placement::new(Vec2::ZERO, Rect::new(0, 0, 6, 8)).with_scale(Vec2::splat(2.0));
        assert!((p.bounding_radius() - 10.0).abs() < 1e-5);
    }
}
