//! Local surface orientation at a contact point.
//!
//! Bounce and slide responses (a dragged fader cap skidding along a rail,
//! say) need the direction of a shape's outline where something hit it.
//! [`tangent_at`] estimates it from the border index: find the outline
//! points just left and right of where the incoming direction arrives, and
//! take the vector between them.
//!
//! ```text
//!            incoming d
//!                │
//!      left  ●   ▼   ●  right          tangent = right - left
//!   ─────────●───●───●──────────       (screen space, after un-flip
//!            ░░░░░░░░░                   and re-rotation)
//! ```
//!
//! The search window starts at 2 px around the contact point and doubles
//! until both sides are found or it reaches half the shape's larger side.

use crate::math::{Rect, Vec2, Vector2d};
use crate::surface::SurfaceStore;

use super::Collider;

const START_WINDOW: f32 = 2.0;

/// Slack for "on the splitting line" and "same direction" tests.
const EPSILON: f32 = 1e-4;

/// Estimate the tangent of `collider`'s outline near the screen `point`,
/// for something arriving along `direction`.
///
/// `None` when the collider has no mask or border index, the direction is
/// zero, or no outline is found on both sides within the window.
pub fn tangent_at(
    surfaces: &SurfaceStore,
    point: Vec2,
    direction: &Vector2d,
    collider: &Collider,
) -> Option<Vector2d> {
    let border = surfaces.mask(collider.surface?)?.border()?;
    let placement = collider.placement();
    if !placement.is_invertible() || direction.length() <= f32::EPSILON {
        return None;
    }

    let local = placement.to_local(point);
    let d = Vector2d::from(placement.vector_to_local(direction.as_vec2()));
    let rect = collider.rect;
    let cap = (rect.width().max(rect.height()) as f32 / 2.0).max(START_WINDOW);

    let mut window = START_WINDOW;
    loop {
        let area = Rect::from_ltrb(
            (local.x - window).floor() as i32,
            (local.y - window).floor() as i32,
            (local.x + window).floor() as i32 + 1,
            (local.y + window).floor() as i32 + 1,
        );
        let mut left: Option<Vector2d> = None;
        let mut right: Option<Vector2d> = None;

        for (x, y) in border.within(area) {
            if !rect.contains(x, y) {
                continue;
            }
            let v = Vector2d::new(x as f32 + 0.5 - local.x, y as f32 + 0.5 - local.y);
            if d.dot(&v) < -EPSILON {
                continue;
            }
            let side = d.cross(&v);
            if side < -EPSILON {
                keep_extreme(&mut left, v, |best, v| best.cross(v) < -EPSILON);
            } else if side > EPSILON {
                keep_extreme(&mut right, v, |best, v| best.cross(v) > EPSILON);
            }
        }

        if let (Some(left), Some(right)) = (left, right) {
            let mut tangent = (&right - &left).as_vec2();
            if collider.flip_h != collider.flip_v {
                tangent = -tangent;
            }
            return Some(placement.vector_to_screen(tangent).into());
        }
        if window >= cap {
            return None;
        }
        window = (window * 2.0).min(cap);
    }
}

/// Replace `best` when `v` lies further out (per `further`); on a tie in
/// direction, the farther point wins.
fn keep_extreme(best: &mut Option<Vector2d>, v: Vector2d, further: impl Fn(&Vector2d, &Vector2d) -> bool) {
    let replace = match best {
        None => true,
        Some(b) => further(b, &v) || (b.cross(&v).abs() <= EPSILON && v.length() > b.length()),
    };
    if replace {
        *best = Some(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::CollisionMask;
    use crate::surface::SurfaceHandle;
    use std::f32::consts::FRAC_PI_2;

    fn solid_block(surfaces: &mut SurfaceStore) -> SurfaceHandle {
        let h = surfaces.create(20, 20, vec![255; 20 * 20 * 4], true).unwrap();
        assert!(surfaces.build_collision_mask(h, true));
        h
    }

    fn assert_direction(v: &Vector2d, expected: Vec2) {
        let n = v.normalized().as_vec2();
        assert!((n - expected).length() < 1e-3, "expected {expected:?}, got {v:?}");
    }

    #[test]
    fn flat_top_edge() {
        let mut surfaces = SurfaceStore::new();
        let h = solid_block(&mut surfaces);
        let c = Collider::new(h, Vec2::new(100.0, 100.0), Rect::from_size(20, 20));
        let down = Vector2d::new(0.0, 1.0);

        let t = tangent_at(&surfaces, Vec2::new(110.0, 100.5), &down, &c).unwrap();
        assert_direction(&t, Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn rotation_and_flips_map_back_to_screen() {
        let mut surfaces = SurfaceStore::new();
        let h = solid_block(&mut surfaces);
        let down = Vector2d::new(0.0, 1.0);
        let base = Collider::new(h, Vec2::new(100.0, 100.0), Rect::from_size(20, 20));

        // A square is its own image under these, so the screen tangent is unchanged.
        for c in [
            base.with_rotation(FRAC_PI_2, Vec2::ZERO),
            base.with_flip(true, false),
            base.with_flip(false, true),
            base.with_flip(true, true),
        ] {
            let t = tangent_at(&surfaces, Vec2::new(110.0, 100.5), &down, &c).unwrap();
            assert_direction(&t, Vec2::new(-1.0, 0.0));
        }
    }

    #[test]
    fn window_doubles_up_to_half_the_larger_side() {
        let mut surfaces = SurfaceStore::new();
        let h = solid_block(&mut surfaces);
        let c = Collider::new(h, Vec2::ZERO, Rect::from_size(20, 20));
        let down = Vector2d::new(0.0, 1.0);
        let above = |y: f32| tangent_at(&surfaces, Vec2::new(10.0, y), &down, &c);

        // Beyond the first 2 px window, found once it has grown to 8 or 10 px.
        for y in [-7.0, -9.0] {
            let t = above(y).unwrap_or_else(|| panic!("no tangent from y = {y}"));
            assert_direction(&t, Vec2::new(-1.0, 0.0));
        }
        // The window stops at 10 px, so the top edge is out of reach.
        assert!(above(-11.0).is_none());
        assert!(above(-30.0).is_none());
    }

    #[test]
    fn diagonal_edge() {
        let mut surfaces = SurfaceStore::new();
        let h = surfaces.create(32, 32, vec![0; 32 * 32 * 4], true).unwrap();
        // Solid below the anti-diagonal.
        let mask = CollisionMask::from_fn(32, 32, |x, y| x + y >= 31, true);
        assert!(surfaces.set_collision_mask(h, mask));
        let c = Collider::new(h, Vec2::ZERO, Rect::from_size(32, 32));

        let t = tangent_at(&surfaces, Vec2::new(16.0, 16.0), &Vector2d::new(1.0, 1.0), &c).unwrap();
        let n = t.normalized();
        assert!(n.x() + n.y() < 1e-3 && (n.x() - n.y()).abs() > 1.0, "{t:?} is not along the edge");
    }

    #[test]
    fn missing_data_gives_none() {
        let mut surfaces = SurfaceStore::new();
        let h = surfaces.create(20, 20, vec![255; 20 * 20 * 4], true).unwrap();
        let c = Collider::new(h, Vec2::ZERO, Rect::from_size(20, 20));
        let down = Vector2d::new(0.0, 1.0);
        assert!(tangent_at(&surfaces, Vec2::new(10.0, 0.5), &down, &c).is_none(), "no mask");

        assert!(surfaces.build_collision_mask(h, false));
        assert!(tangent_at(&surfaces, Vec2::new(10.0, 0.5), &down, &c).is_none(), "no border index");

        assert!(surfaces.build_collision_mask(h, true));
        let zero = Vector2d::default();
        assert!(tangent_at(&surfaces, Vec2::new(10.0, 0.5), &zero, &c).is_none());
        assert!(tangent_at(&surfaces, Vec2::new(10.0, 0.5), &down, &c).is_some());
    }
}
