//! Convenience re-exports: `use konsol::prelude::*` for the common items.

pub use crate::collision::{
    Circle, Collider, CollisionMask, ContactMode, collide_circles, collide_circles_at,
    collide_rects, collide_rects_at, collide_shapes, collide_shapes_at, collide_shapes_scaled,
    point_in_rect, point_in_shape, tangent_at,
};
pub use crate::config::RenderConfig;
pub use crate::math::{Rect, Vec2, Vector2d};
pub use crate::render2d::{
    Align, Color, DrawFlags, DrawJob, FontHandle, FontStore, FrameContext, FrameStats, JobId,
    MonospaceShaper, RenderDispatch, ShapeKind, Sprite, TextJob, TextShaper,
};
#[cfg(feature = "text")]
pub use crate::render2d::FontdueShaper;
pub use crate::surface::{DestroyOutcome, SurfaceHandle, SurfaceStore, VisualFilter};
pub use crate::transform::Placement;
#[cfg(feature = "diagnostics")]
pub use crate::diag::DiagSender;
