//! # Konsol: Deferred 2D Draw Scheduling and Pixel-Accurate Hit Testing
//!
//! The core of a 2D widget renderer for control-surface panels: knobs,
//! faders, meters and their labels.
//!
//! - [`surface`]: pixel surfaces behind generational handles, with visual
//!   filters and deferred deletion while draw jobs still reference them.
//! - [`render2d`]: per-layer job pools, z ordering, culling, text layout and
//!   the sprite batch builder. A frame is submit → build batches →
//!   dispatch → reset.
//! - [`collision`]: circle, rect and mask tests between placed shapes,
//!   contact points and outline tangents.
//! - [`transform`]: the local ↔ screen mapping shared by drawing and
//!   hit testing.
//!
//! Start with `use konsol::prelude::*`.

pub mod collision;
pub mod config;
pub mod math;
pub mod prelude;
pub mod render2d;
pub mod surface;
pub mod transform;

#[cfg(feature = "diagnostics")]
pub mod diag;
