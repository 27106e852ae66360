//! # Render2d: Deferred Draw Jobs for the Panel
//!
//! Widgets don't draw. They *submit* draw jobs (a fader cap here, a meter
//! strip there, a channel label) into a [`FrameContext`], and the frame is
//! turned into draw calls later, in one pass, by an external
//! [`RenderDispatch`].
//!
//! ## Architecture
//!
//! Every frame follows the same pipeline:
//!
//! ```text
//!   widgets ──submit_sprite / submit_text──┐
//!                                          ▼
//!   ┌────────────────────────────────────────────────────────────┐
//!   │ FrameContext                                               │
//!   │   layer 0: [job 0][job 1][job 2] | free slots ...          │
//!   │   layer 1: [job 0] | free slots ...             ▲ cursor   │
//!   │   per layer: z counter, per-surface batch sets             │
//!   └──────────────────────────┬─────────────────────────────────┘
//!                              │ build_batches
//!                              ▼
//!   same surface + same filter jobs merged under one job
//!                              │ dispatch (layer order, z order)
//!                              ▼
//!   RenderDispatch::draw_job ──► GPU / framebuffer
//!                              │ frame_reset
//!                              ▼
//!   slots back to "free", surface/font pending counts released
//! ```
//!
//! ## Design Decisions
//!
//! **Slots, not allocations.** A layer's jobs live in a `Vec` that only ever
//! grows. The cursor splits it into "used this frame" and "free"; frame
//! reset rewinds the cursor and reinitializes the used slots. A busy panel
//! redraws the same few hundred jobs every frame, so after the first frame
//! submission allocates nothing.
//!
//! **Cheap conservative cull.** Submission rejects jobs whose bounding circle
//! misses the framebuffer. This is not the final clip; it only keeps
//! off-screen widgets (scrolled channel strips) out of the job list.
//!
//! **Batching by filter, not only by texture.** Jobs drawing the same surface
//! with the same visual filter can share one filter computation. The batch
//! builder folds them into a single job carrying a list of
//! [`SpriteBatchEntry`]s.
//!
//! ## Comparison
//!
//! - **Love2D**: automatic batching of consecutive same-texture draws in the
//!   C++ backend. We batch across the whole layer instead of only
//!   consecutive draws, since panel widgets interleave surfaces.
//! - **Macroquad**: immediate mode, vertex buffers rebuilt each frame, no
//!   explicit batching.

pub(crate) mod batch;
pub mod dispatch;
pub mod font;
pub mod frame;
pub mod job;

pub use dispatch::RenderDispatch;
pub use font::{FontError, FontHandle, FontStore, MonospaceShaper, TextShaper};
#[cfg(feature = "text")]
pub use font::FontdueShaper;
pub use frame::{FrameContext, FrameStats};
pub use job::{DrawJob, JobId, JobPayload, SpriteBatchEntry, TextPayload};

use serde::{Deserialize, Serialize};

use crate::math::{Rect, Vec2};
use crate::surface::SurfaceHandle;
use crate::transform::{Placement, stretch_scale};

/// What a job draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapeKind {
    /// A region of a surface.
    #[default]
    Image,
    /// Rectangle outline covering the job rect.
    Rectangle,
    FilledRectangle,
    /// Line from the rect's top-left to its bottom-right.
    Line,
    /// Circle inscribed in the job rect.
    Circle,
    FilledCircle,
    /// Shaped text; only produced by [`FrameContext::submit_text`].
    Text,
}

impl ShapeKind {
    /// Only image jobs need a live surface.
    pub fn needs_surface(self) -> bool {
        self == ShapeKind::Image
    }
}

/// Per-job drawing flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawFlags {
    pub flip_h: bool,
    pub flip_v: bool,
    /// Additive blending instead of alpha blending.
    pub additive: bool,
    /// Allow the batch builder to merge this job with others on its surface.
    pub batch: bool,
}

impl DrawFlags {
    pub const NONE: Self = Self {
        flip_h: false,
        flip_v: false,
        additive: false,
        batch: false,
    };

    pub const BATCH: Self = Self {
        batch: true,
        ..Self::NONE
    };

    pub fn flipped(mut self, flip_h: bool, flip_v: bool) -> Self {
        self.flip_h = flip_h;
        self.flip_v = flip_v;
        self
    }

    pub fn additive(mut self) -> Self {
        self.additive = true;
        self
    }
}

/// Horizontal alignment of text lines within their block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// A sprite (or pure shape) submission. Pass to [`FrameContext::submit_sprite`].
///
/// Without a surface the job is a pure shape drawn in [`color`](Self::color).
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    pub surface: Option<SurfaceHandle>,
    pub shape: ShapeKind,
    pub color: Color,
    /// Screen position of the rect's top-left before rotation.
    pub position: Vec2,
    /// Source region of the surface (or size of the shape).
    pub rect: Rect,
    pub flags: DrawFlags,
    pub opacity: f32,
    /// Radians, clockwise.
    pub rotation: f32,
    /// Rotation pivot offset from the rect center.
    pub rotation_offset: Vec2,
    /// Target on-screen size. `None` draws at the rect's native size.
    pub stretch: Option<Vec2>,
}

impl Sprite {
    /// Draw `rect` of `surface`.
    pub fn new(surface: SurfaceHandle, rect: Rect) -> Self {
        Self {
            surface: Some(surface),
            rect,
            ..Self::shape(ShapeKind::Image, 0, 0)
        }
    }

    /// A pure shape of `width` × `height` pixels.
    pub fn shape(kind: ShapeKind, width: i32, height: i32) -> Self {
        Self {
            surface: None,
            shape: kind,
            color: Color::WHITE,
            position: Vec2::ZERO,
            rect: Rect::from_size(width, height),
            flags: DrawFlags::NONE,
            opacity: 1.0,
            rotation: 0.0,
            rotation_offset: Vec2::ZERO,
            stretch: None,
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.position = Vec2::new(x, y);
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn flags(mut self, flags: DrawFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn rotation(mut self, rotation: f32, offset: Vec2) -> Self {
        self.rotation = rotation;
        self.rotation_offset = offset;
        self
    }

    pub fn stretch(mut self, width: f32, height: f32) -> Self {
        self.stretch = Some(Vec2::new(width, height));
        self
    }

    /// Where this sprite lands on screen (ignoring any layer offset).
    pub fn placement(&self) -> Placement {
        Placement {
            position: self.position,
            rect: self.rect,
            flip_h: self.flags.flip_h,
            flip_v: self.flags.flip_v,
            rotation: self.rotation,
            rotation_offset: self.rotation_offset,
            scale: stretch_scale(&self.rect, self.stretch),
        }
    }
}

/// A text submission. Pass to [`FrameContext::submit_text`].
#[derive(Debug, Clone, PartialEq)]
pub struct TextJob {
    pub font: FontHandle,
    pub text: String,
    pub color: Color,
    /// Screen position of the text block's top-left.
    pub position: Vec2,
    pub align: Align,
    /// Wrap to `x` and keep only the lines that fit in `y`.
    pub max_size: Option<Vec2>,
    pub flags: DrawFlags,
    pub opacity: f32,
    pub rotation: f32,
    pub rotation_offset: Vec2,
    pub stretch: Option<Vec2>,
}

impl TextJob {
    pub fn new(font: FontHandle, text: impl Into<String>) -> Self {
        Self {
            font,
            text: text.into(),
            color: Color::WHITE,
            position: Vec2::ZERO,
            align: Align::Left,
            max_size: None,
            flags: DrawFlags::NONE,
            opacity: 1.0,
            rotation: 0.0,
            rotation_offset: Vec2::ZERO,
            stretch: None,
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.position = Vec2::new(x, y);
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn max_size(mut self, width: f32, height: f32) -> Self {
        self.max_size = Some(Vec2::new(width, height));
        self
    }

    pub fn flags(mut self, flags: DrawFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn rotation(mut self, rotation: f32, offset: Vec2) -> Self {
        self.rotation = rotation;
        self.rotation_offset = offset;
        self
    }

    pub fn stretch(mut self, width: f32, height: f32) -> Self {
        self.stretch = Some(Vec2::new(width, height));
        self
    }
}

/// An RGBA color with floating-point components in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Self = Self { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };
    pub const BLACK: Self = Self { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const RED: Self = Self { r: 1.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const GREEN: Self = Self { r: 0.0, g: 1.0, b: 0.0, a: 1.0 };
    pub const BLUE: Self = Self { r: 0.0, g: 0.0, b: 1.0, a: 1.0 };
    pub const TRANSPARENT: Self = Self { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };

    /// Create a color from RGB (alpha = 1).
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create a color from RGBA.
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}
