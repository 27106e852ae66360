//! Binary collision masks derived from a surface's alpha channel.

use crate::math::{Rect, Vec2};

use super::border::BorderIndex;

/// Alpha at or above this value counts as solid (half of the 8-bit range).
pub const ALPHA_THRESHOLD: u8 = 128;

/// One bool per pixel: is this pixel part of the shape?
///
/// Also tracks the bounding box of the solid pixels and, when requested, the
/// [`BorderIndex`] derived from them. The index is only ever built from the
/// mask that owns it, so the two cannot drift apart.
#[derive(Debug, Clone)]
pub struct CollisionMask {
    width: u32,
    height: u32,
    solid: Vec<bool>,
    bounds: Option<Rect>,
    border: Option<BorderIndex>,
}

impl CollisionMask {
    /// Build from an RGBA8 buffer. `None` if the buffer doesn't hold
    /// `width * height` pixels.
    pub fn from_rgba(width: u32, height: u32, pixels: &[u8], with_border: bool) -> Option<Self> {
        let pixels: &[[u8; 4]] = bytemuck::try_cast_slice(pixels).ok()?;
        if pixels.len() != width as usize * height as usize {
            return None;
        }
        let solid = pixels.iter().map(|px| px[3] >= ALPHA_THRESHOLD).collect();
        Some(Self::from_bits(width, height, solid, with_border))
    }

    /// Build from a predicate over pixel coordinates.
    pub fn from_fn(
        width: u32,
        height: u32,
        mut is_solid: impl FnMut(u32, u32) -> bool,
        with_border: bool,
    ) -> Self {
        let mut solid = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                solid.push(is_solid(x, y));
            }
        }
        Self::from_bits(width, height, solid, with_border)
    }

    fn from_bits(width: u32, height: u32, solid: Vec<bool>, with_border: bool) -> Self {
        let mut mask = Self {
            width,
            height,
            solid,
            bounds: None,
            border: None,
        };
        mask.bounds = mask.compute_bounds();
        if with_border {
            mask.rebuild_border();
        }
        mask
    }

    fn compute_bounds(&self) -> Option<Rect> {
        let (mut min_x, mut min_y) = (i32::MAX, i32::MAX);
        let (mut max_x, mut max_y) = (i32::MIN, i32::MIN);
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                if self.is_solid(x, y) {
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                }
            }
        }
        (min_x <= max_x).then(|| Rect::from_ltrb(min_x, min_y, max_x + 1, max_y + 1))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Solid test at integer coordinates. Anything outside the mask is empty.
    pub fn is_solid(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return false;
        }
        self.solid[y as usize * self.width as usize + x as usize]
    }

    /// Solid test for a continuous point (the pixel containing it).
    pub fn sample(&self, p: Vec2) -> bool {
        if !p.x.is_finite() || !p.y.is_finite() {
            return false;
        }
        self.is_solid(p.x.floor() as i32, p.y.floor() as i32)
    }

    /// Bounding box of all solid pixels (right/bottom exclusive), `None` if
    /// the mask is empty.
    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    pub fn solid_count(&self) -> usize {
        self.solid.iter().filter(|&&s| s).count()
    }

    pub fn border(&self) -> Option<&BorderIndex> {
        self.border.as_ref()
    }

    /// Re-extract the border index from the current bits.
    pub fn rebuild_border(&mut self) {
        self.border = Some(BorderIndex::extract(self));
    }
}
