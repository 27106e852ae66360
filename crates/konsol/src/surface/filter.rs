//! # Visual Filter: Per-Surface Color Transform
//!
//! A [`VisualFilter`] describes how a surface's pixels are recolored before
//! drawing: brightness, contrast, gamma, saturation, inversion and a shift
//! toward a tint color. Recomputing filtered pixels is the expensive part of
//! drawing a filtered sprite, so two things avoid redoing it:
//!
//! - The batch builder groups jobs whose filters match, so one computation
//!   serves the whole group.
//! - [`SurfaceStore::apply_filter`](super::SurfaceStore::apply_filter) only
//!   recomputes when the requested filter differs from the last applied one.
//!
//! Both comparisons use [`VisualFilter::approx_eq`]: component-wise with a
//! tolerance of one 8-bit step, because differences below that are invisible
//! after quantization.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::render2d::Color;

/// Largest per-component difference still considered "the same filter".
pub const FILTER_TOLERANCE: f32 = 1.0 / 255.0;

/// Color-transform parameters. The default is the identity filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualFilter {
    /// Added to each channel, in `[-1, 1]`.
    pub brightness: f32,
    /// Multiplier around mid-grey. 1 = unchanged.
    pub contrast: f32,
    /// Exponent is `1 / gamma`. 1 = unchanged.
    pub gamma: f32,
    /// 0 = greyscale, 1 = unchanged.
    pub saturation: f32,
    pub invert: bool,
    /// Blend factor toward `shift_color`, in `[0, 1]`.
    pub shift_amount: f32,
    pub shift_color: Color,
}

impl VisualFilter {
    pub const IDENTITY: Self = Self {
        brightness: 0.0,
        contrast: 1.0,
        gamma: 1.0,
        saturation: 1.0,
        invert: false,
        shift_amount: 0.0,
        shift_color: Color::WHITE,
    };

    pub fn brightness(mut self, brightness: f32) -> Self {
        self.brightness = brightness;
        self
    }

    pub fn contrast(mut self, contrast: f32) -> Self {
        self.contrast = contrast;
        self
    }

    pub fn gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn saturation(mut self, saturation: f32) -> Self {
        self.saturation = saturation;
        self
    }

    pub fn inverted(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    pub fn shift(mut self, amount: f32, color: Color) -> Self {
        self.shift_amount = amount;
        self.shift_color = color;
        self
    }

    /// `true` when applying the filter would leave every pixel unchanged.
    pub fn is_identity(&self) -> bool {
        self.approx_eq(&Self::IDENTITY)
    }

    /// Components in grouping priority order (booleans as 0/1).
    fn components(&self) -> [f32; 10] {
        [
            self.brightness,
            self.contrast,
            self.gamma,
            self.saturation,
            if self.invert { 1.0 } else { 0.0 },
            self.shift_amount,
            self.shift_color.r,
            self.shift_color.g,
            self.shift_color.b,
            self.shift_color.a,
        ]
    }

    /// Component-wise comparison within [`FILTER_TOLERANCE`].
    pub fn approx_eq(&self, other: &Self) -> bool {
        self.components()
            .iter()
            .zip(other.components().iter())
            .all(|(a, b)| (a - b).abs() <= FILTER_TOLERANCE)
    }

    /// Total order over the components in priority order, each snapped to
    /// the nearest [`FILTER_TOLERANCE`] step first. Used to sort jobs so
    /// that filters equal up to that step end up adjacent; exact values
    /// only break ties between otherwise equal keys.
    pub fn grouping_cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.components(), other.components());
        let snapped = a.iter().zip(b.iter()).map(|(a, b)| step(*a).cmp(&step(*b)));
        let exact = a.iter().zip(b.iter()).map(|(a, b)| a.total_cmp(b));
        snapped
            .chain(exact)
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }

    /// Filter one straight-alpha RGBA8 pixel. Alpha passes through.
    pub fn apply_pixel(&self, [r, g, b, a]: [u8; 4]) -> [u8; 4] {
        let mut rgb = [r, g, b].map(|c| c as f32 / 255.0);

        for c in &mut rgb {
            *c += self.brightness;
            *c = (*c - 0.5) * self.contrast + 0.5;
            if self.gamma > f32::EPSILON && (self.gamma - 1.0).abs() > f32::EPSILON {
                *c = c.clamp(0.0, 1.0).powf(1.0 / self.gamma);
            }
        }

        let luma = 0.299 * rgb[0] + 0.587 * rgb[1] + 0.114 * rgb[2];
        for c in &mut rgb {
            *c = luma + (*c - luma) * self.saturation;
            if self.invert {
                *c = 1.0 - *c;
            }
        }

        let shift = [self.shift_color.r, self.shift_color.g, self.shift_color.b];
        for (c, target) in rgb.iter_mut().zip(shift) {
            *c += (target - *c) * self.shift_amount;
        }

        let [r, g, b] = rgb.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        [r, g, b, a]
    }
}

impl Default for VisualFilter {
    fn default() -> Self {
        Self::IDENTITY
    }
}

fn step(c: f32) -> i64 {
    (c / FILTER_TOLERANCE).round() as i64
}
