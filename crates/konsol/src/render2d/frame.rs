//! # Frame Context: Per-Layer Job Pools and Submission
//!
//! [`FrameContext`] owns everything that lives for exactly one frame: each
//! layer's job pool and cursor, its z counter, and the per-surface job sets
//! the batch builder consumes. Nothing here is global, so two panels (or two
//! tests) can run side by side.
//!
//! ```text
//!   Layer
//!   ┌─────────────────────────────────────────────────────────┐
//!   │ jobs:   [active][active][merged][active] [free][free]   │
//!   │                                          ▲ cursor       │
//!   │ z_counter: 4        epoch: 17       offset_x: -320      │
//!   │ batch_sets: { surface 2 → [0, 1, 2] }                   │
//!   │ candidates: [surface 2]                                 │
//!   └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Every slot before the cursor was taken this frame; a slot taken this
//! frame can still be inactive when the batch builder merged it into
//! another. Slots are taken in submission order and z is handed out in
//! the same order, so slot order is z order.

use std::collections::HashMap;

use serde::Serialize;

use crate::config::RenderConfig;
use crate::math::{Rect, Vec2};
use crate::surface::{SurfaceHandle, SurfaceStore, VisualFilter};

use super::dispatch::RenderDispatch;
use super::font::FontStore;
use super::job::{DrawJob, JobId, JobPayload, TextPayload};
use super::{ShapeKind, Sprite, TextJob, batch};

/// One z-ordered drawing bucket.
#[derive(Debug, Default)]
pub(crate) struct Layer {
    pub(crate) jobs: Vec<DrawJob>,
    pub(crate) cursor: usize,
    pub(crate) z_counter: u32,
    pub(crate) epoch: u32,
    pub(crate) offset_x: f32,
    /// Batch-eligible jobs per surface, as slot indices.
    pub(crate) batch_sets: HashMap<SurfaceHandle, Vec<usize>>,
    /// Surfaces with at least one batch-eligible job, in first-use order.
    pub(crate) candidates: Vec<SurfaceHandle>,
}

impl Layer {
    /// Take the slot at the cursor, growing the pool when it is exhausted.
    fn take_slot(&mut self) -> usize {
        let slot = self.cursor;
        if slot == self.jobs.len() {
            self.jobs.push(DrawJob::default());
        }
        self.jobs[slot].init();
        self.cursor += 1;
        slot
    }

    fn next_z(&mut self) -> u32 {
        let z = self.z_counter;
        self.z_counter += 1;
        z
    }

    fn active_jobs(&self) -> impl Iterator<Item = &DrawJob> {
        self.jobs[..self.cursor].iter().filter(|job| job.active)
    }
}

/// Counters for the frame in progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameStats {
    /// Frames reset so far.
    pub frame: u64,
    /// Jobs accepted this frame.
    pub submitted: u32,
    /// Sprites rejected because they were entirely off screen.
    pub culled: u32,
    /// Submissions refused for any other reason.
    pub rejected: u32,
    /// Jobs merged away by the batch builder.
    pub batched: u32,
    /// Active jobs per layer.
    pub active_jobs: Vec<usize>,
}

/// Deferred draw-job scheduler for one render target.
#[derive(Debug)]
pub struct FrameContext {
    framebuffer: Rect,
    layers: Vec<Layer>,
    stats: FrameStats,
}

impl FrameContext {
    pub fn new(config: &RenderConfig) -> Self {
        let config = config.clone().validated();
        let layers = (0..config.layers)
            .map(|i| Layer {
                offset_x: config.layer_offset_x(i),
                ..Layer::default()
            })
            .collect();
        Self {
            framebuffer: config.framebuffer(),
            layers,
            stats: FrameStats::default(),
        }
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn framebuffer(&self) -> Rect {
        self.framebuffer
    }

    fn layer_index(&mut self, layer: usize) -> Option<usize> {
        if layer < self.layers.len() {
            Some(layer)
        } else {
            log::warn!(
                "Rejected job for layer {layer} (only {} layers)",
                self.layers.len()
            );
            self.stats.rejected += 1;
            None
        }
    }

    /// Queue a sprite or pure shape for this frame.
    ///
    /// Returns `None`, leaving no trace, when the layer doesn't exist, an
    /// image sprite's surface is gone, the source rect is degenerate, or the
    /// sprite lands entirely outside the framebuffer.
    pub fn submit_sprite(
        &mut self,
        surfaces: &mut SurfaceStore,
        sprite: &Sprite,
        layer: usize,
    ) -> Option<JobId> {
        let layer = self.layer_index(layer)?;

        let surface = sprite.surface.filter(|&h| surfaces.is_alive(h));
        if sprite.shape.needs_surface() && surface.is_none() {
            self.stats.rejected += 1;
            return None;
        }
        if !sprite.rect.is_positive() {
            self.stats.rejected += 1;
            return None;
        }

        let mut placement = sprite.placement();
        placement.position.x += self.layers[layer].offset_x;
        if !circle_hits_rect(
            placement.screen_center(),
            placement.bounding_radius(),
            &self.framebuffer,
        ) {
            log::trace!(
                "Culled sprite at ({}, {}) on layer {layer}",
                placement.position.x,
                placement.position.y
            );
            self.stats.culled += 1;
            return None;
        }

        let filter = surface
            .and_then(|h| surfaces.filter(h))
            .unwrap_or(VisualFilter::IDENTITY);
        let layer_ref = &mut self.layers[layer];
        let slot = layer_ref.take_slot();
        let z_order = layer_ref.next_z();
        layer_ref.jobs[slot] = DrawJob {
            active: true,
            surface,
            shape: sprite.shape,
            color: sprite.color,
            position: placement.position,
            rect: sprite.rect,
            filter,
            opacity: sprite.opacity,
            rotation: sprite.rotation,
            rotation_offset: sprite.rotation_offset,
            stretch: sprite.stretch,
            flags: sprite.flags,
            z_order,
            payload: JobPayload::None,
        };

        if let Some(handle) = surface {
            surfaces.acquire_job_ref(handle);
            if sprite.flags.batch {
                let set = layer_ref.batch_sets.entry(handle).or_default();
                if set.is_empty() {
                    layer_ref.candidates.push(handle);
                }
                set.push(slot);
            }
        }

        self.stats.submitted += 1;
        Some(JobId {
            layer: layer as u32,
            slot: slot as u32,
            epoch: layer_ref.epoch,
        })
    }

    /// Queue a block of text for this frame.
    ///
    /// Empty text queues nothing and returns `None`, but it still counts as a
    /// pending draw on the font.
    pub fn submit_text(&mut self, fonts: &mut FontStore, text: &TextJob, layer: usize) -> Option<JobId> {
        let layer = self.layer_index(layer)?;
        let Some(shaper) = fonts.shaper(text.font) else {
            self.stats.rejected += 1;
            return None;
        };
        if text.text.is_empty() {
            fonts.mark_pending(text.font);
            return None;
        }

        let mut lines = shaper.wrap(&text.text, text.max_size.map(|size| size.x));
        if let Some(max) = text.max_size {
            let fit = (max.y / shaper.line_height()).floor().max(1.0) as usize;
            lines.truncate(fit);
        }
        let size = shaper.measure(&lines);
        fonts.mark_pending(text.font);

        let rect = Rect::from_size(size.x.ceil() as i32, size.y.ceil() as i32);
        let mut position = text.position;
        let layer_ref = &mut self.layers[layer];
        position.x += layer_ref.offset_x;
        let slot = layer_ref.take_slot();
        let z_order = layer_ref.next_z();
        layer_ref.jobs[slot] = DrawJob {
            active: true,
            surface: None,
            shape: ShapeKind::Text,
            color: text.color,
            position,
            rect,
            filter: VisualFilter::IDENTITY,
            opacity: text.opacity,
            rotation: text.rotation,
            rotation_offset: text.rotation_offset,
            stretch: text.stretch,
            flags: text.flags,
            z_order,
            payload: JobPayload::Text(TextPayload {
                font: text.font,
                text: text.text.clone(),
                align: text.align,
                max_size: text.max_size,
                lines,
                size,
            }),
        };

        self.stats.submitted += 1;
        Some(JobId {
            layer: layer as u32,
            slot: slot as u32,
            epoch: layer_ref.epoch,
        })
    }

    /// Merge batch-eligible jobs on every layer. Returns the number of jobs
    /// merged away.
    pub fn build_batches(&mut self, surfaces: &mut SurfaceStore) -> usize {
        (0..self.layers.len())
            .map(|layer| self.build_layer_batches(layer, surfaces))
            .sum()
    }

    /// Merge batch-eligible jobs on one layer.
    pub fn build_layer_batches(&mut self, layer: usize, surfaces: &mut SurfaceStore) -> usize {
        let Some(layer_ref) = self.layers.get_mut(layer) else {
            return 0;
        };
        let merged = batch::build_layer(layer_ref, surfaces);
        if merged > 0 {
            log::debug!("Layer {layer}: merged {merged} jobs into batches");
        }
        self.stats.batched += merged as u32;
        merged
    }

    /// Hand every active job to `dispatch`, layer by layer, in z order.
    pub fn dispatch(&self, dispatch: &mut impl RenderDispatch) {
        for (index, layer) in self.layers.iter().enumerate() {
            dispatch.begin_layer(index);
            for job in layer.active_jobs() {
                dispatch.draw_job(index, job);
            }
        }
    }

    /// End the frame: release every reference the frame's jobs hold and
    /// return all slots to the free state.
    pub fn frame_reset(&mut self, surfaces: &mut SurfaceStore, fonts: &mut FontStore) {
        let mut released = 0;
        for layer in &mut self.layers {
            for job in &mut layer.jobs[..layer.cursor] {
                if job.active {
                    if let Some(handle) = job.surface {
                        if surfaces.release_job_ref(handle) {
                            released += 1;
                        }
                    }
                    if let JobPayload::Text(text) = &job.payload {
                        fonts.reset_pending(text.font);
                    }
                }
                job.init();
            }
            layer.cursor = 0;
            layer.z_counter = 0;
            layer.epoch = layer.epoch.wrapping_add(1);
            layer.batch_sets.clear();
            layer.candidates.clear();
        }

        log::debug!(
            "Frame {} reset: {} submitted, {} culled, {} rejected, {} batched, {released} deferred deletes",
            self.stats.frame,
            self.stats.submitted,
            self.stats.culled,
            self.stats.rejected,
            self.stats.batched
        );
        self.stats = FrameStats {
            frame: self.stats.frame + 1,
            ..FrameStats::default()
        };
    }

    /// Look up a job submitted this frame. Ids from earlier frames, and jobs
    /// merged away by batching, resolve to `None`.
    pub fn job(&self, id: JobId) -> Option<&DrawJob> {
        let layer = self.layers.get(id.layer())?;
        if id.epoch != layer.epoch || id.slot() >= layer.cursor {
            return None;
        }
        layer.jobs.get(id.slot()).filter(|job| job.active)
    }

    /// Active jobs of `layer`, in z order.
    pub fn layer_jobs(&self, layer: usize) -> impl Iterator<Item = &DrawJob> {
        self.layers.get(layer).into_iter().flat_map(Layer::active_jobs)
    }

    pub fn active_job_count(&self, layer: usize) -> usize {
        self.layer_jobs(layer).count()
    }

    /// Slots the layer's pool has ever grown to.
    pub fn pool_size(&self, layer: usize) -> usize {
        self.layers.get(layer).map_or(0, |l| l.jobs.len())
    }

    /// Snapshot of this frame's counters.
    pub fn stats(&self) -> FrameStats {
        FrameStats {
            active_jobs: (0..self.layers.len())
                .map(|layer| self.active_job_count(layer))
                .collect(),
            ..self.stats.clone()
        }
    }
}

fn circle_hits_rect(center: Vec2, radius: f32, rect: &Rect) -> bool {
    let closest = Vec2::new(
        center.x.clamp(rect.left as f32, rect.right as f32),
        center.y.clamp(rect.top as f32, rect.bottom as f32),
    );
    closest.distance_squared(center) <= radius * radius
}
