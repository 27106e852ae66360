//! Draw job records and their identifiers.

use crate::math::{Rect, Vec2};
use crate::surface::{SurfaceHandle, VisualFilter};
use crate::transform::{Placement, stretch_scale};

use super::font::FontHandle;
use super::{Align, Color, DrawFlags, ShapeKind};

/// Identifies a submitted job for the rest of the frame.
///
/// The `epoch` is the layer's frame epoch at submission. Frame reset advances
/// it, so an id kept past its frame no longer resolves (the slot it names is
/// being reused by some other job).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId {
    pub(crate) layer: u32,
    pub(crate) slot: u32,
    pub(crate) epoch: u32,
}

impl JobId {
    pub fn layer(self) -> usize {
        self.layer as usize
    }

    pub fn slot(self) -> usize {
        self.slot as usize
    }
}

/// One draw instruction folded into a batched job. Shares the parent job's
/// surface, blend mode and filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteBatchEntry {
    pub position: Vec2,
    pub rect: Rect,
    pub opacity: f32,
    pub rotation: f32,
    pub rotation_offset: Vec2,
    pub stretch: Option<Vec2>,
}

impl SpriteBatchEntry {
    pub fn from_job(job: &DrawJob) -> Self {
        Self {
            position: job.position,
            rect: job.rect,
            opacity: job.opacity,
            rotation: job.rotation,
            rotation_offset: job.rotation_offset,
            stretch: job.stretch,
        }
    }

    /// Placement of this entry, using the parent's flip flags.
    pub fn placement(&self, flags: DrawFlags) -> Placement {
        Placement {
            position: self.position,
            rect: self.rect,
            flip_h: flags.flip_h,
            flip_v: flags.flip_v,
            rotation: self.rotation,
            rotation_offset: self.rotation_offset,
            scale: stretch_scale(&self.rect, self.stretch),
        }
    }
}

/// Shaped text carried by a text job.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPayload {
    pub font: FontHandle,
    pub text: String,
    pub align: Align,
    /// Wrapping/clipping box. `None` = unbounded.
    pub max_size: Option<Vec2>,
    /// Lines after wrapping, in draw order.
    pub lines: Vec<String>,
    /// Measured block size in pixels.
    pub size: Vec2,
}

/// Either text or a batch, never both.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JobPayload {
    #[default]
    None,
    Text(TextPayload),
    Batch(Vec<SpriteBatchEntry>),
}

/// One pending draw operation.
///
/// Jobs are pool slots: they are reinitialized and refilled every frame, never
/// freed. An inactive job (a free slot, or one merged away by the batch
/// builder) is skipped by dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawJob {
    pub(crate) active: bool,
    pub(crate) surface: Option<SurfaceHandle>,
    pub(crate) shape: ShapeKind,
    pub(crate) color: Color,
    pub(crate) position: Vec2,
    pub(crate) rect: Rect,
    pub(crate) filter: VisualFilter,
    pub(crate) opacity: f32,
    pub(crate) rotation: f32,
    pub(crate) rotation_offset: Vec2,
    pub(crate) stretch: Option<Vec2>,
    pub(crate) flags: DrawFlags,
    pub(crate) z_order: u32,
    pub(crate) payload: JobPayload,
}

impl Default for DrawJob {
    fn default() -> Self {
        Self {
            active: false,
            surface: None,
            shape: ShapeKind::Image,
            color: Color::WHITE,
            position: Vec2::ZERO,
            rect: Rect::ZERO,
            filter: VisualFilter::IDENTITY,
            opacity: 1.0,
            rotation: 0.0,
            rotation_offset: Vec2::ZERO,
            stretch: None,
            flags: DrawFlags::NONE,
            z_order: 0,
            payload: JobPayload::None,
        }
    }
}

impl DrawJob {
    /// Reset to a free slot. Drops any text or batch payload.
    pub(crate) fn init(&mut self) {
        *self = Self::default();
    }

    /// Append to this job's batch list, creating it on first use.
    pub(crate) fn push_batch_entry(&mut self, entry: SpriteBatchEntry) {
        match &mut self.payload {
            JobPayload::Batch(entries) => entries.push(entry),
            payload => *payload = JobPayload::Batch(vec![entry]),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn surface(&self) -> Option<SurfaceHandle> {
        self.surface
    }

    pub fn shape(&self) -> ShapeKind {
        self.shape
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Filter snapshot taken from the surface at submission.
    pub fn filter(&self) -> &VisualFilter {
        &self.filter
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn rotation_offset(&self) -> Vec2 {
        self.rotation_offset
    }

    pub fn stretch(&self) -> Option<Vec2> {
        self.stretch
    }

    pub fn flags(&self) -> DrawFlags {
        self.flags
    }

    pub fn z_order(&self) -> u32 {
        self.z_order
    }

    pub fn payload(&self) -> &JobPayload {
        &self.payload
    }

    pub fn text(&self) -> Option<&TextPayload> {
        match &self.payload {
            JobPayload::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Batch entries, empty for an unbatched job.
    pub fn batch_entries(&self) -> &[SpriteBatchEntry] {
        match &self.payload {
            JobPayload::Batch(entries) => entries,
            _ => &[],
        }
    }

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_clears_everything() {
        let mut job = DrawJob {
            active: true,
            z_order: 9,
            opacity: 0.25,
            stretch: Some(Vec2::ZERO),
            ..DrawJob::default()
        };
        job.push_batch_entry(SpriteBatchEntry::from_job(&DrawJob::default()));
        job.init();
        assert_eq!(job, DrawJob::default());
    }

    #[test]
    fn zero_stretch_is_not_unset() {
        let job = DrawJob {
            rect: Rect::from_size(4, 4),
            stretch: Some(Vec2::ZERO),
            ..DrawJob::default()
        };
        assert_eq!(job.placement().scale, Vec2::ZERO);
        assert_eq!(DrawJob::default().stretch(), None);
    }

    #[test]
    fn batch_list_is_created_on_first_push() {
        let mut job = DrawJob::default();
        assert!(job.batch_entries().is_empty());
        let entry = SpriteBatchEntry::from_job(&job);
        job.push_batch_entry(entry);
        job.push_batch_entry(entry);
        assert_eq!(job.batch_entries().len(), 2);
        assert!(job.text().is_none());
    }
}
