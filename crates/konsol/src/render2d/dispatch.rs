//! Render dispatch: the boundary between job lists and actual draw calls.

use super::job::DrawJob;

/// Receives a frame's finalized jobs from [`FrameContext::dispatch`](super::FrameContext::dispatch).
///
/// Layers arrive in index order and, within a layer, jobs arrive in z order.
/// Only active jobs are passed on. A batched job carries its sprites in
/// [`DrawJob::batch_entries`]; its own position and rect are those of the
/// job that headed the batch and are not drawn separately.
pub trait RenderDispatch {
    /// Called before the first job of each layer, including empty layers.
    fn begin_layer(&mut self, _layer: usize) {}

    fn draw_job(&mut self, layer: usize, job: &DrawJob);
}
