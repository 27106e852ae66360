//! # Batch: Fold Same-Surface, Same-Filter Jobs Into One
//!
//! Drawing a filtered sprite means recomputing the surface's filtered pixels
//! whenever the filter differs from the last one applied. Ten meter segments
//! drawn from the same strip with the same filter should pay for that once,
//! not ten times.
//!
//! For every surface with at least two batch-eligible jobs on a layer:
//!
//! 1. Sort the jobs by blend mode, then by each filter component, then by z.
//!    Jobs that can share one filter computation end up adjacent.
//! 2. Walk the sorted jobs with a *main* job. A job that differs from the
//!    main one (blend mode, or any filter component beyond tolerance) opens
//!    a new group and becomes its main job.
//! 3. Every job appends a [`SpriteBatchEntry`] to its group's main job. A
//!    non-main job is then merged away: if it would have drawn on top of the
//!    main job (higher z), it takes over the entry list, flags and filter and
//!    the old main slot is cleared; otherwise its own slot is cleared.
//!
//! The group is drawn at the z of its topmost member, so nothing that was
//! above one of its sprites ends up hidden under it.

use crate::surface::SurfaceStore;

use super::frame::Layer;
use super::job::SpriteBatchEntry;

/// Batch one layer. Consumes the layer's job sets; returns the number of
/// jobs merged away.
pub(crate) fn build_layer(layer: &mut Layer, surfaces: &mut SurfaceStore) -> usize {
    let candidates = std::mem::take(&mut layer.candidates);
    let mut sets = std::mem::take(&mut layer.batch_sets);
    let mut merged = 0;

    for surface in candidates {
        let Some(mut set) = sets.remove(&surface) else {
            continue;
        };
        if set.len() < 2 {
            continue;
        }

        let jobs = &mut layer.jobs;
        set.sort_by(|&a, &b| {
            let (a, b) = (&jobs[a], &jobs[b]);
            a.flags
                .additive
                .cmp(&b.flags.additive)
                .then_with(|| a.filter.grouping_cmp(&b.filter))
                .then_with(|| a.z_order.cmp(&b.z_order))
        });

        let mut main: Option<usize> = None;
        for slot in set {
            let current = match main {
                Some(m)
                    if jobs[m].flags.additive == jobs[slot].flags.additive
                        && jobs[m].filter.approx_eq(&jobs[slot].filter) =>
                {
                    m
                }
                _ => {
                    main = Some(slot);
                    slot
                }
            };

            let entry = SpriteBatchEntry::from_job(&jobs[slot]);
            jobs[current].push_batch_entry(entry);
            if current == slot {
                continue;
            }

            if jobs[slot].z_order > jobs[current].z_order {
                let payload = std::mem::take(&mut jobs[current].payload);
                let flags = jobs[current].flags;
                let filter = jobs[current].filter;
                let promoted = &mut jobs[slot];
                promoted.payload = payload;
                promoted.flags = flags;
                promoted.filter = filter;
                jobs[current].init();
                main = Some(slot);
            } else {
                jobs[slot].init();
            }
            surfaces.release_job_ref(surface);
            merged += 1;
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use crate::config::RenderConfig;
    use crate::math::{Rect, Vec2};
    use crate::render2d::{DrawFlags, FontStore, FrameContext, ShapeKind, Sprite};
    use crate::surface::{SurfaceHandle, SurfaceStore, VisualFilter};

    fn setup() -> (FrameContext, SurfaceStore, SurfaceHandle) {
        let mut surfaces = SurfaceStore::new();
        let h = surfaces
            .create(32, 32, vec![200; 32 * 32 * 4], true)
            .unwrap();
        (FrameContext::new(&RenderConfig::new(640, 480, 2)), surfaces, h)
    }

    fn batched(h: SurfaceHandle, x: f32) -> Sprite {
        Sprite::new(h, Rect::from_size(8, 8))
            .at(x, 20.0)
            .flags(DrawFlags::BATCH)
    }

    #[test]
    fn two_identical_jobs_become_one_batch() {
        let (mut frame, mut surfaces, h) = setup();
        frame.submit_sprite(&mut surfaces, &batched(h, 10.0), 0).unwrap();
        frame.submit_sprite(&mut surfaces, &batched(h, 40.0), 0).unwrap();

        assert_eq!(frame.build_batches(&mut surfaces), 1);
        let jobs: Vec<_> = frame.layer_jobs(0).collect();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].batch_entries().len(), 2);
    }

    #[test]
    fn merging_conserves_entries_and_refcount() {
        let (mut frame, mut surfaces, h) = setup();
        let n = 6;
        for i in 0..n {
            frame
                .submit_sprite(&mut surfaces, &batched(h, i as f32 * 10.0), 0)
                .unwrap();
        }
        assert_eq!(surfaces.pending_jobs(h), n);

        assert_eq!(frame.build_batches(&mut surfaces), n as usize - 1);
        let jobs: Vec<_> = frame.layer_jobs(0).collect();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].batch_entries().len(), n as usize);
        assert_eq!(surfaces.pending_jobs(h), 1);

        // The survivor is the topmost job and still owns the last reference.
        assert_eq!(jobs[0].z_order(), n - 1);
        frame.frame_reset(&mut surfaces, &mut FontStore::new());
        assert_eq!(surfaces.pending_jobs(h), 0);
    }

    #[test]
    fn entries_keep_per_sprite_geometry() {
        let (mut frame, mut surfaces, h) = setup();
        let tilted = batched(h, 50.0)
            .opacity(0.5)
            .rotation(1.0, Vec2::new(2.0, 0.0))
            .stretch(16.0, 4.0);
        frame.submit_sprite(&mut surfaces, &batched(h, 10.0), 0).unwrap();
        frame.submit_sprite(&mut surfaces, &tilted, 0).unwrap();
        frame.build_batches(&mut surfaces);

        let job = frame.layer_jobs(0).next().unwrap();
        let second = job.batch_entries()[1];
        assert_eq!(second.position, Vec2::new(50.0, 20.0));
        assert_eq!(second.opacity, 0.5);
        assert_eq!(second.rotation, 1.0);
        assert_eq!(second.stretch, Some(Vec2::new(16.0, 4.0)));
    }

    #[test]
    fn filters_and_blend_modes_split_groups() {
        let (mut frame, mut surfaces, h) = setup();
        frame.submit_sprite(&mut surfaces, &batched(h, 0.0), 0).unwrap();
        frame.submit_sprite(&mut surfaces, &batched(h, 10.0), 0).unwrap();

        surfaces.set_filter(h, VisualFilter::IDENTITY.saturation(0.0));
        frame.submit_sprite(&mut surfaces, &batched(h, 20.0), 0).unwrap();
        frame.submit_sprite(&mut surfaces, &batched(h, 30.0), 0).unwrap();

        surfaces.set_filter(h, VisualFilter::IDENTITY);
        let additive = batched(h, 40.0).flags(DrawFlags::BATCH.additive());
        frame.submit_sprite(&mut surfaces, &additive, 0).unwrap();

        assert_eq!(frame.build_batches(&mut surfaces), 2);
        let mut sizes: Vec<_> = frame
            .layer_jobs(0)
            .map(|job| job.batch_entries().len())
            .collect();
        sizes.sort();
        assert_eq!(sizes, vec![1, 2, 2], "the additive job is a group of its own");
        assert_eq!(surfaces.pending_jobs(h), 3);
    }

    #[test]
    fn near_identical_filters_share_a_group() {
        let (mut frame, mut surfaces, h) = setup();
        surfaces.set_filter(h, VisualFilter::IDENTITY.brightness(0.2));
        frame.submit_sprite(&mut surfaces, &batched(h, 0.0), 0).unwrap();
        surfaces.set_filter(h, VisualFilter::IDENTITY.brightness(0.2 + 0.001));
        frame.submit_sprite(&mut surfaces, &batched(h, 10.0), 0).unwrap();
        assert_eq!(frame.build_batches(&mut surfaces), 1);
    }

    #[test]
    fn near_identical_filters_group_across_lower_priority_components() {
        let (mut frame, mut surfaces, h) = setup();
        let filters = [
            VisualFilter::IDENTITY.brightness(0.2).contrast(0.5),
            VisualFilter::IDENTITY.brightness(0.2).contrast(1.0),
            VisualFilter::IDENTITY.brightness(0.201).contrast(0.5),
        ];
        for (i, filter) in filters.into_iter().enumerate() {
            surfaces.set_filter(h, filter);
            frame.submit_sprite(&mut surfaces, &batched(h, i as f32 * 10.0), 0).unwrap();
        }

        assert_eq!(frame.build_batches(&mut surfaces), 1);
        let mut sizes: Vec<_> = frame
            .layer_jobs(0)
            .map(|job| job.batch_entries().len())
            .collect();
        sizes.sort();
        assert_eq!(sizes, vec![1, 2]);
    }

    #[test]
    fn only_eligible_jobs_on_the_same_layer_merge() {
        let (mut frame, mut surfaces, h) = setup();
        let other = surfaces.create(4, 4, vec![0; 64], true).unwrap();
        frame.submit_sprite(&mut surfaces, &batched(h, 0.0), 0).unwrap();
        frame.submit_sprite(&mut surfaces, &batched(h, 0.0), 1).unwrap();
        frame.submit_sprite(&mut surfaces, &batched(other, 0.0), 0).unwrap();
        let plain = Sprite::new(h, Rect::from_size(8, 8)).at(5.0, 5.0);
        frame.submit_sprite(&mut surfaces, &plain, 0).unwrap();
        let shape = Sprite::shape(ShapeKind::FilledRectangle, 8, 8).flags(DrawFlags::BATCH);
        frame.submit_sprite(&mut surfaces, &shape, 0).unwrap();

        assert_eq!(frame.build_batches(&mut surfaces), 0);
        assert_eq!(frame.active_job_count(0), 4);
    }

    #[test]
    fn building_twice_is_a_no_op() {
        let (mut frame, mut surfaces, h) = setup();
        for x in [0.0, 10.0, 20.0] {
            frame.submit_sprite(&mut surfaces, &batched(h, x), 0).unwrap();
        }
        assert_eq!(frame.build_layer_batches(0, &mut surfaces), 2);
        assert_eq!(frame.build_layer_batches(0, &mut surfaces), 0);
        assert_eq!(frame.layer_jobs(0).next().unwrap().batch_entries().len(), 3);
        assert_eq!(frame.build_layer_batches(9, &mut surfaces), 0);
    }

    #[test]
    fn promotion_keeps_group_on_top() {
        let (mut frame, mut surfaces, h) = setup();
        let below = frame.submit_sprite(&mut surfaces, &batched(h, 0.0), 0).unwrap();
        let middle = Sprite::shape(ShapeKind::FilledRectangle, 8, 8).at(5.0, 20.0);
        frame.submit_sprite(&mut surfaces, &middle, 0).unwrap();
        let above = frame.submit_sprite(&mut surfaces, &batched(h, 10.0), 0).unwrap();
        frame.build_batches(&mut surfaces);

        assert!(frame.job(below).is_none(), "lower slot was merged away");
        let survivor = frame.job(above).unwrap();
        assert_eq!(survivor.z_order(), 2);
        assert_eq!(survivor.batch_entries().len(), 2);
        assert!(survivor.flags().batch);
    }
}
