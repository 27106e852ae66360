//! # Surface: Pixel Buffers, Pending Draws, and Deferred Deletes
//!
//! A *surface* is an RGBA8 image the panel draws from: a fader cap, a meter
//! segment strip, a font atlas. The content pipeline creates and destroys
//! surfaces; draw jobs and collision queries only borrow them by handle.
//!
//! ## The Handle Pattern
//!
//! Users never hold a `Surface` directly. [`SurfaceStore::create`] returns a
//! [`SurfaceHandle`]: a slot index paired with a generation counter. When a
//! surface is destroyed its slot's generation is bumped, so every handle still
//! floating around (in a widget, in a stale job) resolves to `None` instead of
//! to whatever surface reuses the slot.
//!
//! ```text
//! SurfaceStore
//! ┌──────────────────────────────────────────────────┐
//! │ slots: Vec<Slot>                                 │
//! │   [0] gen 0  Some(fader_cap)   pending_jobs: 12  │
//! │   [1] gen 3  None              ◄── free          │
//! │   [2] gen 1  Some(meter_strip) delete_requested  │
//! │ free_list: [1]                                   │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Deferred Delete
//!
//! Every submitted job that draws a surface holds a *pending-job reference*
//! on it until the frame is reset. A [`destroy`](SurfaceStore::destroy)
//! request while references are outstanding only marks the surface; the
//! release that brings the count back to zero performs the delete. Render
//! dispatch therefore never sees a job whose surface vanished mid-frame.
//!
//! ## Collision Data
//!
//! A surface may carry a [`CollisionMask`] (one bool per pixel, solid where
//! alpha ≥ 128) and, inside it, a [`BorderIndex`](crate::collision::BorderIndex).
//! Both are built on demand, rebuilt together, and dropped with the surface.

pub mod filter;

use std::fmt;
use std::path::Path;

use crate::collision::CollisionMask;

pub use filter::{FILTER_TOLERANCE, VisualFilter};

/// Handle to a surface in the [`SurfaceStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl SurfaceHandle {
    /// Raw slot index. Useful for diagnostics.
    pub fn index(self) -> u32 {
        self.index
    }
}

// ── Errors ──────────────────────────────────────────────────────────────

/// Errors from the content-pipeline side of the store.
#[derive(Debug)]
pub enum SurfaceError {
    /// The image file could not be opened or decoded.
    Decode(String),
    /// The pixel buffer length does not match `width * height * 4`.
    BufferSize { expected: usize, actual: usize },
    /// Width or height is zero.
    Empty,
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceError::Decode(e) => write!(f, "surface decode failed: {e}"),
            SurfaceError::BufferSize { expected, actual } => {
                write!(f, "pixel buffer is {actual} bytes, expected {expected}")
            }
            SurfaceError::Empty => write!(f, "surface has zero width or height"),
        }
    }
}

impl std::error::Error for SurfaceError {}

// ── Surface ─────────────────────────────────────────────────────────────

/// One registered pixel buffer and its bookkeeping.
pub struct Surface {
    width: u32,
    height: u32,
    /// RGBA8, row-major. `None` once released to save memory.
    pixels: Option<Vec<u8>>,
    has_alpha: bool,
    pending_jobs: u32,
    delete_requested: bool,
    filter: VisualFilter,
    applied_filter: Option<VisualFilter>,
    filtered: Option<Vec<u8>>,
    mask: Option<CollisionMask>,
}

impl Surface {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    pub fn pixels(&self) -> Option<&[u8]> {
        self.pixels.as_deref()
    }

    /// Number of live job slots currently drawing this surface.
    pub fn pending_jobs(&self) -> u32 {
        self.pending_jobs
    }

    pub fn delete_requested(&self) -> bool {
        self.delete_requested
    }

    /// The filter new jobs will snapshot.
    pub fn filter(&self) -> VisualFilter {
        self.filter
    }

    pub fn mask(&self) -> Option<&CollisionMask> {
        self.mask.as_ref()
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("has_alpha", &self.has_alpha)
            .field("pending_jobs", &self.pending_jobs)
            .field("delete_requested", &self.delete_requested)
            .field("has_mask", &self.mask.is_some())
            .finish_non_exhaustive()
    }
}

/// What [`SurfaceStore::destroy`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyOutcome {
    /// Removed immediately.
    Destroyed,
    /// Still referenced by pending jobs; removed when the last one is released.
    Deferred,
    /// The handle no longer refers to a live surface.
    Stale,
}

struct Slot {
    generation: u32,
    surface: Option<Surface>,
}

/// Owns every surface. Addressed through [`SurfaceHandle`]s.
#[derive(Default)]
pub struct SurfaceStore {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
}

impl SurfaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live surfaces (including ones awaiting a deferred delete).
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.surface.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register an RGBA8 buffer of `width * height * 4` bytes.
    pub fn create(
        &mut self,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        has_alpha: bool,
    ) -> Result<SurfaceHandle, SurfaceError> {
        if width == 0 || height == 0 {
            return Err(SurfaceError::Empty);
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(SurfaceError::BufferSize {
                expected,
                actual: pixels.len(),
            });
        }

        Ok(self.insert(Surface {
            width,
            height,
            pixels: Some(pixels),
            has_alpha,
            pending_jobs: 0,
            delete_requested: false,
            filter: VisualFilter::IDENTITY,
            applied_filter: None,
            filtered: None,
            mask: None,
        }))
    }

    /// Register a decoded image. The alpha flag follows the image's color type.
    pub fn create_from_image(
        &mut self,
        image: image::DynamicImage,
    ) -> Result<SurfaceHandle, SurfaceError> {
        let has_alpha = image.color().has_alpha();
        let rgba = image.into_rgba8();
        let (width, height) = rgba.dimensions();
        self.create(width, height, rgba.into_raw(), has_alpha)
    }

    /// Decode an image file (PNG or JPEG) into a new surface.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<SurfaceHandle, SurfaceError> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|e| SurfaceError::Decode(format!("{}: {e}", path.display())))?;
        let handle = self.create_from_image(image)?;
        log::debug!("Loaded surface {} from {}", handle.index, path.display());
        Ok(handle)
    }

    /// Duplicate a surface's pixels, alpha flag, filter and mask.
    ///
    /// Returns `None` for a stale handle or a surface whose pixels were released.
    pub fn copy(&mut self, handle: SurfaceHandle) -> Option<SurfaceHandle> {
        let src = self.get(handle)?;
        let copy = Surface {
            width: src.width,
            height: src.height,
            pixels: Some(src.pixels.clone()?),
            has_alpha: src.has_alpha,
            pending_jobs: 0,
            delete_requested: false,
            filter: src.filter,
            applied_filter: None,
            filtered: None,
            mask: src.mask.clone(),
        };
        Some(self.insert(copy))
    }

    fn insert(&mut self, surface: Surface) -> SurfaceHandle {
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.surface = Some(surface);
            SurfaceHandle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                surface: Some(surface),
            });
            SurfaceHandle {
                index,
                generation: 0,
            }
        }
    }

    /// Destroy a surface now, or mark it for deletion once its pending jobs
    /// are released.
    pub fn destroy(&mut self, handle: SurfaceHandle) -> DestroyOutcome {
        let Some(surface) = self.get_mut(handle) else {
            return DestroyOutcome::Stale;
        };
        if surface.pending_jobs > 0 {
            surface.delete_requested = true;
            log::debug!(
                "Surface {} delete deferred ({} pending jobs)",
                handle.index,
                surface.pending_jobs
            );
            return DestroyOutcome::Deferred;
        }
        self.remove(handle);
        DestroyOutcome::Destroyed
    }

    fn remove(&mut self, handle: SurfaceHandle) {
        let slot = &mut self.slots[handle.index as usize];
        slot.surface = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(handle.index);
    }

    pub fn is_alive(&self, handle: SurfaceHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn get(&self, handle: SurfaceHandle) -> Option<&Surface> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.surface.as_ref()
    }

    pub fn get_mut(&mut self, handle: SurfaceHandle) -> Option<&mut Surface> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.surface.as_mut()
    }

    pub fn size(&self, handle: SurfaceHandle) -> Option<(u32, u32)> {
        self.get(handle).map(|s| (s.width, s.height))
    }

    pub fn has_alpha(&self, handle: SurfaceHandle) -> bool {
        self.get(handle).is_some_and(|s| s.has_alpha)
    }

    pub fn pixels(&self, handle: SurfaceHandle) -> Option<&[u8]> {
        self.get(handle)?.pixels.as_deref()
    }

    /// Writable pixels. Any filtered copy is dropped; the collision mask is
    /// left as is until [`build_collision_mask`](Self::build_collision_mask)
    /// is called again.
    pub fn pixels_mut(&mut self, handle: SurfaceHandle) -> Option<&mut [u8]> {
        let surface = self.get_mut(handle)?;
        surface.applied_filter = None;
        surface.filtered = None;
        surface.pixels.as_deref_mut()
    }

    /// Drop the CPU pixel buffer. Dimensions, filter and mask stay.
    pub fn release_pixels(&mut self, handle: SurfaceHandle) -> bool {
        let Some(surface) = self.get_mut(handle) else {
            return false;
        };
        surface.filtered = None;
        surface.applied_filter = None;
        surface.pixels.take().is_some()
    }

    pub fn pending_jobs(&self, handle: SurfaceHandle) -> u32 {
        self.get(handle).map_or(0, |s| s.pending_jobs)
    }

    pub(crate) fn acquire_job_ref(&mut self, handle: SurfaceHandle) -> bool {
        match self.get_mut(handle) {
            Some(surface) => {
                surface.pending_jobs += 1;
                true
            }
            None => false,
        }
    }

    /// Release one pending-job reference. Completes a deferred delete when the
    /// count reaches zero; returns `true` in that case.
    pub(crate) fn release_job_ref(&mut self, handle: SurfaceHandle) -> bool {
        let Some(surface) = self.get_mut(handle) else {
            return false;
        };
        surface.pending_jobs = surface.pending_jobs.saturating_sub(1);
        if surface.pending_jobs == 0 && surface.delete_requested {
            self.remove(handle);
            log::debug!("Surface {} deleted after last pending job", handle.index);
            return true;
        }
        false
    }

    // ── Filters ─────────────────────────────────────────────────────

    pub fn filter(&self, handle: SurfaceHandle) -> Option<VisualFilter> {
        self.get(handle).map(|s| s.filter)
    }

    /// Set the filter that jobs submitted from now on will snapshot.
    pub fn set_filter(&mut self, handle: SurfaceHandle, filter: VisualFilter) -> bool {
        match self.get_mut(handle) {
            Some(surface) => {
                surface.filter = filter;
                true
            }
            None => false,
        }
    }

    /// Make the filtered pixel copy match `filter`.
    ///
    /// Returns `true` when the copy had to be recomputed, `false` when the last
    /// applied filter was already within tolerance (or there is nothing to
    /// filter).
    pub fn apply_filter(&mut self, handle: SurfaceHandle, filter: &VisualFilter) -> bool {
        let Some(surface) = self.get_mut(handle) else {
            return false;
        };
        if surface
            .applied_filter
            .is_some_and(|applied| applied.approx_eq(filter))
        {
            return false;
        }
        let Some(pixels) = surface.pixels.as_deref() else {
            return false;
        };
        let Ok(src) = bytemuck::try_cast_slice::<u8, [u8; 4]>(pixels) else {
            return false;
        };

        let filtered: Vec<[u8; 4]> = if filter.is_identity() {
            src.to_vec()
        } else {
            src.iter().map(|&px| filter.apply_pixel(px)).collect()
        };
        surface.filtered = Some(bytemuck::cast_slice::<[u8; 4], u8>(&filtered).to_vec());
        surface.applied_filter = Some(*filter);
        true
    }

    /// Pixels as of the last [`apply_filter`](Self::apply_filter).
    pub fn filtered_pixels(&self, handle: SurfaceHandle) -> Option<&[u8]> {
        self.get(handle)?.filtered.as_deref()
    }

    // ── Collision data ──────────────────────────────────────────────

    /// (Re)build the collision mask from the alpha channel, optionally with a
    /// border-point index. Any previous mask and index are replaced.
    ///
    /// Fails for stale handles, surfaces without alpha, and surfaces whose
    /// pixels were released.
    pub fn build_collision_mask(&mut self, handle: SurfaceHandle, with_border_index: bool) -> bool {
        let Some(surface) = self.get_mut(handle) else {
            return false;
        };
        if !surface.has_alpha {
            return false;
        }
        let Some(pixels) = surface.pixels.as_deref() else {
            return false;
        };
        let Some(mask) =
            CollisionMask::from_rgba(surface.width, surface.height, pixels, with_border_index)
        else {
            return false;
        };
        log::debug!(
            "Built collision mask for surface {} ({} border points)",
            handle.index,
            mask.border().map_or(0, |b| b.len())
        );
        surface.mask = Some(mask);
        true
    }

    /// Attach a mask built elsewhere (e.g. synthesized, or loaded alongside
    /// the image). Its size must match the surface.
    pub fn set_collision_mask(&mut self, handle: SurfaceHandle, mask: CollisionMask) -> bool {
        match self.get_mut(handle) {
            Some(surface) if surface.width == mask.width() && surface.height == mask.height() => {
                surface.mask = Some(mask);
                true
            }
            _ => false,
        }
    }

    /// Drop the mask and its border index.
    pub fn release_collision_mask(&mut self, handle: SurfaceHandle) -> bool {
        self.get_mut(handle)
            .is_some_and(|surface| surface.mask.take().is_some())
    }

    pub fn mask(&self, handle: SurfaceHandle) -> Option<&CollisionMask> {
        self.get(handle)?.mask.as_ref()
    }
}

impl fmt::Debug for SurfaceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceStore")
            .field("live", &self.len())
            .field("slots", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Opaque square of `size` pixels centered in a `canvas` × `canvas` transparent surface.
    pub(crate) fn square_rgba(canvas: u32, size: u32) -> Vec<u8> {
        let offset = (canvas - size) / 2;
        let mut pixels = vec![0u8; (canvas * canvas * 4) as usize];
        for y in offset..offset + size {
            for x in offset..offset + size {
                let i = ((y * canvas + x) * 4) as usize;
                pixels[i..i + 4].copy_from_slice(&[255, 255, 255, 255]);
            }
        }
        pixels
    }

    fn solid(store: &mut SurfaceStore, w: u32, h: u32) -> SurfaceHandle {
        store
            .create(w, h, vec![255; (w * h * 4) as usize], true)
            .unwrap()
    }

    #[test]
    fn create_validates_buffer() {
        let mut store = SurfaceStore::new();
        assert!(matches!(
            store.create(2, 2, vec![0; 15], true),
            Err(SurfaceError::BufferSize { expected: 16, actual: 15 })
        ));
        assert!(matches!(store.create(0, 2, vec![], true), Err(SurfaceError::Empty)));
        assert!(store.is_empty());
    }

    #[test]
    fn destroyed_handles_go_stale() {
        let mut store = SurfaceStore::new();
        let a = solid(&mut store, 4, 4);
        assert_eq!(store.destroy(a), DestroyOutcome::Destroyed);
        assert!(!store.is_alive(a));

        let b = solid(&mut store, 4, 4);
        assert_eq!(a.index, b.index, "slot should be recycled");
        assert!(store.get(a).is_none(), "old generation must not resolve");
        assert_eq!(store.destroy(a), DestroyOutcome::Stale);
        assert!(store.is_alive(b));
    }

    #[test]
    fn destroy_waits_for_pending_jobs() {
        let mut store = SurfaceStore::new();
        let h = solid(&mut store, 4, 4);
        store.acquire_job_ref(h);
        store.acquire_job_ref(h);

        assert_eq!(store.destroy(h), DestroyOutcome::Deferred);
        assert!(store.is_alive(h));
        assert!(!store.release_job_ref(h));
        assert!(store.is_alive(h));
        assert!(store.release_job_ref(h), "last release performs the delete");
        assert!(!store.is_alive(h));
    }

    #[test]
    fn copy_is_independent() {
        let mut store = SurfaceStore::new();
        let a = solid(&mut store, 2, 1);
        store.set_filter(a, VisualFilter::IDENTITY.inverted(true));
        let b = store.copy(a).unwrap();
        store.pixels_mut(b).unwrap()[0] = 7;
        assert_eq!(store.pixels(a).unwrap()[0], 255);
        assert!(store.filter(b).unwrap().invert);
        assert_eq!(store.pending_jobs(b), 0);
    }

    #[test]
    fn apply_filter_recomputes_only_on_change() {
        let mut store = SurfaceStore::new();
        let h = store.create(1, 1, vec![0, 0, 0, 255], true).unwrap();
        let inverted = VisualFilter::IDENTITY.inverted(true);

        assert!(store.apply_filter(h, &inverted));
        assert_eq!(store.filtered_pixels(h).unwrap(), &[255, 255, 255, 255]);

        let nearly = inverted.brightness(FILTER_TOLERANCE / 4.0);
        assert!(!store.apply_filter(h, &nearly), "imperceptible change");
        assert!(store.apply_filter(h, &VisualFilter::IDENTITY));
        assert_eq!(store.filtered_pixels(h).unwrap(), &[0, 0, 0, 255]);
    }

    #[test]
    fn mask_requires_alpha_and_pixels() {
        let mut store = SurfaceStore::new();
        let opaque = store.create(2, 2, vec![255; 16], false).unwrap();
        assert!(!store.build_collision_mask(opaque, true));

        let h = store.create(10, 10, square_rgba(10, 6), true).unwrap();
        assert!(store.build_collision_mask(h, true));
        assert!(store.mask(h).unwrap().border().is_some());
        assert!(store.release_collision_mask(h));
        assert!(store.mask(h).is_none());

        assert!(store.release_pixels(h));
        assert!(!store.build_collision_mask(h, false));
    }

    #[test]
    fn rebuilding_without_border_drops_old_index() {
        let mut store = SurfaceStore::new();
        let h = store.create(10, 10, square_rgba(10, 4), true).unwrap();
        assert!(store.build_collision_mask(h, true));
        assert!(store.build_collision_mask(h, false));
        assert!(store.mask(h).unwrap().border().is_none());
    }
}
