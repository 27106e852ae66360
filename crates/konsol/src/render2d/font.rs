//! # Font: Text Shaping Behind a Trait
//!
//! The panel needs exactly two things from a font at submission time: how
//! wide a run of text is, and how tall a line is. Glyph rasterization happens
//! later, in whatever sits behind [`RenderDispatch`](super::RenderDispatch).
//! [`TextShaper`] captures those two queries; wrapping and block measurement
//! are provided on top of them.
//!
//! Two shapers ship with the crate:
//!
//! - [`MonospaceShaper`]: fixed advance per character. Useful for the
//!   console's seven-segment style readouts and for tests.
//! - [`FontdueShaper`] (feature `text`): real TTF/OTF metrics through
//!   [fontdue](https://docs.rs/fontdue).
//!
//! ## Pending Draws
//!
//! Like surfaces, fonts count the text jobs that reference them and defer a
//! destroy until the frame that uses them has been reset.

use std::fmt;

use crate::math::Vec2;
use crate::surface::DestroyOutcome;

/// Width/height queries a text job is shaped with.
pub trait TextShaper {
    /// Distance between consecutive baselines, in pixels.
    fn line_height(&self) -> f32;

    /// Advance width of `text` on a single line, in pixels.
    fn text_width(&self, text: &str) -> f32;

    /// Break `text` into lines no wider than `max_width`.
    ///
    /// Explicit `'\n'` always breaks. Words are never split; a word wider
    /// than `max_width` gets a line of its own.
    fn wrap(&self, text: &str, max_width: Option<f32>) -> Vec<String> {
        let mut lines = Vec::new();
        for paragraph in text.split('\n') {
            let Some(max_width) = max_width else {
                lines.push(paragraph.to_owned());
                continue;
            };
            let mut line = String::new();
            for word in paragraph.split(' ') {
                if line.is_empty() {
                    line.push_str(word);
                    continue;
                }
                let candidate = format!("{line} {word}");
                if self.text_width(&candidate) <= max_width {
                    line = candidate;
                } else {
                    lines.push(std::mem::replace(&mut line, word.to_owned()));
                }
            }
            lines.push(line);
        }
        lines
    }

    /// Size of the block `lines` occupy: widest line × line count.
    fn measure(&self, lines: &[String]) -> Vec2 {
        let width = lines
            .iter()
            .map(|line| self.text_width(line))
            .fold(0.0, f32::max);
        Vec2::new(width, self.line_height() * lines.len() as f32)
    }
}

/// Every character advances by the same amount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceShaper {
    pub advance: f32,
    pub line_height: f32,
}

impl MonospaceShaper {
    pub fn new(advance: f32, line_height: f32) -> Self {
        Self {
            advance,
            line_height,
        }
    }
}

impl TextShaper for MonospaceShaper {
    fn line_height(&self) -> f32 {
        self.line_height
    }

    fn text_width(&self, text: &str) -> f32 {
        self.advance * text.chars().count() as f32
    }
}

/// Metrics from a TrueType/OpenType font at a fixed pixel size.
#[cfg(feature = "text")]
pub struct FontdueShaper {
    font: fontdue::Font,
    px: f32,
    line_height: f32,
}

#[cfg(feature = "text")]
impl FontdueShaper {
    /// Parse font bytes for shaping at `px` pixels.
    pub fn from_bytes(bytes: &[u8], px: f32) -> Result<Self, FontError> {
        let font = fontdue::Font::from_bytes(
            bytes,
            fontdue::FontSettings {
                scale: px,
                ..Default::default()
            },
        )
        .map_err(|e| FontError::Parse(e.to_string()))?;
        // Fonts without horizontal metrics fall back to the usual 1.2 leading.
        let line_height = font
            .horizontal_line_metrics(px)
            .map_or(px * 1.2, |m| m.new_line_size);
        Ok(Self {
            font,
            px,
            line_height,
        })
    }
}

#[cfg(feature = "text")]
impl TextShaper for FontdueShaper {
    fn line_height(&self) -> f32 {
        self.line_height
    }

    fn text_width(&self, text: &str) -> f32 {
        text.chars()
            .map(|ch| self.font.metrics(ch, self.px).advance_width)
            .sum()
    }
}

/// Errors from loading a font.
#[derive(Debug)]
pub enum FontError {
    /// The font file could not be read.
    Io(String),
    /// The bytes are not a usable font.
    Parse(String),
}

impl fmt::Display for FontError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontError::Io(e) => write!(f, "font I/O error: {e}"),
            FontError::Parse(e) => write!(f, "font parse error: {e}"),
        }
    }
}

impl std::error::Error for FontError {}

/// Handle to a font in the [`FontStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

struct FontSlot {
    generation: u32,
    font: Option<FontEntry>,
}

struct FontEntry {
    shaper: Box<dyn TextShaper>,
    pending_draws: u32,
    delete_requested: bool,
}

/// Owns every font.
#[derive(Default)]
pub struct FontStore {
    slots: Vec<FontSlot>,
    free_list: Vec<u32>,
}

impl FontStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shaper.
    pub fn insert(&mut self, shaper: impl TextShaper + 'static) -> FontHandle {
        let entry = FontEntry {
            shaper: Box::new(shaper),
            pending_draws: 0,
            delete_requested: false,
        };
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.font = Some(entry);
            FontHandle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(FontSlot {
                generation: 0,
                font: Some(entry),
            });
            FontHandle {
                index,
                generation: 0,
            }
        }
    }

    /// Load a TTF/OTF file for shaping at `px` pixels.
    #[cfg(feature = "text")]
    pub fn load(&mut self, path: impl AsRef<std::path::Path>, px: f32) -> Result<FontHandle, FontError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| FontError::Io(format!("{}: {e}", path.display())))?;
        let handle = self.from_bytes(&bytes, px)?;
        log::debug!("Loaded font {} from {} at {px}px", handle.index, path.display());
        Ok(handle)
    }

    #[cfg(feature = "text")]
    pub fn from_bytes(&mut self, bytes: &[u8], px: f32) -> Result<FontHandle, FontError> {
        Ok(self.insert(FontdueShaper::from_bytes(bytes, px)?))
    }

    fn entry(&self, handle: FontHandle) -> Option<&FontEntry> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.font.as_ref()
    }

    fn entry_mut(&mut self, handle: FontHandle) -> Option<&mut FontEntry> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.font.as_mut()
    }

    pub fn is_alive(&self, handle: FontHandle) -> bool {
        self.entry(handle).is_some()
    }

    pub fn shaper(&self, handle: FontHandle) -> Option<&dyn TextShaper> {
        self.entry(handle).map(|e| e.shaper.as_ref())
    }

    /// Text jobs submitted against this font since the last frame reset.
    pub fn pending_draws(&self, handle: FontHandle) -> u32 {
        self.entry(handle).map_or(0, |e| e.pending_draws)
    }

    /// Destroy now, or once the current frame's text jobs have been reset.
    pub fn destroy(&mut self, handle: FontHandle) -> DestroyOutcome {
        let Some(entry) = self.entry_mut(handle) else {
            return DestroyOutcome::Stale;
        };
        if entry.pending_draws > 0 {
            entry.delete_requested = true;
            log::debug!("Font {} delete deferred", handle.index);
            return DestroyOutcome::Deferred;
        }
        self.remove(handle);
        DestroyOutcome::Destroyed
    }

    fn remove(&mut self, handle: FontHandle) {
        let slot = &mut self.slots[handle.index as usize];
        slot.font = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(handle.index);
    }

    pub(crate) fn mark_pending(&mut self, handle: FontHandle) -> bool {
        match self.entry_mut(handle) {
            Some(entry) => {
                entry.pending_draws += 1;
                true
            }
            None => false,
        }
    }

    /// Zero the pending count, completing a deferred delete.
    pub(crate) fn reset_pending(&mut self, handle: FontHandle) {
        let Some(entry) = self.entry_mut(handle) else {
            return;
        };
        entry.pending_draws = 0;
        if entry.delete_requested {
            self.remove(handle);
            log::debug!("Font {} deleted after frame reset", handle.index);
        }
    }
}

impl fmt::Debug for FontStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontStore")
            .field("slots", &self.slots.len())
            .field("free", &self.free_list.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono() -> MonospaceShaper {
        MonospaceShaper::new(10.0, 16.0)
    }

    #[test]
    fn wraps_on_words_and_newlines() {
        let lines = mono().wrap("MAIN MIX BUS\nAUX 1", Some(80.0));
        assert_eq!(lines, vec!["MAIN MIX", "BUS", "AUX 1"]);
        assert_eq!(mono().wrap("a b", None), vec!["a b"]);
    }

    #[test]
    fn long_word_gets_its_own_line() {
        let lines = mono().wrap("x verylongword y", Some(30.0));
        assert_eq!(lines, vec!["x", "verylongword", "y"]);
    }

    #[test]
    fn measure_uses_widest_line() {
        let lines = vec!["ab".to_owned(), "abcd".to_owned()];
        assert_eq!(mono().measure(&lines), Vec2::new(40.0, 32.0));
    }

    #[test]
    fn stale_font_handles() {
        let mut store = FontStore::new();
        let a = store.insert(mono());
        assert_eq!(store.destroy(a), DestroyOutcome::Destroyed);
        let b = store.insert(mono());
        assert_eq!(a.index, b.index);
        assert!(store.shaper(a).is_none());
        assert!(!store.mark_pending(a));
        assert!(store.is_alive(b));
    }

    #[test]
    fn destroy_deferred_until_reset() {
        let mut store = FontStore::new();
        let h = store.insert(mono());
        store.mark_pending(h);
        assert_eq!(store.destroy(h), DestroyOutcome::Deferred);
        assert!(store.is_alive(h));
        store.reset_pending(h);
        assert!(!store.is_alive(h));
    }

    #[cfg(feature = "text")]
    #[test]
    fn garbage_bytes_are_a_parse_error() {
        let mut store = FontStore::new();
        assert!(matches!(store.from_bytes(&[0, 1, 2, 3], 16.0), Err(FontError::Parse(_))));
    }
}
