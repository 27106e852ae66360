//! Frame configuration: framebuffer size, layer count, split-screen layers.
//!
//! Loaded from JSON. Every field has a default, so `{}` is a valid config:
//!
//! ```json
//! { "width": 1280, "height": 800, "layers": 4,
//!   "split_left_layer": 2, "split_right_layer": 3 }
//! ```

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::math::Rect;

/// Errors from loading a [`RenderConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    Io(String),
    /// The contents are not valid config JSON.
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config read failed: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse failed: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Framebuffer width in pixels.
    pub width: u32,
    /// Framebuffer height in pixels.
    pub height: u32,
    /// Number of draw layers, dispatched in index order.
    pub layers: usize,
    /// Layer drawn shifted left by a quarter of the framebuffer width.
    pub split_left_layer: Option<usize>,
    /// Layer drawn shifted right by a quarter of the framebuffer width.
    pub split_right_layer: Option<usize>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
            layers: 4,
            split_left_layer: None,
            split_right_layer: None,
        }
    }
}

impl RenderConfig {
    pub fn new(width: u32, height: u32, layers: usize) -> Self {
        Self {
            width,
            height,
            layers,
            ..Self::default()
        }
        .validated()
    }

    pub fn with_split_layers(mut self, left: Option<usize>, right: Option<usize>) -> Self {
        self.split_left_layer = left;
        self.split_right_layer = right;
        self.validated()
    }

    /// Parse and validate.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config.validated())
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        let config = Self::from_json_str(&json)?;
        log::info!(
            "Loaded render config from {}: {}x{}, {} layers",
            path.display(),
            config.width,
            config.height,
            config.layers
        );
        Ok(config)
    }

    /// At least one layer; split layers must name an existing layer.
    pub fn validated(mut self) -> Self {
        if self.layers == 0 {
            log::warn!("Render config has no layers, using 1");
            self.layers = 1;
        }
        let layers = self.layers;
        for split in [&mut self.split_left_layer, &mut self.split_right_layer] {
            if let Some(layer) = split.filter(|&layer| layer >= layers) {
                log::warn!("Split-screen layer {layer} out of range, ignoring");
                *split = None;
            }
        }
        self
    }

    /// The framebuffer as a rect at the origin.
    pub fn framebuffer(&self) -> Rect {
        Rect::from_size(self.width as i32, self.height as i32)
    }

    /// Horizontal offset applied to every job on `layer`.
    pub fn layer_offset_x(&self, layer: usize) -> f32 {
        let quarter = self.width as f32 / 4.0;
        if self.split_left_layer == Some(layer) {
            -quarter
        } else if self.split_right_layer == Some(layer) {
            quarter
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        assert_eq!(RenderConfig::from_json_str("{}").unwrap(), RenderConfig::default());
    }

    #[test]
    fn parses_split_layers() {
        let config = RenderConfig::from_json_str(
            r#"{ "width": 800, "height": 480, "layers": 3, "split_left_layer": 1, "split_right_layer": 2 }"#,
        )
        .unwrap();
        assert_eq!(config.layer_offset_x(0), 0.0);
        assert_eq!(config.layer_offset_x(1), -200.0);
        assert_eq!(config.layer_offset_x(2), 200.0);
        assert_eq!(config.framebuffer(), Rect::from_size(800, 480));
    }

    #[test]
    fn validation_fixes_bad_values() {
        let config = RenderConfig::from_json_str(r#"{ "layers": 0, "split_right_layer": 5 }"#).unwrap();
        assert_eq!(config.layers, 1);
        assert_eq!(config.split_right_layer, None);
    }

    #[test]
    fn bad_json_is_a_parse_error() {
        assert!(matches!(
            RenderConfig::from_json_str(r#"{ "width": "wide" }"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            RenderConfig::load("/nonexistent/konsol.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
