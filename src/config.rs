//! TOML configuration for the window, offscreen targets, and text.
//!
//! Every field has a default, so an empty document is a valid configuration:
//!
//! ```toml
//! [window]
//! width = 1280
//! height = 720
//! title = "playground"
//! vsync = true
//!
//! [video]
//! width = 1920
//! height = 1080
//!
//! [text]
//! pixel_size = 48
//!
//! [logging]
//! filter = "deferred_glow=debug"
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{GfxError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GfxConfig {
    /// On-screen window settings.
    pub window: WindowConfig,
    /// Offscreen render resolution.
    pub video: VideoConfig,
    /// Glyph rasterization settings.
    pub text: TextConfig,
    /// Logger settings.
    pub logging: LogConfig,
}

/// On-screen window settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    /// Window width in screen pixels.
    pub width: u32,
    /// Window height in screen pixels.
    pub height: u32,
    /// Window title.
    pub title: String,
    /// Synchronize buffer swaps with the display refresh.
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: String::from("deferred-glow"),
            vsync: true,
        }
    }
}

/// Resolution of the G-buffer and 2D layer targets.
///
/// This is independent of the window size; layers are stretched onto the
/// screen when composited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VideoConfig {
    /// Target width in pixels.
    pub width: u32,
    /// Target height in pixels.
    pub height: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Glyph rasterization settings.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextConfig {
    /// Height in pixels at which glyphs are rasterized.
    pub pixel_size: f32,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self { pixel_size: 48.0 }
    }
}

/// Logger settings, see [`crate::logging`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// `env_logger` filter string. Falls back to `RUST_LOG` when unset.
    pub filter: Option<String>,
}

impl GfxConfig {
    /// Parse a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`GfxError::Config`] on malformed TOML or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`GfxError::Io`] if the file cannot be read, or
    /// [`GfxError::Config`] if it cannot be parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| GfxError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Window size as `[width, height]`.
    #[must_use]
    pub fn window_size(&self) -> [u32; 2] {
        [self.window.width, self.window.height]
    }

    /// Offscreen target size as `[width, height]`.
    #[must_use]
    pub fn video_size(&self) -> [u32; 2] {
        [self.video.width, self.video.height]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_matches_default() {
        assert_eq!(GfxConfig::from_toml_str("").unwrap(), GfxConfig::default());
    }

    #[test]
    fn defaults_are_720p_window_1080p_video() {
        let config = GfxConfig::default();
        assert_eq!(config.window_size(), [1280, 720]);
        assert_eq!(config.video_size(), [1920, 1080]);
        assert!(config.window.vsync);
        assert!((config.text.pixel_size - 48.0).abs() < f32::EPSILON);
        assert_eq!(config.logging.filter, None);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = GfxConfig::from_toml_str(
            r#"
            [window]
            title = "demo"
            vsync = false

            [video]
            width = 640
            "#,
        )
        .unwrap();
        assert_eq!(config.window.title, "demo");
        assert!(!config.window.vsync);
        assert_eq!(config.window_size(), [1280, 720]);
        assert_eq!(config.video_size(), [640, 1080]);
    }

    #[test]
    fn logging_filter_is_read() {
        let config = GfxConfig::from_toml_str("[logging]\nfilter = \"debug\"").unwrap();
        assert_eq!(config.logging.filter.as_deref(), Some("debug"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = GfxConfig::from_toml_str("[window]\nfullscreen = true").unwrap_err();
        assert!(matches!(err, GfxError::Config(_)));
    }

    #[test]
    fn wrong_type_is_rejected() {
        let err = GfxConfig::from_toml_str("[video]\nwidth = \"wide\"").unwrap_err();
        assert!(matches!(err, GfxError::Config(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = GfxConfig::load("/nonexistent/deferred-glow.toml").unwrap_err();
        assert!(matches!(err, GfxError::Io { .. }));
    }
}
