//! Error type shared by every module in the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while creating or using GL resources.
#[derive(Debug, Error)]
pub enum GfxError {
    /// A shader stage failed to compile.
    #[error("{stage} shader compilation failed:\n{log}")]
    ShaderCompile {
        /// `"vertex"` or `"fragment"`.
        stage: &'static str,
        /// The driver's info log.
        log: String,
    },
    /// A program failed to link.
    #[error("shader program link failed:\n{0}")]
    ShaderLink(String),
    /// A combined shader file is missing a `#shader` section.
    #[error("shader source has no `#shader {0}` section")]
    MissingShaderSection(&'static str),
    /// The driver refused to create a GL object.
    #[error("GL object creation failed: {0}")]
    Gl(String),
    /// A framebuffer did not reach `FRAMEBUFFER_COMPLETE`.
    #[error("framebuffer incomplete: status 0x{0:04X}")]
    FramebufferIncomplete(u32),
    /// Pixel data could not be decoded.
    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),
    /// A file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file that was being read.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
    /// Font data could not be parsed.
    #[error("font parse failed: {0}")]
    Font(String),
    /// An OBJ model could not be loaded.
    #[error("OBJ load failed: {0}")]
    Obj(#[from] tobj::LoadError),
    /// Pixel data with a channel count no GL format maps to.
    #[error("unsupported channel count: {0}")]
    UnsupportedChannels(u8),
    /// A pixel buffer is smaller than its dimensions require.
    #[error("pixel data too short: expected {expected} bytes, got {actual}")]
    PixelDataSize {
        /// `width * height * channels`, saturated at `usize::MAX`.
        expected: usize,
        /// Length of the slice that was passed in.
        actual: usize,
    },
    /// A pick read was requested on a framebuffer without an integer attachment.
    #[error("framebuffer has no integer pick attachment")]
    NoPickAttachment,
    /// The configuration file is malformed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
    /// Windowing or context setup failed.
    #[error("window error: {0}")]
    Window(String),
}

/// Crate-wide result alias.
pub type Result<T, E = GfxError> = std::result::Result<T, E>;

impl GfxError {
    /// Build an [`Io`](Self::Io) error for `path`.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framebuffer_status_is_formatted_as_hex() {
        let err = GfxError::FramebufferIncomplete(0x8CD6);
        assert_eq!(err.to_string(), "framebuffer incomplete: status 0x8CD6");
    }

    #[test]
    fn io_error_mentions_path() {
        let err = GfxError::io(
            "res/missing.png",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        let msg = err.to_string();
        assert!(msg.contains("res/missing.png"), "{msg}");
        assert!(msg.contains("no such file"), "{msg}");
    }
}
