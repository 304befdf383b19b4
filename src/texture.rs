//! 2D and cube-map textures.

use std::path::Path;

use glow::{HasContext, PixelUnpackData};

use crate::error::{GfxError, Result};

/// What kind of GL texture object a [`Texture`] wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    /// `GL_TEXTURE_2D`.
    Texture2D,
    /// `GL_TEXTURE_CUBE_MAP`.
    CubeMap,
}

impl TextureKind {
    /// The GL bind target.
    #[must_use]
    pub fn target(self) -> u32 {
        match self {
            Self::Texture2D => glow::TEXTURE_2D,
            Self::CubeMap => glow::TEXTURE_CUBE_MAP,
        }
    }
}

/// Map a channel count to `(internal format, pixel format)`.
///
/// # Errors
///
/// Returns [`GfxError::UnsupportedChannels`] for anything outside `1..=4`.
#[expect(clippy::cast_possible_wrap)]
pub fn formats_for_channels(channels: u8) -> Result<(i32, u32)> {
    match channels {
        1 => Ok((glow::R8 as i32, glow::RED)),
        2 => Ok((glow::RG8 as i32, glow::RG)),
        3 => Ok((glow::RGB8 as i32, glow::RGB)),
        4 => Ok((glow::RGBA8 as i32, glow::RGBA)),
        other => Err(GfxError::UnsupportedChannels(other)),
    }
}

/// Check that `len` bytes cover a tightly packed `width * height * channels`
/// image. Extra trailing bytes are allowed.
///
/// # Errors
///
/// Returns [`GfxError::PixelDataSize`] if the buffer is too short.
pub fn check_pixel_len(len: usize, width: u32, height: u32, channels: u8) -> Result<()> {
    let to_usize = |v: u32| usize::try_from(v).unwrap_or(usize::MAX);
    let expected = to_usize(width)
        .saturating_mul(to_usize(height))
        .saturating_mul(usize::from(channels));
    if len < expected {
        return Err(GfxError::PixelDataSize {
            expected,
            actual: len,
        });
    }
    Ok(())
}

/// Convert a `u32` to `i32` for GL API calls, saturating.
pub(crate) fn gl_size(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// A GPU texture with its dimensions and channel count.
#[derive(Debug)]
pub struct Texture {
    raw: glow::Texture,
    kind: TextureKind,
    width: u32,
    height: u32,
    channels: u8,
}

/// Decoded pixels with their channel count preserved.
struct DecodedImage {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

fn decode(path: &Path, flip: bool) -> Result<DecodedImage> {
    let bytes = std::fs::read(path).map_err(|e| GfxError::io(path, e))?;
    let mut img = image::load_from_memory(&bytes)?;
    if flip {
        img = img.flipv();
    }
    let channels = img.color().channel_count();
    let (width, height) = (img.width(), img.height());
    let pixels = match channels {
        1 => img.into_luma8().into_raw(),
        2 => img.into_luma_alpha8().into_raw(),
        3 => img.into_rgb8().into_raw(),
        _ => img.into_rgba8().into_raw(),
    };
    Ok(DecodedImage {
        pixels,
        width,
        height,
        channels: channels.min(4),
    })
}

impl Texture {
    /// Upload raw pixel data as a mipmapped 2D texture with `REPEAT`
    /// wrapping.
    ///
    /// `pixels` must hold at least `width * height * channels` tightly
    /// packed bytes.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Fails on an unsupported channel count, with
    /// [`GfxError::PixelDataSize`] if `pixels` is too short, or if the
    /// texture cannot be created.
    pub unsafe fn from_pixels(
        gl: &glow::Context,
        pixels: &[u8],
        width: u32,
        height: u32,
        channels: u8,
    ) -> Result<Self> {
        let (internal, format) = formats_for_channels(channels)?;
        check_pixel_len(pixels.len(), width, height, channels)?;
        let raw = unsafe { gl.create_texture() }.map_err(GfxError::Gl)?;

        #[expect(clippy::cast_possible_wrap)]
        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(raw));
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::REPEAT as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::REPEAT as i32);
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR_MIPMAP_LINEAR as i32,
            );
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);

            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal,
                gl_size(width),
                gl_size(height),
                0,
                format,
                glow::UNSIGNED_BYTE,
                PixelUnpackData::Slice(Some(pixels)),
            );
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 4);
            gl.generate_mipmap(glow::TEXTURE_2D);
            gl.bind_texture(glow::TEXTURE_2D, None);
        }

        log::debug!("created {width}x{height} texture with {channels} channel(s)");
        Ok(Self {
            raw,
            kind: TextureKind::Texture2D,
            width,
            height,
            channels,
        })
    }

    /// Decode an image file and upload it.
    ///
    /// The image is flipped vertically so that UV `(0, 0)` addresses the
    /// bottom-left of the picture, matching GL's texture origin.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or decoded, or the upload fails.
    pub unsafe fn load(gl: &glow::Context, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let image = decode(path, true)?;
        log::debug!("loaded image {}", path.display());
        unsafe { Self::from_pixels(gl, &image.pixels, image.width, image.height, image.channels) }
    }

    /// A 1×1 opaque white texture, bound wherever a texture is optional.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Fails if the texture cannot be created.
    pub unsafe fn white(gl: &glow::Context) -> Result<Self> {
        unsafe { Self::from_pixels(gl, &[255, 255, 255], 1, 1, 3) }
    }

    /// Load six images as a cube map, in the order +X, −X, +Y, −Y, +Z, −Z.
    ///
    /// Faces are not flipped; cube-map faces use a top-left origin.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Fails if any face cannot be read, decoded, or uploaded.
    pub unsafe fn load_cubemap<P: AsRef<Path>>(gl: &glow::Context, faces: [P; 6]) -> Result<Self> {
        let mut decoded = Vec::with_capacity(6);
        for face in &faces {
            decoded.push(decode(face.as_ref(), false)?);
        }

        let raw = unsafe { gl.create_texture() }.map_err(GfxError::Gl)?;
        unsafe { gl.bind_texture(glow::TEXTURE_CUBE_MAP, Some(raw)) };

        let mut target = glow::TEXTURE_CUBE_MAP_POSITIVE_X;
        for face in &decoded {
            let checked = formats_for_channels(face.channels).and_then(|formats| {
                check_pixel_len(face.pixels.len(), face.width, face.height, face.channels)?;
                Ok(formats)
            });
            let (internal, format) = match checked {
                Ok(formats) => formats,
                Err(e) => {
                    unsafe {
                        gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 4);
                        gl.bind_texture(glow::TEXTURE_CUBE_MAP, None);
                        gl.delete_texture(raw);
                    }
                    return Err(e);
                }
            };
            unsafe {
                gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
                gl.tex_image_2d(
                    target,
                    0,
                    internal,
                    gl_size(face.width),
                    gl_size(face.height),
                    0,
                    format,
                    glow::UNSIGNED_BYTE,
                    PixelUnpackData::Slice(Some(&face.pixels)),
                );
            }
            target += 1;
        }

        #[expect(clippy::cast_possible_wrap)]
        unsafe {
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 4);
            let t = glow::TEXTURE_CUBE_MAP;
            gl.tex_parameter_i32(t, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(t, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(t, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(t, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(t, glow::TEXTURE_WRAP_R, glow::CLAMP_TO_EDGE as i32);
            gl.bind_texture(t, None);
        }

        let first = &decoded[0];
        log::debug!("created {}x{} cube map", first.width, first.height);
        Ok(Self {
            raw,
            kind: TextureKind::CubeMap,
            width: first.width,
            height: first.height,
            channels: first.channels,
        })
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Channel count of the uploaded data.
    #[must_use]
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// 2D texture or cube map.
    #[must_use]
    pub fn kind(&self) -> TextureKind {
        self.kind
    }

    /// The raw GL handle.
    #[must_use]
    pub fn raw(&self) -> glow::Texture {
        self.raw
    }

    /// Bind to texture unit `slot`.
    ///
    /// # Safety
    ///
    /// Requires the context this texture was created with to be current.
    pub unsafe fn bind(&self, gl: &glow::Context, slot: u32) {
        unsafe {
            gl.active_texture(glow::TEXTURE0 + slot);
            gl.bind_texture(self.kind.target(), Some(self.raw));
        }
    }

    /// Delete the texture.
    ///
    /// # Safety
    ///
    /// Must be called with the context this texture was created with, at
    /// most once.
    pub unsafe fn destroy(&self, gl: &glow::Context) {
        unsafe { gl.delete_texture(self.raw) };
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn channel_counts_map_to_matching_formats() {
        assert_eq!(formats_for_channels(1).unwrap().1, glow::RED);
        assert_eq!(formats_for_channels(2).unwrap().1, glow::RG);
        assert_eq!(formats_for_channels(3).unwrap().1, glow::RGB);
        assert_eq!(formats_for_channels(4).unwrap().1, glow::RGBA);
    }

    #[test]
    fn internal_formats_are_sized() {
        #[allow(clippy::cast_possible_wrap)]
        let rgba8 = glow::RGBA8 as i32;
        assert_eq!(formats_for_channels(4).unwrap().0, rgba8);
    }

    #[test]
    fn unsupported_channel_counts_are_rejected() {
        for channels in [0, 5, 255] {
            assert!(matches!(
                formats_for_channels(channels),
                Err(GfxError::UnsupportedChannels(c)) if c == channels
            ));
        }
    }

    #[test]
    fn exact_pixel_buffer_is_accepted() {
        assert!(check_pixel_len(4 * 2 * 3, 4, 2, 3).is_ok());
        assert!(check_pixel_len(0, 0, 16, 4).is_ok());
    }

    #[test]
    fn trailing_pixel_bytes_are_accepted() {
        assert!(check_pixel_len(100, 2, 2, 4).is_ok());
    }

    #[test]
    fn short_pixel_buffer_is_rejected() {
        let err = check_pixel_len(3, 1, 1, 4).err().unwrap();
        assert!(matches!(
            err,
            GfxError::PixelDataSize {
                expected: 4,
                actual: 3
            }
        ));
        assert_eq!(
            err.to_string(),
            "pixel data too short: expected 4 bytes, got 3"
        );
    }

    #[test]
    fn huge_dimensions_saturate_instead_of_wrapping() {
        let err = check_pixel_len(1024, u32::MAX, u32::MAX, 4).err().unwrap();
        assert!(matches!(
            err,
            GfxError::PixelDataSize { expected, actual: 1024 } if expected > 1024
        ));
    }

    #[test]
    fn texture_kinds_have_distinct_targets() {
        assert_eq!(TextureKind::Texture2D.target(), glow::TEXTURE_2D);
        assert_eq!(TextureKind::CubeMap.target(), glow::TEXTURE_CUBE_MAP);
    }

    #[test]
    fn gl_size_saturates() {
        assert_eq!(gl_size(1920), 1920);
        assert_eq!(gl_size(u32::MAX), i32::MAX);
    }

    #[test]
    fn missing_image_is_io_error() {
        let err = decode(Path::new("/nonexistent/tex.png"), true).err().unwrap();
        assert!(matches!(err, GfxError::Io { .. }));
    }

    #[test]
    fn garbage_bytes_are_image_error() {
        let dir = std::env::temp_dir().join("deferred-glow-texture-test.png");
        std::fs::write(&dir, b"not a png").unwrap();
        let err = decode(&dir, false).err().unwrap();
        assert!(matches!(err, GfxError::Image(_)));
        let _ = std::fs::remove_file(&dir);
    }
}
