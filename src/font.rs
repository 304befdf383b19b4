//! Glyph rasterization and text layout.
//!
//! A [`Font`] rasterizes the ASCII range once with [`fontdue`] and keeps one
//! single-channel texture per glyph, keyed by character. Layout is a pure
//! function over glyph metrics ([`layout_text`], [`measure_text`]) so the
//! renderer only has to upload and draw the resulting quads.

use std::collections::HashMap;
use std::path::Path;

use glam::{IVec2, Vec2};
use glow::{HasContext, PixelUnpackData};

use crate::error::{GfxError, Result};
use crate::texture::gl_size;

/// Characters rasterized when a font is loaded.
const GLYPH_RANGE: std::ops::Range<u8> = 0..128;

/// Placement data for one glyph, in pixels at the rasterized size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphMetrics {
    /// Bitmap width and height.
    pub size: IVec2,
    /// Offset from the pen to the bitmap's left edge (`x`) and from the
    /// baseline up to its top edge (`y`).
    pub bearing: IVec2,
    /// Horizontal pen advance.
    pub advance: f32,
}

/// A rasterized glyph.
#[derive(Debug, Clone, Copy)]
pub struct Glyph {
    /// Metrics used for layout.
    pub metrics: GlyphMetrics,
    /// Coverage texture (`R8`). `None` for glyphs with an empty bitmap,
    /// such as space.
    pub texture: Option<glow::Texture>,
}

/// One laid-out glyph: its character and six `[x, y, u, v]` vertices
/// forming two triangles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphQuad {
    /// The character this quad draws.
    pub ch: char,
    /// Triangle-list vertices; `v = 0` is the bitmap's top row.
    pub vertices: [[f32; 4]; 6],
}

/// Lay out `text` on a baseline starting at the origin.
///
/// Characters `lookup` does not know are skipped without advancing the pen.
pub fn layout_text<'a>(
    text: &str,
    scale: f32,
    lookup: impl Fn(char) -> Option<&'a GlyphMetrics>,
) -> Vec<GlyphQuad> {
    let mut quads = Vec::with_capacity(text.len());
    let mut pen = 0.0;

    for ch in text.chars() {
        let Some(metrics) = lookup(ch) else {
            continue;
        };
        let (size, bearing) = (metrics.size.as_vec2(), metrics.bearing.as_vec2());

        let x = pen + bearing.x * scale;
        let y = -(size.y - bearing.y) * scale;
        let w = size.x * scale;
        let h = size.y * scale;

        quads.push(GlyphQuad {
            ch,
            vertices: [
                [x, y + h, 0.0, 0.0],
                [x, y, 0.0, 1.0],
                [x + w, y, 1.0, 1.0],
                [x, y + h, 0.0, 0.0],
                [x + w, y, 1.0, 1.0],
                [x + w, y + h, 1.0, 0.0],
            ],
        });
        pen += metrics.advance * scale;
    }

    quads
}

/// Size of `text` when laid out with [`layout_text`]: total advance by the
/// tallest glyph bitmap, both scaled.
pub fn measure_text<'a>(
    text: &str,
    scale: f32,
    lookup: impl Fn(char) -> Option<&'a GlyphMetrics>,
) -> Vec2 {
    text.chars()
        .filter_map(lookup)
        .fold(Vec2::ZERO, |size, metrics| {
            let height = metrics.size.as_vec2().y * scale;
            Vec2::new(size.x + metrics.advance * scale, size.y.max(height))
        })
}

/// A font rasterized into per-glyph textures.
#[derive(Debug)]
pub struct Font {
    glyphs: HashMap<char, Glyph>,
    pixel_size: f32,
}

impl Font {
    /// Parse TrueType/OpenType data and rasterize ASCII at `pixel_size`.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Fails if the font cannot be parsed or a texture cannot be created.
    pub unsafe fn from_bytes(gl: &glow::Context, bytes: &[u8], pixel_size: f32) -> Result<Self> {
        let face = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| GfxError::Font(e.to_string()))?;

        let mut glyphs = HashMap::with_capacity(GLYPH_RANGE.len());
        unsafe { gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1) };

        for code in GLYPH_RANGE {
            let ch = char::from(code);
            let (raster, bitmap) = face.rasterize(ch, pixel_size);
            let metrics = glyph_metrics(&raster);

            let texture = if bitmap.is_empty() {
                None
            } else {
                match unsafe { upload_glyph(gl, &bitmap, raster.width, raster.height) } {
                    Ok(texture) => Some(texture),
                    Err(e) => {
                        unsafe {
                            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 4);
                            for glyph in glyphs.values() {
                                delete_glyph(gl, glyph);
                            }
                        }
                        return Err(e);
                    }
                }
            };
            glyphs.insert(ch, Glyph { metrics, texture });
        }

        unsafe { gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 4) };
        log::debug!("rasterized {} glyphs at {pixel_size}px", glyphs.len());
        Ok(Self { glyphs, pixel_size })
    }

    /// Read a font file and rasterize it, see [`from_bytes`](Self::from_bytes).
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed.
    pub unsafe fn load(gl: &glow::Context, path: impl AsRef<Path>, pixel_size: f32) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| GfxError::io(path, e))?;
        log::debug!("loading font {}", path.display());
        unsafe { Self::from_bytes(gl, &bytes, pixel_size) }
    }

    /// The rasterized glyph for `ch`.
    #[must_use]
    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch)
    }

    /// Layout metrics for `ch`.
    #[must_use]
    pub fn metrics(&self, ch: char) -> Option<&GlyphMetrics> {
        self.glyphs.get(&ch).map(|g| &g.metrics)
    }

    /// Lay out `text`, see [`layout_text`].
    #[must_use]
    pub fn layout(&self, text: &str, scale: f32) -> Vec<GlyphQuad> {
        layout_text(text, scale, |ch| self.metrics(ch))
    }

    /// Measure `text`, see [`measure_text`].
    #[must_use]
    pub fn measure(&self, text: &str, scale: f32) -> Vec2 {
        measure_text(text, scale, |ch| self.metrics(ch))
    }

    /// Height in pixels the glyphs were rasterized at.
    #[must_use]
    pub fn pixel_size(&self) -> f32 {
        self.pixel_size
    }

    /// Delete all glyph textures.
    ///
    /// # Safety
    ///
    /// Must be called with the context this font was created with, at most
    /// once.
    pub unsafe fn destroy(&self, gl: &glow::Context) {
        for glyph in self.glyphs.values() {
            unsafe { delete_glyph(gl, glyph) };
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn glyph_metrics(raster: &fontdue::Metrics) -> GlyphMetrics {
    let (width, height) = (raster.width as i32, raster.height as i32);
    GlyphMetrics {
        size: IVec2::new(width, height),
        // fontdue measures ymin from the baseline to the bitmap's bottom.
        bearing: IVec2::new(raster.xmin, raster.ymin + height),
        advance: raster.advance_width,
    }
}

unsafe fn upload_glyph(
    gl: &glow::Context,
    bitmap: &[u8],
    width: usize,
    height: usize,
) -> Result<glow::Texture> {
    let texture = unsafe { gl.create_texture() }.map_err(GfxError::Gl)?;
    let (w, h) = (
        gl_size(u32::try_from(width).unwrap_or(u32::MAX)),
        gl_size(u32::try_from(height).unwrap_or(u32::MAX)),
    );

    #[expect(clippy::cast_possible_wrap)]
    unsafe {
        gl.bind_texture(glow::TEXTURE_2D, Some(texture));
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            glow::R8 as i32,
            w,
            h,
            0,
            glow::RED,
            glow::UNSIGNED_BYTE,
            PixelUnpackData::Slice(Some(bitmap)),
        );
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
        gl.bind_texture(glow::TEXTURE_2D, None);
    }

    Ok(texture)
}

unsafe fn delete_glyph(gl: &glow::Context, glyph: &Glyph) {
    if let Some(texture) = glyph.texture {
        unsafe { gl.delete_texture(texture) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn metrics(size: (i32, i32), bearing: (i32, i32), advance: f32) -> GlyphMetrics {
        GlyphMetrics {
            size: IVec2::new(size.0, size.1),
            bearing: IVec2::new(bearing.0, bearing.1),
            advance,
        }
    }

    fn table() -> HashMap<char, GlyphMetrics> {
        HashMap::from([
            ('A', metrics((10, 12), (1, 12), 11.0)),
            ('g', metrics((8, 12), (0, 8), 9.0)),
            (' ', metrics((0, 0), (0, 0), 5.0)),
        ])
    }

    #[test]
    fn first_quad_sits_on_baseline() {
        let glyphs = table();
        let quads = layout_text("A", 1.0, |c| glyphs.get(&c));
        assert_eq!(quads.len(), 1);
        let v = quads[0].vertices;
        // Top-left, bottom-left, bottom-right.
        assert_eq!(v[0], [1.0, 12.0, 0.0, 0.0]);
        assert_eq!(v[1], [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(v[2], [11.0, 0.0, 1.0, 1.0]);
        assert_eq!(v[5], [11.0, 12.0, 1.0, 0.0]);
    }

    #[test]
    fn descender_drops_below_baseline() {
        let glyphs = table();
        let quads = layout_text("g", 1.0, |c| glyphs.get(&c));
        let v = quads[0].vertices;
        assert_eq!(v[1][1], -4.0);
        assert_eq!(v[0][1], 8.0);
    }

    #[test]
    fn pen_advances_between_glyphs() {
        let glyphs = table();
        let quads = layout_text("A g", 2.0, |c| glyphs.get(&c));
        assert_eq!(quads.len(), 3);
        assert_eq!(quads[1].ch, ' ');
        // 'g' starts after A (11) and space (5), doubled.
        assert_eq!(quads[2].vertices[0][0], 32.0);
    }

    #[test]
    fn unknown_characters_are_skipped_without_advancing() {
        let glyphs = table();
        let quads = layout_text("A\u{e9}A", 1.0, |c| glyphs.get(&c));
        assert_eq!(quads.len(), 2);
        assert_eq!(quads[1].vertices[0][0], 12.0);
    }

    #[test]
    fn measure_sums_advances_and_takes_tallest_glyph() {
        let glyphs = table();
        let size = measure_text("Ag ", 0.5, |c| glyphs.get(&c));
        assert_eq!(size, Vec2::new(12.5, 6.0));
    }

    #[test]
    fn measure_empty_text_is_zero() {
        let glyphs = table();
        assert_eq!(measure_text("", 1.0, |c| glyphs.get(&c)), Vec2::ZERO);
    }

    #[test]
    fn fontdue_metrics_convert_to_top_bearing() {
        let raster = fontdue::Metrics {
            xmin: 2,
            ymin: -3,
            width: 7,
            height: 10,
            advance_width: 8.5,
            advance_height: 0.0,
            bounds: fontdue::OutlineBounds {
                xmin: 2.0,
                ymin: -3.0,
                width: 7.0,
                height: 10.0,
            },
        };
        let m = glyph_metrics(&raster);
        assert_eq!(m.size, IVec2::new(7, 10));
        assert_eq!(m.bearing, IVec2::new(2, 7));
        assert!((m.advance - 8.5).abs() < f32::EPSILON);
    }

    #[test]
    fn invalid_font_bytes_are_rejected() {
        assert!(fontdue::Font::from_bytes(&b"not a font"[..], fontdue::FontSettings::default()).is_err());
    }

    proptest! {
        #[test]
        fn measured_width_matches_layout_pen(text in "[Ag ]{0,32}", scale in 0.1f32..4.0) {
            let glyphs = table();
            let quads = layout_text(&text, scale, |c| glyphs.get(&c));
            let size = measure_text(&text, scale, |c| glyphs.get(&c));
            prop_assert_eq!(quads.len(), text.chars().count());
            if let Some(last) = quads.last() {
                let m = glyphs[&last.ch];
                let left = last.vertices[1][0] - m.bearing.as_vec2().x * scale;
                prop_assert!((left + m.advance * scale - size.x).abs() < 1e-2);
            }
        }
    }
}
