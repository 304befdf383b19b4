//! Offscreen render targets: the G-buffer, 2D layers, and custom passes.
//!
//! A [`Framebuffer`] owns one texture per color attachment plus an optional
//! depth renderbuffer. Every color attachment is enabled as a draw buffer,
//! so fragment output `location = i` lands in attachment `i`. An `R32I`
//! attachment serves as the pick plane: shaders write a per-draw integer
//! ID into it, and [`Framebuffer::read_pick_id`] reads it back.

use glow::{HasContext, PixelPackData, PixelUnpackData};

use crate::error::{GfxError, Result};
use crate::texture::gl_size;

/// Storage format of one color attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentFormat {
    /// Half-float RGBA, for positions and normals.
    Rgba16F,
    /// 8-bit RGBA, for color.
    Rgba8,
    /// Signed 32-bit integer, for draw IDs.
    R32I,
}

impl AttachmentFormat {
    /// `(internal format, pixel format, pixel type)` for `glTexImage2D`.
    #[must_use]
    pub fn gl_formats(self) -> (u32, u32, u32) {
        match self {
            Self::Rgba16F => (glow::RGBA16F, glow::RGBA, glow::HALF_FLOAT),
            Self::Rgba8 => (glow::RGBA8, glow::RGBA, glow::UNSIGNED_BYTE),
            Self::R32I => (glow::R32I, glow::RED_INTEGER, glow::INT),
        }
    }

    /// Integer attachments cannot be filtered or blended.
    #[must_use]
    pub fn is_integer(self) -> bool {
        matches!(self, Self::R32I)
    }
}

/// Attachments of a framebuffer, in draw-buffer order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramebufferLayout {
    /// Color attachments; index `i` is `COLOR_ATTACHMENT0 + i`.
    pub color: Vec<AttachmentFormat>,
    /// Whether a depth renderbuffer is attached.
    pub depth: bool,
}

impl FramebufferLayout {
    /// Deferred-shading G-buffer: position, normal, albedo, draw ID, depth.
    #[must_use]
    pub fn gbuffer() -> Self {
        Self {
            color: vec![
                AttachmentFormat::Rgba16F,
                AttachmentFormat::Rgba16F,
                AttachmentFormat::Rgba8,
                AttachmentFormat::R32I,
            ],
            depth: true,
        }
    }

    /// 2D layer: albedo, draw ID, depth.
    #[must_use]
    pub fn layer_2d() -> Self {
        Self {
            color: vec![AttachmentFormat::Rgba8, AttachmentFormat::R32I],
            depth: true,
        }
    }

    /// Index of the attachment composited onto the screen.
    #[must_use]
    pub fn albedo_index(&self) -> Option<usize> {
        self.color
            .iter()
            .position(|f| *f == AttachmentFormat::Rgba8)
    }

    /// Index of the draw-ID attachment.
    #[must_use]
    pub fn pick_index(&self) -> Option<usize> {
        self.color.iter().position(|f| f.is_integer())
    }
}

/// `COLOR_ATTACHMENT0 + index`.
#[expect(clippy::cast_possible_truncation)]
/// `GL_READ_BUFFER` of a freshly created framebuffer, restored after pick
/// reads so later `glReadPixels` and blits see the first color attachment.
const DEFAULT_READ_BUFFER: u32 = glow::COLOR_ATTACHMENT0;

fn color_attachment(index: usize) -> u32 {
    glow::COLOR_ATTACHMENT0 + index as u32
}

fn in_bounds([width, height]: [u32; 2], x: i32, y: i32) -> bool {
    u32::try_from(x).is_ok_and(|x| x < width) && u32::try_from(y).is_ok_and(|y| y < height)
}

/// An offscreen render target.
#[derive(Debug)]
pub struct Framebuffer {
    raw: glow::Framebuffer,
    layout: FramebufferLayout,
    textures: Vec<glow::Texture>,
    depth: Option<glow::Renderbuffer>,
    width: u32,
    height: u32,
}

impl Framebuffer {
    /// Create a framebuffer with the given attachments and size.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context. Leaves the default
    /// framebuffer bound.
    ///
    /// # Errors
    ///
    /// Fails if a GL object cannot be created or the framebuffer is not
    /// complete; partially created objects are deleted.
    pub unsafe fn new(
        gl: &glow::Context,
        layout: FramebufferLayout,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let raw = unsafe { gl.create_framebuffer() }.map_err(GfxError::Gl)?;
        let mut framebuffer = Self {
            raw,
            layout,
            textures: Vec::new(),
            depth: None,
            width,
            height,
        };

        if let Err(e) = unsafe { framebuffer.attach_all(gl) } {
            unsafe {
                gl.bind_framebuffer(glow::FRAMEBUFFER, None);
                framebuffer.destroy(gl);
            }
            return Err(e);
        }

        log::debug!(
            "created {width}x{height} framebuffer with {} color attachment(s)",
            framebuffer.layout.color.len()
        );
        Ok(framebuffer)
    }

    /// G-buffer preset, see [`FramebufferLayout::gbuffer`].
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub unsafe fn gbuffer(gl: &glow::Context, width: u32, height: u32) -> Result<Self> {
        unsafe { Self::new(gl, FramebufferLayout::gbuffer(), width, height) }
    }

    /// 2D layer preset, see [`FramebufferLayout::layer_2d`]. Also the usual
    /// choice for custom passes.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub unsafe fn layer_2d(gl: &glow::Context, width: u32, height: u32) -> Result<Self> {
        unsafe { Self::new(gl, FramebufferLayout::layer_2d(), width, height) }
    }

    unsafe fn attach_all(&mut self, gl: &glow::Context) -> Result<()> {
        unsafe { gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.raw)) };

        for (index, format) in self.layout.color.iter().enumerate() {
            let texture = unsafe { gl.create_texture() }.map_err(GfxError::Gl)?;
            self.textures.push(texture);

            let filter = if format.is_integer() {
                glow::NEAREST
            } else {
                glow::LINEAR
            };
            #[expect(clippy::cast_possible_wrap)]
            unsafe {
                gl.bind_texture(glow::TEXTURE_2D, Some(texture));
                gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter as i32);
                gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter as i32);
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_WRAP_S,
                    glow::CLAMP_TO_EDGE as i32,
                );
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_WRAP_T,
                    glow::CLAMP_TO_EDGE as i32,
                );
                gl.framebuffer_texture_2d(
                    glow::FRAMEBUFFER,
                    color_attachment(index),
                    glow::TEXTURE_2D,
                    Some(texture),
                    0,
                );
            }
        }

        if self.layout.depth {
            let depth = unsafe { gl.create_renderbuffer() }.map_err(GfxError::Gl)?;
            self.depth = Some(depth);
            unsafe {
                gl.bind_renderbuffer(glow::RENDERBUFFER, Some(depth));
                gl.framebuffer_renderbuffer(
                    glow::FRAMEBUFFER,
                    glow::DEPTH_ATTACHMENT,
                    glow::RENDERBUFFER,
                    Some(depth),
                );
            }
        }

        let draw_buffers: Vec<u32> = (0..self.layout.color.len()).map(color_attachment).collect();
        unsafe { gl.draw_buffers(&draw_buffers) };

        unsafe { self.allocate_storage(gl) };

        let status = unsafe { gl.check_framebuffer_status(glow::FRAMEBUFFER) };
        unsafe { gl.bind_framebuffer(glow::FRAMEBUFFER, None) };
        if status != glow::FRAMEBUFFER_COMPLETE {
            return Err(GfxError::FramebufferIncomplete(status));
        }
        Ok(())
    }

    /// (Re)allocate every attachment at the current size.
    unsafe fn allocate_storage(&self, gl: &glow::Context) {
        let (w, h) = (gl_size(self.width), gl_size(self.height));

        for (texture, format) in self.textures.iter().zip(&self.layout.color) {
            let (internal, pixel_format, pixel_type) = format.gl_formats();
            #[expect(clippy::cast_possible_wrap)]
            unsafe {
                gl.bind_texture(glow::TEXTURE_2D, Some(*texture));
                gl.tex_image_2d(
                    glow::TEXTURE_2D,
                    0,
                    internal as i32,
                    w,
                    h,
                    0,
                    pixel_format,
                    pixel_type,
                    PixelUnpackData::Slice(None),
                );
            }
        }
        unsafe { gl.bind_texture(glow::TEXTURE_2D, None) };

        if let Some(depth) = self.depth {
            unsafe {
                gl.bind_renderbuffer(glow::RENDERBUFFER, Some(depth));
                gl.renderbuffer_storage(glow::RENDERBUFFER, glow::DEPTH_COMPONENT24, w, h);
                gl.bind_renderbuffer(glow::RENDERBUFFER, None);
            }
        }
    }

    /// Reallocate all attachments at a new size. Contents are lost.
    ///
    /// # Safety
    ///
    /// Requires the context this framebuffer was created with to be current.
    /// Leaves the default framebuffer bound.
    ///
    /// # Errors
    ///
    /// Returns [`GfxError::FramebufferIncomplete`] if the resized target is
    /// not complete.
    pub unsafe fn resize(&mut self, gl: &glow::Context, width: u32, height: u32) -> Result<()> {
        if [width, height] == [self.width, self.height] {
            return Ok(());
        }
        self.width = width;
        self.height = height;

        unsafe {
            self.allocate_storage(gl);
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.raw));
            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            if status != glow::FRAMEBUFFER_COMPLETE {
                return Err(GfxError::FramebufferIncomplete(status));
            }
        }

        log::debug!("resized framebuffer to {width}x{height}");
        Ok(())
    }

    /// Bind as the draw/read target and set the viewport to cover it.
    ///
    /// # Safety
    ///
    /// Requires the context this framebuffer was created with to be current.
    pub unsafe fn bind(&self, gl: &glow::Context) {
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.raw));
            gl.viewport(0, 0, gl_size(self.width), gl_size(self.height));
        }
    }

    /// Reset the pick plane to 0. The framebuffer must be bound.
    ///
    /// `glClear` leaves integer attachments undefined, so they are cleared
    /// separately.
    ///
    /// # Safety
    ///
    /// Requires the context this framebuffer was created with to be current.
    pub unsafe fn clear_pick(&self, gl: &glow::Context) {
        if let Some(index) = self.layout.pick_index() {
            #[expect(clippy::cast_possible_truncation)]
            unsafe {
                gl.clear_buffer_i32_slice(glow::COLOR, index as u32, &[0, 0, 0, 0]);
            };
        }
    }

    /// Read the draw ID at `(x, y)` (bottom-left origin). The framebuffer
    /// must be bound.
    ///
    /// Coordinates outside the target yield 0, the ID of uncovered pixels.
    /// The read buffer is reset to the first color attachment afterwards.
    ///
    /// # Safety
    ///
    /// Requires the context this framebuffer was created with to be current.
    ///
    /// # Errors
    ///
    /// Returns [`GfxError::NoPickAttachment`] if the layout has no integer
    /// attachment.
    pub unsafe fn read_pick_id(&self, gl: &glow::Context, x: i32, y: i32) -> Result<i32> {
        let index = self.layout.pick_index().ok_or(GfxError::NoPickAttachment)?;
        if !self.contains(x, y) {
            return Ok(0);
        }

        let mut bytes = [0u8; 4];
        unsafe {
            gl.read_buffer(color_attachment(index));
            gl.read_pixels(
                x,
                y,
                1,
                1,
                glow::RED_INTEGER,
                glow::INT,
                PixelPackData::Slice(Some(&mut bytes)),
            );
            gl.read_buffer(DEFAULT_READ_BUFFER);
        }
        Ok(i32::from_ne_bytes(bytes))
    }

    /// Whether `(x, y)` addresses a texel of this target.
    #[must_use]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        in_bounds(self.size(), x, y)
    }

    /// The raw GL handle.
    #[must_use]
    pub fn raw(&self) -> glow::Framebuffer {
        self.raw
    }

    /// The attachment layout.
    #[must_use]
    pub fn layout(&self) -> &FramebufferLayout {
        &self.layout
    }

    /// Texture of color attachment `index`.
    #[must_use]
    pub fn attachment(&self, index: usize) -> Option<glow::Texture> {
        self.textures.get(index).copied()
    }

    /// The texture that gets composited onto the screen.
    #[must_use]
    pub fn albedo_texture(&self) -> Option<glow::Texture> {
        self.layout.albedo_index().and_then(|i| self.attachment(i))
    }

    /// `[width, height]` in pixels.
    #[must_use]
    pub fn size(&self) -> [u32; 2] {
        [self.width, self.height]
    }

    /// Delete the framebuffer, its textures, and its depth renderbuffer.
    ///
    /// # Safety
    ///
    /// Must be called with the context this framebuffer was created with, at
    /// most once.
    pub unsafe fn destroy(&self, gl: &glow::Context) {
        unsafe {
            for texture in &self.textures {
                gl.delete_texture(*texture);
            }
            if let Some(depth) = self.depth {
                gl.delete_renderbuffer(depth);
            }
            gl.delete_framebuffer(self.raw);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn pick_reads_restore_the_first_color_attachment() {
        assert_eq!(DEFAULT_READ_BUFFER, color_attachment(0));
        for layout in [FramebufferLayout::gbuffer(), FramebufferLayout::layer_2d()] {
            let pick = layout.pick_index().unwrap();
            assert_ne!(color_attachment(pick), DEFAULT_READ_BUFFER);
        }
    }

    #[test]
    fn gbuffer_layout_matches_shader_outputs() {
        let layout = FramebufferLayout::gbuffer();
        assert_eq!(layout.color.len(), 4);
        assert_eq!(layout.albedo_index(), Some(2));
        assert_eq!(layout.pick_index(), Some(3));
        assert!(layout.depth);
    }

    #[test]
    fn layer_2d_layout_has_albedo_then_pick() {
        let layout = FramebufferLayout::layer_2d();
        assert_eq!(layout.albedo_index(), Some(0));
        assert_eq!(layout.pick_index(), Some(1));
        assert!(layout.depth);
    }

    #[test]
    fn color_only_layout_has_no_pick_plane() {
        let layout = FramebufferLayout {
            color: vec![AttachmentFormat::Rgba8],
            depth: false,
        };
        assert_eq!(layout.pick_index(), None);
        assert_eq!(layout.albedo_index(), Some(0));
    }

    #[test]
    fn integer_attachment_uses_integer_pixel_format() {
        assert!(AttachmentFormat::R32I.is_integer());
        assert!(!AttachmentFormat::Rgba16F.is_integer());
        assert_eq!(
            AttachmentFormat::R32I.gl_formats(),
            (glow::R32I, glow::RED_INTEGER, glow::INT)
        );
    }

    #[test]
    fn bounds_exclude_edges_and_negatives() {
        let size = [1920, 1080];
        assert!(in_bounds(size, 0, 0));
        assert!(in_bounds(size, 1919, 1079));
        assert!(!in_bounds(size, 1920, 0));
        assert!(!in_bounds(size, 0, 1080));
        assert!(!in_bounds(size, -1, 10));
        assert!(!in_bounds([0, 0], 0, 0));
    }

    #[test]
    fn attachments_are_numbered_from_color_attachment0() {
        assert_eq!(color_attachment(0), glow::COLOR_ATTACHMENT0);
        assert_eq!(color_attachment(3), glow::COLOR_ATTACHMENT3);
    }
}
