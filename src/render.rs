//! The main renderer: owns the offscreen targets and built-in programs,
//! runs the 3D, 2D and custom passes, and composites them onto the screen.

use std::sync::Arc;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use glow::HasContext;

use crate::buffer::{AttributeType, Buffer, BufferKind, BufferUsage, VertexArray, VertexLayout};
use crate::config::GfxConfig;
use crate::error::Result;
use crate::font::Font;
use crate::framebuffer::Framebuffer;
use crate::math;
use crate::model::{
    Model, FULLSCREEN_QUAD, QUAD_INDICES, SKYBOX_CUBE, SKYBOX_INDICES, UNIT_QUAD,
};
use crate::pass::{PassKind, PassTarget, PassTracker};
use crate::rollback::Rollback;
use crate::shaders::{self, Shader};
use crate::texture::{gl_size, Texture, TextureKind};
use crate::types::{Material, Vertex2D};

/// Depth range of the 2D pass projection.
const DEPTH_RANGE_2D: (f32, f32) = (0.0, 10.0);

/// Texture unit for material and layer textures.
const SLOT_ALBEDO: u32 = 0;

/// Texture unit for sprite textures.
const SLOT_SPRITE: u32 = 1;

/// Vertices per glyph quad (two triangles, no index buffer).
const GLYPH_VERTICES: i32 = 6;

/// Bytes in one glyph quad upload: six `vec4`s.
const GLYPH_BYTES: usize = 6 * 4 * std::mem::size_of::<f32>();

/// A deferred renderer drawing into offscreen targets at a fixed video
/// resolution.
///
/// # Passes
///
/// A frame is built from passes. [`begin_3d`](Self::begin_3d) renders
/// models into the G-buffer. [`begin_2d`](Self::begin_2d) renders sprites
/// and text into the 2D layer. [`begin_pass`](Self::begin_pass) targets a
/// caller-owned [`Framebuffer`]. Every target carries an integer pick plane
/// that is cleared to 0 when its pass begins, so [`pick_id_3d`] and
/// friends report 0 for uncovered pixels.
///
/// After the passes, [`clear_layers`](Self::clear_layers) returns to the
/// default framebuffer and the `draw_*_layer` methods blend each layer onto
/// the screen with a fullscreen quad.
///
/// # Example
///
/// ```no_run
/// # use deferred_glow::{GfxConfig, Renderer};
/// # use glam::{Mat4, Vec3, Vec4};
/// # use std::sync::Arc;
/// # fn example(gl: Arc<glow::Context>) -> deferred_glow::Result<()> {
/// // During setup (with a current GL context):
/// let mut renderer = unsafe { Renderer::new(gl, &GfxConfig::default()) }?;
///
/// // Each frame:
/// unsafe {
///     renderer.begin_2d(Mat4::IDENTITY, [0.5, 0.5].into(), Vec4::ZERO);
///     renderer.draw_texture(None, Mat4::from_scale(Vec3::splat(64.0)), Vec3::ONE, 7);
///     let _id = renderer.pick_id_2d(960, 540)?;
///     renderer.end_2d();
///
///     renderer.clear_layers();
///     renderer.draw_2d_layer();
/// }
/// # Ok(())
/// # }
/// ```
///
/// [`pick_id_3d`]: Self::pick_id_3d
pub struct Renderer {
    /// The OpenGL context, shared via [`Arc`] with the window that owns it.
    gl: Arc<glow::Context>,

    /// Deferred target: position, normal, albedo and draw ID.
    gbuffer: Framebuffer,
    /// Sprite target: albedo and draw ID.
    layer_2d: Framebuffer,

    /// 1×1 white texture bound in place of missing textures.
    white: Texture,

    /// Clip-space quad used for compositing.
    fullscreen_quad: Model,
    /// Unit quad scaled by sprite transforms.
    unit_quad: Model,
    /// Cube drawn behind the 3D scene.
    skybox_cube: Model,

    shader_3d: Shader,
    shader_2d: Shader,
    fullscreen_shader: Shader,
    skybox_shader: Shader,

    /// Vertex array with a single `vec4` attribute for glyph quads.
    glyph_vao: VertexArray,
    /// Dynamic buffer rewritten once per glyph.
    glyph_vbo: Buffer,

    /// Open pass, with the custom target rebound after pick reads.
    passes: PassTracker<CustomTarget>,

    /// Projection of the current 3D pass.
    projection: Mat4,
    /// Inverse camera transform of the current 3D pass.
    view: Mat4,

    /// Cube map drawn at the start of each 3D pass.
    skybox: Option<Arc<Texture>>,

    /// Default framebuffer size in pixels.
    screen_size: [u32; 2],
}

impl Renderer {
    /// Create a new renderer.
    ///
    /// Compiles the built-in programs, allocates the G-buffer and the 2D
    /// layer at the configured video size, and uploads the built-in
    /// geometry.
    ///
    /// # Safety
    ///
    /// The `gl` context must be current and valid. The caller must ensure
    /// that [`destroy`](Self::destroy) is called before the context is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if shader compilation, framebuffer setup, or GL
    /// resource creation fails. Whatever was created before the failure is
    /// deleted again.
    pub unsafe fn new(gl: Arc<glow::Context>, config: &GfxConfig) -> Result<Self> {
        let [video_width, video_height] = config.video_size();

        let mut rollback = Rollback::new(&*gl);
        let gbuffer = unsafe { Framebuffer::gbuffer(&gl, video_width, video_height) }?;
        rollback.push(&gbuffer);
        let layer_2d =
            unsafe { rollback.check(Framebuffer::layer_2d(&gl, video_width, video_height)) }?;
        rollback.push(&layer_2d);
        let white = unsafe { rollback.check(Texture::white(&gl)) }?;
        rollback.push(&white);

        let fullscreen_quad = unsafe {
            rollback.check(Model::from_vertices(
                &gl,
                &FULLSCREEN_QUAD,
                &QUAD_INDICES,
                &Vertex2D::layout(),
            ))
        }?;
        rollback.push(&fullscreen_quad);
        let unit_quad = unsafe {
            rollback.check(Model::from_vertices(
                &gl,
                &UNIT_QUAD,
                &QUAD_INDICES,
                &Vertex2D::layout(),
            ))
        }?;
        rollback.push(&unit_quad);
        let skybox_cube = unsafe {
            rollback.check(Model::from_vertices(
                &gl,
                &SKYBOX_CUBE,
                &SKYBOX_INDICES,
                &VertexLayout::new().with(AttributeType::Vec3),
            ))
        }?;
        rollback.push(&skybox_cube);

        let shader_3d = unsafe {
            rollback.check(Shader::from_sources(
                &gl,
                shaders::GBUFFER_VERTEX_SRC,
                shaders::GBUFFER_FRAGMENT_SRC,
            ))
        }?;
        rollback.push(&shader_3d);
        let shader_2d = unsafe {
            rollback.check(Shader::from_sources(
                &gl,
                shaders::SPRITE_VERTEX_SRC,
                shaders::SPRITE_FRAGMENT_SRC,
            ))
        }?;
        rollback.push(&shader_2d);
        let fullscreen_shader = unsafe {
            rollback.check(Shader::from_sources(
                &gl,
                shaders::FULLSCREEN_VERTEX_SRC,
                shaders::FULLSCREEN_FRAGMENT_SRC,
            ))
        }?;
        rollback.push(&fullscreen_shader);
        let skybox_shader = unsafe {
            rollback.check(Shader::from_sources(
                &gl,
                shaders::SKYBOX_VERTEX_SRC,
                shaders::SKYBOX_FRAGMENT_SRC,
            ))
        }?;
        rollback.push(&skybox_shader);

        let glyph_vao = unsafe { rollback.check(VertexArray::new(&gl)) }?;
        rollback.push(&glyph_vao);
        let glyph_vbo = unsafe { rollback.check(Buffer::new(&gl, BufferKind::Vertex)) }?;
        unsafe {
            glyph_vao.bind(&gl);
            glyph_vbo.bind(&gl);
            glyph_vbo.allocate(&gl, GLYPH_BYTES, BufferUsage::Dynamic);
            VertexLayout::new().with(AttributeType::Vec4).apply(&gl);
            glyph_vbo.unbind(&gl);
            VertexArray::unbind(&gl);

            gl.enable(glow::BLEND);
            gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
        }

        let screen_size = config.window_size();
        log::info!(
            "renderer ready: video {video_width}x{video_height}, screen {}x{}",
            screen_size[0],
            screen_size[1],
        );

        Ok(Self {
            gl,
            gbuffer,
            layer_2d,
            white,
            fullscreen_quad,
            unit_quad,
            skybox_cube,
            shader_3d,
            shader_2d,
            fullscreen_shader,
            skybox_shader,
            glyph_vao,
            glyph_vbo,
            passes: PassTracker::new(),
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            skybox: None,
            screen_size,
        })
    }

    /// The shared GL context.
    #[must_use]
    pub fn gl(&self) -> &Arc<glow::Context> {
        &self.gl
    }

    /// The pass currently open, if any.
    #[must_use]
    pub fn active_pass(&self) -> Option<PassKind> {
        self.passes.active()
    }

    /// Default framebuffer size in pixels.
    #[must_use]
    pub fn screen_size(&self) -> [u32; 2] {
        self.screen_size
    }

    /// Size of the offscreen targets in pixels.
    #[must_use]
    pub fn video_size(&self) -> [u32; 2] {
        self.gbuffer.size()
    }

    /// Record a new default framebuffer size, typically from a window
    /// resize event. The viewport is updated right away unless a pass is
    /// open.
    ///
    /// # Safety
    ///
    /// Requires the renderer's context to be current.
    pub unsafe fn set_screen_size(&mut self, width: u32, height: u32) {
        log::debug!("screen resized to {width}x{height}");
        self.screen_size = [width, height];
        if self.passes.target() == PassTarget::Screen {
            unsafe { self.gl.viewport(0, 0, gl_size(width), gl_size(height)) };
        }
    }

    /// Reallocate the G-buffer and the 2D layer at a new video size.
    ///
    /// # Safety
    ///
    /// Requires the renderer's context to be current.
    ///
    /// # Errors
    ///
    /// Fails if either target is incomplete after reallocation.
    pub unsafe fn resize_video(&mut self, width: u32, height: u32) -> Result<()> {
        unsafe {
            self.gbuffer.resize(&self.gl, width, height)?;
            self.layer_2d.resize(&self.gl, width, height)?;
            self.restore_target();
        }
        Ok(())
    }

    /// Return to the default framebuffer and clear it to transparent black
    /// with depth testing off, ready for the `draw_*_layer` calls.
    ///
    /// # Safety
    ///
    /// Requires the renderer's context to be current.
    pub unsafe fn clear_layers(&mut self) {
        if let Some(open) = self.passes.end() {
            log::warn!("{open:?} pass still open when compositing; closing it");
        }
        unsafe {
            self.unbind_to_screen();
            self.gl.clear_color(0.0, 0.0, 0.0, 0.0);
            self.gl.disable(glow::DEPTH_TEST);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    /// Open the 3D pass.
    ///
    /// Clears the G-buffer, draws the skybox (if set), and binds the
    /// deferred program with `uViewProjection = projection · camera⁻¹`.
    ///
    /// # Safety
    ///
    /// Requires the renderer's context to be current.
    pub unsafe fn begin_3d(&mut self, projection: Mat4, camera_transform: Mat4) {
        self.open_pass(PassKind::Scene3D);
        self.projection = projection;
        self.view = camera_transform.inverse();

        let gl = &self.gl;
        unsafe {
            self.gbuffer.bind(gl);
            gl.clear_color(0.0, 0.0, 0.0, 0.0);
            gl.enable(glow::DEPTH_TEST);
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
            self.gbuffer.clear_pick(gl);
        }

        if let Some(skybox) = &self.skybox {
            let view_proj = self.projection * strip_translation(self.view);
            unsafe {
                gl.depth_func(glow::LEQUAL);
                self.skybox_shader.set_texture(gl, "uSkybox", skybox, SLOT_ALBEDO);
                self.skybox_shader.set_mat4(gl, "uViewProj", &view_proj);
                self.skybox_cube.draw(gl);
                gl.depth_func(glow::LESS);
            }
        }

        let view_proj = self.projection * self.view;
        unsafe { self.shader_3d.set_mat4(gl, "uViewProjection", &view_proj) };
    }

    /// Draw a model into the G-buffer, tagging its pixels with `draw_id`.
    ///
    /// # Safety
    ///
    /// Requires the renderer's context to be current and the 3D pass to be
    /// open.
    pub unsafe fn draw_model(
        &self,
        model: &Model,
        transform: Mat4,
        material: &Material,
        draw_id: i32,
    ) {
        let gl = &self.gl;
        let albedo = material.albedo_texture.as_deref().unwrap_or(&self.white);
        unsafe {
            self.shader_3d.set_mat4(gl, "uModel", &transform);
            self.shader_3d.set_vec4(gl, "uMat_Albedo", material.albedo);
            self.shader_3d.set_texture(gl, "uMat_AlbedoTex", albedo, SLOT_ALBEDO);
            self.shader_3d.set_i32(gl, "uDrawID", draw_id);
            model.draw(gl);
        }
    }

    /// Close the 3D pass and return to the default framebuffer.
    ///
    /// # Safety
    ///
    /// Requires the renderer's context to be current.
    pub unsafe fn end_3d(&mut self) {
        self.close_pass(PassKind::Scene3D);
        unsafe { self.unbind_to_screen() };
    }

    /// Draw ID under `(x, y)` in the G-buffer (bottom-left origin).
    ///
    /// Works inside or outside the 3D pass. Outside it, the G-buffer is
    /// bound only for the read and the previous target is restored.
    ///
    /// # Safety
    ///
    /// Requires the renderer's context to be current.
    ///
    /// # Errors
    ///
    /// Propagates [`Framebuffer::read_pick_id`] failures.
    pub unsafe fn pick_id_3d(&self, x: i32, y: i32) -> Result<i32> {
        unsafe { self.read_pick(&self.gbuffer, PassKind::Scene3D, x, y) }
    }

    /// Open the 2D pass.
    ///
    /// `camera_center` places the camera origin as a fraction of the video
    /// size (see [`math::projection_2d`]). The layer is cleared to
    /// `clear_color` with depth testing on.
    ///
    /// # Safety
    ///
    /// Requires the renderer's context to be current.
    pub unsafe fn begin_2d(&mut self, camera_transform: Mat4, camera_center: Vec2, clear_color: Vec4) {
        self.open_pass(PassKind::Scene2D);
        let view_proj = view_projection_2d(self.layer_2d.size(), camera_center, camera_transform);

        let gl = &self.gl;
        unsafe {
            self.layer_2d.bind(gl);
            self.set_clear_color(clear_color);
            self.set_depth_testing(true);
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
            self.layer_2d.clear_pick(gl);
            self.shader_2d.set_mat4(gl, "uViewProjection", &view_proj);
        }
    }

    /// Draw a tinted sprite on the unit quad. `None` draws a solid quad of
    /// the tint color.
    ///
    /// # Safety
    ///
    /// Requires the renderer's context to be current and the 2D pass to be
    /// open.
    pub unsafe fn draw_texture(
        &self,
        texture: Option<&Texture>,
        transform: Mat4,
        tint: Vec3,
        draw_id: i32,
    ) {
        let gl = &self.gl;
        unsafe {
            self.shader_2d.set_mat4(gl, "uModel", &transform);
            self.shader_2d.set_vec3(gl, "uTint", tint);
            self.shader_2d
                .set_texture(gl, "uTexture", texture.unwrap_or(&self.white), SLOT_SPRITE);
            self.shader_2d.set_i32(gl, "uDrawID", draw_id);
            self.unit_quad.draw(gl);
        }
    }

    /// Close the 2D pass and return to the default framebuffer.
    ///
    /// # Safety
    ///
    /// Requires the renderer's context to be current.
    pub unsafe fn end_2d(&mut self) {
        self.close_pass(PassKind::Scene2D);
        unsafe { self.unbind_to_screen() };
    }

    /// Draw ID under `(x, y)` in the 2D layer (bottom-left origin). See
    /// [`pick_id_3d`](Self::pick_id_3d).
    ///
    /// # Safety
    ///
    /// Requires the renderer's context to be current.
    ///
    /// # Errors
    ///
    /// Propagates [`Framebuffer::read_pick_id`] failures.
    pub unsafe fn pick_id_2d(&self, x: i32, y: i32) -> Result<i32> {
        unsafe { self.read_pick(&self.layer_2d, PassKind::Scene2D, x, y) }
    }

    /// Open a pass into `target`. Unlike the built-in passes nothing is
    /// cleared; use [`clear_color`](Self::clear_color) and friends.
    ///
    /// # Safety
    ///
    /// Requires the renderer's context to be current and `target` to belong
    /// to it.
    pub unsafe fn begin_pass(&mut self, target: &Framebuffer) {
        let replaced = self.passes.begin_custom(CustomTarget {
            raw: target.raw(),
            size: target.size(),
        });
        log_replaced(PassKind::Custom, replaced);
        unsafe { target.bind(&self.gl) };
    }

    /// Close the custom pass and return to the default framebuffer.
    ///
    /// # Safety
    ///
    /// Requires the renderer's context to be current.
    pub unsafe fn end_pass(&mut self) {
        self.close_pass(PassKind::Custom);
        unsafe { self.unbind_to_screen() };
    }

    /// Draw ID under `(x, y)` in any framebuffer with a pick plane. The
    /// open pass's target is bound again afterwards.
    ///
    /// # Safety
    ///
    /// Requires the renderer's context to be current and `target` to belong
    /// to it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GfxError::NoPickAttachment`] if `target` has no
    /// integer attachment.
    pub unsafe fn pick_id(&self, target: &Framebuffer, x: i32, y: i32) -> Result<i32> {
        unsafe {
            target.bind(&self.gl);
            let id = target.read_pick_id(&self.gl, x, y);
            self.restore_target();
            id
        }
    }

    /// Set the color used by subsequent clears.
    ///
    /// # Safety
    ///
    /// Requires the renderer's context to be current.
    pub unsafe fn set_clear_color(&self, color: Vec4) {
        unsafe { self.gl.clear_color(color.x, color.y, color.z, color.w) };
    }

    /// Clear the bound target's color attachments.
    ///
    /// # Safety
    ///
    /// Requires the renderer's context to be current.
    pub unsafe fn clear_color(&self) {
        unsafe { self.gl.clear(glow::COLOR_BUFFER_BIT) };
    }

    /// Clear the bound target's depth attachment.
    ///
    /// # Safety
    ///
    /// Requires the renderer's context to be current.
    pub unsafe fn clear_depth(&self) {
        unsafe { self.gl.clear(glow::DEPTH_BUFFER_BIT) };
    }

    /// Toggle the depth test.
    ///
    /// # Safety
    ///
    /// Requires the renderer's context to be current.
    pub unsafe fn set_depth_testing(&self, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.enable(glow::DEPTH_TEST);
            } else {
                self.gl.disable(glow::DEPTH_TEST);
            }
        }
    }

    /// Set or clear the cube map drawn behind the 3D pass.
    pub fn set_skybox(&mut self, skybox: Option<Arc<Texture>>) {
        if let Some(texture) = &skybox {
            if texture.kind() != TextureKind::CubeMap {
                log::warn!("skybox texture is not a cube map; it will sample as black");
            }
        }
        self.skybox = skybox;
    }

    /// Bind `shader` and draw the unit quad with it.
    ///
    /// # Safety
    ///
    /// Requires the renderer's context to be current.
    pub unsafe fn draw_quad(&self, shader: &Shader) {
        unsafe {
            shader.bind(&self.gl);
            self.unit_quad.draw(&self.gl);
        }
    }

    /// Draw `text` with a glyph program such as
    /// [`shaders::TEXT_VERTEX_SRC`]/[`shaders::TEXT_FRAGMENT_SRC`].
    ///
    /// The baseline starts at the origin of the program's `model` transform;
    /// set `projection`, `model`, `textColor` and optionally `uDrawID` on
    /// `shader` beforehand. Each glyph is bound to the `text` sampler on
    /// slot 0. The built-in text program writes the 2D layer layout, so draw
    /// it in the 2D pass or a custom pass over [`Framebuffer::layer_2d`].
    ///
    /// # Safety
    ///
    /// Requires the renderer's context to be current and `font` to belong
    /// to it.
    pub unsafe fn draw_text(&self, shader: &Shader, font: &Font, text: &str, scale: f32) {
        let gl = &self.gl;
        unsafe {
            shader.bind(gl);
            self.glyph_vao.bind(gl);
            self.glyph_vbo.bind(gl);
        }

        for quad in font.layout(text, scale) {
            let Some(texture) = font.glyph(quad.ch).and_then(|g| g.texture) else {
                continue;
            };
            unsafe {
                shader.set_texture_raw(gl, "text", texture, SLOT_ALBEDO);
                self.glyph_vbo
                    .sub_data(gl, 0, bytemuck::cast_slice(&quad.vertices));
                gl.draw_arrays(glow::TRIANGLES, 0, GLYPH_VERTICES);
            }
        }

        unsafe {
            self.glyph_vbo.unbind(gl);
            VertexArray::unbind(gl);
        }
    }

    /// Size of `text` as [`draw_text`](Self::draw_text) would lay it out.
    #[must_use]
    pub fn text_size(&self, font: &Font, text: &str, scale: f32) -> Vec2 {
        font.measure(text, scale)
    }

    /// Blend the G-buffer's albedo onto the bound target.
    ///
    /// # Safety
    ///
    /// Requires the renderer's context to be current.
    pub unsafe fn draw_3d_layer(&self) {
        unsafe { self.composite(&self.gbuffer) };
    }

    /// Blend the 2D layer onto the bound target.
    ///
    /// # Safety
    ///
    /// Requires the renderer's context to be current.
    pub unsafe fn draw_2d_layer(&self) {
        unsafe { self.composite(&self.layer_2d) };
    }

    /// Blend a custom pass's albedo onto the bound target.
    ///
    /// # Safety
    ///
    /// Requires the renderer's context to be current and `layer` to belong
    /// to it.
    pub unsafe fn draw_pass_layer(&self, layer: &Framebuffer) {
        unsafe { self.composite(layer) };
    }

    unsafe fn composite(&self, layer: &Framebuffer) {
        let Some(albedo) = layer.albedo_texture() else {
            log::warn!("framebuffer has no albedo attachment to composite");
            return;
        };
        let gl = &self.gl;
        unsafe {
            self.fullscreen_shader.set_texture_raw(gl, "gAlbedo", albedo, SLOT_ALBEDO);
            self.fullscreen_quad.draw(gl);
        }
    }

    unsafe fn read_pick(&self, target: &Framebuffer, kind: PassKind, x: i32, y: i32) -> Result<i32> {
        if self.passes.is_active(kind) {
            unsafe { target.read_pick_id(&self.gl, x, y) }
        } else {
            unsafe { self.pick_id(target, x, y) }
        }
    }

    fn open_pass(&mut self, kind: PassKind) {
        let replaced = self.passes.begin(kind);
        log_replaced(kind, replaced);
    }

    fn close_pass(&mut self, kind: PassKind) {
        match self.passes.end() {
            Some(open) if open == kind => {}
            Some(open) => log::warn!("ending {kind:?} pass but {open:?} pass was open"),
            None => log::warn!("ending {kind:?} pass that was never started"),
        }
    }

    /// Bind whatever the open pass renders into, or the screen.
    unsafe fn restore_target(&self) {
        let gl = &self.gl;
        unsafe {
            match self.passes.target() {
                PassTarget::GBuffer => self.gbuffer.bind(gl),
                PassTarget::Layer2D => self.layer_2d.bind(gl),
                PassTarget::Custom(CustomTarget { raw, size: [width, height] }) => {
                    gl.bind_framebuffer(glow::FRAMEBUFFER, Some(raw));
                    gl.viewport(0, 0, gl_size(width), gl_size(height));
                }
                PassTarget::Screen => self.unbind_to_screen(),
            }
        }
    }

    unsafe fn unbind_to_screen(&self) {
        let [width, height] = self.screen_size;
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            self.gl.viewport(0, 0, gl_size(width), gl_size(height));
        }
    }

    /// Delete all GL resources owned by the renderer.
    ///
    /// Textures handed in through [`set_skybox`](Self::set_skybox) and
    /// [`Material`]s belong to the caller and are left alone.
    ///
    /// # Safety
    ///
    /// Must be called with the renderer's context current, at most once.
    pub unsafe fn destroy(&self) {
        let gl = &self.gl;
        unsafe {
            self.gbuffer.destroy(gl);
            self.layer_2d.destroy(gl);
            self.white.destroy(gl);
            self.fullscreen_quad.destroy(gl);
            self.unit_quad.destroy(gl);
            self.skybox_cube.destroy(gl);
            self.shader_3d.destroy(gl);
            self.shader_2d.destroy(gl);
            self.fullscreen_shader.destroy(gl);
            self.skybox_shader.destroy(gl);
            self.glyph_vao.destroy(gl);
            self.glyph_vbo.destroy(gl);
        }
    }
}

/// A caller-owned framebuffer bound by an open custom pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CustomTarget {
    raw: glow::Framebuffer,
    size: [u32; 2],
}

fn log_replaced(kind: PassKind, replaced: Option<PassKind>) {
    if let Some(open) = replaced {
        log::warn!("{kind:?} pass started while {open:?} pass was open; closing it");
    }
}

/// Drop the translation from a view matrix so the skybox stays centred on
/// the camera.
fn strip_translation(view: Mat4) -> Mat4 {
    Mat4::from_mat3(Mat3::from_mat4(view))
}

/// `projection_2d(video, center) · camera⁻¹` for the 2D pass.
#[allow(clippy::cast_precision_loss)]
fn view_projection_2d(video: [u32; 2], center: Vec2, camera_transform: Mat4) -> Mat4 {
    let (near, far) = DEPTH_RANGE_2D;
    math::projection_2d(
        video[0] as f32,
        video[1] as f32,
        center.x,
        center.y,
        near,
        far,
    ) * camera_transform.inverse()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn assert_vec3_eq(actual: Vec3, expected: Vec3) {
        assert!(
            actual.abs_diff_eq(expected, 1e-4),
            "expected {expected:?}, got {actual:?}",
        );
    }

    #[test]
    fn strip_translation_keeps_rotation_only() {
        let view = Mat4::from_translation(Vec3::new(4.0, -2.0, 9.0))
            * Mat4::from_rotation_y(0.5);
        let stripped = strip_translation(view);
        assert_vec3_eq(stripped.w_axis.truncate(), Vec3::ZERO);
        assert_vec3_eq(
            stripped.transform_vector3(Vec3::X),
            view.transform_vector3(Vec3::X),
        );
    }

    #[test]
    fn centred_2d_camera_maps_origin_to_clip_centre() {
        let vp = view_projection_2d([1920, 1080], Vec2::new(0.5, 0.5), Mat4::IDENTITY);
        let clip = vp.project_point3(Vec3::ZERO);
        assert!(clip.x.abs() < 1e-6 && clip.y.abs() < 1e-6);

        let corner = vp.project_point3(Vec3::new(960.0, 540.0, 0.0));
        assert_vec3_eq(corner.truncate().extend(0.0), Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn bottom_left_2d_camera_maps_origin_to_clip_corner() {
        let vp = view_projection_2d([800, 600], Vec2::ZERO, Mat4::IDENTITY);
        let clip = vp.project_point3(Vec3::ZERO);
        assert_vec3_eq(clip.truncate().extend(0.0), Vec3::new(-1.0, -1.0, 0.0));
    }

    #[test]
    fn moving_the_2d_camera_moves_the_world_the_other_way() {
        let camera = Mat4::from_translation(Vec3::new(100.0, 0.0, 0.0));
        let vp = view_projection_2d([200, 200], Vec2::new(0.5, 0.5), camera);
        // The camera now looks at x = 100, which lands in the centre.
        let clip = vp.project_point3(Vec3::new(100.0, 0.0, 0.0));
        assert!(clip.x.abs() < 1e-6);
    }

    #[test]
    fn glyph_upload_matches_quad_size() {
        assert_eq!(GLYPH_BYTES, std::mem::size_of::<[[f32; 4]; 6]>());
        assert_eq!(usize::try_from(GLYPH_VERTICES).unwrap(), 6);
    }
}
