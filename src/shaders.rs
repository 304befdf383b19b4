//! GLSL shader sources, compilation helpers, and the [`Shader`] program
//! wrapper.
//!
//! All built-in shaders target GLSL 3.30 core (OpenGL 3.3), which is the
//! minimum for explicit output locations and integer render targets.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use glam::{Mat4, Vec3, Vec4};
use glow::HasContext;

use crate::error::{GfxError, Result};
use crate::texture::Texture;

/// Vertex shader for the deferred geometry pass.
///
/// # Uniforms
///
/// | Name              | Type   | Description                         |
/// |-------------------|--------|-------------------------------------|
/// | `uViewProjection` | `mat4` | Projection × view                   |
/// | `uModel`          | `mat4` | Model transform                     |
pub const GBUFFER_VERTEX_SRC: &str = r"#version 330 core

layout(location = 0) in vec3 aPos;
layout(location = 1) in vec3 aNormal;
layout(location = 2) in vec2 aUV;

uniform mat4 uViewProjection;
uniform mat4 uModel;

out vec3 vWorldPos;
out vec3 vNormal;
out vec2 vUV;

void main() {
    vec4 world = uModel * vec4(aPos, 1.0);
    vWorldPos = world.xyz;
    vNormal = mat3(transpose(inverse(uModel))) * aNormal;
    vUV = aUV;
    gl_Position = uViewProjection * world;
}
";

/// Fragment shader for the deferred geometry pass.
///
/// Writes world position, normal, albedo, and the draw ID into the four
/// G-buffer attachments.
///
/// # Uniforms
///
/// | Name             | Type        | Description                  |
/// |------------------|-------------|------------------------------|
/// | `uMat_Albedo`    | `vec4`      | Material base color          |
/// | `uMat_AlbedoTex` | `sampler2D` | Albedo texture (slot 0)      |
/// | `uDrawID`        | `int`       | ID written to the pick plane |
pub const GBUFFER_FRAGMENT_SRC: &str = r"#version 330 core

in vec3 vWorldPos;
in vec3 vNormal;
in vec2 vUV;

uniform vec4 uMat_Albedo;
uniform sampler2D uMat_AlbedoTex;
uniform int uDrawID;

layout(location = 0) out vec4 gPosition;
layout(location = 1) out vec4 gNormal;
layout(location = 2) out vec4 gAlbedo;
layout(location = 3) out int gDrawID;

void main() {
    gPosition = vec4(vWorldPos, 1.0);
    gNormal = vec4(normalize(vNormal), 1.0);
    gAlbedo = uMat_Albedo * texture(uMat_AlbedoTex, vUV);
    gDrawID = uDrawID;
}
";

/// Vertex shader for 2D sprites drawn on the unit quad.
pub const SPRITE_VERTEX_SRC: &str = r"#version 330 core

layout(location = 0) in vec2 aPos;
layout(location = 1) in vec2 aUV;

uniform mat4 uViewProjection;
uniform mat4 uModel;

out vec2 vUV;

void main() {
    vUV = aUV;
    gl_Position = uViewProjection * uModel * vec4(aPos, 0.0, 1.0);
}
";

/// Fragment shader for 2D sprites.
///
/// Fully transparent texels are discarded so they neither write depth nor
/// claim the pick plane.
///
/// # Uniforms
///
/// | Name       | Type        | Description                  |
/// |------------|-------------|------------------------------|
/// | `uTint`    | `vec3`      | Color multiplier             |
/// | `uTexture` | `sampler2D` | Sprite texture (slot 1)      |
/// | `uDrawID`  | `int`       | ID written to the pick plane |
pub const SPRITE_FRAGMENT_SRC: &str = r"#version 330 core

in vec2 vUV;

uniform vec3 uTint;
uniform sampler2D uTexture;
uniform int uDrawID;

layout(location = 0) out vec4 gAlbedo;
layout(location = 1) out int gDrawID;

void main() {
    vec4 color = texture(uTexture, vUV);
    if (color.a == 0.0) {
        discard;
    }
    gAlbedo = vec4(color.rgb * uTint, color.a);
    gDrawID = uDrawID;
}
";

/// Vertex shader for compositing a layer onto the screen.
pub const FULLSCREEN_VERTEX_SRC: &str = r"#version 330 core

layout(location = 0) in vec2 aPos;
layout(location = 1) in vec2 aUV;

out vec2 vUV;

void main() {
    vUV = aUV;
    gl_Position = vec4(aPos, 0.0, 1.0);
}
";

/// Fragment shader for compositing: samples `gAlbedo` on slot 0.
pub const FULLSCREEN_FRAGMENT_SRC: &str = r"#version 330 core

in vec2 vUV;

uniform sampler2D gAlbedo;

out vec4 fragColor;

void main() {
    fragColor = texture(gAlbedo, vUV);
}
";

/// Vertex shader for the skybox cube.
///
/// Forces depth to the far plane so the skybox sits behind all geometry
/// when drawn with `LEQUAL`.
pub const SKYBOX_VERTEX_SRC: &str = r"#version 330 core

layout(location = 0) in vec3 aPos;

uniform mat4 uViewProj;

out vec3 vDir;

void main() {
    vDir = aPos;
    vec4 pos = uViewProj * vec4(aPos, 1.0);
    gl_Position = pos.xyww;
}
";

/// Fragment shader for the skybox. The draw ID plane is written as 0.
pub const SKYBOX_FRAGMENT_SRC: &str = r"#version 330 core

in vec3 vDir;

uniform samplerCube uSkybox;

layout(location = 0) out vec4 gPosition;
layout(location = 1) out vec4 gNormal;
layout(location = 2) out vec4 gAlbedo;
layout(location = 3) out int gDrawID;

void main() {
    gPosition = vec4(0.0);
    gNormal = vec4(0.0);
    gAlbedo = texture(uSkybox, vDir);
    gDrawID = 0;
}
";

/// Vertex shader for glyph quads.
///
/// Each vertex packs position and UV into one `vec4`: `(x, y, u, v)`.
///
/// # Uniforms
///
/// | Name         | Type   | Description                  |
/// |--------------|--------|------------------------------|
/// | `projection` | `mat4` | Usually [`crate::math::projection_2d`] |
/// | `model`      | `mat4` | Placement of the text origin |
pub const TEXT_VERTEX_SRC: &str = r"#version 330 core

layout(location = 0) in vec4 vertex;

uniform mat4 projection;
uniform mat4 model;

out vec2 vUV;

void main() {
    vUV = vertex.zw;
    gl_Position = projection * model * vec4(vertex.xy, 0.0, 1.0);
}
";

/// Fragment shader for glyph quads. Coverage comes from the red channel of
/// the glyph texture bound to `text`.
///
/// Writes the same outputs as [`SPRITE_FRAGMENT_SRC`], so it targets the 2D
/// layer layout. Uncovered texels are discarded and leave depth and the
/// draw ID plane untouched.
///
/// # Uniforms
///
/// | Name        | Type        | Description                          |
/// |-------------|-------------|--------------------------------------|
/// | `text`      | `sampler2D` | Glyph coverage                       |
/// | `textColor` | `vec3`      | Text color                           |
/// | `uDrawID`   | `int`       | Pick ID for covered pixels, 0 if unset |
pub const TEXT_FRAGMENT_SRC: &str = r"#version 330 core

in vec2 vUV;

uniform sampler2D text;
uniform vec3 textColor;
uniform int uDrawID;

layout(location = 0) out vec4 color;
layout(location = 1) out int gDrawID;

void main() {
    float coverage = texture(text, vUV).r;
    if (coverage == 0.0) {
        discard;
    }
    color = vec4(textColor, coverage);
    gDrawID = uDrawID;
}
";

/// Vertex and fragment source split out of a combined shader file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderSources {
    /// Vertex stage source.
    pub vertex: String,
    /// Fragment stage source.
    pub fragment: String,
}

impl ShaderSources {
    /// Split a combined file on `#shader vertex` / `#shader fragment`
    /// marker lines.
    ///
    /// Lines before the first marker are dropped. Each kept line is
    /// terminated with `\n`.
    ///
    /// # Errors
    ///
    /// Returns [`GfxError::MissingShaderSection`] if either stage is absent
    /// or empty.
    pub fn parse(text: &str) -> Result<Self> {
        let mut sources = Self::default();
        let mut current: Option<&mut String> = None;

        for line in text.lines() {
            if line.starts_with("#shader vertex") {
                current = Some(&mut sources.vertex);
                continue;
            }
            if line.starts_with("#shader fragment") {
                current = Some(&mut sources.fragment);
                continue;
            }
            if let Some(target) = current.as_deref_mut() {
                target.push_str(line);
                target.push('\n');
            }
        }

        if sources.vertex.trim().is_empty() {
            return Err(GfxError::MissingShaderSection("vertex"));
        }
        if sources.fragment.trim().is_empty() {
            return Err(GfxError::MissingShaderSection("fragment"));
        }
        Ok(sources)
    }
}

/// Compile a shader program from vertex and fragment source strings.
///
/// The compiled shader objects are detached and deleted after successful
/// linking, so only the program handle needs to be cleaned up by the caller.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
///
/// # Errors
///
/// Returns [`GfxError::ShaderCompile`] or [`GfxError::ShaderLink`] with the
/// driver's info log.
pub unsafe fn compile_program(
    gl: &glow::Context,
    vertex_src: &str,
    fragment_src: &str,
) -> Result<glow::Program> {
    let program = unsafe { gl.create_program() }.map_err(GfxError::Gl)?;

    let vs = unsafe { compile_shader(gl, glow::VERTEX_SHADER, vertex_src) };
    let vs = match vs {
        Ok(vs) => vs,
        Err(e) => {
            unsafe { gl.delete_program(program) };
            return Err(e);
        }
    };
    let fs = unsafe { compile_shader(gl, glow::FRAGMENT_SHADER, fragment_src) };
    let fs = match fs {
        Ok(fs) => fs,
        Err(e) => {
            unsafe {
                gl.delete_shader(vs);
                gl.delete_program(program);
            }
            return Err(e);
        }
    };

    unsafe {
        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        gl.link_program(program);

        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            gl.delete_shader(vs);
            gl.delete_shader(fs);
            return Err(GfxError::ShaderLink(log));
        }

        gl.detach_shader(program, vs);
        gl.detach_shader(program, fs);
        gl.delete_shader(vs);
        gl.delete_shader(fs);
    }

    Ok(program)
}

/// Compile a single shader stage (vertex or fragment) from source.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
unsafe fn compile_shader(
    gl: &glow::Context,
    shader_type: u32,
    source: &str,
) -> Result<glow::Shader> {
    let stage = match shader_type {
        glow::VERTEX_SHADER => "vertex",
        glow::FRAGMENT_SHADER => "fragment",
        _ => "unknown",
    };

    unsafe {
        let shader = gl.create_shader(shader_type).map_err(GfxError::Gl)?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);

        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(GfxError::ShaderCompile { stage, log });
        }

        Ok(shader)
    }
}

/// A linked shader program with a per-name uniform location cache.
///
/// Uniform setters bind the program first, so they can be called in any
/// order. Setting a uniform the program does not declare (or that the
/// driver optimized away) does nothing.
pub struct Shader {
    program: glow::Program,
    uniforms: RefCell<HashMap<String, Option<glow::UniformLocation>>>,
}

impl Shader {
    /// Compile and link a program from separate stage sources.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// See [`compile_program`].
    pub unsafe fn from_sources(gl: &glow::Context, vertex: &str, fragment: &str) -> Result<Self> {
        let program = unsafe { compile_program(gl, vertex, fragment) }?;
        log::debug!("linked shader program {program:?}");
        Ok(Self {
            program,
            uniforms: RefCell::new(HashMap::new()),
        })
    }

    /// Compile a program from a combined `#shader vertex` /
    /// `#shader fragment` source.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Fails if a section is missing or compilation fails.
    pub unsafe fn from_combined(gl: &glow::Context, text: &str) -> Result<Self> {
        let sources = ShaderSources::parse(text)?;
        unsafe { Self::from_sources(gl, &sources.vertex, &sources.fragment) }
    }

    /// Read a combined shader file and compile it.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, a section is missing, or
    /// compilation fails.
    pub unsafe fn load(gl: &glow::Context, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| GfxError::io(path, e))?;
        log::debug!("loading shader {}", path.display());
        unsafe { Self::from_combined(gl, &text) }
    }

    /// The raw program handle.
    #[must_use]
    pub fn raw(&self) -> glow::Program {
        self.program
    }

    /// Make this the active program.
    ///
    /// # Safety
    ///
    /// Requires the context this shader was created with to be current.
    pub unsafe fn bind(&self, gl: &glow::Context) {
        unsafe { gl.use_program(Some(self.program)) };
    }

    /// Look up (and cache) a uniform location.
    unsafe fn location(&self, gl: &glow::Context, name: &str) -> Option<glow::UniformLocation> {
        if let Some(cached) = self.uniforms.borrow().get(name) {
            return cached.clone();
        }
        let location = unsafe { gl.get_uniform_location(self.program, name) };
        if location.is_none() {
            log::trace!("uniform `{name}` not found in program {:?}", self.program);
        }
        self.uniforms
            .borrow_mut()
            .insert(name.to_owned(), location.clone());
        location
    }

    /// Set a `mat4` uniform.
    ///
    /// # Safety
    ///
    /// Requires the context this shader was created with to be current.
    pub unsafe fn set_mat4(&self, gl: &glow::Context, name: &str, value: &Mat4) {
        unsafe {
            self.bind(gl);
            let location = self.location(gl, name);
            gl.uniform_matrix_4_f32_slice(location.as_ref(), false, &value.to_cols_array());
        }
    }

    /// Set a `vec3` uniform.
    ///
    /// # Safety
    ///
    /// Requires the context this shader was created with to be current.
    pub unsafe fn set_vec3(&self, gl: &glow::Context, name: &str, value: Vec3) {
        unsafe {
            self.bind(gl);
            let location = self.location(gl, name);
            gl.uniform_3_f32(location.as_ref(), value.x, value.y, value.z);
        }
    }

    /// Set a `vec4` uniform.
    ///
    /// # Safety
    ///
    /// Requires the context this shader was created with to be current.
    pub unsafe fn set_vec4(&self, gl: &glow::Context, name: &str, value: Vec4) {
        unsafe {
            self.bind(gl);
            let location = self.location(gl, name);
            gl.uniform_4_f32(location.as_ref(), value.x, value.y, value.z, value.w);
        }
    }

    /// Set a `float` uniform.
    ///
    /// # Safety
    ///
    /// Requires the context this shader was created with to be current.
    pub unsafe fn set_f32(&self, gl: &glow::Context, name: &str, value: f32) {
        unsafe {
            self.bind(gl);
            let location = self.location(gl, name);
            gl.uniform_1_f32(location.as_ref(), value);
        }
    }

    /// Set an `int` uniform.
    ///
    /// # Safety
    ///
    /// Requires the context this shader was created with to be current.
    pub unsafe fn set_i32(&self, gl: &glow::Context, name: &str, value: i32) {
        unsafe {
            self.bind(gl);
            let location = self.location(gl, name);
            gl.uniform_1_i32(location.as_ref(), value);
        }
    }

    /// Bind `texture` to unit `slot` and point the sampler `name` at it.
    ///
    /// # Safety
    ///
    /// Requires the context this shader was created with to be current.
    pub unsafe fn set_texture(&self, gl: &glow::Context, name: &str, texture: &Texture, slot: u32) {
        unsafe {
            self.bind(gl);
            texture.bind(gl, slot);
            self.set_sampler(gl, name, slot);
        }
    }

    /// Bind a raw 2D texture handle to unit `slot` and point the sampler
    /// `name` at it.
    ///
    /// # Safety
    ///
    /// Requires the context this shader was created with to be current.
    pub unsafe fn set_texture_raw(
        &self,
        gl: &glow::Context,
        name: &str,
        texture: glow::Texture,
        slot: u32,
    ) {
        unsafe {
            self.bind(gl);
            gl.active_texture(glow::TEXTURE0 + slot);
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.set_sampler(gl, name, slot);
        }
    }

    unsafe fn set_sampler(&self, gl: &glow::Context, name: &str, slot: u32) {
        let unit = i32::try_from(slot).unwrap_or(0);
        unsafe {
            let location = self.location(gl, name);
            gl.uniform_1_i32(location.as_ref(), unit);
        }
    }

    /// Delete the program.
    ///
    /// # Safety
    ///
    /// Must be called with the context this shader was created with, at most
    /// once.
    pub unsafe fn destroy(&self, gl: &glow::Context) {
        unsafe { gl.delete_program(self.program) };
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_sections() {
        let text = "#shader vertex\nvoid main() {}\n#shader fragment\nout vec4 c;\nvoid main() {}\n";
        let sources = ShaderSources::parse(text).unwrap();
        assert_eq!(sources.vertex, "void main() {}\n");
        assert_eq!(sources.fragment, "out vec4 c;\nvoid main() {}\n");
    }

    #[test]
    fn parse_ignores_preamble() {
        let text = "// shared header\n#shader fragment\nF\n#shader vertex\nV\n";
        let sources = ShaderSources::parse(text).unwrap();
        assert_eq!(sources.vertex, "V\n");
        assert_eq!(sources.fragment, "F\n");
    }

    #[test]
    fn parse_accumulates_repeated_sections() {
        let text = "#shader vertex\nA\n#shader fragment\nF\n#shader vertex\nB\n";
        let sources = ShaderSources::parse(text).unwrap();
        assert_eq!(sources.vertex, "A\nB\n");
    }

    #[test]
    fn parse_keeps_blank_lines() {
        let text = "#shader vertex\nA\n\nB\n#shader fragment\nF";
        let sources = ShaderSources::parse(text).unwrap();
        assert_eq!(sources.vertex, "A\n\nB\n");
        assert_eq!(sources.fragment, "F\n");
    }

    #[test]
    fn parse_rejects_missing_fragment() {
        let err = ShaderSources::parse("#shader vertex\nV\n").unwrap_err();
        assert!(matches!(err, GfxError::MissingShaderSection("fragment")));
    }

    #[test]
    fn parse_rejects_empty_vertex() {
        let err = ShaderSources::parse("#shader vertex\n\n#shader fragment\nF\n").unwrap_err();
        assert!(matches!(err, GfxError::MissingShaderSection("vertex")));
    }

    #[test]
    fn builtin_shaders_target_glsl_330() {
        for src in [
            GBUFFER_VERTEX_SRC,
            GBUFFER_FRAGMENT_SRC,
            SPRITE_VERTEX_SRC,
            SPRITE_FRAGMENT_SRC,
            FULLSCREEN_VERTEX_SRC,
            FULLSCREEN_FRAGMENT_SRC,
            SKYBOX_VERTEX_SRC,
            SKYBOX_FRAGMENT_SRC,
            TEXT_VERTEX_SRC,
            TEXT_FRAGMENT_SRC,
        ] {
            assert!(src.starts_with("#version 330 core\n"), "{src}");
            assert!(src.contains("void main()"), "{src}");
        }
    }

    #[test]
    fn gbuffer_outputs_match_attachment_order() {
        let pos = GBUFFER_FRAGMENT_SRC.find("location = 0) out vec4 gPosition").unwrap();
        let normal = GBUFFER_FRAGMENT_SRC.find("location = 1) out vec4 gNormal").unwrap();
        let albedo = GBUFFER_FRAGMENT_SRC.find("location = 2) out vec4 gAlbedo").unwrap();
        let id = GBUFFER_FRAGMENT_SRC.find("location = 3) out int gDrawID").unwrap();
        assert!(pos < normal && normal < albedo && albedo < id);
        assert!(SKYBOX_FRAGMENT_SRC.contains("location = 3) out int gDrawID"));
    }

    #[test]
    fn sprite_outputs_match_layer_attachments() {
        assert!(SPRITE_FRAGMENT_SRC.contains("location = 0) out vec4 gAlbedo"));
        assert!(SPRITE_FRAGMENT_SRC.contains("location = 1) out int gDrawID"));
        assert!(TEXT_FRAGMENT_SRC.contains("location = 0) out vec4 color"));
        assert!(TEXT_FRAGMENT_SRC.contains("location = 1) out int gDrawID"));
    }

    #[test]
    fn layer_shaders_discard_uncovered_texels() {
        for src in [SPRITE_FRAGMENT_SRC, TEXT_FRAGMENT_SRC] {
            assert!(src.contains("uniform int uDrawID;"), "{src}");
            assert!(src.contains("gDrawID = uDrawID;"), "{src}");
            let discard = src.find("discard;").unwrap();
            let write = src.find("gDrawID = uDrawID;").unwrap();
            assert!(discard < write, "{src}");
        }
    }
}
