//! Interactive playground: a 3D model, two tinted sprites, rotating text,
//! and a custom text pass, composited every frame.
//!
//! ```text
//! cargo run --example playground --features window -- <font.ttf> [model.obj] [sprite.png]
//! ```
//!
//! Settings are read from `playground.toml` in the working directory when it
//! exists. Hover the sprites or the rotating text to log their draw IDs; hold `E` to free the
//! cursor and press `Escape` to quit.

use std::path::Path;
use std::sync::Arc;

use deferred_glow::logging::{init_logging, LoggingConfig};
use deferred_glow::math::{model_matrix, model_matrix_2d, perspective, projection_2d};
use deferred_glow::{
    Font, Framebuffer, GfxConfig, Material, Model, Renderer, Result, Shader, Texture, Vertex3D,
    Window,
};
use glam::{Mat4, Vec2, Vec3, Vec4};

const CONFIG_PATH: &str = "playground.toml";

const MODEL_ID: i32 = 12;
const LEFT_SPRITE_ID: i32 = 13;
const RIGHT_SPRITE_ID: i32 = 14;
const TEXT_ID: i32 = 15;

fn main() -> Result<()> {
    let config = if Path::new(CONFIG_PATH).exists() {
        GfxConfig::load(CONFIG_PATH)?
    } else {
        GfxConfig::default()
    };
    init_logging(LoggingConfig::from(&config.logging));

    let mut args = std::env::args().skip(1);
    let font_path = args.next();
    let model_path = args.next();
    let sprite_path = args.next();

    let mut window = Window::new(&config)?;
    let gl = window.gl();
    let mut renderer = unsafe { Renderer::new(Arc::clone(&gl), &config) }?;

    let font = match &font_path {
        Some(path) => Some(unsafe { Font::load(&gl, path, config.text.pixel_size) }?),
        None => {
            log::warn!("no font given; text is disabled");
            None
        }
    };
    let model = match &model_path {
        Some(path) => unsafe { Model::load_obj(&gl, path) }?,
        None => unsafe { cube(&gl) }?,
    };
    let sprite = match &sprite_path {
        Some(path) => Some(Arc::new(unsafe { Texture::load(&gl, path) }?)),
        None => None,
    };
    let text_shader = unsafe {
        Shader::from_sources(
            &gl,
            deferred_glow::shaders::TEXT_VERTEX_SRC,
            deferred_glow::shaders::TEXT_FRAGMENT_SRC,
        )
    }?;

    let [video_width, video_height] = config.video_size();
    let main_pass = unsafe { Framebuffer::layer_2d(&gl, video_width, video_height) }?;

    #[allow(clippy::cast_precision_loss)]
    let (width, height) = (video_width as f32, video_height as f32);
    let projection = perspective(width / height, 60.0, 0.1, 500.0);
    let camera = Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0));
    let centred_text = projection_2d(width, height, 0.5, 0.5, 0.0, 10.0);
    let corner_text = projection_2d(width, height, 0.0, 0.0, 0.0, 10.0);

    let material = Material {
        albedo: Vec4::ONE,
        albedo_texture: sprite.clone(),
    };
    let sprite_size = Vec2::splat(160.0);

    let mut t = 0.0_f32;
    let mut hovered = 0;

    while !window.should_close() {
        if let Some([w, h]) = window.poll_events() {
            unsafe { renderer.set_screen_size(w, h) };
        }
        let [mouse_x, mouse_y] = window.mouse_position();
        let [pick_x, pick_y] = window.viewport().window_to_pick(mouse_x, mouse_y);

        unsafe {
            renderer.begin_3d(projection, camera);
            renderer.draw_model(
                &model,
                model_matrix(
                    Vec3::ZERO,
                    Vec3::new(90.0, 180.0 + t * 20.0, 90.0),
                    Vec3::ONE,
                    Vec3::ZERO,
                    Mat4::IDENTITY,
                ),
                &material,
                MODEL_ID,
            );
            renderer.end_3d();

            renderer.begin_2d(
                model_matrix(
                    Vec3::Z,
                    Vec3::new(0.0, 0.0, t * 10.0),
                    Vec3::ONE,
                    Vec3::ZERO,
                    Mat4::IDENTITY,
                ),
                Vec2::splat(0.5),
                Vec4::ZERO,
            );
            renderer.draw_texture(
                sprite.as_deref(),
                model_matrix_2d(Vec2::new(-200.0, 0.0), 0.0, sprite_size, Vec2::ZERO),
                Vec3::new(0.0, 1.0, 1.0),
                LEFT_SPRITE_ID,
            );
            renderer.draw_texture(
                sprite.as_deref(),
                model_matrix_2d(Vec2::new(200.0, 0.0), 0.0, sprite_size, Vec2::ZERO),
                Vec3::new(1.0, 0.0, 1.0),
                RIGHT_SPRITE_ID,
            );
            if let Some(font) = &font {
                text_shader.set_mat4(&gl, "projection", &centred_text);
                text_shader.set_vec3(&gl, "textColor", Vec3::ONE);
                text_shader.set_i32(&gl, "uDrawID", TEXT_ID);
                text_shader.set_mat4(
                    &gl,
                    "model",
                    &model_matrix_2d(Vec2::splat(200.0), t * 100.0, Vec2::ONE, Vec2::ZERO),
                );
                renderer.draw_text(&text_shader, font, "deferred glow", 1.0);
            }
            let id = renderer.pick_id_2d(pick_x, pick_y)?;
            renderer.end_2d();

            if id != hovered {
                log::info!("2D pick under cursor: {id}");
                hovered = id;
            }

            renderer.begin_pass(&main_pass);
            renderer.set_depth_testing(false);
            renderer.set_clear_color(Vec4::ZERO);
            renderer.clear_color();
            if let Some(font) = &font {
                let first = "first line of text";
                text_shader.set_mat4(&gl, "projection", &corner_text);
                text_shader.set_vec3(&gl, "textColor", Vec3::new(1.0, 0.8, 0.2));
                text_shader.set_i32(&gl, "uDrawID", 0);
                text_shader.set_mat4(&gl, "model", &Mat4::IDENTITY);
                renderer.draw_text(&text_shader, font, first, 1.0);

                let size = renderer.text_size(font, first, 1.0);
                text_shader.set_mat4(
                    &gl,
                    "model",
                    &model_matrix_2d(size, 0.0, Vec2::ONE, Vec2::ZERO),
                );
                renderer.draw_text(&text_shader, font, "and a second one", 1.0);
            }
            renderer.end_pass();

            renderer.clear_layers();
            renderer.draw_3d_layer();
            renderer.draw_2d_layer();
            renderer.draw_pass_layer(&main_pass);
        }

        window.swap_buffers();
        t += 0.01;
    }

    unsafe {
        main_pass.destroy(&gl);
        text_shader.destroy(&gl);
        model.destroy(&gl);
        if let Some(font) = &font {
            font.destroy(&gl);
        }
        if let Some(sprite) = &sprite {
            sprite.destroy(&gl);
        }
        renderer.destroy();
    }
    Ok(())
}

/// A unit cube with per-face normals, used when no OBJ file is given.
unsafe fn cube(gl: &glow::Context) -> Result<Model> {
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]),
        ([-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 1.0, 0.0], [0.0, 0.0, -1.0], [1.0, 0.0, 0.0]),
        ([0.0, -1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
        ([0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
        ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [-1.0, 0.0, 0.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, up, right) in FACES {
        let (n, u, r) = (Vec3::from(normal), Vec3::from(up), Vec3::from(right));
        let base = u32::try_from(vertices.len()).unwrap_or(0);
        for (corner, uv) in [
            (n - r + u, [0.0, 1.0]),
            (n - r - u, [0.0, 0.0]),
            (n + r - u, [1.0, 0.0]),
            (n + r + u, [1.0, 1.0]),
        ] {
            vertices.push(Vertex3D {
                position: (corner * 0.5).to_array(),
                normal,
                uv,
            });
        }
        indices.extend([0, 1, 2, 0, 2, 3].map(|i| base + i));
    }

    unsafe { Model::from_vertices(gl, &vertices, &indices, &Vertex3D::layout()) }
}
