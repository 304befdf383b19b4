//! A small OpenGL rendering framework built on [glow].
//!
//! This crate provides [`Renderer`], which draws a frame as a sequence of
//! offscreen passes and then composites them onto the screen:
//!
//! - **3D pass**: models are rendered into a G-buffer (position, normal,
//!   albedo, draw ID), optionally behind a cube-map skybox.
//! - **2D pass**: tinted sprites and text are rendered into a separate
//!   layer with its own orthographic camera.
//! - **Custom passes**: any [`Framebuffer`] can be a pass target.
//! - **Picking**: every target has an integer plane holding the draw ID of
//!   the nearest surface, read back with [`Renderer::pick_id_3d`],
//!   [`Renderer::pick_id_2d`] or [`Renderer::pick_id`].
//!
//! Text is rasterized with [fontdue], images are decoded with [image], and
//! Wavefront OBJ models are loaded with [tobj]. The `window` feature adds an
//! SDL2 window that owns the GL context.
//!
//! # Safety
//!
//! Everything that touches GL requires a valid, current OpenGL 3.3 core
//! context. Those methods are `unsafe` because they issue raw GL calls.
//!
//! [glow]: https://docs.rs/glow
//! [fontdue]: https://docs.rs/fontdue
//! [image]: https://docs.rs/image
//! [tobj]: https://docs.rs/tobj

pub mod buffer;
pub mod config;
pub mod error;
pub mod font;
pub mod framebuffer;
pub mod logging;
pub mod math;
pub mod model;
pub mod pass;
mod render;
mod rollback;
pub mod shaders;
pub mod texture;
mod types;
pub mod viewport;
#[cfg(feature = "window")]
pub mod window;

pub use config::GfxConfig;
pub use error::{GfxError, Result};
pub use font::Font;
pub use framebuffer::{Framebuffer, FramebufferLayout};
pub use model::Model;
pub use pass::PassKind;
pub use render::Renderer;
pub use shaders::Shader;
pub use texture::Texture;
pub use types::{Material, Vertex2D, Vertex3D};
pub use viewport::Viewport;
#[cfg(feature = "window")]
pub use window::Window;
