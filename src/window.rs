//! SDL2 window with an OpenGL 3.3 core context.
//!
//! Only built with the `window` feature.

use std::sync::Arc;

use sdl2::event::{Event, WindowEvent};
use sdl2::keyboard::Keycode;
use sdl2::video::{GLContext, GLProfile, SwapInterval};
use sdl2::{EventPump, Sdl, VideoSubsystem};

use crate::config::GfxConfig;
use crate::error::{GfxError, Result};
use crate::viewport::Viewport;

/// A resizable window owning the GL context the renderer draws with.
///
/// Escape or closing the window requests shutdown. Holding `E` releases the
/// cursor; releasing it captures the cursor again in relative mode.
pub struct Window {
    gl: Arc<glow::Context>,
    // Dropped before `window` so the context is destroyed first.
    _gl_context: GLContext,
    window: sdl2::video::Window,
    event_pump: EventPump,
    video: VideoSubsystem,
    sdl: Sdl,
    window_size: [u32; 2],
    video_size: [u32; 2],
    should_close: bool,
}

impl Window {
    /// Open the window described by `config` and make its context current.
    ///
    /// # Errors
    ///
    /// Returns [`GfxError::Window`] if SDL, the window, or the GL context
    /// cannot be initialized.
    pub fn new(config: &GfxConfig) -> Result<Self> {
        let sdl = sdl2::init().map_err(GfxError::Window)?;
        let video = sdl.video().map_err(GfxError::Window)?;

        let attr = video.gl_attr();
        attr.set_context_profile(GLProfile::Core);
        attr.set_context_version(3, 3);

        let [width, height] = config.window_size();
        let window = video
            .window(&config.window.title, width, height)
            .opengl()
            .resizable()
            .position_centered()
            .build()
            .map_err(|e| GfxError::Window(e.to_string()))?;

        let gl_context = window.gl_create_context().map_err(GfxError::Window)?;
        window.gl_make_current(&gl_context).map_err(GfxError::Window)?;

        let interval = if config.window.vsync {
            SwapInterval::VSync
        } else {
            SwapInterval::Immediate
        };
        if let Err(e) = video.gl_set_swap_interval(interval) {
            log::warn!("could not set swap interval (vsync: {}): {e}", config.window.vsync);
        }

        // SAFETY: the context created above is current on this thread.
        let gl = unsafe {
            glow::Context::from_loader_function(|name| video.gl_get_proc_address(name).cast())
        };
        let event_pump = sdl.event_pump().map_err(GfxError::Window)?;

        let window_size = window.drawable_size().into();
        log::info!(
            "opened {}x{} window \"{}\" (vsync: {})",
            width,
            height,
            config.window.title,
            config.window.vsync,
        );

        Ok(Self {
            gl: Arc::new(gl),
            _gl_context: gl_context,
            window,
            event_pump,
            video,
            sdl,
            window_size,
            video_size: config.video_size(),
            should_close: false,
        })
    }

    /// The GL context, to hand to [`crate::Renderer::new`].
    #[must_use]
    pub fn gl(&self) -> Arc<glow::Context> {
        Arc::clone(&self.gl)
    }

    /// Drain pending events.
    ///
    /// Returns the new drawable size if the window was resized, which
    /// should be forwarded to [`crate::Renderer::set_screen_size`].
    pub fn poll_events(&mut self) -> Option<[u32; 2]> {
        let mut resized = false;
        let mouse = self.sdl.mouse();

        for event in self.event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyUp {
                    keycode: Some(Keycode::Escape),
                    ..
                } => self.should_close = true,
                Event::KeyDown {
                    keycode: Some(Keycode::E),
                    repeat: false,
                    ..
                } => mouse.set_relative_mouse_mode(false),
                Event::KeyUp {
                    keycode: Some(Keycode::E),
                    ..
                } => mouse.set_relative_mouse_mode(true),
                Event::Window {
                    win_event: WindowEvent::SizeChanged(..),
                    ..
                } => resized = true,
                _ => {}
            }
        }

        if !resized {
            return None;
        }
        self.window_size = self.window.drawable_size().into();
        log::debug!(
            "window resized to {}x{}",
            self.window_size[0],
            self.window_size[1]
        );
        Some(self.window_size)
    }

    /// Whether the user asked to close the window.
    #[must_use]
    pub fn should_close(&self) -> bool {
        self.should_close
    }

    /// Present the back buffer.
    pub fn swap_buffers(&self) {
        self.window.gl_swap_window();
    }

    /// Window size in screen coordinates.
    #[must_use]
    pub fn window_size(&self) -> [u32; 2] {
        self.window.size().into()
    }

    /// Size of the default framebuffer in pixels, as of the last
    /// [`poll_events`](Self::poll_events).
    #[must_use]
    pub fn drawable_size(&self) -> [u32; 2] {
        self.window_size
    }

    /// The offscreen render resolution from the config.
    #[must_use]
    pub fn video_size(&self) -> [u32; 2] {
        self.video_size
    }

    /// Mapping between window and video space.
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.window_size(), self.video_size)
    }

    /// Cursor position in window space, top-left origin.
    #[must_use]
    pub fn mouse_position(&self) -> [f64; 2] {
        let state = self.event_pump.mouse_state();
        [f64::from(state.x()), f64::from(state.y())]
    }

    /// Cursor position scaled into video space, top-left origin.
    #[must_use]
    pub fn video_mouse_position(&self) -> [i32; 2] {
        let [x, y] = self.mouse_position();
        self.viewport().window_to_video(x, y)
    }

    /// The SDL video subsystem, for anything this wrapper does not expose.
    #[must_use]
    pub fn video_subsystem(&self) -> &VideoSubsystem {
        &self.video
    }
}
