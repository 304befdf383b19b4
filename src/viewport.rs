//! Mapping between window space and video (offscreen target) space.

/// Window and video sizes, used to translate cursor positions.
///
/// Window space has its origin at the top-left and is measured in screen
/// pixels. Video space has the same orientation but is measured in
/// offscreen-target pixels. Pick reads use framebuffer space, which has a
/// bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Window size in screen pixels.
    pub window: [u32; 2],
    /// Offscreen target size in pixels.
    pub video: [u32; 2],
}

impl Viewport {
    /// Create a viewport mapping.
    #[must_use]
    pub fn new(window: [u32; 2], video: [u32; 2]) -> Self {
        Self { window, video }
    }

    /// Scale a window-space position into video space, truncating toward
    /// zero. A zero-sized window maps everything to 0.
    #[must_use]
    pub fn window_to_video(&self, x: f64, y: f64) -> [i32; 2] {
        [
            scale_axis(x, self.window[0], self.video[0]),
            scale_axis(y, self.window[1], self.video[1]),
        ]
    }

    /// Convert a top-left-origin video position to the bottom-left-origin
    /// texel coordinate used for pick reads.
    ///
    /// Positions far outside the video saturate instead of overflowing; the
    /// pick read treats them as out of bounds.
    #[must_use]
    pub fn video_to_pick(&self, x: i32, y: i32) -> [i32; 2] {
        let height = i32::try_from(self.video[1]).unwrap_or(i32::MAX);
        [x, height.saturating_sub(1).saturating_sub(y)]
    }

    /// Window-space position straight to pick coordinates.
    #[must_use]
    pub fn window_to_pick(&self, x: f64, y: f64) -> [i32; 2] {
        let [vx, vy] = self.window_to_video(x, y);
        self.video_to_pick(vx, vy)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn scale_axis(value: f64, window: u32, video: u32) -> i32 {
    if window == 0 {
        return 0;
    }
    (value * f64::from(video) / f64::from(window)) as i32
}
