//! Bookkeeping for which render pass is currently open and what it renders
//! into.

/// The kinds of pass the renderer can have open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Deferred 3D pass into the G-buffer.
    Scene3D,
    /// Sprite pass into the 2D layer.
    Scene2D,
    /// A pass into a caller-owned framebuffer.
    Custom,
}

/// The framebuffer that should be bound while the tracked pass is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTarget<T> {
    /// The 3D pass's G-buffer.
    GBuffer,
    /// The 2D pass's layer.
    Layer2D,
    /// The framebuffer handed to the open custom pass.
    Custom(T),
    /// The default framebuffer.
    Screen,
}

/// Tracks the single open pass and the target of a custom pass. Opening a
/// pass closes any other.
///
/// `T` identifies a custom target; the renderer stores the raw framebuffer
/// handle with its size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassTracker<T> {
    active: Option<PassKind>,
    custom: Option<T>,
}

impl<T> Default for PassTracker<T> {
    fn default() -> Self {
        Self {
            active: None,
            custom: None,
        }
    }
}

impl<T: Copy> PassTracker<T> {
    /// A tracker with no open pass.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `kind`, returning the pass it replaces.
    ///
    /// Any custom target is forgotten; use
    /// [`begin_custom`](Self::begin_custom) to open a custom pass with one.
    pub fn begin(&mut self, kind: PassKind) -> Option<PassKind> {
        self.custom = None;
        self.active.replace(kind)
    }

    /// Open a custom pass into `target`, returning the pass it replaces.
    pub fn begin_custom(&mut self, target: T) -> Option<PassKind> {
        self.custom = Some(target);
        self.active.replace(PassKind::Custom)
    }

    /// Close the open pass, returning it.
    pub fn end(&mut self) -> Option<PassKind> {
        self.custom = None;
        self.active.take()
    }

    /// The open pass.
    #[must_use]
    pub fn active(&self) -> Option<PassKind> {
        self.active
    }

    /// Whether `kind` is the open pass.
    ///
    /// A pick read for `kind`'s target can then read in place; otherwise the
    /// target is bound for the read and [`target`](Self::target) is bound
    /// again afterwards.
    #[must_use]
    pub fn is_active(&self, kind: PassKind) -> bool {
        self.active == Some(kind)
    }

    /// What should be bound for the open pass.
    #[must_use]
    pub fn target(&self) -> PassTarget<T> {
        match (self.active, self.custom) {
            (Some(PassKind::Scene3D), _) => PassTarget::GBuffer,
            (Some(PassKind::Scene2D), _) => PassTarget::Layer2D,
            (Some(PassKind::Custom), Some(target)) => PassTarget::Custom(target),
            (Some(PassKind::Custom), None) | (None, _) => PassTarget::Screen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> PassTracker<u32> {
        PassTracker::new()
    }

    #[test]
    fn starts_closed() {
        let tracker = tracker();
        assert_eq!(tracker.active(), None);
        assert!(!tracker.is_active(PassKind::Scene3D));
        assert_eq!(tracker.target(), PassTarget::Screen);
    }

    #[test]
    fn begin_then_end() {
        let mut tracker = tracker();
        assert_eq!(tracker.begin(PassKind::Scene2D), None);
        assert!(tracker.is_active(PassKind::Scene2D));
        assert_eq!(tracker.end(), Some(PassKind::Scene2D));
        assert_eq!(tracker.active(), None);
    }

    #[test]
    fn begin_reports_replaced_pass() {
        let mut tracker = tracker();
        tracker.begin(PassKind::Scene3D);
        assert_eq!(tracker.begin_custom(7), Some(PassKind::Scene3D));
        assert!(tracker.is_active(PassKind::Custom));
        assert!(!tracker.is_active(PassKind::Scene3D));
    }

    #[test]
    fn end_without_pass_is_none() {
        let mut tracker = tracker();
        assert_eq!(tracker.end(), None);
    }

    #[test]
    fn builtin_passes_target_their_own_buffers() {
        let mut tracker = tracker();
        tracker.begin(PassKind::Scene3D);
        assert_eq!(tracker.target(), PassTarget::GBuffer);
        tracker.begin(PassKind::Scene2D);
        assert_eq!(tracker.target(), PassTarget::Layer2D);
    }

    #[test]
    fn scene_pick_during_2d_pass_rebinds_the_layer() {
        let mut tracker = tracker();
        tracker.begin(PassKind::Scene2D);
        // The G-buffer is not bound, so its pick read has to rebind.
        assert!(!tracker.is_active(PassKind::Scene3D));
        assert_eq!(tracker.target(), PassTarget::Layer2D);
    }

    #[test]
    fn foreign_pick_inside_custom_pass_restores_custom_target() {
        let mut tracker = tracker();
        tracker.begin_custom(42);
        assert!(!tracker.is_active(PassKind::Scene2D));
        assert_eq!(tracker.target(), PassTarget::Custom(42));
    }

    #[test]
    fn builtin_pass_forgets_replaced_custom_target() {
        let mut tracker = tracker();
        tracker.begin_custom(42);
        assert_eq!(tracker.begin(PassKind::Scene3D), Some(PassKind::Custom));
        assert_eq!(tracker.target(), PassTarget::GBuffer);

        tracker.end();
        assert_eq!(tracker.target(), PassTarget::Screen);

        // A custom pass opened without a target never resurrects the old one.
        tracker.begin(PassKind::Custom);
        assert_eq!(tracker.target(), PassTarget::Screen);
    }

    #[test]
    fn closing_all_passes_targets_the_screen() {
        let mut tracker = tracker();
        tracker.begin_custom(3);
        assert_eq!(tracker.end(), Some(PassKind::Custom));
        assert_eq!(tracker.target(), PassTarget::Screen);
        assert_eq!(tracker.active(), None);
    }

    #[test]
    fn newer_custom_pass_replaces_target() {
        let mut tracker = tracker();
        tracker.begin_custom(1);
        assert_eq!(tracker.begin_custom(2), Some(PassKind::Custom));
        assert_eq!(tracker.target(), PassTarget::Custom(2));
    }
}
