use std::sync::atomic::{AtomicBool, Ordering};

/// What the launcher does with its own window around a game session.
pub trait WindowControl: Send + Sync {
    fn hide(&self);
    fn show_and_focus(&self);
}

/// No window at all (tests, headless runs). Tracks visibility so callers can
/// still observe the hide/show sequence.
#[derive(Debug)]
pub struct HeadlessWindow {
    visible: AtomicBool,
}

impl Default for HeadlessWindow {
    fn default() -> Self {
        Self {
            visible: AtomicBool::new(true),
        }
    }
}

impl HeadlessWindow {
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }
}

impl WindowControl for HeadlessWindow {
    fn hide(&self) {
        self.visible.store(false, Ordering::SeqCst);
    }

    fn show_and_focus(&self) {
        self.visible.store(true, Ordering::SeqCst);
    }
}
