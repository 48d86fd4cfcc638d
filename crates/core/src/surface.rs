//! The rendering side of the presenter.

use crate::types::SlideRecord;

/// Severity of a transient notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// A short message shown for a few seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub kind: NotificationKind,
}

/// Receives display commands from the presenter.
///
/// Only the navigation calls are required; overlays, printing and downloads
/// default to doing nothing so minimal front ends stay small.
pub trait PresentationSurface {
    /// Show `slide` as the active slide.
    fn render_slide(&mut self, slide: &SlideRecord);

    fn update_counter(&mut self, current: usize, total: usize);

    /// Enable or disable the previous/next affordances.
    /// `next_label` reads "Done" on the last slide.
    fn update_affordances(&mut self, can_prev: bool, can_next: bool, next_label: &str);

    /// Move the position indicator (dots) to `current`.
    fn update_position(&mut self, current: usize, total: usize);

    fn set_notes_visible(&mut self, visible: bool);

    /// Replace the notes panel contents.
    fn show_notes(&mut self, notes_html: &str);

    /// Screen-reader announcement.
    fn announce(&mut self, message: &str);

    fn clear_announcement(&mut self) {}

    fn notify(&mut self, _notification: &Notification) {}

    fn dismiss_notification(&mut self, _id: u64) {}

    fn set_help_visible(&mut self, _visible: bool, _shortcuts: &[(&str, &str)]) {}

    fn set_fullscreen(&mut self, _fullscreen: bool) {}

    /// Lay out every slide for printing.
    fn print_all(&mut self, _slides: &[&SlideRecord]) {}

    fn update_timer(&mut self, _display: &str) {}

    /// Hand a generated file to the user.
    fn download(&mut self, filename: &str, _contents: &[u8]) -> std::io::Result<()> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            format!("surface cannot save {}", filename),
        ))
    }
}
