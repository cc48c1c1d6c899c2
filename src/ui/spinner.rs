//! Activity indicator — a small spinner + label rendered at the right edge
//! of a one-line area.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::Widget,
};

use super::theme::Theme;

/// Braille-dot spinner frames.  Cycles through these on each tick.
const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Spinner with a label such as `indexing` or `sorting`.  Draws nothing when
/// `label` is `None`.
pub struct ActivityIndicator<'a> {
    pub label: Option<&'a str>,
    /// Monotonically increasing tick counter (drives the spinner frame).
    pub tick: u64,
}

impl ActivityIndicator<'_> {
    fn text(&self) -> Option<String> {
        let label = self.label?;
        let frame = SPINNER_FRAMES[(self.tick as usize) % SPINNER_FRAMES.len()];
        Some(format!(" {frame} {label} "))
    }
}

impl Widget for ActivityIndicator<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(text) = self.text() else {
            return;
        };
        let width = text.chars().count() as u16;
        if area.width < width || area.height == 0 {
            return;
        }
        let x = area.x + area.width - width;
        let line = Line::from(Span::styled(text, Theme::activity_style()));
        buf.set_line(x, area.y, &line, width);
    }
}
