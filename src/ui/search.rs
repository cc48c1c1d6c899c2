//! Search input line.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use crate::ui::theme::Theme;

pub struct SearchBar<'a> {
    pub query: &'a str,
    pub has_focus: bool,
}

impl SearchBar<'_> {
    fn line(&self) -> Line<'static> {
        let mut spans = vec![
            Span::styled("Search: ", Theme::search_label_style(self.has_focus)),
            Span::styled(
                self.query.to_string(),
                Style::default().add_modifier(Modifier::UNDERLINED),
            ),
        ];
        if self.has_focus {
            spans.push(Span::styled("▏", Theme::search_label_style(true)));
        } else if self.query.is_empty() {
            spans.push(Span::styled("(all files)", Theme::placeholder_style()));
        }
        Line::from(spans)
    }
}

impl Widget for SearchBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(self.line()).render(area, buf);
    }
}
