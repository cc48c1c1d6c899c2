//! Colour palette and text styles used across the UI.

use ratatui::style::{Color, Modifier, Style};

/// Central theme — change colours here and they propagate everywhere.
pub struct Theme;

impl Theme {
    // ── result rows ────────────────────────────────────────────
    pub fn dir_style() -> Style {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    }

    pub fn file_style() -> Style {
        Style::default().fg(Color::White)
    }

    pub fn symlink_style() -> Style {
        Style::default().fg(Color::Magenta)
    }

    /// Secondary columns (path, size, dates).
    pub fn detail_style() -> Style {
        Style::default().fg(Color::Gray)
    }

    /// Rows whose metadata hasn't arrived (or failed).
    pub fn placeholder_style() -> Style {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::DIM)
    }

    pub fn selected_style() -> Style {
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    }

    // ── header ─────────────────────────────────────────────────
    pub fn header_style() -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Gray)
            .add_modifier(Modifier::BOLD)
    }

    pub fn header_sorted_style() -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Green)
            .add_modifier(Modifier::BOLD)
    }

    pub fn header_disabled_style() -> Style {
        Style::default().fg(Color::DarkGray).bg(Color::Gray)
    }

    // ── scrollbar ──────────────────────────────────────────────
    pub fn track_style() -> Style {
        Style::default().fg(Color::DarkGray)
    }

    pub fn thumb_style() -> Style {
        Style::default().fg(Color::White)
    }

    // ── chrome ─────────────────────────────────────────────────
    pub fn search_label_style(focused: bool) -> Style {
        let style = Style::default().add_modifier(Modifier::BOLD);
        if focused {
            style.fg(Color::Yellow)
        } else {
            style.fg(Color::Green)
        }
    }

    pub fn status_bar_style() -> Style {
        Style::default().bg(Color::DarkGray).fg(Color::White)
    }

    pub fn activity_style() -> Style {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    }

    pub fn error_style() -> Style {
        Style::default()
            .fg(Color::Red)
            .add_modifier(Modifier::BOLD)
    }
}
