//! Result table — column header, virtualized rows and the scrollbar.
//!
//! Only rows inside the viewport are turned into lines; everything else is
//! just a position in the displayed sequence.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use crate::app::state::AppState;
use crate::core::sort::SortKey;
use crate::core::types::{EntryKind, RowMetadata};

use super::layout::AppLayout;
use super::theme::Theme;

/// Shown in place of metadata that failed to load.
pub const PLACEHOLDER: &str = "—";
/// Shown while a row's metadata is in flight.
pub const LOADING: &str = "…";

// ───────────────────────────────────────── columns ───────────

pub struct Column {
    pub title: &'static str,
    pub width: u16,
    /// Key the header sorts by when clicked; `None` for unsortable columns.
    pub sort_key: Option<SortKey>,
}

pub const COLUMNS: &[Column] = &[
    Column {
        title: "Name",
        width: 28,
        sort_key: None,
    },
    Column {
        title: "Path",
        width: 64,
        sort_key: Some(SortKey::FullPath),
    },
    Column {
        title: "Size",
        width: 10,
        sort_key: Some(SortKey::Size),
    },
    Column {
        title: "Modified",
        width: 16,
        sort_key: Some(SortKey::Modified),
    },
    Column {
        title: "Created",
        width: 16,
        sort_key: Some(SortKey::Created),
    },
];

const GAP: u16 = 1;

/// Total width of one row, in cells.
pub fn content_width() -> u16 {
    COLUMNS.iter().map(|c| c.width + GAP).sum()
}

/// Column under content-relative column `x` (gaps belong to none).
pub fn column_at(x: u16) -> Option<&'static Column> {
    let mut start = 0u16;
    for column in COLUMNS {
        let end = start + column.width;
        if (start..end).contains(&x) {
            return Some(column);
        }
        start = end + GAP;
    }
    None
}

// ───────────────────────────────────────── formatting ────────

/// Human-readable size string.
pub fn human_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes as f64;
    for &unit in UNITS {
        if size < 1024.0 {
            return if unit == "B" {
                format!("{bytes} B")
            } else {
                format!("{size:.1} {unit}")
            };
        }
        size /= 1024.0;
    }
    format!("{size:.1} PiB")
}

pub fn format_ts(unix_secs: i64) -> String {
    use chrono::{Local, TimeZone};
    match Local.timestamp_opt(unix_secs, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => PLACEHOLDER.to_string(),
    }
}

/// Pad or truncate `text` to exactly `width` characters.  Truncation keeps
/// the head, or the tail when `keep_tail` (paths read best from the end).
fn fit(text: &str, width: usize, keep_tail: bool) -> String {
    let len = text.chars().count();
    if len <= width {
        return format!("{text:<width$}");
    }
    if width == 0 {
        return String::new();
    }
    let keep = width - 1;
    if keep_tail {
        let tail: String = text.chars().skip(len - keep).collect();
        format!("…{tail}")
    } else {
        let head: String = text.chars().take(keep).collect();
        format!("{head}…")
    }
}

fn fit_right(text: &str, width: usize) -> String {
    if text.chars().count() >= width {
        return fit(text, width, false);
    }
    format!("{text:>width$}")
}

fn cells(meta: &RowMetadata) -> [String; 5] {
    let opt = |v: Option<String>| v.unwrap_or_else(|| PLACEHOLDER.to_string());
    [
        meta.name().to_string(),
        meta.path.clone(),
        opt(meta.size.map(human_size)),
        opt(meta.modified.map(format_ts)),
        opt(meta.created.map(format_ts)),
    ]
}

fn row_line(meta: Option<&RowMetadata>, loading: bool, selected: bool) -> Line<'static> {
    let (texts, name_style) = match meta {
        Some(meta) => {
            let style = match meta.kind {
                EntryKind::Dir => Theme::dir_style(),
                EntryKind::Symlink => Theme::symlink_style(),
                EntryKind::File | EntryKind::Unknown => Theme::file_style(),
            };
            (cells(meta), style)
        }
        None => {
            let mark = if loading { LOADING } else { PLACEHOLDER };
            (
                [mark.to_string(), String::new(), String::new(), String::new(), String::new()],
                Theme::placeholder_style(),
            )
        }
    };

    let mut spans = Vec::with_capacity(COLUMNS.len() * 2);
    for (i, (column, text)) in COLUMNS.iter().zip(texts.iter()).enumerate() {
        let width = column.width as usize;
        let (cell, style) = match i {
            0 => (fit(text, width, false), name_style),
            1 => (fit(text, width, true), Theme::detail_style()),
            _ => (fit_right(text, width), Theme::detail_style()),
        };
        let style = if selected { style.patch(Theme::selected_style()) } else { style };
        spans.push(Span::styled(cell, style));
        spans.push(Span::styled(" ", if selected { Theme::selected_style() } else { Style::default() }));
    }
    Line::from(spans)
}

fn header_line(state: &AppState) -> Line<'static> {
    let enabled = state.sorting_enabled();
    let sort = state.sort_state();
    let mut spans = Vec::with_capacity(COLUMNS.len() * 2);
    for column in COLUMNS {
        let width = column.width as usize;
        let active = sort.filter(|s| Some(s.key) == column.sort_key);
        let (title, style) = match (column.sort_key, active) {
            (_, Some(s)) => (format!("{} {}", column.title, s.direction.arrow()), Theme::header_sorted_style()),
            (Some(_), None) if !enabled => (column.title.to_string(), Theme::header_disabled_style()),
            _ => (column.title.to_string(), Theme::header_style()),
        };
        spans.push(Span::styled(fit(&title, width, false), style));
        spans.push(Span::styled(" ", Theme::header_style()));
    }
    Line::from(spans)
}

// ───────────────────────────────────────── widget ────────────

/// Header, rows and scrollbar of the result table.  Rendered into the full
/// frame area; regions come from [`AppLayout`].
pub struct ResultsWidget<'a> {
    pub state: &'a AppState,
}

impl Widget for ResultsWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let layout = AppLayout::from_area(area);
        let view = &self.state.view;

        Paragraph::new(header_line(self.state))
            .style(Theme::header_style())
            .scroll((0, view.header_left()))
            .render(layout.header_area, buf);

        let first = view.first_visible();
        let range = view.visible_range();
        let cache = view.loader().cache();
        let lines: Vec<Line> = (first..first + layout.rows_area.height as usize)
            .take_while(|&pos| range.contains(pos))
            .map_while(|pos| view.row(pos).map(|row| (pos, row)))
            .map(|(pos, (index, meta))| {
                row_line(meta, cache.is_in_flight(index), self.state.selected == Some(pos))
            })
            .collect();
        Paragraph::new(lines)
            .scroll((0, view.scroll_left()))
            .render(layout.rows_area, buf);

        render_scrollbar(self.state, layout.scrollbar_area, buf);
    }
}

fn render_scrollbar(state: &AppState, area: Rect, buf: &mut Buffer) {
    let Some(thumb) = state.view.thumb() else {
        return;
    };
    let start = thumb.offset.round() as u16;
    let end = ((thumb.offset + thumb.height).round() as u16).max(start + 1);
    for dy in 0..area.height {
        let (symbol, style) = if (start..end).contains(&dy) {
            ("█", Theme::thumb_style())
        } else {
            ("│", Theme::track_style())
        };
        buf.set_string(area.x, area.y + dy, symbol, style);
    }
}
