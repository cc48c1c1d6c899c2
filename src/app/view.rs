//! View controller — scroll state, visible range and on-demand row loading.
//!
//! Every way of scrolling (wheel, keys, scrollbar drag, track click,
//! `scroll_to_index`) funnels into [`ViewController::scroll_to`], which
//! clamps the offset, recomputes the visible range and loads rows only when
//! the range actually changed.

use tracing::trace;

use crate::core::{
    header_sync::HeaderSync,
    loader::{BatchLoader, LoadOutcome, LoaderUpdate},
    range::{compute_visible_range, RowMetrics, VisibleRange},
    scrollbar::{ScrollMetrics, ScrollbarController, Thumb},
    types::{ResultIndex, ResultSequence, RowMetadata},
};

/// Where `scroll_to_index` should place the target row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Start,
    Center,
    End,
    /// Scroll the minimum distance needed, or not at all if visible.
    Auto,
}

pub struct ViewController {
    metrics: RowMetrics,
    viewport_height: f64,
    scroll_offset: f64,
    range: VisibleRange,
    /// The sequence currently on screen (raw or sorted).
    rows: ResultSequence,
    loader: BatchLoader,
    scrollbar: ScrollbarController,
    header: HeaderSync,
    scroll_left: u16,
    content_width: u16,
    viewport_width: u16,
}

impl ViewController {
    pub fn new(metrics: RowMetrics, min_thumb: f64, loader: BatchLoader) -> Self {
        Self {
            metrics,
            viewport_height: 0.0,
            scroll_offset: 0.0,
            range: VisibleRange::EMPTY,
            rows: ResultSequence::from(Vec::new()),
            loader,
            scrollbar: ScrollbarController::new(min_thumb),
            header: HeaderSync::new(),
            scroll_left: 0,
            content_width: 0,
            viewport_width: 0,
        }
    }

    // ── accessors ──────────────────────────────────────────────

    pub fn loader(&self) -> &BatchLoader {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut BatchLoader {
        &mut self.loader
    }

    pub fn rows(&self) -> &ResultSequence {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn metrics(&self) -> RowMetrics {
        self.metrics
    }

    pub fn visible_range(&self) -> VisibleRange {
        self.range
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    pub fn content_height(&self) -> f64 {
        self.rows.len() as f64 * self.metrics.row_height
    }

    pub fn max_scroll_offset(&self) -> f64 {
        (self.content_height() - self.viewport_height).max(0.0)
    }

    /// Position of the row at the top edge of the viewport.
    pub fn first_visible(&self) -> usize {
        if self.metrics.row_height > 0.0 {
            (self.scroll_offset / self.metrics.row_height).floor() as usize
        } else {
            0
        }
    }

    /// Handle and cached metadata (if loaded) of the row at `pos`.
    pub fn row(&self, pos: usize) -> Option<(ResultIndex, Option<&RowMetadata>)> {
        let index = *self.rows.get(pos)?;
        Some((index, self.loader.get(index)))
    }

    pub fn scroll_metrics(&self) -> ScrollMetrics {
        ScrollMetrics {
            content_height: self.content_height(),
            viewport_height: self.viewport_height,
            scroll_offset: self.scroll_offset,
        }
    }

    pub fn thumb(&self) -> Option<Thumb> {
        self.scrollbar.thumb(self.scroll_metrics())
    }

    // ── inputs ─────────────────────────────────────────────────

    pub fn set_viewport_height(&mut self, viewport_height: f64) {
        let viewport_height = viewport_height.max(0.0);
        self.scrollbar.set_track_height(viewport_height);
        if viewport_height == self.viewport_height {
            return;
        }
        self.viewport_height = viewport_height;
        self.scroll_offset = self.clamp_offset(self.scroll_offset);
        self.refresh(false);
    }

    /// Load the rows on screen again, e.g. after the cache was reset while
    /// the displayed sequence stayed.
    pub fn reload_visible(&mut self) {
        self.refresh(true);
    }

    /// Replace the displayed sequence.  Positions now map to different
    /// handles, so visible rows are loaded even if the range is unchanged.
    pub fn set_rows(&mut self, rows: ResultSequence) {
        self.rows = rows;
        self.scroll_offset = self.clamp_offset(self.scroll_offset);
        self.refresh(true);
    }

    /// Drop every cached row; the next result set starts from scratch.
    pub fn reset_generation(&mut self, generation: u64) {
        self.loader.reset(generation);
    }

    pub fn apply_loader_update(&mut self, update: LoaderUpdate) -> LoadOutcome {
        self.loader.apply(update)
    }

    // ── scrolling ──────────────────────────────────────────────

    /// The single vertical scroll update path.  Returns `true` if the offset
    /// moved.
    pub fn scroll_to(&mut self, offset: f64) -> bool {
        let offset = self.clamp_offset(offset);
        if offset == self.scroll_offset {
            return false;
        }
        self.scroll_offset = offset;
        self.refresh(false);
        true
    }

    pub fn scroll_by(&mut self, delta: f64) -> bool {
        self.scroll_to(self.scroll_offset + delta)
    }

    pub fn scroll_to_top(&mut self) -> bool {
        self.scroll_to(0.0)
    }

    /// Bring the row at `pos` into view according to `align`.
    pub fn scroll_to_index(&mut self, pos: usize, align: Align) -> bool {
        if pos >= self.rows.len() {
            return false;
        }
        let row_height = self.metrics.row_height;
        let top = pos as f64 * row_height;
        let bottom = top + row_height;
        let viewport = self.viewport_height;

        let target = match align {
            Align::Start => top,
            Align::End => bottom - viewport,
            Align::Center => top - (viewport - row_height) / 2.0,
            Align::Auto => {
                if top < self.scroll_offset {
                    top
                } else if bottom > self.scroll_offset + viewport {
                    bottom - viewport
                } else {
                    return false;
                }
            }
        };
        self.scroll_to(target)
    }

    /// Load rows at positions `start..=end` of the displayed sequence.
    /// Positions past the end are ignored.  Returns the issued batch id.
    pub fn ensure_range_loaded(&mut self, start: usize, end: usize) -> Option<u64> {
        let last = self.rows.len().checked_sub(1)?;
        let end = end.min(last);
        if start > end {
            return None;
        }
        let rows = &self.rows[start..=end];
        self.loader.ensure_loaded(rows.iter().copied())
    }

    // ── scrollbar pointer ──────────────────────────────────────

    /// `y` is relative to the top of the scrollbar track.
    pub fn scrollbar_pointer_down(&mut self, y: f64) {
        if let Some(offset) = self.scrollbar.pointer_down(y, self.scroll_metrics()) {
            self.scroll_to(offset);
        }
    }

    pub fn scrollbar_pointer_move(&mut self, y: f64) {
        if let Some(offset) = self.scrollbar.pointer_move(y, self.scroll_metrics()) {
            self.scroll_to(offset);
        }
    }

    pub fn scrollbar_pointer_up(&mut self) {
        self.scrollbar.pointer_up();
    }

    pub fn is_dragging_scrollbar(&self) -> bool {
        self.scrollbar.is_dragging()
    }

    // ── horizontal ─────────────────────────────────────────────

    pub fn scroll_left(&self) -> u16 {
        self.scroll_left
    }

    pub fn header_left(&self) -> u16 {
        self.header.header_left()
    }

    pub fn set_content_width(&mut self, content_width: u16, viewport_width: u16) {
        self.content_width = content_width;
        self.viewport_width = viewport_width;
        self.scroll_left_to(self.scroll_left);
    }

    /// Scroll the row area sideways.  Returns `true` if the header had to be
    /// updated.
    pub fn scroll_horizontally(&mut self, delta: i32) -> bool {
        let target = (i32::from(self.scroll_left) + delta).clamp(0, i32::from(u16::MAX));
        self.scroll_left_to(target as u16)
    }

    fn scroll_left_to(&mut self, left: u16) -> bool {
        let max_left = self.content_width.saturating_sub(self.viewport_width);
        self.scroll_left = left.min(max_left);
        self.header.on_content_scroll(self.scroll_left)
    }

    // ── internals ──────────────────────────────────────────────

    fn clamp_offset(&self, offset: f64) -> f64 {
        if offset.is_nan() {
            return 0.0;
        }
        offset.clamp(0.0, self.max_scroll_offset())
    }

    /// Recompute the visible range and load it if it changed (or if
    /// `force`).  Returns whether the range changed.
    fn refresh(&mut self, force: bool) -> bool {
        let next = compute_visible_range(
            self.scroll_offset,
            self.viewport_height,
            self.rows.len(),
            self.metrics,
        );
        let changed = next != self.range;
        self.range = next;
        if changed || force {
            trace!(start = next.start, end = next.end, "visible range");
            if !next.is_empty() {
                self.ensure_range_loaded(next.start, next.end);
            }
        }
        changed
    }
}
