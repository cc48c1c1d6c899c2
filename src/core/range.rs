//! Visible-range computation for a fixed-row-height list.
//!
//! Maps a scroll offset and viewport height to the inclusive range of row
//! positions that should be materialised, widened by an overscan margin so
//! fast scrolling doesn't show rows popping in.

/// Inclusive range of row positions.  Any range with `end < start` is
/// empty; [`VisibleRange::EMPTY`] is the canonical empty value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRange {
    pub start: usize,
    pub end: usize,
}

impl VisibleRange {
    pub const EMPTY: Self = Self { start: 1, end: 0 };

    #[cfg(test)]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn contains(&self, pos: usize) -> bool {
        !self.is_empty() && pos >= self.start && pos <= self.end
    }
}

impl Default for VisibleRange {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Row geometry that stays fixed while the user scrolls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowMetrics {
    /// Height of every row, in any unit (pixels or terminal cells).
    pub row_height: f64,
    /// Extra rows materialised above and below the viewport.
    pub overscan: usize,
}

impl Default for RowMetrics {
    fn default() -> Self {
        Self {
            row_height: 1.0,
            overscan: 5,
        }
    }
}

/// Compute the visible range for the given scroll state.
///
/// `start = clamp(first - overscan)`, `end = clamp(last + overscan)` where
/// `first = floor(offset / row_height)` and
/// `last = first + ceil(viewport / row_height) - 1`.  Both ends are clamped
/// to `[0, row_count - 1]`.
pub fn compute_visible_range(
    scroll_offset: f64,
    viewport_height: f64,
    row_count: usize,
    metrics: RowMetrics,
) -> VisibleRange {
    let row_height = metrics.row_height;
    if row_count == 0 || !(viewport_height > 0.0) || !(row_height > 0.0) {
        return VisibleRange::EMPTY;
    }

    // `as usize` saturates, so absurd offsets just clamp to the last row.
    let first = (scroll_offset.max(0.0) / row_height).floor() as usize;
    let rows_in_view = ((viewport_height / row_height).ceil() as usize).max(1);
    let last_unclamped = first.saturating_add(rows_in_view - 1);

    let last_row = row_count - 1;
    let start = first.saturating_sub(metrics.overscan).min(last_row);
    let end = last_unclamped.saturating_add(metrics.overscan).min(last_row);

    VisibleRange { start, end }
}
