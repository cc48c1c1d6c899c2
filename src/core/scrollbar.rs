//! Scrollbar geometry and pointer interaction.
//!
//! The controller never owns the scroll offset.  It turns pointer input into
//! a *requested* offset which the caller feeds through the same update path
//! as wheel and keyboard scrolling.

/// Scroll state the scrollbar is drawn against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub content_height: f64,
    pub viewport_height: f64,
    pub scroll_offset: f64,
}

impl ScrollMetrics {
    pub fn max_scroll(&self) -> f64 {
        (self.content_height - self.viewport_height).max(0.0)
    }
}

/// Thumb position within the track, in track units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thumb {
    pub offset: f64,
    pub height: f64,
}

impl Thumb {
    pub fn contains(&self, y: f64) -> bool {
        y >= self.offset && y < self.offset + self.height
    }
}

#[derive(Debug, Clone)]
pub struct ScrollbarController {
    min_thumb: f64,
    track_height: f64,
    /// Pointer offset inside the thumb while a drag is active.
    grab: Option<f64>,
}

impl ScrollbarController {
    pub fn new(min_thumb: f64) -> Self {
        Self {
            min_thumb: min_thumb.max(0.0),
            track_height: 0.0,
            grab: None,
        }
    }

    pub fn set_track_height(&mut self, track_height: f64) {
        self.track_height = track_height.max(0.0);
    }

    pub fn is_dragging(&self) -> bool {
        self.grab.is_some()
    }

    /// Thumb geometry, or `None` when everything fits and the bar is hidden.
    pub fn thumb(&self, m: ScrollMetrics) -> Option<Thumb> {
        if m.content_height <= m.viewport_height || self.track_height <= 0.0 {
            return None;
        }
        let track = self.track_height;
        let height = (m.viewport_height / m.content_height * track)
            .max(self.min_thumb)
            .min(track);
        let max_scroll = m.max_scroll();
        let offset = if max_scroll > 0.0 {
            m.scroll_offset.clamp(0.0, max_scroll) / max_scroll * (track - height)
        } else {
            0.0
        };
        Some(Thumb { offset, height })
    }

    /// Pointer pressed at track position `y`.
    ///
    /// On the thumb this starts a drag and returns `None`.  On the bare
    /// track it returns the offset that centres the thumb under the pointer.
    pub fn pointer_down(&mut self, y: f64, m: ScrollMetrics) -> Option<f64> {
        let thumb = self.thumb(m)?;
        if thumb.contains(y) {
            self.grab = Some(y - thumb.offset);
            return None;
        }
        self.grab = None;
        Some(self.offset_for_thumb_top(y - thumb.height / 2.0, thumb.height, m))
    }

    /// Pointer moved to track position `y`; returns the new offset while a
    /// drag is active.  `y` may lie outside the track.
    pub fn pointer_move(&mut self, y: f64, m: ScrollMetrics) -> Option<f64> {
        let grab = self.grab?;
        let thumb = self.thumb(m)?;
        Some(self.offset_for_thumb_top(y - grab, thumb.height, m))
    }

    /// Pointer released anywhere.
    pub fn pointer_up(&mut self) {
        self.grab = None;
    }

    fn offset_for_thumb_top(&self, top: f64, thumb_height: f64, m: ScrollMetrics) -> f64 {
        let travel = (self.track_height - thumb_height).max(0.0);
        if travel <= 0.0 {
            return 0.0;
        }
        top.clamp(0.0, travel) / travel * m.max_scroll()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(scroll_offset: f64) -> ScrollMetrics {
        // 1000 rows × 24 = 24000 content, 240 viewport.
        ScrollMetrics {
            content_height: 24_000.0,
            viewport_height: 240.0,
            scroll_offset,
        }
    }

    fn controller() -> ScrollbarController {
        let mut bar = ScrollbarController::new(20.0);
        bar.set_track_height(240.0);
        bar
    }

    #[test]
    fn hidden_when_content_fits() {
        let bar = controller();
        let fits = ScrollMetrics {
            content_height: 240.0,
            viewport_height: 240.0,
            scroll_offset: 0.0,
        };
        assert_eq!(bar.thumb(fits), None);
    }

    #[test]
    fn thumb_respects_minimum_height() {
        let bar = controller();
        let thumb = bar.thumb(metrics(0.0)).expect("visible");
        // Proportional height would be 2.4; the minimum wins.
        assert_eq!(thumb.height, 20.0);
        assert_eq!(thumb.offset, 0.0);
    }

    #[test]
    fn thumb_travels_to_track_end() {
        let bar = controller();
        let max = metrics(0.0).max_scroll();
        let thumb = bar.thumb(metrics(max)).expect("visible");
        assert_eq!(thumb.offset, 220.0);

        let half = bar.thumb(metrics(max / 2.0)).expect("visible");
        assert!((half.offset - 110.0).abs() < 1e-9);
    }

    #[test]
    fn proportional_thumb_height() {
        let mut bar = ScrollbarController::new(1.0);
        bar.set_track_height(100.0);
        let m = ScrollMetrics {
            content_height: 400.0,
            viewport_height: 100.0,
            scroll_offset: 0.0,
        };
        assert_eq!(bar.thumb(m).map(|t| t.height), Some(25.0));
    }

    #[test]
    fn drag_keeps_grab_point_under_pointer() {
        let mut bar = controller();
        let max = metrics(0.0).max_scroll();

        // Grab the thumb 5 units below its top.
        assert_eq!(bar.pointer_down(5.0, metrics(0.0)), None);
        assert!(bar.is_dragging());

        let offset = bar.pointer_move(115.0, metrics(0.0)).expect("dragging");
        // Thumb top lands at 110 of 220 travel → halfway.
        assert!((offset - max / 2.0).abs() < 1e-6);
    }

    #[test]
    fn drag_clamps_outside_track() {
        let mut bar = controller();
        let max = metrics(0.0).max_scroll();
        bar.pointer_down(5.0, metrics(0.0));

        assert_eq!(bar.pointer_move(-500.0, metrics(0.0)), Some(0.0));
        assert_eq!(bar.pointer_move(10_000.0, metrics(0.0)), Some(max));
    }

    #[test]
    fn pointer_up_ends_drag() {
        let mut bar = controller();
        bar.pointer_down(5.0, metrics(0.0));
        bar.pointer_up();
        assert!(!bar.is_dragging());
        assert_eq!(bar.pointer_move(100.0, metrics(0.0)), None);
    }

    #[test]
    fn track_click_jumps_to_pointer() {
        let mut bar = controller();
        let max = metrics(0.0).max_scroll();

        // Centre of the track → thumb centred there → halfway.
        let offset = bar.pointer_down(120.0, metrics(0.0)).expect("track click");
        assert!((offset - max / 2.0).abs() < 1e-6);
        assert!(!bar.is_dragging());

        let end = bar.pointer_down(239.0, metrics(0.0)).expect("track click");
        assert_eq!(end, max);
    }

    #[test]
    fn no_interaction_when_hidden() {
        let mut bar = controller();
        let fits = ScrollMetrics {
            content_height: 100.0,
            viewport_height: 240.0,
            scroll_offset: 0.0,
        };
        assert_eq!(bar.pointer_down(10.0, fits), None);
        assert!(!bar.is_dragging());
    }
}
