//! One-way horizontal scroll mirror from the row area onto the column header.
//!
//! The row area owns the horizontal offset; the header only ever copies it.

#[derive(Debug, Clone, Default)]
pub struct HeaderSync {
    header_left: u16,
}

impl HeaderSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror the content's new horizontal offset.  Returns `false` (and
    /// writes nothing) when the header already shows that offset.
    pub fn on_content_scroll(&mut self, scroll_left: u16) -> bool {
        if self.header_left == scroll_left {
            return false;
        }
        self.header_left = scroll_left;
        true
    }

    pub fn header_left(&self) -> u16 {
        self.header_left
    }
}
