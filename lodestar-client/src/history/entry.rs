//! History entry types

use chrono::{DateTime, Utc};

/// Where the user was looking on a page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    /// Vertical scroll offset in lines
    pub scroll_offset: usize,
    /// Index of the selected link
    pub link_index: usize,
}

/// A successfully displayed page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// URL the content was fetched from (after redirects and input)
    pub url: String,
    /// Response body, kept so going back does not refetch
    pub content: Vec<u8>,
    /// Response status
    pub status: u8,
    /// Response META line
    pub meta: String,
    /// MIME type without parameters
    pub mime_type: String,
    /// When the page was fetched
    pub timestamp: DateTime<Utc>,
    /// Viewport as it was when the user left the page
    viewport: Viewport,
}

impl HistoryEntry {
    /// Create an entry positioned at the top of the page
    pub fn new(
        url: impl Into<String>,
        content: Vec<u8>,
        status: u8,
        meta: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            content,
            status,
            meta: meta.into(),
            mime_type: mime_type.into(),
            timestamp: Utc::now(),
            viewport: Viewport::default(),
        }
    }

    /// Viewport to restore when returning to this page
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Only the stack may record a viewport
    pub(super) fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }
}
