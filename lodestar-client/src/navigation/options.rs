//! Per-navigation options

use uuid::Uuid;

use crate::history::Viewport;

/// How a navigation should behave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigateOptions {
    /// Push the resulting page onto history (false for a silent refresh)
    pub add_to_history: bool,
    /// Present this identity for the first request, skipping resolution
    pub identity: Option<Uuid>,
    /// Viewport of the page being left, recorded before navigating away
    pub viewport: Option<Viewport>,
}

impl Default for NavigateOptions {
    fn default() -> Self {
        Self {
            add_to_history: true,
            identity: None,
            viewport: None,
        }
    }
}

impl NavigateOptions {
    /// Options for re-fetching the current page without touching history
    pub fn refresh() -> Self {
        Self {
            add_to_history: false,
            ..Self::default()
        }
    }

    /// Present `id` for the first request
    #[must_use]
    pub fn with_identity(mut self, id: Uuid) -> Self {
        self.identity = Some(id);
        self
    }

    /// Record `viewport` on the page being left
    #[must_use]
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = NavigateOptions::default();
        assert!(options.add_to_history);
        assert!(options.identity.is_none());
        assert!(options.viewport.is_none());
        assert!(!NavigateOptions::refresh().add_to_history);
    }

    #[test]
    fn test_builders() {
        let id = Uuid::new_v4();
        let viewport = Viewport {
            scroll_offset: 3,
            link_index: 1,
        };
        let options = NavigateOptions::default()
            .with_identity(id)
            .with_viewport(viewport);
        assert_eq!(options.identity, Some(id));
        assert_eq!(options.viewport, Some(viewport));
    }
}
