use std::time::SystemTime;

use crate::{EntryId, Style, truncate_with_ellipsis};

/// Stored inputs longer than this are cut with an ellipsis.
const MAX_STORED_INPUT_CHARS: usize = 2000;
const PREVIEW_CHARS: usize = 15;

/// One past result in the session history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    id: EntryId,
    created_at: SystemTime,
    style: Style,
    input: String,
    result: String,
    pinned: bool,
}

impl HistoryEntry {
    /// Create a fresh, unpinned entry.
    #[must_use]
    pub fn new(id: EntryId, style: Style, input: &str, result: impl Into<String>) -> Self {
        Self::at(id, SystemTime::now(), style, input, result)
    }

    #[must_use]
    pub fn at(
        id: EntryId,
        created_at: SystemTime,
        style: Style,
        input: &str,
        result: impl Into<String>,
    ) -> Self {
        Self {
            id,
            created_at,
            style,
            input: truncate_with_ellipsis(input, MAX_STORED_INPUT_CHARS),
            result: result.into(),
            pinned: false,
        }
    }

    #[must_use]
    pub const fn id(&self) -> EntryId {
        self.id
    }

    #[must_use]
    pub const fn created_at(&self) -> SystemTime {
        self.created_at
    }

    #[must_use]
    pub const fn style(&self) -> Style {
        self.style
    }

    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Short single-line preview of the input for list rows.
    #[must_use]
    pub fn input_preview(&self) -> String {
        let line = self.input.lines().next().unwrap_or_default();
        let head: String = line.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    }

    #[must_use]
    pub fn result(&self) -> &str {
        &self.result
    }

    #[must_use]
    pub const fn is_pinned(&self) -> bool {
        self.pinned
    }

    #[must_use]
    pub fn with_pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }

    pub fn set_pinned(&mut self, pinned: bool) {
        self.pinned = pinned;
    }
}
