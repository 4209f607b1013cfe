//! Per-session state.
//!
//! Everything the user can see or change lives here and is mutated only
//! through the methods below, so the tier rules are enforced in one place.

use jifra_core::{HistoryList, PinOutcome, PinRejected};
use jifra_types::{Direction, EntryId, EntryIdGenerator, HistoryEntry, Style, Tier};

use crate::notice::Notice;

/// Outcome of the most recent submission.
///
/// Kept apart from history: with pinned entries in front, `history[0]` is not
/// necessarily the latest result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LatestResult {
    Success { style: Style, text: String },
    Failure { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PinDenied {
    #[error("ピン留めはPRO限定です")]
    RequiresPro,
    #[error(transparent)]
    Rejected(#[from] PinRejected),
}

#[derive(Debug, Default)]
pub struct Session {
    style: Style,
    direction: Direction,
    tier: Tier,
    latest: Option<LatestResult>,
    notice: Option<Notice>,
    history: HistoryList,
    ids: EntryIdGenerator,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn style(&self) -> Style {
        self.style
    }

    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub const fn tier(&self) -> Tier {
        self.tier
    }

    #[must_use]
    pub fn latest(&self) -> Option<&LatestResult> {
        self.latest.as_ref()
    }

    #[must_use]
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    #[must_use]
    pub fn history(&self) -> &HistoryList {
        &self.history
    }

    pub fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    /// Switch tier. Selections the new tier cannot use fall back to the
    /// first free choice.
    pub fn set_tier(&mut self, tier: Tier) {
        if self.tier == tier {
            return;
        }
        tracing::info!(tier = tier.display_name(), "Tier changed");
        self.tier = tier;
        if !self.style.available_in(tier) {
            self.style = Style::Casual;
        }
        if !self.direction.available_in(tier) {
            self.direction = Direction::Auto;
        }
    }

    pub fn cycle_style(&mut self) -> Style {
        self.style = self.style.next_available(self.tier);
        self.style
    }

    pub fn cycle_direction(&mut self) -> Direction {
        self.direction = self.direction.next_available(self.tier);
        self.direction
    }

    /// Store a successful result in history and as the latest result.
    pub fn record_success(&mut self, style: Style, input: &str, text: String) -> EntryId {
        let id = self.ids.next_id();
        let entry = HistoryEntry::new(id, style, input, text.clone());
        self.history.add_entry(entry, self.tier);
        self.latest = Some(LatestResult::Success { style, text });
        id
    }

    /// Store a failed call. History is untouched.
    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.latest = Some(LatestResult::Failure {
            message: message.into(),
        });
    }

    /// Forget the latest result. History is untouched.
    pub fn clear_latest(&mut self) {
        self.latest = None;
    }

    /// Flip the pin on `id`. Free tier cannot pin.
    pub fn toggle_pin(&mut self, id: EntryId) -> Result<PinOutcome, PinDenied> {
        if !self.tier.is_pro() {
            return Err(PinDenied::RequiresPro);
        }
        let Some(pinned) = self.history.get(id).map(HistoryEntry::is_pinned) else {
            return Ok(PinOutcome::Unchanged);
        };
        Ok(self.history.set_pinned(id, !pinned)?)
    }

    pub fn clear_unpinned(&mut self) {
        self.history.clear_unpinned();
    }
}
