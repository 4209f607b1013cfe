//! Core domain types for Jifra.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

mod block;
mod history;
mod ids;
mod sanitize;
mod text;

pub use block::DisplayBlock;
pub use history::HistoryEntry;
pub use ids::{EntryId, EntryIdGenerator};
pub use sanitize::sanitize_terminal_text;
pub use text::{truncate_to_fit, truncate_with_ellipsis};

use std::borrow::Cow;
use thiserror::Error;

// ============================================================================
// NonEmpty String Types
// ============================================================================

/// A string guaranteed to be non-empty (after trimming).
///
/// Submitted input goes through this type before any prompt is built, so an
/// empty submission can never reach the remote model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyString(String);

#[derive(Debug, Error)]
#[error("input must not be empty")]
pub struct EmptyStringError;

impl NonEmptyString {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyStringError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(EmptyStringError)
        } else {
            Ok(Self(value))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for NonEmptyString {
    type Error = EmptyStringError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for NonEmptyString {
    type Error = EmptyStringError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl std::ops::Deref for NonEmptyString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl AsRef<str> for NonEmptyString {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

// ============================================================================
// Tier
// ============================================================================

/// Capability level of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tier {
    #[default]
    Free,
    Pro,
}

impl Tier {
    #[must_use]
    pub const fn is_pro(self) -> bool {
        matches!(self, Tier::Pro)
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Tier::Free => "FREE",
            Tier::Pro => "PRO",
        }
    }
}

// ============================================================================
// Style & Direction
// ============================================================================

/// Output style selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Style {
    #[default]
    Casual,
    Formal,
    Sns,
    PromptGen,
}

impl Style {
    #[must_use]
    pub const fn all() -> &'static [Style] {
        &[Style::Casual, Style::Formal, Style::Sns, Style::PromptGen]
    }

    /// Stable key used in history and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Style::Casual => "casual",
            Style::Formal => "formal",
            Style::Sns => "sns",
            Style::PromptGen => "prompt_gen",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Style::Casual => "Casual",
            Style::Formal => "Formal",
            Style::Sns => "SNS Casual",
            Style::PromptGen => "Prompt Gen (Pro)",
        }
    }

    #[must_use]
    pub const fn requires_pro(self) -> bool {
        matches!(self, Style::Sns | Style::PromptGen)
    }

    #[must_use]
    pub const fn available_in(self, tier: Tier) -> bool {
        tier.is_pro() || !self.requires_pro()
    }

    /// Whether the translation direction applies to this style.
    #[must_use]
    pub const fn uses_direction(self) -> bool {
        matches!(self, Style::Casual | Style::Formal)
    }

    /// Next style after `self` that is available in `tier`, wrapping around.
    #[must_use]
    pub fn next_available(self, tier: Tier) -> Style {
        cycle_next(Style::all(), self, |style| style.available_in(tier))
    }
}

/// Translation direction. `Auto` lets the prompt describe the detected source language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Auto,
    JaFr,
    FrJa,
    JaEn,
    EnJa,
}

impl Direction {
    #[must_use]
    pub const fn all() -> &'static [Direction] {
        &[
            Direction::Auto,
            Direction::JaFr,
            Direction::FrJa,
            Direction::JaEn,
            Direction::EnJa,
        ]
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Auto => "auto",
            Direction::JaFr => "ja_fr",
            Direction::FrJa => "fr_ja",
            Direction::JaEn => "ja_en",
            Direction::EnJa => "en_ja",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Direction::Auto => "Auto detect",
            Direction::JaFr => "JA -> FR",
            Direction::FrJa => "FR -> JA",
            Direction::JaEn => "JA -> EN",
            Direction::EnJa => "EN -> JA",
        }
    }

    #[must_use]
    pub const fn requires_pro(self) -> bool {
        matches!(self, Direction::JaEn | Direction::EnJa)
    }

    #[must_use]
    pub const fn available_in(self, tier: Tier) -> bool {
        tier.is_pro() || !self.requires_pro()
    }

    #[must_use]
    pub fn next_available(self, tier: Tier) -> Direction {
        cycle_next(Direction::all(), self, |direction| direction.available_in(tier))
    }
}

fn cycle_next<T: Copy + PartialEq>(all: &[T], current: T, allowed: impl Fn(T) -> bool) -> T {
    let start = all.iter().position(|item| *item == current).unwrap_or(0);
    (1..=all.len())
        .map(|offset| all[(start + offset) % all.len()])
        .find(|item| allowed(*item))
        .unwrap_or(current)
}

/// Source language guess used for `Direction::Auto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Japanese,
    English,
}

impl Language {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Language::Japanese => "ja",
            Language::English => "en",
        }
    }
}

// ============================================================================
// Model & Credentials
// ============================================================================

#[derive(Debug, Error)]
pub enum ModelParseError {
    #[error("model name cannot be empty")]
    Empty,
}

/// Remote model identifier, always in the `models/<name>` resource form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelId(Cow<'static, str>);

impl ModelId {
    /// Default used when the remote listing is empty.
    pub const DEFAULT: ModelId = ModelId::known("models/gemini-1.5-flash");

    /// Parse a user-supplied model name; a bare name gets the `models/` prefix.
    pub fn parse(raw: &str) -> Result<Self, ModelParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ModelParseError::Empty);
        }
        if trimmed.starts_with("models/") {
            Ok(Self(Cow::Owned(trimmed.to_string())))
        } else {
            Ok(Self(Cow::Owned(format!("models/{trimmed}"))))
        }
    }

    #[must_use]
    pub const fn known(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_ref()
    }

    /// Name without the `models/` prefix, for display.
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.as_str().strip_prefix("models/").unwrap_or(self.as_str())
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Gemini API key.
///
/// Note: `Debug` is manually implemented to redact the key value, preventing accidental
/// credential disclosure in logs or error messages.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKey(<redacted>)")
    }
}

/// Plaintext password that unlocks the pro tier.
#[derive(Clone, PartialEq, Eq)]
pub struct ProPassword(String);

impl ProPassword {
    #[must_use]
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ProPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ProPassword(<redacted>)")
    }
}
