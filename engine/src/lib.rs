//! Interaction handlers for Jifra.
//!
//! [`App`] owns the [`Session`] and the remote client. Each handler runs to
//! completion before the next event is read, so state needs no locking.
//!
//! Submitting is split in two so the front end can draw a "processing" frame
//! between validation and the awaited remote call:
//!
//! ```text
//! prepare_submit()  -> Option<QueuedRequest>   (validate, build prompt)
//! run(request).await                           (resolve model, call, record)
//! ```

mod draft;
mod notice;
mod session;

pub use draft::DraftInput;
pub use notice::{Notice, NoticeLevel};
pub use session::{LatestResult, PinDenied, Session};

pub use jifra_config::{Credentials, JifraConfig};
pub use jifra_core::{PinOutcome, SchemaHints, parse_blocks};
pub use jifra_providers::{
    GeminiClient, ModelResolution, ModelResolver, RetryConfig, Sleeper, TextModel, TokioSleeper,
};
pub use jifra_types::{
    Direction, DisplayBlock, EntryId, HistoryEntry, Language, ModelId, NonEmptyString,
    ProPassword, Style, Tier,
};

use jifra_config::ConfigError;
use jifra_core::{MAX_PINNED, build_prompt, detect_language, tier_for};
use jifra_providers::generate_with_retry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("テキストを入力してください")]
    Empty,
}

/// Reject blank submissions.
pub fn validate_input(raw: &str) -> Result<NonEmptyString, InputError> {
    NonEmptyString::new(raw).map_err(|_| InputError::Empty)
}

/// Which widget receives key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Input,
    History,
    Password,
}

/// Startup options for [`App`].
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub pro_password: ProPassword,
    pub model_override: Option<ModelId>,
    pub retry: RetryConfig,
}

impl AppSettings {
    pub fn new(pro_password: ProPassword) -> Self {
        Self {
            pro_password,
            model_override: None,
            retry: RetryConfig::default(),
        }
    }

    /// Settings from validated credentials plus the optional config file.
    pub fn from_config(
        credentials: &Credentials,
        config: Option<&JifraConfig>,
    ) -> Result<Self, ConfigError> {
        let mut settings = Self::new(credentials.pro_password.clone());
        let Some(config) = config else {
            return Ok(settings);
        };
        settings.model_override = config.model_override()?;
        if let Some(retry) = &config.retry {
            if let Some(max_attempts) = retry.max_attempts {
                settings.retry.max_attempts = max_attempts;
            }
            if let Some(base_delay) = retry.base_delay() {
                settings.retry.base_delay = base_delay;
            }
            if let Some(max_jitter) = retry.max_jitter() {
                settings.retry.max_jitter = max_jitter;
            }
        }
        Ok(settings)
    }
}

/// A validated submission waiting for the remote call.
#[derive(Debug)]
pub struct QueuedRequest {
    style: Style,
    input: NonEmptyString,
    prompt: String,
}

impl QueuedRequest {
    #[must_use]
    pub fn style(&self) -> Style {
        self.style
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

pub struct App<M, S = TokioSleeper> {
    session: Session,
    focus: Focus,
    input: DraftInput,
    password: DraftInput,
    history_cursor: usize,
    client: M,
    resolver: ModelResolver,
    retry: RetryConfig,
    sleeper: S,
    pro_password: ProPassword,
    processing: bool,
    should_quit: bool,
}

impl<M> App<M, TokioSleeper>
where
    M: TextModel + Sync,
{
    pub fn new(client: M, settings: AppSettings) -> Self {
        Self::with_sleeper(client, settings, TokioSleeper)
    }
}

impl<M, S> App<M, S>
where
    M: TextModel + Sync,
    S: Sleeper + Sync,
{
    pub fn with_sleeper(client: M, settings: AppSettings, sleeper: S) -> Self {
        let resolver = match settings.model_override {
            Some(model) => ModelResolver::with_override(model),
            None => ModelResolver::new(),
        };
        Self {
            session: Session::new(),
            focus: Focus::Input,
            input: DraftInput::new(),
            password: DraftInput::new(),
            history_cursor: 0,
            client,
            resolver,
            retry: settings.retry,
            sleeper,
            pro_password: settings.pro_password,
            processing: false,
            should_quit: false,
        }
    }

    // ------------------------------------------------------------------
    // Read access for rendering
    // ------------------------------------------------------------------

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn focus(&self) -> Focus {
        self.focus
    }

    #[must_use]
    pub fn input(&self) -> &DraftInput {
        &self.input
    }

    #[must_use]
    pub fn password(&self) -> &DraftInput {
        &self.password
    }

    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.processing
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn request_quit(&mut self) {
        self.should_quit = true;
    }

    /// Source language guess for the current input, if any.
    #[must_use]
    pub fn detected_language(&self) -> Option<Language> {
        (!self.input.is_blank()).then(|| detect_language(self.input.text()))
    }

    /// Header label for the model; `None` until resolution has run.
    #[must_use]
    pub fn model_resolution(&self) -> Option<&ModelResolution> {
        self.resolver.cached()
    }

    #[must_use]
    pub fn history_cursor(&self) -> usize {
        self.history_cursor
    }

    #[must_use]
    pub fn selected_entry(&self) -> Option<&HistoryEntry> {
        self.session
            .history()
            .entries()
            .get(self.history_cursor)
    }

    /// Blocks for the latest successful result, parsed with the style's hints.
    #[must_use]
    pub fn latest_blocks(&self) -> Option<(Style, Vec<DisplayBlock>)> {
        match self.session.latest()? {
            LatestResult::Success { style, text } => {
                Some((*style, parse_blocks(text, &SchemaHints::for_style(*style))))
            }
            LatestResult::Failure { .. } => None,
        }
    }

    // ------------------------------------------------------------------
    // Focus
    // ------------------------------------------------------------------

    /// Active text buffer, if the focused widget edits text.
    pub fn draft_mut(&mut self) -> Option<&mut DraftInput> {
        match self.focus {
            Focus::Input => Some(&mut self.input),
            Focus::Password => Some(&mut self.password),
            Focus::History => None,
        }
    }

    pub fn focus_history(&mut self) {
        if self.session.history().is_empty() {
            self.session.set_notice(Notice::info("履歴はありません"));
            return;
        }
        self.clamp_history_cursor();
        self.focus = Focus::History;
    }

    pub fn open_password_prompt(&mut self) {
        self.password.clear();
        self.focus = Focus::Password;
    }

    /// `Esc`: leave the history list or the password prompt; quit from the input.
    pub fn escape(&mut self) {
        match self.focus {
            Focus::Input => self.request_quit(),
            Focus::History => self.focus = Focus::Input,
            Focus::Password => {
                self.password.clear();
                self.focus = Focus::Input;
            }
        }
    }

    // ------------------------------------------------------------------
    // Style, direction, tier
    // ------------------------------------------------------------------

    pub fn cycle_style(&mut self) {
        let style = self.session.cycle_style();
        tracing::debug!(style = style.as_str(), "Style changed");
        if style == Style::PromptGen {
            self.session.set_notice(Notice::info(
                "入力したキーワードを画像生成AI向けの高度なプロンプトに変換します。",
            ));
        } else {
            self.session.clear_notice();
        }
    }

    pub fn cycle_direction(&mut self) {
        let direction = self.session.cycle_direction();
        tracing::debug!(direction = direction.as_str(), "Direction changed");
        if !self.session.style().uses_direction() {
            self.session.set_notice(Notice::info(format!(
                "{} では翻訳方向は使われません",
                self.session.style().display_name()
            )));
        }
    }

    /// Check the password prompt's content and set the tier from it. A wrong
    /// or empty password drops back to the free tier.
    pub fn submit_password(&mut self) {
        let submitted = self.password.take_text();
        self.focus = Focus::Input;
        let tier = tier_for(&submitted, &self.pro_password);
        self.session.set_tier(tier);
        self.clamp_history_cursor();
        match tier {
            Tier::Pro => self.session.set_notice(Notice::success("✨ PRO Activated")),
            Tier::Free if submitted.is_empty() => {
                self.session.set_notice(Notice::info("FREE mode"));
            }
            Tier::Free => self
                .session
                .set_notice(Notice::warning("パスワードが違います")),
        }
    }

    // ------------------------------------------------------------------
    // Submit
    // ------------------------------------------------------------------

    /// Validate the input and build the prompt. Blank input leaves a warning
    /// and returns `None`; nothing is sent.
    pub fn prepare_submit(&mut self) -> Option<QueuedRequest> {
        if self.processing {
            return None;
        }
        let input = match validate_input(self.input.text()) {
            Ok(input) => input,
            Err(err) => {
                self.session.set_notice(Notice::warning(err.to_string()));
                return None;
            }
        };
        let style = self.session.style();
        let prompt = build_prompt(style, self.session.direction(), &input);
        self.processing = true;
        self.session.clear_notice();
        Some(QueuedRequest {
            style,
            input,
            prompt,
        })
    }

    /// Resolve the model, call it with retry, and record the outcome.
    pub async fn run(&mut self, request: QueuedRequest) {
        let resolution = self.resolver.resolve(&self.client).await.clone();
        let outcome = match resolution {
            ModelResolution::Resolved(model) => {
                generate_with_retry(
                    &self.client,
                    &model,
                    &request.prompt,
                    &self.retry,
                    &self.sleeper,
                )
                .await
                .map_err(|err| err.to_string())
            }
            ModelResolution::Unavailable { reason } => Err(format!("model unavailable: {reason}")),
        };

        match outcome {
            Ok(text) => {
                let id = self
                    .session
                    .record_success(request.style, request.input.as_str(), text);
                tracing::info!(entry = %id, style = request.style.as_str(), "Stored result");
            }
            Err(message) => {
                tracing::warn!(error = %message, "Generation failed");
                self.session.set_notice(Notice::error(format!("Error: {message}")));
                self.session.record_failure(message);
            }
        }
        self.processing = false;
    }

    pub async fn submit(&mut self) {
        if let Some(request) = self.prepare_submit() {
            self.run(request).await;
        }
    }

    /// Resolve the model ahead of the first submission so the header can show it.
    pub async fn warm_up(&self) {
        self.resolver.resolve(&self.client).await;
    }

    /// `Ctrl+L`: input and latest result only; history is kept.
    pub fn clear(&mut self) {
        self.input.clear();
        self.session.clear_latest();
        self.session.clear_notice();
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    pub fn history_up(&mut self) {
        self.history_cursor = self.history_cursor.saturating_sub(1);
    }

    pub fn history_down(&mut self) {
        let len = self.session.history().len();
        if self.history_cursor + 1 < len {
            self.history_cursor += 1;
        }
    }

    pub fn toggle_selected_pin(&mut self) {
        let Some(id) = self.selected_entry().map(HistoryEntry::id) else {
            return;
        };
        match self.session.toggle_pin(id) {
            Ok(_) => self.session.clear_notice(),
            Err(PinDenied::Rejected(_)) => {
                tracing::debug!(%id, "Pin limit reached");
                self.session
                    .set_notice(Notice::warning(format!("ピン留めは{MAX_PINNED}個までです")));
            }
            Err(err @ PinDenied::RequiresPro) => {
                self.session.set_notice(Notice::warning(err.to_string()));
            }
        }
    }

    pub fn clear_unpinned(&mut self) {
        self.session.clear_unpinned();
        self.clamp_history_cursor();
        if self.session.history().is_empty() {
            self.focus = Focus::Input;
        }
    }

    fn clamp_history_cursor(&mut self) {
        let len = self.session.history().len();
        self.history_cursor = self.history_cursor.min(len.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests;
