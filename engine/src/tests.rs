//! Unit tests for the engine crate.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use jifra_providers::{ModelInfo, RemoteError};

use super::*;

/// Scripted model: pops one reply per `generate` call.
struct FakeModel {
    listing: Result<Vec<ModelInfo>, RemoteError>,
    replies: Mutex<VecDeque<Result<String, RemoteError>>>,
    prompts: Mutex<Vec<(ModelId, String)>>,
    list_calls: AtomicUsize,
}

impl FakeModel {
    fn new(replies: Vec<Result<String, RemoteError>>) -> Self {
        Self {
            listing: Ok(vec![ModelInfo {
                id: ModelId::known("models/gemini-pro"),
                capabilities: vec!["generateContent".into()],
            }]),
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
        }
    }

    fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    fn with_listing(mut self, listing: Result<Vec<ModelInfo>, RemoteError>) -> Self {
        self.listing = listing;
        self
    }

    fn generate_calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

impl TextModel for FakeModel {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, RemoteError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.listing.clone()
    }

    async fn generate(&self, model: &ModelId, prompt: &str) -> Result<String, RemoteError> {
        self.prompts
            .lock()
            .unwrap()
            .push((model.clone(), prompt.to_string()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RemoteError::Transport("no scripted reply".into())))
    }
}

#[derive(Default)]
struct InstantSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl Sleeper for InstantSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        self.waits.lock().unwrap().push(duration);
        std::future::ready(())
    }
}

const PASSWORD: &str = "hunter2";

fn app(model: FakeModel) -> App<FakeModel, InstantSleeper> {
    App::with_sleeper(
        model,
        AppSettings::new(ProPassword::new(PASSWORD)),
        InstantSleeper::default(),
    )
}

fn type_text(app: &mut App<FakeModel, InstantSleeper>, text: &str) {
    app.draft_mut().expect("input focused").insert_str(text);
}

fn unlock(app: &mut App<FakeModel, InstantSleeper>) {
    app.open_password_prompt();
    type_text(app, PASSWORD);
    app.submit_password();
    assert_eq!(app.session().tier(), Tier::Pro);
}

fn rate_limited() -> RemoteError {
    RemoteError::RateLimited {
        message: "Resource has been exhausted".into(),
        retry_after: None,
    }
}

#[tokio::test]
async fn blank_submit_warns_without_calling() {
    let mut app = app(FakeModel::replying("unused"));
    type_text(&mut app, "   \n ");
    app.submit().await;

    let notice = app.session().notice().expect("warning shown");
    assert_eq!(notice.level(), NoticeLevel::Warning);
    assert_eq!(notice.text(), "テキストを入力してください");
    assert_eq!(app.client.generate_calls(), 0);
    assert_eq!(app.client.list_calls.load(Ordering::SeqCst), 0);
    assert!(app.session().history().is_empty());
}

#[tokio::test]
async fn successful_submit_records_history_and_latest() {
    let reply = "パターン1: Bonjour\n戻し訳1: こんにちは\nパターン2: Salut\n戻し訳2: やあ";
    let mut app = app(FakeModel::replying(reply));
    type_text(&mut app, "こんにちは");
    app.submit().await;

    assert!(!app.is_processing());
    assert_eq!(app.session().history().len(), 1);
    let entry = &app.session().history().entries()[0];
    assert_eq!(entry.input(), "こんにちは");
    assert_eq!(entry.result(), reply);

    let (style, blocks) = app.latest_blocks().expect("latest result");
    assert_eq!(style, Style::Casual);
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].label.as_deref(), Some("パターン1"));
    assert_eq!(blocks[1].back_translation.as_deref(), Some("やあ"));

    let prompts = app.client.prompts.lock().unwrap();
    assert_eq!(prompts[0].0, ModelId::known("models/gemini-pro"));
    assert!(prompts[0].1.contains("auto(入力言語: ja)"));
}

#[tokio::test]
async fn input_survives_submit_and_clear_resets_it() {
    let mut app = app(FakeModel::replying("ok"));
    type_text(&mut app, "hello");
    app.submit().await;
    assert_eq!(app.input().text(), "hello");

    app.clear();
    assert_eq!(app.input().text(), "");
    assert!(app.session().latest().is_none());
    assert_eq!(app.session().history().len(), 1);
}

#[tokio::test]
async fn rate_limit_is_retried_with_backoff() {
    let model = FakeModel::new(vec![
        Err(rate_limited()),
        Err(rate_limited()),
        Ok("third time".into()),
    ]);
    let mut app = app(model);
    type_text(&mut app, "hello");
    app.submit().await;

    assert_eq!(app.client.generate_calls(), 3);
    let waits = app.sleeper.waits.lock().unwrap().clone();
    assert_eq!(waits.len(), 2);
    assert!(waits[0] >= Duration::from_secs(1));
    assert!(waits[1] >= Duration::from_secs(2));
    assert_eq!(app.session().history().entries()[0].result(), "third time");
}

#[tokio::test]
async fn exhausted_retries_surface_the_provider_message() {
    let model = FakeModel::new(vec![
        Err(rate_limited()),
        Err(rate_limited()),
        Err(rate_limited()),
    ]);
    let mut app = app(model);
    type_text(&mut app, "hello");
    app.submit().await;

    assert_eq!(app.client.generate_calls(), 3);
    assert!(app.session().history().is_empty());
    assert_eq!(
        app.session().latest(),
        Some(&LatestResult::Failure {
            message: "Resource has been exhausted".into()
        })
    );
    let notice = app.session().notice().unwrap();
    assert_eq!(notice.level(), NoticeLevel::Error);
    assert_eq!(notice.text(), "Error: Resource has been exhausted");
}

#[tokio::test]
async fn permanent_error_is_not_retried() {
    let model = FakeModel::new(vec![Err(RemoteError::Api {
        status: 400,
        message: "API key not valid".into(),
    })]);
    let mut app = app(model);
    type_text(&mut app, "hello");
    app.submit().await;

    assert_eq!(app.client.generate_calls(), 1);
    assert!(app.sleeper.waits.lock().unwrap().is_empty());
    assert!(matches!(
        app.session().latest(),
        Some(LatestResult::Failure { message }) if message == "API key not valid"
    ));
}

#[tokio::test]
async fn unavailable_model_refuses_generation_and_is_memoized() {
    let model = FakeModel::new(vec![Ok("never".into())])
        .with_listing(Err(RemoteError::Transport("offline".into())));
    let mut app = app(model);
    type_text(&mut app, "hello");
    app.submit().await;
    app.submit().await;

    assert_eq!(app.client.generate_calls(), 0);
    assert_eq!(app.client.list_calls.load(Ordering::SeqCst), 1);
    assert!(matches!(
        app.model_resolution(),
        Some(ModelResolution::Unavailable { .. })
    ));
    assert!(matches!(
        app.session().latest(),
        Some(LatestResult::Failure { message }) if message.starts_with("model unavailable")
    ));
}

#[tokio::test]
async fn model_is_resolved_once_across_submits() {
    let mut app = app(FakeModel::new(vec![Ok("a".into()), Ok("b".into())]));
    app.warm_up().await;
    type_text(&mut app, "x");
    app.submit().await;
    app.submit().await;
    assert_eq!(app.client.list_calls.load(Ordering::SeqCst), 1);
    assert_eq!(app.client.generate_calls(), 2);
}

#[tokio::test]
async fn prepare_submit_marks_processing_until_run_finishes() {
    let mut app = app(FakeModel::replying("done"));
    type_text(&mut app, "hi");
    let request = app.prepare_submit().expect("valid input");
    assert!(app.is_processing());
    assert!(app.prepare_submit().is_none());
    assert_eq!(request.style(), Style::Casual);
    app.run(request).await;
    assert!(!app.is_processing());
}

#[test]
fn password_unlocks_and_wrong_password_downgrades() {
    let mut app = app(FakeModel::replying("unused"));
    unlock(&mut app);
    assert_eq!(app.session().notice().unwrap().level(), NoticeLevel::Success);

    while app.session().style() != Style::Sns {
        app.cycle_style();
    }
    app.open_password_prompt();
    type_text(&mut app, "wrong");
    app.submit_password();

    assert_eq!(app.session().tier(), Tier::Free);
    assert_eq!(app.session().style(), Style::Casual);
    assert_eq!(app.focus(), Focus::Input);
    assert_eq!(app.session().notice().unwrap().level(), NoticeLevel::Warning);
}

#[test]
fn escape_backs_out_then_quits() {
    let mut app = app(FakeModel::replying("unused"));
    app.open_password_prompt();
    type_text(&mut app, "partial");
    app.escape();
    assert_eq!(app.focus(), Focus::Input);
    assert_eq!(app.password().text(), "");
    assert!(!app.should_quit());
    app.escape();
    assert!(app.should_quit());
}

#[test]
fn empty_history_cannot_take_focus() {
    let mut app = app(FakeModel::replying("unused"));
    app.focus_history();
    assert_eq!(app.focus(), Focus::Input);
    assert!(app.draft_mut().is_some());
}

#[tokio::test]
async fn free_tier_pin_attempt_is_advisory() {
    let mut app = app(FakeModel::replying("r"));
    type_text(&mut app, "x");
    app.submit().await;
    app.focus_history();
    assert!(app.draft_mut().is_none());
    app.toggle_selected_pin();

    assert_eq!(app.session().history().pinned_count(), 0);
    assert_eq!(app.session().notice().unwrap().level(), NoticeLevel::Warning);
}

#[tokio::test]
async fn pro_pinning_through_history_navigation() {
    let replies = (0..7).map(|i| Ok(format!("r{i}"))).collect();
    let mut app = app(FakeModel::new(replies));
    unlock(&mut app);
    type_text(&mut app, "x");
    for _ in 0..7 {
        app.submit().await;
    }
    app.focus_history();
    for _ in 0..5 {
        app.toggle_selected_pin();
        app.history_down();
    }
    assert_eq!(app.session().history().pinned_count(), 5);

    app.toggle_selected_pin();
    assert_eq!(app.session().history().pinned_count(), 5);
    assert_eq!(app.session().notice().unwrap().text(), "ピン留めは5個までです");

    app.clear_unpinned();
    assert_eq!(app.session().history().len(), 5);
    assert!(app.history_cursor() < 5);
    assert_eq!(app.focus(), Focus::History);
}

#[tokio::test]
async fn clearing_every_entry_returns_focus_to_input() {
    let mut app = app(FakeModel::replying("r"));
    type_text(&mut app, "x");
    app.submit().await;
    app.focus_history();
    app.clear_unpinned();
    assert!(app.session().history().is_empty());
    assert_eq!(app.focus(), Focus::Input);
}

#[test]
fn direction_notice_for_styles_without_direction() {
    let mut app = app(FakeModel::replying("unused"));
    unlock(&mut app);
    while app.session().style() != Style::Sns {
        app.cycle_style();
    }
    app.cycle_direction();
    assert_eq!(app.session().notice().unwrap().level(), NoticeLevel::Info);
}

#[test]
fn settings_from_config_apply_overrides() {
    let config: JifraConfig = toml::from_str(
        r#"
        [app]
        model = "gemini-exp"

        [retry]
        max_attempts = 5
        base_delay_ms = 250
        "#,
    )
    .unwrap();
    let credentials = Credentials {
        api_key: jifra_types::ApiKey::new("k"),
        pro_password: ProPassword::new("p"),
    };
    let settings = AppSettings::from_config(&credentials, Some(&config)).unwrap();
    assert_eq!(
        settings.model_override,
        Some(ModelId::known("models/gemini-exp"))
    );
    assert_eq!(settings.retry.max_attempts, 5);
    assert_eq!(settings.retry.base_delay, Duration::from_millis(250));
    assert_eq!(settings.retry.max_jitter, Duration::from_secs(1));
}

#[test]
fn detected_language_follows_input() {
    let mut app = app(FakeModel::replying("unused"));
    assert_eq!(app.detected_language(), None);
    type_text(&mut app, "Bonjour");
    assert_eq!(app.detected_language(), Some(Language::English));
}
