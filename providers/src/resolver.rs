//! Model selection.
//!
//! The first model in [`MODEL_PREFERENCE`] that the provider lists with the
//! `generateContent` capability wins. Otherwise the first generation-capable
//! model is used, and an empty listing falls back to [`ModelId::DEFAULT`].
//! A listing failure yields [`ModelResolution::Unavailable`] so generation can
//! be refused with a readable reason instead of a crash.
//!
//! The outcome (failure included) is computed once per [`ModelResolver`].

use tokio::sync::OnceCell;

use jifra_types::ModelId;

use crate::{GENERATE_CONTENT, TextModel};

/// Preferred models, best first.
pub const MODEL_PREFERENCE: [ModelId; 3] = [
    ModelId::known("models/gemini-1.5-flash"),
    ModelId::known("models/gemini-pro"),
    ModelId::known("models/gemini-1.0-pro"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelResolution {
    Resolved(ModelId),
    Unavailable { reason: String },
}

impl ModelResolution {
    #[must_use]
    pub fn model(&self) -> Option<&ModelId> {
        match self {
            Self::Resolved(model) => Some(model),
            Self::Unavailable { .. } => None,
        }
    }
}

/// Pick from generation-capable model ids.
#[must_use]
pub fn pick_model(available: &[ModelId]) -> ModelId {
    MODEL_PREFERENCE
        .iter()
        .find(|preferred| available.contains(preferred))
        .or_else(|| available.first())
        .cloned()
        .unwrap_or(ModelId::DEFAULT)
}

/// Memoizing resolver. Share one per process.
#[derive(Debug, Default)]
pub struct ModelResolver {
    resolved: OnceCell<ModelResolution>,
    configured: Option<ModelId>,
}

impl ModelResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver that always answers `model` without listing.
    #[must_use]
    pub fn with_override(model: ModelId) -> Self {
        Self {
            resolved: OnceCell::new(),
            configured: Some(model),
        }
    }

    /// Resolution if one has already been computed.
    #[must_use]
    pub fn cached(&self) -> Option<&ModelResolution> {
        self.resolved.get()
    }

    pub async fn resolve<M>(&self, client: &M) -> &ModelResolution
    where
        M: TextModel + Sync,
    {
        self.resolved
            .get_or_init(|| async {
                if let Some(model) = &self.configured {
                    tracing::info!(model = %model, "Using configured model");
                    return ModelResolution::Resolved(model.clone());
                }
                match client.list_models().await {
                    Ok(models) => {
                        let capable: Vec<ModelId> = models
                            .into_iter()
                            .filter(|info| info.supports(GENERATE_CONTENT))
                            .map(|info| info.id)
                            .collect();
                        let model = pick_model(&capable);
                        tracing::info!(model = %model, candidates = capable.len(), "Resolved model");
                        ModelResolution::Resolved(model)
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "Model listing failed");
                        ModelResolution::Unavailable {
                            reason: err.to_string(),
                        }
                    }
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ModelInfo, RemoteError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeListing {
        listing: Result<Vec<ModelInfo>, RemoteError>,
        calls: AtomicUsize,
    }

    impl FakeListing {
        fn new(listing: Result<Vec<ModelInfo>, RemoteError>) -> Self {
            Self {
                listing,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl TextModel for FakeListing {
        async fn list_models(&self) -> Result<Vec<ModelInfo>, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.listing.clone()
        }

        async fn generate(&self, _model: &ModelId, _prompt: &str) -> Result<String, RemoteError> {
            unreachable!("resolver never generates")
        }
    }

    fn info(name: &'static str, capabilities: &[&str]) -> ModelInfo {
        ModelInfo {
            id: ModelId::known(name),
            capabilities: capabilities.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn preference_order_wins() {
        let available = [
            ModelId::known("models/gemini-1.0-pro"),
            ModelId::known("models/gemini-pro"),
        ];
        assert_eq!(pick_model(&available), ModelId::known("models/gemini-pro"));
    }

    #[test]
    fn unknown_models_fall_back_to_first() {
        let available = [
            ModelId::known("models/gemini-exp"),
            ModelId::known("models/gemini-other"),
        ];
        assert_eq!(pick_model(&available), ModelId::known("models/gemini-exp"));
    }

    #[test]
    fn empty_listing_uses_default() {
        assert_eq!(pick_model(&[]), ModelId::DEFAULT);
    }

    #[tokio::test]
    async fn filters_on_generate_content_and_memoizes() {
        let fake = FakeListing::new(Ok(vec![
            info("models/gemini-1.5-flash", &["embedContent"]),
            info("models/gemini-1.0-pro", &["generateContent"]),
        ]));
        let resolver = ModelResolver::new();

        let first = resolver.resolve(&fake).await.clone();
        let second = resolver.resolve(&fake).await.clone();

        assert_eq!(
            first,
            ModelResolution::Resolved(ModelId::known("models/gemini-1.0-pro"))
        );
        assert_eq!(first, second);
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn listing_failure_is_memoized_as_unavailable() {
        let fake = FakeListing::new(Err(RemoteError::Transport("dns error".into())));
        let resolver = ModelResolver::new();

        let resolution = resolver.resolve(&fake).await;
        assert_eq!(
            resolution,
            &ModelResolution::Unavailable {
                reason: "request failed: dns error".into()
            }
        );
        assert!(resolution.model().is_none());
        resolver.resolve(&fake).await;
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn override_skips_listing() {
        let fake = FakeListing::new(Ok(vec![]));
        let resolver = ModelResolver::with_override(ModelId::known("models/gemini-exp"));
        assert!(resolver.cached().is_none());

        let resolution = resolver.resolve(&fake).await;
        assert_eq!(resolution.model(), Some(&ModelId::known("models/gemini-exp")));
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
        assert!(resolver.cached().is_some());
    }
}
