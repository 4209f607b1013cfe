//! Configuration loading for Jifra.
//!
//! The config file lives at `~/.jifra/config.toml` and is optional. Secrets may
//! come from the file (with `${ENV_VAR}` expansion) or from the environment; the
//! file wins when both are present. [`Credentials::resolve`] is the single
//! startup validation path: if either secret is missing the application must
//! not start.

use serde::Deserialize;
use std::{env, path::PathBuf, time::Duration};

use jifra_types::{ApiKey, ModelId, ProPassword};

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const PRO_PASSWORD_ENV: &str = "PRO_PASSWORD";

#[derive(Debug, Default, Deserialize)]
pub struct JifraConfig {
    pub app: Option<AppConfig>,
    pub secrets: Option<SecretsConfig>,
    pub google: Option<GoogleConfig>,
    pub retry: Option<RetrySettings>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("missing secret '{name}': set {name} in the environment or under [secrets] in {hint}")]
    MissingSecret { name: &'static str, hint: String },
    #[error("invalid model in [app]: {0}")]
    InvalidModel(#[from] jifra_types::ModelParseError),
}

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    /// Skip model discovery and always use this model.
    pub model: Option<String>,
    /// Use ASCII-only glyphs for icons and spinners.
    #[serde(default)]
    pub ascii_only: bool,
    /// Enable a high-contrast color palette.
    #[serde(default)]
    pub high_contrast: bool,
}

/// Raw secret values as written in the config file.
///
/// Both the uppercase and the lowercase spelling are accepted; uppercase wins.
#[derive(Default, Deserialize)]
pub struct SecretsConfig {
    #[serde(rename = "GEMINI_API_KEY")]
    pub gemini_api_key_upper: Option<String>,
    #[serde(rename = "PRO_PASSWORD")]
    pub pro_password_upper: Option<String>,
    pub gemini_api_key: Option<String>,
    pub pro_password: Option<String>,
}

// Manual Debug impl to prevent leaking secrets in logs.
impl std::fmt::Debug for SecretsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn mask(opt: Option<&String>) -> &'static str {
            if opt.is_some() { "[REDACTED]" } else { "None" }
        }
        f.debug_struct("SecretsConfig")
            .field("GEMINI_API_KEY", &mask(self.gemini_api_key_upper.as_ref()))
            .field("PRO_PASSWORD", &mask(self.pro_password_upper.as_ref()))
            .field("gemini_api_key", &mask(self.gemini_api_key.as_ref()))
            .field("pro_password", &mask(self.pro_password.as_ref()))
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GoogleConfig {
    /// Override of the Gemini REST base URL (e.g. a proxy).
    pub api_base: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_jitter_ms: Option<u64>,
}

impl RetrySettings {
    #[must_use]
    pub fn base_delay(&self) -> Option<Duration> {
        self.base_delay_ms.map(Duration::from_millis)
    }

    #[must_use]
    pub fn max_jitter(&self) -> Option<Duration> {
        self.max_jitter_ms.map(Duration::from_millis)
    }
}

/// Validated secrets. Constructing one is the startup gate.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: ApiKey,
    pub pro_password: ProPassword,
}

impl Credentials {
    /// Resolve both secrets from the config file, then the environment.
    ///
    /// `lookup_env` is injected so the resolution can be tested without
    /// touching the process environment.
    pub fn resolve(
        config: Option<&JifraConfig>,
        lookup_env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let secrets = config.and_then(|cfg| cfg.secrets.as_ref());

        let api_key = first_present([
            secrets.and_then(|s| s.gemini_api_key_upper.clone()),
            secrets.and_then(|s| s.gemini_api_key.clone()),
            lookup_env(API_KEY_ENV),
        ])
        .ok_or_else(|| missing(API_KEY_ENV))?;

        let pro_password = first_present([
            secrets.and_then(|s| s.pro_password_upper.clone()),
            secrets.and_then(|s| s.pro_password.clone()),
            lookup_env(PRO_PASSWORD_ENV),
        ])
        .ok_or_else(|| missing(PRO_PASSWORD_ENV))?;

        Ok(Self {
            api_key: ApiKey::new(api_key),
            pro_password: ProPassword::new(pro_password),
        })
    }

    /// Resolve against the real process environment.
    pub fn from_env(config: Option<&JifraConfig>) -> Result<Self, ConfigError> {
        Self::resolve(config, |name| env::var(name).ok())
    }
}

fn first_present<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(|raw| expand_env_vars(&raw).trim().to_string())
        .find(|value| !value.is_empty())
}

fn missing(name: &'static str) -> ConfigError {
    let hint = config_path().map_or_else(
        || "~/.jifra/config.toml".to_string(),
        |p| p.display().to_string(),
    );
    ConfigError::MissingSecret { name, hint }
}

pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                if !var.is_empty() {
                    out.push_str(&env::var(var).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

impl JifraConfig {
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: PathBuf) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read { path, source: err });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse { path, source: err })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Model override from `[app] model`, if any.
    pub fn model_override(&self) -> Result<Option<ModelId>, ConfigError> {
        self.app
            .as_ref()
            .and_then(|app| app.model.as_deref())
            .map(ModelId::parse)
            .transpose()
            .map_err(ConfigError::from)
    }

    #[must_use]
    pub fn api_base(&self) -> Option<&str> {
        self.google
            .as_ref()
            .and_then(|google| google.api_base.as_deref())
            .map(str::trim)
            .filter(|base| !base.is_empty())
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".jifra").join("config.toml"))
}
