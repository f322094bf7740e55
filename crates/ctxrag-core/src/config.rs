//! Lightweight configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys separated by `__`, e.g. `APP_ENGINE__IDF=bm25`). Provides
//! helpers to expand `~` and `${VAR}` and to resolve relative paths against a
//! known base directory.
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunking::ChunkingConfig;
use crate::corpus::CorpusSettings;
use crate::error::{Error, Result};

pub const DEFAULT_START_MARKER: &str = "Пример эксплуатации (без вредоносной нагрузки):";
pub const DEFAULT_END_MARKERS: [&str; 2] = ["Примечание:", "Примечания:"];

/// Inverse-document-frequency smoothing. One scheme applies to a whole
/// engine, whatever the corpus format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdfScheme {
    /// `ln((N + 1) / (d + 0.5)) + 1`
    #[default]
    Smoothed,
    /// `ln((N - d + 0.5) / (d + 0.5) + 1)`
    Bm25,
}

/// `[engine]`: what to index and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    pub corpus: CorpusSettings,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub idf: IdfScheme,
}

/// `[answer]`: query defaults and extraction markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerSettings {
    pub top_k: usize,
    pub max_context_chars: usize,
    pub start_marker: String,
    pub end_markers: Vec<String>,
    pub preview_chars: usize,
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_context_chars: 1500,
            start_marker: DEFAULT_START_MARKER.to_string(),
            end_markers: DEFAULT_END_MARKERS.iter().map(|m| (*m).to_string()).collect(),
            preview_chars: 120,
        }
    }
}

impl AnswerSettings {
    pub fn validate(&self) -> Result<()> {
        if self.start_marker.is_empty() {
            return Err(Error::InvalidConfig("answer.start_marker must not be empty".to_string()));
        }
        if self.end_markers.iter().any(String::is_empty) {
            return Err(Error::InvalidConfig("answer.end_markers must not contain empty markers".to_string()));
        }
        Ok(())
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    /// Configuration from an inline TOML document, without files or env vars.
    pub fn from_toml_str(toml: &str) -> Self {
        Self { figment: Figment::new().merge(Toml::string(toml)) }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// `[engine]`, validated, with the corpus path expanded and resolved
    /// against `base`.
    pub fn engine_settings(&self, base: &Path) -> anyhow::Result<EngineSettings> {
        let mut settings: EngineSettings = self.get("engine")?;
        settings.corpus.path = resolve_with_base(base, settings.corpus.path.to_string_lossy());
        settings.chunking.validate()?;
        Ok(settings)
    }

    /// `[answer]`, or the defaults when the section is absent.
    pub fn answer_settings(&self) -> anyhow::Result<AnswerSettings> {
        let settings = if self.figment.find_value("answer").is_ok() {
            self.get("answer")?
        } else {
            AnswerSettings::default()
        };
        settings.validate()?;
        Ok(settings)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
