use std::fs;
use std::path::{Path, PathBuf};

use pkb_ai::chunking::ChunkConfig;
use pkb_ai::guardrails::{ConfidenceGate, DEFAULT_CONFIDENCE_THRESHOLD};
use pkb_ai::openai::{DEFAULT_BASE_URL, DEFAULT_COMPLETION_MODEL, DEFAULT_EMBEDDING_MODEL};
use pkb_ai::respond::{ReplyMessages, ResponderSettings, DEFAULT_INTRO_COOLDOWN};
use pkb_ai::retrieve::DEFAULT_TOP_K;
use pkb_core::error::AppError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "policybot.toml";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub policies_dir: PathBuf,
    pub index_path: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            policies_dir: PathBuf::from("policies"),
            index_path: PathBuf::from("kb").join("hr_kb_index.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub confidence_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ModelsConfig {
    pub embedding: String,
    pub completion: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            embedding: DEFAULT_EMBEDDING_MODEL.to_string(),
            completion: DEFAULT_COMPLETION_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BotSection {
    pub intro_cooldown_secs: i64,
    pub messages: ReplyMessages,
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            intro_cooldown_secs: DEFAULT_INTRO_COOLDOWN.whole_seconds(),
            messages: ReplyMessages::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
        }
    }
}

/// Everything the indexer and the query service read from `policybot.toml`.
///
/// Every section and key is optional; omitted values fall back to the library defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BotConfig {
    pub paths: PathsConfig,
    pub chunking: ChunkConfig,
    pub retrieval: RetrievalConfig,
    pub models: ModelsConfig,
    pub bot: BotSection,
    pub server: ServerConfig,
}

impl BotConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, AppError> {
        let cfg: BotConfig = toml::from_str(text).map_err(|e| {
            AppError::new("PKB_CONFIG_INVALID", "Failed to parse config file")
                .with_details(e.to_string())
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read `explicit` if given (it must exist), else `policybot.toml` in the working directory
    /// when present, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, AppError> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    tracing::debug!("no {DEFAULT_CONFIG_FILE} found; using defaults");
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let text = fs::read_to_string(&path).map_err(|e| {
            AppError::new("PKB_CONFIG_INVALID", "Failed to read config file")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        let cfg = Self::from_toml_str(&text).map_err(|e| {
            let details = match e.details.as_deref() {
                Some(d) => format!("path={}; {}", path.display(), d),
                None => format!("path={}", path.display()),
            };
            e.with_details(details)
        })?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    /// Apply environment overrides. `lookup` is `std::env::var` in production.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.models.base_url = url;
        }
        self
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.chunking.validate()?;
        ConfidenceGate::new(self.retrieval.confidence_threshold)?;

        if self.retrieval.top_k == 0 {
            return Err(AppError::new(
                "PKB_CONFIG_INVALID",
                "retrieval.top_k must be at least 1",
            ));
        }
        if self.bot.intro_cooldown_secs < 0 {
            return Err(AppError::new(
                "PKB_CONFIG_INVALID",
                "bot.intro_cooldown_secs must not be negative",
            )
            .with_details(format!("intro_cooldown_secs={}", self.bot.intro_cooldown_secs)));
        }
        if self.models.embedding.trim().is_empty() || self.models.completion.trim().is_empty() {
            return Err(AppError::new(
                "PKB_CONFIG_INVALID",
                "models.embedding and models.completion must be set",
            ));
        }
        let msgs = &self.bot.messages;
        if msgs.deferral.trim().is_empty() || msgs.deferral.trim() == msgs.failure.trim() {
            return Err(AppError::new(
                "PKB_CONFIG_INVALID",
                "bot.messages.deferral must be non-empty and differ from bot.messages.failure",
            ));
        }
        Ok(())
    }

    pub fn responder_settings(&self) -> ResponderSettings {
        ResponderSettings {
            embedding_model: self.models.embedding.clone(),
            completion_model: self.models.completion.clone(),
            top_k: self.retrieval.top_k,
            confidence_threshold: self.retrieval.confidence_threshold,
            intro_cooldown: time::Duration::seconds(self.bot.intro_cooldown_secs),
            messages: self.bot.messages.clone(),
        }
    }
}
