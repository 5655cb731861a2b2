//! Runtime configuration
//!
//! Everything is read from the environment once at startup and handed to the
//! components that need it. CLI flags override the overlapping values.
//!
//! Environment variables:
//! - `AI_BACKEND`: `gemini` (default) or `mock`
//! - `GEMINI_API_KEY`: API key for the Gemini backend
//! - `GEMINI_BASE_URL`: API base URL (default: Google's public endpoint)
//! - `GEMINI_IDENTIFY_MODEL`: model used to identify the store (default: gemini-2.5-flash-lite)
//! - `GEMINI_EXTRACT_MODEL`: model used to extract items (default: gemini-2.5-flash)
//! - `EXTRACTION_TIMEOUT_SECS`: per-request deadline for model calls (default: 60)
//! - `LOG_LEVEL`: default log filter (default: info)
//! - `LOG_FORMAT`: `compact` (default) or `full`
//! - `ALLOWED_ORIGINS`: comma-separated CORS origins

use std::time::Duration;

use tracing::warn;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_IDENTIFY_MODEL: &str = "gemini-2.5-flash-lite";
pub const DEFAULT_EXTRACT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Which extraction backend to build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Gemini,
    Mock,
}

impl BackendKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "gemini" | "google" => Some(Self::Gemini),
            "mock" => Some(Self::Mock),
            _ => None,
        }
    }
}

/// Gemini API settings
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub identify_model: String,
    pub extract_model: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            identify_model: DEFAULT_IDENTIFY_MODEL.to_string(),
            extract_model: DEFAULT_EXTRACT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Log output layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
}

/// Logging settings, installed once by the binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// An `EnvFilter` directive such as `info` or `ticketer_core=debug`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Process-wide configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendKind,
    pub gemini: GeminiConfig,
    pub log: LogConfig,
    pub allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::Gemini,
            gemini: GeminiConfig::default(),
            log: LogConfig::default(),
            allowed_origins: Vec::new(),
        }
    }
}

impl Config {
    /// Build configuration from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        let backend = match get("AI_BACKEND") {
            Some(value) => BackendKind::parse(&value).unwrap_or_else(|| {
                warn!(backend = %value, "Unknown AI_BACKEND, falling back to gemini");
                BackendKind::Gemini
            }),
            None => defaults.backend,
        };

        let timeout_secs = match get("EXTRACTION_TIMEOUT_SECS") {
            Some(value) => value.trim().parse().unwrap_or_else(|_| {
                warn!(value = %value, "Invalid EXTRACTION_TIMEOUT_SECS, using default");
                DEFAULT_TIMEOUT_SECS
            }),
            None => DEFAULT_TIMEOUT_SECS,
        };

        let gemini = GeminiConfig {
            api_key: get("GEMINI_API_KEY"),
            base_url: get("GEMINI_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.gemini.base_url),
            identify_model: get("GEMINI_IDENTIFY_MODEL").unwrap_or(defaults.gemini.identify_model),
            extract_model: get("GEMINI_EXTRACT_MODEL").unwrap_or(defaults.gemini.extract_model),
            timeout: Duration::from_secs(timeout_secs),
        };

        let format = match get("LOG_FORMAT").as_deref().map(str::to_lowercase).as_deref() {
            Some("full") => LogFormat::Full,
            _ => LogFormat::Compact,
        };
        let log = LogConfig {
            level: get("LOG_LEVEL").unwrap_or(defaults.log.level),
            format,
        };

        let allowed_origins = get("ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            backend,
            gemini,
            log,
            allowed_origins,
        }
    }
}
