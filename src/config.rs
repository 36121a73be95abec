use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "Verdant";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum span of one evolution period, measured from its first observation.
pub const EVOLUTION_WINDOW_DAYS: i64 = 30;

/// Dead-band for the first-vs-last overall trend.
pub const OVERALL_TREND_DEAD_BAND: f64 = 5.0;

/// Effective score at or above which a plant counts as healthy in summaries.
pub const HEALTHY_SCORE_THRESHOLD: f64 = 70.0;

/// Get the application data directory.
/// ~/Verdant/ on all platforms; falls back to the working directory when
/// no home directory can be resolved.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Path of the garden database.
pub fn database_path() -> PathBuf {
    app_data_dir().join("garden.db")
}

/// Directory where captured plant photos are stored.
pub fn photos_dir() -> PathBuf {
    app_data_dir().join("photos")
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "verdant=info,warn"
}

// ═══════════════════════════════════════════════════════════
// Analysis service configuration
// ═══════════════════════════════════════════════════════════

/// Settings for the Ollama-backed plant health analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Base URL of the Ollama instance.
    pub base_url: String,
    /// Vision-capable model used for health assessment.
    pub model: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "llava:7b".into(),
            timeout_secs: 120,
        }
    }
}

impl AnalysisConfig {
    pub const ENV_URL: &'static str = "VERDANT_OLLAMA_URL";
    pub const ENV_MODEL: &'static str = "VERDANT_VISION_MODEL";
    pub const ENV_TIMEOUT: &'static str = "VERDANT_ANALYSIS_TIMEOUT_SECS";

    /// Defaults overridden by `VERDANT_*` environment variables.
    /// Unparseable timeouts are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup(Self::ENV_URL) {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = lookup(Self::ENV_MODEL) {
            config.model = model;
        }
        if let Some(raw) = lookup(Self::ENV_TIMEOUT) {
            match raw.parse::<u64>() {
                Ok(secs) => config.timeout_secs = secs,
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid analysis timeout"),
            }
        }
        config
    }
}
