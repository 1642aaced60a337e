//! Guard configuration.
//!
//! Layered the usual way: built-in defaults, then an optional JSON
//! config file (explicit path via `BROWSER_GUARD_CONFIG`, else the
//! default location), then environment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::GuardError;

const DEFAULT_CONFIG_PATH: &str = "config/guard.json";

/// Enforcement and tuning knobs for a guard installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct GuardConfig {
    /// `block` refuses denied calls, `warn` logs and passes them.
    /// Compared case-insensitively.
    pub mode: String,

    /// Abort sessions on required outcome mismatches
    pub strict_outcomes: bool,

    /// Collect step traces
    pub collect_trace: bool,

    /// Snapshots retained by the ref store
    pub snapshot_history: usize,

    /// Plan-generation attempts before falling back
    pub max_retries: u32,

    /// Fall back to the template planner when generation fails
    pub fallback_to_template: bool,

    /// LLM provider settings
    pub llm: LlmSettings,
}

/// Provider selection and transport budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct LlmSettings {
    /// `template`, `openai`, or `anthropic`
    pub provider: String,

    /// Model override; providers have their own defaults
    pub model: Option<String>,

    /// Request timeout override in milliseconds
    pub timeout_ms: Option<u64>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            mode: "block".to_string(),
            strict_outcomes: true,
            collect_trace: true,
            snapshot_history: browser_guard_ref_store::DEFAULT_SNAPSHOT_HISTORY,
            max_retries: 2,
            fallback_to_template: true,
            llm: LlmSettings::default(),
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "template".to_string(),
            model: None,
            timeout_ms: None,
        }
    }
}

impl GuardConfig {
    /// Load from `BROWSER_GUARD_CONFIG`, the default path, or built-in
    /// defaults, then apply environment overrides.
    pub fn load() -> Self {
        let mut config = Self::load_file()
            .unwrap_or_else(|e| {
                warn!("failed to load guard config: {e}; using defaults");
                Self::default()
            });
        config.apply_env();
        config
    }

    /// Load a specific config file.
    pub fn from_path(path: &Path) -> Result<Self, GuardError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn load_file() -> Result<Self, GuardError> {
        if let Ok(path) = std::env::var("BROWSER_GUARD_CONFIG") {
            return Self::from_path(&PathBuf::from(path));
        }
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            return Self::from_path(default_path);
        }
        Ok(Self::default())
    }

    fn apply_env(&mut self) {
        if let Ok(mode) = std::env::var("BROWSER_GUARD_MODE") {
            self.mode = mode;
        }
        if let Ok(strict) = std::env::var("BROWSER_GUARD_STRICT") {
            if let Ok(value) = strict.parse::<bool>() {
                self.strict_outcomes = value;
            }
        }
    }

    /// Whether denied calls should pass with a warning instead of being
    /// refused.
    pub fn is_warn_mode(&self) -> bool {
        self.mode.eq_ignore_ascii_case("warn")
    }

    /// Interpreter view of this configuration.
    pub fn interpreter_config(&self) -> browser_guard_interpreter::InterpreterConfig {
        browser_guard_interpreter::InterpreterConfig {
            strict_outcomes: self.strict_outcomes,
            collect_trace: self.collect_trace,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = GuardConfig::default();
        assert_eq!(config.mode, "block");
        assert!(config.strict_outcomes);
        assert_eq!(config.snapshot_history, 5);
        assert_eq!(config.llm.provider, "template");
    }

    #[test]
    fn test_mode_comparison_is_case_insensitive() {
        let mut config = GuardConfig::default();
        config.mode = "WARN".to_string();
        assert!(config.is_warn_mode());
        config.mode = "Block".to_string();
        assert!(!config.is_warn_mode());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp config");
        write!(
            file,
            r#"{{"mode": "warn", "max_retries": 5, "llm": {{"provider": "anthropic"}}}}"#
        )
        .unwrap();
        let config = GuardConfig::from_path(file.path()).expect("load config");
        assert!(config.is_warn_mode());
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.llm.provider, "anthropic");
        // Unspecified fields keep their defaults.
        assert!(config.strict_outcomes);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp config");
        write!(file, "not json").unwrap();
        assert!(GuardConfig::from_path(file.path()).is_err());
    }
}
