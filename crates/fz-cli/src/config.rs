//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use fz_core::{ControllerSettings, ExamConfiguration, ExpiryPolicy};
use serde::de::Error as _;
use serde::{Deserialize, Serialize};

const REDACTED: &str = "[redacted]";

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Claude API key used for generation, evaluation and the tutor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Claude model name.
    pub model: String,

    /// Messages endpoint.
    pub api_url: String,

    /// Default study session length in minutes.
    pub study_minutes: u64,

    /// What happens when the exam countdown runs out.
    pub on_expiry: ExpiryPolicy,

    /// Default question counts per section.
    pub exam: ExamConfiguration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| REDACTED))
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("study_minutes", &self.study_minutes)
            .field("on_expiry", &self.on_expiry)
            .field("exam", &self.exam)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: fz_llm::DEFAULT_MODEL.to_string(),
            api_url: fz_llm::ANTHROPIC_API_URL.to_string(),
            study_minutes: 25,
            on_expiry: ExpiryPolicy::default(),
            exam: ExamConfiguration::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (FZ_*, nested keys as FZ_EXAM__SHORT)
        figment = figment.merge(Env::prefixed("FZ_").split("__"));

        let config: Self = figment.extract()?;
        if config.study_minutes == 0 {
            return Err(figment::Error::custom("study_minutes must be at least 1"));
        }
        Ok(config)
    }

    /// Session settings derived from this configuration.
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            study_duration: Duration::from_secs(self.study_minutes.saturating_mul(60)),
            expiry: self.on_expiry,
            exam: self.exam,
        }
    }

    /// The API key, if one is configured and not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Renders the configuration as TOML with the API key masked.
    pub fn to_redacted_toml(&self) -> Result<String, toml::ser::Error> {
        let mut shown = self.clone();
        if shown.api_key.is_some() {
            shown.api_key = Some(REDACTED.to_string());
        }
        toml::to_string(&shown)
    }
}

/// Returns the platform-specific config directory for fz.
///
/// On Linux: `~/.config/fz`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("fz"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_dirs_config_path_ends_with_fz() {
        let path = dirs_config_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "fz");
    }

    #[test]
    fn test_default_config_matches_session_defaults() {
        let config = Config::default();
        assert_eq!(config.controller_settings(), ControllerSettings::default());
        assert_eq!(config.model, fz_llm::DEFAULT_MODEL);
        assert!(config.api_key().is_none());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "study_minutes = 50\non_expiry = \"auto-submit\"\n\n[exam]\nshort = 2\nmedium = 1\nlong = 0"
        )
        .unwrap();

        let config = Config::load_from(Some(file.path())).unwrap();
        let settings = config.controller_settings();
        assert_eq!(settings.study_duration, Duration::from_secs(50 * 60));
        assert_eq!(settings.expiry, ExpiryPolicy::AutoSubmit);
        assert_eq!(settings.exam, ExamConfiguration::new(2, 1, 0));
    }

    #[test]
    fn test_missing_config_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.exam, ExamConfiguration::default());
    }

    #[test]
    fn test_zero_study_minutes_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "study_minutes = 0").unwrap();

        let err = Config::load_from(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("study_minutes must be at least 1"));
    }

    #[test]
    fn test_blank_api_key_counts_as_missing() {
        let config = Config {
            api_key: Some("   ".to_string()),
            ..Config::default()
        };
        assert!(config.api_key().is_none());
    }

    #[test]
    fn test_debug_and_toml_hide_api_key() {
        let config = Config {
            api_key: Some("sk-ant-secret".to_string()),
            ..Config::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-ant-secret"));

        let rendered = config.to_redacted_toml().unwrap();
        assert!(!rendered.contains("sk-ant-secret"));
        assert!(rendered.contains("api_key = \"[redacted]\""));
        assert!(rendered.contains("on_expiry = \"warn\""));
        assert!(rendered.contains("[exam]"));
    }
}
