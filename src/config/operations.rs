//! Settings loading, environment overlay and validation.

use super::model::Settings;
use super::types::{MAX_DELIVERY_TIMEOUT_SECONDS, MAX_RETRIES_LIMIT};
use crate::error::{AdwError, Result};
use std::path::Path;
use std::time::Duration;

impl Settings {
    /// Load settings from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            AdwError::ConfigError(format!(
                "failed to read settings file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load settings from `path` if it exists, defaults otherwise, then
    /// overlay the process environment and validate.
    pub fn resolve<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut settings = if path.exists() {
            Self::load(path)?
        } else {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            Self::default()
        };

        settings.apply_env();
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from a YAML string.
    ///
    /// An empty document yields the defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let settings: Settings = if yaml.trim().is_empty() {
            Settings::default()
        } else {
            serde_yaml::from_str(yaml)
                .map_err(|e| AdwError::ConfigError(format!("failed to parse settings YAML: {}", e)))?
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Serialize settings to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| AdwError::ConfigError(format!("failed to serialize settings: {}", e)))
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary variable lookup.
    ///
    /// Recognized variables: `CLAUDE_CODE_PATH`, `SLACK_WEBHOOK_URL`,
    /// `SLACK_TIMEOUT`, `SLACK_MAX_RETRIES`. Empty values are ignored and
    /// unparseable numbers are logged and ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(binary) = get("CLAUDE_CODE_PATH") {
            self.agent.binary = binary;
        }
        if let Some(url) = get("SLACK_WEBHOOK_URL") {
            self.slack.webhook_url = Some(url);
        }
        if let Some(raw) = get("SLACK_TIMEOUT") {
            match raw.trim().parse() {
                Ok(secs) => self.slack.timeout_seconds = secs,
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid SLACK_TIMEOUT"),
            }
        }
        if let Some(raw) = get("SLACK_MAX_RETRIES") {
            match raw.trim().parse() {
                Ok(n) => self.slack.max_retries = n,
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid SLACK_MAX_RETRIES"),
            }
        }
    }

    /// Validate settings values.
    ///
    /// Validation rules:
    /// - `agent.binary` must be non-empty
    /// - every timeout must be positive
    /// - delivery timeouts must not exceed `MAX_DELIVERY_TIMEOUT_SECONDS`
    /// - retry counts must not exceed `MAX_RETRIES_LIMIT`
    /// - `retry.delays_seconds` must be non-empty and ascending
    pub fn validate(&self) -> Result<()> {
        if self.agent.binary.trim().is_empty() {
            return Err(AdwError::ConfigError(
                "settings validation failed: agent.binary must not be empty".to_string(),
            ));
        }

        if self.agent.timeout_seconds == 0 {
            return Err(AdwError::ConfigError(
                "settings validation failed: agent.timeout_seconds must be greater than 0"
                    .to_string(),
            ));
        }

        if self.events.handler_timeout_seconds == 0 {
            return Err(AdwError::ConfigError(
                "settings validation failed: events.handler_timeout_seconds must be greater than 0"
                    .to_string(),
            ));
        }

        if self.slack.timeout_seconds == 0 {
            return Err(AdwError::ConfigError(
                "settings validation failed: slack.timeout_seconds must be greater than 0"
                    .to_string(),
            ));
        }

        let delivery_timeouts = [
            ("events.handler_timeout_seconds", self.events.handler_timeout_seconds),
            ("slack.timeout_seconds", self.slack.timeout_seconds),
        ];
        for (field, secs) in delivery_timeouts {
            if secs > MAX_DELIVERY_TIMEOUT_SECONDS {
                return Err(AdwError::ConfigError(format!(
                    "settings validation failed: {} must be at most {} (got {})",
                    field, MAX_DELIVERY_TIMEOUT_SECONDS, secs
                )));
            }
        }

        let retry_counts = [
            ("retry.max_retries", self.retry.max_retries),
            ("slack.max_retries", self.slack.max_retries),
        ];
        for (field, count) in retry_counts {
            if count > MAX_RETRIES_LIMIT {
                return Err(AdwError::ConfigError(format!(
                    "settings validation failed: {} must be at most {} (got {})",
                    field, MAX_RETRIES_LIMIT, count
                )));
            }
        }

        let delays = &self.retry.delays_seconds;
        if delays.is_empty() {
            return Err(AdwError::ConfigError(
                "settings validation failed: retry.delays_seconds must not be empty".to_string(),
            ));
        }
        if delays.windows(2).any(|w| w[1] < w[0]) {
            return Err(AdwError::ConfigError(format!(
                "settings validation failed: retry.delays_seconds must be ascending (got {:?})",
                delays
            )));
        }

        Ok(())
    }

    /// Overall timeout for one agent attempt.
    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.agent.timeout_seconds)
    }

    /// Independent wait for each delivery handler.
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_secs(self.events.handler_timeout_seconds)
    }
}
