//! Settings sections and their defaults.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default agent binary when `CLAUDE_CODE_PATH` is not set.
pub const DEFAULT_AGENT_BINARY: &str = "claude";

/// Default overall timeout for one agent attempt.
pub const DEFAULT_AGENT_TIMEOUT_SECONDS: u64 = 300;

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Upper bound for any configured retry count.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Default wait for a single delivery handler.
pub const DEFAULT_HANDLER_TIMEOUT_SECONDS: u64 = 10;

/// Upper bound for the handler wait and the Slack request timeout.
pub const MAX_DELIVERY_TIMEOUT_SECONDS: u64 = 3600;

/// Default location of the event taxonomy, relative to the project root.
pub const DEFAULT_TAXONOMY_PATH: &str = "adws/adw_config/event_taxonomy.yaml";

/// Agent process settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Agent executable (name on PATH or absolute path).
    pub binary: String,

    /// Overall timeout for one attempt, in seconds.
    pub timeout_seconds: u64,

    /// Extra environment variables set on top of the inherited environment.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            binary: DEFAULT_AGENT_BINARY.to_string(),
            timeout_seconds: DEFAULT_AGENT_TIMEOUT_SECONDS,
            env: BTreeMap::new(),
        }
    }
}

/// Retry schedule for transient agent failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Retries after the initial attempt.
    pub max_retries: u32,

    /// Ascending delays before each retry, in seconds.
    pub delays_seconds: Vec<u64>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delays_seconds: default_delays_seconds(),
        }
    }
}

pub fn default_delays_seconds() -> Vec<u64> {
    vec![1, 3, 5]
}

/// Event routing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSettings {
    /// Taxonomy file, relative to the project root unless absolute.
    pub taxonomy_path: String,

    /// Independent wait for each delivery handler, in seconds.
    pub handler_timeout_seconds: u64,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            taxonomy_path: DEFAULT_TAXONOMY_PATH.to_string(),
            handler_timeout_seconds: DEFAULT_HANDLER_TIMEOUT_SECONDS,
        }
    }
}

/// Slack webhook settings. Slack is disabled while `webhook_url` is unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    /// Request timeout, in seconds.
    pub timeout_seconds: u64,

    /// Retries for transient HTTP statuses.
    pub max_retries: u32,
}

impl Default for SlackSettings {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_seconds: 5,
            max_retries: 2,
        }
    }
}

impl SlackSettings {
    /// True when a non-empty webhook URL is configured.
    pub fn is_enabled(&self) -> bool {
        self.webhook_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}
