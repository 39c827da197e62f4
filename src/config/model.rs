//! Settings struct definition.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Settings for the invocation engine and the notification router.
///
/// This struct represents the contents of `adws/adw_config/settings.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Agent binary, attempt timeout and environment overrides.
    pub agent: AgentSettings,

    /// Retry schedule for transient failures.
    pub retry: RetrySettings,

    /// Taxonomy location and handler timeout.
    pub events: EventSettings,

    /// Slack webhook delivery.
    pub slack: SlackSettings,
}
