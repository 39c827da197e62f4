//! Event taxonomy: the declarative catalog of event types.
//!
//! Loaded once from `event_taxonomy.yaml`:
//!
//! ```yaml
//! events:
//!   workflow.started:
//!     category: workflow
//!     severity: info
//!     message:
//!       template: "Starting {workflow_stage}"
//!       emoji: "🚀"
//!     platforms: [github, slack]
//! platform_routing: {}
//! ```
//!
//! A missing file yields an empty taxonomy; a malformed one is an error.

use crate::agent::DEFAULT_AGENT_NAME;
use crate::error::{AdwError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Message presentation for an event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDefinition {
    /// Template with `{name}` placeholders filled from event data.
    pub template: String,

    #[serde(default)]
    pub emoji: String,

    #[serde(default = "default_format")]
    pub format: String,
}

/// Definition of one event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDefinition {
    pub category: String,
    pub severity: String,
    pub message: MessageDefinition,

    /// Delivery channels; GitHub only when omitted.
    #[serde(default = "default_platforms")]
    pub platforms: Vec<String>,

    #[serde(default)]
    pub blocking: bool,

    #[serde(default)]
    pub universal: bool,

    /// Agent role the event is attributed to.
    #[serde(default = "default_agent")]
    pub agent: String,

    #[serde(default)]
    pub actions: Vec<Value>,
}

fn default_format() -> String {
    "plain".to_string()
}

fn default_platforms() -> Vec<String> {
    vec!["github".to_string()]
}

fn default_agent() -> String {
    DEFAULT_AGENT_NAME.to_string()
}

/// The loaded catalog. Read-only after load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Taxonomy {
    pub events: BTreeMap<String, EventDefinition>,
    pub platform_routing: BTreeMap<String, Value>,
}

impl Taxonomy {
    /// Load the taxonomy from `path`.
    ///
    /// A missing file is not an error: notifications are optional, so an
    /// empty taxonomy is returned and every emit becomes a no-op.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = %path.display(),
                    "taxonomy file not found, using empty taxonomy"
                );
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(AdwError::ConfigError(format!(
                    "failed to read taxonomy file '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        let taxonomy = Self::from_yaml(&content).map_err(|e| match e {
            AdwError::ConfigError(msg) => {
                AdwError::ConfigError(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })?;

        tracing::info!(
            path = %path.display(),
            event_types = taxonomy.len(),
            "loaded event taxonomy"
        );
        Ok(taxonomy)
    }

    /// Parse a taxonomy document. An empty document is an empty taxonomy.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(yaml)
            .map_err(|e| AdwError::ConfigError(format!("failed to parse event taxonomy: {}", e)))
    }

    pub fn get(&self, event_type: &str) -> Option<&EventDefinition> {
        self.events.get(event_type)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Event types in sorted order.
    pub fn event_types(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(String::as_str)
    }
}
