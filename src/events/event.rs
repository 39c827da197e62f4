//! Event records handed to delivery handlers.

use super::taxonomy::EventDefinition;
use crate::error::{AdwError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Timestamp layout of `context.timestamp`: UTC with microseconds and a `Z`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Caller-supplied context for an emit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitContext {
    pub workflow: Option<String>,
    pub adw_id: Option<String>,
    pub issue_number: Option<String>,
    pub stage: Option<String>,
}

impl EmitContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workflow(mut self, workflow: impl Into<String>) -> Self {
        self.workflow = Some(workflow.into());
        self
    }

    pub fn with_adw_id(mut self, adw_id: impl Into<String>) -> Self {
        self.adw_id = Some(adw_id.into());
        self
    }

    pub fn with_issue_number(mut self, issue_number: impl Into<String>) -> Self {
        self.issue_number = Some(issue_number.into());
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }
}

/// Rendered message of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMessage {
    pub template: String,
    pub rendered: String,
    pub emoji: String,
    pub format: String,
}

/// Context of an event after enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    pub workflow: Option<String>,
    pub adw_id: Option<String>,
    pub issue_number: Option<String>,
    /// Role attribution from the event definition.
    pub agent_name: String,
    pub timestamp: String,
    pub stage: Option<String>,
}

/// A fully built, validated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_type: String,
    pub category: String,
    pub severity: String,
    pub message: EventMessage,
    pub context: EventContext,
    pub data: Map<String, Value>,
    pub actions: Vec<Value>,
    pub blocking: bool,
    pub universal: bool,
    pub platforms: Vec<String>,
}

impl Event {
    /// Build an event from its definition, the rendered message and the
    /// caller's context, stamped at `now`.
    pub fn build(
        event_type: &str,
        definition: &EventDefinition,
        rendered: String,
        data: Map<String, Value>,
        context: &EmitContext,
        now: DateTime<Utc>,
    ) -> Self {
        let platforms = if definition.platforms.is_empty() {
            vec!["github".to_string()]
        } else {
            definition.platforms.clone()
        };

        Self {
            event_type: event_type.to_string(),
            category: definition.category.clone(),
            severity: definition.severity.clone(),
            message: EventMessage {
                template: definition.message.template.clone(),
                rendered,
                emoji: definition.message.emoji.clone(),
                format: definition.message.format.clone(),
            },
            context: EventContext {
                workflow: context.workflow.clone(),
                adw_id: context.adw_id.clone(),
                issue_number: context.issue_number.clone(),
                agent_name: definition.agent.clone(),
                timestamp: now.format(TIMESTAMP_FORMAT).to_string(),
                stage: context.stage.clone(),
            },
            data,
            actions: definition.actions.clone(),
            blocking: definition.blocking,
            universal: definition.universal,
            platforms,
        }
    }

    /// Check the fields every handler relies on.
    ///
    /// Only fields owned by the taxonomy and the router are checked. The
    /// rendered message is built from caller data and may be blank.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("event_type", self.event_type.as_str()),
            ("category", self.category.as_str()),
            ("severity", self.severity.as_str()),
            ("context.timestamp", self.context.timestamp.as_str()),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(AdwError::EventContract(format!(
                    "event '{}' missing required field: {}",
                    self.event_type, field
                )));
            }
        }

        Ok(())
    }

    /// Issue number, when present and non-empty.
    pub fn issue_number(&self) -> Option<&str> {
        self.context
            .issue_number
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }

    /// Run identifier, when present and non-empty.
    pub fn adw_id(&self) -> Option<&str> {
        self.context.adw_id.as_deref().filter(|id| !id.is_empty())
    }

    /// True when `platform` is among the event's target channels.
    pub fn targets(&self, platform: &str) -> bool {
        self.platforms.iter().any(|p| p == platform)
    }

    /// `<adw_id>_<agent>: <rendered>`, or `<agent>: <rendered>` without a run id.
    pub fn attributed_message(&self) -> String {
        match self.adw_id() {
            Some(adw_id) => format!(
                "{}_{}: {}",
                adw_id, self.context.agent_name, self.message.rendered
            ),
            None => format!("{}: {}", self.context.agent_name, self.message.rendered),
        }
    }
}
