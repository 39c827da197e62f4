//! Event router: turns an event type plus data into a validated [`Event`] and
//! fans it out to every applicable handler.
//!
//! Each applicable handler runs on its own thread and reports back over a
//! channel. The router waits at most `handler_timeout` from dispatch start;
//! handlers that have not reported by then are recorded as timed out and left
//! to finish on their own. Handler failures never become errors of `emit`.

use super::event::{EmitContext, Event};
use super::handlers::EventHandler;
use super::render::render_template;
use super::taxonomy::Taxonomy;
use crate::error::Result;
use chrono::Utc;
use serde_json::{Map, Value};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// Default wait for delivery handlers.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of one handler for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered,
    Failed(String),
    TimedOut,
}

/// Delivery record for one handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub platform: String,
    pub status: DeliveryStatus,
    /// Set for channels whose failures are tolerated (Slack).
    pub best_effort: bool,
}

/// Per-handler outcome of an emit, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub event_type: String,
    pub deliveries: Vec<Delivery>,
}

impl DispatchReport {
    fn empty(event_type: &str) -> Self {
        Self {
            event_type: event_type.to_string(),
            deliveries: Vec::new(),
        }
    }

    /// True when no handler was invoked.
    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }

    /// Deliveries that failed or timed out, ignoring best-effort channels.
    pub fn failed(&self) -> Vec<&Delivery> {
        self.deliveries
            .iter()
            .filter(|d| !d.best_effort && d.status != DeliveryStatus::Delivered)
            .collect()
    }

    /// True when every required delivery succeeded.
    pub fn all_delivered(&self) -> bool {
        self.failed().is_empty()
    }

    /// Status reported for `platform`, if a handler for it ran.
    pub fn status_of(&self, platform: &str) -> Option<&DeliveryStatus> {
        self.deliveries
            .iter()
            .find(|d| d.platform == platform)
            .map(|d| &d.status)
    }
}

/// Routes events from the taxonomy to registered handlers.
///
/// Built once at startup and passed by reference; the taxonomy and the
/// handler list do not change afterwards.
pub struct EventRouter {
    taxonomy: Arc<Taxonomy>,
    handlers: Vec<Arc<dyn EventHandler>>,
    handler_timeout: Duration,
}

impl EventRouter {
    pub fn new(taxonomy: Arc<Taxonomy>) -> Self {
        Self {
            taxonomy,
            handlers: Vec::new(),
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
        }
    }

    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = timeout;
        self
    }

    /// Add a handler. Handlers are consulted in registration order.
    pub fn register_handler(&mut self, handler: Arc<dyn EventHandler>) {
        tracing::debug!(platform = handler.platform_name(), "registered handler");
        self.handlers.push(handler);
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Build the event for `event_type` without dispatching it.
    ///
    /// Returns `Ok(None)` for types the taxonomy does not define.
    pub fn build_event(
        &self,
        event_type: &str,
        data: Map<String, Value>,
        context: &EmitContext,
    ) -> Result<Option<Event>> {
        let Some(definition) = self.taxonomy.get(event_type) else {
            tracing::warn!(event_type, "unknown event type, skipping");
            return Ok(None);
        };

        let rendered = match render_template(&definition.message.template, &data) {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::warn!(
                    event_type,
                    error = %e,
                    "template rendering failed, using raw template"
                );
                definition.message.template.clone()
            }
        };

        let event = Event::build(event_type, definition, rendered, data, context, Utc::now());
        event.validate()?;
        Ok(Some(event))
    }

    /// Emit an event to every handler that accepts it.
    ///
    /// Only a contract violation in the built event is an error. Unknown
    /// types yield an empty report, and delivery problems are recorded in
    /// the report.
    pub fn emit(
        &self,
        event_type: &str,
        data: Map<String, Value>,
        context: &EmitContext,
    ) -> Result<DispatchReport> {
        match self.build_event(event_type, data, context)? {
            Some(event) => Ok(self.dispatch(event)),
            None => Ok(DispatchReport::empty(event_type)),
        }
    }

    /// Like [`emit`](Self::emit), but a contract violation is logged and an
    /// empty report returned.
    pub fn emit_safe(
        &self,
        event_type: &str,
        data: Map<String, Value>,
        context: &EmitContext,
    ) -> DispatchReport {
        self.emit(event_type, data, context).unwrap_or_else(|e| {
            tracing::warn!(event_type, error = %e, "event not emitted");
            DispatchReport::empty(event_type)
        })
    }

    /// Deliver a built event to the applicable handlers.
    pub fn dispatch(&self, event: Event) -> DispatchReport {
        let applicable: Vec<Arc<dyn EventHandler>> = self
            .handlers
            .iter()
            .filter(|h| h.should_handle(&event))
            .cloned()
            .collect();

        if applicable.is_empty() {
            tracing::debug!(event_type = %event.event_type, "no handlers for event");
            return DispatchReport::empty(&event.event_type);
        }

        let event = Arc::new(event);
        let (tx, rx) = mpsc::channel::<(usize, std::result::Result<(), String>)>();
        let mut statuses: Vec<Option<DeliveryStatus>> = vec![None; applicable.len()];
        let mut pending = 0usize;

        for (index, handler) in applicable.iter().enumerate() {
            let handler = Arc::clone(handler);
            let event = Arc::clone(&event);
            let tx = tx.clone();

            let spawned = thread::Builder::new()
                .name(format!("adw-handler-{}", handler.platform_name()))
                .spawn(move || {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(&event)));
                    let outcome = match result {
                        Ok(Ok(())) => Ok(()),
                        Ok(Err(e)) => Err(e.to_string()),
                        Err(payload) => Err(panic_message(payload.as_ref())),
                    };
                    // The router may have stopped waiting; a closed channel is fine.
                    let _ = tx.send((index, outcome));
                });

            match spawned {
                Ok(_) => pending += 1,
                Err(e) => {
                    statuses[index] = Some(DeliveryStatus::Failed(format!(
                        "failed to spawn handler: {}",
                        e
                    )));
                }
            }
        }
        drop(tx);

        let deadline = Instant::now().checked_add(self.handler_timeout);
        while pending > 0 {
            let received = match deadline {
                Some(deadline) => {
                    rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
                }
                None => rx.recv().map_err(|_| mpsc::RecvTimeoutError::Disconnected),
            };
            match received {
                Ok((index, outcome)) => {
                    pending -= 1;
                    statuses[index] = Some(match outcome {
                        Ok(()) => DeliveryStatus::Delivered,
                        Err(reason) => DeliveryStatus::Failed(reason),
                    });
                }
                Err(_) => break,
            }
        }

        let deliveries = applicable
            .iter()
            .zip(statuses)
            .map(|(handler, status)| {
                let platform = handler.platform_name().to_string();
                let best_effort = handler.best_effort();
                let status = status.unwrap_or(DeliveryStatus::TimedOut);
                match &status {
                    DeliveryStatus::Delivered => {}
                    DeliveryStatus::Failed(reason) if best_effort => tracing::warn!(
                        platform = %platform,
                        event_type = %event.event_type,
                        error = %reason,
                        "best-effort handler failed"
                    ),
                    DeliveryStatus::Failed(reason) => tracing::error!(
                        platform = %platform,
                        event_type = %event.event_type,
                        error = %reason,
                        "handler failed"
                    ),
                    DeliveryStatus::TimedOut if best_effort => tracing::warn!(
                        platform = %platform,
                        event_type = %event.event_type,
                        timeout_secs = self.handler_timeout.as_secs_f64(),
                        "best-effort handler timed out"
                    ),
                    DeliveryStatus::TimedOut => tracing::error!(
                        platform = %platform,
                        event_type = %event.event_type,
                        timeout_secs = self.handler_timeout.as_secs_f64(),
                        "handler timed out"
                    ),
                }
                Delivery {
                    platform,
                    status,
                    best_effort,
                }
            })
            .collect();

        DispatchReport {
            event_type: event.event_type.clone(),
            deliveries,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("handler panicked: {}", s)
    } else {
        "handler panicked".to_string()
    }
}
