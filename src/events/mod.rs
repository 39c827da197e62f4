//! Event notification router.
//!
//! Workflow drivers emit named events (`workflow.started`, `agent.failed`,
//! ...). The [`EventRouter`] looks the type up in the [`Taxonomy`], renders
//! its message template from the event data, validates the result and fans
//! it out to the registered [`EventHandler`]s:
//!
//! - GitHub issue comments (primary, failures are reported)
//! - Slack webhook messages (best-effort)

pub mod event;
pub mod handlers;
pub mod render;
pub mod router;
pub mod taxonomy;

pub use event::{EmitContext, Event, EventContext, EventMessage};
pub use handlers::{EventHandler, GitHubCommentHandler, SlackNotificationHandler};
pub use render::{TemplateError, render_template};
pub use router::{Delivery, DeliveryStatus, DispatchReport, EventRouter};
pub use taxonomy::{EventDefinition, MessageDefinition, Taxonomy};
