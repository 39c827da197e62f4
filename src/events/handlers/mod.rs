//! Delivery handlers.
//!
//! A handler decides per event whether it applies (`should_handle`) and then
//! delivers it (`handle`). Handlers run on their own threads, so they must be
//! `Send + Sync` and keep no per-call state.
//!
//! - [`GitHubCommentHandler`]: primary channel, errors propagate to the router
//! - [`SlackNotificationHandler`]: best-effort, errors are logged and swallowed

mod github;
mod slack;

pub use github::{GhCommenter, GitHubCommentHandler, IssueCommenter};
pub use slack::{
    HttpWebhookPoster, SlackNotificationHandler, SlackPayload, WebhookPoster, format_slack_message,
};

use super::event::Event;
use crate::error::Result;
use std::sync::LazyLock;

static HOST_NAME: LazyLock<String> = LazyLock::new(|| {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
});

/// A delivery channel for events.
pub trait EventHandler: Send + Sync {
    /// Short channel name used in logs and dispatch reports.
    fn platform_name(&self) -> &str;

    /// Whether this handler applies to `event`.
    fn should_handle(&self, event: &Event) -> bool;

    /// Deliver `event`. Errors are recorded by the router, never raised.
    fn handle(&self, event: &Event) -> Result<()>;

    /// Whether an undelivered event on this channel is acceptable.
    ///
    /// Deliveries of best-effort handlers are still reported, but never
    /// counted as failures.
    fn best_effort(&self) -> bool {
        false
    }
}

/// Name of this machine, prefixed to every notification.
pub fn host_name() -> &'static str {
    &HOST_NAME
}
