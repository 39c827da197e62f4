//! Slack webhook handler.
//!
//! Slack is a best-effort channel: every failure is logged at `warn` and
//! swallowed, so the handler always reports success to the router. Retries
//! stop once another attempt would overrun the poster's time budget, which
//! the router sets to its handler timeout.

use super::{EventHandler, host_name};
use crate::config::SlackSettings;
use crate::error::{AdwError, Result};
use crate::events::event::Event;
use crate::gh::BOT_IDENTIFIER;
use crate::git;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

const BOT_USERNAME: &str = "ADW Bot";
const BOT_ICON: &str = ":robot_face:";

/// HTTP statuses worth retrying.
const TRANSIENT_STATUSES: [StatusCode; 5] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Incoming-webhook message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackPayload {
    pub username: String,
    pub icon_emoji: String,
    pub text: String,
}

/// Build the Slack message for an issue comment.
///
/// The issue reference links to `<repo_url>/issues/<n>` when the repository
/// URL is known; the bot identifier is stripped from the comment.
pub fn format_slack_message(
    host: &str,
    issue_number: &str,
    comment: &str,
    repo_url: Option<&str>,
) -> SlackPayload {
    let link = match repo_url {
        Some(url) => format!(
            "<{}/issues/{}|#{}>",
            url.trim_end_matches('/'),
            issue_number,
            issue_number
        ),
        None => format!("#{}", issue_number),
    };
    let clean = comment.replace(BOT_IDENTIFIER, "");

    SlackPayload {
        username: BOT_USERNAME.to_string(),
        icon_emoji: BOT_ICON.to_string(),
        text: format!("[{}] Issue {}: {}", host, link, clean.trim()),
    }
}

/// Sends a payload to a webhook URL.
pub trait WebhookPoster: Send + Sync {
    fn post(&self, url: &str, payload: &SlackPayload) -> Result<()>;
}

/// Blocking HTTP poster with retries on transient statuses.
pub struct HttpWebhookPoster {
    client: Client,
    request_timeout: Duration,
    max_retries: u32,
    /// Upper bound on the whole `post`, requests and backoff included.
    budget: Duration,
}

impl HttpWebhookPoster {
    pub fn new(timeout: Duration, max_retries: u32, budget: Duration) -> Result<Self> {
        let request_timeout = timeout.min(budget);
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| AdwError::ConfigError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            request_timeout,
            max_retries,
            budget,
        })
    }

    pub fn from_settings(settings: &SlackSettings, budget: Duration) -> Result<Self> {
        Self::new(
            Duration::from_secs(settings.timeout_seconds),
            settings.max_retries,
            budget,
        )
    }
}

/// Delay before retry `attempt` (zero-based): 1s, 2s, 4s, ...
fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(6))
}

/// Whether waiting `delay` and sending one more request still ends within
/// `budget`, given `elapsed` time already spent.
fn retry_fits(
    elapsed: Duration,
    delay: Duration,
    request_timeout: Duration,
    budget: Duration,
) -> bool {
    elapsed
        .saturating_add(delay)
        .saturating_add(request_timeout)
        <= budget
}

impl WebhookPoster for HttpWebhookPoster {
    fn post(&self, url: &str, payload: &SlackPayload) -> Result<()> {
        let start = Instant::now();
        let mut attempt = 0;
        loop {
            let sent = self.client.post(url).json(payload).send();
            let retries_left = attempt < self.max_retries
                && retry_fits(
                    start.elapsed(),
                    backoff(attempt),
                    self.request_timeout,
                    self.budget,
                );

            match sent {
                Ok(response) => {
                    let status = response.status();
                    if TRANSIENT_STATUSES.contains(&status) && retries_left {
                        tracing::debug!(status = status.as_u16(), attempt, "retrying webhook");
                    } else {
                        return response.error_for_status().map(|_| ()).map_err(|e| {
                            AdwError::DeliveryError(format!("slack webhook rejected: {}", e))
                        });
                    }
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && retries_left => {
                    tracing::debug!(error = %e, attempt, "retrying webhook");
                }
                Err(e) => {
                    return Err(AdwError::DeliveryError(format!(
                        "slack webhook request failed: {}",
                        e
                    )));
                }
            }

            thread::sleep(backoff(attempt));
            attempt += 1;
        }
    }
}

/// Mirrors issue comments into a Slack channel.
pub struct SlackNotificationHandler {
    settings: SlackSettings,
    poster: Box<dyn WebhookPoster>,
    repo_dir: PathBuf,
}

impl SlackNotificationHandler {
    /// `repo_dir` is where the repository URL is resolved from.
    pub fn new(
        settings: SlackSettings,
        poster: Box<dyn WebhookPoster>,
        repo_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            settings,
            poster,
            repo_dir: repo_dir.into(),
        }
    }

    /// Handler backed by the blocking HTTP poster; one post never takes
    /// longer than `budget`.
    pub fn with_http(
        settings: SlackSettings,
        repo_dir: impl Into<PathBuf>,
        budget: Duration,
    ) -> Result<Self> {
        let poster = HttpWebhookPoster::from_settings(&settings, budget)?;
        Ok(Self::new(settings, Box::new(poster), repo_dir))
    }

    fn repo_url(&self) -> Option<String> {
        match git::get_repo_url(&self.repo_dir) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(error = %e, "could not resolve repository URL for slack link");
                None
            }
        }
    }
}

impl EventHandler for SlackNotificationHandler {
    fn platform_name(&self) -> &str {
        "slack"
    }

    fn should_handle(&self, event: &Event) -> bool {
        self.settings.is_enabled() && event.issue_number().is_some() && event.targets("slack")
    }

    fn best_effort(&self) -> bool {
        true
    }

    fn handle(&self, event: &Event) -> Result<()> {
        let (Some(url), Some(issue_number)) =
            (self.settings.webhook_url.as_deref(), event.issue_number())
        else {
            return Ok(());
        };

        let repo_url = self.repo_url();
        let payload = format_slack_message(
            host_name(),
            issue_number,
            &event.attributed_message(),
            repo_url.as_deref(),
        );

        let start = Instant::now();
        match self.poster.post(url, &payload) {
            Ok(()) => tracing::info!(
                platform = "slack",
                duration_ms = start.elapsed().as_millis() as u64,
                issue = issue_number,
                event_type = %event.event_type,
                "posted slack notification"
            ),
            Err(e) => tracing::warn!(
                platform = "slack",
                issue = issue_number,
                event_type = %event.event_type,
                error = %e,
                "slack notification failed"
            ),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event::EmitContext;
    use crate::events::taxonomy::Taxonomy;
    use chrono::Utc;
    use serial_test::serial;
    use serde_json::Map;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingPoster {
        posts: Arc<Mutex<Vec<(String, SlackPayload)>>>,
        fail: bool,
    }

    impl WebhookPoster for RecordingPoster {
        fn post(&self, url: &str, payload: &SlackPayload) -> Result<()> {
            self.posts
                .lock()
                .unwrap()
                .push((url.to_string(), payload.clone()));
            if self.fail {
                return Err(AdwError::DeliveryError("503 Service Unavailable".to_string()));
            }
            Ok(())
        }
    }

    fn enabled() -> SlackSettings {
        SlackSettings {
            webhook_url: Some("https://hooks.slack.test/T000/B000".to_string()),
            ..Default::default()
        }
    }

    fn event(platforms: &str, context: EmitContext) -> Event {
        let yaml = format!(
            "events:\n  review.done:\n    category: review\n    severity: info\n    \
             agent: reviewer\n    message:\n      template: Review passed\n    \
             platforms: {}\n",
            platforms
        );
        let taxonomy = Taxonomy::from_yaml(&yaml).unwrap();
        Event::build(
            "review.done",
            taxonomy.get("review.done").unwrap(),
            "Review passed".to_string(),
            Map::new(),
            &context,
            Utc::now(),
        )
    }

    #[test]
    fn test_format_with_repo_link() {
        let payload = format_slack_message(
            "devbox",
            "42",
            "[ADW-AGENTS] abc12345_reviewer: Review passed",
            Some("https://github.com/acme/app"),
        );

        assert_eq!(payload.username, "ADW Bot");
        assert_eq!(payload.icon_emoji, ":robot_face:");
        assert_eq!(
            payload.text,
            "[devbox] Issue <https://github.com/acme/app/issues/42|#42>: abc12345_reviewer: Review passed"
        );
    }

    #[test]
    fn test_format_without_repo_link() {
        let payload = format_slack_message("devbox", "7", "ops: done", None);

        assert_eq!(payload.text, "[devbox] Issue #7: ops: done");
    }

    #[test]
    fn test_payload_json_shape() {
        let payload = format_slack_message("h", "1", "m", None);

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["username"], "ADW Bot");
        assert_eq!(value["icon_emoji"], ":robot_face:");
        assert_eq!(value["text"], "[h] Issue #1: m");
    }

    #[test]
    fn test_skips_when_webhook_not_configured() {
        let temp_dir = TempDir::new().unwrap();
        let handler = SlackNotificationHandler::new(
            SlackSettings::default(),
            Box::new(RecordingPoster::default()),
            temp_dir.path(),
        );

        let event = event("[slack]", EmitContext::new().with_issue_number("42"));
        assert!(!handler.should_handle(&event));
    }

    #[test]
    fn test_skips_without_issue_or_slack_platform() {
        let temp_dir = TempDir::new().unwrap();
        let handler = SlackNotificationHandler::new(
            enabled(),
            Box::new(RecordingPoster::default()),
            temp_dir.path(),
        );

        assert!(!handler.should_handle(&event("[slack]", EmitContext::new())));
        assert!(!handler.should_handle(&event(
            "[github]",
            EmitContext::new().with_issue_number("42")
        )));
        assert!(handler.should_handle(&event(
            "[github, slack]",
            EmitContext::new().with_issue_number("42")
        )));
    }

    #[test]
    #[serial]
    fn test_posts_linked_payload() {
        let temp_dir = TempDir::new().unwrap();
        let poster = RecordingPoster::default();
        let posts = Arc::clone(&poster.posts);
        let handler = SlackNotificationHandler::new(enabled(), Box::new(poster), temp_dir.path());

        unsafe { std::env::set_var("GITHUB_REPO_URL", "https://github.com/acme/app.git") };
        let event = event(
            "[slack]",
            EmitContext::new()
                .with_issue_number("42")
                .with_adw_id("abc12345"),
        );
        let result = handler.handle(&event);
        unsafe { std::env::remove_var("GITHUB_REPO_URL") };

        result.unwrap();
        let posts = posts.lock().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, "https://hooks.slack.test/T000/B000");
        assert_eq!(
            posts[0].1.text,
            format!(
                "[{}] Issue <https://github.com/acme/app/issues/42|#42>: abc12345_reviewer: Review passed",
                host_name()
            )
        );
    }

    #[test]
    #[serial]
    fn test_unresolvable_repo_url_uses_plain_reference() {
        let temp_dir = TempDir::new().unwrap();
        let poster = RecordingPoster::default();
        let posts = Arc::clone(&poster.posts);
        let handler = SlackNotificationHandler::new(enabled(), Box::new(poster), temp_dir.path());

        unsafe { std::env::remove_var("GITHUB_REPO_URL") };
        handler
            .handle(&event("[slack]", EmitContext::new().with_issue_number("9")))
            .unwrap();

        let posts = posts.lock().unwrap();
        assert!(posts[0].1.text.contains("Issue #9: reviewer: Review passed"));
    }

    #[test]
    #[serial]
    fn test_post_failure_is_swallowed() {
        let temp_dir = TempDir::new().unwrap();
        let poster = RecordingPoster {
            fail: true,
            ..Default::default()
        };
        let posts = Arc::clone(&poster.posts);
        let handler = SlackNotificationHandler::new(enabled(), Box::new(poster), temp_dir.path());

        let result = handler.handle(&event("[slack]", EmitContext::new().with_issue_number("3")));

        assert!(result.is_ok());
        assert_eq!(posts.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_backoff_schedule() {
        assert_eq!(backoff(0), Duration::from_secs(1));
        assert_eq!(backoff(1), Duration::from_secs(2));
    }

    #[test]
    fn test_retries_stay_within_budget() {
        let secs = Duration::from_secs;

        assert!(retry_fits(secs(0), secs(1), secs(5), secs(10)));
        assert!(retry_fits(secs(4), secs(1), secs(5), secs(10)));
        assert!(!retry_fits(secs(5), secs(1), secs(5), secs(10)));
        assert!(!retry_fits(secs(0), backoff(2), secs(5), secs(5)));
        assert!(!retry_fits(Duration::MAX, secs(1), secs(5), Duration::MAX - secs(1)));
    }

    #[test]
    fn test_request_timeout_capped_by_budget() {
        let poster =
            HttpWebhookPoster::new(Duration::from_secs(5), 2, Duration::from_secs(2)).unwrap();

        assert_eq!(poster.request_timeout, Duration::from_secs(2));
        assert_eq!(poster.budget, Duration::from_secs(2));
    }

    #[test]
    fn test_slack_is_best_effort() {
        let temp_dir = TempDir::new().unwrap();
        let handler = SlackNotificationHandler::new(
            enabled(),
            Box::new(RecordingPoster::default()),
            temp_dir.path(),
        );

        assert!(handler.best_effort());
    }
}
