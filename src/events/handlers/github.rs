//! GitHub issue comment handler.

use super::{EventHandler, host_name};
use crate::error::Result;
use crate::events::event::Event;
use crate::gh;
use std::time::Instant;

/// Posts a comment on an issue.
pub trait IssueCommenter: Send + Sync {
    fn comment(&self, issue_number: &str, message: &str) -> Result<()>;
}

/// Comments through the GitHub CLI.
#[derive(Debug, Clone, Default)]
pub struct GhCommenter {
    /// `owner/name` or repository URL; `gh` infers it from the cwd when unset.
    pub repo: Option<String>,
}

impl GhCommenter {
    pub fn new(repo: Option<String>) -> Self {
        Self { repo }
    }
}

impl IssueCommenter for GhCommenter {
    fn comment(&self, issue_number: &str, message: &str) -> Result<()> {
        gh::make_issue_comment(issue_number, message, self.repo.as_deref())
    }
}

/// Primary channel: comments on the workflow's issue. Failures propagate to
/// the router so callers can see them in the dispatch report.
pub struct GitHubCommentHandler {
    commenter: Box<dyn IssueCommenter>,
}

impl GitHubCommentHandler {
    pub fn new(commenter: Box<dyn IssueCommenter>) -> Self {
        Self { commenter }
    }

    /// Handler backed by the GitHub CLI.
    pub fn with_gh(repo: Option<String>) -> Self {
        Self::new(Box::new(GhCommenter::new(repo)))
    }

    /// `[<host>] Issue #<n>: <attributed message>`.
    pub fn format_comment(event: &Event, issue_number: &str) -> String {
        format!(
            "[{}] Issue #{}: {}",
            host_name(),
            issue_number,
            event.attributed_message()
        )
    }
}

impl EventHandler for GitHubCommentHandler {
    fn platform_name(&self) -> &str {
        "github"
    }

    fn should_handle(&self, event: &Event) -> bool {
        event.issue_number().is_some() && event.targets("github")
    }

    fn handle(&self, event: &Event) -> Result<()> {
        let Some(issue_number) = event.issue_number() else {
            return Ok(());
        };

        let message = Self::format_comment(event, issue_number);
        let start = Instant::now();

        if let Err(e) = self.commenter.comment(issue_number, &message) {
            tracing::error!(
                platform = "github",
                issue = issue_number,
                event_type = %event.event_type,
                error = %e,
                "failed to post issue comment"
            );
            return Err(e);
        }

        tracing::info!(
            platform = "github",
            duration_ms = start.elapsed().as_millis() as u64,
            issue = issue_number,
            event_type = %event.event_type,
            "posted issue comment"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdwError;
    use crate::events::event::EmitContext;
    use crate::events::taxonomy::Taxonomy;
    use chrono::Utc;
    use serde_json::Map;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingCommenter {
        comments: Arc<Mutex<Vec<(String, String)>>>,
        fail: bool,
    }

    impl IssueCommenter for RecordingCommenter {
        fn comment(&self, issue_number: &str, message: &str) -> Result<()> {
            if self.fail {
                return Err(AdwError::GitError("gh issue comment failed".to_string()));
            }
            self.comments
                .lock()
                .unwrap()
                .push((issue_number.to_string(), message.to_string()));
            Ok(())
        }
    }

    fn event(platforms: &str, context: EmitContext) -> Event {
        let yaml = format!(
            "events:\n  build.done:\n    category: build\n    severity: info\n    \
             agent: sdlc_implementor\n    message:\n      template: Build complete\n    \
             platforms: {}\n",
            platforms
        );
        let taxonomy = Taxonomy::from_yaml(&yaml).unwrap();
        let definition = taxonomy.get("build.done").unwrap();
        Event::build(
            "build.done",
            definition,
            "Build complete".to_string(),
            Map::new(),
            &context,
            Utc::now(),
        )
    }

    fn handler() -> (GitHubCommentHandler, Arc<Mutex<Vec<(String, String)>>>) {
        let commenter = RecordingCommenter::default();
        let comments = Arc::clone(&commenter.comments);
        (GitHubCommentHandler::new(Box::new(commenter)), comments)
    }

    #[test]
    fn test_posts_attributed_comment() {
        let (handler, comments) = handler();
        let event = event(
            "[github]",
            EmitContext::new()
                .with_issue_number("42")
                .with_adw_id("abc12345"),
        );

        assert!(handler.should_handle(&event));
        handler.handle(&event).unwrap();

        let comments = comments.lock().unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].0, "42");
        assert_eq!(
            comments[0].1,
            format!(
                "[{}] Issue #42: abc12345_sdlc_implementor: Build complete",
                host_name()
            )
        );
    }

    #[test]
    fn test_comment_without_adw_id() {
        let (handler, comments) = handler();
        let event = event("[github]", EmitContext::new().with_issue_number("7"));

        handler.handle(&event).unwrap();

        assert!(
            comments.lock().unwrap()[0]
                .1
                .ends_with("Issue #7: sdlc_implementor: Build complete")
        );
    }

    #[test]
    fn test_skips_without_issue_number() {
        let (handler, _) = handler();
        let event = event("[github]", EmitContext::new().with_adw_id("abc12345"));

        assert!(!handler.should_handle(&event));
    }

    #[test]
    fn test_skips_when_github_not_targeted() {
        let (handler, _) = handler();
        let event = event("[slack]", EmitContext::new().with_issue_number("42"));

        assert!(!handler.should_handle(&event));
    }

    #[test]
    fn test_failure_propagates() {
        let handler = GitHubCommentHandler::new(Box::new(RecordingCommenter {
            fail: true,
            ..Default::default()
        }));
        let event = event("[github]", EmitContext::new().with_issue_number("42"));

        let err = handler.handle(&event).unwrap_err();

        assert!(matches!(err, AdwError::GitError(_)));
    }
}
