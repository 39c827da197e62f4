//! Command implementations for adw.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, and the [`App`] state every command shares: the resolved
//! project paths, the settings and the event router. The router is built
//! once here, before any command runs.

mod check;
mod emit;
mod parse;
mod run;

use crate::cli::Command;
use adw::config::Settings;
use adw::context::ProjectContext;
use adw::error::Result;
use adw::events::{EventRouter, GitHubCommentHandler, SlackNotificationHandler, Taxonomy};
use std::sync::Arc;

/// Process-wide state shared by the commands.
pub struct App {
    pub context: ProjectContext,
    pub settings: Settings,
    pub router: EventRouter,
}

impl App {
    /// Resolve the project, load settings and the taxonomy, and register the
    /// delivery handlers.
    pub fn load() -> Result<Self> {
        let context = ProjectContext::resolve()?;
        let settings = Settings::resolve(context.settings_path())?;
        let router = build_router(&context, &settings)?;

        Ok(Self {
            context,
            settings,
            router,
        })
    }
}

/// Build the event router with the GitHub handler and, when a webhook is
/// configured, the Slack handler.
pub fn build_router(context: &ProjectContext, settings: &Settings) -> Result<EventRouter> {
    let taxonomy = Taxonomy::load(context.resolve_path(&settings.events.taxonomy_path))?;
    let mut router =
        EventRouter::new(Arc::new(taxonomy)).with_handler_timeout(settings.handler_timeout());

    let repo = std::env::var("GITHUB_REPO_URL")
        .ok()
        .filter(|url| !url.trim().is_empty());
    router.register_handler(Arc::new(GitHubCommentHandler::with_gh(repo)));

    if settings.slack.is_enabled() {
        let slack = SlackNotificationHandler::with_http(
            settings.slack.clone(),
            &context.project_root,
            settings.handler_timeout(),
        )?;
        router.register_handler(Arc::new(slack));
    }

    Ok(router)
}

/// Dispatch a command to its implementation.
///
/// This is the main entry point for command execution. Each command
/// is routed to its handler function.
pub fn dispatch(command: Command, app: &App) -> Result<()> {
    match command {
        Command::Prompt(args) => run::cmd_prompt(args, app),
        Command::Template(args) => run::cmd_template(args, app),
        Command::Parse(args) => parse::cmd_parse(args),
        Command::Emit(args) => emit::cmd_emit(args, app),
        Command::Events => emit::cmd_events(app),
        Command::Check => check::cmd_check(app),
    }
}
