//! Settings for adw.
//!
//! `Settings` represents `adws/adw_config/settings.yaml`. Parsing is
//! forward-compatible (unknown fields are ignored), every field has a
//! default, and the environment variables the workflow scripts already use
//! (`CLAUDE_CODE_PATH`, `SLACK_WEBHOOK_URL`, ...) are overlaid on top.

mod model;
mod operations;
pub mod types;


pub use model::Settings;
pub use types::{AgentSettings, EventSettings, RetrySettings, SlackSettings};
