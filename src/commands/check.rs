//! Implementation of the `adw check` command.

use super::App;
use adw::agent::check_agent_installed;
use adw::error::{AdwError, Result};

/// Execute the `adw check` command.
pub fn cmd_check(app: &App) -> Result<()> {
    let binary = &app.settings.agent.binary;

    match check_agent_installed(binary) {
        None => {
            println!("Agent CLI found: {}", binary);
            Ok(())
        }
        Some(message) => Err(AdwError::UserError(message)),
    }
}
