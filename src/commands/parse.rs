//! Implementation of the `adw parse` command.

use super::run::print_outcome;
use crate::cli::ParseArgs;
use adw::agent::{parse_output_file, truncate};
use adw::error::{AdwError, Result};

/// Execute the `adw parse` command.
///
/// Derives the outcome from a recorded stream exactly as a finished run
/// would, prints it, and fails when the outcome is a failure.
pub fn cmd_parse(args: ParseArgs) -> Result<()> {
    if !args.file.is_file() {
        return Err(AdwError::UserError(format!(
            "output file '{}' not found",
            args.file.display()
        )));
    }

    let outcome = parse_output_file(&args.file);
    print_outcome(&outcome, args.json)?;

    if outcome.success {
        Ok(())
    } else {
        Err(AdwError::AgentError(truncate(&outcome.output, 200)))
    }
}
