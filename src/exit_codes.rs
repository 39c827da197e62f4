//! Exit code constants for the adw CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config)
//! - 2: Agent failure (the invocation outcome was not successful)
//! - 3: Git or GitHub CLI failure
//! - 4: Event contract violation

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, unreadable or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// The agent ran (or tried to) and the outcome was a failure.
pub const AGENT_FAILURE: i32 = 2;

/// Git or `gh` operation failure.
pub const GIT_FAILURE: i32 = 3;

/// An event record was built without one of its required fields.
pub const EVENT_CONTRACT: i32 = 4;
