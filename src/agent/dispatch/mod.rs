//! Agent subprocess dispatch and execution.
//!
//! This module provides subprocess execution for the agent with:
//!
//! - Full ambient environment plus explicit pass-through variables
//! - Configurable timeout with process termination
//! - stdout streamed to the output sink, stderr captured to a sibling log
//! - Prompt delivery over stdin for large prompts

mod executor;

pub use executor::{
    DEFAULT_TIMEOUT, PASS_THROUGH_VARS, ProcessResult, RunSpec, agent_env, execute_agent,
    stderr_log_path,
};
