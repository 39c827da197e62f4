//! ADW core: agent invocation engine and event notification router.
//!
//! The [`agent`] module runs the external coding agent as a subprocess and
//! reduces its streamed output to an outcome. The [`events`] module routes
//! workflow events from a YAML taxonomy to GitHub and Slack.

pub mod agent;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod fs;
pub mod gh;
pub mod git;

#[cfg(test)]
mod test_support;
