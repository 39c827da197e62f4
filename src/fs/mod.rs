//! Filesystem utilities for adw.
//!
//! Artifacts written next to the agent output stream go through atomic
//! writes so concurrent readers never see partial content.

pub mod atomic;

pub use atomic::{atomic_write, atomic_write_file};
