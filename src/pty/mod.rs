//! Pseudo-terminal process backend

mod backend;
mod command;
mod messages;

pub use backend::PtyBackend;
pub use messages::{format_exit_message, format_start_message};
