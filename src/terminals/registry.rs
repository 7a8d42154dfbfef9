use std::sync::Arc;

use log::debug;

use super::backend::{BackendError, ProcessBackend, TerminalSize};

/// Handle for writing to terminals, passed to whichever component needs it.
///
/// Cloning is cheap; every clone talks to the same backend.
#[derive(Clone)]
pub struct TerminalRegistry {
    backend: Arc<dyn ProcessBackend>,
}

impl TerminalRegistry {
    #[must_use]
    pub fn new(backend: Arc<dyn ProcessBackend>) -> Self {
        Self { backend }
    }

    /// Write raw bytes to a terminal's input.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the terminal is unknown or disconnected.
    pub fn write(&self, terminal_id: &str, data: &[u8]) -> Result<(), BackendError> {
        self.backend.input(terminal_id, data)
    }

    /// Type a command line into a terminal and press enter.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the terminal is unknown or disconnected.
    pub fn run_in_terminal(&self, terminal_id: &str, command: &str) -> Result<(), BackendError> {
        debug!("Running `{command}` in terminal '{terminal_id}'");
        let mut line = command.as_bytes().to_vec();
        line.push(b'\r');
        self.backend.input(terminal_id, &line)
    }

    /// Resize a terminal.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the terminal is unknown or disconnected.
    pub fn resize(&self, terminal_id: &str, size: TerminalSize) -> Result<(), BackendError> {
        self.backend.resize(terminal_id, size)
    }
}

impl std::fmt::Debug for TerminalRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalRegistry").finish_non_exhaustive()
    }
}
