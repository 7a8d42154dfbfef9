use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("No process for terminal '{0}'")]
    UnknownTerminal(String),
    #[error("Terminal '{0}' is disconnected")]
    Disconnected(String),
    #[error("Unable to open PTY: {0}")]
    PtyError(String),
    #[error("Process error: {0}")]
    Process(String),
}

/// Terminal dimensions in columns and rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalSize {
    cols: u16,
    rows: u16,
}

impl TerminalSize {
    /// Dimensions smaller than 2x2 are clamped up
    #[must_use]
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols: cols.max(2),
            rows: rows.max(2),
        }
    }

    #[must_use]
    pub fn cols(&self) -> u16 {
        self.cols
    }

    #[must_use]
    pub fn rows(&self) -> u16 {
        self.rows
    }
}

impl Default for TerminalSize {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

/// Request to start `command` for a terminal.
///
/// `generation` is echoed back in the process's events so that events from a
/// process replaced by a refresh can be told apart from the new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    pub terminal_id: String,
    pub command: String,
    pub size: TerminalSize,
    pub generation: u32,
}

/// Asynchronous notifications from a process backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Started {
        terminal_id: String,
        generation: u32,
    },
    Output {
        terminal_id: String,
        data: Vec<u8>,
    },
    Ended {
        terminal_id: String,
        generation: u32,
        exit_code: u32,
        signal: Option<String>,
    },
}

impl ProcessEvent {
    #[must_use]
    pub fn terminal_id(&self) -> &str {
        match self {
            ProcessEvent::Started { terminal_id, .. }
            | ProcessEvent::Output { terminal_id, .. }
            | ProcessEvent::Ended { terminal_id, .. } => terminal_id,
        }
    }
}

/// Owns and runs terminal processes, addressed by terminal id.
///
/// All requests are fire-and-forget: results come back as [`ProcessEvent`]s.
pub trait ProcessBackend: Send + Sync {
    /// Start a process. Any previous process for the same id must already be killed.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request cannot be issued.
    fn spawn(&self, request: SpawnRequest) -> Result<(), BackendError>;

    /// Kill the process of a terminal. Once this returns the id is free for a new spawn.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::UnknownTerminal` if no process is registered for the id.
    fn kill(&self, terminal_id: &str) -> Result<(), BackendError>;

    /// Write bytes to the process's input.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the terminal is unknown or disconnected.
    fn input(&self, terminal_id: &str, data: &[u8]) -> Result<(), BackendError>;

    /// Resize the terminal.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the terminal is unknown or disconnected.
    fn resize(&self, terminal_id: &str, size: TerminalSize) -> Result<(), BackendError>;
}
