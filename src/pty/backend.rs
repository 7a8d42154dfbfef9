use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::spawn;

use log::{debug, error};
use parking_lot::Mutex;
use portable_pty::{Child, ChildKiller, MasterPty, PtySize, native_pty_system};
use tokio::sync::mpsc;

use super::command::shell_command;
use super::messages::{format_exit_message, format_start_message};
use crate::terminals::{BackendError, ProcessBackend, ProcessEvent, SpawnRequest, TerminalSize};

const EVENT_BUFFER: usize = 1000;

impl From<TerminalSize> for PtySize {
    fn from(size: TerminalSize) -> Self {
        Self {
            cols: size.cols(),
            rows: size.rows(),
            pixel_width: 0,
            pixel_height: 0,
        }
    }
}

type SpawnedPty = (Box<dyn Child + Send + Sync>, Box<dyn MasterPty + Send>);

#[derive(Debug)]
enum PtyUpdate {
    Resize(TerminalSize),
    Write(Vec<u8>),
    KillProcess,
}

struct Session {
    generation: u32,
    pty_tx: crossbeam_channel::Sender<PtyUpdate>,
}

type Sessions = Arc<Mutex<HashMap<String, Session>>>;

/// Process backend running every terminal's command in its own pseudo-terminal.
///
/// Each process gets a reader thread forwarding output and the exit status as
/// [`ProcessEvent`]s and a writer thread handling input, resizes and kills.
pub struct PtyBackend {
    cwd: PathBuf,
    sessions: Sessions,
    event_tx: mpsc::Sender<ProcessEvent>,
}

impl PtyBackend {
    /// Create a backend running commands from `cwd`, with the receiver for its events
    #[must_use]
    pub fn new(cwd: impl Into<PathBuf>) -> (Self, mpsc::Receiver<ProcessEvent>) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let backend = Self {
            cwd: cwd.into(),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            event_tx,
        };
        (backend, event_rx)
    }

    /// Number of processes that have not exited or been killed
    #[must_use]
    pub fn running(&self) -> usize {
        self.sessions.lock().len()
    }

    fn spawn_pty(&self, request: &SpawnRequest) -> Result<SpawnedPty, BackendError> {
        let pair = native_pty_system()
            .openpty(request.size.into())
            .map_err(|e| BackendError::PtyError(e.to_string()))?;

        let child = pair
            .slave
            .spawn_command(shell_command(request, &self.cwd))
            .map_err(|e| BackendError::Process(e.to_string()))?;

        drop(pair.slave); // The reader sees EOF once the child exits

        Ok((child, pair.master))
    }

    fn send(&self, terminal_id: &str, update: PtyUpdate) -> Result<(), BackendError> {
        let sessions = self.sessions.lock();
        let session = sessions
            .get(terminal_id)
            .ok_or_else(|| BackendError::UnknownTerminal(terminal_id.to_string()))?;
        session
            .pty_tx
            .send(update)
            .map_err(|_| BackendError::Disconnected(terminal_id.to_string()))
    }
}

/// Forward output and the exit status of a process as events
fn spawn_pty_reader(
    mut reader: Box<dyn Read + Send>,
    mut process: Box<dyn Child + Send + Sync>,
    request: SpawnRequest,
    sessions: Sessions,
    event_tx: mpsc::Sender<ProcessEvent>,
) {
    let SpawnRequest {
        terminal_id,
        command,
        generation,
        ..
    } = request;

    spawn(move || {
        let _ = event_tx.blocking_send(ProcessEvent::Started {
            terminal_id: terminal_id.clone(),
            generation,
        });
        let _ = event_tx.blocking_send(ProcessEvent::Output {
            terminal_id: terminal_id.clone(),
            data: format_start_message(&command),
        });

        let mut buf = [0u8; 1024];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => {
                    debug!("PTY reader EOF for '{terminal_id}'");
                    break;
                }
                Ok(n) => {
                    let event = ProcessEvent::Output {
                        terminal_id: terminal_id.clone(),
                        data: buf[..n].to_vec(),
                    };
                    if event_tx.blocking_send(event).is_err() {
                        debug!("PTY reader: event channel closed");
                        break;
                    }
                }
                Err(e) => {
                    debug!("PTY reader for '{terminal_id}' stopped: {e:?}");
                    break;
                }
            }
        }

        let (exit_code, signal) = match process.wait() {
            Ok(status) => (status.exit_code(), status.signal().map(str::to_string)),
            Err(e) => {
                error!("Failed to wait for process of '{terminal_id}': {e:?}");
                (1, None)
            }
        };

        {
            // A refresh may already have registered a newer process under this id
            let mut sessions = sessions.lock();
            if sessions
                .get(&terminal_id)
                .is_some_and(|s| s.generation == generation)
            {
                sessions.remove(&terminal_id);
            }
        }

        let _ = event_tx.blocking_send(ProcessEvent::Output {
            terminal_id: terminal_id.clone(),
            data: format_exit_message(exit_code, signal.as_deref()),
        });
        let _ = event_tx.blocking_send(ProcessEvent::Ended {
            terminal_id,
            generation,
            exit_code,
            signal,
        });
    });
}

fn spawn_pty_writer(
    mut writer: Box<dyn Write + Send>,
    master: Box<dyn MasterPty + Send>,
    mut killer: Box<dyn ChildKiller + Send + Sync>,
) -> crossbeam_channel::Sender<PtyUpdate> {
    let (pty_tx, pty_rx) = crossbeam_channel::bounded(1000);

    spawn(move || {
        loop {
            match pty_rx.recv() {
                Ok(PtyUpdate::Resize(size)) => {
                    if let Err(e) = master.resize(size.into()) {
                        error!("Failed to resize PTY: {e:?}");
                    }
                }
                Ok(PtyUpdate::Write(input)) => {
                    if let Err(e) = writer.write_all(&input) {
                        error!("Failed to write to PTY: {e:?}");
                    }
                }
                Ok(PtyUpdate::KillProcess) => {
                    debug!("Killing process");
                    killer
                        .kill()
                        .unwrap_or_else(|e| debug!("Failed to kill process: {e:?}"));
                    break;
                }
                Err(_) => {
                    debug!("PTY writer thread EOF");
                    break;
                }
            }
        }
    });

    pty_tx
}

impl ProcessBackend for PtyBackend {
    fn spawn(&self, request: SpawnRequest) -> Result<(), BackendError> {
        if self.sessions.lock().contains_key(&request.terminal_id) {
            return Err(BackendError::Process(format!(
                "Terminal '{}' already has a running process",
                request.terminal_id
            )));
        }
        debug!(
            "Spawning '{}' for terminal '{}' (generation {})",
            request.command, request.terminal_id, request.generation
        );

        let (process, master) = self.spawn_pty(&request)?;
        let reader = master
            .try_clone_reader()
            .map_err(|e| BackendError::PtyError(format!("Failed to clone PTY reader: {e}")))?;
        let writer = master
            .take_writer()
            .map_err(|e| BackendError::PtyError(format!("Failed to take PTY writer: {e}")))?;
        let killer = process.clone_killer();

        let pty_tx = spawn_pty_writer(writer, master, killer);
        self.sessions.lock().insert(
            request.terminal_id.clone(),
            Session {
                generation: request.generation,
                pty_tx,
            },
        );
        spawn_pty_reader(
            reader,
            process,
            request,
            Arc::clone(&self.sessions),
            self.event_tx.clone(),
        );
        Ok(())
    }

    fn kill(&self, terminal_id: &str) -> Result<(), BackendError> {
        let session = self
            .sessions
            .lock()
            .remove(terminal_id)
            .ok_or_else(|| BackendError::UnknownTerminal(terminal_id.to_string()))?;
        // The writer may be gone if the process exited in the meantime
        let _ = session.pty_tx.send(PtyUpdate::KillProcess);
        Ok(())
    }

    fn input(&self, terminal_id: &str, data: &[u8]) -> Result<(), BackendError> {
        self.send(terminal_id, PtyUpdate::Write(data.to_vec()))
    }

    fn resize(&self, terminal_id: &str, size: TerminalSize) -> Result<(), BackendError> {
        self.send(terminal_id, PtyUpdate::Resize(size))
    }
}
