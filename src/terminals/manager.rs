use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, error, info, warn};

use super::backend::{BackendError, ProcessBackend, ProcessEvent, SpawnRequest, TerminalSize};
use super::containers::{ContainerRuntime, StopReport};
use super::record::{ErrorKind, TerminalRecord, TerminalStatus};
use super::registry::TerminalRegistry;
use crate::commands::spec::CommandEntry;
use crate::condition::EvalInputs;

/// Result of one kill request during teardown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillResult {
    pub terminal_id: String,
    pub error: Option<String>,
}

/// Everything that happened while tearing down all terminals
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub kills: Vec<KillResult>,
    /// `None` when no terminal had associated containers
    pub containers: Option<StopReport>,
}

impl TeardownReport {
    /// Whether every kill and container stop succeeded
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.kills.iter().all(|k| k.error.is_none())
            && self.containers.as_ref().is_none_or(|c| c.success)
    }
}

/// Owns the terminal registry and drives each terminal's status from process events
pub struct TerminalManager {
    backend: Arc<dyn ProcessBackend>,
    containers: Arc<dyn ContainerRuntime>,
    records: Vec<TerminalRecord>,
    active_id: Option<String>,
    size: TerminalSize,
}

impl TerminalManager {
    #[must_use]
    pub fn new(backend: Arc<dyn ProcessBackend>, containers: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            backend,
            containers,
            records: Vec::new(),
            active_id: None,
            size: TerminalSize::default(),
        }
    }

    #[must_use]
    pub fn records(&self) -> &[TerminalRecord] {
        &self.records
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TerminalRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    /// Make `id` the active terminal. Returns `false` if it does not exist.
    pub fn set_active(&mut self, id: &str) -> bool {
        if self.get(id).is_some() {
            self.active_id = Some(id.to_string());
            true
        } else {
            false
        }
    }

    /// Whether every terminal has reached a final state
    #[must_use]
    pub fn all_settled(&self) -> bool {
        self.records.iter().all(|r| r.status.is_settled())
    }

    /// A handle for writing to terminals, for components that do not own the manager
    #[must_use]
    pub fn registry(&self) -> TerminalRegistry {
        TerminalRegistry::new(Arc::clone(&self.backend))
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    fn request_spawn(&mut self, index: usize) {
        let record = &mut self.records[index];
        let request = SpawnRequest {
            terminal_id: record.id.clone(),
            command: record.command.clone(),
            size: self.size,
            generation: record.refresh_count,
        };
        match self.backend.spawn(request) {
            Ok(()) => record.status = TerminalStatus::PendingSpawn,
            Err(e) => {
                error!("Failed to start '{}': {e}", record.title);
                record.fail(ErrorKind::Spawn, e.to_string());
            }
        }
    }

    fn stop_containers_of(&self, record: &TerminalRecord) {
        if record.associated_containers.is_empty() {
            return;
        }
        let report = self.containers.stop_containers(&record.associated_containers);
        for failure in report.failures() {
            warn!(
                "Container '{}' of '{}' did not stop: {}",
                failure.name,
                record.title,
                failure.message.as_deref().unwrap_or("unknown error")
            );
        }
    }

    fn kill_process(&self, id: &str) -> Result<(), BackendError> {
        match self.backend.kill(id) {
            Err(BackendError::UnknownTerminal(_)) => {
                debug!("No process to kill for terminal '{id}'");
                Ok(())
            }
            other => other,
        }
    }

    /// Replace the whole registry with one terminal per entry and start every command.
    ///
    /// Existing records are dropped without killing them; tear down first.
    pub fn open_tabs(&mut self, entries: Vec<CommandEntry>) {
        info!("Opening {} terminals", entries.len());
        self.records.clear();
        self.active_id = None;

        let mut ids = HashSet::new();
        for entry in entries {
            let mut record = TerminalRecord::from_entry(entry);
            while !ids.insert(record.id.clone()) {
                record.id = uuid::Uuid::new_v4().to_string();
            }
            self.records.push(record);
        }
        self.active_id = self.records.first().map(|r| r.id.clone());

        for index in 0..self.records.len() {
            if self.records[index].status == TerminalStatus::Idle {
                self.request_spawn(index);
            }
        }
    }

    /// Stop a terminal's containers and process and remove it.
    ///
    /// If it was active, the previous terminal (or the new first one) becomes active.
    /// Returns `false` if the id is unknown.
    pub fn close_tab(&mut self, id: &str) -> bool {
        let Some(index) = self.position(id) else {
            debug!("Close requested for unknown terminal '{id}'");
            return false;
        };
        info!("Closing terminal '{}'", self.records[index].title);

        self.stop_containers_of(&self.records[index]);
        if let Err(e) = self.kill_process(id) {
            warn!("Failed to kill process '{id}': {e}");
        }
        self.records.remove(index);

        if self.active_id.as_deref() == Some(id) {
            self.active_id = self
                .records
                .get(index.saturating_sub(1))
                .map(|r| r.id.clone());
        }
        true
    }

    /// Restart a terminal from its original command wrapped with its refresh steps.
    ///
    /// Returns `None` if the terminal no longer exists or has no process to restart.
    pub fn refresh_tab(&mut self, id: &str, inputs: &EvalInputs<'_>) -> Option<&TerminalRecord> {
        let Some(index) = self.position(id) else {
            debug!("Refresh requested for unknown terminal '{id}'");
            return None;
        };
        if self.records[index].is_config_error() {
            debug!("Terminal '{id}' has no command to refresh");
            return None;
        }

        let record = &self.records[index];
        info!("Refreshing terminal '{}'", record.title);
        self.stop_containers_of(record);
        let command = match &record.refresh_config {
            Some(refresh) => refresh.wrap(record.original_command(), inputs, &record.section_id),
            None => record.original_command().to_string(),
        };

        // The old process must be gone before the id is reused
        if let Err(e) = self.kill_process(id) {
            warn!("Failed to kill process '{id}' before refresh: {e}");
        }

        let record = &mut self.records[index];
        record.status = TerminalStatus::PendingSpawn;
        record.command = command;
        record.refresh_count += 1;
        record.kill_requested = false;
        record.clear_error();

        self.request_spawn(index);
        self.records.get(index)
    }

    /// Kill every terminal's process and stop the union of their containers once.
    pub fn kill_all_terminals(&mut self) -> TeardownReport {
        if self.records.is_empty() {
            return TeardownReport::default();
        }

        let mut seen = HashSet::new();
        let containers: Vec<String> = self
            .records
            .iter()
            .flat_map(|r| r.associated_containers.iter())
            .filter(|name| seen.insert(name.as_str()))
            .cloned()
            .collect();
        info!(
            "Killing {} terminals and {} containers",
            self.records.len(),
            containers.len()
        );

        let mut kills = Vec::with_capacity(self.records.len());
        for index in 0..self.records.len() {
            self.records[index].kill_requested = true;
            let id = self.records[index].id.clone();
            let error = self.kill_process(&id).err().map(|e| {
                warn!("Failed to kill process '{id}': {e}");
                e.to_string()
            });
            kills.push(KillResult {
                terminal_id: id,
                error,
            });
        }

        let containers = (!containers.is_empty()).then(|| {
            let report = self.containers.stop_containers(&containers);
            for failure in report.failures() {
                warn!(
                    "Container '{}' did not stop: {}",
                    failure.name,
                    failure.message.as_deref().unwrap_or("unknown error")
                );
            }
            report
        });

        TeardownReport { kills, containers }
    }

    /// Forget every terminal without touching processes or containers
    pub fn clear_tabs(&mut self) {
        debug!("Clearing {} terminals", self.records.len());
        self.records.clear();
        self.active_id = None;
    }

    /// Resize every live terminal and use `size` for future spawns
    pub fn resize_all(&mut self, size: TerminalSize) {
        self.size = size;
        for record in &self.records {
            if matches!(
                record.status,
                TerminalStatus::Running | TerminalStatus::PendingSpawn
            ) && let Err(e) = self.backend.resize(&record.id, size)
            {
                debug!("Failed to resize terminal '{}': {e}", record.id);
            }
        }
    }

    /// Apply a backend notification. Returns `true` if a record changed.
    ///
    /// Events for removed terminals, or from a process that a refresh has since
    /// replaced, are ignored.
    pub fn handle_process_event(&mut self, event: &ProcessEvent) -> bool {
        let (id, generation) = match event {
            ProcessEvent::Output { .. } => return false,
            ProcessEvent::Started {
                terminal_id,
                generation,
            }
            | ProcessEvent::Ended {
                terminal_id,
                generation,
                ..
            } => (terminal_id, *generation),
        };
        let Some(record) = self.records.iter_mut().find(|r| r.id == *id) else {
            debug!("Ignoring event for unknown terminal '{id}'");
            return false;
        };
        if record.refresh_count != generation {
            debug!(
                "Ignoring stale event for terminal '{id}' (generation {generation}, current {})",
                record.refresh_count
            );
            return false;
        }

        match event {
            ProcessEvent::Started { .. } => {
                if !matches!(
                    record.status,
                    TerminalStatus::Idle | TerminalStatus::PendingSpawn
                ) {
                    return false;
                }
                record.status = TerminalStatus::Running;
            }
            ProcessEvent::Ended {
                exit_code, signal, ..
            } => {
                if record.status.is_settled() {
                    return false;
                }
                record.exit_code = Some(*exit_code);
                if record.kill_requested || signal.is_some() {
                    record.status = TerminalStatus::Stopped;
                } else if *exit_code == 0 {
                    record.status = TerminalStatus::Done;
                } else {
                    record.fail(
                        ErrorKind::Process,
                        format!("Process exited with code {exit_code}"),
                    );
                }
                info!(
                    "Terminal '{}' finished: {:?} (exit code {exit_code})",
                    record.title, record.status
                );
            }
            ProcessEvent::Output { .. } => return false,
        }
        true
    }
}
