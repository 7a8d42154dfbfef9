use serde::Serialize;
use uuid::Uuid;

use crate::commands::definition::RefreshConfig;
use crate::commands::spec::CommandEntry;

/// Lifecycle state of a terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Idle,
    PendingSpawn,
    Running,
    Done,
    Error,
    Stopped,
}

impl TerminalStatus {
    /// Whether the terminal has reached a final state
    #[must_use]
    pub fn is_settled(self) -> bool {
        matches!(
            self,
            TerminalStatus::Done | TerminalStatus::Error | TerminalStatus::Stopped
        )
    }
}

/// Why a terminal is in the `Error` state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No command could be generated for the section
    Config,
    /// The backend refused the spawn request
    Spawn,
    /// The process exited unsuccessfully
    Process,
}

/// The manager's view of one terminal and its process
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalRecord {
    pub id: String,
    pub title: String,
    pub status: TerminalStatus,
    pub command: String,
    original_command: String,
    pub section_id: String,
    pub command_definition_id: Option<String>,
    pub associated_containers: Vec<String>,
    pub refresh_config: Option<RefreshConfig>,
    pub refresh_count: u32,
    pub error_type: Option<ErrorKind>,
    pub error_message: Option<String>,
    pub exit_code: Option<u32>,
    #[serde(skip)]
    pub(crate) kill_requested: bool,
}

impl TerminalRecord {
    /// Create a record with a fresh id from a generated entry
    #[must_use]
    pub fn from_entry(entry: CommandEntry) -> Self {
        let id = Uuid::new_v4().to_string();
        match entry {
            CommandEntry::Command(spec) => Self {
                id,
                title: spec.tab_title,
                status: TerminalStatus::Idle,
                original_command: spec.command.clone(),
                command: spec.command,
                section_id: spec.section_id,
                command_definition_id: Some(spec.command_definition_id),
                associated_containers: spec.associated_containers,
                refresh_config: spec.refresh_config,
                refresh_count: 0,
                error_type: None,
                error_message: None,
                exit_code: None,
                kill_requested: false,
            },
            CommandEntry::Error(issue) => Self {
                id,
                title: issue.section_id.clone(),
                status: TerminalStatus::Error,
                command: String::new(),
                original_command: String::new(),
                section_id: issue.section_id,
                command_definition_id: None,
                associated_containers: Vec::new(),
                refresh_config: None,
                refresh_count: 0,
                error_type: Some(ErrorKind::Config),
                error_message: Some(issue.message),
                exit_code: None,
                kill_requested: false,
            },
        }
    }

    /// The command as generated, before any refresh wrapping
    #[must_use]
    pub fn original_command(&self) -> &str {
        &self.original_command
    }

    /// Config errors have no process and are never spawned
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        self.error_type == Some(ErrorKind::Config)
    }

    pub(crate) fn fail(&mut self, kind: ErrorKind, message: String) {
        self.status = TerminalStatus::Error;
        self.error_type = Some(kind);
        self.error_message = Some(message);
    }

    pub(crate) fn clear_error(&mut self) {
        self.error_type = None;
        self.error_message = None;
        self.exit_code = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::spec::{CommandSpec, ConfigIssue};

    #[test]
    fn test_records_get_distinct_ids() {
        let spec = CommandSpec {
            section_id: "api".to_string(),
            command: "serve".to_string(),
            ..Default::default()
        };
        let a = TerminalRecord::from_entry(spec.clone().into());
        let b = TerminalRecord::from_entry(spec.into());
        assert_ne!(a.id, b.id);
        assert_eq!(a.original_command(), "serve");
        assert_eq!(a.status, TerminalStatus::Idle);
    }

    #[test]
    fn test_config_issue_starts_in_error() {
        let record = TerminalRecord::from_entry(
            ConfigIssue {
                section_id: "db".to_string(),
                message: "oops".to_string(),
            }
            .into(),
        );
        assert_eq!(record.status, TerminalStatus::Error);
        assert!(record.is_config_error());
        assert_eq!(record.error_message.as_deref(), Some("oops"));
        assert!(record.status.is_settled());
    }
}
