use serde::{Deserialize, Serialize};

use super::definition::RefreshConfig;

/// Message used when an enabled section has no qualifying definition
pub const NO_SUITABLE_COMMAND: &str = "no suitable command found";

/// A fully resolved command, ready to be opened in a terminal
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSpec {
    pub section_id: String,
    pub command: String,
    pub command_definition_id: String,
    pub is_sub_section_command: bool,
    pub associated_containers: Vec<String>,
    pub refresh_config: Option<RefreshConfig>,
    pub tab_title: String,
}

/// An enabled section for which no command could be generated
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigIssue {
    pub section_id: String,
    pub message: String,
}

/// One entry of the generated command list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CommandEntry {
    Command(CommandSpec),
    Error(ConfigIssue),
}

impl CommandEntry {
    #[must_use]
    pub fn section_id(&self) -> &str {
        match self {
            CommandEntry::Command(spec) => &spec.section_id,
            CommandEntry::Error(issue) => &issue.section_id,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, CommandEntry::Error(_))
    }

    #[must_use]
    pub fn as_command(&self) -> Option<&CommandSpec> {
        match self {
            CommandEntry::Command(spec) => Some(spec),
            CommandEntry::Error(_) => None,
        }
    }
}

impl From<CommandSpec> for CommandEntry {
    fn from(spec: CommandSpec) -> Self {
        CommandEntry::Command(spec)
    }
}

impl From<ConfigIssue> for CommandEntry {
    fn from(issue: ConfigIssue) -> Self {
        CommandEntry::Error(issue)
    }
}
