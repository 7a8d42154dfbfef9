//! Core implementation of termplan
//!
//! termplan turns a two-level tree of project sections and the user's per-section
//! configuration into concrete shell commands, then runs each command in a managed
//! terminal. Commands come from a catalogue of definitions whose conditions are
//! matched against the configuration; templates are assembled with conditional
//! modifiers written in a small expression language.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::commands::definition::CommandDefinition;
use crate::commands::generate::{GenerateOptions, Generation, generate, generate_with_report};
use crate::commands::spec::CommandEntry;
use crate::condition::EvalInputs;
use crate::config_file::{ConfigError, ProjectFile, StateFile};
use crate::sections::{AttachState, ConfigTree, DropdownValues, SectionTree};

pub mod commands;
pub mod condition;
pub mod config_file;
pub mod logger;
pub mod pty;
pub mod sections;
pub mod terminals;
pub mod theme;

/// The user's current selections
#[derive(Debug, Clone, Default)]
pub struct ProjectState {
    pub config: ConfigTree,
    pub attach_state: AttachState,
    pub dropdowns: DropdownValues,
    pub show_test_sections: bool,
}

impl From<StateFile> for ProjectState {
    fn from(state: StateFile) -> Self {
        Self {
            config: state.config.into(),
            attach_state: AttachState::new(state.attach_state, state.attach_warnings),
            dropdowns: state.dropdowns,
            show_test_sections: state.show_test_sections,
        }
    }
}

impl ProjectState {
    #[must_use]
    pub fn inputs(&self) -> EvalInputs<'_> {
        EvalInputs::new(&self.config, &self.attach_state, &self.dropdowns)
    }
}

/// A loaded and validated project
#[derive(Debug, Clone)]
pub struct Project {
    pub sections: SectionTree,
    pub definitions: Vec<CommandDefinition>,
    pub state: ProjectState,
    /// Directory commands run from
    pub cwd: PathBuf,
    pub config_path: PathBuf,
    pub state_path: Option<PathBuf>,
}

impl Project {
    #[must_use]
    pub fn options(&self) -> GenerateOptions<'_> {
        GenerateOptions {
            attach_state: &self.state.attach_state,
            definitions: &self.definitions,
            section_tree: &self.sections,
            show_test_sections: self.state.show_test_sections,
        }
    }

    /// Generate the command list for the current state
    #[must_use]
    pub fn generate(&self) -> Vec<CommandEntry> {
        generate(&self.state.config, &self.state.dropdowns, &self.options())
    }

    /// Generate the command list together with any overlapping definitions
    #[must_use]
    pub fn generate_with_report(&self) -> Generation {
        generate_with_report(&self.state.config, &self.state.dropdowns, &self.options())
    }

    /// Attached sections flagged with an attach warning, as `(id, title)`
    #[must_use]
    pub fn attach_warnings(&self) -> Vec<(&str, &str)> {
        let attach = &self.state.attach_state;
        attach
            .attached()
            .iter()
            .filter(|(id, attached)| **attached && attach.has_warning(id))
            .map(|(id, _)| (id.as_str(), self.sections.title_of(id)))
            .collect()
    }

    /// Files whose changes should trigger a reload
    #[must_use]
    pub fn watched_files(&self) -> Vec<&Path> {
        std::iter::once(self.config_path.as_path())
            .chain(self.state_path.as_deref())
            .collect()
    }
}

/// Load a project file (or auto-detect one) and its state.
///
/// The state comes from `state_file` when given, otherwise from the project file's
/// inline `state`, otherwise it is empty.
///
/// # Errors
///
/// Returns `ConfigError` if a file is not found or cannot be parsed, or if the
/// project contains duplicate ids or empty command templates.
pub fn load_project(
    config_file: Option<&str>,
    state_file: Option<&str>,
) -> Result<Project, ConfigError> {
    let config_path = match config_file {
        Some(file) => {
            let config_path = PathBuf::from(file);
            if !config_path.exists() {
                return Err(ConfigError::ConfigNotFound(config_path));
            }
            config_path
        }
        None => ProjectFile::find_config()?,
    };
    let cwd = config_path
        .parent()
        .map(|p| {
            if p.as_os_str().is_empty() {
                PathBuf::from(".")
            } else {
                p.to_path_buf()
            }
        })
        .ok_or_else(|| ConfigError::ConfigNotFound(config_path.clone()))?;
    debug!(
        "Loading project from {} (cwd: {})",
        config_path.display(),
        cwd.display()
    );

    let parsed = ProjectFile::from_file(&config_path)?;
    validate_version(&parsed.termplan_version);

    let state_path = state_file.map(PathBuf::from);
    let state = match &state_path {
        Some(path) => StateFile::from_file(path)?,
        None => parsed.state.unwrap_or_default(),
    };

    let project = Project {
        sections: SectionTree::new(parsed.sections),
        definitions: parsed.commands,
        state: state.into(),
        cwd,
        config_path,
        state_path,
    };
    validate_project(&project)?;
    Ok(project)
}

/// Warn if the project's `termplan_version` doesn't match the binary version
fn validate_version(project_version: &str) {
    let binary_version = env!("CARGO_PKG_VERSION");
    if project_version != binary_version {
        warn!(
            "Project file was written for termplan {project_version}, running {binary_version}"
        );
    }
}

/// Validate the section tree and the command catalogue
///
/// # Errors
///
/// Returns `ConfigError` on duplicate ids or empty templates.
pub fn validate_project(project: &Project) -> Result<(), ConfigError> {
    check_duplicate_sections(&project.sections)?;
    check_duplicate_definitions(&project.definitions)?;
    check_empty_templates(&project.definitions)?;
    check_orphans(&project.sections, &project.definitions);
    Ok(())
}

fn check_duplicate_sections(tree: &SectionTree) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for section in &tree.sections {
        if !seen.insert(section.id.as_str()) {
            return Err(ConfigError::DuplicateId(section.id.clone()));
        }
        for sub in &section.sub_sections {
            if !seen.insert(sub.id.as_str()) {
                return Err(ConfigError::DuplicateId(sub.id.clone()));
            }
        }
    }
    Ok(())
}

fn check_duplicate_definitions(definitions: &[CommandDefinition]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for (index, definition) in definitions.iter().enumerate() {
        let id = definition.resolved_id(index);
        if !seen.insert(id.clone()) {
            return Err(ConfigError::DuplicateId(id));
        }
    }
    Ok(())
}

fn check_empty_templates(definitions: &[CommandDefinition]) -> Result<(), ConfigError> {
    for (index, definition) in definitions.iter().enumerate() {
        if definition.command.base.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Command definition '{}' has an empty base command",
                definition.resolved_id(index)
            )));
        }
    }
    Ok(())
}

fn check_orphans(tree: &SectionTree, definitions: &[CommandDefinition]) {
    for (index, definition) in definitions.iter().enumerate() {
        if tree.find(&definition.section_id).is_none() {
            warn!(
                "Command definition '{}' refers to unknown section '{}'",
                definition.resolved_id(index),
                definition.section_id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::definition::CommandTemplate;
    use crate::sections::{SectionDefinition, SubSectionDefinition};

    fn make_section(id: &str, subs: &[&str]) -> SectionDefinition {
        SectionDefinition {
            id: id.to_string(),
            title: id.to_string(),
            sub_sections: subs
                .iter()
                .map(|s| SubSectionDefinition {
                    id: (*s).to_string(),
                    title: (*s).to_string(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn make_definition(id: Option<&str>, section_id: &str, base: &str) -> CommandDefinition {
        CommandDefinition {
            id: id.map(str::to_string),
            section_id: section_id.to_string(),
            command: CommandTemplate {
                base: base.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn make_project(sections: Vec<SectionDefinition>, definitions: Vec<CommandDefinition>) -> Project {
        Project {
            sections: SectionTree::new(sections),
            definitions,
            state: ProjectState::default(),
            cwd: PathBuf::from("."),
            config_path: PathBuf::from(".termplan.yaml"),
            state_path: None,
        }
    }

    #[test]
    fn test_duplicate_section_id_detection() {
        let project = make_project(
            vec![make_section("api", &["auth"]), make_section("web", &["auth"])],
            vec![],
        );
        match validate_project(&project).unwrap_err() {
            ConfigError::DuplicateId(id) => assert_eq!(id, "auth"),
            other => panic!("Expected DuplicateId, got: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_resolved_definition_ids() {
        // the second definition's default id collides with an explicit one
        let project = make_project(
            vec![make_section("api", &[])],
            vec![
                make_definition(Some("api-1"), "api", "a"),
                make_definition(None, "api", "b"),
            ],
        );
        match validate_project(&project).unwrap_err() {
            ConfigError::DuplicateId(id) => assert_eq!(id, "api-1"),
            other => panic!("Expected DuplicateId, got: {other:?}"),
        }
    }

    #[test]
    fn test_empty_base_rejected() {
        let project = make_project(
            vec![make_section("api", &[])],
            vec![make_definition(Some("serve"), "api", "  ")],
        );
        assert!(matches!(
            validate_project(&project),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_orphans_are_not_errors() {
        let project = make_project(
            vec![make_section("api", &[])],
            vec![make_definition(None, "gone", "x")],
        );
        assert!(validate_project(&project).is_ok());
    }

    #[test]
    fn test_attach_warnings_for_attached_sections_only() {
        let mut project = make_project(
            vec![make_section("api", &["worker"]), make_section("web", &[])],
            vec![],
        );
        project.state.attach_state = AttachState::new(
            [("api", true), ("web", false), ("worker", true)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            [("api", true), ("web", true), ("gone", true)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        );
        assert_eq!(project.attach_warnings(), vec![("api", "api")]);

        project.sections.sections[0].title = "API".to_string();
        assert_eq!(project.attach_warnings(), vec![("api", "API")]);
        project.state.attach_state = AttachState::default();
        assert!(project.attach_warnings().is_empty());
    }

    #[test]
    fn test_watched_files() {
        let mut project = make_project(vec![], vec![]);
        assert_eq!(project.watched_files(), vec![Path::new(".termplan.yaml")]);
        project.state_path = Some(PathBuf::from("state.json"));
        assert_eq!(project.watched_files().len(), 2);
    }
}
