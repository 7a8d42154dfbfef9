//! Project and state file handling for termplan

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::commands::definition::CommandDefinition;
use crate::sections::SectionDefinition;

/// Errors that can occur while loading a project
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No project file found in current directory or its parents: {0}")]
    ConfigNotFound(PathBuf),
    #[error("Unable to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unknown working directory: {0}")]
    UnknownWorkingDirectory(String),
    #[error("Unable to parse YAML file {path}: {source}")]
    Yaml {
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("Unable to parse JSON file {path}: {source}")]
    Json {
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("Duplicate ID in project: {0}")]
    DuplicateId(String),
    #[error("Invalid project: {0}")]
    Validation(String),
}

/// User state: section configuration, attach toggles and dropdown selections
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateFile {
    #[serde(default)]
    pub config: Map<String, Value>,
    #[serde(default)]
    pub attach_state: BTreeMap<String, bool>,
    #[serde(default)]
    pub attach_warnings: BTreeMap<String, bool>,
    #[serde(default)]
    pub dropdowns: Map<String, Value>,
    #[serde(default)]
    pub show_test_sections: bool,
}

/// Root structure of a project file
#[derive(Debug, Deserialize, Serialize)]
pub struct ProjectFile {
    pub termplan_version: String,
    #[serde(default)]
    pub sections: Vec<SectionDefinition>,
    #[serde(default)]
    pub commands: Vec<CommandDefinition>,
    #[serde(default)]
    pub state: Option<StateFile>,
}

/// List of supported project file names
const FILENAMES: [&str; 3] = [".termplan.json", ".termplan.yaml", ".termplan.yml"];

/// Parse a YAML or JSON file, chosen by extension
fn parse_file<T: DeserializeOwned>(file: &Path) -> Result<T, ConfigError> {
    let contents = std::fs::read_to_string(file).map_err(|source| ConfigError::Read {
        path: file.to_path_buf(),
        source,
    })?;
    if file.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&contents).map_err(|e| ConfigError::Json {
            source: e,
            path: file.to_path_buf(),
        })
    } else {
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Yaml {
            source: e,
            path: file.to_path_buf(),
        })
    }
}

impl ProjectFile {
    /// Loads and parses a project file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the file cannot be read, or
    /// `ConfigError::Yaml`/`ConfigError::Json` if parsing fails.
    pub fn from_file(file: &Path) -> Result<ProjectFile, ConfigError> {
        parse_file(file)
    }

    /// Searches for a project file in the current directory and its parents.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownWorkingDirectory` if the cwd cannot be determined,
    /// or `ConfigError::ConfigNotFound` if no project file is found.
    pub fn find_config() -> Result<PathBuf, ConfigError> {
        let cwd = std::env::current_dir()
            .map_err(|e| ConfigError::UnknownWorkingDirectory(e.to_string()))?;
        Self::find_config_from(&cwd)
    }

    /// Searches for a project file in `start` and its parents.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigNotFound` if no project file is found.
    pub fn find_config_from(start: &Path) -> Result<PathBuf, ConfigError> {
        let mut path = start.to_path_buf();
        debug!("Searching for project file in {}", start.display());
        loop {
            for file in &FILENAMES {
                let config_path = path.join(file);
                if config_path.exists() {
                    info!("Found project file: {}", config_path.display());
                    return Ok(config_path);
                }
            }
            if !path.pop() {
                return Err(ConfigError::ConfigNotFound(start.to_path_buf()));
            }
        }
    }
}

impl StateFile {
    /// Loads and parses a state file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the file cannot be read, or
    /// `ConfigError::Yaml`/`ConfigError::Json` if parsing fails.
    pub fn from_file(file: &Path) -> Result<StateFile, ConfigError> {
        parse_file(file)
    }
}
