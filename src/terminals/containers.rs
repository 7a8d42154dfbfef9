use std::process::Command as ProcessCommand;

use log::{debug, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Unable to run `{program}` for container '{name}': {source}")]
    Io {
        program: String,
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Container runtime failed for '{name}': {message}")]
    Runtime { name: String, message: String },
}

/// Outcome of stopping one container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStopResult {
    pub name: String,
    pub success: bool,
    pub message: Option<String>,
}

/// Outcome of a batched stop request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopReport {
    pub success: bool,
    pub results: Vec<ContainerStopResult>,
}

impl StopReport {
    #[must_use]
    pub fn from_results(results: Vec<ContainerStopResult>) -> Self {
        Self {
            success: results.iter().all(|r| r.success),
            results,
        }
    }

    #[must_use]
    pub fn failures(&self) -> Vec<&ContainerStopResult> {
        self.results.iter().filter(|r| !r.success).collect()
    }
}

/// Stops and inspects named containers
pub trait ContainerRuntime: Send + Sync {
    /// Stop every named container. A failure for one name never prevents the rest.
    fn stop_containers(&self, names: &[String]) -> StopReport;

    /// Current status of a container, e.g. `running` or `exited`.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError` if the runtime cannot be queried.
    fn container_status(&self, name: &str) -> Result<String, ContainerError>;
}

/// Container runtime backed by the `docker` command line
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerCli {
    #[must_use]
    pub fn new() -> Self {
        Self::with_program("docker")
    }

    /// Use a different executable with a docker-compatible CLI (e.g. `podman`)
    #[must_use]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, name: &str, args: &[&str]) -> Result<String, ContainerError> {
        let output = ProcessCommand::new(&self.program)
            .args(args)
            .output()
            .map_err(|source| ContainerError::Io {
                program: self.program.clone(),
                name: name.to_string(),
                source,
            })?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(ContainerError::Runtime {
                name: name.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

impl ContainerRuntime for DockerCli {
    fn stop_containers(&self, names: &[String]) -> StopReport {
        let results = names
            .iter()
            .map(|name| {
                debug!("Stopping container '{name}'");
                match self.run(name, &["stop", name]) {
                    Ok(_) => ContainerStopResult {
                        name: name.clone(),
                        success: true,
                        message: None,
                    },
                    Err(e) => {
                        warn!("Failed to stop container '{name}': {e}");
                        ContainerStopResult {
                            name: name.clone(),
                            success: false,
                            message: Some(e.to_string()),
                        }
                    }
                }
            })
            .collect();
        StopReport::from_results(results)
    }

    fn container_status(&self, name: &str) -> Result<String, ContainerError> {
        self.run(name, &["inspect", "-f", "{{.State.Status}}", name])
    }
}
