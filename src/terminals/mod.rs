//! Terminal lifecycle management
//!
//! A [`TerminalManager`] keeps one [`TerminalRecord`] per generated command entry and drives
//! each record's status from the [`ProcessEvent`]s its [`ProcessBackend`] reports. Containers
//! tied to a terminal are stopped through a [`ContainerRuntime`] when the terminal is closed,
//! refreshed or torn down.

pub mod backend;
pub mod containers;
pub mod manager;
pub mod record;
pub mod registry;

pub use backend::{BackendError, ProcessBackend, ProcessEvent, SpawnRequest, TerminalSize};
pub use containers::{ContainerError, ContainerRuntime, ContainerStopResult, DockerCli, StopReport};
pub use manager::{KillResult, TeardownReport, TerminalManager};
pub use record::{ErrorKind, TerminalRecord, TerminalStatus};
pub use registry::TerminalRegistry;
