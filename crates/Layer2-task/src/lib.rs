//! # dockashell-task
//!
//! Sandboxed execution engine for DockaShell.
//! Runs agent commands, patches and file writes inside per-project Docker
//! containers and records every action in the project's trace log.
//!
//! ## Components
//!
//! - `runtime` - `ContainerRuntime` seam and the bollard-backed `DockerRuntime`
//! - `container` - container lifecycle (`dockashell-<project>`)
//! - `executor` - execution engine, timeout race, output capture, shell policy
//! - `gate` - policy check in front of command execution
//! - `manager` - `ProjectManager`, the exposed tool surface

pub mod container;
pub mod executor;
pub mod gate;
pub mod manager;
pub mod runtime;

#[cfg(test)]
mod testing;

// Lifecycle
pub use container::{
    build_spec, container_name, ContainerManager, ContainerStatus, ProjectStatus, StartResult,
    StartStatus, StopResult, StopStatus,
};

// Execution
pub use executor::{
    EngineConfig, ExecOptions, ExecutionEngine, ExecutionResult, PolicyResult, ShellPolicy,
};
pub use gate::PolicyGate;
pub use manager::ProjectManager;

// Runtime
pub use runtime::{
    ContainerInfo, ContainerRuntime, ContainerSpec, DockerRuntime, ExecHandle, ExecOutput,
    ExecRequest, ExecState, MountInfo, MountMode,
};
