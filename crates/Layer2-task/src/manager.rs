//! Project Manager - the tool surface exposed to agents
//!
//! Resolves project names through `ProjectStore`, owns the process-lifetime
//! trace registry and container handle cache, and routes every operation:
//!
//! ```text
//! run_command ──▶ PolicyGate ──▶ ExecutionEngine ──▶ ContainerRuntime
//! apply_patch ───────────────────▶ ExecutionEngine
//! write_file  ───────────────────▶ ExecutionEngine
//! start/stop/status ─────────────▶ ContainerManager
//! read_traces/write_trace ───────▶ TraceRegistry
//! ```

use crate::container::{ContainerManager, ProjectStatus, StartResult, StopResult};
use crate::executor::{EngineConfig, ExecOptions, ExecutionEngine, ExecutionResult};
use crate::gate::PolicyGate;
use crate::runtime::{ContainerRuntime, DockerRuntime};
use dockashell_foundation::{
    validate_project_name, Error, GlobalConfig, NewTrace, NoteType, ProjectStore, Result,
    TraceEntry, TraceQuery, TraceRecord, TraceRegistry,
};
use std::sync::Arc;
use tracing::{debug, info};

pub struct ProjectManager {
    projects: ProjectStore,
    traces: Arc<TraceRegistry>,
    containers: Arc<ContainerManager>,
    gate: PolicyGate,
}

impl ProjectManager {
    pub fn new(
        projects: ProjectStore,
        runtime: Arc<dyn ContainerRuntime>,
        global: &GlobalConfig,
    ) -> Self {
        let traces = Arc::new(TraceRegistry::from_global(projects.clone(), global));
        let containers = Arc::new(ContainerManager::new(runtime, traces.clone()));
        let engine = Arc::new(ExecutionEngine::new(
            containers.clone(),
            traces.clone(),
            EngineConfig::from_global(global),
        ));

        Self {
            projects,
            traces,
            containers,
            gate: PolicyGate::new(engine),
        }
    }

    /// Home from the environment, local Docker daemon
    pub fn connect() -> Result<Self> {
        let projects = ProjectStore::from_env()?;
        let global = projects.load_global()?;
        let runtime = DockerRuntime::connect()?;

        info!(
            home = %projects.home().display(),
            session_timeout = %global.logging.traces.session_timeout,
            "DockaShell initialized"
        );
        Ok(Self::new(projects, Arc::new(runtime), &global))
    }

    pub fn projects(&self) -> &ProjectStore {
        &self.projects
    }

    fn engine(&self) -> &ExecutionEngine {
        self.gate.engine()
    }

    pub fn list_projects(&self) -> Result<Vec<String>> {
        self.projects.list_projects()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub async fn start_project(&self, name: &str) -> Result<StartResult> {
        let project = self.projects.load_project(name)?;
        info!("Starting project {}", name);
        self.containers.start(&project).await
    }

    /// Only the name is validated; a project without config can still be stopped
    pub async fn stop_project(&self, name: &str) -> Result<StopResult> {
        validate_project_name(name)?;
        info!("Stopping project {}", name);
        self.containers.stop(name).await
    }

    pub async fn project_status(&self, name: &str) -> Result<ProjectStatus> {
        validate_project_name(name)?;
        self.containers.status(name).await
    }

    // ========================================================================
    // Execution
    // ========================================================================

    pub async fn run_command(
        &self,
        name: &str,
        command: &str,
        options: ExecOptions,
    ) -> Result<ExecutionResult> {
        let project = self.projects.load_project(name)?;
        debug!(project = name, command, "run_command");
        self.gate.run_command(&project, command, options).await
    }

    pub async fn apply_patch(
        &self,
        name: &str,
        patch: &str,
        options: ExecOptions,
    ) -> Result<ExecutionResult> {
        let project = self.projects.load_project(name)?;
        debug!(project = name, patch_len = patch.len(), "apply_patch");
        self.engine().apply_patch(&project, patch, options).await
    }

    pub async fn write_file(
        &self,
        name: &str,
        path: &str,
        content: &str,
        overwrite: bool,
        options: ExecOptions,
    ) -> Result<ExecutionResult> {
        let project = self.projects.load_project(name)?;
        debug!(project = name, path, overwrite, "write_file");
        self.engine()
            .write_file(&project, path, content, overwrite, options)
            .await
    }

    // ========================================================================
    // Traces
    // ========================================================================

    pub async fn read_traces(&self, name: &str, query: &TraceQuery) -> Result<Vec<TraceRecord>> {
        validate_project_name(name)?;
        self.traces.read(name, query).await
    }

    /// Append a user / agent / summary note
    pub async fn write_trace(
        &self,
        name: &str,
        note_type: NoteType,
        text: &str,
    ) -> Result<TraceEntry> {
        validate_project_name(name)?;
        if text.trim().is_empty() {
            return Err(Error::invalid_input("Trace text must not be empty"));
        }
        self.traces.record(name, NewTrace::note(note_type, text)).await
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    /// Clear handle caches and close every trace session. Containers keep running.
    pub async fn shutdown(&self) {
        self.containers.clear_cache();
        self.traces.close_all().await;
        info!("DockaShell shut down");
    }
}

impl std::fmt::Debug for ProjectManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectManager")
            .field("home", &self.projects.home())
            .finish()
    }
}
