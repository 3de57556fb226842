//! Container lifecycle
//!
//! One container per project, named `dockashell-<project>`. Every operation
//! re-inspects the daemon; nothing here is a cached state machine.
//!
//! ```text
//! absent ──create──▶ created ──start──▶ running ◀──start── stopped
//!                                          └──────stop──────▶┘
//! ```

use crate::runtime::{ContainerInfo, ContainerRuntime, ContainerSpec, MountInfo};
use dockashell_foundation::trace::{NewTrace, TOOL_START, TOOL_STOP};
use dockashell_foundation::{Error, PortConfig, ProjectConfig, Result, TraceRegistry};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const CONTAINER_PREFIX: &str = "dockashell-";
pub const PROJECT_LABEL: &str = "dockashell.project";

/// Deterministic container name for a project
pub fn container_name(project: &str) -> String {
    format!("{}{}", CONTAINER_PREFIX, project)
}

/// Create spec for a project container
pub fn build_spec(project: &ProjectConfig) -> ContainerSpec {
    let mut labels = HashMap::new();
    labels.insert(PROJECT_LABEL.to_string(), project.name.clone());

    ContainerSpec {
        image: project.image.clone(),
        env: project.env_list(),
        working_dir: project.working_dir.clone(),
        entrypoint: vec![project.shell.clone()],
        ports: project.ports.clone(),
        binds: project.mounts.iter().map(|m| m.bind_spec()).collect(),
        labels,
    }
}

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartStatus {
    Started,
    AlreadyRunning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResult {
    pub container_id: String,
    pub status: StartStatus,
    pub image: String,
    pub ports: Vec<PortConfig>,
    pub mounts: Vec<MountInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopStatus {
    Stopped,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopResult {
    pub status: StopStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerStatus {
    Running,
    Stopped,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatus {
    pub status: ContainerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    pub ports: Vec<PortConfig>,
    pub mounts: Vec<MountInfo>,
}

impl ProjectStatus {
    fn not_found() -> Self {
        Self {
            status: ContainerStatus::NotFound,
            container_id: None,
            image: None,
            started_at: None,
            ports: Vec::new(),
            mounts: Vec::new(),
        }
    }
}

// ============================================================================
// ContainerManager
// ============================================================================

/// Creates, starts and stops project containers
pub struct ContainerManager {
    runtime: Arc<dyn ContainerRuntime>,
    traces: Arc<TraceRegistry>,
    /// project → container id, advisory only
    handles: RwLock<HashMap<String, String>>,
}

impl ContainerManager {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, traces: Arc<TraceRegistry>) -> Self {
        Self {
            runtime,
            traces,
            handles: RwLock::new(HashMap::new()),
        }
    }

    pub fn runtime(&self) -> &Arc<dyn ContainerRuntime> {
        &self.runtime
    }

    pub fn cached_id(&self, project: &str) -> Option<String> {
        self.handles.read().get(project).cloned()
    }

    /// Forget cached handles; containers keep running
    pub fn clear_cache(&self) {
        self.handles.write().clear();
    }

    fn remember(&self, project: &str, id: &str) {
        self.handles
            .write()
            .insert(project.to_string(), id.to_string());
    }

    /// Start (creating if needed) the project's container
    pub async fn start(&self, project: &ProjectConfig) -> Result<StartResult> {
        let name = container_name(&project.name);

        // second pass only after losing a create race
        for _ in 0..2 {
            match self.runtime.inspect(&name).await? {
                Some(info) if info.running => {
                    debug!(project = %project.name, "Container already running");
                    self.remember(&project.name, &info.id);
                    let result = self.start_result(project, info, StartStatus::AlreadyRunning);
                    self.trace_start(&project.name, &result, "already_running").await;
                    return Ok(result);
                }
                Some(_) => {
                    self.runtime.start(&name).await?;
                    return self.started(project, &name).await;
                }
                None => {
                    let spec = build_spec(project);
                    match self.runtime.create(&name, &spec).await? {
                        Some(id) => {
                            info!(project = %project.name, id = %id, image = %spec.image, "Container created");
                            self.runtime.start(&name).await?;
                            return self.started(project, &name).await;
                        }
                        None => {
                            debug!(project = %project.name, "Container name taken, re-inspecting");
                        }
                    }
                }
            }
        }

        Err(Error::Daemon(format!(
            "Container {} could not be created or found",
            name
        )))
    }

    async fn started(&self, project: &ProjectConfig, name: &str) -> Result<StartResult> {
        let info = self
            .runtime
            .inspect(name)
            .await?
            .ok_or_else(|| Error::Daemon(format!("Container {} vanished after start", name)))?;

        self.remember(&project.name, &info.id);
        let result = self.start_result(project, info, StartStatus::Started);
        info!(project = %project.name, id = %result.container_id, "Container started");

        self.trace_start(&project.name, &result, "started").await;
        Ok(result)
    }

    fn start_result(
        &self,
        project: &ProjectConfig,
        info: ContainerInfo,
        status: StartStatus,
    ) -> StartResult {
        StartResult {
            container_id: info.id,
            status,
            image: info.image.unwrap_or_else(|| project.image.clone()),
            ports: info.ports,
            mounts: info.mounts,
        }
    }

    /// Stop the project's container; an absent container is not an error
    pub async fn stop(&self, project: &str) -> Result<StopResult> {
        let name = container_name(project);
        self.handles.write().remove(project);

        let Some(info) = self.runtime.inspect(&name).await? else {
            self.trace_stop(project, None, "not_found").await;
            return Ok(StopResult {
                status: StopStatus::NotFound,
            });
        };

        if !info.running {
            debug!(project, "Container already stopped");
            self.trace_stop(project, Some(&info.id), "already_stopped").await;
            return Ok(StopResult {
                status: StopStatus::Stopped,
            });
        }

        match self.runtime.stop(&name).await {
            Ok(()) => {}
            Err(Error::NotFound(_)) => {
                self.trace_stop(project, Some(&info.id), "not_found").await;
                return Ok(StopResult {
                    status: StopStatus::NotFound,
                });
            }
            Err(e) => return Err(e),
        }
        info!(project, id = %info.id, "Container stopped");

        self.trace_stop(project, Some(&info.id), "stopped").await;
        Ok(StopResult {
            status: StopStatus::Stopped,
        })
    }

    pub async fn status(&self, project: &str) -> Result<ProjectStatus> {
        let name = container_name(project);
        let Some(info) = self.runtime.inspect(&name).await? else {
            return Ok(ProjectStatus::not_found());
        };

        Ok(ProjectStatus {
            status: if info.running {
                ContainerStatus::Running
            } else {
                ContainerStatus::Stopped
            },
            container_id: Some(info.id),
            image: info.image,
            started_at: info.started_at,
            ports: info.ports,
            mounts: info.mounts,
        })
    }

    /// Container name of a running project, or `NotRunning`
    pub async fn require_running(&self, project: &str) -> Result<String> {
        let name = container_name(project);
        match self.runtime.inspect(&name).await? {
            Some(info) if info.running => {
                self.remember(project, &info.id);
                Ok(name)
            }
            _ => Err(Error::NotRunning(project.to_string())),
        }
    }

    async fn trace_start(&self, project: &str, result: &StartResult, status: &str) {
        self.trace(
            project,
            NewTrace::execution(TOOL_START)
                .with("container_id", result.container_id.clone())
                .with("image", result.image.clone())
                .with_result(json!({ "status": status })),
        )
        .await;
    }

    async fn trace_stop(&self, project: &str, container_id: Option<&str>, status: &str) {
        let mut trace = NewTrace::execution(TOOL_STOP);
        if let Some(id) = container_id {
            trace = trace.with("container_id", id);
        }
        self.trace(project, trace.with_result(json!({ "status": status })))
            .await;
    }

    async fn trace(&self, project: &str, trace: NewTrace) {
        if let Err(e) = self.traces.record(project, trace).await {
            warn!(project, error = %e, "Failed to record lifecycle trace");
        }
    }
}

impl std::fmt::Debug for ContainerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerManager")
            .field("handles", &self.handles.read().len())
            .finish()
    }
}
