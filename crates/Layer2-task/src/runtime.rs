//! Container runtime seam
//!
//! `ContainerRuntime` is the narrow set of daemon calls the lifecycle
//! manager and execution engine need. `DockerRuntime` implements it over
//! the Docker Engine API (bollard).

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, LogOutput, StartContainerOptions,
    StopContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::exec::{CreateExecOptions, StartExecOptions, StartExecResults};
use bollard::models::{
    ContainerInspectResponse, HostConfig, PortBinding, PortMap, RestartPolicy,
    RestartPolicyNameEnum,
};
use bollard::Docker;
use dockashell_foundation::{Error, PortConfig, Result};
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Serialize;
use std::collections::HashMap;
use std::pin::Pin;
use tokio::io::AsyncWrite;
use tracing::debug;

/// Seconds the daemon waits before killing a container on stop
const STOP_GRACE_SECS: i64 = 10;

// ============================================================================
// Types
// ============================================================================

/// Everything needed to create a project container
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerSpec {
    pub image: String,
    /// `KEY=VALUE`
    pub env: Vec<String>,
    pub working_dir: String,
    pub entrypoint: Vec<String>,
    pub ports: Vec<PortConfig>,
    /// `host:container[:ro]`
    pub binds: Vec<String>,
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MountMode {
    Rw,
    Ro,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountInfo {
    pub source: String,
    pub destination: String,
    pub mode: MountMode,
}

/// Inspect snapshot of a container
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerInfo {
    pub id: String,
    pub running: bool,
    pub status: Option<String>,
    pub image: Option<String>,
    pub started_at: Option<String>,
    pub ports: Vec<PortConfig>,
    pub mounts: Vec<MountInfo>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecRequest {
    pub cmd: Vec<String>,
    pub working_dir: Option<String>,
    pub attach_stdin: bool,
}

/// One demultiplexed chunk of exec output
#[derive(Debug, Clone, PartialEq)]
pub enum ExecOutput {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
}

/// Attached exec instance
pub struct ExecHandle {
    pub id: String,
    pub output: BoxStream<'static, Result<ExecOutput>>,
    /// Present when the exec was created with `attach_stdin`
    pub input: Option<Pin<Box<dyn AsyncWrite + Send>>>,
}

impl std::fmt::Debug for ExecHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecHandle")
            .field("id", &self.id)
            .field("input", &self.input.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecState {
    pub exit_code: Option<i64>,
    pub pid: Option<i64>,
    pub running: bool,
}

// ============================================================================
// ContainerRuntime
// ============================================================================

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// `None` when the container does not exist
    async fn inspect(&self, name: &str) -> Result<Option<ContainerInfo>>;

    /// Returns the new container id, or `None` if the name is already taken
    async fn create(&self, name: &str, spec: &ContainerSpec) -> Result<Option<String>>;

    /// Starting a running container succeeds
    async fn start(&self, name: &str) -> Result<()>;

    /// `NotFound` when the container does not exist
    async fn stop(&self, name: &str) -> Result<()>;

    async fn exec(&self, container: &str, request: ExecRequest) -> Result<ExecHandle>;

    async fn inspect_exec(&self, exec_id: &str) -> Result<ExecState>;

    /// Fire-and-forget exec, output discarded
    async fn exec_detached(&self, container: &str, cmd: Vec<String>) -> Result<()>;
}

// ============================================================================
// DockerRuntime
// ============================================================================

/// Docker Engine API client
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

fn is_status(err: &BollardError, code: u16) -> bool {
    matches!(err, BollardError::DockerResponseServerError { status_code, .. } if *status_code == code)
}

impl DockerRuntime {
    /// Connect using `DOCKER_HOST` or the platform default socket
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| Error::daemon("connect", "docker", e))?;
        Ok(Self { docker })
    }

    pub fn from_client(docker: Docker) -> Self {
        Self { docker }
    }

    pub async fn ping(&self) -> Result<()> {
        self.docker
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| Error::daemon("ping", "docker", e))
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn inspect(&self, name: &str) -> Result<Option<ContainerInfo>> {
        match self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
        {
            Ok(response) => Ok(Some(container_info(response))),
            Err(e) if is_status(&e, 404) => Ok(None),
            Err(e) => Err(Error::daemon("inspect", name, e)),
        }
    }

    async fn create(&self, name: &str, spec: &ContainerSpec) -> Result<Option<String>> {
        let mut exposed_ports = HashMap::new();
        let mut port_bindings: PortMap = HashMap::new();
        for port in &spec.ports {
            let key = format!("{}/tcp", port.container);
            exposed_ports.insert(key.clone(), HashMap::new());
            port_bindings.insert(
                key,
                Some(vec![PortBinding {
                    host_ip: None,
                    host_port: Some(port.host.to_string()),
                }]),
            );
        }

        let config = Config {
            image: Some(spec.image.clone()),
            env: Some(spec.env.clone()),
            working_dir: Some(spec.working_dir.clone()),
            entrypoint: Some(spec.entrypoint.clone()),
            tty: Some(true),
            open_stdin: Some(true),
            exposed_ports: Some(exposed_ports),
            labels: Some(spec.labels.clone()),
            host_config: Some(HostConfig {
                binds: if spec.binds.is_empty() {
                    None
                } else {
                    Some(spec.binds.clone())
                },
                port_bindings: Some(port_bindings),
                auto_remove: Some(false),
                restart_policy: Some(RestartPolicy {
                    name: Some(RestartPolicyNameEnum::NO),
                    maximum_retry_count: None,
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: name.to_string(),
            ..Default::default()
        };

        match self.docker.create_container(Some(options), config).await {
            Ok(response) => {
                debug!(container = name, id = %response.id, "Container created");
                Ok(Some(response.id))
            }
            Err(e) if is_status(&e, 409) => Ok(None),
            Err(e) => Err(Error::daemon("create", name, e)),
        }
    }

    async fn start(&self, name: &str) -> Result<()> {
        match self
            .docker
            .start_container(name, None::<StartContainerOptions<String>>)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if is_status(&e, 304) => Ok(()),
            Err(e) => Err(Error::daemon("start", name, e)),
        }
    }

    async fn stop(&self, name: &str) -> Result<()> {
        let options = StopContainerOptions {
            t: STOP_GRACE_SECS,
        };
        match self.docker.stop_container(name, Some(options)).await {
            Ok(()) => Ok(()),
            Err(e) if is_status(&e, 304) => Ok(()),
            Err(e) if is_status(&e, 404) => Err(Error::NotFound(name.to_string())),
            Err(e) => Err(Error::daemon("stop", name, e)),
        }
    }

    async fn exec(&self, container: &str, request: ExecRequest) -> Result<ExecHandle> {
        let options = CreateExecOptions {
            cmd: Some(request.cmd),
            working_dir: request.working_dir,
            attach_stdin: Some(request.attach_stdin),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            tty: Some(false),
            ..Default::default()
        };

        let exec = self
            .docker
            .create_exec(container, options)
            .await
            .map_err(|e| Error::daemon("create exec in", container, e))?;

        let started = self
            .docker
            .start_exec(
                &exec.id,
                Some(StartExecOptions {
                    detach: false,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| Error::daemon("start exec in", container, e))?;

        match started {
            StartExecResults::Attached { output, input } => {
                let exec_id = exec.id.clone();
                let output = output
                    .filter_map(move |item| {
                        let exec_id = exec_id.clone();
                        async move {
                            match item {
                                Ok(LogOutput::StdOut { message })
                                | Ok(LogOutput::Console { message }) => {
                                    Some(Ok(ExecOutput::Stdout(message.to_vec())))
                                }
                                Ok(LogOutput::StdErr { message }) => {
                                    Some(Ok(ExecOutput::Stderr(message.to_vec())))
                                }
                                Ok(LogOutput::StdIn { .. }) => None,
                                Err(e) => Some(Err(Error::daemon("read exec", &exec_id, e))),
                            }
                        }
                    })
                    .boxed();

                Ok(ExecHandle {
                    id: exec.id,
                    output,
                    input: if request.attach_stdin { Some(input) } else { None },
                })
            }
            StartExecResults::Detached => Err(Error::Daemon(format!(
                "exec {} in {} started detached",
                exec.id, container
            ))),
        }
    }

    async fn inspect_exec(&self, exec_id: &str) -> Result<ExecState> {
        let inspect = self
            .docker
            .inspect_exec(exec_id)
            .await
            .map_err(|e| Error::daemon("inspect exec", exec_id, e))?;

        Ok(ExecState {
            exit_code: inspect.exit_code,
            pid: inspect.pid,
            running: inspect.running.unwrap_or(false),
        })
    }

    async fn exec_detached(&self, container: &str, cmd: Vec<String>) -> Result<()> {
        let options = CreateExecOptions {
            cmd: Some(cmd),
            attach_stdout: Some(false),
            attach_stderr: Some(false),
            ..Default::default()
        };
        let exec = self
            .docker
            .create_exec(container, options)
            .await
            .map_err(|e| Error::daemon("create exec in", container, e))?;

        self.docker
            .start_exec(
                &exec.id,
                Some(StartExecOptions {
                    detach: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| Error::daemon("start exec in", container, e))?;
        Ok(())
    }
}

// ============================================================================
// Inspect payload extraction
// ============================================================================

fn container_info(response: ContainerInspectResponse) -> ContainerInfo {
    let ports = extract_ports(&response);
    let mounts = extract_mounts(&response);
    let state = response.state.unwrap_or_default();

    ContainerInfo {
        id: response.id.unwrap_or_default(),
        running: state.running.unwrap_or(false),
        status: state.status.map(|s| s.to_string()),
        image: response.config.and_then(|c| c.image),
        started_at: state.started_at,
        ports,
        mounts,
    }
}

fn port_pairs(map: &PortMap) -> Vec<PortConfig> {
    let mut pairs = Vec::new();
    for (key, bindings) in map {
        let Some(container) = key.split('/').next().and_then(|p| p.parse::<u16>().ok()) else {
            continue;
        };
        for binding in bindings.iter().flatten() {
            if let Some(host) = binding
                .host_port
                .as_deref()
                .and_then(|p| p.parse::<u16>().ok())
            {
                let pair = PortConfig { host, container };
                if !pairs.contains(&pair) {
                    pairs.push(pair);
                }
            }
        }
    }
    pairs.sort_by_key(|p| (p.container, p.host));
    pairs
}

/// Published ports; a stopped container only has its host-config bindings
pub fn extract_ports(response: &ContainerInspectResponse) -> Vec<PortConfig> {
    let live = response
        .network_settings
        .as_ref()
        .and_then(|n| n.ports.as_ref())
        .map(port_pairs)
        .unwrap_or_default();
    if !live.is_empty() {
        return live;
    }

    response
        .host_config
        .as_ref()
        .and_then(|h| h.port_bindings.as_ref())
        .map(port_pairs)
        .unwrap_or_default()
}

pub fn extract_mounts(response: &ContainerInspectResponse) -> Vec<MountInfo> {
    response
        .mounts
        .iter()
        .flatten()
        .map(|m| MountInfo {
            source: m.source.clone().unwrap_or_default(),
            destination: m.destination.clone().unwrap_or_default(),
            mode: if m.rw == Some(false) {
                MountMode::Ro
            } else {
                MountMode::Rw
            },
        })
        .collect()
}
