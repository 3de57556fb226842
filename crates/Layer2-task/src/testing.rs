//! In-memory `ContainerRuntime` for unit tests

use crate::container::ContainerManager;
use crate::executor::{EngineConfig, ExecutionEngine};
use crate::runtime::{
    ContainerInfo, ContainerRuntime, ContainerSpec, ExecHandle, ExecOutput, ExecRequest,
    ExecState,
};
use async_trait::async_trait;
use dockashell_foundation::{Error, ProjectStore, Result, TraceRegistry};
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

pub const FAKE_PID: i64 = 4242;

/// Scripted behaviour of the next exec
#[derive(Debug, Clone, Default)]
pub struct ExecScript {
    chunks: Vec<ExecOutput>,
    exit_code: i64,
    hang: bool,
    fail: Option<String>,
    unsettled: usize,
}

impl ExecScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stdout(mut self, text: &str) -> Self {
        self.chunks.push(ExecOutput::Stdout(text.as_bytes().to_vec()));
        self
    }

    pub fn stderr(mut self, text: &str) -> Self {
        self.chunks.push(ExecOutput::Stderr(text.as_bytes().to_vec()));
        self
    }

    pub fn exit(mut self, code: i64) -> Self {
        self.exit_code = code;
        self
    }

    /// Stream never ends after the scripted chunks
    pub fn hang(mut self) -> Self {
        self.hang = true;
        self
    }

    /// Exec-inspect reports `running` without an exit code `polls` times
    pub fn settle_after(mut self, polls: usize) -> Self {
        self.unsettled = polls;
        self
    }

    /// Stream fails with a daemon error after the scripted chunks
    pub fn fail(mut self, message: &str) -> Self {
        self.fail = Some(message.to_string());
        self
    }
}

/// A recorded exec call
#[derive(Debug, Clone)]
pub struct ExecCall {
    pub container: String,
    pub cmd: Vec<String>,
    pub working_dir: Option<String>,
    stdin: Arc<Mutex<Vec<u8>>>,
    stdin_closed: Arc<AtomicBool>,
}

impl ExecCall {
    pub fn stdin_text(&self) -> String {
        String::from_utf8_lossy(&self.stdin.lock()).into_owned()
    }

    pub fn stdin_closed(&self) -> bool {
        self.stdin_closed.load(Ordering::SeqCst)
    }
}

struct CaptureWriter {
    buf: Arc<Mutex<Vec<u8>>>,
    closed: Arc<AtomicBool>,
}

impl AsyncWrite for CaptureWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.buf.lock().extend_from_slice(data);
        Poll::Ready(Ok(data.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.closed.store(true, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}

#[derive(Debug, Clone)]
struct FakeContainer {
    id: String,
    running: bool,
    image: String,
}

#[derive(Default)]
struct FakeState {
    containers: HashMap<String, FakeContainer>,
    scripts: VecDeque<ExecScript>,
    execs: Vec<ExecCall>,
    exit_codes: HashMap<String, i64>,
    unsettled: HashMap<String, usize>,
    stall_inspect_exec: bool,
    detached: Vec<Vec<String>>,
    calls: Vec<&'static str>,
    next_id: u64,
    lose_next_create: bool,
}

impl FakeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

#[derive(Default)]
pub struct FakeRuntime {
    state: Mutex<FakeState>,
}

impl FakeRuntime {
    pub fn add_container(&self, name: &str, running: bool) {
        let mut state = self.state.lock();
        let id = state.next_id("container");
        state.containers.insert(
            name.to_string(),
            FakeContainer {
                id,
                running,
                image: "dockashell/default-dev:latest".to_string(),
            },
        );
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.state
            .lock()
            .containers
            .get(name)
            .is_some_and(|c| c.running)
    }

    /// Next create finds the name taken by a concurrent creator
    pub fn lose_next_create(&self) {
        self.state.lock().lose_next_create = true;
    }

    /// Exec-inspect never resolves from now on
    pub fn stall_inspect_exec(&self) {
        self.state.lock().stall_inspect_exec = true;
    }

    pub fn push_exec(&self, script: ExecScript) {
        self.state.lock().scripts.push_back(script);
    }

    pub fn execs(&self) -> Vec<ExecCall> {
        self.state.lock().execs.clone()
    }

    pub fn detached(&self) -> Vec<Vec<String>> {
        self.state.lock().detached.clone()
    }

    pub fn count_calls(&self, name: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| **c == name)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().calls.len()
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn inspect(&self, name: &str) -> Result<Option<ContainerInfo>> {
        let mut state = self.state.lock();
        state.calls.push("inspect");
        Ok(state.containers.get(name).map(|c| ContainerInfo {
            id: c.id.clone(),
            running: c.running,
            status: Some(if c.running { "running" } else { "exited" }.to_string()),
            image: Some(c.image.clone()),
            started_at: None,
            ports: Vec::new(),
            mounts: Vec::new(),
        }))
    }

    async fn create(&self, name: &str, spec: &ContainerSpec) -> Result<Option<String>> {
        let mut state = self.state.lock();
        state.calls.push("create");
        let id = state.next_id("container");
        let container = FakeContainer {
            id: id.clone(),
            running: false,
            image: spec.image.clone(),
        };

        if state.lose_next_create {
            state.lose_next_create = false;
            state.containers.insert(name.to_string(), container);
            return Ok(None);
        }
        if state.containers.contains_key(name) {
            return Ok(None);
        }
        state.containers.insert(name.to_string(), container);
        Ok(Some(id))
    }

    async fn start(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push("start");
        match state.containers.get_mut(name) {
            Some(c) => {
                c.running = true;
                Ok(())
            }
            None => Err(Error::daemon("start", name, "no such container")),
        }
    }

    async fn stop(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push("stop");
        match state.containers.get_mut(name) {
            Some(c) => {
                c.running = false;
                Ok(())
            }
            None => Err(Error::NotFound(name.to_string())),
        }
    }

    async fn exec(&self, container: &str, request: ExecRequest) -> Result<ExecHandle> {
        let mut state = self.state.lock();
        state.calls.push("exec");
        let script = state.scripts.pop_front().unwrap_or_default();
        let id = state.next_id("exec");
        state.exit_codes.insert(id.clone(), script.exit_code);
        state.unsettled.insert(id.clone(), script.unsettled);

        let stdin = Arc::new(Mutex::new(Vec::new()));
        let stdin_closed = Arc::new(AtomicBool::new(false));
        state.execs.push(ExecCall {
            container: container.to_string(),
            cmd: request.cmd,
            working_dir: request.working_dir,
            stdin: stdin.clone(),
            stdin_closed: stdin_closed.clone(),
        });

        let mut output = futures::stream::iter(script.chunks.into_iter().map(Ok)).boxed();
        if let Some(message) = script.fail {
            output = output
                .chain(futures::stream::once(async move { Err(Error::Daemon(message)) }))
                .boxed();
        }
        if script.hang {
            output = output.chain(futures::stream::pending()).boxed();
        }

        let input: Option<Pin<Box<dyn AsyncWrite + Send>>> = if request.attach_stdin {
            Some(Box::pin(CaptureWriter {
                buf: stdin,
                closed: stdin_closed,
            }))
        } else {
            None
        };

        Ok(ExecHandle { id, output, input })
    }

    async fn inspect_exec(&self, exec_id: &str) -> Result<ExecState> {
        let stalled = {
            let mut state = self.state.lock();
            state.calls.push("inspect_exec");
            state.stall_inspect_exec
        };
        if stalled {
            futures::future::pending::<()>().await;
        }

        let mut state = self.state.lock();
        if let Some(left) = state.unsettled.get_mut(exec_id).filter(|n| **n > 0) {
            *left -= 1;
            return Ok(ExecState {
                exit_code: None,
                pid: Some(FAKE_PID),
                running: true,
            });
        }
        Ok(ExecState {
            exit_code: state.exit_codes.get(exec_id).copied(),
            pid: Some(FAKE_PID),
            running: false,
        })
    }

    async fn exec_detached(&self, _container: &str, cmd: Vec<String>) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push("exec_detached");
        state.detached.push(cmd);
        Ok(())
    }
}

/// Fake runtime wired to a real trace registry in a temp home
pub struct Harness {
    pub home: tempfile::TempDir,
    pub runtime: Arc<FakeRuntime>,
    pub traces: Arc<TraceRegistry>,
    pub containers: Arc<ContainerManager>,
    pub engine: Arc<ExecutionEngine>,
}

impl Harness {
    pub fn new() -> Self {
        let home = tempfile::tempdir().expect("temp dir");
        let runtime = Arc::new(FakeRuntime::default());
        let traces = Arc::new(TraceRegistry::with_default_timeout(ProjectStore::new(
            home.path(),
        )));
        let containers = Arc::new(ContainerManager::new(runtime.clone(), traces.clone()));
        let engine = Arc::new(ExecutionEngine::new(
            containers.clone(),
            traces.clone(),
            EngineConfig::default(),
        ));

        Self {
            home,
            runtime,
            traces,
            containers,
            engine,
        }
    }

    /// Harness with `dockashell-<project>` already running
    pub fn running(project: &str) -> Self {
        let harness = Self::new();
        harness
            .runtime
            .add_container(&crate::container::container_name(project), true);
        harness
    }
}
