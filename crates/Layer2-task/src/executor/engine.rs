//! Execution Engine - runs commands, patches and file writes in a project container
//!
//! Every operation goes through the same path:
//!
//! 1. validate input, require a running container
//! 2. create an exec instance, optionally stream stdin
//! 3. capture demultiplexed stdout/stderr into capped buffers
//! 4. race completion against the timeout
//! 5. record one trace entry for the outcome

use super::output::{OutputBuffer, DEFAULT_OUTPUT_LIMIT};
use super::race::{race, Raced};
use crate::container::ContainerManager;
use crate::runtime::{ContainerRuntime, ExecHandle, ExecOutput, ExecRequest, ExecState};
use dockashell_foundation::trace::{NewTrace, TOOL_APPLY_PATCH, TOOL_RUN_COMMAND, TOOL_WRITE_FILE};
use dockashell_foundation::{Error, GlobalConfig, ProjectConfig, Result, TraceRegistry};
use futures::{FutureExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

pub const DEFAULT_PATCH_COMMAND: &str = "apply_patch";
pub const PATCH_BEGIN: &str = "*** Begin Patch";
pub const PATCH_END: &str = "*** End Patch";

const COMMAND_TIMEOUT_MESSAGE: &str = "Command timed out";
const PATCH_TIMEOUT_MESSAGE: &str = "Patch application timed out";
const WRITE_TIMEOUT_MESSAGE: &str = "File write timed out";

/// Exec-inspect polls while the daemon still reports the exec as running
const EXIT_CODE_POLLS: u32 = 5;
const EXIT_CODE_BACKOFF: Duration = Duration::from_millis(20);

/// `$1` = target path, `$2` = "1" to allow overwriting
const WRITE_FILE_SCRIPT: &str = r#"target="$1"
if [ -e "$target" ] && [ "$2" != "1" ]; then
  echo "File already exists: $target (set overwrite to replace it)" >&2
  exit 1
fi
mkdir -p -- "$(dirname -- "$target")" || exit 1
cat > "$target""#;

// ============================================================================
// Configuration
// ============================================================================

/// Engine settings
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Per-stream capture limit in bytes
    pub output_limit: usize,

    /// Patch helper; receives the patch on stdin
    pub patch_command: Vec<String>,

    /// Overrides the project's `max_execution_time` when set
    pub default_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            output_limit: DEFAULT_OUTPUT_LIMIT,
            patch_command: vec![DEFAULT_PATCH_COMMAND.to_string()],
            default_timeout: None,
        }
    }
}

impl EngineConfig {
    pub fn from_global(global: &GlobalConfig) -> Self {
        let mut config = Self::default();
        if let Some(limit) = global.execution.output_limit_bytes.filter(|l| *l > 0) {
            config.output_limit = limit;
        }
        if let Some(cmd) = global.execution.patch_command.clone().filter(|c| !c.is_empty()) {
            config.patch_command = cmd;
        }
        config
    }

    pub fn with_output_limit(mut self, limit: usize) -> Self {
        self.output_limit = limit;
        self
    }

    pub fn with_patch_command<I, S>(mut self, cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patch_command = cmd.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }
}

/// Per-call options
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecOptions {
    pub timeout: Option<Duration>,
}

impl ExecOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

// ============================================================================
// ExecutionResult
// ============================================================================

/// Outcome of an exec; timeouts and non-zero exits are results, not errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub duration_ms: u64,
}

impl ExecutionResult {
    fn to_value(&self) -> Value {
        json!({
            "success": self.success,
            "exitCode": self.exit_code,
            "stdout": self.stdout,
            "stderr": self.stderr,
            "timedOut": self.timed_out,
            "durationMs": self.duration_ms,
        })
    }
}

struct ExecPlan<'a> {
    cmd: Vec<String>,
    stdin: Option<&'a [u8]>,
    kill_on_timeout: bool,
    timeout_message: &'static str,
}

// ============================================================================
// ExecutionEngine
// ============================================================================

pub struct ExecutionEngine {
    containers: Arc<ContainerManager>,
    traces: Arc<TraceRegistry>,
    config: EngineConfig,
}

impl ExecutionEngine {
    pub fn new(
        containers: Arc<ContainerManager>,
        traces: Arc<TraceRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            containers,
            traces,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn timeout_for(&self, project: &ProjectConfig, options: ExecOptions) -> Duration {
        options
            .timeout
            .or(self.config.default_timeout)
            .unwrap_or_else(|| project.max_execution_time())
    }

    /// Run `command` through the project's shell
    pub async fn execute_command(
        &self,
        project: &ProjectConfig,
        command: &str,
        options: ExecOptions,
    ) -> Result<ExecutionResult> {
        if command.trim().is_empty() {
            return Err(Error::invalid_input("Command must not be empty"));
        }
        let container = self.containers.require_running(&project.name).await?;

        let plan = ExecPlan {
            cmd: vec![project.shell.clone(), "-c".to_string(), command.to_string()],
            stdin: None,
            kill_on_timeout: true,
            timeout_message: COMMAND_TIMEOUT_MESSAGE,
        };
        let outcome = self
            .run_exec(&container, project, plan, self.timeout_for(project, options))
            .await;

        self.trace_outcome(
            &project.name,
            NewTrace::execution(TOOL_RUN_COMMAND).with("command", command),
            &outcome,
        )
        .await;
        outcome
    }

    /// Stream a `*** Begin Patch` envelope into the patch helper
    pub async fn apply_patch(
        &self,
        project: &ProjectConfig,
        patch: &str,
        options: ExecOptions,
    ) -> Result<ExecutionResult> {
        validate_patch(patch)?;
        let container = self.containers.require_running(&project.name).await?;

        let plan = ExecPlan {
            cmd: self.config.patch_command.clone(),
            stdin: Some(patch.as_bytes()),
            kill_on_timeout: false,
            timeout_message: PATCH_TIMEOUT_MESSAGE,
        };
        let outcome = self
            .run_exec(&container, project, plan, self.timeout_for(project, options))
            .await;

        self.trace_outcome(
            &project.name,
            NewTrace::execution(TOOL_APPLY_PATCH).with("patch", patch),
            &outcome,
        )
        .await;
        outcome
    }

    /// Write `content` to `path` (relative to the working dir) inside the container
    pub async fn write_file(
        &self,
        project: &ProjectConfig,
        path: &str,
        content: &str,
        overwrite: bool,
        options: ExecOptions,
    ) -> Result<ExecutionResult> {
        if path.trim().is_empty() {
            return Err(Error::invalid_input("File path must not be empty"));
        }
        if path.contains('\0') {
            return Err(Error::invalid_input("File path must not contain NUL bytes"));
        }
        let container = self.containers.require_running(&project.name).await?;

        let plan = ExecPlan {
            cmd: vec![
                "sh".to_string(),
                "-c".to_string(),
                WRITE_FILE_SCRIPT.to_string(),
                "dockashell-write-file".to_string(),
                path.to_string(),
                if overwrite { "1" } else { "0" }.to_string(),
            ],
            stdin: Some(content.as_bytes()),
            kill_on_timeout: false,
            timeout_message: WRITE_TIMEOUT_MESSAGE,
        };
        let outcome = self
            .run_exec(&container, project, plan, self.timeout_for(project, options))
            .await;

        self.trace_outcome(
            &project.name,
            NewTrace::execution(TOOL_WRITE_FILE)
                .with("path", path)
                .with("overwrite", overwrite)
                .with("content_length", content.len()),
            &outcome,
        )
        .await;
        outcome
    }

    async fn run_exec(
        &self,
        container: &str,
        project: &ProjectConfig,
        plan: ExecPlan<'_>,
        limit: Duration,
    ) -> Result<ExecutionResult> {
        let runtime = self.containers.runtime();
        let stdin = plan.stdin;
        let started = Instant::now();

        let ExecHandle {
            id,
            mut output,
            input,
        } = runtime
            .exec(
                container,
                ExecRequest {
                    cmd: plan.cmd,
                    working_dir: Some(project.working_dir.clone()),
                    attach_stdin: stdin.is_some(),
                },
            )
            .await?;
        debug!(project = %project.name, exec_id = %id, timeout_ms = limit.as_millis() as u64, "Exec started");

        let mut stdout = OutputBuffer::new(self.config.output_limit);
        let mut stderr = OutputBuffer::new(self.config.output_limit);

        let work = async {
            let drain = async {
                while let Some(chunk) = output.next().await {
                    match chunk? {
                        ExecOutput::Stdout(bytes) => stdout.push(&bytes),
                        ExecOutput::Stderr(bytes) => stderr.push(&bytes),
                    }
                }
                Ok::<(), Error>(())
            };
            let ((), drained) = tokio::join!(feed_stdin(input, stdin), drain);
            drained?;

            settled_exit_code(runtime.as_ref(), &id).await
        };

        let on_timeout = plan
            .kill_on_timeout
            .then(|| kill_exec(runtime.as_ref(), container, &id).boxed());

        let raced = race(work, limit, on_timeout).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match raced {
            Raced::Finished(Ok(exit_code)) => {
                debug!(project = %project.name, exit_code, duration_ms, "Exec finished");
                Ok(ExecutionResult {
                    success: exit_code == 0,
                    exit_code,
                    stdout: stdout.to_text(),
                    stderr: stderr.to_text(),
                    timed_out: false,
                    duration_ms,
                })
            }
            Raced::Finished(Err(e)) => Err(e),
            Raced::TimedOut => {
                warn!(project = %project.name, exec_id = %id, duration_ms, "Exec timed out");
                Ok(ExecutionResult {
                    success: false,
                    exit_code: -1,
                    stdout: stdout.to_text(),
                    stderr: plan.timeout_message.to_string(),
                    timed_out: true,
                    duration_ms,
                })
            }
        }
    }

    async fn trace_outcome(
        &self,
        project: &str,
        trace: NewTrace,
        outcome: &Result<ExecutionResult>,
    ) {
        let trace = match outcome {
            Ok(result) => trace.with_result(result.to_value()),
            Err(e) => trace.with("error", e.to_string()),
        };
        if let Err(e) = self.traces.record(project, trace).await {
            warn!(project, error = %e, "Failed to record execution trace");
        }
    }
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("config", &self.config)
            .finish()
    }
}

fn validate_patch(patch: &str) -> Result<()> {
    let trimmed = patch.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_input("Patch must not be empty"));
    }
    if !trimmed.starts_with(PATCH_BEGIN) || !trimmed.ends_with(PATCH_END) {
        return Err(Error::invalid_input(format!(
            "Patch must start with '{}' and end with '{}'",
            PATCH_BEGIN, PATCH_END
        )));
    }
    Ok(())
}

/// Write all of `data` then close stdin. The process may exit without reading.
async fn feed_stdin(input: Option<Pin<Box<dyn AsyncWrite + Send>>>, data: Option<&[u8]>) {
    let (Some(mut input), Some(data)) = (input, data) else {
        return;
    };
    if let Err(e) = input.write_all(data).await {
        debug!(error = %e, "Exec stdin closed early");
        return;
    }
    if let Err(e) = input.shutdown().await {
        debug!(error = %e, "Failed to close exec stdin");
    }
}

/// Exit code after the output stream ended.
///
/// The daemon may still report `running` with no exit code for a moment;
/// poll a bounded number of times with a doubling backoff before giving up (-1).
async fn settled_exit_code(runtime: &dyn ContainerRuntime, exec_id: &str) -> Result<i64> {
    let mut delay = EXIT_CODE_BACKOFF;
    for attempt in 1..=EXIT_CODE_POLLS {
        let state = runtime.inspect_exec(exec_id).await?;
        match state.exit_code {
            Some(code) => return Ok(code),
            None if state.running && attempt < EXIT_CODE_POLLS => {
                debug!(exec_id, attempt, "Exec still settling, re-inspecting");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            None => break,
        }
    }
    warn!(exec_id, "Exec reported no exit code");
    Ok(-1)
}

/// Best-effort SIGTERM to a timed-out exec
async fn kill_exec(runtime: &dyn ContainerRuntime, container: &str, exec_id: &str) {
    let pid = match runtime.inspect_exec(exec_id).await {
        Ok(ExecState { pid: Some(pid), .. }) if pid > 0 => pid,
        Ok(_) => {
            debug!(exec_id, "Timed-out exec has no pid");
            return;
        }
        Err(e) => {
            debug!(exec_id, error = %e, "Failed to inspect timed-out exec");
            return;
        }
    };

    let cmd = vec!["kill".to_string(), "-TERM".to_string(), pid.to_string()];
    match runtime.exec_detached(container, cmd).await {
        Ok(()) => debug!(exec_id, pid, "Sent SIGTERM to timed-out exec"),
        Err(e) => debug!(exec_id, pid, error = %e, "Failed to kill timed-out exec"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::output::TRUNCATION_MARKER;
    use crate::testing::{ExecScript, Harness};
    use dockashell_foundation::{TraceFilter, TraceKind, TraceQuery};

    const PATCH: &str = "*** Begin Patch\n*** Add File: hello.txt\n+hello\n*** End Patch\n";

    fn project() -> ProjectConfig {
        ProjectConfig::new("web")
    }

    #[tokio::test]
    async fn test_command_success() {
        let h = Harness::running("web");
        h.runtime.push_exec(ExecScript::new().stdout("hello\n").stderr("warn\n"));

        let result = h
            .engine
            .execute_command(&project(), "echo hello", ExecOptions::default())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, "hello\n");
        assert_eq!(result.stderr, "warn\n");
        assert!(!result.timed_out);

        let call = &h.runtime.execs()[0];
        assert_eq!(call.container, "dockashell-web");
        assert_eq!(call.cmd, vec!["/bin/bash", "-c", "echo hello"]);
        assert_eq!(call.working_dir.as_deref(), Some("/workspace"));
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_a_result() {
        let h = Harness::running("web");
        h.runtime.push_exec(ExecScript::new().stderr("boom").exit(2));

        let result = h
            .engine
            .execute_command(&project(), "false", ExecOptions::default())
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.exit_code, 2);
        assert_eq!(result.stderr, "boom");
    }

    #[tokio::test]
    async fn test_timeout_preserves_partial_output_and_kills() {
        let h = Harness::running("web");
        h.runtime
            .push_exec(ExecScript::new().stdout("partial").hang());

        let result = h
            .engine
            .execute_command(
                &project(),
                "sleep 100",
                ExecOptions::with_timeout(Duration::from_millis(50)),
            )
            .await
            .unwrap();

        assert!(result.timed_out);
        assert!(!result.success);
        assert_eq!(result.exit_code, -1);
        assert_eq!(result.stdout, "partial");
        assert_eq!(result.stderr, "Command timed out");

        assert_eq!(
            h.runtime.detached(),
            vec![vec!["kill".to_string(), "-TERM".to_string(), "4242".to_string()]]
        );

        let traces = h.traces.read("web", &TraceQuery::new()).await.unwrap();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].result.as_ref().unwrap()["timedOut"], true);
    }

    #[tokio::test]
    async fn test_stalled_daemon_cannot_block_timeout() {
        let h = Harness::running("web");
        h.runtime.push_exec(ExecScript::new().stdout("partial").hang());
        h.runtime.stall_inspect_exec();

        let result = tokio::time::timeout(
            Duration::from_secs(3),
            h.engine.execute_command(
                &project(),
                "sleep 100",
                ExecOptions::with_timeout(Duration::from_millis(50)),
            ),
        )
        .await
        .expect("timed-out command must return despite a stalled daemon")
        .unwrap();

        assert!(result.timed_out);
        assert_eq!(result.stdout, "partial");
        assert!(h.runtime.detached().is_empty());
    }

    #[tokio::test]
    async fn test_exit_code_waits_for_exec_to_settle() {
        let h = Harness::running("web");
        h.runtime
            .push_exec(ExecScript::new().stdout("ok\n").settle_after(2));

        let result = h
            .engine
            .execute_command(&project(), "true", ExecOptions::default())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.exit_code, 0);
        assert_eq!(h.runtime.count_calls("inspect_exec"), 3);
    }

    #[tokio::test]
    async fn test_exit_code_gives_up_after_bounded_polls() {
        let h = Harness::running("web");
        h.runtime.push_exec(ExecScript::new().settle_after(100));

        let result = h
            .engine
            .execute_command(&project(), "true", ExecOptions::default())
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.exit_code, -1);
        assert_eq!(
            h.runtime.count_calls("inspect_exec"),
            EXIT_CODE_POLLS as usize
        );
    }

    #[tokio::test]
    async fn test_output_truncated_at_limit() {
        let h = Harness::running("web");
        h.runtime.push_exec(
            ExecScript::new()
                .stdout(&"x".repeat(DEFAULT_OUTPUT_LIMIT))
                .stdout("overflow"),
        );

        let result = h
            .engine
            .execute_command(&project(), "yes", ExecOptions::default())
            .await
            .unwrap();

        assert!(result.stdout.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            result.stdout.len(),
            DEFAULT_OUTPUT_LIMIT + TRUNCATION_MARKER.len()
        );
    }

    #[tokio::test]
    async fn test_input_errors_precede_runtime_calls() {
        let h = Harness::new();

        assert!(matches!(
            h.engine
                .execute_command(&project(), "   ", ExecOptions::default())
                .await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            h.engine
                .apply_patch(&project(), "diff --git a b", ExecOptions::default())
                .await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            h.engine
                .write_file(&project(), "", "x", false, ExecOptions::default())
                .await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            h.engine
                .write_file(&project(), "a\0b", "x", false, ExecOptions::default())
                .await,
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(h.runtime.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_not_running_container() {
        let h = Harness::new();

        let err = h
            .engine
            .execute_command(&project(), "ls", ExecOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotRunning(_)));
        assert!(err.to_string().contains("start_project"));
        assert_eq!(h.runtime.count_calls("exec"), 0);
    }

    #[tokio::test]
    async fn test_daemon_failure_is_traced_and_propagated() {
        let h = Harness::running("web");
        h.runtime
            .push_exec(ExecScript::new().stdout("half").fail("connection reset"));

        let err = h
            .engine
            .execute_command(&project(), "make", ExecOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Daemon(_)));

        let traces = h.traces.read("web", &TraceQuery::new()).await.unwrap();
        assert_eq!(traces.len(), 1);
        assert!(traces[0].payload["error"]
            .as_str()
            .unwrap()
            .contains("connection reset"));
    }

    #[tokio::test]
    async fn test_apply_patch_streams_stdin() {
        let h = Harness::running("web");
        h.runtime.push_exec(ExecScript::new().stdout("Done!"));

        let result = h
            .engine
            .apply_patch(&project(), PATCH, ExecOptions::default())
            .await
            .unwrap();
        assert!(result.success);

        let call = &h.runtime.execs()[0];
        assert_eq!(call.cmd, vec!["apply_patch"]);
        assert_eq!(call.stdin_text(), PATCH);
        assert!(call.stdin_closed());

        let patches = h
            .traces
            .read(
                "web",
                &TraceQuery::new().with_filter(TraceFilter::Kind(TraceKind::ApplyPatch)),
            )
            .await
            .unwrap();
        assert_eq!(patches[0].payload["patch"], PATCH);
    }

    #[tokio::test]
    async fn test_apply_patch_timeout_does_not_kill() {
        let h = Harness::running("web");
        h.runtime.push_exec(ExecScript::new().hang());

        let result = h
            .engine
            .apply_patch(
                &project(),
                PATCH,
                ExecOptions::with_timeout(Duration::from_millis(30)),
            )
            .await
            .unwrap();

        assert!(result.timed_out);
        assert_eq!(result.stderr, "Patch application timed out");
        assert!(h.runtime.detached().is_empty());
    }

    #[tokio::test]
    async fn test_write_file_passes_path_as_argument() {
        let h = Harness::running("web");
        h.runtime.push_exec(ExecScript::new());

        let path = "src/$(whoami)/main.rs";
        let result = h
            .engine
            .write_file(&project(), path, "fn main() {}\n", true, ExecOptions::default())
            .await
            .unwrap();
        assert!(result.success);

        let call = &h.runtime.execs()[0];
        assert_eq!(call.cmd[0], "sh");
        assert!(!call.cmd[2].contains(path));
        assert_eq!(call.cmd[4], path);
        assert_eq!(call.cmd[5], "1");
        assert_eq!(call.stdin_text(), "fn main() {}\n");

        let writes = h
            .traces
            .read(
                "web",
                &TraceQuery::new().with_filter(TraceFilter::Kind(TraceKind::WriteFile)),
            )
            .await
            .unwrap();
        assert_eq!(writes[0].payload["path"], path);
        assert_eq!(writes[0].payload["overwrite"], true);
        assert_eq!(writes[0].payload["content_length"], 13);
    }

    #[tokio::test]
    async fn test_write_file_refused_without_overwrite() {
        let h = Harness::running("web");
        h.runtime.push_exec(
            ExecScript::new()
                .stderr("File already exists: README.md (set overwrite to replace it)\n")
                .exit(1),
        );

        let result = h
            .engine
            .write_file(&project(), "README.md", "new", false, ExecOptions::default())
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.stderr.contains("already exists"));
        assert_eq!(h.runtime.execs()[0].cmd[5], "0");
    }

    #[test]
    fn test_engine_config_from_global() {
        let global: GlobalConfig = serde_json::from_str(
            r#"{"execution":{"patch_command":["python3","/opt/apply_patch.py"],"output_limit_bytes":1024}}"#,
        )
        .unwrap();
        let config = EngineConfig::from_global(&global);
        assert_eq!(config.output_limit, 1024);
        assert_eq!(config.patch_command, vec!["python3", "/opt/apply_patch.py"]);

        let defaults = EngineConfig::from_global(&GlobalConfig::default());
        assert_eq!(defaults.patch_command, vec![DEFAULT_PATCH_COMMAND]);
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = ExecutionResult {
            success: true,
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: false,
            duration_ms: 12,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value, result.to_value());
        assert_eq!(value["durationMs"], 12);
    }
}
