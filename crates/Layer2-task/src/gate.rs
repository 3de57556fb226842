//! Policy Gate - security policy in front of the execution engine

use crate::executor::shell_policy;
use crate::executor::{ExecOptions, ExecutionEngine, ExecutionResult};
use dockashell_foundation::{ProjectConfig, Result};
use std::sync::Arc;

/// Rejects disallowed commands before they reach the container
#[derive(Debug, Clone)]
pub struct PolicyGate {
    engine: Arc<ExecutionEngine>,
}

impl PolicyGate {
    pub fn new(engine: Arc<ExecutionEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<ExecutionEngine> {
        &self.engine
    }

    /// Validate against the project's policy, then execute.
    /// Blocked commands never reach the runtime and are not traced.
    pub async fn run_command(
        &self,
        project: &ProjectConfig,
        command: &str,
        options: ExecOptions,
    ) -> Result<ExecutionResult> {
        shell_policy::validate(command, &project.security)?;
        self.engine.execute_command(project, command, options).await
    }
}
