//! Command execution inside project containers
//!
//! - `ExecutionEngine` - command / patch / file-write execution with timeouts
//! - `race` - the timeout primitive shared by every operation
//! - `OutputBuffer` - capped stdout/stderr capture
//!
//! ## Security
//! - `ShellPolicy` - per-project command blocking (restricted mode)

pub mod engine;
pub mod output;
pub mod race;
pub mod shell_policy;

pub use engine::{
    EngineConfig, ExecOptions, ExecutionEngine, ExecutionResult, DEFAULT_PATCH_COMMAND,
    PATCH_BEGIN, PATCH_END,
};
pub use output::{OutputBuffer, DEFAULT_OUTPUT_LIMIT, TRUNCATION_MARKER};
pub use race::{race, Raced};
pub use shell_policy::{PolicyResult, ShellPolicy, DEFAULT_BLOCKED_COMMANDS};
