//! Trace - 프로젝트별 동작 기록 (JSONL 세션 로그)
//!
//! - `types.rs` - TraceEntry, NewTrace, TraceQuery, TraceRecord
//! - `store.rs` - TraceStore (세션 회전), TraceRegistry

mod store;
mod types;

pub use store::{Session, TraceRegistry, TraceStore, CURRENT_FILE, SESSIONS_DIR};
pub use types::{
    NewTrace, NoteType, TraceEntry, TraceFilter, TraceKind, TraceQuery, TraceRecord, TraceType,
    TOOL_APPLY_PATCH, TOOL_BASH, TOOL_RUN_COMMAND, TOOL_START, TOOL_STOP, TOOL_WRITE_FILE,
    TOOL_WRITE_TRACE,
};
