//! # dockashell-foundation
//!
//! Foundation layer for DockaShell:
//! - Error: 공통 에러 타입
//! - Config: 프로젝트/글로벌 설정 및 로더 (ProjectStore)
//! - Storage: JsonStore
//! - Trace: 프로젝트별 세션 로그 (TraceStore, TraceRegistry)
//!
//! ## 디렉토리 구조
//!
//! ```text
//! $DOCKASHELL_HOME (~/.dockashell)
//! ├── config.json                    글로벌 설정
//! └── projects/<name>/
//!     ├── config.json                프로젝트 설정
//!     └── traces/
//!         ├── current.jsonl          활성 세션
//!         └── sessions/*.jsonl       보관된 세션
//! ```

pub mod config;
pub mod error;
pub mod storage;
pub mod trace;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    validate_project_name, GlobalConfig, MountConfig, PortConfig, ProjectConfig, ProjectStore,
    SecurityPolicy,
};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::JsonStore;

// ============================================================================
// Trace (세션 로그)
// ============================================================================
pub use trace::{
    NewTrace, NoteType, TraceEntry, TraceFilter, TraceKind, TraceQuery, TraceRecord,
    TraceRegistry, TraceStore, TraceType,
};
