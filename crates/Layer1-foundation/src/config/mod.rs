//! Config - 설정 관리
//!
//! - `project.rs` - 프로젝트별 컨테이너/보안 설정
//! - `global.rs` - 글로벌 설정 (trace session timeout 등)
//! - `provider.rs` - 이름 → 설정/디렉토리 해석

mod global;
mod project;
mod provider;

pub use global::{
    parse_duration, ExecutionSettings, GlobalConfig, LoggingConfig, TraceSettings,
    DEFAULT_SESSION_TIMEOUT, GLOBAL_CONFIG_FILE,
};
pub use project::{
    validate_project_name, MountConfig, PortConfig, ProjectConfig, SecurityPolicy,
    DEFAULT_IMAGE, DEFAULT_MAX_EXECUTION_SECS, DEFAULT_SHELL, DEFAULT_WORKING_DIR,
};
pub use provider::{ProjectStore, PROJECTS_DIR, PROJECT_CONFIG_FILE, TRACES_DIR};
