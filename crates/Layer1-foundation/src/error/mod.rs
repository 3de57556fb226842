//! Error types for DockaShell
//!
//! 입력/정책 에러는 컨테이너 호출 전에 반환되고, 타임아웃과
//! non-zero exit 는 에러가 아닌 `ExecutionResult` 로 표현됩니다.

use thiserror::Error;

/// DockaShell Result
pub type Result<T> = std::result::Result<T, Error>;

/// DockaShell 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 입력 / 정책
    // ========================================================================
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Command blocked by security policy: {0}")]
    CommandBlocked(String),

    // ========================================================================
    // 프로젝트 / 컨테이너 상태
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Project '{0}' is not running. Start it with start_project first")]
    NotRunning(String),

    // ========================================================================
    // 실행 관련
    // ========================================================================
    #[error("Docker daemon error: {0}")]
    Daemon(String),

    // ========================================================================
    // 설정 / 저장소
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Daemon hiccups may succeed on a retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Daemon(_))
    }

    /// Caller mistakes, reported before any container interaction
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_)
                | Error::CommandBlocked(_)
                | Error::NotFound(_)
                | Error::NotRunning(_)
        )
    }

    /// Stable machine-readable code for tool layers
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "invalid_input",
            Error::CommandBlocked(_) => "command_blocked",
            Error::NotFound(_) => "not_found",
            Error::NotRunning(_) => "not_running",
            Error::Daemon(_) => "daemon_error",
            Error::Config(_) => "config_error",
            Error::Storage(_) | Error::Io(_) | Error::Json(_) => "storage_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Input 에러 생성 헬퍼
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }

    /// Daemon 에러 생성 헬퍼
    pub fn daemon(operation: &str, target: &str, source: impl std::fmt::Display) -> Self {
        Error::Daemon(format!("{} {}: {}", operation, target, source))
    }
}
