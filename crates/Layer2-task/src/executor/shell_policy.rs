//! Shell Command Policy - 프로젝트별 명령어 차단
//!
//! `restricted_mode` 가 켜진 프로젝트에서 차단 목록과 일치하는 명령어를
//! 컨테이너에 도달하기 전에 거부합니다.
//!
//! ## 매칭 규칙
//! 명령어와 패턴은 trim + 소문자로 비교하며 다음 중 하나면 차단:
//! - 패턴과 명령어가 같음
//! - 명령어가 패턴으로 시작
//! - 패턴이 단어 경계로 둘러싸여 등장 (regex 생성 실패 시 단순 포함 검사)
//!
//! ## 사용 예시
//! ```rust,ignore
//! let policy = ShellPolicy::from_security(&project.security);
//!
//! match policy.validate("rm -rf /") {
//!     PolicyResult::Allow => { /* execute */ }
//!     PolicyResult::Deny(pattern) => { /* block */ }
//! }
//! ```

use dockashell_foundation::{Error, Result, SecurityPolicy};
use regex::Regex;
use serde_json::Value;
use tracing::warn;

/// 정책 검증 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyResult {
    /// 허용
    Allow,
    /// 거부 (일치한 패턴)
    Deny(String),
}

/// 기본 차단 명령어 (`blocked_commands` 미설정 시)
pub const DEFAULT_BLOCKED_COMMANDS: &[&str] = &[
    // 시스템 파괴 명령어
    "rm -rf /",
    "rm -rf /*",
    ":(){ :|:& };:",
    "mkfs",
    "dd if=/dev/zero",
    "dd if=/dev/random",
    // 시스템 제어
    "shutdown",
    "reboot",
    "halt",
    "poweroff",
    "init 0",
    "init 6",
    // 권한 변경
    "chmod 777 /",
    "chown root",
    // 리버스 셸
    "nc -e",
    "ncat -e",
    "bash -i >& /dev/tcp",
];

/// Shell 명령어 정책
#[derive(Debug, Clone, PartialEq)]
pub struct ShellPolicy {
    restricted: bool,
    /// trim + 소문자, 빈 패턴 제외
    blocked: Vec<String>,
}

impl Default for ShellPolicy {
    fn default() -> Self {
        Self::unrestricted()
    }
}

impl ShellPolicy {
    /// 모든 명령어 허용
    pub fn unrestricted() -> Self {
        Self {
            restricted: false,
            blocked: Vec::new(),
        }
    }

    /// 주어진 차단 패턴으로 제한 모드 정책 생성
    pub fn restricted<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            restricted: true,
            blocked: patterns
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn from_security(security: &SecurityPolicy) -> Self {
        if !security.restricted_mode {
            return Self::unrestricted();
        }
        match &security.blocked_commands {
            Some(patterns) => Self::restricted(patterns),
            None => Self::restricted(DEFAULT_BLOCKED_COMMANDS),
        }
    }

    pub fn is_restricted(&self) -> bool {
        self.restricted
    }

    /// 명령어 검증
    pub fn validate(&self, command: &str) -> PolicyResult {
        if !self.restricted {
            return PolicyResult::Allow;
        }

        let command = command.trim().to_lowercase();
        for pattern in &self.blocked {
            if matches_pattern(&command, pattern) {
                return PolicyResult::Deny(pattern.clone());
            }
        }

        PolicyResult::Allow
    }

    /// 명령어 검증 - 차단 시 `CommandBlocked` 반환
    pub fn enforce(&self, command: &str) -> Result<()> {
        match self.validate(command) {
            PolicyResult::Allow => Ok(()),
            PolicyResult::Deny(pattern) => {
                warn!(
                    command = command.trim(),
                    pattern = %pattern,
                    "Command blocked by policy"
                );
                Err(Error::CommandBlocked(command.trim().to_string()))
            }
        }
    }
}

/// `command` 와 `pattern` 은 이미 정규화된 상태
fn matches_pattern(command: &str, pattern: &str) -> bool {
    if command == pattern || command.starts_with(pattern) {
        return true;
    }

    let word = format!(r"(?:^|\W){}(?:$|\W)", regex::escape(pattern));
    match Regex::new(&word) {
        Ok(re) => re.is_match(command),
        Err(_) => command.contains(pattern),
    }
}

/// 타입 정책으로 명령어 검증
pub fn validate(command: &str, policy: &SecurityPolicy) -> Result<()> {
    if command.trim().is_empty() {
        return Err(Error::invalid_input("Command must not be empty"));
    }
    ShellPolicy::from_security(policy).enforce(command)
}

/// JSON 정책으로 명령어 검증 - 정책이 없거나 객체가 아니면 거부
pub fn validate_value(command: &str, policy: Option<&Value>) -> Result<()> {
    if command.trim().is_empty() {
        return Err(Error::invalid_input("Command must not be empty"));
    }
    let policy = policy.ok_or_else(|| Error::invalid_input("Security policy is missing"))?;
    let policy = SecurityPolicy::from_value(policy)?;
    ShellPolicy::from_security(&policy).enforce(command)
}
