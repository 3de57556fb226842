//! Global Config - `<home>/config.json`
//!
//! Optional file; a missing file means all defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// 글로벌 설정 파일명
pub const GLOBAL_CONFIG_FILE: &str = "config.json";

/// Idle gap after which a trace session is rotated
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(4 * 60 * 60);

fn default_session_timeout() -> String {
    "4h".to_string()
}

/// DockaShell 글로벌 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub execution: ExecutionSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub traces: TraceSettings,
}

/// Trace session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceSettings {
    /// Duration string: `90s`, `30m`, `4h`, `1d`, or bare milliseconds
    #[serde(default = "default_session_timeout")]
    pub session_timeout: String,
}

impl Default for TraceSettings {
    fn default() -> Self {
        Self {
            session_timeout: default_session_timeout(),
        }
    }
}

impl TraceSettings {
    /// Parsed session timeout; unparseable values fall back to 4h
    pub fn session_timeout(&self) -> Duration {
        parse_duration(&self.session_timeout).unwrap_or_else(|| {
            warn!(
                value = %self.session_timeout,
                "Invalid trace session_timeout, using default"
            );
            DEFAULT_SESSION_TIMEOUT
        })
    }
}

/// Execution overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionSettings {
    /// Patch helper invoked inside the container (reads the patch on stdin)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_command: Option<Vec<String>>,

    /// Per-stream output capture limit in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_limit_bytes: Option<usize>,
}

/// Parse `<number><unit>` where unit is one of `ms`, `s`, `m`, `h`, `d`.
/// A bare number is milliseconds. Zero is rejected.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (number, unit) = input.split_at(split);
    let value: u64 = number.parse().ok()?;

    let millis = match unit.trim() {
        "" | "ms" => value,
        "s" => value.checked_mul(1_000)?,
        "m" => value.checked_mul(60_000)?,
        "h" => value.checked_mul(3_600_000)?,
        "d" => value.checked_mul(86_400_000)?,
        _ => return None,
    };

    if millis == 0 {
        return None;
    }
    Some(Duration::from_millis(millis))
}
