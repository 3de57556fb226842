//! Project Config - 프로젝트별 컨테이너 설정
//!
//! One `config.json` per project. Everything except the name has a default,
//! so a minimal file is `{}`.

use crate::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;

/// Default container image
pub const DEFAULT_IMAGE: &str = "dockashell/default-dev:latest";

/// Default shell used as entrypoint and for `-c` execution
pub const DEFAULT_SHELL: &str = "/bin/bash";

/// Default working directory inside the container
pub const DEFAULT_WORKING_DIR: &str = "/workspace";

/// Default command time limit (seconds)
pub const DEFAULT_MAX_EXECUTION_SECS: u64 = 300;

/// Upper bound accepted for `max_execution_time` (seconds)
pub const MAX_EXECUTION_CEILING_SECS: f64 = 3600.0;

fn default_image() -> String {
    DEFAULT_IMAGE.to_string()
}

fn default_shell() -> String {
    DEFAULT_SHELL.to_string()
}

fn default_working_dir() -> String {
    DEFAULT_WORKING_DIR.to_string()
}

// ============================================================================
// Project name
// ============================================================================

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid project name regex"))
}

/// Validate a project name (letters, digits, `_`, `-`; at most 64 chars)
pub fn validate_project_name(name: &str) -> Result<()> {
    if name_pattern().is_match(name) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "Invalid project name '{}': use letters, digits, '_' or '-' (max 64 chars)",
            name
        )))
    }
}

// ============================================================================
// Mounts / Ports
// ============================================================================

/// Bind mount from the host into the container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    /// Host path (`~` expands to the home directory)
    pub host: String,
    /// Path inside the container
    pub container: String,
    #[serde(default)]
    pub readonly: bool,
}

impl MountConfig {
    pub fn new(host: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            container: container.into(),
            readonly: false,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.readonly = true;
        self
    }

    /// Host path with a leading `~` expanded
    pub fn host_path(&self) -> String {
        if self.host == "~" || self.host.starts_with("~/") {
            if let Some(home) = dirs::home_dir() {
                return format!("{}{}", home.to_string_lossy(), &self.host[1..]);
            }
        }
        self.host.clone()
    }

    /// Docker bind string: `host:container[:ro]`
    pub fn bind_spec(&self) -> String {
        let ro = if self.readonly { ":ro" } else { "" };
        format!("{}:{}{}", self.host_path(), self.container, ro)
    }
}

/// Host port published for a container port (tcp)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    pub host: u16,
    pub container: u16,
}

// ============================================================================
// Security policy
// ============================================================================

/// Per-project command policy
///
/// Parsed leniently: a `blocked_commands` value that is not an array is
/// treated as absent (built-in list applies), a non-numeric
/// `max_execution_time` falls back to the default.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SecurityPolicy {
    pub restricted_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_commands: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_execution_time: Option<f64>,
}

impl SecurityPolicy {
    /// Restricted policy with an explicit block list
    pub fn restricted<I, S>(blocked: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            restricted_mode: true,
            blocked_commands: Some(blocked.into_iter().map(Into::into).collect()),
            max_execution_time: None,
        }
    }

    pub fn with_max_execution_time(mut self, secs: f64) -> Self {
        self.max_execution_time = Some(secs);
        self
    }

    /// Build from a raw JSON value; anything but an object is malformed
    pub fn from_value(value: &Value) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            Error::InvalidInput("security policy must be a JSON object".to_string())
        })?;

        let blocked_commands = obj
            .get("blocked_commands")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            });

        Ok(Self {
            restricted_mode: obj
                .get("restricted_mode")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            blocked_commands,
            max_execution_time: obj.get("max_execution_time").and_then(Value::as_f64),
        })
    }

    /// Effective command time limit
    ///
    /// The configured value counts only when it lies in `(0, 3600]` seconds.
    pub fn max_execution_time(&self) -> Duration {
        match self.max_execution_time {
            Some(secs) if secs > 0.0 && secs <= MAX_EXECUTION_CEILING_SECS => {
                Duration::from_secs_f64(secs)
            }
            _ => Duration::from_secs(DEFAULT_MAX_EXECUTION_SECS),
        }
    }
}

impl<'de> Deserialize<'de> for SecurityPolicy {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Project config
// ============================================================================

/// Project configuration as loaded from `projects/<name>/config.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Filled from the directory name by the provider
    #[serde(default)]
    pub name: String,

    #[serde(default = "default_image")]
    pub image: String,

    #[serde(default)]
    pub mounts: Vec<MountConfig>,

    #[serde(default)]
    pub ports: Vec<PortConfig>,

    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    #[serde(default = "default_working_dir")]
    pub working_dir: String,

    #[serde(default = "default_shell")]
    pub shell: String,

    #[serde(default)]
    pub security: SecurityPolicy,
}

impl ProjectConfig {
    /// Project with every default applied
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: default_image(),
            mounts: Vec::new(),
            ports: Vec::new(),
            environment: BTreeMap::new(),
            working_dir: default_working_dir(),
            shell: default_shell(),
            security: SecurityPolicy::default(),
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_mount(mut self, mount: MountConfig) -> Self {
        self.mounts.push(mount);
        self
    }

    pub fn with_port(mut self, host: u16, container: u16) -> Self {
        self.ports.push(PortConfig { host, container });
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn with_security(mut self, security: SecurityPolicy) -> Self {
        self.security = security;
        self
    }

    /// Environment as `KEY=VALUE` strings
    pub fn env_list(&self) -> Vec<String> {
        self.environment
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect()
    }

    /// Effective command time limit for this project
    pub fn max_execution_time(&self) -> Duration {
        self.security.max_execution_time()
    }
}
