//! JSON 파일 저장소 - DockaShell 홈 아래의 `config.json` 류 파일
//!
//! 쓰기는 임시 파일 + rename 으로 교체하므로 읽는 쪽이 반쯤 쓰인
//! 설정을 보지 않습니다.

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Environment variable overriding the DockaShell home directory
pub const HOME_ENV: &str = "DOCKASHELL_HOME";

const HOME_DIR_NAME: &str = ".dockashell";

/// Directory of JSON documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `$DOCKASHELL_HOME`, else `~/.dockashell`
    pub fn home() -> Result<Self> {
        match std::env::var_os(HOME_ENV) {
            Some(dir) if !dir.is_empty() => Ok(Self::new(dir)),
            _ => dirs::home_dir()
                .map(|home| Self::new(home.join(HOME_DIR_NAME)))
                .ok_or_else(|| Error::Config("Cannot determine the user home directory".into())),
        }
    }

    /// Store rooted at a subdirectory
    pub fn child(&self, name: &str) -> Self {
        Self::new(self.dir.join(name))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// `None` when the file does not exist; read or parse failures are `Config`
    pub fn load_optional<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.path_of(name);
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(config_error("read", &path, e)),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| config_error("parse", &path, e))
    }

    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        self.load_optional(name)?
            .ok_or_else(|| Error::NotFound(self.path_of(name).display().to_string()))
    }

    /// Pretty-printed, replaced atomically
    pub fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| config_error("create", &self.dir, e))?;

        let path = self.path_of(name);
        let staging = self.path_of(&format!(".{}.tmp", name));
        let mut body = serde_json::to_vec_pretty(value)?;
        body.push(b'\n');

        std::fs::write(&staging, body).map_err(|e| config_error("write", &staging, e))?;
        std::fs::rename(&staging, &path).map_err(|e| config_error("replace", &path, e))
    }
}

fn config_error(action: &str, path: &Path, cause: impl std::fmt::Display) -> Error {
    Error::Config(format!("Failed to {} {}: {}", action, path.display(), cause))
}
