//! Project provider - resolves project names to configs and directories
//!
//! ```text
//! <home>/
//!   config.json                  global settings (optional)
//!   projects/<name>/config.json  project settings
//!   projects/<name>/traces/      trace sessions
//! ```

use super::global::{GlobalConfig, GLOBAL_CONFIG_FILE};
use super::project::{validate_project_name, ProjectConfig};
use crate::storage::JsonStore;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const PROJECTS_DIR: &str = "projects";
pub const PROJECT_CONFIG_FILE: &str = "config.json";
pub const TRACES_DIR: &str = "traces";

/// Loads project configuration from the DockaShell home directory
#[derive(Debug, Clone)]
pub struct ProjectStore {
    home: JsonStore,
}

impl ProjectStore {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: JsonStore::new(home),
        }
    }

    /// `$DOCKASHELL_HOME` or `~/.dockashell`
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            home: JsonStore::home()?,
        })
    }

    pub fn home(&self) -> &Path {
        self.home.dir()
    }

    /// Root of all project directories
    pub fn projects_root(&self) -> PathBuf {
        self.home.path_of(PROJECTS_DIR)
    }

    fn project_store(&self, name: &str) -> Result<JsonStore> {
        validate_project_name(name)?;
        Ok(self.home.child(PROJECTS_DIR).child(name))
    }

    pub fn project_dir(&self, name: &str) -> Result<PathBuf> {
        Ok(self.project_store(name)?.dir().to_path_buf())
    }

    pub fn traces_dir(&self, name: &str) -> Result<PathBuf> {
        Ok(self.project_dir(name)?.join(TRACES_DIR))
    }

    /// Load a project config with defaults applied
    pub fn load_project(&self, name: &str) -> Result<ProjectConfig> {
        let store = self.project_store(name)?;
        let mut config: ProjectConfig = store
            .load_optional(PROJECT_CONFIG_FILE)?
            .ok_or_else(|| Error::NotFound(format!("Project '{}' has no configuration", name)))?;

        config.name = name.to_string();
        debug!(project = name, image = %config.image, "Loaded project config");
        Ok(config)
    }

    pub fn save_project(&self, config: &ProjectConfig) -> Result<()> {
        self.project_store(&config.name)?
            .save(PROJECT_CONFIG_FILE, config)
    }

    /// Names of all configured projects, sorted
    pub fn list_projects(&self) -> Result<Vec<String>> {
        let root = self.projects_root();
        if !root.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if validate_project_name(&name).is_ok()
                && entry.path().join(PROJECT_CONFIG_FILE).is_file()
            {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Global settings; defaults when the file is absent
    pub fn load_global(&self) -> Result<GlobalConfig> {
        Ok(self
            .home
            .load_optional(GLOBAL_CONFIG_FILE)?
            .unwrap_or_default())
    }
}
