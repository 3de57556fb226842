//! Trace Store - 프로젝트별 JSONL 세션 로그
//!
//! ```text
//! traces/
//!   current.jsonl                          active session (append-only)
//!   sessions/2025-01-31T09-15-02.114Z.jsonl  archived sessions
//! ```
//!
//! A session ends after an idle gap longer than the timeout or on `close`.
//! Rotation moves `current.jsonl` into `sessions/`, named by the session's
//! start time.

use super::types::{NewTrace, TraceEntry, TraceQuery, TraceRecord};
use crate::config::{GlobalConfig, ProjectStore, DEFAULT_SESSION_TIMEOUT};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const CURRENT_FILE: &str = "current.jsonl";
pub const SESSIONS_DIR: &str = "sessions";

const ARCHIVE_NAME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3fZ";

// ============================================================================
// Session
// ============================================================================

/// Active session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    fn mint(now: DateTime<Utc>) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            start_time: now,
            last_activity: now,
        }
    }

    fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        idle_exceeds(self.last_activity, now, timeout)
    }
}

fn idle_exceeds(last: DateTime<Utc>, now: DateTime<Utc>, timeout: Duration) -> bool {
    // 시계가 거꾸로 가면 idle 0 으로 취급
    (now - last).to_std().unwrap_or_default() > timeout
}

// ============================================================================
// TraceStore
// ============================================================================

/// Append-only trace log for one project
pub struct TraceStore {
    project: String,
    dir: PathBuf,
    timeout: Duration,
    /// `None` until first use and after `close`
    session: Mutex<Option<Session>>,
    /// current.jsonl 이 개행 없이 끝남 (중단된 쓰기) - 다음 기록 앞에 개행 추가
    torn_tail: AtomicBool,
}

impl TraceStore {
    pub fn new(project: impl Into<String>, dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            project: project.into(),
            dir: dir.into(),
            timeout,
            session: Mutex::new(None),
            torn_tail: AtomicBool::new(false),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn current_path(&self) -> PathBuf {
        self.dir.join(CURRENT_FILE)
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.dir.join(SESSIONS_DIR)
    }

    /// Current session, if one is active in this process
    pub async fn session(&self) -> Option<Session> {
        self.session.lock().await.clone()
    }

    /// Append one trace, rotating the session first if it went idle
    pub async fn record(&self, trace: NewTrace) -> Result<TraceEntry> {
        let mut guard = self.session.lock().await;
        let now = Utc::now();

        let session = self.active_session(&mut guard, now).await?;
        let entry = trace.into_entry(&session.session_id, &self.project, now);

        let mut line = String::new();
        if self.torn_tail.swap(false, Ordering::Relaxed) {
            line.push('\n');
        }
        line.push_str(&serde_json::to_string(&entry)?);
        line.push('\n');

        tokio::fs::create_dir_all(&self.dir).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.current_path())
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        session.last_activity = now;
        debug!(
            project = %self.project,
            tool = %entry.tool,
            session_id = %entry.session_id,
            "Trace recorded"
        );

        Ok(entry)
    }

    /// Session to append to; resumes, rotates or mints as needed
    async fn active_session<'a>(
        &self,
        slot: &'a mut Option<Session>,
        now: DateTime<Utc>,
    ) -> Result<&'a mut Session> {
        match slot.take() {
            Some(session) if !session.is_expired(now, self.timeout) => {
                *slot = Some(session);
            }
            Some(session) => {
                info!(
                    project = %self.project,
                    session_id = %session.session_id,
                    "Trace session idle, rotating"
                );
                self.archive_current(Some(session.start_time)).await?;
                *slot = Some(Session::mint(now));
            }
            None => {
                *slot = Some(self.load_or_mint(now).await?);
            }
        }

        slot.as_mut()
            .ok_or_else(|| Error::Internal("trace session missing after init".to_string()))
    }

    /// 첫 사용 시 current.jsonl 에서 세션 복원
    ///
    /// 파싱 가능한 첫 줄과 마지막 줄을 사용합니다. 중단된 쓰기로 잘린
    /// 마지막 줄은 건너뛰고, 다음 기록이 새 줄에서 시작하도록 표시합니다.
    async fn load_or_mint(&self, now: DateTime<Utc>) -> Result<Session> {
        let path = self.current_path();
        if !tokio::fs::try_exists(&path).await? {
            return Ok(Session::mint(now));
        }

        let raw = tokio::fs::read(&path).await?;
        let torn = raw.last().is_some_and(|b| *b != b'\n');
        let content = String::from_utf8_lossy(&raw);
        let parse = |line: &str| serde_json::from_str::<TraceEntry>(line).ok();
        let first = content.lines().find_map(parse);
        let last = content.lines().rev().find_map(parse);

        if content.trim().is_empty() {
            // 빈 파일 - 그대로 이어서 기록
            self.torn_tail.store(torn, Ordering::Relaxed);
            return Ok(Session::mint(now));
        }

        match (first, last) {
            (Some(first), Some(last)) if !idle_exceeds(last.timestamp, now, self.timeout) => {
                if torn {
                    warn!(project = %self.project, "Trace log ends mid-line, skipping torn tail");
                }
                self.torn_tail.store(torn, Ordering::Relaxed);
                debug!(
                    project = %self.project,
                    session_id = %first.session_id,
                    "Resuming trace session"
                );
                Ok(Session {
                    session_id: first.session_id,
                    start_time: first.timestamp,
                    last_activity: last.timestamp,
                })
            }
            (first, _) => {
                self.archive_current(first.map(|e| e.timestamp)).await?;
                Ok(Session::mint(now))
            }
        }
    }

    /// Move `current.jsonl` into `sessions/`; no-op when absent
    async fn archive_current(&self, start_time: Option<DateTime<Utc>>) -> Result<Option<PathBuf>> {
        let current = self.current_path();
        if !tokio::fs::try_exists(&current).await? {
            return Ok(None);
        }

        let start_time = match start_time {
            Some(t) => t,
            None => self.first_timestamp(&current).await.unwrap_or_else(Utc::now),
        };

        let sessions = self.sessions_dir();
        tokio::fs::create_dir_all(&sessions).await?;

        let base = start_time.format(ARCHIVE_NAME_FORMAT).to_string();
        let mut target = sessions.join(format!("{}.jsonl", base));
        let mut suffix = 1;
        while tokio::fs::try_exists(&target).await? {
            target = sessions.join(format!("{}-{}.jsonl", base, suffix));
            suffix += 1;
        }

        tokio::fs::rename(&current, &target).await.map_err(|e| {
            Error::Storage(format!(
                "Failed to archive {} to {}: {}",
                current.display(),
                target.display(),
                e
            ))
        })?;

        info!(
            project = %self.project,
            archive = %target.display(),
            "Trace session archived"
        );
        Ok(Some(target))
    }

    async fn first_timestamp(&self, path: &Path) -> Option<DateTime<Utc>> {
        let raw = tokio::fs::read(path).await.ok()?;
        String::from_utf8_lossy(&raw)
            .lines()
            .filter_map(|l| serde_json::from_str::<TraceEntry>(l).ok())
            .map(|e| e.timestamp)
            .next()
    }

    /// Archive the current log and forget the session. Idempotent.
    pub async fn close(&self) -> Result<()> {
        let mut guard = self.session.lock().await;
        let start_time = guard.take().map(|s| s.start_time);
        self.archive_current(start_time).await?;
        Ok(())
    }

    /// Normalized records from current and archived sessions, most recent first
    pub async fn read(&self, query: &TraceQuery) -> Result<Vec<TraceRecord>> {
        // rotation 과 겹치지 않도록 잠금
        let _guard = self.session.lock().await;

        let mut files = Vec::new();
        let sessions = self.sessions_dir();
        if tokio::fs::try_exists(&sessions).await? {
            let mut dir = tokio::fs::read_dir(&sessions).await?;
            while let Some(entry) = dir.next_entry().await? {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "jsonl") {
                    files.push(path);
                }
            }
        }
        // archive names sort chronologically
        files.sort();

        let current = self.current_path();
        if tokio::fs::try_exists(&current).await? {
            files.push(current);
        }

        let mut records = Vec::new();
        for path in &files {
            let raw = tokio::fs::read(path).await?;
            for (index, line) in String::from_utf8_lossy(&raw).lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<TraceEntry>(line) {
                    Ok(entry) => {
                        if let Some(record) = TraceRecord::from_entry(entry) {
                            if query.matches(&record) {
                                records.push(record);
                            }
                        }
                    }
                    Err(e) => {
                        warn!(
                            file = %path.display(),
                            line = index + 1,
                            error = %e,
                            "Skipping malformed trace line"
                        );
                    }
                }
            }
        }

        records.reverse();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(query.paginate(records))
    }
}

impl std::fmt::Debug for TraceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceStore")
            .field("project", &self.project)
            .field("dir", &self.dir)
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ============================================================================
// TraceRegistry
// ============================================================================

/// One `TraceStore` per project for the life of the process
#[derive(Debug)]
pub struct TraceRegistry {
    projects: ProjectStore,
    timeout: Duration,
    stores: RwLock<HashMap<String, Arc<TraceStore>>>,
}

impl TraceRegistry {
    pub fn new(projects: ProjectStore, timeout: Duration) -> Self {
        Self {
            projects,
            timeout,
            stores: RwLock::new(HashMap::new()),
        }
    }

    /// Session timeout taken from the global config
    pub fn from_global(projects: ProjectStore, global: &GlobalConfig) -> Self {
        let timeout = global.logging.traces.session_timeout();
        Self::new(projects, timeout)
    }

    pub fn with_default_timeout(projects: ProjectStore) -> Self {
        Self::new(projects, DEFAULT_SESSION_TIMEOUT)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Store for a project, created on first use
    pub fn store(&self, project: &str) -> Result<Arc<TraceStore>> {
        if let Some(store) = self.stores.read().get(project) {
            return Ok(Arc::clone(store));
        }

        let dir = self.projects.traces_dir(project)?;
        let mut stores = self.stores.write();
        let store = stores
            .entry(project.to_string())
            .or_insert_with(|| Arc::new(TraceStore::new(project, dir, self.timeout)));
        Ok(Arc::clone(store))
    }

    pub async fn record(&self, project: &str, trace: NewTrace) -> Result<TraceEntry> {
        self.store(project)?.record(trace).await
    }

    pub async fn read(&self, project: &str, query: &TraceQuery) -> Result<Vec<TraceRecord>> {
        self.store(project)?.read(query).await
    }

    /// Close every store; failures are logged
    pub async fn close_all(&self) {
        let stores: Vec<Arc<TraceStore>> = self.stores.read().values().cloned().collect();
        for store in stores {
            if let Err(e) = store.close().await {
                warn!(project = %store.project(), error = %e, "Failed to close trace store");
            }
        }
    }
}
