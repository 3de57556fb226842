//! Trace Types - 트레이스 엔트리 및 조회 타입
//!
//! 쓰기 측은 `NewTrace` → `TraceEntry` (JSONL 한 줄),
//! 읽기 측은 `TraceEntry` → `TraceRecord` (정규화) 로 변환됩니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

// ============================================================================
// Tool 이름
// ============================================================================

pub const TOOL_RUN_COMMAND: &str = "run_command";
/// Legacy name for `run_command`, accepted on read
pub const TOOL_BASH: &str = "bash";
pub const TOOL_APPLY_PATCH: &str = "apply_patch";
pub const TOOL_WRITE_FILE: &str = "write_file";
pub const TOOL_WRITE_TRACE: &str = "write_trace";
pub const TOOL_START: &str = "start";
pub const TOOL_STOP: &str = "stop";

// ============================================================================
// Trace Entry (persisted)
// ============================================================================

/// 트레이스 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceType {
    /// 컨테이너에 영향을 준 동작
    Execution,
    /// 메모, 요약 등 관찰 기록
    Observation,
}

/// One immutable JSONL record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub id: String,
    pub session_id: String,
    pub project_name: String,
    pub timestamp: DateTime<Utc>,
    pub tool: String,
    pub trace_type: TraceType,

    /// Tool-specific fields, stored inline
    #[serde(flatten)]
    pub payload: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

/// 기록 요청 - id / session / timestamp 는 저장소가 채움
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrace {
    pub tool: String,
    pub trace_type: TraceType,
    pub payload: Map<String, Value>,
    pub result: Option<Value>,
}

impl NewTrace {
    pub fn execution(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            trace_type: TraceType::Execution,
            payload: Map::new(),
            result: None,
        }
    }

    pub fn observation(tool: impl Into<String>) -> Self {
        Self {
            trace_type: TraceType::Observation,
            ..Self::execution(tool)
        }
    }

    /// 노트 (`write_trace`)
    pub fn note(note_type: NoteType, text: impl Into<String>) -> Self {
        Self::observation(TOOL_WRITE_TRACE)
            .with("type", note_type.as_str())
            .with("text", text.into())
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }

    pub fn with_result(mut self, result: impl Into<Value>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub(crate) fn into_entry(
        self,
        session_id: &str,
        project_name: &str,
        timestamp: DateTime<Utc>,
    ) -> TraceEntry {
        TraceEntry {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            project_name: project_name.to_string(),
            timestamp,
            tool: self.tool,
            trace_type: self.trace_type,
            payload: self.payload,
            result: self.result,
        }
    }
}

// ============================================================================
// Kinds (read side)
// ============================================================================

/// Normalized kind of a trace as returned by reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    Command,
    ApplyPatch,
    WriteFile,
    Note,
}

impl TraceKind {
    /// `None` for tools that are not surfaced (start / stop)
    pub fn from_tool(tool: &str) -> Option<Self> {
        match tool {
            TOOL_RUN_COMMAND | TOOL_BASH => Some(Self::Command),
            TOOL_APPLY_PATCH => Some(Self::ApplyPatch),
            TOOL_WRITE_FILE => Some(Self::WriteFile),
            TOOL_WRITE_TRACE => Some(Self::Note),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::ApplyPatch => "apply_patch",
            Self::WriteFile => "write_file",
            Self::Note => "note",
        }
    }
}

impl fmt::Display for TraceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 노트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteType {
    User,
    Agent,
    Summary,
}

impl NoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
            Self::Summary => "summary",
        }
    }
}

impl fmt::Display for NoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "agent" => Ok(Self::Agent),
            "summary" => Ok(Self::Summary),
            other => Err(Error::InvalidInput(format!(
                "Unknown note type '{}' (expected user, agent or summary)",
                other
            ))),
        }
    }
}

/// `type` filter of a trace read: a kind or a note subtype
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceFilter {
    Kind(TraceKind),
    Note(NoteType),
}

impl FromStr for TraceFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim().to_ascii_lowercase();
        let filter = match value.as_str() {
            "command" | TOOL_RUN_COMMAND | TOOL_BASH => Self::Kind(TraceKind::Command),
            TOOL_APPLY_PATCH => Self::Kind(TraceKind::ApplyPatch),
            TOOL_WRITE_FILE => Self::Kind(TraceKind::WriteFile),
            "note" => Self::Kind(TraceKind::Note),
            _ => Self::Note(value.parse().map_err(|_| {
                Error::InvalidInput(format!("Unknown trace type '{}'", s.trim()))
            })?),
        };
        Ok(filter)
    }
}

// ============================================================================
// Trace Record (normalized)
// ============================================================================

/// Normalized view of a `TraceEntry`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRecord {
    pub id: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: TraceKind,
    pub tool: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_type: Option<NoteType>,

    #[serde(flatten)]
    pub payload: Map<String, Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl TraceRecord {
    pub fn from_entry(entry: TraceEntry) -> Option<Self> {
        let kind = TraceKind::from_tool(&entry.tool)?;
        let note_type = match kind {
            TraceKind::Note => entry
                .payload
                .get("type")
                .and_then(Value::as_str)
                .and_then(|t| t.parse().ok()),
            _ => None,
        };

        Some(Self {
            id: entry.id,
            session_id: entry.session_id,
            timestamp: entry.timestamp,
            kind,
            tool: entry.tool,
            note_type,
            payload: entry.payload,
            result: entry.result,
        })
    }

    fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    fn result_str(&self, key: &str) -> Option<&str> {
        self.result.as_ref()?.get(key).and_then(Value::as_str)
    }

    pub fn command(&self) -> Option<&str> {
        self.payload_str("command")
    }

    pub fn text(&self) -> Option<&str> {
        self.payload_str("text")
    }

    /// Command / text / output fields that `search` looks at
    fn searchable(&self) -> impl Iterator<Item = &str> {
        ["command", "text", "patch", "path"]
            .into_iter()
            .filter_map(|k| self.payload_str(k))
            .chain(
                ["stdout", "stderr", "output"]
                    .into_iter()
                    .filter_map(|k| self.result_str(k)),
            )
    }
}

// ============================================================================
// Trace Query
// ============================================================================

/// 트레이스 조회 조건
#[derive(Debug, Clone, Default)]
pub struct TraceQuery {
    pub filter: Option<TraceFilter>,

    /// Case-insensitive substring
    pub search: Option<String>,

    pub skip: usize,

    pub limit: Option<usize>,
}

impl TraceQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: TraceFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        if !search.trim().is_empty() {
            self.search = Some(search.to_lowercase());
        }
        self
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// 레코드가 조건과 매칭되는지 확인
    pub fn matches(&self, record: &TraceRecord) -> bool {
        match self.filter {
            Some(TraceFilter::Kind(kind)) if record.kind != kind => return false,
            Some(TraceFilter::Note(note)) if record.note_type != Some(note) => return false,
            _ => {}
        }

        if let Some(ref needle) = self.search {
            let needle = needle.to_lowercase();
            if !record
                .searchable()
                .any(|field| field.to_lowercase().contains(&needle))
            {
                return false;
            }
        }

        true
    }

    /// skip / limit 적용
    pub fn paginate(&self, records: Vec<TraceRecord>) -> Vec<TraceRecord> {
        let iter = records.into_iter().skip(self.skip);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}
