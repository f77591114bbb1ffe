//! Core types for declarative database management

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU64;
use std::process::Output;

/// Storage or connector strategy backing a database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Engine {
    /// Keeps tables in RAM only for `expiration` seconds after last access
    Lazy,
    /// Connector to a database on a remote MySQL server
    #[serde(rename = "MySQL")]
    MySql,
    /// Plain local storage
    #[default]
    Ordinary,
}

impl Engine {
    /// The literal ClickHouse uses for this engine
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lazy => "Lazy",
            Self::MySql => "MySQL",
            Self::Ordinary => "Ordinary",
        }
    }

    /// Map a server-side engine literal to a managed engine
    pub fn from_literal(literal: &str) -> Option<Self> {
        match literal {
            "Lazy" => Some(Self::Lazy),
            "MySQL" => Some(Self::MySql),
            "Ordinary" => Some(Self::Ordinary),
            _ => None,
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a database should exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    #[default]
    Present,
    Absent,
}

/// A scalar inside untyped engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

/// Engine settings as they arrive from configuration, before validation
///
/// This is the only place the engine/settings pair is loosely typed. It is
/// converted into [`EngineSpec`] by [`EngineSpec::from_parts`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EngineSettings {
    Integer(i64),
    List(Vec<SettingValue>),
    Other(SettingValue),
}

impl EngineSettings {
    /// Build a list of string settings
    pub fn strings<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(
            values
                .into_iter()
                .map(|v| SettingValue::Text(v.into()))
                .collect(),
        )
    }
}

impl From<i64> for EngineSettings {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl fmt::Display for EngineSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Other(v) => write!(f, "{v}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Connection parameters of a MySQL-engine database
#[derive(Clone, PartialEq, Eq)]
pub struct MySqlSource {
    /// `host:port` of the MySQL server
    pub endpoint: String,
    /// Database name on the MySQL server
    pub database: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for MySqlSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlSource")
            .field("endpoint", &self.endpoint)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// A validated engine together with its settings
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EngineSpec {
    Lazy { expiration: NonZeroU64 },
    MySql(MySqlSource),
    #[default]
    Ordinary,
}

impl EngineSpec {
    /// The engine this spec configures
    pub fn engine(&self) -> Engine {
        match self {
            Self::Lazy { .. } => Engine::Lazy,
            Self::MySql(_) => Engine::MySql,
            Self::Ordinary => Engine::Ordinary,
        }
    }

    /// The `ENGINE=` clause used in `CREATE DATABASE`
    pub fn clause(&self) -> String {
        self.render(false)
    }

    /// The clause with the MySQL password masked, for logs and errors
    pub fn redacted_clause(&self) -> String {
        self.render(true)
    }

    fn render(&self, redact: bool) -> String {
        match self {
            Self::Lazy { expiration } => format!("Lazy({expiration})"),
            Self::MySql(source) => {
                let password = if redact { "***" } else { &source.password };
                let args = [
                    source.endpoint.as_str(),
                    source.database.as_str(),
                    source.user.as_str(),
                    password,
                ]
                .iter()
                .map(|arg| format!("'{}'", escape_literal(arg)))
                .collect::<Vec<_>>()
                .join(", ");
                format!("MySQL({args})")
            }
            Self::Ordinary => "Ordinary".to_string(),
        }
    }
}

impl fmt::Display for EngineSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clause())
    }
}

/// Escape a value for use inside a single-quoted ClickHouse string literal
fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// A database as reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDatabase {
    pub name: String,
    /// Engine literal exactly as the server reports it
    pub engine: String,
    /// Number of tables in the database
    pub tables: u64,
}

impl DiscoveredDatabase {
    /// The managed engine, if the server engine is one of them
    pub fn engine_kind(&self) -> Option<Engine> {
        Engine::from_literal(&self.engine)
    }
}

/// Cached view of a database's remote state within one pass
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Observed {
    #[default]
    Absent,
    Present { engine: String, tables: u64 },
}

impl Observed {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present { .. })
    }

    /// Observed engine literal, if present
    pub fn engine(&self) -> Option<&str> {
        match self {
            Self::Present { engine, .. } => Some(engine),
            Self::Absent => None,
        }
    }

    /// Observed table count; absent databases have none
    pub fn tables(&self) -> u64 {
        match self {
            Self::Present { tables, .. } => *tables,
            Self::Absent => 0,
        }
    }
}

impl From<&DiscoveredDatabase> for Observed {
    fn from(db: &DiscoveredDatabase) -> Self {
        Self::Present {
            engine: db.engine.clone(),
            tables: db.tables,
        }
    }
}

/// Result of a mutating operation on one database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Whether the database ended in the state the operation aimed for
    pub succeeded: bool,
    /// State to cache for the rest of the pass
    pub new_state: Observed,
}

/// How the result of a mutation is confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifyMode {
    /// Trust the statement's success code and the locally computed state
    #[default]
    TrustLocal,
    /// Re-run discovery after each mutation and use what the server reports
    Rediscover,
}

/// Result of applying one declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Database was created
    Created,
    /// Database was recreated with another engine
    Modified,
    /// Database was dropped
    Removed,
    /// Apply failed
    Failed { error: String },
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Created | Self::Modified | Self::Removed)
    }
}

/// Summary of a reconciliation pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.removed
    }

    /// Check if the pass was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of declarations processed
    pub fn total(&self) -> usize {
        self.created + self.modified + self.removed + self.skipped + self.failed + self.no_change
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for a reconciliation pass
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just report what would happen
    pub dry_run: bool,
    /// Number of declarations applied concurrently
    pub jobs: usize,
    /// How mutations are confirmed
    pub verify: VerifyMode,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 1,
            verify: VerifyMode::TrustLocal,
        }
    }
}

/// Output of one statement run through a remote executor
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub success: bool,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: output.stdout,
            stderr: output.stderr,
            success: output.status.success(),
        }
    }
}

impl CommandOutput {
    /// Successful output carrying `stdout`
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into().into_bytes(),
            stderr: Vec::new(),
            success: true,
        }
    }

    /// Failed output carrying `stderr`
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            stdout: Vec::new(),
            stderr: stderr.into().into_bytes(),
            success: false,
        }
    }

    /// Get stdout as a string
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a string
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}
