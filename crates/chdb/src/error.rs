//! Error types for database reconciliation
//!
//! Every failure is surfaced to the caller as-is. Nothing in this crate
//! retries: a retry policy, if any, belongs to whoever drives the pass.

use crate::types::Engine;
use thiserror::Error;

/// Errors that can occur while validating or reconciling databases
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Database name contains characters outside `[0-9a-zA-Z_]`
    #[error("invalid database name `{name}`: must match /^[0-9a-zA-Z_]+$/")]
    InvalidIdentifier { name: String },

    /// Engine settings do not have the shape required by the engine
    #[error("wrong engine_settings `{settings}` for engine `{engine}`")]
    EngineSettingsMismatch { engine: Engine, settings: String },

    /// Destroy blocked by the safety gate
    #[error("database `{name}` with {tables} tables won't be removed; use 'force'")]
    RefusedUnsafeDestroy { name: String, tables: u64 },

    /// The discovery query failed or returned unparseable output
    #[error("database discovery failed: {message}")]
    Discovery { message: String },

    /// A CREATE or DROP statement failed
    #[error("statement `{statement}` failed: {message}")]
    RemoteMutation { statement: String, message: String },

    /// The same database name was declared more than once in a pass
    #[error("database `{name}` is declared more than once")]
    DuplicateDeclaration { name: String },
}

impl Error {
    /// Whether the error aborts the whole pass rather than a single resource
    pub fn is_fatal_for_pass(&self) -> bool {
        matches!(
            self,
            Self::Discovery { .. } | Self::DuplicateDeclaration { .. }
        )
    }
}

/// Result type for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;
