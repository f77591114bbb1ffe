//! # chdb
//!
//! Declarative management of ClickHouse databases.
//!
//! A database is declared with a name, an engine and its settings, and
//! whether it should exist. A reconciliation pass discovers what the server
//! has, pairs it with the declarations and converges each database by
//! creating or dropping it.
//!
//! ## Core Concepts
//!
//! - **Declaration**: desired state of one database ([`DatabaseDeclaration`])
//! - **Discovery**: one read-only query listing every database with its
//!   engine and table count ([`list_instances`])
//! - **Pass**: the pairings of one discovery ([`ReconcileContext`]) and the
//!   operations applied to them ([`Reconciler`], [`execute`])
//! - **Safety gate**: a drop is refused for databases holding tables unless
//!   the declaration sets `force`; MySQL connector databases are exempt
//!
//! ## Example
//!
//! ```ignore
//! use chdb::{
//!     ClickhouseClient, ClientSettings, DatabaseDeclaration, EngineSpec,
//!     ExecuteOptions, Reconciler, execute_simple,
//! };
//!
//! let client = ClickhouseClient::new(ClientSettings::default());
//! let decls = vec![DatabaseDeclaration::new("analytics", EngineSpec::Ordinary)?];
//!
//! let mut ctx = Reconciler::new(&client).prefetch(decls)?;
//! let summary = execute_simple(&client, &mut ctx, &ExecuteOptions::default())?;
//! println!("{} changes", summary.total_changes());
//! ```
//!
//! ## Provider Traits
//!
//! - [`RemoteExecutor`]: sends statements to the server
//! - [`ProgressCallback`]: receives progress updates
//! - [`ConfirmCallback`]: handles user confirmations
//!
//! The crate has no dependency on a terminal UI or on a particular way of
//! reaching the server.

pub mod client;
pub mod context;
pub mod diff;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod reconciler;
pub mod schema;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use client::{ClickhouseClient, ClientSettings};
pub use context::{
    AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback, RemoteExecutor,
};
pub use diff::{Change, DiffSummary, ResourceDiff, compute_diffs};
pub use discovery::{DISCOVERY_QUERY, list_instances, parse_instances};
pub use error::{Error, Result};
pub use executor::{execute, execute_simple};
pub use reconciler::{ReconcileContext, ReconciledResource, Reconciler, destroy_permitted};
pub use schema::{
    DatabaseDeclaration, RawDeclaration, render_engine_clause, validate_engine_settings,
    validate_name,
};
pub use types::{
    ApplyResult, CommandOutput, DiscoveredDatabase, Engine, EngineSettings, EngineSpec, Ensure,
    ExecuteOptions, ExecuteSummary, MySqlSource, Observed, Outcome, SettingValue, VerifyMode,
};
