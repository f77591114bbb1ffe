//! In-memory ClickHouse stand-in for tests

use crate::context::RemoteExecutor;
use crate::discovery::DISCOVERY_QUERY;
use crate::types::{CommandOutput, DiscoveredDatabase};
use std::sync::Mutex;

/// Records every statement and keeps a database list that CREATE and DROP
/// statements update.
#[derive(Default)]
pub(crate) struct FakeServer {
    databases: Mutex<Vec<DiscoveredDatabase>>,
    failing: Vec<(String, String)>,
    ignore_drops: bool,
    discovery_limit: Option<usize>,
    calls: Mutex<Vec<String>>,
}

impl FakeServer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_database(self, name: &str, engine: &str, tables: u64) -> Self {
        self.databases.lock().unwrap().push(DiscoveredDatabase {
            name: name.to_string(),
            engine: engine.to_string(),
            tables,
        });
        self
    }

    /// Fail every statement starting with `prefix`
    pub(crate) fn fail_on(mut self, prefix: &str, stderr: &str) -> Self {
        self.failing.push((prefix.to_string(), stderr.to_string()));
        self
    }

    /// Report DROP as successful without removing anything
    pub(crate) fn ignoring_drops(mut self) -> Self {
        self.ignore_drops = true;
        self
    }

    /// Answer the first `n` discovery queries, then fail every later one
    pub(crate) fn failing_discovery_after(mut self, n: usize) -> Self {
        self.discovery_limit = Some(n);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Statements other than discovery, in order
    pub(crate) fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c != DISCOVERY_QUERY)
            .collect()
    }

    pub(crate) fn discovery_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.as_str() == DISCOVERY_QUERY)
            .count()
    }

    pub(crate) fn has_database(&self, name: &str) -> bool {
        self.databases.lock().unwrap().iter().any(|d| d.name == name)
    }

    fn listing(&self) -> String {
        self.databases
            .lock()
            .unwrap()
            .iter()
            .map(|d| format!("{}\t{}\t{}\n", d.name, d.engine, d.tables))
            .collect()
    }
}

impl RemoteExecutor for FakeServer {
    fn run(&self, statement: &str) -> std::io::Result<CommandOutput> {
        self.calls.lock().unwrap().push(statement.to_string());

        if let Some((_, stderr)) = self
            .failing
            .iter()
            .find(|(prefix, _)| statement.starts_with(prefix.as_str()))
        {
            return Ok(CommandOutput::failed(stderr.clone()));
        }

        if statement == DISCOVERY_QUERY {
            if self.discovery_limit.is_some_and(|n| self.discovery_calls() > n) {
                return Ok(CommandOutput::failed("Code: 210. Connection refused"));
            }
            return Ok(CommandOutput::ok(self.listing()));
        }

        if let Some(rest) = statement.strip_prefix("CREATE DATABASE ") {
            let (name, clause) = rest.split_once(" ENGINE=").unwrap();
            let engine = clause.split('(').next().unwrap();
            self.databases.lock().unwrap().push(DiscoveredDatabase {
                name: name.to_string(),
                engine: engine.to_string(),
                tables: 0,
            });
        } else if let Some(name) = statement.strip_prefix("DROP DATABASE ") {
            if !self.ignore_drops {
                self.databases.lock().unwrap().retain(|d| d.name != name);
            }
        }

        Ok(CommandOutput::ok(""))
    }
}
