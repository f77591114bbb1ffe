//! Configuration file loading
//!
//! ```toml
//! [client]
//! host = "localhost"
//!
//! [[database]]
//! name = "analytics"
//! engine = "Lazy"
//! engine_settings = 60
//! ```

use anyhow::{Context, Result, bail};
use chdb::{ClientSettings, DatabaseDeclaration, RawDeclaration};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

/// Parsed config file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How to reach the server
    pub client: ClientSettings,
    /// Declared databases, in file order
    #[serde(rename = "database")]
    pub databases: Vec<RawDeclaration>,
}

impl Config {
    /// Load and parse the config file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        config.client = expand_client(config.client);
        Ok(config)
    }

    /// Validate every declaration
    ///
    /// Fails on the first invalid entry or on a repeated name.
    pub fn declarations(&self) -> Result<Vec<DatabaseDeclaration>> {
        let mut seen = HashSet::new();
        let mut decls = Vec::with_capacity(self.databases.len());

        for (i, raw) in self.databases.iter().enumerate() {
            let decl = DatabaseDeclaration::from_raw(raw.clone())
                .with_context(|| format!("database #{} ({})", i + 1, raw.name))?;
            if !seen.insert(raw.name.clone()) {
                bail!(chdb::Error::DuplicateDeclaration {
                    name: raw.name.clone()
                });
            }
            decls.push(decl);
        }

        Ok(decls)
    }

    /// Check every declaration and collect all problems
    pub fn problems(&self) -> Vec<(String, chdb::Error)> {
        let mut seen = HashSet::new();
        let mut problems = Vec::new();

        for raw in &self.databases {
            if let Err(e) = DatabaseDeclaration::from_raw(raw.clone()) {
                problems.push((raw.name.clone(), e));
            }
            if !seen.insert(raw.name.as_str()) {
                problems.push((
                    raw.name.clone(),
                    chdb::Error::DuplicateDeclaration {
                        name: raw.name.clone(),
                    },
                ));
            }
        }

        problems
    }
}

/// Expand `~` and variables in client paths
fn expand_client(mut client: ClientSettings) -> ClientSettings {
    client.program = client
        .program
        .map(|p| paths::expand(&p).display().to_string());
    client.config_file = client
        .config_file
        .map(|p| paths::expand(&p.to_string_lossy()));
    client
}

/// Path of the config file that will be loaded
pub fn resolve(explicit: Option<&PathBuf>) -> Result<PathBuf> {
    paths::config_path(explicit.map(|p| p.to_string_lossy()).as_deref())
}
