//! Declaration schema
//!
//! A [`DatabaseDeclaration`] can only be built through the checks in this
//! module, so every declaration that reaches the reconciler has a valid name
//! and an engine whose settings match it. The loosely typed engine/settings
//! pair from configuration is converted exactly once, in
//! [`EngineSpec::from_parts`]; validation and clause rendering both go
//! through it.

use crate::error::{Error, Result};
use crate::types::{Engine, EngineSettings, EngineSpec, Ensure, MySqlSource, SettingValue};
use regex::Regex;
use serde::Deserialize;
use std::num::NonZeroU64;
use std::sync::LazyLock;

/// Allowed database names
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-zA-Z_]+$").expect("name pattern is valid"));

/// Check that a database name only uses `[0-9a-zA-Z_]`
pub fn validate_name(name: &str) -> Result<()> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(Error::InvalidIdentifier {
            name: name.to_string(),
        })
    }
}

/// Check that `settings` has the shape `engine` requires
pub fn validate_engine_settings(engine: Engine, settings: Option<&EngineSettings>) -> Result<()> {
    EngineSpec::from_parts(engine, settings).map(|_| ())
}

/// Render the `ENGINE=` clause for an engine/settings pair
pub fn render_engine_clause(engine: Engine, settings: Option<&EngineSettings>) -> Result<String> {
    Ok(EngineSpec::from_parts(engine, settings)?.clause())
}

impl EngineSpec {
    /// Convert an untyped engine/settings pair into a validated spec
    ///
    /// - `Lazy` needs an integer >= 1
    /// - `MySQL` needs exactly four strings
    /// - `Ordinary` needs no settings (an empty list counts as none)
    pub fn from_parts(engine: Engine, settings: Option<&EngineSettings>) -> Result<Self> {
        let spec = match (engine, settings) {
            (Engine::Lazy, Some(EngineSettings::Integer(secs))) => u64::try_from(*secs)
                .ok()
                .and_then(NonZeroU64::new)
                .map(|expiration| Self::Lazy { expiration }),
            (Engine::MySql, Some(EngineSettings::List(items))) => mysql_source(items).map(Self::MySql),
            (Engine::Ordinary, None) => Some(Self::Ordinary),
            (Engine::Ordinary, Some(EngineSettings::List(items))) if items.is_empty() => {
                Some(Self::Ordinary)
            }
            _ => None,
        };

        spec.ok_or_else(|| Error::EngineSettingsMismatch {
            engine,
            settings: describe_settings(settings),
        })
    }
}

fn mysql_source(items: &[SettingValue]) -> Option<MySqlSource> {
    let strings: Vec<&str> = items
        .iter()
        .map(|item| match item {
            SettingValue::Text(s) => Some(s.as_str()),
            _ => None,
        })
        .collect::<Option<_>>()?;

    match strings.as_slice() {
        [endpoint, database, user, password] => Some(MySqlSource {
            endpoint: (*endpoint).to_string(),
            database: (*database).to_string(),
            user: (*user).to_string(),
            password: (*password).to_string(),
        }),
        _ => None,
    }
}

fn describe_settings(settings: Option<&EngineSettings>) -> String {
    settings.map_or_else(|| "undef".to_string(), ToString::to_string)
}

/// A database declaration exactly as it appears in configuration
///
/// Unknown keys are ignored. Nothing here is validated yet; see
/// [`DatabaseDeclaration::from_raw`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawDeclaration {
    pub name: String,
    #[serde(default)]
    pub ensure: Ensure,
    #[serde(default)]
    pub engine: Engine,
    #[serde(default)]
    pub engine_settings: Option<EngineSettings>,
    #[serde(default)]
    pub force: bool,
}

/// Desired state of one database
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawDeclaration")]
pub struct DatabaseDeclaration {
    name: String,
    ensure: Ensure,
    spec: EngineSpec,
    force: bool,
}

impl DatabaseDeclaration {
    /// Declare a present database with the given engine
    pub fn new(name: impl Into<String>, spec: EngineSpec) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            ensure: Ensure::Present,
            spec,
            force: false,
        })
    }

    /// Validate a raw declaration from configuration
    pub fn from_raw(raw: RawDeclaration) -> Result<Self> {
        validate_name(&raw.name)?;
        let spec = EngineSpec::from_parts(raw.engine, raw.engine_settings.as_ref())?;
        Ok(Self {
            name: raw.name,
            ensure: raw.ensure,
            spec,
            force: raw.force,
        })
    }

    pub fn with_ensure(mut self, ensure: Ensure) -> Self {
        self.ensure = ensure;
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ensure(&self) -> Ensure {
        self.ensure
    }

    pub fn engine(&self) -> Engine {
        self.spec.engine()
    }

    pub fn spec(&self) -> &EngineSpec {
        &self.spec
    }

    /// Whether removal may proceed even if the database holds tables
    pub fn force(&self) -> bool {
        self.force
    }

    /// Change the engine, validating it together with its new settings
    ///
    /// On error the declaration is left unchanged.
    pub fn set_engine(&mut self, engine: Engine, settings: Option<&EngineSettings>) -> Result<()> {
        self.spec = EngineSpec::from_parts(engine, settings)?;
        Ok(())
    }

    pub fn create_statement(&self) -> String {
        format!("CREATE DATABASE {} ENGINE={}", self.name, self.spec.clause())
    }

    /// `create_statement` with credentials masked
    pub fn redacted_create_statement(&self) -> String {
        format!(
            "CREATE DATABASE {} ENGINE={}",
            self.name,
            self.spec.redacted_clause()
        )
    }

    pub fn drop_statement(&self) -> String {
        format!("DROP DATABASE {}", self.name)
    }
}

impl TryFrom<RawDeclaration> for DatabaseDeclaration {
    type Error = Error;

    fn try_from(raw: RawDeclaration) -> Result<Self> {
        Self::from_raw(raw)
    }
}
