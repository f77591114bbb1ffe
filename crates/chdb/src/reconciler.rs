//! Reconciliation of declared databases against the server
//!
//! A pass starts with [`Reconciler::prefetch`], which runs discovery once and
//! pairs every declaration with what the server reported. The resulting
//! [`ReconcileContext`] lives for that pass only.
//!
//! Operations never mutate a pairing themselves. They return an [`Outcome`]
//! and the caller stores it with [`ReconciledResource::commit`].

use crate::context::RemoteExecutor;
use crate::discovery::list_instances;
use crate::error::{Error, Result};
use crate::schema::DatabaseDeclaration;
use crate::types::{DiscoveredDatabase, Engine, Ensure, Observed, Outcome, VerifyMode};
use std::collections::HashSet;

/// A declaration paired with the database discovery found for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledResource {
    declaration: DatabaseDeclaration,
    observed: Observed,
}

impl ReconciledResource {
    pub fn new(declaration: DatabaseDeclaration, observed: Observed) -> Self {
        Self {
            declaration,
            observed,
        }
    }

    pub fn name(&self) -> &str {
        self.declaration.name()
    }

    pub fn declaration(&self) -> &DatabaseDeclaration {
        &self.declaration
    }

    /// Cached remote state for this pass
    pub fn observed(&self) -> &Observed {
        &self.observed
    }

    /// Store the state an operation left behind
    pub fn commit(&mut self, outcome: &Outcome) {
        self.observed = outcome.new_state.clone();
    }
}

/// Pairings for a single reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct ReconcileContext {
    resources: Vec<ReconciledResource>,
    discovered: Vec<DiscoveredDatabase>,
}

impl ReconcileContext {
    pub fn resources(&self) -> &[ReconciledResource] {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut [ReconciledResource] {
        &mut self.resources
    }

    /// Everything discovery returned, declared or not
    pub fn discovered(&self) -> &[DiscoveredDatabase] {
        &self.discovered
    }

    pub fn get(&self, name: &str) -> Option<&ReconciledResource> {
        self.resources.iter().find(|r| r.name() == name)
    }

    /// Databases on the server that no declaration mentions
    pub fn undeclared(&self) -> impl Iterator<Item = &DiscoveredDatabase> {
        self.discovered
            .iter()
            .filter(|db| self.get(&db.name).is_none())
    }

    /// Keep only resources whose name contains `target`
    pub fn filter_by_target(mut self, target: Option<&str>) -> Self {
        if let Some(t) = target {
            self.resources.retain(|r| r.name().contains(t));
        }
        self
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Whether the safety gate lets `observed` be dropped
///
/// Empty databases and MySQL connectors hold no data of their own; anything
/// else needs `force`.
pub fn destroy_permitted(observed: &Observed, force: bool) -> bool {
    match observed {
        Observed::Absent => true,
        Observed::Present { engine, tables } => {
            *tables == 0 || Engine::from_literal(engine) == Some(Engine::MySql) || force
        }
    }
}

/// Applies create and destroy operations through a [`RemoteExecutor`]
pub struct Reconciler<'a, E: RemoteExecutor + ?Sized> {
    executor: &'a E,
    verify: VerifyMode,
}

impl<'a, E: RemoteExecutor + ?Sized> Reconciler<'a, E> {
    pub fn new(executor: &'a E) -> Self {
        Self {
            executor,
            verify: VerifyMode::TrustLocal,
        }
    }

    pub fn with_verify(mut self, verify: VerifyMode) -> Self {
        self.verify = verify;
        self
    }

    /// Discover the server once and pair each declaration with its database
    ///
    /// Declarations without a match start out absent. Duplicate names are
    /// rejected before the server is queried.
    pub fn prefetch(&self, declarations: Vec<DatabaseDeclaration>) -> Result<ReconcileContext> {
        let mut seen = HashSet::new();
        for decl in &declarations {
            if !seen.insert(decl.name()) {
                return Err(Error::DuplicateDeclaration {
                    name: decl.name().to_string(),
                });
            }
        }

        let discovered = list_instances(self.executor)?;

        let resources = declarations
            .into_iter()
            .map(|declaration| {
                let observed = discovered
                    .iter()
                    .find(|db| db.name == declaration.name())
                    .map(Observed::from)
                    .unwrap_or_default();
                ReconciledResource::new(declaration, observed)
            })
            .collect();

        Ok(ReconcileContext {
            resources,
            discovered,
        })
    }

    /// Create the declared database
    ///
    /// Issues `CREATE DATABASE` regardless of the cached state.
    pub fn create(&self, resource: &ReconciledResource) -> Result<Outcome> {
        let decl = resource.declaration();
        log::info!("Creating database {} (ENGINE={})", decl.name(), decl.engine());
        log::debug!("Issuing {}", decl.redacted_create_statement());

        self.executor
            .run_capture(&decl.create_statement())
            .map_err(|message| Error::RemoteMutation {
                statement: decl.redacted_create_statement(),
                message,
            })?;

        let new_state = match self.verify {
            VerifyMode::TrustLocal => Observed::Present {
                engine: decl.engine().as_str().to_string(),
                tables: 0,
            },
            VerifyMode::Rediscover => self.rediscover(decl.name())?,
        };

        Ok(Outcome {
            succeeded: new_state.is_present(),
            new_state,
        })
    }

    /// Drop the database if the safety gate allows it
    ///
    /// A database already absent in the cached state is a no-op: nothing is
    /// sent to the server.
    pub fn destroy(&self, resource: &ReconciledResource) -> Result<Outcome> {
        let decl = resource.declaration();
        let observed = resource.observed();

        if !observed.is_present() {
            log::debug!("Database {} already absent", decl.name());
            return Ok(Outcome {
                succeeded: true,
                new_state: Observed::Absent,
            });
        }

        if !destroy_permitted(observed, decl.force()) {
            log::info!(
                "Refusing to drop {}: {} tables and force is not set",
                decl.name(),
                observed.tables()
            );
            return Err(Error::RefusedUnsafeDestroy {
                name: decl.name().to_string(),
                tables: observed.tables(),
            });
        }

        log::info!("Dropping database {}", decl.name());
        let statement = decl.drop_statement();
        log::debug!("Issuing {statement}");
        self.executor
            .run_capture(&statement)
            .map_err(|message| Error::RemoteMutation { statement, message })?;

        let new_state = match self.verify {
            VerifyMode::TrustLocal => Observed::Absent,
            VerifyMode::Rediscover => self.rediscover(decl.name())?,
        };

        Ok(Outcome {
            succeeded: !new_state.is_present(),
            new_state,
        })
    }

    /// Remove the database; same as [`Self::destroy`]
    pub fn delete(&self, resource: &ReconciledResource) -> Result<Outcome> {
        self.destroy(resource)
    }

    /// Recreate the database with the declared engine
    ///
    /// ClickHouse cannot change a database engine in place, so this is a
    /// destroy followed by a create. Data in the old database is lost; the
    /// destroy safety gate still applies.
    ///
    /// The drop is committed to `resource` before the create runs, so a
    /// failed create leaves the pairing absent. The returned outcome is the
    /// create's, or the drop's if the drop did not succeed.
    pub fn change_engine(&self, resource: &mut ReconciledResource) -> Result<Outcome> {
        let dropped = self.destroy(resource)?;
        resource.commit(&dropped);
        if !dropped.succeeded {
            return Ok(dropped);
        }
        self.create(resource)
    }

    /// Whether the resource is present in the cached state
    ///
    /// This does not query the server.
    pub fn exists(&self, resource: &ReconciledResource) -> bool {
        resource.observed().is_present()
    }

    /// Engine literal currently observed for the resource
    pub fn engine<'r>(&self, resource: &'r ReconciledResource) -> Option<&'r str> {
        resource.observed().engine()
    }

    /// Re-run discovery for one resource and check it against its declaration
    pub fn verify(&self, resource: &ReconciledResource) -> Result<Outcome> {
        let new_state = self.rediscover(resource.name())?;
        let succeeded = match resource.declaration().ensure() {
            Ensure::Present => new_state.is_present(),
            Ensure::Absent => !new_state.is_present(),
        };
        Ok(Outcome {
            succeeded,
            new_state,
        })
    }

    fn rediscover(&self, name: &str) -> Result<Observed> {
        let found = list_instances(self.executor)?
            .iter()
            .find(|db| db.name == name)
            .map(Observed::from)
            .unwrap_or_default();
        Ok(found)
    }
}
