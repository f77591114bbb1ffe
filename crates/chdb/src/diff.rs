//! Diff computation for declared databases

use crate::reconciler::{ReconcileContext, ReconciledResource, destroy_permitted};
use crate::types::{Engine, Ensure, Observed};
use serde::Serialize;

/// What a pass has to do to one database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Change {
    /// Database is missing and must be created
    Create { engine: Engine },
    /// Database exists and must be dropped
    Destroy,
    /// Database exists with another engine and must be recreated
    ChangeEngine { from: String, to: Engine },
}

/// A difference between the declared and observed state of a database
#[derive(Debug, Clone, Serialize)]
pub struct ResourceDiff {
    pub name: String,
    pub change: Change,
    /// Tables currently in the database
    pub tables: u64,
    /// Whether the safety gate will refuse the drop this change needs
    pub blocked: bool,
}

impl ResourceDiff {
    /// Create a diff from a pairing, returning None if no changes needed
    pub fn from_resource(resource: &ReconciledResource) -> Option<Self> {
        let decl = resource.declaration();
        let observed = resource.observed();

        let change = match (decl.ensure(), observed) {
            (Ensure::Present, Observed::Absent) => Change::Create {
                engine: decl.engine(),
            },
            (Ensure::Present, Observed::Present { engine, .. })
                if engine.as_str() != decl.engine().as_str() =>
            {
                Change::ChangeEngine {
                    from: engine.clone(),
                    to: decl.engine(),
                }
            }
            (Ensure::Absent, Observed::Present { .. }) => Change::Destroy,
            _ => return None,
        };

        let blocked = !matches!(change, Change::Create { .. })
            && !destroy_permitted(observed, decl.force());

        Some(Self {
            name: decl.name().to_string(),
            change,
            tables: observed.tables(),
            blocked,
        })
    }

    /// Human-readable description
    pub fn description(&self) -> String {
        match &self.change {
            Change::Create { engine } => format!("Create {} (ENGINE={engine})", self.name),
            Change::Destroy => format!("Drop {} ({} tables)", self.name, self.tables),
            Change::ChangeEngine { from, to } => {
                format!("Recreate {} as {to} (currently {from})", self.name)
            }
        }
    }

    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        matches!(self.change, Change::Create { .. })
    }

    /// Check if this diff represents a removal
    pub fn is_removal(&self) -> bool {
        matches!(self.change, Change::Destroy)
    }

    /// Check if this diff represents a modification
    pub fn is_modification(&self) -> bool {
        matches!(self.change, Change::ChangeEngine { .. })
    }
}

/// Compute diffs for every pairing in a pass
///
/// Returns only databases whose observed state differs from the declaration.
pub fn compute_diffs(ctx: &ReconcileContext) -> Vec<ResourceDiff> {
    ctx.resources()
        .iter()
        .filter_map(ResourceDiff::from_resource)
        .collect()
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    /// Number of databases to create
    pub additions: usize,
    /// Number of databases to drop
    pub removals: usize,
    /// Number of databases to recreate with another engine
    pub modifications: usize,
    /// Number of changes the safety gate will refuse
    pub blocked: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            if diff.is_addition() {
                summary.additions += 1;
            } else if diff.is_removal() {
                summary.removals += 1;
            } else {
                summary.modifications += 1;
            }
            if diff.blocked {
                summary.blocked += 1;
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DatabaseDeclaration;
    use crate::types::EngineSpec;
    use std::num::NonZeroU64;

    fn resource(name: &str, spec: EngineSpec, ensure: Ensure, observed: Observed) -> ReconciledResource {
        let decl = DatabaseDeclaration::new(name, spec)
            .unwrap()
            .with_ensure(ensure);
        ReconciledResource::new(decl, observed)
    }

    fn present(engine: &str, tables: u64) -> Observed {
        Observed::Present {
            engine: engine.into(),
            tables,
        }
    }

    fn lazy() -> EngineSpec {
        EngineSpec::Lazy {
            expiration: NonZeroU64::new(60).unwrap(),
        }
    }

    #[test]
    fn test_no_diff_when_converged() {
        let same = resource("a", EngineSpec::Ordinary, Ensure::Present, present("Ordinary", 3));
        assert!(ResourceDiff::from_resource(&same).is_none());

        let gone = resource("b", EngineSpec::Ordinary, Ensure::Absent, Observed::Absent);
        assert!(ResourceDiff::from_resource(&gone).is_none());
    }

    #[test]
    fn test_classification() {
        let create = resource("a", lazy(), Ensure::Present, Observed::Absent);
        let diff = ResourceDiff::from_resource(&create).unwrap();
        assert_eq!(diff.change, Change::Create { engine: Engine::Lazy });
        assert!(diff.is_addition());
        assert!(!diff.blocked);

        let destroy = resource("b", EngineSpec::Ordinary, Ensure::Absent, present("Ordinary", 0));
        let diff = ResourceDiff::from_resource(&destroy).unwrap();
        assert!(diff.is_removal());
        assert!(!diff.blocked);

        let change = resource("c", lazy(), Ensure::Present, present("Ordinary", 0));
        let diff = ResourceDiff::from_resource(&change).unwrap();
        assert_eq!(
            diff.change,
            Change::ChangeEngine {
                from: "Ordinary".into(),
                to: Engine::Lazy
            }
        );
        assert_eq!(diff.description(), "Recreate c as Lazy (currently Ordinary)");
    }

    #[test]
    fn test_blocked_changes() {
        let destroy = resource("b", EngineSpec::Ordinary, Ensure::Absent, present("Ordinary", 5));
        assert!(ResourceDiff::from_resource(&destroy).unwrap().blocked);

        let change = resource("c", lazy(), Ensure::Present, present("Atomic", 2));
        assert!(ResourceDiff::from_resource(&change).unwrap().blocked);

        let connector = resource("d", EngineSpec::Ordinary, Ensure::Absent, present("MySQL", 9));
        assert!(!ResourceDiff::from_resource(&connector).unwrap().blocked);
    }

    #[test]
    fn test_summary() {
        let diffs: Vec<_> = [
            resource("a", lazy(), Ensure::Present, Observed::Absent),
            resource("b", EngineSpec::Ordinary, Ensure::Absent, present("Ordinary", 5)),
            resource("c", lazy(), Ensure::Present, present("Ordinary", 0)),
            resource("d", EngineSpec::Ordinary, Ensure::Present, present("Ordinary", 0)),
        ]
        .iter()
        .filter_map(ResourceDiff::from_resource)
        .collect();

        let summary = DiffSummary::from_diffs(&diffs);
        assert_eq!(
            summary,
            DiffSummary {
                additions: 1,
                removals: 1,
                modifications: 1,
                blocked: 1,
            }
        );
        assert_eq!(summary.total(), 3);
        assert!(summary.has_changes());
    }
}
