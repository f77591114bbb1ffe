//! Discovery of existing databases
//!
//! One query lists every database with its engine and table count. The full
//! outer join keeps databases without tables in the result with a count of 0.

use crate::context::RemoteExecutor;
use crate::error::{Error, Result};
use crate::types::DiscoveredDatabase;

/// Statement listing `(name, engine, tables)` for every database
pub const DISCOVERY_QUERY: &str = "SELECT d.name, d.engine, countIf(t.name != '') AS tables
FROM system.databases AS d
FULL OUTER JOIN system.tables AS t ON d.name = t.database
GROUP BY d.name, d.engine";

/// Query the server for all databases
///
/// Read-only and safe to repeat. A failed query is returned as
/// [`Error::Discovery`] and is not retried.
pub fn list_instances<E: RemoteExecutor + ?Sized>(executor: &E) -> Result<Vec<DiscoveredDatabase>> {
    log::debug!("Discovering databases");
    let output = executor
        .run_capture(DISCOVERY_QUERY)
        .map_err(|message| Error::Discovery { message })?;

    let databases = parse_instances(&output)?;
    log::debug!("Discovered {} databases", databases.len());
    Ok(databases)
}

/// Parse tab-separated `name, engine, tables` rows
///
/// Blank lines are skipped. Any other row must have exactly three fields and
/// an unsigned integer table count. Rows with an empty name come from tables
/// whose database is gone by the time the join runs; they are dropped.
pub fn parse_instances(output: &str) -> Result<Vec<DiscoveredDatabase>> {
    let mut databases = Vec::new();
    for line in output.lines().filter(|line| !line.trim().is_empty()) {
        let database = parse_row(line)?;
        if database.name.is_empty() {
            log::debug!("Skipping discovery row without a database name: {line:?}");
            continue;
        }
        databases.push(database);
    }
    Ok(databases)
}

fn parse_row(line: &str) -> Result<DiscoveredDatabase> {
    let fields: Vec<&str> = line.split('\t').collect();
    let [name, engine, tables] = fields.as_slice() else {
        return Err(Error::Discovery {
            message: format!(
                "expected 3 tab-separated fields, got {}: {line:?}",
                fields.len()
            ),
        });
    };

    let tables = tables.trim().parse::<u64>().map_err(|_| Error::Discovery {
        message: format!("invalid table count {tables:?} in row {line:?}"),
    })?;

    Ok(DiscoveredDatabase {
        name: (*name).to_string(),
        engine: (*engine).to_string(),
        tables,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeServer;
    use crate::types::{CommandOutput, Engine};

    const LISTING: &str = "system\tOrdinary\t47\nmysql\tMySQL\t3\nlazy\tLazy\t0\n";

    #[test]
    fn test_rows_without_name_skipped() {
        let dbs = parse_instances("\t\t1\nsystem\tOrdinary\t47\n\t\t3\n").unwrap();
        assert_eq!(dbs.len(), 1);
        assert_eq!(dbs[0].name, "system");
        assert_eq!(dbs[0].tables, 47);
    }

    #[test]
    fn test_parse_listing() {
        let dbs = parse_instances(LISTING).unwrap();

        let names: Vec<_> = dbs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["system", "mysql", "lazy"]);

        let engines: Vec<_> = dbs.iter().map(|d| d.engine_kind()).collect();
        assert_eq!(
            engines,
            [Some(Engine::Ordinary), Some(Engine::MySql), Some(Engine::Lazy)]
        );

        let tables: Vec<_> = dbs.iter().map(|d| d.tables).collect();
        assert_eq!(tables, [47, 3, 0]);
    }

    #[test]
    fn test_parse_keeps_unmanaged_engines() {
        let dbs = parse_instances("default\tAtomic\t2\n").unwrap();
        assert_eq!(dbs[0].engine, "Atomic");
        assert_eq!(dbs[0].engine_kind(), None);
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_instances("").unwrap().is_empty());
        assert!(parse_instances("\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed_rows() {
        assert!(matches!(
            parse_instances("system\tOrdinary\n"),
            Err(Error::Discovery { .. })
        ));
        assert!(matches!(
            parse_instances("system\tOrdinary\t47\textra\n"),
            Err(Error::Discovery { .. })
        ));
        assert!(matches!(
            parse_instances("system\tOrdinary\tmany\n"),
            Err(Error::Discovery { .. })
        ));
    }

    #[test]
    fn test_list_instances_issues_fixed_query() {
        let server = FakeServer::new()
            .with_database("system", "Ordinary", 47)
            .with_database("mysql", "MySQL", 3);

        let dbs = list_instances(&server).unwrap();
        assert_eq!(dbs.len(), 2);
        assert_eq!(server.calls(), [DISCOVERY_QUERY]);

        // Repeating discovery has no side effects
        assert_eq!(list_instances(&server).unwrap(), dbs);
        assert!(server.mutations().is_empty());
    }

    #[test]
    fn test_list_instances_surfaces_failure() {
        struct Down;
        impl RemoteExecutor for Down {
            fn run(&self, _statement: &str) -> std::io::Result<CommandOutput> {
                Ok(CommandOutput::failed("Code: 210. Connection refused (localhost:9000)"))
            }
        }

        let err = list_instances(&Down).unwrap_err();
        assert_eq!(
            err,
            Error::Discovery {
                message: "Code: 210. Connection refused (localhost:9000)".into()
            }
        );
    }
}
