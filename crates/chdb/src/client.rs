//! `clickhouse-client` backend
//!
//! Each statement runs as its own `clickhouse-client -q` process. Output is
//! left in the client's default TabSeparated format, which is what
//! [`crate::discovery::parse_instances`] reads.

use crate::context::RemoteExecutor;
use crate::types::CommandOutput;
use serde::Deserialize;
use std::io;
use std::path::PathBuf;
use std::process::Command;

const PASSWORD_MASK: &str = "***";

/// Connection settings passed to `clickhouse-client`
///
/// Unset fields are left to the client's own defaults and config file.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Client executable; defaults to `clickhouse-client` on `PATH`
    pub program: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub secure: bool,
    pub config_file: Option<PathBuf>,
}

impl std::fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSettings")
            .field("program", &self.program)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| PASSWORD_MASK))
            .field("secure", &self.secure)
            .field("config_file", &self.config_file)
            .finish()
    }
}

/// Runs statements through the `clickhouse-client` CLI
#[derive(Debug, Clone)]
pub struct ClickhouseClient {
    settings: ClientSettings,
}

impl ClickhouseClient {
    pub fn new(settings: ClientSettings) -> Self {
        Self { settings }
    }

    pub fn program(&self) -> &str {
        self.settings
            .program
            .as_deref()
            .unwrap_or("clickhouse-client")
    }

    /// Connection arguments, without the query
    fn connection_args(&self, redact: bool) -> Vec<String> {
        let s = &self.settings;
        let mut args = Vec::new();

        if let Some(host) = &s.host {
            args.extend(["--host".to_string(), host.clone()]);
        }
        if let Some(port) = s.port {
            args.extend(["--port".to_string(), port.to_string()]);
        }
        if let Some(user) = &s.user {
            args.extend(["--user".to_string(), user.clone()]);
        }
        if let Some(password) = &s.password {
            let value = if redact {
                PASSWORD_MASK.to_string()
            } else {
                password.clone()
            };
            args.extend(["--password".to_string(), value]);
        }
        if s.secure {
            args.push("--secure".to_string());
        }
        if let Some(path) = &s.config_file {
            args.extend(["--config-file".to_string(), path.display().to_string()]);
        }

        args
    }

    /// Full argument vector for `statement`
    pub fn args(&self, statement: &str) -> Vec<String> {
        let mut args = self.connection_args(false);
        args.extend(["-q".to_string(), statement.to_string()]);
        args
    }

    /// Whether the client binary can be started at all
    pub fn is_available(&self) -> bool {
        Command::new(self.program())
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success())
    }
}

impl RemoteExecutor for ClickhouseClient {
    fn run(&self, statement: &str) -> io::Result<CommandOutput> {
        // Statements may carry engine credentials; callers log them redacted.
        log::debug!(
            "Running {} {} -q <{} bytes>",
            self.program(),
            self.connection_args(true).join(" "),
            statement.len()
        );

        let output = Command::new(self.program())
            .args(self.args(statement))
            .output()
            .map_err(|e| {
                io::Error::new(e.kind(), format!("failed to execute {}: {e}", self.program()))
            })?;

        Ok(CommandOutput::from(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::{ReconciledResource, Reconciler};
    use crate::schema::DatabaseDeclaration;
    use crate::types::{EngineSpec, MySqlSource, Observed};
    use std::sync::Mutex;

    struct Capture(Mutex<Vec<String>>);

    impl log::Log for Capture {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            if let Ok(mut lines) = self.0.lock() {
                lines.push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    static CAPTURE: Capture = Capture(Mutex::new(Vec::new()));

    fn full() -> ClientSettings {
        ClientSettings {
            program: Some("/opt/clickhouse/bin/clickhouse-client".into()),
            host: Some("ch.internal".into()),
            port: Some(9440),
            user: Some("admin".into()),
            password: Some("s3cret".into()),
            secure: true,
            config_file: Some(PathBuf::from("/etc/clickhouse-client/config.xml")),
        }
    }

    #[test]
    fn test_default_args() {
        let client = ClickhouseClient::new(ClientSettings::default());
        assert_eq!(client.program(), "clickhouse-client");
        assert_eq!(client.args("SELECT 1"), ["-q", "SELECT 1"]);
    }

    #[test]
    fn test_full_args() {
        let client = ClickhouseClient::new(full());
        assert_eq!(client.program(), "/opt/clickhouse/bin/clickhouse-client");
        assert_eq!(
            client.args("DROP DATABASE x"),
            [
                "--host",
                "ch.internal",
                "--port",
                "9440",
                "--user",
                "admin",
                "--password",
                "s3cret",
                "--secure",
                "--config-file",
                "/etc/clickhouse-client/config.xml",
                "-q",
                "DROP DATABASE x",
            ]
        );
    }

    #[test]
    fn test_password_masked() {
        let client = ClickhouseClient::new(full());
        assert!(!client.connection_args(true).iter().any(|a| a == "s3cret"));
        assert!(!format!("{client:?}").contains("s3cret"));
    }

    #[test]
    fn test_missing_program_is_io_error() {
        let client = ClickhouseClient::new(ClientSettings {
            program: Some("/nonexistent/clickhouse-client".into()),
            ..Default::default()
        });
        assert!(!client.is_available());
        assert!(client.run("SELECT 1").is_err());
        assert!(client.run_capture("SELECT 1").is_err());
    }

    #[test]
    fn test_credentials_never_logged() {
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(log::LevelFilter::Trace);

        let client = ClickhouseClient::new(ClientSettings {
            program: Some("true".into()),
            password: Some("s3cret".into()),
            ..Default::default()
        });
        let spec = EngineSpec::MySql(MySqlSource {
            endpoint: "db:3306".into(),
            database: "shop".into(),
            user: "reader".into(),
            password: "hunter2".into(),
        });
        let decl = DatabaseDeclaration::new("shop", spec).unwrap();
        let resource = ReconciledResource::new(decl, Observed::Absent);

        let outcome = Reconciler::new(&client).create(&resource).unwrap();
        assert!(outcome.succeeded);

        let lines = CAPTURE.0.lock().unwrap().clone();
        assert!(lines.iter().any(|l| l.contains("CREATE DATABASE shop")));
        assert!(lines.iter().any(|l| l.contains("Running true")));
        for line in &lines {
            assert!(!line.contains("hunter2"), "leaked: {line}");
            assert!(!line.contains("s3cret"), "leaked: {line}");
        }
    }
}
