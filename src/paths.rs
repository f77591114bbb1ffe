//! Path resolution for chprov
//!
//! The config file location can be overridden with `--config` or the
//! `CHPROV_CONFIG` environment variable; both go through [`expand`].

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable naming the config file
pub const ENV_CONFIG: &str = "CHPROV_CONFIG";

const APP_DIR: &str = "chprov";
const CONFIG_FILE: &str = "config.toml";

/// Default config file path
///
/// Priority:
/// 1. `XDG_CONFIG_HOME/chprov/config.toml`
/// 2. `~/.config/chprov/config.toml`
pub fn default_config_path() -> Result<PathBuf> {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_DIR).join(CONFIG_FILE);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join(APP_DIR).join(CONFIG_FILE))
}

/// Resolve the config file from an explicit path or the default location
pub fn config_path(explicit: Option<&str>) -> Result<PathBuf> {
    match explicit {
        Some(path) => {
            let path = expand(path);
            log::debug!("Using config file: {}", path.display());
            Ok(path)
        }
        None => default_config_path(),
    }
}

/// Expand `~` and environment variables in a path
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_with_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand("~/ch/config.xml"), home.join("ch/config.xml"));
    }

    #[test]
    fn test_expand_absolute() {
        assert_eq!(
            expand("/etc/clickhouse-client/config.xml"),
            PathBuf::from("/etc/clickhouse-client/config.xml")
        );
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let path = expand("$CHPROV_SURELY_UNSET_VAR/config.toml");
        assert_eq!(path, PathBuf::from("$CHPROV_SURELY_UNSET_VAR/config.toml"));
    }

    #[test]
    fn test_explicit_config_path_wins() {
        assert_eq!(
            config_path(Some("/srv/chprov.toml")).unwrap(),
            PathBuf::from("/srv/chprov.toml")
        );
    }

    #[test]
    fn test_default_config_path_file_name() {
        let path = default_config_path().unwrap();
        assert!(path.ends_with("chprov/config.toml"));
    }
}
