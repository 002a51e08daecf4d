//! Configuration file for `dynfields --config <path>`.
//!
//! # Example
//!
//! ```toml
//! [sql]
//! values_table = "custom_field_values"
//! cte_prefix = "cf_"
//!
//! [hosts.Author]
//! allowed_types = ["integer", "text", "enum_array"]
//!
//! [hosts.Post]
//!
//! [logging]
//! level = "debug"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dynfields_core::{HostDeclaration, HostRegistry};
use dynfields_query::SqlConfig;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("error reading config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("error parsing config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    /// `[sql]`: table, column and CTE names used when rendering queries.
    pub(crate) sql: SqlConfig,
    /// `[hosts.<HostType>]`: the host registry.
    pub(crate) hosts: BTreeMap<String, HostDeclaration>,
    pub(crate) logging: LoggingConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct LoggingConfig {
    pub(crate) level: Option<String>,
}

impl Config {
    /// Load from `path`, or defaults when no path is given. A named file
    /// that does not exist is an error.
    pub(crate) fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let Some(path) = path else {
            return Ok(Config::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The declared host registry, or `None` when no hosts are declared.
    pub(crate) fn registry(&self) -> Option<HostRegistry> {
        if self.hosts.is_empty() {
            None
        } else {
            Some(HostRegistry::from_declarations(&self.hosts))
        }
    }
}
