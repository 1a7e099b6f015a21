//! `db_key -> endpoint` configuration loading (§6 Configuration file, C14).
//!
//! Shaped the way the pack's `clickgraph-tool` reads its TOML-backed config:
//! a flat `serde`-derived struct loaded from a file, with a programmatic
//! builder for embedding callers that skip the file entirely.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::Result;

/// One physical endpoint's connection settings, as read from the
/// configuration file's `db_key -> { ... }` mapping (§6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub adapter: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    #[serde(default)]
    pub ssl: bool,
    #[serde(default)]
    pub ssc: bool,
    #[serde(default)]
    pub options: HashMap<String, String>,
}

fn default_port() -> u16 {
    7687
}

impl EndpointConfig {
    pub fn secure(&self) -> bool {
        self.ssl || self.ssc
    }

    pub fn verify_cert(&self) -> bool {
        self.ssl && !self.ssc
    }
}

/// The full `db_key -> EndpointConfig` mapping (§6). Looked up by the
/// `Router` (C10) for each `db_key` it resolves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriverConfig {
    #[serde(flatten)]
    endpoints: HashMap<String, EndpointConfig>,
    /// When set, `for()` on a missing key returns `Ok(None)` instead of
    /// `Err(UnknownDbKey)` (mirrors `ActiveGraph::Config.for`'s
    /// silent-missing flag, §6).
    #[serde(skip)]
    silent_missing: bool,
}

impl DriverConfig {
    pub fn from_map(endpoints: HashMap<String, EndpointConfig>) -> Self {
        Self { endpoints, silent_missing: false }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::ConfigError(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::ConfigError(format!("reading {}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&text)
    }

    pub fn with_silent_missing(mut self, silent: bool) -> Self {
        self.silent_missing = silent;
        self
    }

    /// `for('*')` with no config loaded returns an empty mapping rather than
    /// erroring (§6); `for(key)` fails loudly unless `silent_missing` is set.
    pub fn for_key(&self, db_key: &str) -> Result<Option<&EndpointConfig>> {
        if db_key == "*" && self.endpoints.is_empty() {
            return Ok(None);
        }
        match self.endpoints.get(db_key) {
            Some(cfg) => Ok(Some(cfg)),
            None if self.silent_missing => Ok(None),
            None => Err(Error::UnknownDbKey(db_key.to_string())),
        }
    }

    pub fn insert(&mut self, db_key: impl Into<String>, config: EndpointConfig) {
        self.endpoints.insert(db_key.into(), config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_toml_mapping() {
        let toml = r#"
            [default]
            adapter = "bolt"
            host = "localhost"
            port = 7687
            username = "neo4j"
            password = "secret"
        "#;
        let cfg = DriverConfig::from_toml_str(toml).unwrap();
        let endpoint = cfg.for_key("default").unwrap().unwrap();
        assert_eq!(endpoint.host, "localhost");
        assert_eq!(endpoint.port, 7687);
        assert!(!endpoint.secure());
    }

    #[test]
    fn missing_key_errors_loudly_by_default() {
        let cfg = DriverConfig::default();
        let err = cfg.for_key("missing").unwrap_err();
        assert!(matches!(err, Error::UnknownDbKey(_)));
    }

    #[test]
    fn star_with_no_config_is_empty_not_an_error() {
        let cfg = DriverConfig::default();
        assert_eq!(cfg.for_key("*").unwrap(), None);
    }

    #[test]
    fn silent_missing_suppresses_the_error() {
        let cfg = DriverConfig::default().with_silent_missing(true);
        assert_eq!(cfg.for_key("missing").unwrap(), None);
    }
}
