use std::env;

use super::error::{CouchDaoError, CouchResult};

const DEFAULT_DATABASE: &str = "prono";

/// Where the CouchDB server lives and how to log in.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    pub base_url: String,
    pub database: String,
    /// Basic-auth pair, only set when both halves are configured.
    pub credentials: Option<(String, String)>,
}

impl CouchConfig {
    /// Read `COUCH_BASE_URL` (required), `COUCH_DB` (default `prono`) and the
    /// optional `COUCH_USERNAME` / `COUCH_PASSWORD` pair.
    pub fn from_env() -> CouchResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CouchResult<Self> {
        let base_url = lookup("COUCH_BASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(CouchDaoError::MissingEnvVar {
                var: "COUCH_BASE_URL",
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            database: lookup("COUCH_DB").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            credentials: lookup("COUCH_USERNAME").zip(lookup("COUCH_PASSWORD")),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_database_and_skips_half_credentials() {
        let config = CouchConfig::from_lookup(lookup(&[
            ("COUCH_BASE_URL", "http://couch:5984/"),
            ("COUCH_USERNAME", "admin"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://couch:5984");
        assert_eq!(config.database, "prono");
        assert!(config.credentials.is_none());
    }

    #[test]
    fn base_url_is_required() {
        assert!(matches!(
            CouchConfig::from_lookup(lookup(&[("COUCH_DB", "x")])),
            Err(CouchDaoError::MissingEnvVar { var: "COUCH_BASE_URL" })
        ));
    }
}
