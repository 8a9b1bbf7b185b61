//! Connector credential resolution.
//!
//! Config stores env var NAMES only. Values are read once, here, and the
//! resulting [`ResolvedConnectorSecrets`] is handed to the connector
//! factory. Error messages name the variable, never its value.

use std::collections::BTreeMap;

use anyhow::{bail, Result};

use crate::ConnectorConfig;

/// Credential values for one connector. **Redacted in `Debug` output.**
#[derive(Clone)]
pub struct ResolvedConnectorSecrets {
    pub provider: String,
    pub name: String,
    values: BTreeMap<String, String>,
}

impl ResolvedConnectorSecrets {
    pub fn get(&self, slot: &str) -> Option<&str> {
        self.values.get(slot).map(String::as_str)
    }

    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for ResolvedConnectorSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted: BTreeMap<&str, &str> =
            self.values.keys().map(|k| (k.as_str(), "<REDACTED>")).collect();
        f.debug_struct("ResolvedConnectorSecrets")
            .field("provider", &self.provider)
            .field("name", &self.name)
            .field("values", &redacted)
            .finish()
    }
}

fn resolve_env(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok()
}

/// Resolve every `credentials_env` slot of `cfg` from the process
/// environment. Every slot is required.
pub fn resolve_connector_secrets(cfg: &ConnectorConfig) -> Result<ResolvedConnectorSecrets> {
    resolve_connector_secrets_with(cfg, resolve_env)
}

/// Same as [`resolve_connector_secrets`] with an explicit lookup.
pub fn resolve_connector_secrets_with<F>(
    cfg: &ConnectorConfig,
    lookup: F,
) -> Result<ResolvedConnectorSecrets>
where
    F: Fn(&str) -> Option<String>,
{
    let mut values = BTreeMap::new();
    for (slot, var) in &cfg.credentials_env {
        match lookup(var) {
            Some(v) if !v.trim().is_empty() => {
                values.insert(slot.clone(), v);
            }
            _ => bail!(
                "SECRETS_MISSING connector={}/{}: required env var '{}' ({}) is not set or empty",
                cfg.provider,
                cfg.name,
                var,
                slot,
            ),
        }
    }
    Ok(ResolvedConnectorSecrets {
        provider: cfg.provider.clone(),
        name: cfg.name.clone(),
        values,
    })
}
