//! Provider registry: provider name -> factory.
//!
//! Factories take the connector's (secret-free) config and build a fresh
//! adapter. Insertion order is preserved for `list()`.

use std::sync::Arc;

use crate::connector::Connector;
use crate::ConnectorError;

pub type ConnectorFactory =
    Box<dyn Fn(&serde_json::Value) -> Result<Arc<dyn Connector>, ConnectorError> + Send + Sync>;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("provider name must not be empty")]
    EmptyName,
    #[error("provider '{provider}' is already registered")]
    DuplicateProvider { provider: String },
    #[error("no provider named '{provider}' is registered")]
    UnknownProvider { provider: String },
    #[error("provider '{provider}' rejected its config: {source}")]
    Build {
        provider: String,
        #[source]
        source: ConnectorError,
    },
}

struct Entry {
    provider: String,
    factory: ConnectorFactory,
}

#[derive(Default)]
pub struct ConnectorRegistry {
    entries: Vec<Entry>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, provider: impl Into<String>, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(&serde_json::Value) -> Result<Arc<dyn Connector>, ConnectorError>
            + Send
            + Sync
            + 'static,
    {
        let provider = provider.into();
        if provider.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.contains(&provider) {
            return Err(RegistryError::DuplicateProvider { provider });
        }
        self.entries.push(Entry {
            provider,
            factory: Box::new(factory),
        });
        Ok(())
    }

    pub fn contains(&self, provider: &str) -> bool {
        self.entries.iter().any(|e| e.provider == provider)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn list(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.provider.as_str()).collect()
    }

    /// Build a fresh adapter. Each call invokes the factory anew.
    pub fn create(
        &self,
        provider: &str,
        config: &serde_json::Value,
    ) -> Result<Arc<dyn Connector>, RegistryError> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.provider == provider)
            .ok_or_else(|| RegistryError::UnknownProvider {
                provider: provider.to_string(),
            })?;
        (entry.factory)(config).map_err(|source| RegistryError::Build {
            provider: provider.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InstallResponse, Workflow};
    use async_trait::async_trait;
    use pay_models::{CapabilitySet, ConnectorId};

    struct Noop;

    #[async_trait]
    impl Connector for Noop {
        fn provider(&self) -> &str {
            "noop"
        }

        async fn install(&self, _id: &ConnectorId) -> Result<InstallResponse, ConnectorError> {
            Ok(InstallResponse {
                capabilities: CapabilitySet::new(),
                workflow: Workflow::default(),
            })
        }
    }

    fn noop_factory(_: &serde_json::Value) -> Result<Arc<dyn Connector>, ConnectorError> {
        Ok(Arc::new(Noop))
    }

    #[test]
    fn duplicate_provider_rejected() {
        let mut reg = ConnectorRegistry::new();
        reg.register("noop", noop_factory).unwrap();
        assert_eq!(
            reg.register("noop", noop_factory),
            Err(RegistryError::DuplicateProvider {
                provider: "noop".into()
            })
        );
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn unknown_provider_rejected() {
        let reg = ConnectorRegistry::new();
        let err = reg.create("ghost", &serde_json::Value::Null).err().unwrap();
        assert!(matches!(err, RegistryError::UnknownProvider { .. }));
    }

    #[test]
    fn factory_error_is_wrapped() {
        let mut reg = ConnectorRegistry::new();
        reg.register("picky", |cfg: &serde_json::Value| {
            if cfg.get("api_key_env").is_none() {
                return Err(ConnectorError::InvalidRequest("api_key_env missing".into()));
            }
            Ok(Arc::new(Noop) as Arc<dyn Connector>)
        })
        .unwrap();
        let err = reg.create("picky", &serde_json::json!({})).err().unwrap();
        assert!(matches!(err, RegistryError::Build { .. }));
        assert!(reg
            .create("picky", &serde_json::json!({"api_key_env": "PICKY_KEY"}))
            .is_ok());
    }
}
