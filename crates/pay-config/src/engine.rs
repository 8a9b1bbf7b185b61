//! Typed view of the merged document.
//!
//! ```yaml
//! sync:
//!   page_size: 100
//!   call_timeout_ms: 30000
//! assets:
//!   USDC: 6
//! connectors:
//!   - provider: stripe
//!     name: eu-main
//!     polling_period_secs: 120
//!     credentials_env:
//!       api_key: STRIPE_API_KEY_EU
//!     config:
//!       page_delay_ms: 0
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use pay_money::AssetTable;
use serde::{Deserialize, Serialize};

use crate::LoadedConfig;

fn default_page_size() -> usize {
    100
}

fn default_call_timeout_ms() -> u64 {
    30_000
}

fn default_polling_period_secs() -> u64 {
    120
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    #[serde(default)]
    pub webhook_base_url: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            call_timeout_ms: default_call_timeout_ms(),
            webhook_base_url: None,
        }
    }
}

impl SyncConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectorConfig {
    pub provider: String,
    pub name: String,
    #[serde(default = "default_polling_period_secs")]
    pub polling_period_secs: u64,
    /// Credential slot -> env var NAME.
    #[serde(default)]
    pub credentials_env: BTreeMap<String, String>,
    /// Provider-specific settings handed to the connector factory.
    #[serde(default)]
    pub config: serde_json::Value,
}

impl ConnectorConfig {
    pub fn polling_period(&self) -> Duration {
        Duration::from_secs(self.polling_period_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub sync: SyncConfig,
    /// Extra `CODE: scale` entries layered over the built-in asset table.
    #[serde(default)]
    pub assets: BTreeMap<String, u32>,
    #[serde(default)]
    pub connectors: Vec<ConnectorConfig>,
}

impl EngineConfig {
    /// Extract and validate the engine section of a loaded config.
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        let cfg: EngineConfig = serde_json::from_value(loaded.config_json.clone())
            .context("CONFIG_INVALID: engine config does not match schema")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sync.page_size == 0 {
            bail!("CONFIG_INVALID: sync.page_size must be > 0");
        }
        if self.sync.call_timeout_ms == 0 {
            bail!("CONFIG_INVALID: sync.call_timeout_ms must be > 0");
        }
        for (code, scale) in &self.assets {
            if code.trim().is_empty() || code.contains('/') {
                bail!("CONFIG_INVALID: asset code '{code}' must be a bare code");
            }
            if *scale > 18 {
                bail!("CONFIG_INVALID: asset '{code}' scale {scale} exceeds 18");
            }
        }

        let mut seen = BTreeSet::new();
        for (i, c) in self.connectors.iter().enumerate() {
            if c.provider.trim().is_empty() || c.name.trim().is_empty() {
                bail!("CONFIG_INVALID: connectors[{i}] needs provider and name");
            }
            if c.polling_period_secs == 0 {
                bail!("CONFIG_INVALID: connectors[{i}].polling_period_secs must be > 0");
            }
            if !seen.insert((c.provider.as_str(), c.name.as_str())) {
                bail!(
                    "CONFIG_INVALID: connector {}/{} configured twice",
                    c.provider,
                    c.name
                );
            }
        }
        Ok(())
    }

    /// Built-in asset table with the configured entries merged over it.
    pub fn asset_table(&self) -> AssetTable {
        let mut table = AssetTable::with_defaults();
        for (code, scale) in &self.assets {
            table.insert(code, *scale);
        }
        table
    }
}
