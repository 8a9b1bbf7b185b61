//! pay-testkit
//!
//! Test tooling shared by scenario tests:
//! - [`ScriptedConnector`]: fake adapter answering from per-kind scripts
//! - [`fixtures`]: provider-shaped records
//! - [`Rig`]: an [`Engine`] over the in-memory stores with a drain loop
//!   standing in for the external scheduler
//! - [`init_test_tracing`]

pub mod fixtures;
mod scripted;

pub use scripted::{Call, ScriptedConnector};

pub use pay_storage::{InMemoryLedger, InMemoryScheduler, InMemoryStateStore};

use std::sync::Arc;

use anyhow::{Context, Result};
use pay_connector::{Connector, ConnectorRegistry};
use pay_money::AssetTable;
use pay_storage::TaskDescriptor;
use pay_sync::{Engine, EngineSettings, SyncReport};
use tokio::sync::watch;
use tracing::debug;

/// Install a `fmt` subscriber writing through the test harness.
/// `RUST_LOG` overrides the default `info` filter. Safe to call from every
/// test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Engine plus the in-memory collaborators behind it.
pub struct Rig {
    pub connector: Arc<ScriptedConnector>,
    pub ledger: Arc<InMemoryLedger>,
    pub states: Arc<InMemoryStateStore>,
    pub scheduler: Arc<InMemoryScheduler>,
    pub engine: Engine,
}

impl Rig {
    /// Register `connector` under its provider name and build an engine with
    /// the default asset table.
    pub fn new(connector: ScriptedConnector, settings: EngineSettings) -> Result<Self> {
        let connector = Arc::new(connector);
        let mut registry = ConnectorRegistry::new();
        let shared = connector.clone();
        registry
            .register(connector.provider().to_string(), move |_config| {
                Ok(shared.clone() as Arc<dyn Connector>)
            })
            .context("register scripted connector")?;

        let ledger = Arc::new(InMemoryLedger::new());
        let states = Arc::new(InMemoryStateStore::new());
        let scheduler = Arc::new(InMemoryScheduler::new());
        let engine = Engine::new(
            registry,
            ledger.clone(),
            states.clone(),
            scheduler.clone(),
            Arc::new(AssetTable::with_defaults()),
            settings,
        );
        Ok(Self {
            connector,
            ledger,
            states,
            scheduler,
            engine,
        })
    }

    /// Run every pending task once, then whatever those tasks scheduled,
    /// until the queue is empty. Periodic tasks are not re-armed.
    pub async fn run_pending(&self) -> Result<Vec<(TaskDescriptor, SyncReport)>> {
        let mut out = Vec::new();
        loop {
            let batch = self.scheduler.take_pending().await;
            if batch.is_empty() {
                break;
            }
            for (task, _opts) in batch {
                let (_tx, mut rx) = watch::channel(false);
                let report = self
                    .engine
                    .run_task(&task, &mut rx)
                    .await
                    .with_context(|| format!("run task {}", task.state_id))?;
                debug!(state_id = %task.state_id, pages = report.pages, "task drained");
                out.push((task, report));
            }
        }
        Ok(out)
    }
}
