use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::TaskStatus;
use crate::ids::{ConnectorId, TaskId, WebhookId};
use crate::{Metadata, RawPayload};

/// An installed connector. `config` is provider-specific and never contains
/// secret values, only the names of the env vars holding them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub id: ConnectorId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub provider: String,
    pub config: serde_json::Value,
    #[serde(default)]
    pub scheduled_for_deletion: bool,
    #[serde(default)]
    pub metadata: Metadata,
    /// Adapter install response, kept for audit.
    #[serde(default)]
    pub raw: RawPayload,
}

/// Outcome record for an asynchronous action (transfer, payout, bank
/// account creation).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub connector_id: ConnectorId,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub created_object_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    /// Provider record of the terminal outcome, when there is one.
    #[serde(default)]
    pub raw: RawPayload,
}

impl Task {
    pub fn processing(id: TaskId, now: DateTime<Utc>) -> Self {
        Self {
            connector_id: id.connector_id.clone(),
            id,
            status: TaskStatus::Processing,
            created_at: now,
            updated_at: now,
            created_object_id: None,
            error: None,
            metadata: Metadata::new(),
            raw: RawPayload::Null,
        }
    }

    pub fn succeed(&mut self, object_id: impl Into<String>, now: DateTime<Utc>) {
        self.status = TaskStatus::Succeeded;
        self.created_object_id = Some(object_id.into());
        self.updated_at = now;
    }

    pub fn fail(&mut self, error: impl Into<String>, now: DateTime<Utc>) {
        self.status = TaskStatus::Failed;
        self.error = Some(error.into());
        self.updated_at = now;
    }
}

/// A raw inbound webhook as received by the transport.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Webhook {
    pub id: WebhookId,
    pub connector_id: ConnectorId,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub query_values: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub headers: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub body: Vec<u8>,
    #[serde(default)]
    pub metadata: Metadata,
    /// Decoded body when the transport could parse it; null otherwise.
    #[serde(default)]
    pub raw: RawPayload,
}

/// Registration returned by a connector's webhook setup; persisted so that
/// inbound requests can be routed back to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub name: String,
    pub connector_id: ConnectorId,
    pub url_path: String,
}
