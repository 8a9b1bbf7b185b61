use std::sync::Arc;

use pay_connector::{PspBatch, TranslatedWebhook, WebhookUpsert};
use pay_models::{
    Account, AccountType, Balance, ConnectorId, Order, Payment, PspOther, PspPayment, Trade,
};
use pay_money::AssetTable;
use pay_storage::{LedgerStore, WriteOutcome};
use tracing::debug;

use crate::convert::{
    account_from_psp, balance_from_psp, order_from_psp, other_key, payment_from_psp,
    trade_from_psp,
};
use crate::ReconcileError;

/// Counts for one applied batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub inserted: usize,
    pub duplicates: usize,
}

impl ApplyReport {
    fn record(&mut self, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Inserted => self.inserted += 1,
            WriteOutcome::Duplicate => self.duplicates += 1,
        }
    }
}

enum Write {
    Account(Account),
    Balance(Balance),
    Payment(Payment),
    Order(Order),
    Trade(Trade),
    Other(PspOther),
}

pub struct Reconciler {
    store: Arc<dyn LedgerStore>,
    assets: Arc<AssetTable>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn LedgerStore>, assets: Arc<AssetTable>) -> Self {
        Self { store, assets }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub fn assets(&self) -> &AssetTable {
        &self.assets
    }

    fn convert_batch(
        &self,
        connector_id: &ConnectorId,
        batch: &PspBatch,
    ) -> Result<Vec<(Write, String)>, ReconcileError> {
        let a = self.assets.as_ref();
        let c = connector_id;
        match batch {
            PspBatch::Accounts(v) => v
                .iter()
                .map(|p| account_from_psp(c, p, AccountType::Internal, a).map(|(e, k)| (Write::Account(e), k)))
                .collect(),
            PspBatch::ExternalAccounts(v) => v
                .iter()
                .map(|p| account_from_psp(c, p, AccountType::External, a).map(|(e, k)| (Write::Account(e), k)))
                .collect(),
            PspBatch::Balances(v) => v
                .iter()
                .map(|p| balance_from_psp(c, p, a).map(|(e, k)| (Write::Balance(e), k)))
                .collect(),
            PspBatch::Payments(v) => v
                .iter()
                .map(|p| payment_from_psp(c, p, a).map(|(e, k)| (Write::Payment(e), k)))
                .collect(),
            PspBatch::Orders(v) => v
                .iter()
                .map(|p| order_from_psp(c, p, a).map(|(e, k)| (Write::Order(e), k)))
                .collect(),
            PspBatch::Trades(v) => v
                .iter()
                .map(|p| trade_from_psp(c, p, a).map(|(e, k)| (Write::Trade(e), k)))
                .collect(),
            PspBatch::Others(v) => v
                .iter()
                .map(|p| other_key(c, p).map(|k| (Write::Other(p.clone()), k)))
                .collect(),
        }
    }

    fn convert_upsert(
        &self,
        connector_id: &ConnectorId,
        upsert: &WebhookUpsert,
    ) -> Result<Write, ReconcileError> {
        let a = self.assets.as_ref();
        let c = connector_id;
        Ok(match upsert {
            WebhookUpsert::Account(p) => Write::Account(account_from_psp(c, p, AccountType::Internal, a)?.0),
            WebhookUpsert::ExternalAccount(p) => {
                Write::Account(account_from_psp(c, p, AccountType::External, a)?.0)
            }
            WebhookUpsert::Balance(p) => Write::Balance(balance_from_psp(c, p, a)?.0),
            WebhookUpsert::Payment(p) => Write::Payment(payment_from_psp(c, p, a)?.0),
            WebhookUpsert::Order(p) => Write::Order(order_from_psp(c, p, a)?.0),
            WebhookUpsert::Trade(p) => Write::Trade(trade_from_psp(c, p, a)?.0),
        })
    }

    async fn write(
        &self,
        connector_id: &ConnectorId,
        w: Write,
        key: &str,
    ) -> Result<WriteOutcome, ReconcileError> {
        let outcome = match w {
            Write::Account(e) => self.store.upsert_account(e, key).await?,
            Write::Balance(e) => self.store.upsert_balance(e, key).await?,
            Write::Payment(e) => self.store.upsert_payment(e, key).await?,
            Write::Order(e) => self.store.upsert_order(e, key).await?,
            Write::Trade(e) => self.store.upsert_trade(e, key).await?,
            Write::Other(e) => self.store.upsert_other(connector_id, e, key).await?,
        };
        if outcome == WriteOutcome::Duplicate {
            debug!(%connector_id, key, "record already applied");
        }
        Ok(outcome)
    }

    async fn write_all(
        &self,
        connector_id: &ConnectorId,
        writes: Vec<(Write, String)>,
    ) -> Result<ApplyReport, ReconcileError> {
        let mut report = ApplyReport::default();
        for (w, key) in writes {
            report.record(self.write(connector_id, w, &key).await?);
        }
        Ok(report)
    }

    /// Validate every record of `batch`, then write them in page order.
    ///
    /// Nothing is written when any record fails validation. A storage
    /// failure mid-batch leaves earlier writes applied; replaying the batch
    /// is safe because applied keys are no-ops.
    pub async fn apply_batch(
        &self,
        connector_id: &ConnectorId,
        batch: &PspBatch,
    ) -> Result<ApplyReport, ReconcileError> {
        let writes = self.convert_batch(connector_id, batch)?;
        let report = self.write_all(connector_id, writes).await?;
        debug!(
            %connector_id,
            kind = %batch.kind(),
            inserted = report.inserted,
            duplicates = report.duplicates,
            "batch applied"
        );
        Ok(report)
    }

    /// Apply one payment obtained outside the fetch loop (a settled transfer
    /// or payout).
    pub async fn apply_payment(
        &self,
        connector_id: &ConnectorId,
        psp: &PspPayment,
    ) -> Result<WriteOutcome, ReconcileError> {
        let (payment, key) = payment_from_psp(connector_id, psp, &self.assets)?;
        self.write(connector_id, Write::Payment(payment), &key).await
    }

    /// Apply translated webhook upserts, each under the key it carries.
    pub async fn apply_webhook(
        &self,
        connector_id: &ConnectorId,
        translated: &[TranslatedWebhook],
    ) -> Result<ApplyReport, ReconcileError> {
        let writes = translated
            .iter()
            .map(|t| {
                self.convert_upsert(connector_id, &t.upsert)
                    .map(|w| (w, t.idempotency_key.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.write_all(connector_id, writes).await
    }
}
