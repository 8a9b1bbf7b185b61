//! Fetch-next driver for one (connector, entity kind) cursor.
//!
//! Per page:
//!
//! ```text
//! Idle -> Fetching -> Reconciling -> Fetching   (has_more)
//!                                 -> Idle       (done)
//! ```
//!
//! Order within a page is fixed: reconcile, fan out children, persist the
//! cursor. Persisting last makes a crash anywhere before it a replay of the
//! same page.

use std::sync::Arc;

use pay_connector::{ConnectorHandle, CursorState, FetchNextRequest, FetchedPage};
use pay_models::StateId;
use pay_reconcile::Reconciler;
use pay_storage::{ScheduleOptions, Scheduler, StateStore, TaskDescriptor};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::SyncError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Fetching,
    Reconciling,
}

/// Totals for one finished cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncReport {
    /// Adapter calls that returned a page. Equals cursor writes.
    pub pages: usize,
    pub items: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub children_scheduled: usize,
    pub phase: SyncPhase,
}

impl Default for SyncReport {
    fn default() -> Self {
        Self {
            pages: 0,
            items: 0,
            inserted: 0,
            duplicates: 0,
            children_scheduled: 0,
            phase: SyncPhase::Idle,
        }
    }
}

pub struct SyncDriver {
    handle: Arc<ConnectorHandle>,
    reconciler: Arc<Reconciler>,
    states: Arc<dyn StateStore>,
    scheduler: Arc<dyn Scheduler>,
    page_size: usize,
}

/// Resolves once `true` is published. A dropped sender never cancels.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

fn transition(state_id: &StateId, phase: &mut SyncPhase, next: SyncPhase) {
    debug!(%state_id, from = ?*phase, to = ?next, "sync phase");
    *phase = next;
}

impl SyncDriver {
    pub fn new(
        handle: Arc<ConnectorHandle>,
        reconciler: Arc<Reconciler>,
        states: Arc<dyn StateStore>,
        scheduler: Arc<dyn Scheduler>,
        page_size: usize,
    ) -> Self {
        Self {
            handle,
            reconciler,
            states,
            scheduler,
            page_size,
        }
    }

    pub fn handle(&self) -> &Arc<ConnectorHandle> {
        &self.handle
    }

    /// Run `task` until the adapter reports no more pages.
    ///
    /// Publishing `true` on `cancel` abandons an in-flight fetch; its page,
    /// if any, is neither reconciled nor persisted. A cycle already past the
    /// fetch finishes the page before observing cancellation.
    ///
    /// # Errors
    /// - [`SyncError::Transient`] / [`SyncError::Permanent`]: adapter failure;
    ///   the cursor stays where the last completed page left it
    /// - [`SyncError::Reconcile`]: a record of the page failed validation
    /// - [`SyncError::Storage`] / [`SyncError::Scheduler`]: collaborator
    ///   failure
    /// - [`SyncError::Cancelled`]
    pub async fn run_cycle(
        &self,
        task: &TaskDescriptor,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<SyncReport, SyncError> {
        let state_id = &task.state_id;
        let mut report = SyncReport::default();
        let mut phase = SyncPhase::Idle;

        let outcome = loop {
            if *cancel.borrow() {
                break Err(SyncError::Cancelled);
            }

            let state = match self.states.load_state(state_id).await {
                Ok(s) => s.unwrap_or_else(CursorState::empty),
                Err(e) => break Err(e.into()),
            };

            transition(state_id, &mut phase, SyncPhase::Fetching);
            let req = FetchNextRequest {
                from_payload: task.from_payload.clone(),
                state,
                page_size: self.page_size,
            };
            let fetched = tokio::select! {
                biased;
                _ = cancelled(cancel) => Err(SyncError::Cancelled),
                res = self.handle.fetch_next(state_id.kind, req) => res.map_err(SyncError::from),
            };
            let page = match fetched {
                Ok(p) => p,
                Err(e) => break Err(e),
            };

            transition(state_id, &mut phase, SyncPhase::Reconciling);
            if let Err(e) = self.apply_page(task, &page, &mut report).await {
                break Err(e);
            }

            report.pages += 1;
            info!(
                %state_id,
                page = report.pages,
                items = page.items.len(),
                has_more = page.has_more,
                "page synced"
            );

            if !page.has_more {
                transition(state_id, &mut phase, SyncPhase::Idle);
                break Ok(());
            }
        };

        match outcome {
            Ok(()) => {
                report.phase = phase;
                info!(
                    %state_id,
                    pages = report.pages,
                    items = report.items,
                    inserted = report.inserted,
                    duplicates = report.duplicates,
                    "sync cycle finished"
                );
                Ok(report)
            }
            Err(SyncError::Cancelled) => {
                info!(%state_id, pages = report.pages, "sync cycle cancelled");
                Err(SyncError::Cancelled)
            }
            Err(e) if e.is_retryable() => {
                warn!(%state_id, pages = report.pages, error = %e, "sync cycle interrupted, cursor kept");
                Err(e)
            }
            Err(e) => {
                error!(%state_id, pages = report.pages, error = %e, "sync halted");
                Err(e)
            }
        }
    }

    async fn apply_page(
        &self,
        task: &TaskDescriptor,
        page: &FetchedPage,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let connector_id = &task.state_id.connector_id;
        let applied = self.reconciler.apply_batch(connector_id, &page.items).await?;
        report.items += page.items.len();
        report.inserted += applied.inserted;
        report.duplicates += applied.duplicates;

        report.children_scheduled += self.schedule_children(task, page).await?;

        self.states
            .store_state(&task.state_id, page.new_state.clone())
            .await?;
        Ok(())
    }

    /// One `RunNow` task per (child node, parent item). Returns how many
    /// were newly scheduled.
    async fn schedule_children(
        &self,
        task: &TaskDescriptor,
        page: &FetchedPage,
    ) -> Result<usize, SyncError> {
        if task.node.children.is_empty() {
            return Ok(0);
        }
        let parents = page.items.parents();
        let mut scheduled = 0;
        for child in &task.node.children {
            for (parent_reference, payload) in &parents {
                let descriptor = TaskDescriptor {
                    state_id: StateId::new(
                        task.state_id.connector_id.clone(),
                        child.kind,
                        Some(parent_reference.clone()),
                    ),
                    node: child.clone(),
                    from_payload: Some(payload.clone()),
                };
                match self
                    .scheduler
                    .schedule(descriptor, ScheduleOptions::run_now())
                    .await
                {
                    Ok(()) => scheduled += 1,
                    Err(e) if e.is_already_scheduled() => {
                        debug!(kind = %child.kind, parent = %parent_reference, "child task already scheduled");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(scheduled)
    }
}
