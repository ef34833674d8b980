use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::{watch, Mutex};
use tokio_util::task::TaskTracker;

use super::invoice_collection::InvoiceCollection;
use crate::domain::errors::DomainError;
use crate::domain::ports::{Confirmation, InvoiceApi};
use crate::models::{Invoice, InvoiceId};

pub const DELETE_PROMPT: &str = "Are you sure you want to delete an invoice?";

pub fn deleted_notice(id: InvoiceId) -> String {
    format!("Invoice number {id} has been deleted")
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    Declined(InvoiceId),
    Deleted(Invoice),
}

/// Latest completed deletion, or the error that ended a flow.
pub type DeleteEvent = Result<Invoice, DomainError>;

pub struct DeleteFlow<A, C> {
    inner: Arc<Inner<A, C>>,
}

struct Inner<A, C> {
    api: Arc<A>,
    confirmation: Arc<C>,
    collection: InvoiceCollection,
    events: watch::Sender<Option<DeleteEvent>>,
    tasks: TaskTracker,
    idle: Mutex<()>,
}

impl<A, C> Clone for DeleteFlow<A, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: InvoiceApi, C: Confirmation> DeleteFlow<A, C> {
    pub fn new(api: Arc<A>, confirmation: Arc<C>, collection: InvoiceCollection) -> Self {
        let (events, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                api,
                confirmation,
                collection,
                events,
                tasks: TaskTracker::new(),
                idle: Mutex::new(()),
            }),
        }
    }

    /// Run one flow to completion.
    pub async fn run(&self, id: InvoiceId) -> Result<DeleteOutcome, DomainError> {
        run_flow(&self.inner, id).await
    }

    /// Start a flow in the background. Deletions and failures are published to
    /// `subscribe`; a declined confirmation publishes nothing.
    pub fn open(&self, id: InvoiceId) {
        let inner = Arc::clone(&self.inner);
        self.inner.tasks.spawn(async move {
            let event = match run_flow(&inner, id).await {
                Ok(DeleteOutcome::Declined(_)) => return,
                Ok(DeleteOutcome::Deleted(invoice)) => Ok(invoice),
                Err(e) => Err(e),
            };
            inner.events.send_replace(Some(event));
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<DeleteEvent>> {
        self.inner.events.subscribe()
    }

    /// Wait until every flow started with `open` has finished.
    pub async fn wait_idle(&self) {
        // Concurrent waiters take turns so none of them reopens the tracker
        // while another is still waiting on it.
        let _idle = self.inner.idle.lock().await;
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        self.inner.tasks.reopen();
    }
}

async fn run_flow<A: InvoiceApi, C: Confirmation>(
    inner: &Inner<A, C>,
    id: InvoiceId,
) -> Result<DeleteOutcome, DomainError> {
    if !inner.confirmation.confirm(DELETE_PROMPT, true).await {
        debug!("Deletion of invoice {} declined", id);
        return Ok(DeleteOutcome::Declined(id));
    }

    let deleted = inner.api.delete_invoice(id).await.map_err(|e| {
        warn!("Deleting invoice {} failed: {}", id, e);
        e
    })?;
    info!("Deleted invoice {}", deleted.id);
    if let Err(e) = inner.collection.remove(deleted.id).await {
        warn!("Invoice {} deleted but not dropped from the collection: {}", deleted.id, e);
    }

    inner
        .confirmation
        .confirm(&deleted_notice(deleted.id), false)
        .await;
    Ok(DeleteOutcome::Deleted(deleted))
}
