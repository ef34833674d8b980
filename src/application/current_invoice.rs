use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, warn};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::invoice_collection::InvoiceCollection;
use crate::domain::errors::DomainError;
use crate::domain::invoice::InvoiceView;
use crate::models::InvoiceId;

#[derive(Debug, Clone, PartialEq)]
pub enum LookupState {
    Idle,
    Pending(InvoiceId),
    Resolved {
        id: InvoiceId,
        invoice: Option<InvoiceView>,
    },
    Failed {
        id: InvoiceId,
        error: DomainError,
    },
}

impl LookupState {
    pub fn id(&self) -> Option<InvoiceId> {
        match self {
            LookupState::Idle => None,
            LookupState::Pending(id)
            | LookupState::Resolved { id, .. }
            | LookupState::Failed { id, .. } => Some(*id),
        }
    }
}

#[derive(Clone)]
pub struct CurrentInvoiceLookup {
    inner: Arc<Inner>,
}

struct Inner {
    collection: InvoiceCollection,
    state: watch::Sender<LookupState>,
    follower: Mutex<Option<(InvoiceId, CancellationToken)>>,
    shutdown: CancellationToken,
}

impl CurrentInvoiceLookup {
    pub fn new(collection: InvoiceCollection) -> Self {
        let (state, _) = watch::channel(LookupState::Idle);
        Self {
            inner: Arc::new(Inner {
                collection,
                state,
                follower: Mutex::new(None),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn select(&self, id: InvoiceId) {
        let mut follower = self
            .inner
            .follower
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let failed = matches!(*self.inner.state.borrow(), LookupState::Failed { .. });
        if let Some((current, _)) = follower.as_ref() {
            if *current == id && !failed {
                debug!("Invoice {} already selected", id);
                return;
            }
        }
        if let Some((previous, token)) = follower.take() {
            debug!("Abandoning lookup of invoice {}", previous);
            token.cancel();
        }

        let token = self.inner.shutdown.child_token();
        self.inner.state.send_replace(LookupState::Pending(id));
        *follower = Some((id, token.clone()));
        tokio::spawn(follow(Arc::clone(&self.inner), id, token));
    }

    /// Observe the lookup. The receiver starts at the latest state.
    pub fn subscribe(&self) -> watch::Receiver<LookupState> {
        self.inner.state.subscribe()
    }

    pub fn current(&self) -> LookupState {
        self.inner.state.borrow().clone()
    }

    pub fn close(&self) {
        self.inner.shutdown.cancel();
    }
}

async fn follow(inner: Arc<Inner>, id: InvoiceId, token: CancellationToken) {
    let mut rx = inner.collection.subscribe();

    tokio::select! {
        _ = token.cancelled() => return,
        seeded = inner.collection.load() => {
            if let Err(error) = seeded {
                warn!("Lookup of invoice {} failed: {}", id, error);
                publish(&inner, &token, LookupState::Failed { id, error });
                return;
            }
        }
    }

    loop {
        let invoice = rx
            .borrow_and_update()
            .as_ref()
            .and_then(|snapshot| snapshot.find(id).cloned());
        publish(&inner, &token, LookupState::Resolved { id, invoice });

        tokio::select! {
            _ = token.cancelled() => return,
            changed = rx.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}

// The token is checked under the channel lock so an abandoned follower never
// overwrites the state of the one that replaced it.
fn publish(inner: &Inner, token: &CancellationToken, next: LookupState) {
    inner.state.send_if_modified(|state| {
        if token.is_cancelled() || *state == next {
            return false;
        }
        *state = next;
        true
    });
}
