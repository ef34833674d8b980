use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info, warn};
use tokio::sync::{broadcast, oneshot};
use tokio_util::sync::CancellationToken;

use super::current_invoice::{CurrentInvoiceLookup, LookupState};
use super::resource_cache::ResourceCache;
use crate::domain::errors::DomainError;
use crate::domain::invoice::{attach_products, InvoiceDetail};
use crate::domain::ports::InvoiceApi;
use crate::models::{InvoiceId, InvoiceItem, Product};

const DETAIL_CHANNEL_CAPACITY: usize = 16;

pub type DetailResult = Result<Option<InvoiceDetail>, DomainError>;

#[derive(Debug, Clone)]
pub struct DetailEvent {
    pub id: Option<InvoiceId>,
    pub result: DetailResult,
}

/// Handle on a single detail request.
pub struct DetailTicket {
    id: Option<InvoiceId>,
    first: oneshot::Receiver<DetailResult>,
}

impl DetailTicket {
    pub fn id(&self) -> Option<InvoiceId> {
        self.id
    }

    /// The first result of this request, or `Superseded` if a newer request
    /// cancelled it before it produced one.
    pub async fn first(self) -> DetailResult {
        self.first.await.unwrap_or(Err(DomainError::Superseded))
    }
}

/// Assembles the detail view of one invoice. Only the most recent request stays
/// alive, and results are not replayed to later subscribers.
pub struct InvoiceDetailAssembler<A> {
    inner: Arc<Inner<A>>,
}

struct Inner<A> {
    api: Arc<A>,
    products: ResourceCache<Product>,
    lookup: CurrentInvoiceLookup,
    events: broadcast::Sender<DetailEvent>,
    active: Mutex<Option<CancellationToken>>,
    shutdown: CancellationToken,
}

impl<A> Clone for InvoiceDetailAssembler<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: InvoiceApi> InvoiceDetailAssembler<A> {
    pub fn new(
        api: Arc<A>,
        products: ResourceCache<Product>,
        lookup: CurrentInvoiceLookup,
    ) -> Self {
        let (events, _) = broadcast::channel(DETAIL_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                api,
                products,
                lookup,
                events,
                active: Mutex::new(None),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Start assembling the detail view for `id`, abandoning any earlier request.
    pub fn request(&self, id: Option<InvoiceId>) -> DetailTicket {
        if let Some(id) = id {
            self.inner.lookup.select(id);
        }

        let token = self.inner.shutdown.child_token();
        {
            let mut active = self
                .inner
                .active
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(previous) = active.replace(token.clone()) {
                debug!("Detail request superseded by invoice {:?}", id);
                previous.cancel();
            }
        }

        let (tx, rx) = oneshot::channel();
        tokio::spawn(assemble(Arc::clone(&self.inner), id, token, tx));
        DetailTicket { id, first: rx }
    }

    /// Observe detail results from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<DetailEvent> {
        self.inner.events.subscribe()
    }

    pub fn close(&self) {
        self.inner.shutdown.cancel();
        self.inner.lookup.close();
    }
}

async fn assemble<A: InvoiceApi>(
    inner: Arc<Inner<A>>,
    id: Option<InvoiceId>,
    token: CancellationToken,
    first: oneshot::Sender<DetailResult>,
) {
    let mut first = Some(first);

    let Some(id) = id else {
        emit(&inner, &token, &mut first, None, Ok(None));
        return;
    };

    let items = tokio::select! {
        _ = token.cancelled() => return,
        prepared = prepare(&inner, id) => match prepared {
            Ok(items) => items,
            Err(e) => {
                warn!("Assembling invoice {} failed: {}", id, e);
                emit(&inner, &token, &mut first, Some(id), Err(e));
                return;
            }
        },
    };

    let mut products_rx = inner.products.subscribe();
    let mut lookup_rx = inner.lookup.subscribe();
    loop {
        products_rx.borrow_and_update();
        let products = inner.products.current().unwrap_or_default();
        let state = lookup_rx.borrow_and_update().clone();

        let result = match state {
            LookupState::Resolved {
                id: found,
                invoice,
            } if found == id => Some(Ok(invoice.map(|summary| {
                InvoiceDetail::assemble(summary, attach_products(&items, &products))
            }))),
            LookupState::Failed { id: found, error } if found == id => Some(Err(error)),
            _ => None,
        };

        if let Some(result) = result {
            let failed = result.is_err();
            if !emit(&inner, &token, &mut first, Some(id), result) || failed {
                return;
            }
        }

        tokio::select! {
            _ = token.cancelled() => return,
            changed = products_rx.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            changed = lookup_rx.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}

async fn prepare<A: InvoiceApi>(
    inner: &Inner<A>,
    id: InvoiceId,
) -> Result<Vec<InvoiceItem>, DomainError> {
    let (items, _) = tokio::try_join!(inner.api.list_invoice_items(id), inner.products.get())?;
    debug!("Fetched {} items for invoice {}", items.len(), id);

    let mut lookup_rx = inner.lookup.subscribe();
    lookup_rx
        .wait_for(|state| {
            matches!(
                state,
                LookupState::Resolved { id: found, .. } | LookupState::Failed { id: found, .. }
                    if *found == id
            )
        })
        .await
        .map_err(|_| DomainError::Internal("invoice lookup dropped".to_string()))?;
    Ok(items)
}

// Emission happens under the same lock `request` uses to cancel, so once a newer
// request has been made nothing from an older pipeline gets out.
fn emit<A>(
    inner: &Inner<A>,
    token: &CancellationToken,
    first: &mut Option<oneshot::Sender<DetailResult>>,
    id: Option<InvoiceId>,
    result: DetailResult,
) -> bool {
    let _active = inner.active.lock().unwrap_or_else(PoisonError::into_inner);
    if token.is_cancelled() {
        return false;
    }
    if let Some(tx) = first.take() {
        let _ = tx.send(result.clone());
    }
    if let Ok(Some(detail)) = &result {
        info!(
            "Assembled invoice {} with {} items",
            detail.invoice.id(),
            detail.items.len()
        );
    }
    // No subscribers is fine: results are not replayed.
    let _ = inner.events.send(DetailEvent { id, result });
    true
}
