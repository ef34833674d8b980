use std::sync::Arc;

use log::{debug, info};
use tokio::sync::{watch, OnceCell};

use super::resource_cache::ResourceCache;
use crate::domain::errors::DomainError;
use crate::domain::invoice::{attach_customer, attach_customers, Collection, InvoiceView};
use crate::models::{Customer, Invoice, InvoiceId};

#[derive(Debug, Clone)]
pub struct InvoiceSnapshot {
    pub version: u64,
    pub invoices: Collection<InvoiceView>,
}

impl InvoiceSnapshot {
    pub fn find(&self, id: InvoiceId) -> Option<&InvoiceView> {
        self.invoices.iter().find(|invoice| invoice.id() == id)
    }
}

/// Invoices joined with customers, folded forward by adds and removals.
#[derive(Clone)]
pub struct InvoiceCollection {
    inner: Arc<Inner>,
}

struct Inner {
    invoices: ResourceCache<Invoice>,
    customers: ResourceCache<Customer>,
    seeded: OnceCell<()>,
    state: watch::Sender<Option<InvoiceSnapshot>>,
}

impl InvoiceCollection {
    pub fn new(invoices: ResourceCache<Invoice>, customers: ResourceCache<Customer>) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                invoices,
                customers,
                seeded: OnceCell::new(),
                state,
            }),
        }
    }

    /// Seed the collection if that has not happened yet and return the latest snapshot.
    pub async fn load(&self) -> Result<InvoiceSnapshot, DomainError> {
        self.inner.seeded.get_or_try_init(|| self.seed()).await?;
        self.current()
            .ok_or_else(|| DomainError::Internal("invoice collection was not seeded".to_string()))
    }

    /// Append a newly created invoice, joined with its customer.
    pub async fn add(&self, invoice: Invoice) -> Result<InvoiceSnapshot, DomainError> {
        self.load().await?;
        let customers = self.inner.customers.get().await?;
        let view = attach_customer(invoice, &customers);
        let id = view.id();

        let snapshot = self
            .apply(move |invoices| {
                invoices.push(view);
                true
            })
            .ok_or_else(|| DomainError::Internal("invoice collection was not seeded".to_string()))?;
        info!("Added invoice {} (collection v{})", id, snapshot.version);
        Ok(snapshot)
    }

    /// Drop the invoice with `id`. Returns whether the collection held it.
    pub async fn remove(&self, id: InvoiceId) -> Result<bool, DomainError> {
        self.load().await?;
        let removed = self.apply(|invoices| {
            let before = invoices.len();
            invoices.retain(|invoice| invoice.id() != id);
            invoices.len() != before
        });

        match removed {
            Some(snapshot) => {
                info!("Removed invoice {} (collection v{})", id, snapshot.version);
                Ok(true)
            }
            None => {
                debug!("Invoice {} was not in the collection", id);
                Ok(false)
            }
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<InvoiceSnapshot>> {
        self.inner.state.subscribe()
    }

    pub fn current(&self) -> Option<InvoiceSnapshot> {
        self.inner.state.borrow().clone()
    }

    pub fn find(&self, id: InvoiceId) -> Option<InvoiceView> {
        self.inner
            .state
            .borrow()
            .as_ref()
            .and_then(|snapshot| snapshot.find(id).cloned())
    }

    async fn seed(&self) -> Result<(), DomainError> {
        let (invoices, customers) =
            tokio::try_join!(self.inner.invoices.get(), self.inner.customers.get())?;
        let joined = attach_customers(&invoices, &customers);
        info!("Seeded invoice collection with {} invoices", joined.len());

        self.inner.state.send_replace(Some(InvoiceSnapshot {
            version: 1,
            invoices: Arc::new(joined),
        }));
        Ok(())
    }

    // `edit` returns false when it left the list untouched; nothing is published then.
    fn apply<F>(&self, edit: F) -> Option<InvoiceSnapshot>
    where
        F: FnOnce(&mut Vec<InvoiceView>) -> bool,
    {
        let mut published = None;
        self.inner.state.send_if_modified(|state| {
            let Some(current) = state.as_ref() else {
                return false;
            };
            let mut invoices = current.invoices.as_ref().clone();
            if !edit(&mut invoices) {
                return false;
            }
            let next = InvoiceSnapshot {
                version: current.version + 1,
                invoices: Arc::new(invoices),
            };
            published = Some(next.clone());
            *state = Some(next);
            true
        });
        published
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{collection_for, customer, invoice, FakeApi};

    fn ids(snapshot: &InvoiceSnapshot) -> Vec<InvoiceId> {
        snapshot.invoices.iter().map(InvoiceView::id).collect()
    }

    #[tokio::test]
    async fn seed_joins_invoices_with_customers() {
        let api = FakeApi::new();
        api.invoices.respond(vec![invoice(1, Some(5))]);
        api.customers.respond(vec![customer(5, "A")]);
        let collection = collection_for(&api);

        let snapshot = collection.load().await.expect("seed");

        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.invoices.len(), 1);
        assert_eq!(snapshot.invoices[0].invoice.customer_id, Some(5));
        assert_eq!(snapshot.invoices[0].customer, Some(customer(5, "A")));
    }

    #[tokio::test]
    async fn seed_happens_once() {
        let api = FakeApi::new();
        api.invoices.respond(vec![invoice(1, None)]);
        let collection = collection_for(&api);

        collection.load().await.expect("first load");
        collection.load().await.expect("second load");

        assert_eq!(api.invoices.calls(), 1);
        assert_eq!(api.customers.calls(), 1);
    }

    #[tokio::test]
    async fn failed_seed_is_retried_on_next_load() {
        let api = FakeApi::new();
        api.invoices
            .respond_once(Err(DomainError::Transport("offline".to_string())));
        api.invoices.respond(vec![invoice(1, None)]);
        let collection = collection_for(&api);

        assert!(collection.load().await.is_err());
        assert!(collection.current().is_none());

        let snapshot = collection.load().await.expect("retry");
        assert_eq!(ids(&snapshot), vec![1]);
        assert_eq!(api.invoices.calls(), 2);
    }

    #[tokio::test]
    async fn add_appends_with_customer_match_or_none() {
        let api = FakeApi::new();
        api.invoices.respond(vec![invoice(1, Some(5))]);
        api.customers.respond(vec![customer(5, "A")]);
        let collection = collection_for(&api);
        collection.load().await.expect("seed");

        let snapshot = collection.add(invoice(2, Some(9))).await.expect("add");

        assert_eq!(ids(&snapshot), vec![1, 2]);
        assert!(snapshot.invoices[1].customer.is_none());
        assert_eq!(snapshot.version, 2);
    }

    #[tokio::test]
    async fn add_before_load_seeds_first() {
        let api = FakeApi::new();
        api.invoices.respond(vec![invoice(1, None)]);
        let collection = collection_for(&api);

        let snapshot = collection.add(invoice(2, None)).await.expect("add");

        assert_eq!(ids(&snapshot), vec![1, 2]);
    }

    #[tokio::test]
    async fn remove_filters_matching_id() {
        let api = FakeApi::new();
        api.invoices
            .respond(vec![invoice(1, Some(5)), invoice(2, Some(9))]);
        let collection = collection_for(&api);

        assert!(collection.remove(1).await.expect("remove"));
        assert!(!collection.remove(1).await.expect("second remove"));

        let snapshot = collection.current().expect("seeded");
        assert_eq!(ids(&snapshot), vec![2]);
        assert_eq!(snapshot.version, 2);
    }

    #[tokio::test]
    async fn concurrent_edits_are_not_lost() {
        let api = FakeApi::new();
        api.invoices.respond(vec![invoice(1, None), invoice(2, None)]);
        let collection = collection_for(&api);
        collection.load().await.expect("seed");

        let adding = tokio::spawn({
            let collection = collection.clone();
            async move { collection.add(invoice(3, None)).await }
        });
        let removing = tokio::spawn({
            let collection = collection.clone();
            async move { collection.remove(1).await }
        });
        adding.await.expect("join").expect("add");
        removing.await.expect("join").expect("remove");

        let snapshot = collection.current().expect("seeded");
        assert_eq!(ids(&snapshot), vec![2, 3]);
        assert_eq!(snapshot.version, 3);
    }

    #[tokio::test]
    async fn subscribers_receive_latest_snapshot() {
        let api = FakeApi::new();
        api.invoices.respond(vec![invoice(1, None)]);
        let collection = collection_for(&api);
        collection.add(invoice(4, None)).await.expect("add");

        let rx = collection.subscribe();
        let latest = rx.borrow().clone().expect("snapshot");
        assert_eq!(ids(&latest), vec![1, 4]);
        assert_eq!(collection.find(4).map(|v| v.id()), Some(4));
        assert!(collection.find(9).is_none());
    }
}
