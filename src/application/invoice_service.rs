use std::sync::Arc;

use bigdecimal::BigDecimal;
use log::info;
use tokio::sync::{broadcast, watch};

use super::current_invoice::CurrentInvoiceLookup;
use super::delete_flow::{DeleteEvent, DeleteFlow, DeleteOutcome};
use super::invoice_collection::{InvoiceCollection, InvoiceSnapshot};
use super::invoice_detail::{DetailEvent, DetailTicket, InvoiceDetailAssembler};
use super::resource_cache::ResourceCache;
use crate::domain::errors::DomainError;
use crate::domain::invoice::Collection;
use crate::domain::ports::{Confirmation, InvoiceApi};
use crate::models::{Customer, Invoice, InvoiceDraft, InvoiceId, Product};

pub struct InvoiceService<A, C> {
    api: Arc<A>,
    invoices: ResourceCache<Invoice>,
    products: ResourceCache<Product>,
    customers: ResourceCache<Customer>,
    collection: InvoiceCollection,
    detail: InvoiceDetailAssembler<A>,
    deletes: DeleteFlow<A, C>,
}

impl<A: InvoiceApi, C: Confirmation> InvoiceService<A, C> {
    pub fn new(api: Arc<A>, confirmation: Arc<C>) -> Self {
        let invoices = {
            let api = Arc::clone(&api);
            ResourceCache::new("invoices", move || {
                let api = Arc::clone(&api);
                async move { api.list_invoices().await }
            })
        };
        let products = {
            let api = Arc::clone(&api);
            ResourceCache::new("products", move || {
                let api = Arc::clone(&api);
                async move { api.list_products().await }
            })
        };
        let customers = {
            let api = Arc::clone(&api);
            ResourceCache::new("customers", move || {
                let api = Arc::clone(&api);
                async move { api.list_customers().await }
            })
        };

        let collection = InvoiceCollection::new(invoices.clone(), customers.clone());
        let lookup = CurrentInvoiceLookup::new(collection.clone());
        let detail = InvoiceDetailAssembler::new(Arc::clone(&api), products.clone(), lookup);
        let deletes = DeleteFlow::new(Arc::clone(&api), confirmation, collection.clone());

        Self {
            api,
            invoices,
            products,
            customers,
            collection,
            detail,
            deletes,
        }
    }

    /// The base invoice list as fetched from the server, without customers.
    pub async fn get_invoices(&self) -> Result<Collection<Invoice>, DomainError> {
        self.invoices.get().await
    }

    pub async fn get_products(&self) -> Result<Collection<Product>, DomainError> {
        self.products.get().await
    }

    pub async fn get_customers(&self) -> Result<Collection<Customer>, DomainError> {
        self.customers.get().await
    }

    /// The invoice collection as displayed: customers attached, adds and
    /// deletions folded in.
    pub async fn invoice_collection(&self) -> Result<InvoiceSnapshot, DomainError> {
        self.collection.load().await
    }

    pub fn subscribe_collection(&self) -> watch::Receiver<Option<InvoiceSnapshot>> {
        self.collection.subscribe()
    }

    pub fn view_invoice(&self, id: Option<InvoiceId>) -> DetailTicket {
        self.detail.request(id)
    }

    pub fn subscribe_detail(&self) -> broadcast::Receiver<DetailEvent> {
        self.detail.subscribe()
    }

    /// Create an invoice on the server and append it to the collection.
    pub async fn create_invoice(&self, draft: InvoiceDraft) -> Result<Invoice, DomainError> {
        let request = draft.into_request()?;
        let created = self.api.create_invoice(&request).await?;
        info!("Created invoice {}", created.id);
        self.collection.add(created.clone()).await?;
        Ok(created)
    }

    pub fn open_delete_modal(&self, id: InvoiceId) {
        self.deletes.open(id);
    }

    pub async fn delete_invoice(&self, id: InvoiceId) -> Result<DeleteOutcome, DomainError> {
        self.deletes.run(id).await
    }

    pub fn subscribe_deletions(&self) -> watch::Receiver<Option<DeleteEvent>> {
        self.deletes.subscribe()
    }

    /// Price of the product named `name`, `None` when the catalog has no such product.
    pub async fn product_price(&self, name: &str) -> Result<Option<BigDecimal>, DomainError> {
        let products = self.products.get().await?;
        Ok(products
            .iter()
            .find(|product| product.name == name)
            .map(|product| product.price.clone()))
    }

    /// Stop live detail pipelines and wait for open delete flows.
    pub async fn shutdown(&self) {
        self.detail.close();
        self.deletes.wait_idle().await;
        info!("Invoice session closed");
    }
}
