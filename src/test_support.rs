use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use tokio::sync::Semaphore;

use crate::application::invoice_collection::InvoiceCollection;
use crate::application::resource_cache::ResourceCache;
use crate::domain::errors::DomainError;
use crate::domain::ports::{Confirmation, InvoiceApi};
use crate::models::{
    Customer, CustomerId, Invoice, InvoiceId, InvoiceItem, NewInvoiceRequest, Product, ProductId,
};

pub fn customer(id: CustomerId, name: &str) -> Customer {
    Customer {
        id,
        name: name.to_string(),
        address: None,
        phone: None,
        created_at: None,
        updated_at: None,
    }
}

pub fn product(id: ProductId, name: &str, price: i64) -> Product {
    Product {
        id,
        name: name.to_string(),
        price: BigDecimal::from(price),
        created_at: None,
        updated_at: None,
    }
}

pub fn invoice(id: InvoiceId, customer_id: Option<CustomerId>) -> Invoice {
    Invoice {
        id,
        customer_id,
        discount: None,
        total: None,
        items: vec![],
        created_at: None,
        updated_at: None,
    }
}

pub fn item(product_id: ProductId, quantity: i32) -> InvoiceItem {
    InvoiceItem {
        id: None,
        invoice_id: None,
        product_id,
        quantity,
    }
}

pub fn products_cache(api: &Arc<FakeApi>) -> ResourceCache<Product> {
    let api = Arc::clone(api);
    ResourceCache::new("products", move || {
        let api = Arc::clone(&api);
        async move { api.list_products().await }
    })
}

pub fn collection_for(api: &Arc<FakeApi>) -> InvoiceCollection {
    let invoices = {
        let api = Arc::clone(api);
        ResourceCache::new("invoices", move || {
            let api = Arc::clone(&api);
            async move { api.list_invoices().await }
        })
    };
    let customers = {
        let api = Arc::clone(api);
        ResourceCache::new("customers", move || {
            let api = Arc::clone(&api);
            async move { api.list_customers().await }
        })
    };
    InvoiceCollection::new(invoices, customers)
}

/// Holds calls until permits are released.
#[derive(Clone)]
pub struct Gate(Arc<Semaphore>);

impl Gate {
    fn closed() -> Self {
        Self(Arc::new(Semaphore::new(0)))
    }

    pub fn release(&self, calls: usize) {
        self.0.add_permits(calls);
    }

    async fn pass(&self) {
        self.0
            .acquire()
            .await
            .expect("gate semaphore closed")
            .forget();
    }
}

/// A scripted endpoint: queued one-shot responses first, then the default.
pub struct Endpoint<T> {
    default: Mutex<Result<T, DomainError>>,
    queued: Mutex<VecDeque<Result<T, DomainError>>>,
    gate: Mutex<Option<Gate>>,
    calls: AtomicUsize,
}

impl<T: Clone> Endpoint<T> {
    fn new(default: T) -> Self {
        Self {
            default: Mutex::new(Ok(default)),
            queued: Mutex::new(VecDeque::new()),
            gate: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn respond(&self, value: T) {
        *self.default.lock().unwrap() = Ok(value);
    }

    pub fn fail(&self, error: DomainError) {
        *self.default.lock().unwrap() = Err(error);
    }

    pub fn respond_once(&self, result: Result<T, DomainError>) {
        self.queued.lock().unwrap().push_back(result);
    }

    pub fn hold(&self) -> Gate {
        let gate = Gate::closed();
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn call(&self) -> Result<T, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        let queued = self.queued.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| self.default.lock().unwrap().clone())
    }
}

pub struct FakeApi {
    pub invoices: Endpoint<Vec<Invoice>>,
    pub products: Endpoint<Vec<Product>>,
    pub customers: Endpoint<Vec<Customer>>,
    pub deletes: Endpoint<()>,
    pub creates: Endpoint<()>,
    items: Mutex<HashMap<InvoiceId, Vec<InvoiceItem>>>,
    item_gates: Mutex<HashMap<InvoiceId, Gate>>,
    item_calls: Mutex<Vec<InvoiceId>>,
    deleted: Mutex<Vec<InvoiceId>>,
    created: Mutex<Vec<NewInvoiceRequest>>,
    next_id: AtomicI64,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            invoices: Endpoint::new(vec![]),
            products: Endpoint::new(vec![]),
            customers: Endpoint::new(vec![]),
            deletes: Endpoint::new(()),
            creates: Endpoint::new(()),
            items: Mutex::new(HashMap::new()),
            item_gates: Mutex::new(HashMap::new()),
            item_calls: Mutex::new(vec![]),
            deleted: Mutex::new(vec![]),
            created: Mutex::new(vec![]),
            next_id: AtomicI64::new(100),
        })
    }

    pub fn set_items(&self, id: InvoiceId, items: Vec<InvoiceItem>) {
        self.items.lock().unwrap().insert(id, items);
    }

    pub fn hold_items(&self, id: InvoiceId) -> Gate {
        let gate = Gate::closed();
        self.item_gates.lock().unwrap().insert(id, gate.clone());
        gate
    }

    pub fn item_calls(&self) -> Vec<InvoiceId> {
        self.item_calls.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<InvoiceId> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<NewInvoiceRequest> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl InvoiceApi for FakeApi {
    async fn list_invoices(&self) -> Result<Vec<Invoice>, DomainError> {
        self.invoices.call().await
    }

    async fn list_invoice_items(&self, id: InvoiceId) -> Result<Vec<InvoiceItem>, DomainError> {
        self.item_calls.lock().unwrap().push(id);
        let gate = self.item_gates.lock().unwrap().get(&id).cloned();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        Ok(self
            .items
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_invoice(&self, body: &NewInvoiceRequest) -> Result<Invoice, DomainError> {
        self.creates.call().await?;
        self.created.lock().unwrap().push(body.clone());
        Ok(Invoice {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            customer_id: body.customer_id,
            discount: body.discount.clone(),
            total: body.total.clone(),
            items: vec![],
            created_at: None,
            updated_at: None,
        })
    }

    async fn delete_invoice(&self, id: InvoiceId) -> Result<Invoice, DomainError> {
        self.deletes.call().await?;
        self.deleted.lock().unwrap().push(id);
        Ok(invoice(id, None))
    }

    async fn list_products(&self) -> Result<Vec<Product>, DomainError> {
        self.products.call().await
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, DomainError> {
        self.customers.call().await
    }
}

/// Scripted modal: queued answers first, then `default_answer`.
pub struct FakeConfirmation {
    answers: Mutex<VecDeque<bool>>,
    default_answer: bool,
    prompts: Mutex<Vec<(String, bool)>>,
}

impl FakeConfirmation {
    pub fn answering(default_answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(VecDeque::new()),
            default_answer,
            prompts: Mutex::new(vec![]),
        })
    }

    pub fn queue(&self, answer: bool) {
        self.answers.lock().unwrap().push_back(answer);
    }

    pub fn prompts(&self) -> Vec<(String, bool)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Confirmation for FakeConfirmation {
    async fn confirm(&self, message: &str, expect_choice: bool) -> bool {
        self.prompts
            .lock()
            .unwrap()
            .push((message.to_string(), expect_choice));
        if !expect_choice {
            return true;
        }
        let queued = self.answers.lock().unwrap().pop_front();
        queued.unwrap_or(self.default_answer)
    }
}
