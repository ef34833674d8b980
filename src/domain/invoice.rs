use std::sync::Arc;

use serde::Serialize;

use crate::models::{Customer, Invoice, InvoiceId, InvoiceItem, Product};

/// Shared, immutable snapshot of a fetched collection.
pub type Collection<T> = Arc<Vec<T>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceView {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub customer: Option<Customer>,
}

impl InvoiceView {
    pub fn id(&self) -> InvoiceId {
        self.invoice.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceItemView {
    #[serde(flatten)]
    pub item: InvoiceItem,
    pub product: Option<Product>,
}

/// A single invoice with its line items enriched for display. Serializes as the
/// invoice summary with `items` holding the enriched lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: InvoiceView,
    pub items: Vec<InvoiceItemView>,
}

impl InvoiceDetail {
    /// Merge a summary with freshly enriched items, dropping whatever short
    /// item list the summary carried.
    pub fn assemble(mut summary: InvoiceView, items: Vec<InvoiceItemView>) -> Self {
        summary.invoice.items.clear();
        Self {
            invoice: summary,
            items,
        }
    }
}

pub fn attach_customer(invoice: Invoice, customers: &[Customer]) -> InvoiceView {
    let customer = invoice
        .customer_id
        .and_then(|id| customers.iter().find(|c| c.id == id))
        .cloned();
    InvoiceView { invoice, customer }
}

pub fn attach_customers(invoices: &[Invoice], customers: &[Customer]) -> Vec<InvoiceView> {
    invoices
        .iter()
        .cloned()
        .map(|invoice| attach_customer(invoice, customers))
        .collect()
}

pub fn attach_products(items: &[InvoiceItem], products: &[Product]) -> Vec<InvoiceItemView> {
    items
        .iter()
        .map(|item| InvoiceItemView {
            item: item.clone(),
            product: products.iter().find(|p| p.id == item.product_id).cloned(),
        })
        .collect()
}
