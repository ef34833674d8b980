use async_trait::async_trait;

use super::errors::DomainError;
use crate::models::{Customer, Invoice, InvoiceId, InvoiceItem, NewInvoiceRequest, Product};

/// Resource access against the invoice API.
#[async_trait]
pub trait InvoiceApi: Send + Sync + 'static {
    /// `GET invoices`
    async fn list_invoices(&self) -> Result<Vec<Invoice>, DomainError>;
    /// `GET invoices/{id}/items`
    async fn list_invoice_items(&self, id: InvoiceId) -> Result<Vec<InvoiceItem>, DomainError>;
    /// `POST invoices`
    async fn create_invoice(&self, body: &NewInvoiceRequest) -> Result<Invoice, DomainError>;
    /// `DELETE invoices/{id}`, resolving to the deleted invoice.
    async fn delete_invoice(&self, id: InvoiceId) -> Result<Invoice, DomainError>;
    /// `GET products`
    async fn list_products(&self) -> Result<Vec<Product>, DomainError>;
    /// `GET customers`
    async fn list_customers(&self) -> Result<Vec<Customer>, DomainError>;
}

/// Modal confirmation shown to the user.
#[async_trait]
pub trait Confirmation: Send + Sync + 'static {
    /// Ask the user to confirm `message`.
    ///
    /// With `expect_choice == false` the dialog is informational and the
    /// returned value carries no meaning.
    async fn confirm(&self, message: &str, expect_choice: bool) -> bool;
}
