use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::customer::CustomerId;
use super::invoice_item::{InvoiceItem, InvoiceItemDraft, NewInvoiceItem};
use crate::domain::errors::DomainError;

pub type InvoiceId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    /// Discount in percent.
    #[serde(default)]
    pub discount: Option<BigDecimal>,
    #[serde(default)]
    pub total: Option<BigDecimal>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<InvoiceItem>,
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Invoice data collected by the create/edit form.
///
/// Only the named fields are accepted; a payload carrying anything else is
/// rejected rather than silently trimmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InvoiceDraft {
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub discount: Option<BigDecimal>,
    #[serde(default)]
    pub total: Option<BigDecimal>,
    #[serde(default)]
    pub items: Vec<InvoiceItemDraft>,
}

/// Body accepted by `POST invoices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInvoiceRequest {
    pub customer_id: Option<CustomerId>,
    pub discount: Option<BigDecimal>,
    pub total: Option<BigDecimal>,
    pub items: Vec<NewInvoiceItem>,
}

impl InvoiceDraft {
    pub fn from_json(value: serde_json::Value) -> Result<Self, DomainError> {
        serde_json::from_value(value)
            .map_err(|e| DomainError::InvalidInput(format!("invalid invoice payload: {e}")))
    }

    /// Validate the draft and shape it into the create request.
    pub fn into_request(self) -> Result<NewInvoiceRequest, DomainError> {
        if let Some(discount) = &self.discount {
            if *discount < BigDecimal::from(0) || *discount > BigDecimal::from(100) {
                return Err(DomainError::InvalidInput(format!(
                    "discount must be between 0 and 100, got {discount}"
                )));
            }
        }
        if let Some(item) = self.items.iter().find(|i| i.quantity <= 0) {
            return Err(DomainError::InvalidInput(format!(
                "quantity for product {} must be positive, got {}",
                item.product_id, item.quantity
            )));
        }

        Ok(NewInvoiceRequest {
            customer_id: self.customer_id,
            discount: self.discount,
            total: self.total,
            items: self.items.into_iter().map(NewInvoiceItem::from).collect(),
        })
    }
}
