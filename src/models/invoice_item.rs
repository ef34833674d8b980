use serde::{Deserialize, Serialize};

use super::invoice::InvoiceId;
use super::product::ProductId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub invoice_id: Option<InvoiceId>,
    pub product_id: ProductId,
    pub quantity: i32,
}

/// One line of an [`InvoiceDraft`](super::InvoiceDraft) as collected from the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InvoiceItemDraft {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Line item body accepted by `POST invoices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInvoiceItem {
    pub product_id: ProductId,
    pub quantity: i32,
}

impl From<InvoiceItemDraft> for NewInvoiceItem {
    fn from(draft: InvoiceItemDraft) -> Self {
        Self {
            product_id: draft.product_id,
            quantity: draft.quantity,
        }
    }
}
