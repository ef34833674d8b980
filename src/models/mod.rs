pub mod customer;
pub mod invoice;
pub mod invoice_item;
pub mod product;

pub use customer::{Customer, CustomerId};
pub use invoice::{Invoice, InvoiceDraft, InvoiceId, NewInvoiceRequest};
pub use invoice_item::{InvoiceItem, InvoiceItemDraft, NewInvoiceItem};
pub use product::{Product, ProductId};
