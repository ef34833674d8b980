pub mod current_invoice;
pub mod delete_flow;
pub mod invoice_collection;
pub mod invoice_detail;
pub mod invoice_form;
pub mod invoice_service;
pub mod resource_cache;
