pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod models;

#[cfg(test)]
mod test_support;

pub use application::invoice_service::InvoiceService;
pub use config::ApiConfig;
pub use domain::errors::DomainError;
pub use domain::ports::{Confirmation, InvoiceApi};
pub use infrastructure::http_api::HttpInvoiceApi;
