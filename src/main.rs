use std::sync::Arc;

use async_trait::async_trait;
use dotenvy::dotenv;
use invoice_session::{ApiConfig, Confirmation, DomainError, HttpInvoiceApi, InvoiceService};

/// Headless stand-in for the modal: logs every prompt and declines choices.
struct LoggedConfirmation;

#[async_trait]
impl Confirmation for LoggedConfirmation {
    async fn confirm(&self, message: &str, expect_choice: bool) -> bool {
        log::info!("{}", message);
        !expect_choice
    }
}

#[tokio::main]
async fn main() -> Result<(), DomainError> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = ApiConfig::from_env()?;
    let api = HttpInvoiceApi::from_config(&config)?;
    log::info!("Opening invoice session against {}", config.base_url);

    let session = InvoiceService::new(Arc::new(api), Arc::new(LoggedConfirmation));
    let (snapshot, products) =
        tokio::try_join!(session.invoice_collection(), session.get_products())?;

    log::info!(
        "Loaded {} invoices and {} products",
        snapshot.invoices.len(),
        products.len()
    );
    for view in snapshot.invoices.iter() {
        let customer = view
            .customer
            .as_ref()
            .map_or("unknown customer", |c| c.name.as_str());
        let total = view
            .invoice
            .total
            .as_ref()
            .map_or_else(|| "-".to_string(), ToString::to_string);
        log::info!("Invoice {} for {}: total {}", view.id(), customer, total);
    }

    session.shutdown().await;
    Ok(())
}
