use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::config::ApiConfig;
use crate::domain::errors::DomainError;
use crate::domain::ports::InvoiceApi;
use crate::models::{Customer, Invoice, InvoiceId, InvoiceItem, NewInvoiceRequest, Product};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<reqwest::Error> for DomainError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            DomainError::Decode(e.to_string())
        } else {
            DomainError::Transport(e.to_string())
        }
    }
}

// ── Adapter ───────────────────────────────────────────────────────────────────

pub struct HttpInvoiceApi {
    client: Client,
    base_url: Url,
}

impl HttpInvoiceApi {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, DomainError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: with_trailing_slash(base_url),
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, DomainError> {
        Self::new(config.base_url.clone(), config.timeout)
    }

    fn url(&self, path: &str) -> Result<Url, DomainError> {
        self.base_url
            .join(path)
            .map_err(|e| DomainError::InvalidInput(format!("bad resource path '{path}': {e}")))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, DomainError> {
        debug!("GET {}", path);
        let response = self.client.get(self.url(path)?).send().await?;
        decode(path, response).await
    }
}

#[async_trait]
impl InvoiceApi for HttpInvoiceApi {
    async fn list_invoices(&self) -> Result<Vec<Invoice>, DomainError> {
        self.get("invoices").await
    }

    async fn list_invoice_items(&self, id: InvoiceId) -> Result<Vec<InvoiceItem>, DomainError> {
        self.get(&format!("invoices/{id}/items")).await
    }

    async fn create_invoice(&self, body: &NewInvoiceRequest) -> Result<Invoice, DomainError> {
        debug!("POST invoices");
        let response = self
            .client
            .post(self.url("invoices")?)
            .json(body)
            .send()
            .await?;
        decode("invoices", response).await
    }

    async fn delete_invoice(&self, id: InvoiceId) -> Result<Invoice, DomainError> {
        let path = format!("invoices/{id}");
        debug!("DELETE {}", path);
        let response = self.client.delete(self.url(&path)?).send().await?;
        decode(&path, response).await
    }

    async fn list_products(&self) -> Result<Vec<Product>, DomainError> {
        self.get("products").await
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, DomainError> {
        self.get("customers").await
    }
}

async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, DomainError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(DomainError::NotFound {
            path: path.to_string(),
        });
    }
    if !status.is_success() {
        return Err(DomainError::Status {
            status: status.as_u16(),
            path: path.to_string(),
        });
    }

    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| DomainError::Decode(format!("{path}: {e}")))
}

// `Url::join` drops the last segment of a base without a trailing slash.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base: &str) -> HttpInvoiceApi {
        HttpInvoiceApi::new(Url::parse(base).expect("url"), Duration::from_secs(1))
            .expect("client")
    }

    #[test]
    fn joins_resource_paths_onto_base() {
        let api = api("http://invoices.test/api/");
        assert_eq!(
            api.url("invoices/7/items").expect("url").as_str(),
            "http://invoices.test/api/invoices/7/items"
        );
    }

    #[test]
    fn base_without_trailing_slash_keeps_its_last_segment() {
        let api = api("http://invoices.test/api");
        assert_eq!(
            api.url("invoices").expect("url").as_str(),
            "http://invoices.test/api/invoices"
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let api = api("http://127.0.0.1:9/");
        assert!(matches!(
            api.list_invoices().await,
            Err(DomainError::Transport(_))
        ));
    }
}
