use std::env;
use std::time::Duration;

use reqwest::Url;

use crate::domain::errors::DomainError;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where the invoice API lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

impl ApiConfig {
    /// Read `INVOICE_API_URL` and `INVOICE_API_TIMEOUT_SECS`, falling back to defaults.
    pub fn from_env() -> Result<Self, DomainError> {
        let base_url = env::var("INVOICE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let timeout_secs = env::var("INVOICE_API_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string());
        Self::parse(&base_url, &timeout_secs)
    }

    pub fn parse(base_url: &str, timeout_secs: &str) -> Result<Self, DomainError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            DomainError::InvalidInput(format!("INVOICE_API_URL '{base_url}' is not a URL: {e}"))
        })?;
        let secs: u64 = timeout_secs.parse().map_err(|e| {
            DomainError::InvalidInput(format!(
                "INVOICE_API_TIMEOUT_SECS '{timeout_secs}' is not a number: {e}"
            ))
        })?;
        if secs == 0 {
            return Err(DomainError::InvalidInput(
                "INVOICE_API_TIMEOUT_SECS must be positive".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            timeout: Duration::from_secs(secs),
        })
    }
}
