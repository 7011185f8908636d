//! Delivery of metadata records to the catalog.

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::info;

use crate::config::CatalogConfig;
use crate::error::Result;

/// Status and body returned by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishResponse {
    pub status: u16,
    pub body: String,
}

impl PublishResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait Publisher {
    fn publish(&self, document: &str) -> Result<PublishResponse>;
}

/// Puts metadata documents to the catalog's metadata item endpoint.
#[derive(Debug)]
pub struct HttpPublisher {
    client: Client,
    config: CatalogConfig,
}

impl HttpPublisher {
    pub fn new(config: CatalogConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

impl Publisher for HttpPublisher {
    fn publish(&self, document: &str) -> Result<PublishResponse> {
        let response = self
            .client
            .put(&self.config.url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header(CONTENT_TYPE, "application/json")
            .body(document.to_string())
            .send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(PublishResponse { status, body })
    }
}

/// Logs documents instead of sending them.
#[derive(Debug, Default)]
pub struct DryRunPublisher;

impl Publisher for DryRunPublisher {
    fn publish(&self, document: &str) -> Result<PublishResponse> {
        info!("Dry run, not publishing {} bytes of metadata", document.len());
        Ok(PublishResponse {
            status: 200,
            body: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_always_succeeds() {
        let response = DryRunPublisher.publish("<metadata/>").unwrap();
        assert!(response.is_success());
    }

    #[test]
    fn test_unreachable_catalog_is_an_error() {
        let publisher = HttpPublisher::new(CatalogConfig {
            url: "http://127.0.0.1:9/geoportal/rest/metadata/item".to_string(),
            username: "user".to_string(),
            password: "secret".to_string(),
            timeout: std::time::Duration::from_secs(2),
        })
        .unwrap();
        assert!(publisher.publish("<metadata/>").is_err());
    }
}
