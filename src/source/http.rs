use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;
use std::time::Duration;

use super::DefinitionSource;
use crate::error::{Result, ValidatorError};

const FHIR_JSON: &str = "application/fhir+json, application/json;q=0.9";

/// Fetches definitions published under implementation guide URLs.
#[derive(Debug, Clone)]
pub struct HttpDefinitionSource {
    client: Client,
    timeout: Duration,
}

impl HttpDefinitionSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ValidatorError::configuration(format!("HTTP client: {e}")))?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn get(&self, location: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(location)
            .header(ACCEPT, FHIR_JSON)
            .send()
            .await
            .map_err(|e| ValidatorError::fetch(location, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ValidatorError::fetch(
                location,
                format!("server responded with HTTP {status}"),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ValidatorError::fetch(location, format!("reading body: {e}")))?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl DefinitionSource for HttpDefinitionSource {
    async fn load_raw(&self, location: &str) -> Result<Vec<u8>> {
        tracing::debug!("GET {}", location);
        tokio::time::timeout(self.timeout, self.get(location))
            .await
            .map_err(|_| {
                ValidatorError::fetch(
                    location,
                    format!("timed out after {} ms", self.timeout.as_millis()),
                )
            })?
    }
}
