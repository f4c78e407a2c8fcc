//! HTTP client with built-in retry logic and error handling.

use anyhow::{Context, Result};
use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::retry::{check_retryable, with_retry};

/// HTTP client with built-in retry logic for network operations.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Returns a reference to the underlying reqwest Client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Performs a GET request with query parameters and deserializes the JSON response.
    /// Automatically retries on transient errors.
    #[tracing::instrument(skip(self, query))]
    pub async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        debug!("GET JSON from {} with query {:?}...", url, query);

        with_retry("GET JSON with query", || async {
            let response = self
                .client
                .get(url)
                .query(query)
                .send()
                .await
                .context("Failed to send request")?;

            let response = response.error_for_status().map_err(check_retryable)?;

            let result = response
                .json::<T>()
                .await
                .context("Failed to parse JSON response")?;

            Ok(result)
        })
        .await
    }

    /// Performs a DELETE request, succeeding on any 2xx status.
    /// Automatically retries on transient errors.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, url: &str) -> Result<()> {
        debug!("DELETE {}...", url);

        with_retry("DELETE", || async {
            let response = self
                .client
                .delete(url)
                .send()
                .await
                .context("Failed to send request")?;

            response.error_for_status().map_err(check_retryable)?;

            Ok(())
        })
        .await
    }
}
