use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use crate::errors::{MedAiError, MedAiResult};
use crate::types::*;

/// Anything that can answer a query. The session manager only talks to this.
#[async_trait]
pub trait QueryService: Send + Sync {
    async fn query(&self, request: QueryRequest) -> MedAiResult<QueryResponse>;
}

/// Client for the RAG query service
#[derive(Debug, Clone)]
pub struct RagClient {
    client: Client,
    base_url: String,
}

impl RagClient {
    /// Create a client for the base URL in `config`
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_base_url(config.api_base_url())
    }

    /// Create a client for `base_url`, e.g. `http://localhost:8000`
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send one query. No retry and no timeout beyond the HTTP stack's own.
    #[instrument(skip(self, request), fields(base_url = %self.base_url))]
    pub async fn send_query(&self, request: &QueryRequest) -> MedAiResult<QueryResponse> {
        let url = self.url(QUERY_PATH);
        debug!(top_k = request.top_k, "Sending query");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| MedAiError::RequestError(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(MedAiError::HttpError {
                status_code: status.as_u16(),
                message: format!("Query request failed: {}", error_body),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| MedAiError::ParsingError(format!("Failed to read response: {}", e)))?;

        let parsed = QueryResponse::from_json(&body)?;
        debug!(contexts = parsed.contexts.len(), "Query answered");
        Ok(parsed)
    }

    /// Checks that the service is up. `Ok(false)` means it answered, but not
    /// with a success status and a `live` message; transport failures are errors.
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn health_check(&self) -> MedAiResult<bool> {
        let response = self
            .client
            .get(self.url(HEALTH_CHECK_PATH))
            .send()
            .await
            .map_err(|e| MedAiError::RequestError(format!("Failed to reach service: {}", e)))?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "Health check rejected");
            return Ok(false);
        }

        let status: HealthStatus = match response.json().await {
            Ok(status) => status,
            Err(e) => {
                debug!(error = %e, "Health check body is not a health status");
                return Ok(false);
            }
        };

        let live = status.is_live();
        debug!(message = %status.message, live, "Health check answered");
        Ok(live)
    }
}

#[async_trait]
impl QueryService for RagClient {
    async fn query(&self, request: QueryRequest) -> MedAiResult<QueryResponse> {
        self.send_query(&request).await
    }
}
