//! SimArena REST API client implementation

use std::future::Future;
use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::types::{ApiError, ApiResult, CreateSimulationRequest, ErrorBody, Simulation};

/// Request/response operations against the authoritative simulation store
pub trait SimulationService {
    fn create(
        &self,
        request: &CreateSimulationRequest,
    ) -> impl Future<Output = ApiResult<Simulation>> + Send;

    fn list(&self) -> impl Future<Output = ApiResult<Vec<Simulation>>> + Send;

    fn get(&self, id: &str) -> impl Future<Output = ApiResult<Simulation>> + Send;

    fn delete(&self, id: &str) -> impl Future<Output = ApiResult<()>> + Send;
}

/// SimArena REST API client
#[derive(Debug, Clone)]
pub struct SimulationClient {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl SimulationClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/simulations", self.base_url)
    }

    fn item_url(&self, id: &str) -> String {
        format!("{}/simulations/{}", self.base_url, id)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> ApiResult<Response> {
        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        Self::check_status(response).await
    }

    /// Turn a non-success response into a typed failure, preferring the server's message
    async fn check_status(response: Response) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|body| body.error)
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        debug!("Request failed with {}: {}", status, message);

        if status == StatusCode::NOT_FOUND {
            Err(ApiError::NotFound(message))
        } else {
            Err(ApiError::Status {
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }
}

impl SimulationService for SimulationClient {
    async fn create(&self, request: &CreateSimulationRequest) -> ApiResult<Simulation> {
        let url = self.collection_url();
        debug!("Creating simulation at: {}", url);

        let response = self.send(self.client.post(&url).json(request)).await?;
        let simulation: Simulation = Self::decode(response).await?;

        info!(
            "Created simulation {} with {} rounds and {} agents",
            simulation.id,
            simulation.rounds,
            simulation.agents.len()
        );
        Ok(simulation)
    }

    async fn list(&self) -> ApiResult<Vec<Simulation>> {
        let url = self.collection_url();
        debug!("Listing simulations from: {}", url);

        let response = self.send(self.client.get(&url)).await?;
        let simulations: Vec<Simulation> = Self::decode(response).await?;

        debug!("Fetched {} simulations", simulations.len());
        Ok(simulations)
    }

    async fn get(&self, id: &str) -> ApiResult<Simulation> {
        let url = self.item_url(id);
        debug!("Fetching simulation from: {}", url);

        let response = self.send(self.client.get(&url)).await?;
        let simulation: Simulation = Self::decode(response).await?;

        debug!(
            "Fetched simulation {}: status={}, steps={}",
            simulation.id,
            simulation.status,
            simulation.steps.len()
        );
        Ok(simulation)
    }

    async fn delete(&self, id: &str) -> ApiResult<()> {
        let url = self.item_url(id);
        debug!("Deleting simulation at: {}", url);

        self.send(self.client.delete(&url)).await?;

        info!("Deleted simulation {}", id);
        Ok(())
    }
}
