use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

use crate::app::config::Config;
use crate::error::ProcessorCallError;
use crate::models::payment::PaymentRequest;
use crate::models::processor::{ProcessorIdentity, ServiceHealth};

/// Outbound calls to a payment processor.
#[async_trait]
pub trait ProcessorTransport: Send + Sync {
    /// `POST {base_url}/payments`; only HTTP 200 counts as success.
    async fn submit(
        &self,
        processor: ProcessorIdentity,
        base_url: &str,
        request: &PaymentRequest,
    ) -> Result<(), ProcessorCallError>;

    /// `GET {base_url}/payments/service-health`.
    async fn service_health(
        &self,
        processor: ProcessorIdentity,
        base_url: &str,
    ) -> Result<ServiceHealth, ProcessorCallError>;
}

/// reqwest transport with one client per tier. The default tier gets a
/// short timeout and a large idle pool, the fallback a lenient timeout.
pub struct PaymentProcessorClient {
    default_client: Client,
    fallback_client: Client,
    token: String,
}

fn tier_client(timeout: Duration, max_idle_per_host: usize) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(max_idle_per_host)
        .pool_idle_timeout(Duration::from_secs(10))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
}

impl PaymentProcessorClient {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self {
            default_client: tier_client(config.default_timeout(), 1000)?,
            fallback_client: tier_client(config.fallback_timeout(), 100)?,
            token: config.token.clone(),
        })
    }

    fn client(&self, processor: ProcessorIdentity) -> &Client {
        match processor {
            ProcessorIdentity::Default => &self.default_client,
            ProcessorIdentity::Fallback => &self.fallback_client,
        }
    }
}

#[async_trait]
impl ProcessorTransport for PaymentProcessorClient {
    async fn submit(
        &self,
        processor: ProcessorIdentity,
        base_url: &str,
        request: &PaymentRequest,
    ) -> Result<(), ProcessorCallError> {
        let response = self
            .client(processor)
            .post(format!("{}/payments", base_url))
            .header("X-Rinha-Token", &self.token)
            .json(request)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(()),
            status => {
                debug!("{} processor answered {} for {}", processor, status, request.correlation_id);
                Err(ProcessorCallError::Status(status.as_u16()))
            }
        }
    }

    async fn service_health(
        &self,
        processor: ProcessorIdentity,
        base_url: &str,
    ) -> Result<ServiceHealth, ProcessorCallError> {
        let response = self
            .client(processor)
            .get(format!("{}/payments/service-health", base_url))
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(ProcessorCallError::Status(response.status().as_u16()));
        }

        Ok(response.json::<ServiceHealth>().await?)
    }
}
