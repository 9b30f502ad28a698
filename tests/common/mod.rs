#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rinha_dispatch::app::Config;
use rinha_dispatch::error::ProcessorCallError;
use rinha_dispatch::models::payment::PaymentRequest;
use rinha_dispatch::models::processor::{ProcessorIdentity, ServiceHealth};
use rinha_dispatch::services::ProcessorTransport;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// Reply a scripted processor gives to one call.
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Ok,
    Status(u16),
    Timeout,
}

/// Processor transport double. Each tier answers from its script, then
/// falls back to `otherwise` once the script runs out.
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<ProcessorIdentity, VecDeque<Reply>>>,
    otherwise: HashMap<ProcessorIdentity, Reply>,
    health: Mutex<HashMap<ProcessorIdentity, Result<ServiceHealth, u16>>>,
    latency: Duration,
    calls: Mutex<Vec<(ProcessorIdentity, String)>>,
    probes: Mutex<Vec<ProcessorIdentity>>,
}

impl ScriptedTransport {
    pub fn new(default: Reply, fallback: Reply) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            otherwise: HashMap::from([
                (ProcessorIdentity::Default, default),
                (ProcessorIdentity::Fallback, fallback),
            ]),
            health: Mutex::new(HashMap::new()),
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            probes: Mutex::new(Vec::new()),
        }
    }

    pub fn healthy() -> Self {
        Self::new(Reply::Ok, Reply::Ok)
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn script(self, processor: ProcessorIdentity, replies: &[Reply]) -> Self {
        self.scripts
            .lock()
            .insert(processor, replies.iter().copied().collect());
        self
    }

    pub fn health_reply(self, processor: ProcessorIdentity, reply: Result<ServiceHealth, u16>) -> Self {
        self.health.lock().insert(processor, reply);
        self
    }

    pub fn calls(&self, processor: ProcessorIdentity) -> usize {
        self.calls.lock().iter().filter(|(p, _)| *p == processor).count()
    }

    pub fn called_ids(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(_, id)| id.clone()).collect()
    }

    pub fn probes(&self, processor: ProcessorIdentity) -> usize {
        self.probes.lock().iter().filter(|p| **p == processor).count()
    }
}

#[async_trait]
impl ProcessorTransport for ScriptedTransport {
    async fn submit(
        &self,
        processor: ProcessorIdentity,
        _base_url: &str,
        request: &PaymentRequest,
    ) -> Result<(), ProcessorCallError> {
        self.calls
            .lock()
            .push((processor, request.correlation_id.clone()));
        let reply = self
            .scripts
            .lock()
            .get_mut(&processor)
            .and_then(|script| script.pop_front())
            .unwrap_or(self.otherwise[&processor]);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match reply {
            Reply::Ok => Ok(()),
            Reply::Status(code) => Err(ProcessorCallError::Status(code)),
            Reply::Timeout => Err(ProcessorCallError::Timeout),
        }
    }

    async fn service_health(
        &self,
        processor: ProcessorIdentity,
        _base_url: &str,
    ) -> Result<ServiceHealth, ProcessorCallError> {
        self.probes.lock().push(processor);
        let reply = self.health.lock().get(&processor).copied();
        match reply {
            Some(Ok(health)) => Ok(health),
            Some(Err(code)) => Err(ProcessorCallError::Status(code)),
            None => Err(ProcessorCallError::Transport("connection refused".to_string())),
        }
    }
}

pub fn request(id: &str, amount: Decimal) -> PaymentRequest {
    PaymentRequest::new(id, amount, Utc::now())
}

/// Small pipeline settings suitable for tests.
pub fn test_config(workers: usize) -> Config {
    Config {
        worker_count: workers,
        queue_capacity: 1024,
        ..Config::default()
    }
}
