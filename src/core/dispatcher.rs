// src/core/dispatcher.rs — Worker dispatch and outcome classification
//
// Each assignment gets exactly one attempt. Failures are captured in the
// assignment itself and never abort the rest of the batch.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::types::{Assignment, DEFAULT_SENDER};
use crate::infra::errors::FlowingError;
use crate::observability::{events, TraceSink};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a single dispatch failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("timeout")]
    Timeout,
    #[error("connection_error")]
    ConnectionFailure,
    #[error("{0}")]
    Protocol(String),
    #[error("{0}")]
    Unknown(String),
}

impl DispatchError {
    /// The structured result stored on a failed assignment.
    pub fn result_payload(&self) -> Value {
        serde_json::json!({ "error": self.to_string() })
    }
}

impl From<DispatchError> for FlowingError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::Timeout => FlowingError::DispatchTimeout,
            DispatchError::ConnectionFailure => FlowingError::DispatchConnectionFailure,
            DispatchError::Protocol(message) => FlowingError::DispatchProtocolError { message },
            DispatchError::Unknown(message) => FlowingError::DispatchUnknownFailure { message },
        }
    }
}

/// Body of `POST {endpoint}/run_task`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunTaskRequest {
    pub description: String,
    pub price: f64,
    pub sender: String,
}

/// Transport used to reach a worker endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkerClient: Send + Sync {
    async fn run_task(&self, endpoint: &str, request: &RunTaskRequest)
        -> Result<Value, DispatchError>;
}

/// reqwest-backed client for the `/run_task` contract.
pub struct HttpWorkerClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpWorkerClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

impl Default for HttpWorkerClient {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

fn classify_transport_error(e: reqwest::Error) -> DispatchError {
    if e.is_timeout() {
        DispatchError::Timeout
    } else if e.is_connect() {
        DispatchError::ConnectionFailure
    } else {
        DispatchError::Unknown(e.to_string())
    }
}

#[async_trait]
impl WorkerClient for HttpWorkerClient {
    async fn run_task(
        &self,
        endpoint: &str,
        request: &RunTaskRequest,
    ) -> Result<Value, DispatchError> {
        let response = self
            .client
            .post(format!("{endpoint}/run_task"))
            .json(request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Protocol(format!("HTTP {status}")));
        }

        let body = response.bytes().await.map_err(classify_transport_error)?;
        serde_json::from_slice(&body)
            .map_err(|e| DispatchError::Protocol(format!("invalid JSON body: {e}")))
    }
}

/// Sends assignments to their workers and records each outcome.
pub struct Dispatcher {
    client: Arc<dyn WorkerClient>,
    sender: String,
    timeout: Duration,
    max_concurrency: usize,
    trace: Option<Arc<dyn TraceSink>>,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn WorkerClient>) -> Self {
        Self {
            client,
            sender: DEFAULT_SENDER.into(),
            timeout: DEFAULT_TIMEOUT,
            max_concurrency: 1,
            trace: None,
        }
    }

    /// HTTP dispatcher with the given per-call timeout.
    pub fn http(timeout: Duration) -> Self {
        Self::new(Arc::new(HttpWorkerClient::new(timeout))).with_timeout(timeout)
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    /// Upper bound on a single call, enforced regardless of the client.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// In-flight calls per batch. 1 dispatches sequentially.
    pub fn with_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_trace(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace = Some(sink);
        self
    }

    pub fn set_trace(&mut self, sink: Option<Arc<dyn TraceSink>>) {
        self.trace = sink;
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Attempt one assignment exactly once.
    pub async fn dispatch(&self, mut assignment: Assignment) -> Assignment {
        let request = RunTaskRequest {
            description: assignment.task.description.clone(),
            price: assignment.task.reward,
            sender: self.sender.clone(),
        };

        let call = self.client.run_task(&assignment.endpoint, &request);
        let outcome = match tokio::time::timeout(self.timeout, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(DispatchError::Timeout),
        };

        match &outcome {
            Ok(_) => tracing::debug!(
                task = %assignment.task.task_id,
                worker = %assignment.worker_id,
                "Task executed successfully"
            ),
            Err(e) => tracing::warn!(
                task = %assignment.task.task_id,
                worker = %assignment.worker_id,
                endpoint = %assignment.endpoint,
                "Dispatch failed: {}",
                e
            ),
        }

        resolve(&mut assignment, outcome);

        if let Some(ref sink) = self.trace {
            sink.log(
                &assignment.worker_id,
                events::DISPATCH_RESOLVED,
                Some(serde_json::json!({
                    "task_id": assignment.task.task_id,
                    "success": assignment.success,
                    "result": assignment.result,
                })),
                None,
            );
        }

        assignment
    }

    /// Dispatch a whole batch. The output keeps the input order and always
    /// has one resolved assignment per input.
    pub async fn dispatch_all(&self, assignments: Vec<Assignment>) -> Vec<Assignment> {
        stream::iter(assignments)
            .map(|a| self.dispatch(a))
            .buffered(self.max_concurrency)
            .collect()
            .await
    }
}

fn resolve(assignment: &mut Assignment, outcome: Result<Value, DispatchError>) {
    match outcome {
        Ok(body) => {
            assignment.result = Some(body);
            assignment.success = true;
        }
        Err(e) => {
            assignment.result = Some(e.result_payload());
            assignment.success = false;
        }
    }
    assignment.completed_at = Some(Utc::now());
}
