// src/core/assignment.rs — Worker registry and task-to-worker assignment

use std::fmt;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use url::Url;

use super::types::{Assignment, Task};
use crate::infra::errors::FlowingError;

/// A remote worker that accepts `POST {endpoint}/run_task`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Worker {
    pub id: String,
    pub endpoint: String,
}

/// Ordered mapping of worker id to base endpoint URL.
///
/// Registration order is the round-robin order.
#[derive(Debug, Clone, Default)]
pub struct WorkerRegistry {
    workers: Vec<Worker>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a worker. The endpoint must be an absolute http(s) URL.
    pub fn register(&mut self, id: &str, endpoint: &str) -> Result<(), FlowingError> {
        if self.get(id).is_some() {
            return Err(FlowingError::DuplicateWorker { id: id.into() });
        }
        let invalid = || FlowingError::InvalidEndpoint {
            worker: id.into(),
            url: endpoint.into(),
        };
        let parsed = Url::parse(endpoint).map_err(|_| invalid())?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(invalid());
        }

        self.workers.push(Worker {
            id: id.into(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        });
        Ok(())
    }

    /// Parse an `agents.json` object (`{"AgentA": "http://..."}`), keeping key
    /// order. A repeated id is rejected like any other duplicate registration.
    pub fn from_json_str(raw: &str) -> Result<Self, FlowingError> {
        let RegistryEntries(entries) = serde_json::from_str(raw)?;
        let mut registry = Self::new();
        for (id, url) in &entries {
            let url = url.as_str().ok_or_else(|| {
                FlowingError::Config(format!("endpoint for worker '{id}' must be a string"))
            })?;
            registry.register(id, url)?;
        }
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<&Worker> {
        self.workers.iter().find(|w| w.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Worker> {
        self.workers.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.workers.iter().map(|w| w.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Registry as a JSON object in registration order (report format).
    pub fn to_json_map(&self) -> serde_json::Map<String, serde_json::Value> {
        self.workers
            .iter()
            .map(|w| (w.id.clone(), serde_json::Value::String(w.endpoint.clone())))
            .collect()
    }
}

/// Raw `agents.json` entries in file order. Repeated keys are kept so the
/// registry can reject them instead of letting the last one win.
struct RegistryEntries(Vec<(String, serde_json::Value)>);

impl<'de> Deserialize<'de> for RegistryEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = RegistryEntries;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping worker ids to endpoint URLs")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some(entry) = map.next_entry::<String, serde_json::Value>()? {
                    entries.push(entry);
                }
                Ok(RegistryEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Maps a cycle's tasks onto workers.
pub trait AssignmentStrategy: Send + Sync {
    /// One assignment per task, or `NoWorkersAvailable` for an empty registry.
    fn assign(
        &self,
        tasks: &[Task],
        workers: &WorkerRegistry,
    ) -> Result<Vec<Assignment>, FlowingError>;
}

/// Task `i` goes to the worker at position `i mod n`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundRobin;

impl AssignmentStrategy for RoundRobin {
    fn assign(
        &self,
        tasks: &[Task],
        workers: &WorkerRegistry,
    ) -> Result<Vec<Assignment>, FlowingError> {
        if workers.is_empty() {
            return Err(FlowingError::NoWorkersAvailable);
        }

        let n = workers.len();
        Ok(tasks
            .iter()
            .enumerate()
            .map(|(idx, task)| {
                let worker = &workers.workers[idx % n];
                Assignment::new(&worker.id, &worker.endpoint, task.clone())
            })
            .collect())
    }
}
