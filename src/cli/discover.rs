// src/cli/discover.rs — `flowing discover`: probe each worker's identity

use std::time::Duration;

use crate::core::assignment::WorkerRegistry;

pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(2);

/// GET `{endpoint}/identity` and return the JSON body.
pub async fn fetch_identity(
    client: &reqwest::Client,
    endpoint: &str,
) -> anyhow::Result<serde_json::Value> {
    let resp = client
        .get(format!("{endpoint}/identity"))
        .timeout(DISCOVERY_TIMEOUT)
        .send()
        .await?
        .error_for_status()?;
    Ok(resp.json().await?)
}

/// Print one line per worker: its identity JSON, or `unreachable`.
pub async fn run_discover(registry: &WorkerRegistry) -> anyhow::Result<()> {
    if registry.is_empty() {
        println!("No workers registered.");
        return Ok(());
    }

    let client = reqwest::Client::builder()
        .timeout(DISCOVERY_TIMEOUT)
        .build()?;

    for worker in registry.iter() {
        match fetch_identity(&client, &worker.endpoint).await {
            Ok(identity) => println!("{}: {}", worker.id, identity),
            Err(e) => {
                tracing::debug!("Identity probe for {} failed: {}", worker.id, e);
                println!("{}: unreachable", worker.id);
            }
        }
    }
    Ok(())
}
