// src/cli/traces.rs — `flowing traces`: inspect recorded traces

use std::path::Path;

use crate::observability::tracer::{list_traces, load_trace};

/// List traces in `dir`, or print the events of trace `id` in time order.
pub fn run_traces(dir: &Path, id: Option<&str>) -> anyhow::Result<()> {
    match id {
        None => {
            let traces = list_traces(dir)?;
            if traces.is_empty() {
                println!("No traces in {}", dir.display());
            }
            for t in traces {
                println!("{}  {} event(s)", t.trace_id, t.events);
            }
        }
        Some(id) => {
            if !is_valid_trace_id(id) {
                anyhow::bail!("Invalid trace id '{}'", id);
            }
            let path = dir.join(format!("{id}.json"));
            if !path.exists() {
                anyhow::bail!("Trace '{}' not found in {}", id, dir.display());
            }
            for e in load_trace(&path)? {
                let payload = e
                    .payload
                    .map(|p| p.to_string())
                    .unwrap_or_default();
                println!("{:.3}  {:<20} {:<12} {}", e.timestamp, e.event_type, e.agent, payload);
            }
        }
    }
    Ok(())
}

/// Trace ids name a file directly inside the trace directory.
fn is_valid_trace_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(&['/', '\\'][..])
}
