// src/cli/run.rs — `flowing run`: drive the controller loop

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::{export, progress, RunArgs};
use crate::core::assignment::WorkerRegistry;
use crate::core::dispatcher::Dispatcher;
use crate::core::generator::RandomTaskGenerator;
use crate::core::orchestrator::{stop_channel, CycleOrchestrator};
use crate::infra::config::{duration_from_secs, Config};
use crate::infra::errors::FlowingError;
use crate::observability::FileTracer;

/// Registry file picked up from the working directory when nothing else is configured.
pub const DEFAULT_AGENTS_FILE: &str = "agents.json";

/// Resolve the worker registry: `--agents` file, then `[[workers]]`, then `./agents.json`.
pub fn load_registry(agents: Option<&str>, config: &Config) -> anyhow::Result<WorkerRegistry> {
    if let Some(path) = agents {
        return registry_from_file(Path::new(path));
    }
    if !config.workers.is_empty() {
        return Ok(config.registry()?);
    }
    let fallback = Path::new(DEFAULT_AGENTS_FILE);
    if fallback.exists() {
        return registry_from_file(fallback);
    }
    Ok(WorkerRegistry::new())
}

fn registry_from_file(path: &Path) -> anyhow::Result<WorkerRegistry> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", path.display(), e))?;
    Ok(WorkerRegistry::from_json_str(&raw)?)
}

/// `--interval` wins over `[controller] interval_seconds`.
pub fn resolve_interval(args: &RunArgs, config: &Config) -> Result<Duration, FlowingError> {
    match args.interval {
        Some(secs) => duration_from_secs("--interval", secs),
        None => duration_from_secs(
            "controller.interval_seconds",
            config.controller.interval_seconds,
        ),
    }
}

/// Run the configured number of cycles, then print statistics and write the report.
pub async fn run_controller(args: &RunArgs, config: &Config) -> anyhow::Result<()> {
    config.validate()?;
    let registry = load_registry(args.agents.as_deref(), config)?;
    if registry.is_empty() {
        tracing::warn!("No workers registered; cycles will dispatch nothing");
    }

    let cycles = args.cycles.unwrap_or(config.controller.cycles);
    let tasks = args.tasks.unwrap_or(config.controller.tasks_per_cycle);
    let interval = resolve_interval(args, config)?;
    let initial_balance = args
        .initial_balance
        .unwrap_or(config.controller.initial_balance);

    let dispatcher = Dispatcher::http(config.dispatch.timeout())
        .with_sender(config.controller.sender.clone())
        .with_concurrency(config.dispatch.concurrency_for(registry.len()));
    let generator = match args.seed {
        Some(seed) => RandomTaskGenerator::seeded(seed),
        None => RandomTaskGenerator::new(),
    };

    tracing::info!(
        workers = registry.len(),
        cycles,
        tasks,
        initial_balance,
        "Controller starting"
    );

    let mut orch =
        CycleOrchestrator::new(registry, dispatcher, initial_balance).with_generator(generator);

    let tracer = if args.trace || config.observability.trace {
        Some(Arc::new(FileTracer::new(config.observability.trace_dir())))
    } else {
        None
    };
    if let Some(ref t) = tracer {
        orch = orch.with_trace(t.clone());
    }
    if !args.quiet {
        orch = orch.with_progress(progress::terminal_progress());
    }

    // Ctrl+C stops the loop between cycles
    let (stop_tx, stop_rx) = stop_channel();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Stop requested, finishing current cycle...");
            let _ = stop_tx.send(true);
        }
    });

    orch.run_cycles_until(cycles, tasks, interval, stop_rx).await;
    signal_task.abort();

    let stats = orch.statistics();
    println!("{}", serde_json::to_string_pretty(&stats)?);

    let report_path = Path::new(&args.report);
    export::write_report(&orch.report(), report_path, &args.format)?;
    if !args.quiet {
        eprintln!("Report written to {}", report_path.display());
    }

    if let Some(t) = tracer {
        let path = t.flush()?;
        if !args.quiet {
            eprintln!("Trace written to {}", path.display());
        }
    }

    Ok(())
}
