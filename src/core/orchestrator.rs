// src/core/orchestrator.rs — Cycle controller

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use super::assignment::{AssignmentStrategy, RoundRobin, WorkerRegistry};
use super::dispatcher::Dispatcher;
use super::evaluator;
use super::generator::{RandomTaskGenerator, TaskGenerator};
use super::ledger::EconomyLedger;
use super::types::*;
use crate::infra::errors::FlowingError;
use crate::observability::{events, TraceSink};

/// Receiving end of a stop request. `true` means stop after the current cycle.
pub type StopSignal = watch::Receiver<bool>;

/// Create a stop channel for `run_cycles_until`.
pub fn stop_channel() -> (watch::Sender<bool>, StopSignal) {
    watch::channel(false)
}

/// Drives generate → assign → dispatch → evaluate → settle, one cycle at a time.
///
/// Owns the ledger and the cumulative task/assignment histories. Ledger
/// updates happen only after every dispatch of a cycle has resolved.
pub struct CycleOrchestrator {
    registry: WorkerRegistry,
    generator: Box<dyn TaskGenerator>,
    strategy: Box<dyn AssignmentStrategy>,
    dispatcher: Dispatcher,
    ledger: EconomyLedger,
    cycle_count: u32,
    task_history: Vec<Task>,
    assignment_history: Vec<Assignment>,
    trace: Option<Arc<dyn TraceSink>>,
    on_progress: Option<Box<dyn Fn(ProgressEvent) + Send>>,
}

impl CycleOrchestrator {
    /// Every registered worker starts with `initial_balance`.
    pub fn new(registry: WorkerRegistry, dispatcher: Dispatcher, initial_balance: f64) -> Self {
        let mut ledger = EconomyLedger::new();
        for id in registry.ids() {
            ledger.initialize(id, initial_balance);
        }

        Self {
            registry,
            generator: Box::new(RandomTaskGenerator::new()),
            strategy: Box::new(RoundRobin),
            dispatcher,
            ledger,
            cycle_count: 0,
            task_history: Vec::new(),
            assignment_history: Vec::new(),
            trace: None,
            on_progress: None,
        }
    }

    pub fn with_generator(mut self, generator: impl TaskGenerator + 'static) -> Self {
        self.generator = Box::new(generator);
        self
    }

    pub fn with_strategy(mut self, strategy: impl AssignmentStrategy + 'static) -> Self {
        self.strategy = Box::new(strategy);
        self
    }

    /// Attach a trace sink to the orchestrator, dispatcher and ledger.
    pub fn with_trace(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.dispatcher.set_trace(Some(sink.clone()));
        self.ledger.set_trace(Some(sink.clone()));
        self.trace = Some(sink);
        self
    }

    /// Set a callback for real-time progress events.
    pub fn with_progress(mut self, cb: impl Fn(ProgressEvent) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(cb));
        self
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(ref cb) = self.on_progress {
            cb(event);
        }
    }

    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &EconomyLedger {
        &self.ledger
    }

    pub fn cycles_completed(&self) -> u32 {
        self.cycle_count
    }

    pub fn task_history(&self) -> &[Task] {
        &self.task_history
    }

    pub fn assignment_history(&self) -> &[Assignment] {
        &self.assignment_history
    }

    /// Run one full cycle. Degenerate cycles (no tasks, no workers) still
    /// produce an evaluation and leave the ledger consistent.
    pub async fn run_cycle(&mut self, num_tasks: usize) -> CycleSummary {
        self.cycle_count += 1;
        let cycle = self.cycle_count;
        tracing::info!(cycle, "Cycle started");
        self.emit(ProgressEvent::CycleStart { cycle });

        // 1. Generate
        let tasks = self.generator.generate(num_tasks, cycle);
        self.task_history.extend(tasks.iter().cloned());
        self.emit(ProgressEvent::TasksGenerated {
            cycle,
            count: tasks.len(),
        });

        // 2. Assign
        let assignments = match self.strategy.assign(&tasks, &self.registry) {
            Ok(assignments) => assignments,
            Err(FlowingError::NoWorkersAvailable) => {
                tracing::warn!(cycle, tasks = tasks.len(), "No workers available for assignment");
                self.emit(ProgressEvent::NoWorkers);
                Vec::new()
            }
            Err(e) => {
                tracing::error!(cycle, "Assignment failed: {}", e);
                Vec::new()
            }
        };
        for a in &assignments {
            if let Some(ref sink) = self.trace {
                sink.log(
                    &a.worker_id,
                    events::ASSIGNMENT_CREATED,
                    Some(serde_json::json!({
                        "task_id": a.task.task_id,
                        "description": a.task.description,
                        "reward": a.task.reward,
                        "cycle": cycle,
                    })),
                    None,
                );
            }
            self.emit(ProgressEvent::TaskAssigned {
                task_id: a.task.task_id.clone(),
                worker_id: a.worker_id.clone(),
            });
        }

        // 3. Dispatch
        let results = self.dispatcher.dispatch_all(assignments).await;
        for a in &results {
            let detail = if a.success {
                "ok".to_string()
            } else {
                a.result
                    .as_ref()
                    .and_then(|r| r["error"].as_str())
                    .unwrap_or("failed")
                    .to_string()
            };
            self.emit(ProgressEvent::DispatchResolved {
                task_id: a.task.task_id.clone(),
                worker_id: a.worker_id.clone(),
                success: a.success,
                detail,
            });
        }

        // 4. Evaluate
        let evaluation = evaluator::evaluate(&results);
        tracing::info!(
            cycle,
            total = evaluation.total,
            successful = evaluation.successful,
            success_rate = evaluation.success_rate,
            "Cycle evaluated"
        );
        self.emit(ProgressEvent::Evaluated(evaluation.clone()));

        // 5. Settle
        self.update_economy(&results);
        self.assignment_history.extend(results);

        let balances = self.ledger.snapshot();
        self.emit(ProgressEvent::CycleEnd {
            cycle,
            balances: balances.clone(),
        });

        CycleSummary {
            cycle,
            evaluation,
            balances,
            timestamp: Utc::now(),
        }
    }

    /// Full reward on success, a fixed 10% penalty on any failure.
    fn update_economy(&mut self, assignments: &[Assignment]) {
        for a in assignments {
            let (kind, amount) = if a.success {
                let reason = format!("completed_task_{}", a.task.task_id);
                self.ledger.credit(&a.worker_id, a.task.reward, &reason);
                (TransactionKind::Reward, a.task.reward)
            } else {
                let penalty = penalty_for(a.task.reward);
                let reason = format!("failed_task_{}", a.task.task_id);
                self.ledger.debit(&a.worker_id, penalty, &reason);
                (TransactionKind::Penalty, penalty)
            };
            self.emit(ProgressEvent::LedgerUpdated {
                worker_id: a.worker_id.clone(),
                kind,
                amount,
            });
        }
    }

    /// Run `cycles` cycles back to back with `interval` between them.
    pub async fn run_cycles(
        &mut self,
        cycles: u32,
        num_tasks: usize,
        interval: Duration,
    ) -> Vec<CycleSummary> {
        self.run_loop(cycles, num_tasks, interval, None).await
    }

    /// Like `run_cycles`, but checks `stop` between cycles. A cycle that has
    /// started always finishes, including its ledger update.
    pub async fn run_cycles_until(
        &mut self,
        cycles: u32,
        num_tasks: usize,
        interval: Duration,
        stop: StopSignal,
    ) -> Vec<CycleSummary> {
        self.run_loop(cycles, num_tasks, interval, Some(stop)).await
    }

    async fn run_loop(
        &mut self,
        cycles: u32,
        num_tasks: usize,
        interval: Duration,
        mut stop: Option<StopSignal>,
    ) -> Vec<CycleSummary> {
        let mut summaries = Vec::new();

        for i in 0..cycles {
            if stop_requested(&stop) {
                break;
            }

            summaries.push(self.run_cycle(num_tasks).await);

            if i + 1 >= cycles || stop_requested(&stop) {
                continue;
            }

            self.emit(ProgressEvent::Waiting {
                seconds: interval.as_secs_f64(),
            });
            match stop.as_mut() {
                Some(rx) => {
                    tokio::select! {
                        _ = tokio::time::sleep(interval) => {}
                        _ = wait_for_stop(rx) => {}
                    }
                }
                None => tokio::time::sleep(interval).await,
            }
        }

        if stop_requested(&stop) {
            tracing::info!(cycles_completed = self.cycle_count, "Controller stopped");
            self.emit(ProgressEvent::Stopped {
                cycles_completed: self.cycle_count,
            });
        }

        summaries
    }

    /// Aggregate statistics over everything run so far.
    pub fn statistics(&self) -> ControllerStatistics {
        let total_assignments = self.assignment_history.len();
        let successful_assignments = self
            .assignment_history
            .iter()
            .filter(|a| a.success)
            .count();

        ControllerStatistics {
            cycles_completed: self.cycle_count,
            total_tasks_generated: self.task_history.len(),
            total_assignments,
            successful_assignments,
            success_rate: evaluator::success_rate(successful_assignments, total_assignments),
            agent_balances: self.ledger.snapshot(),
            timestamp: Utc::now(),
        }
    }

    /// Statistics plus the worker registry and the full transaction log.
    pub fn report(&self) -> ControllerReport {
        ControllerReport {
            controller_statistics: self.statistics(),
            agents: self.registry.to_json_map(),
            transaction_history: self.ledger.transactions().to_vec(),
        }
    }
}

fn stop_requested(stop: &Option<StopSignal>) -> bool {
    stop.as_ref().is_some_and(|rx| *rx.borrow())
}

/// Resolves once a stop is requested; never resolves if the sender is gone.
async fn wait_for_stop(rx: &mut StopSignal) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
