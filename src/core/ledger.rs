// src/core/ledger.rs — Per-worker balances and the append-only transaction log

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use super::types::{Transaction, TransactionKind};
use crate::observability::{events, TraceSink};

/// Worker balances plus the log of every change that produced them.
///
/// All mutation goes through `initialize`, `credit` and `debit`, so for every
/// worker the balance equals the sum of its logged signed amounts. Balances
/// may go negative.
#[derive(Default)]
pub struct EconomyLedger {
    balances: BTreeMap<String, f64>,
    transactions: Vec<Transaction>,
    trace: Option<Arc<dyn TraceSink>>,
}

impl EconomyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trace(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.set_trace(Some(sink));
        self
    }

    /// Attach (or detach) a sink. Entries already in the log are replayed
    /// into a newly attached sink so the trace covers the whole history.
    pub fn set_trace(&mut self, sink: Option<Arc<dyn TraceSink>>) {
        if let Some(ref sink) = sink {
            for tx in &self.transactions {
                trace_transaction(sink.as_ref(), tx);
            }
        }
        self.trace = sink;
    }

    /// Create (or reset) a worker's balance and log the initialization.
    pub fn initialize(&mut self, worker_id: &str, balance: f64) {
        self.balances.insert(worker_id.to_string(), balance);
        self.append(TransactionKind::Initialization, worker_id, balance, None);
    }

    /// Add `amount` to the worker's balance. Unknown workers start at 0.
    pub fn credit(&mut self, worker_id: &str, amount: f64, reason: &str) {
        self.ensure_known(worker_id);
        if let Some(balance) = self.balances.get_mut(worker_id) {
            *balance += amount;
        }
        self.append(TransactionKind::Reward, worker_id, amount, Some(reason));
    }

    /// Subtract `amount` from the worker's balance. Unknown workers start at 0.
    pub fn debit(&mut self, worker_id: &str, amount: f64, reason: &str) {
        self.ensure_known(worker_id);
        if let Some(balance) = self.balances.get_mut(worker_id) {
            *balance -= amount;
        }
        self.append(TransactionKind::Penalty, worker_id, amount, Some(reason));
    }

    /// Current balance, 0 for an unknown worker.
    pub fn balance(&self, worker_id: &str) -> f64 {
        self.balances.get(worker_id).copied().unwrap_or(0.0)
    }

    /// Copy of all current balances.
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        self.balances.clone()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn transactions_for<'a>(
        &'a self,
        worker_id: &'a str,
    ) -> impl Iterator<Item = &'a Transaction> + 'a {
        self.transactions
            .iter()
            .filter(move |t| t.worker_id == worker_id)
    }

    /// Balance recomputed from the log, starting at the latest initialization.
    pub fn replayed_balance(&self, worker_id: &str) -> f64 {
        self.transactions_for(worker_id)
            .fold(0.0, |acc, t| match t.kind {
                TransactionKind::Initialization => t.amount,
                _ => acc + t.signed_amount(),
            })
    }

    fn ensure_known(&mut self, worker_id: &str) {
        if !self.balances.contains_key(worker_id) {
            self.initialize(worker_id, 0.0);
        }
    }

    fn append(&mut self, kind: TransactionKind, worker_id: &str, amount: f64, reason: Option<&str>) {
        let tx = Transaction {
            timestamp: Utc::now(),
            kind,
            worker_id: worker_id.to_string(),
            amount,
            reason: reason.map(str::to_string),
        };

        if let Some(ref sink) = self.trace {
            trace_transaction(sink.as_ref(), &tx);
        }

        self.transactions.push(tx);
    }
}

fn trace_transaction(sink: &dyn TraceSink, tx: &Transaction) {
    sink.log(
        &tx.worker_id,
        events::LEDGER_TRANSACTION,
        serde_json::to_value(tx).ok(),
        None,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_logs_transaction() {
        let mut l = EconomyLedger::new();
        l.initialize("AgentA", 100.0);
        assert_eq!(l.balance("AgentA"), 100.0);
        assert_eq!(l.transactions().len(), 1);
        assert_eq!(l.transactions()[0].kind, TransactionKind::Initialization);
        assert_eq!(l.transactions()[0].amount, 100.0);
    }

    #[test]
    fn test_credit_and_debit() {
        let mut l = EconomyLedger::new();
        l.initialize("AgentA", 100.0);
        l.credit("AgentA", 25.0, "completed_task_task_1_0");
        assert_eq!(l.balance("AgentA"), 125.0);
        l.debit("AgentA", 1.0, "failed_task_task_1_1");
        assert_eq!(l.balance("AgentA"), 124.0);

        let kinds: Vec<TransactionKind> = l.transactions().iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TransactionKind::Initialization,
                TransactionKind::Reward,
                TransactionKind::Penalty
            ]
        );
        assert_eq!(
            l.transactions()[2].reason.as_deref(),
            Some("failed_task_task_1_1")
        );
    }

    #[test]
    fn test_unknown_worker_is_implicitly_initialized() {
        let mut l = EconomyLedger::new();
        assert_eq!(l.balance("ghost"), 0.0);
        l.debit("ghost", 2.5, "failed_task_x");
        assert_eq!(l.balance("ghost"), -2.5);

        let txs: Vec<&Transaction> = l.transactions_for("ghost").collect();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].kind, TransactionKind::Initialization);
        assert_eq!(txs[0].amount, 0.0);
        assert_eq!(txs[1].kind, TransactionKind::Penalty);
    }

    #[test]
    fn test_balance_may_go_negative() {
        let mut l = EconomyLedger::new();
        l.initialize("AgentB", 0.5);
        l.debit("AgentB", 1.0, "failed");
        assert!(l.balance("AgentB") < 0.0);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut l = EconomyLedger::new();
        l.initialize("AgentA", 10.0);
        let snap = l.snapshot();
        l.credit("AgentA", 5.0, "r");
        assert_eq!(snap["AgentA"], 10.0);
        assert_eq!(l.balance("AgentA"), 15.0);
    }

    #[test]
    fn test_balance_matches_replayed_log() {
        let mut l = EconomyLedger::new();
        l.initialize("AgentA", 100.0);
        l.initialize("AgentB", 100.0);
        for i in 0..50 {
            let amount = (i as f64) * 0.37;
            if i % 3 == 0 {
                l.debit("AgentA", amount, "p");
            } else {
                l.credit("AgentB", amount, "r");
            }
        }
        for id in ["AgentA", "AgentB"] {
            assert!((l.balance(id) - l.replayed_balance(id)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_trace_receives_every_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let tracer = Arc::new(crate::observability::FileTracer::with_id(dir.path(), "l"));
        let mut l = EconomyLedger::new().with_trace(tracer.clone());
        l.initialize("AgentA", 1.0);
        l.credit("AgentA", 2.0, "r");

        let events = tracer.events();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.event_type == "ledger_transaction"));
        assert_eq!(events[1].payload.as_ref().unwrap()["type"], "reward");
    }

    #[test]
    fn test_attaching_trace_replays_existing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let tracer = Arc::new(crate::observability::FileTracer::with_id(dir.path(), "late"));
        let mut l = EconomyLedger::new();
        l.initialize("AgentA", 100.0);
        l.initialize("AgentB", 100.0);

        l.set_trace(Some(tracer.clone()));
        l.debit("AgentB", 1.0, "failed_task_task_1_1");

        let events = tracer.events();
        let kinds: Vec<&str> = events
            .iter()
            .map(|e| e.payload.as_ref().unwrap()["type"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, vec!["initialization", "initialization", "penalty"]);
        assert_eq!(events[1].agent, "AgentB");
    }
}
