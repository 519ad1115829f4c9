// src/core/types.rs — Core domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reward paid per unit of task complexity.
pub const REWARD_SCALE: f64 = 50.0;

/// Fraction of a task's reward deducted when its dispatch fails.
pub const PENALTY_RATE: f64 = 0.1;

/// Sender identifier attached to every dispatch request.
pub const DEFAULT_SENDER: &str = "AutonomousController";

/// Round to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Penalty for a failed task of the given reward.
pub fn penalty_for(reward: f64) -> f64 {
    round2(reward * PENALTY_RATE)
}

/// A unit of synthetic work. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub description: String,
    pub complexity: f64,
    pub reward: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Build the task at `index` within `cycle`; the reward follows from the complexity.
    pub fn new(cycle: u32, index: usize, description: impl Into<String>, complexity: f64) -> Self {
        let complexity = round2(complexity);
        Self {
            task_id: format!("task_{cycle}_{index}"),
            description: description.into(),
            complexity,
            reward: round2(complexity * REWARD_SCALE),
            status: "pending".into(),
            created_at: Utc::now(),
        }
    }
}

/// Binding of one task to one worker for a single dispatch attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub worker_id: String,
    pub endpoint: String,
    pub task: Task,
    pub assigned_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Worker response body on success, `{"error": ...}` on failure.
    pub result: Option<serde_json::Value>,
    pub success: bool,
}

impl Assignment {
    pub fn new(worker_id: impl Into<String>, endpoint: impl Into<String>, task: Task) -> Self {
        Self {
            worker_id: worker_id.into(),
            endpoint: endpoint.into(),
            task,
            assigned_at: Utc::now(),
            completed_at: None,
            result: None,
            success: false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.completed_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Initialization,
    Reward,
    Penalty,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Initialization => write!(f, "initialization"),
            TransactionKind::Reward => write!(f, "reward"),
            TransactionKind::Penalty => write!(f, "penalty"),
        }
    }
}

/// One append-only ledger entry. `amount` is the magnitude; `kind` gives the sign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(rename = "agent_id")]
    pub worker_id: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Transaction {
    /// Effect of this entry on the worker's balance.
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionKind::Penalty => -self.amount,
            TransactionKind::Initialization | TransactionKind::Reward => self.amount,
        }
    }
}

/// Per-cycle success/failure summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    #[serde(rename = "total_tasks")]
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub success_rate: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleSummary {
    pub cycle: u32,
    pub evaluation: Evaluation,
    pub balances: BTreeMap<String, f64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerStatistics {
    pub cycles_completed: u32,
    pub total_tasks_generated: usize,
    pub total_assignments: usize,
    pub successful_assignments: usize,
    pub success_rate: f64,
    pub agent_balances: BTreeMap<String, f64>,
    pub timestamp: DateTime<Utc>,
}

/// Everything a surrounding component needs to persist a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerReport {
    pub controller_statistics: ControllerStatistics,
    /// Worker registry in registration order.
    pub agents: serde_json::Map<String, serde_json::Value>,
    pub transaction_history: Vec<Transaction>,
}

/// Lifecycle notifications for progress rendering.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    CycleStart {
        cycle: u32,
    },
    TasksGenerated {
        cycle: u32,
        count: usize,
    },
    TaskAssigned {
        task_id: String,
        worker_id: String,
    },
    NoWorkers,
    DispatchResolved {
        task_id: String,
        worker_id: String,
        success: bool,
        detail: String,
    },
    Evaluated(Evaluation),
    LedgerUpdated {
        worker_id: String,
        kind: TransactionKind,
        amount: f64,
    },
    CycleEnd {
        cycle: u32,
        balances: BTreeMap<String, f64>,
    },
    Waiting {
        seconds: f64,
    },
    Stopped {
        cycles_completed: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(1.235_1), 1.24);
        assert_eq!(round2(10.000000000000002), 10.0);
        assert_eq!(round2(-2.5), -2.5);
    }

    #[test]
    fn test_penalty_is_ten_percent() {
        assert_eq!(penalty_for(10.0), 1.0);
        assert_eq!(penalty_for(25.0), 2.5);
        assert_eq!(penalty_for(33.5), 3.35);
        assert_eq!(penalty_for(0.0), 0.0);
    }

    #[test]
    fn test_task_new_derives_reward() {
        let t = Task::new(2, 4, "Analyze data patterns", 0.5);
        assert_eq!(t.task_id, "task_2_4");
        assert_eq!(t.reward, 25.0);
        assert_eq!(t.status, "pending");

        let t = Task::new(1, 0, "x", 0.2);
        assert_eq!(t.reward, 10.0);
    }

    #[test]
    fn test_assignment_starts_unresolved() {
        let a = Assignment::new("AgentA", "http://a", Task::new(1, 0, "x", 0.3));
        assert!(!a.is_resolved());
        assert!(!a.success);
        assert!(a.result.is_none());
    }

    #[test]
    fn test_signed_amount() {
        let mut tx = Transaction {
            timestamp: Utc::now(),
            kind: TransactionKind::Penalty,
            worker_id: "AgentA".into(),
            amount: 1.5,
            reason: None,
        };
        assert_eq!(tx.signed_amount(), -1.5);
        tx.kind = TransactionKind::Reward;
        assert_eq!(tx.signed_amount(), 1.5);
    }

    #[test]
    fn test_transaction_serializes_like_report_schema() {
        let tx = Transaction {
            timestamp: Utc::now(),
            kind: TransactionKind::Reward,
            worker_id: "AgentA".into(),
            amount: 12.5,
            reason: Some("completed_task_task_1_0".into()),
        };
        let v = serde_json::to_value(&tx).unwrap();
        assert_eq!(v["type"], "reward");
        assert_eq!(v["agent_id"], "AgentA");
        assert_eq!(v["amount"], 12.5);
        assert_eq!(v["reason"], "completed_task_task_1_0");
    }
}
