// src/core/evaluator.rs — Per-cycle outcome statistics

use chrono::Utc;

use super::types::{round2, Assignment, Evaluation};

/// Success rate in percent, rounded to 2 decimals. 0 for an empty set.
pub fn success_rate(successful: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(successful as f64 / total as f64 * 100.0)
}

/// Summarize a batch of resolved assignments.
pub fn evaluate(assignments: &[Assignment]) -> Evaluation {
    let total = assignments.len();
    let successful = assignments.iter().filter(|a| a.success).count();

    Evaluation {
        total,
        successful,
        failed: total - successful,
        success_rate: success_rate(successful, total),
        timestamp: Utc::now(),
    }
}
