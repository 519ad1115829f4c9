// src/cli/progress.rs — Terminal progress renderer for controller cycles

use crate::core::types::ProgressEvent;

/// One line of terminal output for an event.
pub fn format_event(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::CycleStart { cycle } => format!("[cycle {}] started", cycle),
        ProgressEvent::TasksGenerated { cycle, count } => {
            format!("[cycle {}] generated {} task(s)", cycle, count)
        }
        ProgressEvent::TaskAssigned { task_id, worker_id } => {
            format!("  assign {} -> {}", task_id, worker_id)
        }
        ProgressEvent::NoWorkers => "[warn] no workers registered, nothing dispatched".into(),
        ProgressEvent::DispatchResolved {
            task_id,
            worker_id,
            success,
            detail,
        } => {
            let mark = if *success { "ok" } else { "FAILED" };
            format!("  {} @ {}: {} ({})", task_id, worker_id, mark, detail)
        }
        ProgressEvent::Evaluated(e) => format!(
            "  evaluation: {}/{} succeeded ({:.2}%)",
            e.successful, e.total, e.success_rate
        ),
        ProgressEvent::LedgerUpdated {
            worker_id,
            kind,
            amount,
        } => format!("  ledger {} {} {:.2}", worker_id, kind, amount),
        ProgressEvent::CycleEnd { cycle, balances } => {
            let parts: Vec<String> = balances
                .iter()
                .map(|(id, b)| format!("{}={:.2}", id, b))
                .collect();
            format!("[cycle {}] balances: {}", cycle, parts.join(" "))
        }
        ProgressEvent::Waiting { seconds } => format!("  waiting {:.1}s...", seconds),
        ProgressEvent::Stopped { cycles_completed } => {
            format!("[stop] stopped after {} cycle(s)", cycles_completed)
        }
    }
}

/// Build a progress callback that writes formatted output to stderr.
///
/// stdout stays clean for the final statistics.
pub fn terminal_progress() -> impl Fn(ProgressEvent) + Send + 'static {
    move |event| eprintln!("{}", format_event(&event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Evaluation, TransactionKind};
    use std::collections::BTreeMap;

    #[test]
    fn test_cycle_lines() {
        assert_eq!(
            format_event(&ProgressEvent::CycleStart { cycle: 2 }),
            "[cycle 2] started"
        );
        let balances = BTreeMap::from([("A".to_string(), 125.0), ("B".to_string(), 99.0)]);
        assert_eq!(
            format_event(&ProgressEvent::CycleEnd { cycle: 1, balances }),
            "[cycle 1] balances: A=125.00 B=99.00"
        );
    }

    #[test]
    fn test_dispatch_failure_line() {
        let line = format_event(&ProgressEvent::DispatchResolved {
            task_id: "task_1_1".into(),
            worker_id: "B".into(),
            success: false,
            detail: "timeout".into(),
        });
        assert_eq!(line, "  task_1_1 @ B: FAILED (timeout)");
    }

    #[test]
    fn test_evaluation_and_ledger_lines() {
        let e = Evaluation {
            total: 3,
            successful: 1,
            failed: 2,
            success_rate: 33.33,
            timestamp: chrono::Utc::now(),
        };
        assert_eq!(
            format_event(&ProgressEvent::Evaluated(e)),
            "  evaluation: 1/3 succeeded (33.33%)"
        );
        assert_eq!(
            format_event(&ProgressEvent::LedgerUpdated {
                worker_id: "A".into(),
                kind: TransactionKind::Penalty,
                amount: 1.0,
            }),
            "  ledger A penalty 1.00"
        );
    }
}
