// src/observability/mod.rs — Optional trace recording
//
// The controller writes events here but never reads them back; running with
// or without a sink produces identical results.

pub mod tracer;

pub use tracer::{list_traces, load_trace, FileTracer, TraceEvent, TraceSink, TraceSummary};

/// Event types emitted by the controller.
pub mod events {
    pub const ASSIGNMENT_CREATED: &str = "assignment_created";
    pub const DISPATCH_RESOLVED: &str = "dispatch_resolved";
    pub const LEDGER_TRANSACTION: &str = "ledger_transaction";
}
