// src/core/mod.rs — Dispatch-and-incentive engine

pub mod assignment;
pub mod dispatcher;
pub mod evaluator;
pub mod generator;
pub mod ledger;
pub mod orchestrator;
pub mod types;
