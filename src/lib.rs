// src/lib.rs — Flowing library root

pub mod cli;
pub mod core;
pub mod infra;
pub mod observability;
pub mod worker;
