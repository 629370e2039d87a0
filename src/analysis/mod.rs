//! Pure analysis stages
//!
//! Everything in here is deterministic over its inputs: no I/O, no
//! clocks, no randomness. The orchestrator fetches, these modules
//! compute.

pub mod fund_flow;
pub mod opinion;
pub mod risk;
pub mod stats;
