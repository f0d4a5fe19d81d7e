//! Narrative module - branching story events, their choices, and the graph that
//! runs them.
//!
//! - **event**: event, choice and outcome definitions plus the record format
//! - **graph**: the registry, state machine, history and variables
//! - **interference**: message obfuscation for weak transmissions
//! - **loader**: batch parsing of event records

mod event;
mod graph;
mod interference;
mod loader;

pub use event::*;
pub use graph::*;
pub use interference::apply_interference;
pub use loader::parse_events;

pub(crate) use loader::parse_records;
