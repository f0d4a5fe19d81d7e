//! # Narrative Core (The Cortex)
//!
//! The "brain" of the reactive story. This crate reads the world through
//! `signal_rules`, decides which story events become available, and fires
//! background rules when the world reaches the right state.
//!
//! ## Core Components
//!
//! - **conditions**: the predicate language shared by events, choices and triggers
//! - **narrative**: the event graph, its state machine, history and variables
//! - **triggers**: standing rules polled on an interval
//! - **events**: notifications emitted to the presentation layer
//! - **config**: engine configuration
//!
//! ## Design Philosophy
//!
//! - **State-Driven**: every decision is a function of flags, variables, history and the live snapshot
//! - **Event-Driven**: the core reacts to the host's clock and input, it never owns the game loop
//! - **Forgiving**: bad configuration and bad calls report `false`; unknown names read as "not met"

pub mod conditions;
pub mod config;
pub mod error;
pub mod events;
pub mod narrative;
pub mod triggers;

pub use conditions::*;
pub use config::*;
pub use error::*;
pub use events::*;
pub use narrative::*;
pub use triggers::*;
