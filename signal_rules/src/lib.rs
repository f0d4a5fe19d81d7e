//! # Signal Rules
//!
//! The "World Bible" crate - holds the flag store abstraction, the live world
//! state and its snapshots, and the radio signal tables.
//! This crate knows nothing about story events; it is the single source of
//! truth for what the world looks like right now.

pub mod error;
pub mod flags;
pub mod signals;
pub mod world_state;

pub use error::*;
pub use flags::*;
pub use signals::*;
pub use world_state::*;
