//! SimArena service integration module
//!
//! Handles the REST data service, the per-simulation push stream, and the
//! wire types both of them speak.

pub mod rest;
pub mod types;
pub mod websocket;

// Re-export commonly used types
pub use rest::{SimulationClient, SimulationService};
pub use types::*;
pub use websocket::{ChannelEvent, SimulationChannel, SimulationSocket, StreamConnector};
