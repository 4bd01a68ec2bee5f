//! Simulation session management module
//!
//! This module provides the session store that keeps the locally observed
//! simulations consistent with the server, and the events it exchanges with
//! the transport and the presentation layer.

pub mod events;
pub mod session_store;

pub use events::{ChannelId, StoreSnapshot, StreamEvent};
pub use session_store::SessionStore;
