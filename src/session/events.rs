//! Events and snapshots exchanged between the session store and its observers

use crate::api::{ChannelEvent, Simulation};

/// Identifies one opened transport channel for the lifetime of a store
pub type ChannelId = u64;

/// A channel event tagged with the channel and simulation it came from
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    pub channel_id: ChannelId,
    pub session_id: String,
    pub event: ChannelEvent,
}

/// Read-only view of the store published after every mutation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    pub simulations: Vec<Simulation>,
    pub current: Option<Simulation>,
    pub loading: bool,
}

impl StoreSnapshot {
    pub fn current_id(&self) -> Option<&str> {
        self.current.as_ref().map(|sim| sim.id.as_str())
    }
}
