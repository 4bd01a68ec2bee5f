//! Session store: canonical simulation state kept in sync with the server
//!
//! The store owns the session list, the active simulation and at most one
//! live transport channel. Steps from the channel are applied in arrival
//! order; when the channel closes the store re-fetches the simulation so the
//! local copy always ends on the server's final state.

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{
    ApiResult, ChannelEvent, CreateSimulationRequest, Simulation, SimulationChannel,
    SimulationService, SimulationStatus, Step, StreamConnector,
};

use super::events::{ChannelId, StoreSnapshot, StreamEvent};

/// The channel currently attached to the active simulation
#[derive(Debug)]
struct ActiveChannel {
    id: ChannelId,
    channel: SimulationChannel,
}

/// State container for simulations observed by one client
pub struct SessionStore<S, C> {
    service: S,
    connector: C,
    simulations: Vec<Simulation>,
    current: Option<Simulation>,
    loading: bool,
    channel: Option<ActiveChannel>,
    next_channel_id: ChannelId,
    snapshot_tx: watch::Sender<StoreSnapshot>,
}

impl<S, C> SessionStore<S, C>
where
    S: SimulationService,
    C: StreamConnector,
{
    pub fn new(service: S, connector: C) -> Self {
        let (snapshot_tx, _) = watch::channel(StoreSnapshot::default());

        Self {
            service,
            connector,
            simulations: Vec::new(),
            current: None,
            loading: false,
            channel: None,
            next_channel_id: 0,
            snapshot_tx,
        }
    }

    /// Observe every state change
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn simulations(&self) -> &[Simulation] {
        &self.simulations
    }

    pub fn current(&self) -> Option<&Simulation> {
        self.current.as_ref()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn has_open_channel(&self) -> bool {
        self.channel.is_some()
    }

    /// Replace the session list with the server's
    pub async fn refresh_list(&mut self) -> ApiResult<()> {
        let mut simulations = self.service.list().await?;

        let mut seen = std::collections::HashSet::new();
        simulations.retain(|sim| seen.insert(sim.id.clone()));
        simulations.iter_mut().for_each(Simulation::normalize);

        debug!("Session list refreshed with {} simulations", simulations.len());
        self.simulations = simulations;
        self.publish();
        Ok(())
    }

    /// Create a simulation, make it active and start streaming it
    pub async fn start(&mut self, request: &CreateSimulationRequest) -> ApiResult<Simulation> {
        self.loading = true;
        self.publish();

        let created = self.service.create(request).await;
        self.loading = false;

        let mut simulation = match created {
            Ok(simulation) => simulation,
            Err(e) => {
                warn!("Failed to start simulation: {}", e);
                self.publish();
                return Err(e);
            }
        };
        simulation.normalize();

        info!("Started simulation {}", simulation.id);

        self.simulations.retain(|sim| sim.id != simulation.id);
        self.simulations.insert(0, simulation.clone());
        self.current = Some(simulation.clone());
        self.open_channel(&simulation.id);
        self.publish();

        Ok(simulation)
    }

    /// Make a simulation active using a fresh copy from the server.
    /// Streaming resumes only if it is still running.
    pub async fn select(&mut self, id: &str) -> ApiResult<()> {
        self.close_channel();

        let mut simulation = self.service.get(id).await?;
        simulation.normalize();

        let running = simulation.status == SimulationStatus::Running;
        info!("Selected simulation {} ({})", simulation.id, simulation.status);

        self.replace_list_entry(&simulation);
        self.current = Some(simulation);

        if running {
            self.open_channel(id);
        }
        self.publish();

        Ok(())
    }

    /// Fetch a server copy without selecting it or opening a channel
    pub async fn fetch(&mut self, id: &str) -> ApiResult<Simulation> {
        let mut simulation = self.service.get(id).await?;
        simulation.normalize();

        debug!("Fetched simulation {} ({})", simulation.id, simulation.status);
        self.replace_list_entry(&simulation);
        self.publish();

        Ok(simulation)
    }

    /// Delete a simulation remotely and forget it locally
    pub async fn remove(&mut self, id: &str) -> ApiResult<()> {
        self.service.delete(id).await?;

        self.simulations.retain(|sim| sim.id != id);
        if self.current_id() == Some(id) {
            self.current = None;
            self.close_channel();
        }

        info!("Removed simulation {}", id);
        self.publish();
        Ok(())
    }

    /// Stop observing the active simulation without touching the server
    pub fn clear(&mut self) {
        self.close_channel();
        self.current = None;
        self.publish();
    }

    /// Wait for the next event of the active channel.
    /// Returns `None` when no channel is open.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        let active = self.channel.as_mut()?;
        let event = active.channel.recv().await?;

        Some(StreamEvent {
            channel_id: active.id,
            session_id: active.channel.session_id().to_string(),
            event,
        })
    }

    /// Apply one channel event. Events from superseded channels are dropped.
    pub async fn handle_event(&mut self, event: StreamEvent) -> ApiResult<()> {
        if !self.is_live(&event) {
            debug!(
                "Discarding stale event from channel {} for simulation {}",
                event.channel_id, event.session_id
            );
            return Ok(());
        }

        match event.event {
            ChannelEvent::StepReceived(step) => {
                self.apply_step(step);
                Ok(())
            }
            ChannelEvent::Closed => self.on_channel_closed(&event.session_id).await,
        }
    }

    /// Drive the active channel until it is gone
    pub async fn settle(&mut self) -> ApiResult<()> {
        while let Some(event) = self.next_event().await {
            self.handle_event(event).await?;
        }
        Ok(())
    }

    fn is_live(&self, event: &StreamEvent) -> bool {
        let channel_matches = self
            .channel
            .as_ref()
            .is_some_and(|active| active.id == event.channel_id);

        channel_matches && self.current_id() == Some(event.session_id.as_str())
    }

    fn apply_step(&mut self, step: Step) {
        let Some(current) = self.current.as_mut() else {
            return;
        };

        if current.status.is_terminal() {
            debug!(
                "Ignoring step for finished simulation {} (round {})",
                current.id, step.round
            );
            return;
        }

        if step.is_sentinel() {
            info!("Simulation {} completed", current.id);
            current.final_result = Some(step.content);
            current.status = SimulationStatus::Completed;
            self.close_channel();
        } else {
            debug!(
                "Simulation {} round {} from {}",
                current.id, step.round, step.agent_name
            );
            current.steps.push(step);
        }

        if let Some(current) = self.current.clone() {
            self.replace_list_entry(&current);
        }
        self.publish();
    }

    /// Reconcile with the server once the stream has ended
    async fn on_channel_closed(&mut self, session_id: &str) -> ApiResult<()> {
        self.channel = None;

        if self.current_id() != Some(session_id) {
            return Ok(());
        }

        info!("Stream for simulation {} closed, reconciling", session_id);
        let mut simulation = self.service.get(session_id).await?;
        simulation.normalize();

        // The active simulation may have changed while the fetch was in flight
        if self.current_id() != Some(session_id) {
            debug!("Dropping reconciled snapshot for inactive simulation {}", session_id);
            return Ok(());
        }

        info!(
            "Simulation {} reconciled: status={}, steps={}",
            simulation.id,
            simulation.status,
            simulation.steps.len()
        );

        self.replace_list_entry(&simulation);
        self.current = Some(simulation);
        self.publish();
        Ok(())
    }

    fn open_channel(&mut self, session_id: &str) {
        self.close_channel();

        let id = self.next_channel_id;
        self.next_channel_id += 1;

        let channel = self.connector.open(session_id);
        debug!("Opened channel {} for simulation {}", id, session_id);
        self.channel = Some(ActiveChannel { id, channel });
    }

    fn close_channel(&mut self) {
        if let Some(mut active) = self.channel.take() {
            active.channel.close();
            debug!(
                "Retired channel {} for simulation {}",
                active.id,
                active.channel.session_id()
            );
        }
    }

    fn replace_list_entry(&mut self, simulation: &Simulation) {
        if let Some(entry) = self
            .simulations
            .iter_mut()
            .find(|sim| sim.id == simulation.id)
        {
            *entry = simulation.clone();
        }
    }

    fn current_id(&self) -> Option<&str> {
        self.current.as_ref().map(|sim| sim.id.as_str())
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(StoreSnapshot {
            simulations: self.simulations.clone(),
            current: self.current.clone(),
            loading: self.loading,
        });
    }
}
