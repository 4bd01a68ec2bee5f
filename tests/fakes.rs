//! In-memory collaborators for session store and presenter tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use simarena::api::{
    ApiError, ApiResult, ChannelEvent, CreateSimulationRequest, Depth, Language, Simulation,
    SimulationChannel, SimulationService, SimulationStatus, Step, StreamConnector,
};
use simarena::session::SessionStore;
use tokio::sync::{mpsc, oneshot};

#[derive(Default)]
struct ServerState {
    simulations: HashMap<String, Simulation>,
    next_id: u32,
    fail_create: Option<ApiError>,
    fail_get: Option<ApiError>,
    create_gate: Option<oneshot::Receiver<()>>,
}

/// In-memory stand-in for the REST data service
#[derive(Clone, Default)]
pub struct FakeService {
    state: Arc<Mutex<ServerState>>,
}

impl FakeService {
    pub fn put(&self, simulation: Simulation) {
        let mut state = self.state.lock().unwrap();
        state.simulations.insert(simulation.id.clone(), simulation);
    }

    pub fn update(&self, id: &str, f: impl FnOnce(&mut Simulation)) {
        let mut state = self.state.lock().unwrap();
        f(state.simulations.get_mut(id).unwrap());
    }

    pub fn fail_next_create(&self, error: ApiError) {
        self.state.lock().unwrap().fail_create = Some(error);
    }

    pub fn fail_next_get(&self, error: ApiError) {
        self.state.lock().unwrap().fail_get = Some(error);
    }

    /// Park the next `create` until the returned sender fires
    pub fn hold_next_create(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state.lock().unwrap().create_gate = Some(rx);
        tx
    }
}

impl SimulationService for FakeService {
    async fn create(&self, request: &CreateSimulationRequest) -> ApiResult<Simulation> {
        let gate = self.state.lock().unwrap().create_gate.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.fail_create.take() {
            return Err(error);
        }

        state.next_id += 1;
        let mut simulation = simulation(&format!("sim-{}", state.next_id));
        simulation.description = request.description.clone();
        simulation.rounds = request.rounds;
        state
            .simulations
            .insert(simulation.id.clone(), simulation.clone());
        Ok(simulation)
    }

    async fn list(&self) -> ApiResult<Vec<Simulation>> {
        let state = self.state.lock().unwrap();
        let mut simulations: Vec<Simulation> = state.simulations.values().cloned().collect();
        simulations.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(simulations)
    }

    async fn get(&self, id: &str) -> ApiResult<Simulation> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.fail_get.take() {
            return Err(error);
        }

        state
            .simulations
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("simulation not found".to_string()))
    }

    async fn delete(&self, id: &str) -> ApiResult<()> {
        let mut state = self.state.lock().unwrap();
        state
            .simulations
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ApiError::NotFound("simulation not found".to_string()))
    }
}

/// Server side of one fake push connection
pub struct FakeStream {
    pub session_id: String,
    tx: mpsc::UnboundedSender<ChannelEvent>,
}

impl FakeStream {
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    pub fn step(&self, round: i32, content: &str) {
        let _ = self.tx.send(ChannelEvent::StepReceived(step(round, content)));
    }

    pub fn close(&self) {
        let _ = self.tx.send(ChannelEvent::Closed);
    }
}

#[derive(Clone, Default)]
pub struct FakeConnector {
    pub streams: Arc<Mutex<Vec<FakeStream>>>,
    on_open: Arc<Mutex<Vec<ChannelEvent>>>,
}

impl FakeConnector {
    pub fn open_count(&self) -> usize {
        self.streams
            .lock()
            .unwrap()
            .iter()
            .filter(|stream| stream.is_open())
            .count()
    }

    pub fn total_opened(&self) -> usize {
        self.streams.lock().unwrap().len()
    }

    pub fn with_stream<R>(&self, index: usize, f: impl FnOnce(&FakeStream) -> R) -> R {
        f(&self.streams.lock().unwrap()[index])
    }

    pub fn with_latest<R>(&self, f: impl FnOnce(&FakeStream) -> R) -> R {
        let streams = self.streams.lock().unwrap();
        f(streams.last().unwrap())
    }

    /// Deliver these events as soon as the next stream opens
    pub fn queue_on_open(&self, events: Vec<ChannelEvent>) {
        *self.on_open.lock().unwrap() = events;
    }
}

impl StreamConnector for FakeConnector {
    fn open(&self, session_id: &str) -> SimulationChannel {
        let (tx, rx) = mpsc::unbounded_channel();
        for event in self.on_open.lock().unwrap().drain(..) {
            let _ = tx.send(event);
        }
        self.streams.lock().unwrap().push(FakeStream {
            session_id: session_id.to_string(),
            tx,
        });
        SimulationChannel::from_parts(session_id, rx, None)
    }
}

pub fn simulation(id: &str) -> Simulation {
    Simulation {
        id: id.to_string(),
        description: "Market negotiation".to_string(),
        preconditions: String::new(),
        rounds: 3,
        show_only_result: false,
        agents: vec![],
        language: Language::En,
        depth: Depth::Medium,
        status: SimulationStatus::Running,
        steps: vec![],
        final_result: None,
        created_at: Utc::now(),
    }
}

pub fn step(round: i32, content: &str) -> Step {
    Step {
        round,
        agent_id: "a1".to_string(),
        agent_name: "Alice".to_string(),
        content: content.to_string(),
        timestamp: Utc::now(),
    }
}

pub fn request() -> CreateSimulationRequest {
    CreateSimulationRequest {
        description: "Market negotiation".to_string(),
        preconditions: String::new(),
        rounds: 3,
        show_only_result: false,
        agents: vec![],
        language: Language::En,
        depth: Depth::Medium,
    }
}

pub fn new_store() -> (
    SessionStore<FakeService, FakeConnector>,
    FakeService,
    FakeConnector,
) {
    let service = FakeService::default();
    let connector = FakeConnector::default();
    let store = SessionStore::new(service.clone(), connector.clone());
    (store, service, connector)
}
