//! SimArena push stream client implementation

use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, warn};

use super::types::{Step, StreamError};

/// Events delivered by a transport channel, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    StepReceived(Step),
    /// The underlying connection ended, delivered at most once
    Closed,
}

/// Opens transport channels scoped to one simulation each
pub trait StreamConnector {
    fn open(&self, session_id: &str) -> SimulationChannel;
}

/// Owner side of a single push connection.
///
/// Events arrive through one ordered queue. Once [`SimulationChannel::close`]
/// returns, the queue is gone and no further event can be observed.
#[derive(Debug)]
pub struct SimulationChannel {
    session_id: String,
    events: Option<mpsc::UnboundedReceiver<ChannelEvent>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl SimulationChannel {
    /// Assemble a channel from an event queue and an optional shutdown signal
    /// for whatever task feeds that queue.
    pub fn from_parts(
        session_id: impl Into<String>,
        events: mpsc::UnboundedReceiver<ChannelEvent>,
        shutdown_tx: Option<oneshot::Sender<()>>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            events: Some(events),
            shutdown_tx,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_closed(&self) -> bool {
        self.events.is_none()
    }

    /// Wait for the next event. Returns `None` once the channel is closed or
    /// after `Closed` has been delivered.
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        let events = self.events.as_mut()?;

        // A feeder that vanished without saying goodbye still counts as a close
        let event = events.recv().await.unwrap_or(ChannelEvent::Closed);

        if event == ChannelEvent::Closed {
            self.events = None;
            self.shutdown_tx = None;
        }

        Some(event)
    }

    /// Stop the connection. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }

        if let Some(mut events) = self.events.take() {
            events.close();
            debug!("Closed channel for simulation {}", self.session_id);
        }
    }
}

impl Drop for SimulationChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// WebSocket connector for `/simulations/{id}/ws`
#[derive(Debug, Clone)]
pub struct SimulationSocket {
    base_url: String,
}

impl SimulationSocket {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn stream_url(&self, session_id: &str) -> String {
        format!("{}/simulations/{}/ws", self.base_url, session_id)
    }

    /// Connect and pump messages until the server goes away or the owner hangs up.
    async fn run_connection(
        url: String,
        event_tx: mpsc::UnboundedSender<ChannelEvent>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        let ws_stream = tokio::select! {
            connected = connect_async(&url) => match connected {
                Ok((ws_stream, _)) => ws_stream,
                Err(e) => {
                    let err = StreamError::Connection(e.to_string());
                    error!("Failed to connect to {}: {}", url, err);
                    let _ = event_tx.send(ChannelEvent::Closed);
                    return;
                }
            },
            _ = &mut shutdown_rx => {
                debug!("Channel closed before connecting to {}", url);
                return;
            }
        };

        info!("Connected to simulation stream at {}", url);
        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    if let Err(e) = write.close().await {
                        warn!("Error closing WebSocket connection: {}", e);
                    }
                    info!("Disconnected from simulation stream at {}", url);
                    return;
                }
                message = read.next() => match message {
                    Some(Ok(msg)) => {
                        let Some(result) = Self::process_message(msg) else {
                            continue;
                        };
                        match result {
                            Ok(step) => {
                                if event_tx.send(ChannelEvent::StepReceived(step)).is_err() {
                                    debug!("Channel owner is gone, stopping stream for {}", url);
                                    return;
                                }
                            }
                            Err(e) => warn!("Dropping malformed stream message: {}", e),
                        }
                    }
                    Some(Err(e)) => {
                        let err = StreamError::Message(e.to_string());
                        error!("Simulation stream error: {}", err);
                        break;
                    }
                    None => {
                        info!("Simulation stream closed by server");
                        break;
                    }
                }
            }
        }

        let _ = event_tx.send(ChannelEvent::Closed);
    }

    /// Decode one frame. `None` means the frame carries nothing for the owner.
    fn process_message(msg: Message) -> Option<Result<Step, StreamError>> {
        match msg {
            Message::Text(text) => Some(Self::parse_step(&text)),
            Message::Binary(data) => Some(
                String::from_utf8(data)
                    .map_err(|e| StreamError::Parse(format!("Invalid UTF-8 payload: {}", e)))
                    .and_then(|text| Self::parse_step(&text)),
            ),
            Message::Close(frame) => {
                debug!("Received close frame: {:?}", frame);
                None
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => None,
        }
    }

    fn parse_step(text: &str) -> Result<Step, StreamError> {
        debug!("Received stream message: {}", text);
        serde_json::from_str(text)
            .map_err(|e| StreamError::Parse(format!("Failed to parse step: {}", e)))
    }
}

impl StreamConnector for SimulationSocket {
    fn open(&self, session_id: &str) -> SimulationChannel {
        let url = self.stream_url(session_id);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        debug!("Opening simulation stream: {}", url);
        tokio::spawn(Self::run_connection(url, event_tx, shutdown_rx));

        SimulationChannel::from_parts(session_id, event_rx, Some(shutdown_tx))
    }
}
