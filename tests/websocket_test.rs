//! Push stream tests against a local WebSocket server

use std::time::Duration;

use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use simarena::api::{ChannelEvent, SimulationSocket, StreamConnector};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::Message;

fn step_json(round: i32, content: &str) -> String {
    serde_json::json!({
        "round": round,
        "agent_id": "a1",
        "agent_name": "Alice",
        "content": content,
        "timestamp": "2025-01-01T00:00:00Z"
    })
    .to_string()
}

#[tokio::test]
async fn test_channel_delivers_steps_then_closed() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (path_tx, path_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            let _ = path_tx.send(req.uri().path().to_string());
            Ok(resp)
        };
        let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback)
            .await
            .unwrap();

        ws.send(Message::Text(step_json(1, "opening"))).await.unwrap();
        ws.send(Message::Text("{garbage".to_string())).await.unwrap();
        ws.send(Message::Text(step_json(-1, "final"))).await.unwrap();
        ws.close(None).await.unwrap();
        while ws.next().await.is_some() {}
    });

    let connector = SimulationSocket::new(format!("ws://{}/api", addr));
    let mut channel = connector.open("sim-42");

    let mut events = Vec::new();
    while let Some(event) = timeout(Duration::from_secs(5), channel.recv()).await.unwrap() {
        events.push(event);
    }

    assert_eq!(path_rx.await.unwrap(), "/api/simulations/sim-42/ws");
    assert_eq!(events.len(), 3);
    assert!(matches!(&events[0], ChannelEvent::StepReceived(step) if step.round == 1));
    assert!(
        matches!(&events[1], ChannelEvent::StepReceived(step) if step.is_sentinel() && step.content == "final")
    );
    assert_eq!(events[2], ChannelEvent::Closed);
    assert!(channel.is_closed());
}

#[tokio::test]
async fn test_refused_connection_reports_closed() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let connector = SimulationSocket::new(format!("ws://{}/api", addr));
    let mut channel = connector.open("sim-1");

    let event = timeout(Duration::from_secs(5), channel.recv()).await.unwrap();
    assert_eq!(event, Some(ChannelEvent::Closed));
    assert_eq!(channel.recv().await, None);
}

#[tokio::test]
async fn test_close_stops_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (done_tx, done_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Text(step_json(1, "hello"))).await.unwrap();

        // Runs until the client hangs up
        while let Some(Ok(msg)) = ws.next().await {
            if msg.is_close() {
                break;
            }
        }
        let _ = done_tx.send(());
    });

    let connector = SimulationSocket::new(format!("ws://{}/api", addr));
    let mut channel = connector.open("sim-1");

    let first = timeout(Duration::from_secs(5), channel.recv()).await.unwrap();
    assert!(matches!(first, Some(ChannelEvent::StepReceived(_))));

    channel.close();
    channel.close();
    assert!(channel.is_closed());
    assert_eq!(channel.recv().await, None);

    timeout(Duration::from_secs(5), done_rx)
        .await
        .unwrap()
        .unwrap();
}
