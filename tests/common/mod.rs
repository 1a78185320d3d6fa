//! Common test utilities: an in-memory streaming endpoint.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use meeting_stream::transport::{Connector, Frame, Transport};
use meeting_stream::{ClientIntent, ConnectionSettings, ReconnectPolicy, StreamClient};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const ENDPOINT: &str = "mock://stream";

/// Hands out scripted links in order; an empty script refuses to connect.
#[derive(Default)]
pub struct MockConnector {
    links: Mutex<VecDeque<Result<MockTransport, String>>>,
    dials: AtomicUsize,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a link that will accept the next dial.
    pub fn push_link(&self) -> ServerHandle {
        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();
        self.links.lock().unwrap().push_back(Ok(MockTransport { inbound, outbound }));
        ServerHandle {
            to_client: Some(to_client),
            from_client,
        }
    }

    /// Queue a refused dial.
    pub fn push_failure(&self, reason: &str) {
        self.links.lock().unwrap().push_back(Err(reason.to_string()));
    }

    /// Number of dial attempts so far
    pub fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Connector for MockConnector {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Transport>> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        let next = self.links.lock().unwrap().pop_front();
        match next {
            Some(Ok(transport)) => Ok(Box::new(transport)),
            Some(Err(reason)) => Err(anyhow!("{}: {}", endpoint, reason)),
            None => Err(anyhow!("{}: connection refused", endpoint)),
        }
    }
}

pub struct MockTransport {
    inbound: mpsc::UnboundedReceiver<Frame>,
    outbound: mpsc::UnboundedSender<String>,
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        self.outbound
            .send(text)
            .map_err(|_| anyhow!("peer went away"))
    }

    async fn recv(&mut self) -> Option<Result<Frame>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<()> {
        self.inbound.close();
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Server side of one scripted link
pub struct ServerHandle {
    to_client: Option<mpsc::UnboundedSender<Frame>>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl ServerHandle {
    /// Handshake acknowledgement
    pub fn ack(&self) {
        self.send(json!({"type": "connection", "status": "connected", "client_id": "client-1"}));
    }

    pub fn send(&self, value: Value) {
        self.send_raw(&value.to_string());
    }

    pub fn send_raw(&self, text: &str) {
        if let Some(tx) = &self.to_client {
            let _ = tx.send(Frame::Text(text.to_string()));
        }
    }

    pub fn keepalive(&self) {
        if let Some(tx) = &self.to_client {
            let _ = tx.send(Frame::Keepalive);
        }
    }

    /// Close from the server side; the client sees end of stream.
    pub fn close(&mut self) {
        self.to_client = None;
    }

    /// Intents the client has sent so far
    pub fn sent(&mut self) -> Vec<ClientIntent> {
        let mut intents = Vec::new();
        while let Ok(text) = self.from_client.try_recv() {
            intents.push(serde_json::from_str(&text).expect("client sent invalid intent"));
        }
        intents
    }
}

pub fn settings() -> ConnectionSettings {
    ConnectionSettings {
        liveness_window: Duration::from_secs(60),
        heartbeat_echo_interval: Duration::from_secs(10),
        reconnect: ReconnectPolicy::new(Duration::from_secs(1), 5),
    }
}

/// Client wired to `connector` with default test settings
pub fn client(connector: &Arc<MockConnector>) -> StreamClient {
    StreamClient::new(connector.clone(), settings())
}

/// Client connected over a fresh link
pub async fn connected_client(connector: &Arc<MockConnector>) -> (StreamClient, ServerHandle) {
    let server = connector.push_link();
    server.ack();
    let mut client = client(connector);
    client.connect(ENDPOINT).await.expect("connect failed");
    (client, server)
}

pub fn subscribe(session_id: &str) -> ClientIntent {
    ClientIntent::Subscribe {
        session_id: session_id.to_string(),
    }
}

pub fn unsubscribe(session_id: &str) -> ClientIntent {
    ClientIntent::Unsubscribe {
        session_id: session_id.to_string(),
    }
}

// ============================================================================
// Backend frames
// ============================================================================

/// `chunk_update` with one emotion entry per `(speaker, emotion)` pair
pub fn chunk_event(
    session_id: &str,
    chunk_id: u64,
    start: f64,
    end: f64,
    emotions: &[(&str, &str)],
    jargon: &[(&str, f64)],
) -> Value {
    let speakers: Vec<&str> = emotions.iter().map(|(speaker, _)| *speaker).collect();
    let emotions: serde_json::Map<String, Value> = emotions
        .iter()
        .map(|(speaker, emotion)| {
            (
                speaker.to_string(),
                json!({"dominant_emotion": emotion, "confidence": 0.8, "all_emotions": {}}),
            )
        })
        .collect();
    let jargon: Vec<Value> = jargon
        .iter()
        .map(|(term, score)| json!({"term": term, "score": score}))
        .collect();

    json!({
        "type": "chunk_update",
        "session_id": session_id,
        "chunk": {
            "chunk_id": chunk_id,
            "start_time": start,
            "end_time": end,
            "timestamp": "2025-03-14 10:15:30.123456",
            "transcript": {"full_text": format!("chunk {} text", chunk_id), "language": "en"},
            "speakers": {"speakers": speakers},
            "emotions": emotions,
            "jargon": jargon,
            "micro_summary": format!("summary of chunk {}", chunk_id),
            "processing_status": "completed"
        }
    })
}

/// `summary_update` attributing 7 segments to `Speaker_1`
pub fn summary_event(session_id: &str, total_chunks: u64) -> Value {
    json!({
        "type": "summary_update",
        "session_id": session_id,
        "summary": {
            "session_id": session_id,
            "timestamp": "2025-03-14T10:45:00.000000",
            "combined_transcript": "all of it",
            "final_summary": "The team agreed on the rollout plan.",
            "speakers_summary": {
                "Speaker_1": {
                    "speaker_id": "Speaker_1",
                    "total_segments": 7,
                    "total_duration": 120.5,
                    "word_count": 300,
                    "dominant_emotion": "joy",
                    "emotion_distribution": {"joy": 0.7, "neutral": 0.3}
                }
            },
            "emotions_summary": {"joy": 0.7, "neutral": 0.3},
            "jargon_summary": [{"term": "SLA", "score": 0.95, "definition": "service level agreement"}],
            "total_chunks": total_chunks,
            "total_duration": 600.0,
            "meeting_metadata": {}
        }
    })
}

pub fn status_event(session_id: &str, status: &str, details: Value) -> Value {
    json!({
        "type": "status",
        "session_id": session_id,
        "status": status,
        "details": details
    })
}

pub fn heartbeat() -> Value {
    json!({"type": "heartbeat", "server_time": "2025-03-14T10:15:30Z"})
}
