#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use seatwatch_core::DeviceSubscription;
use seatwatch_engine::{
    DispatchSettings, FailureKind, FetchError, NotificationDispatcher, PushMessage, PushTicket,
    PushTransport, SessionProvider, TransportError,
};
use serde_json::{json, Value};
use tokio::sync::Notify;

pub const TOKEN_A: &str = "ExponentPushToken[aaaaaaaaaaaaaaaaaaaaaa]";
pub const TOKEN_B: &str = "ExponentPushToken[bbbbbbbbbbbbbbbbbbbbbb]";

/// Push transport that records every batch and can fail selected ones.
#[derive(Default)]
pub struct RecordingTransport {
    batches: Mutex<Vec<Vec<PushMessage>>>,
    failing: HashSet<usize>,
}

impl RecordingTransport {
    pub fn failing(batches: &[usize]) -> Self {
        Self {
            failing: batches.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn batches(&self) -> Vec<Vec<PushMessage>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<PushMessage> {
        self.batches().into_iter().flatten().collect()
    }
}

#[async_trait::async_trait]
impl PushTransport for RecordingTransport {
    async fn send(&self, messages: &[PushMessage]) -> Result<Vec<PushTicket>, TransportError> {
        let index = {
            let mut batches = self.batches.lock().unwrap();
            batches.push(messages.to_vec());
            batches.len() - 1
        };
        if self.failing.contains(&index) {
            return Err(TransportError::HttpStatus(500));
        }
        Ok(messages
            .iter()
            .enumerate()
            .map(|(i, _)| PushTicket::Ok {
                id: format!("{index}-{i}"),
            })
            .collect())
    }
}

pub fn dispatcher(transport: Arc<RecordingTransport>, batch_size: usize) -> NotificationDispatcher {
    NotificationDispatcher::new(
        transport,
        DispatchSettings {
            batch_size,
            ..DispatchSettings::default()
        },
    )
}

pub fn subscription(token: &str) -> DeviceSubscription {
    DeviceSubscription {
        token: token.to_string(),
        subscribed_events: Default::default(),
        registered_at: Utc::now(),
    }
}

/// Payload with a single tier holding `seats`.
pub fn payload(seats: u32) -> Value {
    json!({
        "data": {
            "eventCards": {
                "Stadium": { "2026-06-01": { "19:30": {
                    "gold": { "minAvailableSeats": seats }
                }}}
            }
        }
    })
}

/// Gate that holds the first fetch until released.
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

/// Session provider serving queued payloads per event code.
pub struct FakeSession {
    ready: bool,
    responses: Mutex<HashMap<String, VecDeque<Result<Value, FetchError>>>>,
    calls: AtomicUsize,
    gate: Option<Arc<Gate>>,
}

impl FakeSession {
    pub fn ready() -> Self {
        Self {
            ready: true,
            responses: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn not_ready() -> Self {
        Self {
            ready: false,
            ..Self::ready()
        }
    }

    pub fn gated(gate: Arc<Gate>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::ready()
        }
    }

    pub fn push_seats(&self, code: &str, seats: u32) {
        self.push(code, Ok(payload(seats)));
    }

    pub fn push_error(&self, code: &str) {
        self.push(code, Err(FetchError::new(FailureKind::Network, "connection reset")));
    }

    fn push(&self, code: &str, response: Result<Value, FetchError>) {
        self.responses
            .lock()
            .unwrap()
            .entry(code.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SessionProvider for FakeSession {
    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let (0, Some(gate)) = (call, &self.gate) {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        let code = url.rsplit('/').next().unwrap_or_default().to_string();
        self.responses
            .lock()
            .unwrap()
            .get_mut(&code)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(payload(0)))
    }
}
