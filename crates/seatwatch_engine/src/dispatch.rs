use std::sync::Arc;

use engine_logging::{engine_info, engine_warn, redact};
use seatwatch_core::{
    alarm_burst, is_push_token, test_burst, Alert, DeviceSubscription, Event, BURST_LEN,
};
use thiserror::Error;

use crate::{AlertData, PushMessage, PushTicket, PushTransport, TransportError};

/// Largest batch the push service accepts in one request.
pub const PUSH_BATCH_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub burst_len: usize,
    pub batch_size: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            burst_len: BURST_LEN,
            batch_size: PUSH_BATCH_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("invalid push token")]
    InvalidToken,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub size: usize,
    pub outcome: Result<Vec<PushTicket>, TransportError>,
}

/// Per-batch results of one dispatch call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DispatchReport {
    pub batches: Vec<BatchResult>,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.batches.iter().map(|batch| batch.size).sum()
    }

    /// Messages the push service acknowledged with an ok ticket.
    pub fn accepted(&self) -> usize {
        self.batches
            .iter()
            .filter_map(|batch| batch.outcome.as_ref().ok())
            .flatten()
            .filter(|ticket| ticket.is_ok())
            .count()
    }

    pub fn failed_batches(&self) -> usize {
        self.batches.iter().filter(|batch| batch.outcome.is_err()).count()
    }

    fn first_error(&self) -> Option<&TransportError> {
        self.batches.iter().find_map(|batch| batch.outcome.as_ref().err())
    }
}

/// Builds alert bursts and delivers them in transport-sized batches.
#[derive(Clone)]
pub struct NotificationDispatcher {
    transport: Arc<dyn PushTransport>,
    settings: DispatchSettings,
}

impl NotificationDispatcher {
    pub fn new(transport: Arc<dyn PushTransport>, settings: DispatchSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// Sends one burst per device announcing `seats` for `event`.
    ///
    /// Every batch is attempted; a failed batch is logged and the rest still go out.
    pub async fn send_alarm_burst(
        &self,
        devices: &[DeviceSubscription],
        event: &Event,
        seats: u32,
    ) -> DispatchReport {
        let burst = alarm_burst(event, seats, self.settings.burst_len);
        let data = AlertData {
            event_code: event.code.clone(),
            seats,
        };
        let mut messages = Vec::with_capacity(devices.len() * burst.len());
        for device in devices {
            if !is_push_token(&device.token) {
                engine_warn!("Skipping malformed token {}", redact(&device.token));
                continue;
            }
            messages.extend(to_messages(&device.token, &burst, Some(&data)));
        }
        if messages.is_empty() {
            return DispatchReport::default();
        }
        self.deliver(messages).await
    }

    /// Sends the fixed test burst to a single token.
    pub async fn send_test_burst(&self, token: &str) -> Result<DispatchReport, DispatchError> {
        if !is_push_token(token) {
            return Err(DispatchError::InvalidToken);
        }
        let burst = test_burst(self.settings.burst_len);
        let report = self.deliver(to_messages(token, &burst, None)).await;
        if let Some(err) = report.first_error() {
            return Err(DispatchError::Transport(err.clone()));
        }
        engine_info!("Test notifications sent to {}", redact(token));
        Ok(report)
    }

    async fn deliver(&self, messages: Vec<PushMessage>) -> DispatchReport {
        let mut report = DispatchReport::default();
        for chunk in messages.chunks(self.settings.batch_size.max(1)) {
            let outcome = self.transport.send(chunk).await;
            match &outcome {
                Ok(tickets) => {
                    let rejected = tickets.iter().filter(|ticket| !ticket.is_ok()).count();
                    engine_info!("Sent {} notifications", chunk.len());
                    if rejected > 0 {
                        engine_warn!("{} of {} notifications rejected", rejected, chunk.len());
                    }
                }
                Err(err) => {
                    engine_warn!("Batch of {} notifications failed: {}", chunk.len(), err);
                }
            }
            report.batches.push(BatchResult {
                size: chunk.len(),
                outcome,
            });
        }
        report
    }
}

fn to_messages(token: &str, burst: &[Alert], data: Option<&AlertData>) -> Vec<PushMessage> {
    burst
        .iter()
        .map(|alert| {
            PushMessage::alarm(token, alert.title.clone(), alert.body.clone(), data.cloned())
        })
        .collect()
}
