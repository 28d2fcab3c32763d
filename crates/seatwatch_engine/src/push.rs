use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;

use crate::{PushMessage, PushTicket, TransportError};

pub const DEFAULT_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";

#[derive(Debug, Clone)]
pub struct PushSettings {
    pub endpoint: String,
    pub access_token: Option<String>,
    pub request_timeout: Duration,
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_PUSH_URL.to_string(),
            access_token: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Delivery capability: sends one batch, returns one ticket per message.
#[async_trait::async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(&self, messages: &[PushMessage]) -> Result<Vec<PushTicket>, TransportError>;
}

#[derive(Debug, Clone)]
pub struct ExpoPushTransport {
    settings: PushSettings,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    #[serde(default)]
    data: Vec<PushTicket>,
    #[serde(default)]
    errors: Vec<PushServiceError>,
}

#[derive(Debug, Deserialize)]
struct PushServiceError {
    #[serde(default)]
    message: String,
}

impl ExpoPushTransport {
    pub fn new(settings: PushSettings) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| TransportError::Network(err.to_string()))?;
        Ok(Self { settings, client })
    }
}

#[async_trait::async_trait]
impl PushTransport for ExpoPushTransport {
    async fn send(&self, messages: &[PushMessage]) -> Result<Vec<PushTicket>, TransportError> {
        let mut request = self
            .client
            .post(&self.settings.endpoint)
            .header(ACCEPT, "application/json")
            .json(messages);
        if let Some(token) = &self.settings.access_token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::HttpStatus(status.as_u16()));
        }

        let body: PushResponse = response
            .json()
            .await
            .map_err(|err| TransportError::Decode(err.to_string()))?;
        if let Some(first) = body.errors.first() {
            return Err(TransportError::Rejected(first.message.clone()));
        }
        if body.data.len() != messages.len() {
            return Err(TransportError::Decode(format!(
                "expected {} tickets, got {}",
                messages.len(),
                body.data.len()
            )));
        }
        Ok(body.data)
    }
}
