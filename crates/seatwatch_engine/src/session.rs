use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use engine_logging::{engine_info, engine_warn};
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use seatwatch_core::EventSnapshot;
use serde_json::Value;

use crate::payload::decode_event_payload;
use crate::{FailureKind, FetchError};

pub const DEFAULT_PROVIDER_BASE: &str = "https://in.bookmyshow.com";
pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) ",
    "AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
);

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Site root; the landing page and the API both live under it.
    pub base_url: String,
    pub region_code: String,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Timeout for the one-off landing page visit.
    pub landing_timeout: Duration,
    /// Pause after the landing page so deferred cookies can settle.
    pub settle_delay: Duration,
    pub max_bytes: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PROVIDER_BASE.to_string(),
            region_code: "BANG".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            landing_timeout: Duration::from_secs(60),
            settle_delay: Duration::from_secs(2),
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

/// An authenticated fetch context for the provider's API.
#[async_trait::async_trait]
pub trait SessionProvider: Send + Sync {
    /// Whether the session has been established.
    fn is_ready(&self) -> bool;

    async fn get_json(&self, url: &str) -> Result<Value, FetchError>;
}

/// Cookie-keeping HTTP session that poses as a desktop browser.
#[derive(Debug)]
pub struct ReqwestSession {
    settings: SessionSettings,
    client: reqwest::Client,
    ready: AtomicBool,
}

impl ReqwestSession {
    pub fn new(settings: SessionSettings) -> Result<Self, FetchError> {
        let client = build_client(&settings)?;
        Ok(Self {
            settings,
            client,
            ready: AtomicBool::new(false),
        })
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Visits the landing page once and keeps the resulting cookies.
    ///
    /// The session stays not-ready if this fails; there is no retry.
    pub async fn establish(&self) -> Result<(), FetchError> {
        let url = parse_url(&self.settings.base_url)?;
        engine_info!("Establishing provider session at {}", url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .timeout(self.settings.landing_timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            engine_warn!("Landing page answered {}", status);
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        // Drain the body so the connection finishes cleanly.
        read_limited(response, self.settings.max_bytes).await?;

        if !self.settings.settle_delay.is_zero() {
            tokio::time::sleep(self.settings.settle_delay).await;
        }

        self.ready.store(true, Ordering::Release);
        engine_info!("Provider session ready");
        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionProvider for ReqwestSession {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let parsed = parse_url(url)?;
        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let body = read_limited(response, self.settings.max_bytes).await?;
        serde_json::from_slice(&body)
            .map_err(|err| FetchError::new(FailureKind::MalformedPayload, err.to_string()))
    }
}

/// Fetches per-event availability through a [`SessionProvider`].
#[derive(Clone)]
pub struct SessionClient {
    provider: Arc<dyn SessionProvider>,
    base_url: String,
}

impl SessionClient {
    pub fn new(provider: Arc<dyn SessionProvider>, base_url: impl Into<String>) -> Self {
        Self {
            provider,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.provider.is_ready()
    }

    /// Fails fast with `SessionNotReady` until the session is established.
    pub async fn fetch_event_availability(&self, code: &str) -> Result<EventSnapshot, FetchError> {
        if !self.provider.is_ready() {
            return Err(FetchError::new(
                FailureKind::SessionNotReady,
                "session_not_ready",
            ));
        }
        let url = format!("{}/api/le/events/info/{}", self.base_url, code);
        let payload = self.provider.get_json(&url).await?;
        let event_url = format!("{}/events/{}", self.base_url, code);
        decode_event_payload(code, &payload, &event_url)
    }
}

fn build_client(settings: &SessionSettings) -> Result<reqwest::Client, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        HeaderName::from_static("x-app-code"),
        HeaderValue::from_static("WEB"),
    );
    headers.insert(
        HeaderName::from_static("x-platform-code"),
        HeaderValue::from_static("WEB"),
    );
    let region = HeaderValue::from_str(&settings.region_code)
        .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
    headers.insert(HeaderName::from_static("x-region-code"), region);

    reqwest::Client::builder()
        .cookie_store(true)
        .user_agent(settings.user_agent.clone())
        .default_headers(headers)
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .build()
        .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
}

fn parse_url(url: &str) -> Result<reqwest::Url, FetchError> {
    reqwest::Url::parse(url)
        .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))
}

async fn read_limited(response: reqwest::Response, max_bytes: u64) -> Result<BytesMut, FetchError> {
    if let Some(content_len) = response.content_length() {
        if content_len > max_bytes {
            return Err(FetchError::new(
                FailureKind::TooLarge {
                    max_bytes,
                    actual: Some(content_len),
                },
                "response too large",
            ));
        }
    }

    let mut body = BytesMut::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_reqwest_error)?;
        let next_len = body.len() as u64 + chunk.len() as u64;
        if next_len > max_bytes {
            return Err(FetchError::new(
                FailureKind::TooLarge {
                    max_bytes,
                    actual: Some(next_len),
                },
                "response too large",
            ));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
