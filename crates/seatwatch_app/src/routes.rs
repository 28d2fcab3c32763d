//! HTTP surface for device registration, status and manual triggers.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use engine_logging::{engine_error, redact};
use seatwatch_core::Event;
use seatwatch_engine::{DispatchError, PollingScheduler};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;

pub const SERVICE_NAME: &str = "Seatwatch Ticket Checker Server";

pub type AppState = Arc<PollingScheduler>;

/// An event reference sent by clients: a bare code or an event object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EventRef {
    Code(String),
    Event { code: String },
}

fn codes(events: Vec<EventRef>) -> Vec<String> {
    events
        .into_iter()
        .map(|event| match event {
            EventRef::Code(code) | EventRef::Event { code } => code,
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub device_events: Option<Vec<EventRef>>,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEventsRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub events: Vec<EventRef>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: &'static str,
    pub registered_devices: usize,
    pub last_check: Option<DateTime<Utc>>,
    pub is_checking: bool,
    pub events: Vec<Event>,
    pub prev_availability: BTreeMap<String, u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub success: bool,
    pub last_check: Option<DateTime<Utc>>,
    pub prev_availability: BTreeMap<String, u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub name: &'static str,
    pub status: &'static str,
    pub browser_ready: bool,
    pub devices: usize,
    pub last_check: Option<DateTime<Utc>>,
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/register", post(register))
        .route("/unregister", post(unregister))
        .route("/update-events", post(update_events))
        .route("/status", get(status))
        .route("/check", get(check))
        .route("/test-notification", post(test_notification))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(scheduler): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        name: SERVICE_NAME,
        status: "running",
        browser_ready: scheduler.session_ready(),
        devices: scheduler.device_count(),
        last_check: scheduler.status().last_check_at,
    })
}

// A body that does not decode (missing, null or non-string token, bad event list)
// is an invalid registration, not an unprocessable entity.
async fn register(
    State(scheduler): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(req)) = body else {
        return error(StatusCode::BAD_REQUEST, "Invalid Expo push token");
    };
    let events = req.device_events.map(codes);
    match scheduler.register(&req.token, events) {
        Ok(total) => Json(json!({
            "success": true,
            "message": "Token registered",
            "totalTokens": total,
        }))
        .into_response(),
        Err(_) => error(StatusCode::BAD_REQUEST, "Invalid Expo push token"),
    }
}

async fn unregister(
    State(scheduler): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Json<serde_json::Value> {
    scheduler.unregister(&req.token);
    Json(json!({ "success": true }))
}

async fn update_events(
    State(scheduler): State<AppState>,
    Json(req): Json<UpdateEventsRequest>,
) -> Json<serde_json::Value> {
    scheduler.update_events(&req.token, codes(req.events));
    Json(json!({ "success": true }))
}

async fn status(State(scheduler): State<AppState>) -> Json<StatusResponse> {
    let sweep = scheduler.status();
    Json(StatusResponse {
        status: "running",
        registered_devices: scheduler.device_count(),
        last_check: sweep.last_check_at,
        is_checking: sweep.is_checking,
        events: scheduler.events().to_vec(),
        prev_availability: scheduler.availability(),
    })
}

async fn check(State(scheduler): State<AppState>) -> Json<CheckResponse> {
    scheduler.sweep().await;
    Json(CheckResponse {
        success: true,
        last_check: scheduler.status().last_check_at,
        prev_availability: scheduler.availability(),
    })
}

async fn test_notification(
    State(scheduler): State<AppState>,
    body: Result<Json<TokenRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(req)) = body else {
        return error(StatusCode::BAD_REQUEST, "Invalid token");
    };
    match scheduler.send_test_burst(&req.token).await {
        Ok(report) => Json(json!({
            "success": true,
            "message": format!("{} test notifications sent!", report.attempted()),
        }))
        .into_response(),
        Err(DispatchError::InvalidToken) => error(StatusCode::BAD_REQUEST, "Invalid token"),
        Err(DispatchError::Transport(err)) => {
            engine_error!("Test notification to {} failed: {}", redact(&req.token), err);
            error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use pretty_assertions::assert_eq;
    use seatwatch_engine::{
        DispatchSettings, FetchError, NotificationDispatcher, PushMessage, PushTicket,
        PushTransport, SessionClient, SessionProvider, TransportError,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;

    const TOKEN: &str = "ExponentPushToken[aaaaaaaaaaaaaaaaaaaaaa]";

    struct StaticSession {
        seats: u32,
    }

    #[async_trait::async_trait]
    impl SessionProvider for StaticSession {
        fn is_ready(&self) -> bool {
            true
        }

        async fn get_json(&self, _url: &str) -> Result<Value, FetchError> {
            Ok(json!({
                "data": { "eventCards": { "V": { "D": { "T": {
                    "tier": { "minAvailableSeats": self.seats }
                }}}}}
            }))
        }
    }

    #[derive(Default)]
    struct CountingTransport {
        sent: Mutex<usize>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl PushTransport for CountingTransport {
        async fn send(&self, messages: &[PushMessage]) -> Result<Vec<PushTicket>, TransportError> {
            if self.fail {
                return Err(TransportError::HttpStatus(502));
            }
            *self.sent.lock().unwrap() += messages.len();
            Ok(messages
                .iter()
                .map(|_| PushTicket::Ok { id: "id".to_string() })
                .collect())
        }
    }

    fn app(transport: Arc<CountingTransport>) -> (Router, AppState) {
        let scheduler = Arc::new(PollingScheduler::new(
            vec![Event::new("E1", "Final")],
            SessionClient::new(Arc::new(StaticSession { seats: 5 }), "https://tickets.example"),
            NotificationDispatcher::new(transport, DispatchSettings::default()),
        ));
        (router(scheduler.clone()), scheduler)
    }

    async fn call(
        router: Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn register_validates_and_counts_tokens() {
        let (router, scheduler) = app(Arc::default());

        let bad = Some(json!({ "token": "bad" }));
        let (status, body) = call(router.clone(), "POST", "/register", bad).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid Expo push token");

        let request = json!({
            "token": TOKEN,
            "deviceEvents": [{ "code": "E1", "name": "Final" }, "E2"]
        });
        let (status, body) = call(router.clone(), "POST", "/register", Some(request.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalTokens"], 1);

        let (_, body) = call(router, "POST", "/register", Some(request)).await;
        assert_eq!(body["totalTokens"], 1);
        assert_eq!(scheduler.device_count(), 1);
    }

    #[tokio::test]
    async fn unregister_and_update_always_succeed() {
        let (router, scheduler) = app(Arc::default());
        scheduler.register(TOKEN, None).unwrap();

        let (status, body) = call(
            router.clone(),
            "POST",
            "/update-events",
            Some(json!({ "token": "unknown", "events": ["E1"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (_, body) = call(router, "POST", "/unregister", Some(json!({ "token": TOKEN }))).await;
        assert_eq!(body["success"], true);
        assert_eq!(scheduler.device_count(), 0);
    }

    #[tokio::test]
    async fn check_runs_sweep_and_reports_availability() {
        let transport = Arc::new(CountingTransport::default());
        let (router, scheduler) = app(transport.clone());
        scheduler.register(TOKEN, None).unwrap();

        let (status, body) = call(router.clone(), "GET", "/check", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prevAvailability"]["E1"], 5);
        assert!(body["lastCheck"].is_string());
        assert_eq!(*transport.sent.lock().unwrap(), 10);

        let (_, body) = call(router.clone(), "GET", "/status", None).await;
        assert_eq!(body["registeredDevices"], 1);
        assert_eq!(body["isChecking"], false);
        assert_eq!(body["events"][0]["code"], "E1");

        let (_, body) = call(router, "GET", "/", None).await;
        assert_eq!(body["browserReady"], true);
        assert_eq!(body["devices"], 1);
    }

    #[tokio::test]
    async fn test_notification_maps_errors_to_status_codes() {
        let (router, _) = app(Arc::default());
        let bad = Some(json!({ "token": "x" }));
        let (status, _) = call(router.clone(), "POST", "/test-notification", bad).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let good = Some(json!({ "token": TOKEN }));
        let (status, body) = call(router, "POST", "/test-notification", good).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let failing = Arc::new(CountingTransport {
            fail: true,
            ..CountingTransport::default()
        });
        let (router, _) = app(failing);
        let good = Some(json!({ "token": TOKEN }));
        let (status, _) = call(router, "POST", "/test-notification", good).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn undecodable_token_bodies_are_bad_requests() {
        let (router, scheduler) = app(Arc::default());

        let bodies = [
            json!({ "token": 123 }),
            json!({ "token": null }),
            json!({ "token": TOKEN, "deviceEvents": "E1" }),
        ];
        for body in bodies {
            let (status, reply) = call(router.clone(), "POST", "/register", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(reply["error"], "Invalid Expo push token");
        }
        assert_eq!(scheduler.device_count(), 0);

        for body in [json!({ "token": null }), json!({ "token": 42 })] {
            let (status, reply) =
                call(router.clone(), "POST", "/test-notification", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(reply["error"], "Invalid token");
        }
    }
}
