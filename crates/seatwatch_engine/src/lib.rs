//! Seatwatch engine: provider session, push delivery and the polling scheduler.
mod dispatch;
mod payload;
mod push;
mod scheduler;
mod session;
mod types;

pub use dispatch::{
    BatchResult, DispatchError, DispatchReport, DispatchSettings, NotificationDispatcher,
    PUSH_BATCH_LIMIT,
};
pub use payload::decode_event_payload;
pub use push::{ExpoPushTransport, PushSettings, PushTransport, DEFAULT_PUSH_URL};
pub use scheduler::{spawn_polling, Clock, EventCheck, PollingScheduler, SweepOutcome, SweepReport};
pub use session::{
    ReqwestSession, SessionClient, SessionProvider, SessionSettings, DEFAULT_PROVIDER_BASE,
    DEFAULT_USER_AGENT,
};
pub use types::{AlertData, FailureKind, FetchError, PushMessage, PushTicket, TransportError};
