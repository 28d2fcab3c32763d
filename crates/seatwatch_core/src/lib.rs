//! Seatwatch core: pure availability tracking, subscriptions and alert content.
mod burst;
mod event;
mod registry;
mod status;
mod token;
mod tracker;

pub use burst::{alarm_burst, test_burst, Alert, BURST_LEN};
pub use event::{default_events, Event, EventSnapshot, TicketOffer};
pub use registry::{DeviceSubscription, RegistryError, SubscriptionRegistry};
pub use status::SweepStatus;
pub use token::is_push_token;
pub use tracker::{AvailabilityTracker, Transition};
