use serde::{Deserialize, Serialize};

/// A provider event being watched. Codes are assigned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub code: String,
    pub name: String,
}

impl Event {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// Seat availability observed for one event during one poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSnapshot {
    pub code: String,
    pub total_seats: u32,
    pub tickets: Vec<TicketOffer>,
}

impl EventSnapshot {
    pub fn empty(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            total_seats: 0,
            tickets: Vec::new(),
        }
    }
}

/// One bookable tier with seats left.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketOffer {
    pub name: String,
    pub venue: String,
    pub date: String,
    pub time: String,
    pub seats: u32,
    pub price: f64,
    pub url: String,
}

/// The fixed list of events watched by a deployment.
pub fn default_events() -> Vec<Event> {
    vec![
        Event::new("ET00474265", "India vs USA"),
        Event::new("ET00474011", "India vs Namibia"),
        Event::new("ET00474320", "India vs Pakistan"),
        Event::new("ET00474264", "Super 8 Match 8"),
        Event::new("ET00474002", "Super 8 Match 12"),
    ]
}
