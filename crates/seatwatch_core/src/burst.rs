use crate::Event;

/// Number of messages in one alert burst.
pub const BURST_LEN: usize = 10;

/// Title and body of one push message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub body: String,
}

const MARKERS: [(&str, &str); BURST_LEN] = [
    ("🚨🔔", "🔔🚨"),
    ("🔔🚨", "🚨🔔"),
    ("⚡💥", "💥⚡"),
    ("🔥🔥", "🔥🔥"),
    ("🏏🎫", "🎫🏏"),
    ("💥⚡", "⚡💥"),
    ("🎯🎯", "🎯🎯"),
    ("⏰⏰", "⏰⏰"),
    ("🎫🚀", "🚀🎫"),
    ("🚀🚀", "🚀🚀"),
];

fn title(position: usize, len: usize) -> String {
    let (left, right) = MARKERS[(position - 1) % BURST_LEN];
    format!("{left} ALARM {position}/{len} {right}")
}

fn alarm_body(position: usize, name: &str, seats: u32) -> String {
    match (position - 1) % BURST_LEN {
        0 => format!("{name}: {seats} SEATS AVAILABLE NOW!!!"),
        1 => format!("BOOK NOW! {seats} tickets for {name}!"),
        2 => format!("HURRY! {name} has {seats} seats!"),
        3 => format!("HOT! {seats} seats for {name}!"),
        4 => format!("CRICKET TICKETS! {name}: {seats}!"),
        5 => format!("ACT FAST! {seats} seats going fast!"),
        6 => format!("TARGET: {name} - {seats} seats!"),
        7 => format!("TIME CRITICAL! Book {name} NOW!"),
        8 => format!("LAST CHANCE! {seats} seats remaining!"),
        _ => format!("FINAL ALERT! {name}: {seats} seats! GO!!!"),
    }
}

/// Escalating burst announcing `seats` for `event`, `len` messages long.
pub fn alarm_burst(event: &Event, seats: u32, len: usize) -> Vec<Alert> {
    (1..=len)
        .map(|position| Alert {
            title: title(position, len),
            body: alarm_body(position, &event.name, seats),
        })
        .collect()
}

/// Fixed synthetic burst used to verify a device end to end.
pub fn test_burst(len: usize) -> Vec<Alert> {
    (1..=len)
        .map(|position| Alert {
            title: title(position, len),
            body: format!("TEST NOTIFICATION {position}/{len} - Server is working!"),
        })
        .collect()
}
