use std::collections::BTreeMap;

/// Outcome of feeding one observation into the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub is_new_availability: bool,
    pub previous: u32,
    pub current: u32,
}

/// Last observed seat count per event code.
///
/// Unseen codes read as 0. Entries are created on first observation and are
/// overwritten, never removed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AvailabilityTracker {
    seats: BTreeMap<String, u32>,
}

impl AvailabilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `current` for `code` and reports whether it is alert-worthy.
    ///
    /// Any change that leaves seats available counts, decreases included. A
    /// failed fetch should be observed as 0.
    pub fn observe(&mut self, code: &str, current: u32) -> Transition {
        let previous = self.previous(code);
        self.seats.insert(code.to_string(), current);
        Transition {
            is_new_availability: current > 0 && current != previous,
            previous,
            current,
        }
    }

    pub fn previous(&self, code: &str) -> u32 {
        self.seats.get(code).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> BTreeMap<String, u32> {
        self.seats.clone()
    }
}
