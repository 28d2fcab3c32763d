use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::is_push_token;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("invalid push token")]
    InvalidToken,
}

/// A device registered for alerts.
///
/// An empty `subscribed_events` set means the device follows every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSubscription {
    pub token: String,
    pub subscribed_events: BTreeSet<String>,
    pub registered_at: DateTime<Utc>,
}

impl DeviceSubscription {
    pub fn is_interested_in(&self, code: &str) -> bool {
        self.subscribed_events.is_empty() || self.subscribed_events.contains(code)
    }
}

/// In-memory table of subscriptions keyed by push token.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionRegistry {
    devices: HashMap<String, DeviceSubscription>,
    order: Vec<String>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the subscription for `token`.
    ///
    /// Returns the number of registered devices afterwards. A replacement does
    /// not merge filters: the new event list wins outright.
    pub fn register(
        &mut self,
        token: &str,
        events: Option<Vec<String>>,
        now: DateTime<Utc>,
    ) -> Result<usize, RegistryError> {
        if !is_push_token(token) {
            return Err(RegistryError::InvalidToken);
        }
        // Re-registration moves the device to the end, as a fresh entry would.
        self.remove_from_order(token);
        self.order.push(token.to_string());
        self.devices.insert(
            token.to_string(),
            DeviceSubscription {
                token: token.to_string(),
                subscribed_events: events.unwrap_or_default().into_iter().collect(),
                registered_at: now,
            },
        );
        Ok(self.devices.len())
    }

    /// Removes `token`; returns whether an entry existed.
    pub fn unregister(&mut self, token: &str) -> bool {
        let existed = self.devices.remove(token).is_some();
        if existed {
            self.remove_from_order(token);
        }
        existed
    }

    /// Replaces the event filter of a known token; unknown tokens are ignored.
    pub fn update_events(&mut self, token: &str, events: Vec<String>) -> bool {
        match self.devices.get_mut(token) {
            Some(entry) => {
                entry.subscribed_events = events.into_iter().collect();
                true
            }
            None => false,
        }
    }

    /// Subscriptions that should hear about `code`, in registration order.
    pub fn list_interested(&self, code: &str) -> Vec<DeviceSubscription> {
        self.order
            .iter()
            .filter_map(|token| self.devices.get(token))
            .filter(|entry| entry.is_interested_in(code))
            .cloned()
            .collect()
    }

    pub fn get(&self, token: &str) -> Option<&DeviceSubscription> {
        self.devices.get(token)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    fn remove_from_order(&mut self, token: &str) {
        self.order.retain(|existing| existing != token);
    }
}
