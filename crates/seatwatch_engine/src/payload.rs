use engine_logging::engine_debug;
use seatwatch_core::{EventSnapshot, TicketOffer};
use serde_json::{Map, Value};

use crate::{FailureKind, FetchError};

/// Flattens an event-info payload into a snapshot.
///
/// The payload nests tiers as `data.eventCards[venue][date][time][tier]`. Every
/// tier adds its `minAvailableSeats` to the total; only tiers with seats become
/// offers. Nodes that are not objects are skipped. A payload without `data` is
/// rejected.
pub fn decode_event_payload(
    code: &str,
    payload: &Value,
    event_url: &str,
) -> Result<EventSnapshot, FetchError> {
    let data = payload
        .get("data")
        .filter(|data| !data.is_null())
        .ok_or_else(|| FetchError::new(FailureKind::MalformedPayload, "payload has no data"))?;

    let mut snapshot = EventSnapshot::empty(code);
    let Some(cards) = data.get("eventCards").and_then(Value::as_object) else {
        return Ok(snapshot);
    };

    for (venue, dates) in objects(cards) {
        for (date, times) in objects(dates) {
            for (time, tiers) in objects(times) {
                for (key, tier) in objects(tiers) {
                    let seats = seat_count(tier);
                    snapshot.total_seats = snapshot.total_seats.saturating_add(seats);
                    if seats == 0 {
                        continue;
                    }
                    snapshot.tickets.push(TicketOffer {
                        name: text_or(tier, "eventName", key),
                        venue: text_or(tier, "venueName", venue),
                        date: text_or(tier, "eventDate", date),
                        time: text_or(tier, "eventTime", time),
                        seats,
                        price: tier.get("minPrice").and_then(Value::as_f64).unwrap_or(0.0),
                        url: event_url.to_string(),
                    });
                }
            }
        }
    }

    Ok(snapshot)
}

fn objects(map: &Map<String, Value>) -> impl Iterator<Item = (&str, &Map<String, Value>)> {
    map.iter().filter_map(|(key, value)| match value.as_object() {
        Some(inner) => Some((key.as_str(), inner)),
        None => {
            engine_debug!("Skipping non-object node at key {}", key);
            None
        }
    })
}

fn seat_count(tier: &Map<String, Value>) -> u32 {
    let Some(raw) = tier.get("minAvailableSeats") else {
        return 0;
    };
    if let Some(seats) = raw.as_u64() {
        return u32::try_from(seats).unwrap_or(u32::MAX);
    }
    match raw.as_f64() {
        Some(seats) if seats.is_finite() && seats > 0.0 => seats.min(u32::MAX as f64) as u32,
        _ => 0,
    }
}

fn text_or(tier: &Map<String, Value>, field: &str, fallback: &str) -> String {
    tier.get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .unwrap_or(fallback)
        .to_string()
}
