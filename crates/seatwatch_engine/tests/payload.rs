use pretty_assertions::assert_eq;
use seatwatch_engine::{decode_event_payload, FailureKind};
use serde_json::json;

const URL: &str = "https://tickets.example/events/E1";

#[test]
fn flattens_nested_cards_and_sums_seats() {
    let payload = json!({
        "data": {
            "eventCards": {
                "Stadium": {
                    "2026-06-01": {
                        "19:30": {
                            "gold": {
                                "eventName": "Gold Stand",
                                "venueName": "Main Stadium",
                                "minAvailableSeats": 4,
                                "minPrice": 2500.0
                            },
                            "silver": { "minAvailableSeats": 0 }
                        }
                    }
                },
                "Annex": {
                    "2026-06-02": {
                        "14:00": {
                            "general": { "minAvailableSeats": 3 }
                        }
                    }
                }
            }
        }
    });

    let snapshot = decode_event_payload("E1", &payload, URL).unwrap();
    assert_eq!(snapshot.code, "E1");
    assert_eq!(snapshot.total_seats, 7);
    assert_eq!(snapshot.tickets.len(), 2);

    let gold = &snapshot.tickets[0];
    assert_eq!(gold.name, "Gold Stand");
    assert_eq!(gold.venue, "Main Stadium");
    assert_eq!(gold.date, "2026-06-01");
    assert_eq!(gold.time, "19:30");
    assert_eq!(gold.price, 2500.0);
    assert_eq!(gold.url, URL);

    // Structural keys stand in for missing tier fields.
    let general = &snapshot.tickets[1];
    assert_eq!(general.name, "general");
    assert_eq!(general.venue, "Annex");
    assert_eq!(general.date, "2026-06-02");
    assert_eq!(general.time, "14:00");
    assert_eq!(general.seats, 3);
    assert_eq!(general.price, 0.0);
}

#[test]
fn malformed_tiers_contribute_nothing() {
    let payload = json!({
        "data": {
            "eventCards": {
                "Stadium": {
                    "2026-06-01": {
                        "19:30": {
                            "no_seats_field": { "eventName": "Box" },
                            "not_an_object": 12,
                            "bad_count": { "minAvailableSeats": "many" },
                            "negative": { "minAvailableSeats": -2 },
                            "ok": { "minAvailableSeats": 2 }
                        },
                        "20:00": "garbage"
                    }
                }
            }
        }
    });

    let snapshot = decode_event_payload("E1", &payload, URL).unwrap();
    assert_eq!(snapshot.total_seats, 2);
    assert_eq!(snapshot.tickets.len(), 1);
    assert_eq!(snapshot.tickets[0].name, "ok");
}

#[test]
fn missing_event_cards_is_empty_snapshot() {
    let snapshot = decode_event_payload("E1", &json!({ "data": {} }), URL).unwrap();
    assert_eq!(snapshot.total_seats, 0);
    assert!(snapshot.tickets.is_empty());
}

#[test]
fn missing_data_root_is_rejected() {
    for payload in [json!({}), json!({ "data": null }), json!({ "error": "blocked" })] {
        let err = decode_event_payload("E1", &payload, URL).unwrap_err();
        assert_eq!(err.kind, FailureKind::MalformedPayload);
    }
}
