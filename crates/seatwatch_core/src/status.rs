use chrono::{DateTime, Utc};
use serde::Serialize;

/// Point-in-time view of the sweep flag and the last completed sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepStatus {
    pub is_checking: bool,
    pub last_check_at: Option<DateTime<Utc>>,
}
