use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::ledger::{ShotEntry, ShotLedger};
use crate::session::SessionContext;

/// Timestamp format used throughout the snapshot contract: ISO-8601-like,
/// second precision, local time.
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Per-shot record inside a snapshot. Field names are wire format and must
/// not change: the same keys appear in the durable file, the upload body and
/// the remote `shots_data` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotRecord {
    pub attempts: u32,
    pub goals: u32,
    #[serde(rename = "attemptHistory", default)]
    pub attempt_history: Vec<bool>,
    #[serde(rename = "shotType", default = "default_shot_type")]
    pub shot_type: String,
    #[serde(default)]
    pub accuracy: f64,
}

fn default_shot_type() -> String {
    "Unknown".to_string()
}

impl ShotRecord {
    fn from_entry(entry: &ShotEntry) -> Self {
        Self {
            attempts: entry.attempts,
            goals: entry.goals,
            attempt_history: entry.history.clone(),
            shot_type: entry.shot_type.clone(),
            accuracy: entry.accuracy(),
        }
    }

    /// Build a ledger entry from a remote record, clamping rather than
    /// propagating invariant violations in malformed payloads.
    pub fn into_entry(self) -> ShotEntry {
        let mut entry = ShotEntry {
            attempts: self.attempts,
            goals: self.goals.min(self.attempts),
            history: self.attempt_history,
            shot_type: if self.shot_type.is_empty() {
                default_shot_type()
            } else {
                self.shot_type
            },
        };
        // Re-derive the counters through the reconciling setter so the
        // history length matches whatever the payload claimed.
        entry.set_counts(entry.goals, entry.attempts);
        entry
    }
}

/// The serialization contract shared by the durable session file and the
/// remote upload body. One serde type keeps the two byte-compatible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub status: String,
    #[serde(rename = "startTime")]
    pub start_time: String,
    #[serde(rename = "lastUpdated")]
    pub last_updated: String,
    #[serde(rename = "durationMinutes")]
    pub duration_minutes: i64,
    #[serde(rename = "totalAttempts")]
    pub total_attempts: u32,
    #[serde(rename = "totalGoals")]
    pub total_goals: u32,
    #[serde(rename = "totalAccuracy")]
    pub total_accuracy: f64,
    pub shots: BTreeMap<String, ShotRecord>,
    #[serde(rename = "totalShots")]
    pub total_shots: usize,
}

impl SessionSnapshot {
    /// Capture a consistent copy of the session and ledger at `now`. Called
    /// on the event thread before the snapshot crosses into the sync worker,
    /// so a serialized record can never interleave with later mutations.
    pub fn capture(session: &SessionContext, ledger: &ShotLedger, now: DateTime<Local>) -> Self {
        let (total_attempts, total_goals) = ledger.totals();
        let shots: BTreeMap<String, ShotRecord> = ledger
            .all()
            .map(|(id, entry)| (id.to_string(), ShotRecord::from_entry(entry)))
            .collect();

        Self {
            session_id: session.id.clone(),
            status: session.status_label().to_string(),
            start_time: session.started_at.format(TIME_FORMAT).to_string(),
            last_updated: now.format(TIME_FORMAT).to_string(),
            duration_minutes: now.signed_duration_since(session.started_at).num_minutes(),
            total_attempts,
            total_goals,
            total_accuracy: ledger.total_accuracy(),
            total_shots: shots.len(),
            shots,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}
