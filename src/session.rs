use chrono::{DateTime, Local};

/// Identifies the current practice sitting. Replaced wholesale on session
/// start/end, never mutated in place except for the active flag flip when a
/// session is being ended or the remote side deactivates it.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub id: String,
    pub started_at: DateTime<Local>,
    pub active: bool,
}

impl SessionContext {
    /// Begin a fresh active session with a timestamp-derived id. Uniqueness
    /// is not cryptographic; millisecond resolution is sufficient for the
    /// expected single-client usage.
    pub fn begin() -> Self {
        let now = Local::now();
        Self {
            id: format!("session_{}", now.timestamp_millis()),
            started_at: now,
            active: true,
        }
    }

    /// Adopt a session id the remote side reports as active, e.g. one the
    /// user created from the dashboard.
    pub fn adopt(id: String) -> Self {
        Self {
            id,
            started_at: Local::now(),
            active: true,
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.active {
            "active"
        } else {
            "completed"
        }
    }
}
