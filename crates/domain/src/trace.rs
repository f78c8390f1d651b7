use serde::Serialize;

/// Structured trace events emitted across all SessionKeeper crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    /// The first session of the process was installed.
    SessionCreated {
        session_id: String,
    },
    SessionRotated {
        old_session_id: String,
        new_session_id: String,
        reason: String,
    },
    /// `session.start` as reported by the standard observer.
    #[serde(rename = "session.start")]
    SessionStarted {
        #[serde(rename = "session.id")]
        session_id: String,
        #[serde(rename = "session.previous_id", skip_serializing_if = "Option::is_none")]
        previous_id: Option<String>,
    },
    /// `session.end` as reported by the standard observer.
    #[serde(rename = "session.end")]
    SessionEnded {
        #[serde(rename = "session.id")]
        session_id: String,
        #[serde(rename = "session.duration_ms")]
        duration_ms: u64,
    },
    ApplicationForegrounded,
    ApplicationBackgrounded,
    ObserverFailed {
        observer: String,
        callback: String,
        message: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "sk_event");
    }
}
