use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Event, EventKind};

/// Identity of one monitored session. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub subject_id: String,
    pub subject_label: String,
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        subject_id: impl Into<String>,
        subject_label: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), subject_id, subject_label, started_at)
    }

    pub fn with_id(
        id: impl Into<String>,
        subject_id: impl Into<String>,
        subject_label: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            subject_id: subject_id.into(),
            subject_label: subject_label.into(),
            started_at,
        }
    }

    /// Stamps an event for this session.
    pub fn event(&self, kind: EventKind, occurred_at: DateTime<Utc>) -> Event {
        Event {
            kind,
            occurred_at,
            session_id: self.id.clone(),
            subject_id: self.subject_id.clone(),
        }
    }
}
