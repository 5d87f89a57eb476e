use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::settings::FocusConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", content = "label", rename_all = "camelCase")]
pub enum EventKind {
    NotFocused,
    Absent,
    MultipleSubjects,
    ProhibitedItem(String),
}

impl EventKind {
    /// Feed line for this kind, quoting the thresholds in `focus`.
    pub fn describe(&self, focus: &FocusConfig) -> String {
        match self {
            EventKind::NotFocused => format!("User not focused > {}", focus.focus_delay_label()),
            EventKind::Absent => format!("No face > {}", focus.absence_threshold_label()),
            EventKind::MultipleSubjects => "Multiple faces detected".to_string(),
            EventKind::ProhibitedItem(label) => format!("Suspicious item detected: {label}"),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe(&FocusConfig::default()))
    }
}

/// A recorded compliance violation. Never modified after it is appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub kind: EventKind,
    pub occurred_at: DateTime<Utc>,
    pub session_id: String,
    pub subject_id: String,
}

impl Event {
    pub fn describe(&self, focus: &FocusConfig) -> String {
        format!(
            "[{}] {} ({} / {})",
            self.occurred_at.format("%H:%M:%S"),
            self.kind.describe(focus),
            self.subject_id,
            self.session_id
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe(&FocusConfig::default()))
    }
}
