use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Event, Session};
use crate::scoring::EventCounts;
use crate::settings::ScoringWeights;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub subject_label: String,
    pub duration_seconds: u64,
    pub event_counts: EventCounts,
    pub final_score: u32,
}

/// Builds a report from a log snapshot. `now` is the moment of the request, so
/// mid-session reports cover the time elapsed so far.
pub fn build_report(
    session: &Session,
    events: &[Event],
    weights: &ScoringWeights,
    now: DateTime<Utc>,
) -> Report {
    let counts = EventCounts::from_events(events);
    let duration_seconds = (now - session.started_at).num_seconds().max(0) as u64;

    Report {
        subject_label: session.subject_label.clone(),
        duration_seconds,
        event_counts: counts,
        final_score: counts.score(weights),
    }
}

impl Report {
    /// `{m}m {s}s`, as shown on the exported sheet.
    pub fn duration_label(&self) -> String {
        format!("{}m {}s", self.duration_seconds / 60, self.duration_seconds % 60)
    }

    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Candidate Name", self.subject_label.clone()),
            ("Interview Duration", self.duration_label()),
            ("Focus Lost Count", self.event_counts.not_focused.to_string()),
            ("Multiple Faces Count", self.event_counts.multiple_subjects.to_string()),
            ("No Face Count", self.event_counts.absent.to_string()),
            ("Suspicious Items Count", self.event_counts.prohibited_item.to_string()),
            ("Final Integrity Score", self.final_score.to_string()),
        ]
    }

    /// Header-less `key,value` lines.
    pub fn to_csv(&self) -> String {
        self.rows()
            .into_iter()
            .map(|(key, value)| format!("{},{}", csv_field(key), csv_field(&value)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn csv_field(value: &str) -> String {
    if value.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r')) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
