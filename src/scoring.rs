use serde::{Deserialize, Serialize};

use crate::models::{Event, EventKind};
use crate::settings::ScoringWeights;

pub const MAX_SCORE: u32 = 100;

/// Occurrence counts per event kind. Every prohibited item counts, whatever
/// its label.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventCounts {
    pub not_focused: u32,
    pub multiple_subjects: u32,
    pub absent: u32,
    pub prohibited_item: u32,
}

impl EventCounts {
    pub fn from_events(events: &[Event]) -> Self {
        let mut counts = Self::default();
        for event in events {
            match event.kind {
                EventKind::NotFocused => counts.not_focused += 1,
                EventKind::MultipleSubjects => counts.multiple_subjects += 1,
                EventKind::Absent => counts.absent += 1,
                EventKind::ProhibitedItem(_) => counts.prohibited_item += 1,
            }
        }
        counts
    }

    /// Weighted sum, widened so that long sessions cannot overflow.
    pub fn deductions(&self, weights: &ScoringWeights) -> u64 {
        u64::from(self.not_focused) * u64::from(weights.not_focused)
            + u64::from(self.multiple_subjects) * u64::from(weights.multiple_subjects)
            + u64::from(self.absent) * u64::from(weights.absent)
            + u64::from(self.prohibited_item) * u64::from(weights.prohibited_item)
    }

    pub fn score(&self, weights: &ScoringWeights) -> u32 {
        let deductions = self.deductions(weights);
        u64::from(MAX_SCORE).saturating_sub(deductions) as u32
    }
}

/// Integrity score for a log snapshot: 100 minus weighted deductions, floored at 0.
pub fn score(events: &[Event], weights: &ScoringWeights) -> u32 {
    EventCounts::from_events(events).score(weights)
}
