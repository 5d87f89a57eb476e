use std::collections::HashSet;

use crate::models::{EventKind, ObjectObservation};
use crate::settings::ItemPolicy;

/// Flags disallowed items on every tick they are seen.
///
/// Level-triggered on purpose: an item visible for N ticks yields N events and
/// therefore N deductions. No state is carried between ticks.
#[derive(Debug, Clone)]
pub struct ItemFlagger {
    disallowed: HashSet<String>,
    threshold: f64,
}

impl ItemFlagger {
    pub fn new(policy: &ItemPolicy) -> Self {
        Self {
            disallowed: policy.disallowed_labels.iter().cloned().collect(),
            threshold: policy.confidence_threshold,
        }
    }

    pub fn is_disallowed(&self, label: &str) -> bool {
        self.disallowed.contains(label)
    }

    /// One `ProhibitedItem` per qualifying detection, in detector order.
    pub fn flag(&self, observation: &ObjectObservation) -> Vec<EventKind> {
        observation
            .detections
            .iter()
            .filter(|d| d.confidence > self.threshold && self.is_disallowed(&d.label))
            .map(|d| EventKind::ProhibitedItem(d.label.clone()))
            .collect()
    }
}
