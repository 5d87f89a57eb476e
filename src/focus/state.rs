use serde::{Deserialize, Serialize};

use crate::settings::FocusConfig;

/// Stable attention flags derived from the face-count stream.
///
/// Owned by the face worker; everyone else sees copies.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FocusState {
    pub lost: bool,
    pub absent: bool,
    pub multiple: bool,
}

impl FocusState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Warning lines for a status display, most severe first.
    pub fn warnings(&self, focus: &FocusConfig) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.absent {
            warnings.push(format!("No Face > {}", focus.absence_threshold_label()));
        }
        if self.lost {
            warnings.push(format!("Not Focused > {}", focus.focus_delay_label()));
        }
        if self.multiple {
            warnings.push("Multiple Faces".to_string());
        }
        warnings
    }
}
