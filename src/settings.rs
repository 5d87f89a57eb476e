use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

/// Hysteresis for the face-count conditions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FocusConfig {
    /// How long exactly one face must stay in frame before `NotFocused` fires.
    pub focus_delay_ms: u64,
    /// A zero-face run must last strictly longer than this to raise `Absent`.
    pub absence_threshold_ms: u64,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            focus_delay_ms: 5_000,
            absence_threshold_ms: 10_000,
        }
    }
}

impl FocusConfig {
    pub fn focus_delay(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.focus_delay_ms as i64)
    }

    pub fn absence_threshold(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.absence_threshold_ms as i64)
    }

    /// "5s" for the default delay; fractional delays keep one decimal.
    pub fn focus_delay_label(&self) -> String {
        seconds_label(self.focus_delay_ms)
    }

    pub fn absence_threshold_label(&self) -> String {
        seconds_label(self.absence_threshold_ms)
    }
}

fn seconds_label(ms: u64) -> String {
    if ms % 1_000 == 0 {
        format!("{}s", ms / 1_000)
    } else {
        format!("{:.1}s", ms as f64 / 1_000.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemPolicy {
    /// Exact detector labels that count as prohibited.
    pub disallowed_labels: Vec<String>,
    /// A detection must score strictly above this to be flagged.
    pub confidence_threshold: f64,
}

impl Default for ItemPolicy {
    fn default() -> Self {
        Self {
            disallowed_labels: vec!["cell phone".into(), "book".into(), "laptop".into()],
            confidence_threshold: 0.6,
        }
    }
}

/// Points deducted from 100 per recorded event of each kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringWeights {
    pub not_focused: u32,
    pub multiple_subjects: u32,
    pub absent: u32,
    pub prohibited_item: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            not_focused: 2,
            multiple_subjects: 5,
            absent: 5,
            prohibited_item: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SamplingCadence {
    pub face_interval_ms: u64,
    pub object_interval_ms: u64,
    /// Upper bound on a single detector call before the tick is abandoned.
    pub sample_timeout_ms: u64,
}

impl Default for SamplingCadence {
    fn default() -> Self {
        Self {
            face_interval_ms: 1_000,
            object_interval_ms: 2_000,
            sample_timeout_ms: 5_000,
        }
    }
}

impl SamplingCadence {
    pub fn face_interval(&self) -> Duration {
        Duration::from_millis(self.face_interval_ms)
    }

    pub fn object_interval(&self) -> Duration {
        Duration::from_millis(self.object_interval_ms)
    }

    pub fn sample_timeout(&self) -> Duration {
        Duration::from_millis(self.sample_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitorSettings {
    pub focus: FocusConfig,
    pub items: ItemPolicy,
    pub scoring: ScoringWeights,
    pub cadence: SamplingCadence,
}

impl MonitorSettings {
    /// Reads settings from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No settings at {}; using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.items.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            bail!("confidenceThreshold must be within [0, 1], got {threshold}");
        }
        if self.focus.focus_delay_ms == 0 {
            bail!("focusDelayMs must be greater than zero");
        }
        if self.cadence.face_interval_ms == 0 || self.cadence.object_interval_ms == 0 {
            bail!("sampling intervals must be greater than zero");
        }
        if self.cadence.sample_timeout_ms == 0 {
            bail!("sampleTimeoutMs must be greater than zero");
        }
        Ok(())
    }
}
