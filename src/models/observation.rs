use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ObservationError;

/// Number of faces the perception model found in one sampled frame.
///
/// `count` is kept signed because it arrives from an untrusted producer;
/// negative values are rejected by [`FaceObservation::validate`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FaceObservation {
    pub count: i64,
    pub observed_at: DateTime<Utc>,
}

impl FaceObservation {
    pub fn new(count: i64, observed_at: DateTime<Utc>) -> Self {
        Self { count, observed_at }
    }

    pub fn validate(&self) -> Result<(), ObservationError> {
        if self.count < 0 {
            return Err(ObservationError::NegativeFaceCount(self.count));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub label: String,
    pub confidence: f64,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Labeled detections from one sampled frame, in detector order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectObservation {
    #[serde(default)]
    pub detections: Vec<Detection>,
    pub observed_at: DateTime<Utc>,
}

impl ObjectObservation {
    pub fn new(detections: Vec<Detection>, observed_at: DateTime<Utc>) -> Self {
        Self {
            detections,
            observed_at,
        }
    }

    pub fn validate(&self) -> Result<(), ObservationError> {
        for detection in &self.detections {
            // NaN fails the range check too
            if !(0.0..=1.0).contains(&detection.confidence) {
                return Err(ObservationError::ConfidenceOutOfRange {
                    label: detection.label.clone(),
                    confidence: detection.confidence,
                });
            }
        }
        Ok(())
    }
}

/// One line of a recorded observation stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ObservationRecord {
    Faces(FaceObservation),
    Objects(ObjectObservation),
}

impl ObservationRecord {
    pub fn observed_at(&self) -> DateTime<Utc> {
        match self {
            ObservationRecord::Faces(obs) => obs.observed_at,
            ObservationRecord::Objects(obs) => obs.observed_at,
        }
    }
}
