use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{Detection, FaceObservation, ObjectObservation};

/// A periodic perception producer.
///
/// `Ok(None)` means nothing was available this tick (camera warming up,
/// frame not ready); the tick is skipped without touching any state.
pub trait ObservationSource: Send + 'static {
    type Observation: Send;

    fn sample(&mut self) -> impl Future<Output = Result<Option<Self::Observation>>> + Send;
}

#[derive(Debug, Clone)]
pub enum ScriptStep<T> {
    Observe(T),
    NotReady,
    Fail(String),
    /// Takes `delay` to answer, then yields the observation.
    Slow(Duration, T),
}

/// Plays back a fixed list of steps, then reports "not ready" forever.
#[derive(Debug, Clone)]
pub struct ScriptedSource<T> {
    steps: VecDeque<ScriptStep<T>>,
}

impl<T> ScriptedSource<T> {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep<T>>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
        }
    }

    pub fn observations(observations: impl IntoIterator<Item = T>) -> Self {
        Self::new(observations.into_iter().map(ScriptStep::Observe))
    }

    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl<T: Send + 'static> ObservationSource for ScriptedSource<T> {
    type Observation = T;

    async fn sample(&mut self) -> Result<Option<T>> {
        match self.steps.pop_front() {
            Some(ScriptStep::Observe(observation)) => Ok(Some(observation)),
            Some(ScriptStep::NotReady) | None => Ok(None),
            Some(ScriptStep::Fail(reason)) => Err(anyhow!(reason)),
            Some(ScriptStep::Slow(delay, observation)) => {
                tokio::time::sleep(delay).await;
                Ok(Some(observation))
            }
        }
    }
}

/// Random face counts that behave like a candidate: long single-face stretches
/// broken by the occasional empty chair or second person.
pub struct SimulatedFaces {
    rng: StdRng,
    current: i64,
}

const FACE_STICKINESS: f64 = 0.85;

impl SimulatedFaces {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            current: 1,
        }
    }

    fn next_count(&mut self) -> i64 {
        if self.rng.gen_bool(FACE_STICKINESS) {
            return self.current;
        }
        let roll: f64 = self.rng.gen();
        self.current = if roll < 0.7 {
            1
        } else if roll < 0.9 {
            0
        } else {
            2
        };
        self.current
    }
}

impl ObservationSource for SimulatedFaces {
    type Observation = FaceObservation;

    async fn sample(&mut self) -> Result<Option<FaceObservation>> {
        let count = self.next_count();
        Ok(Some(FaceObservation::new(count, Utc::now())))
    }
}

/// Random detections: a person most of the time, now and then a phone or book.
pub struct SimulatedObjects {
    rng: StdRng,
}

impl SimulatedObjects {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn next_detections(&mut self) -> Vec<Detection> {
        let mut detections = Vec::new();
        if self.rng.gen_bool(0.9) {
            detections.push(Detection::new("person", self.rng.gen_range(0.8..1.0)));
        }
        if self.rng.gen_bool(0.08) {
            detections.push(Detection::new("cell phone", self.rng.gen_range(0.4..0.95)));
        }
        if self.rng.gen_bool(0.04) {
            detections.push(Detection::new("book", self.rng.gen_range(0.5..0.9)));
        }
        detections
    }
}

impl ObservationSource for SimulatedObjects {
    type Observation = ObjectObservation;

    async fn sample(&mut self) -> Result<Option<ObjectObservation>> {
        let detections = self.next_detections();
        Ok(Some(ObjectObservation::new(detections, Utc::now())))
    }
}
