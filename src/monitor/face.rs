use chrono::{DateTime, Utc};
use log::warn;

use crate::error::ObservationError;
use crate::event_log::EventLog;
use crate::focus::{FocusDebouncer, FocusSignal, FocusState, PendingFocusTimer, TimerCommand};
use crate::models::{Event, FaceObservation, Session};
use crate::settings::FocusConfig;

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Result of one accepted face observation.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceOutcome {
    pub events: Vec<Event>,
    pub timer: TimerCommand,
}

/// Serialized state-transition path for the face producer.
///
/// Exactly one of these exists per session; it owns the debouncer, so focus
/// state is only ever mutated from whichever task drives this value.
pub struct FaceProcessor {
    session: Session,
    debouncer: FocusDebouncer,
    log: EventLog,
    last_observed_at: Option<DateTime<Utc>>,
}

impl FaceProcessor {
    pub fn new(session: Session, config: FocusConfig, log: EventLog) -> Self {
        Self {
            session,
            debouncer: FocusDebouncer::new(config),
            log,
            last_observed_at: None,
        }
    }

    pub fn state(&self) -> FocusState {
        self.debouncer.state()
    }

    pub fn pending_timer(&self) -> Option<PendingFocusTimer> {
        self.debouncer.pending_timer()
    }

    /// Checks an observation without applying it.
    pub fn check(&self, observation: &FaceObservation) -> Result<(), ObservationError> {
        observation.validate()?;
        match self.last_observed_at {
            Some(previous) if observation.observed_at < previous => {
                Err(ObservationError::OutOfOrder {
                    observed_at: observation.observed_at,
                    previous,
                })
            }
            _ => Ok(()),
        }
    }

    pub fn process(&mut self, observation: &FaceObservation) -> Result<FaceOutcome, ObservationError> {
        if let Err(err) = self.check(observation) {
            warn!(
                "rejected face observation for session {}: {err}",
                self.session.id
            );
            return Err(err);
        }
        self.last_observed_at = Some(observation.observed_at);

        let count = u32::try_from(observation.count).unwrap_or(u32::MAX);
        let update = self.debouncer.observe(count, observation.observed_at);
        let events = update
            .signals
            .into_iter()
            .filter_map(|signal| self.record(signal))
            .collect();

        Ok(FaceOutcome {
            events,
            timer: update.timer,
        })
    }

    /// Expiry of the focus timer armed under `generation`, as seen by a live
    /// worker at `fired_at`; stale generations are dropped.
    pub fn fire(&mut self, generation: u64, fired_at: DateTime<Utc>) -> Option<Event> {
        let signal = self.debouncer.fire(generation, fired_at)?;
        self.record(signal)
    }

    /// Fires the focus timer if it is due by `now` on the observation clock.
    pub fn fire_due(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let signal = self.debouncer.fire_due(now)?;
        self.record(signal)
    }

    pub fn shutdown(&mut self) {
        self.debouncer.shutdown();
    }

    fn record(&self, signal: FocusSignal) -> Option<Event> {
        let event = self.session.event(signal.kind, signal.at);
        if !self.log.append(event.clone()) {
            return None;
        }
        log_info!("{}", event);
        Some(event)
    }
}
