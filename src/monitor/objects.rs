use chrono::{DateTime, Utc};
use log::warn;

use crate::error::ObservationError;
use crate::event_log::EventLog;
use crate::flagger::ItemFlagger;
use crate::models::{Event, ObjectObservation, Session};
use crate::settings::ItemPolicy;

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Serialized state-transition path for the object producer.
pub struct ObjectProcessor {
    session: Session,
    flagger: ItemFlagger,
    log: EventLog,
    last_observed_at: Option<DateTime<Utc>>,
}

impl ObjectProcessor {
    pub fn new(session: Session, policy: &ItemPolicy, log: EventLog) -> Self {
        Self {
            session,
            flagger: ItemFlagger::new(policy),
            log,
            last_observed_at: None,
        }
    }

    pub fn check(&self, observation: &ObjectObservation) -> Result<(), ObservationError> {
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

    pub fn process(&mut self, observation: &ObjectObservation) -> Result<Vec<Event>, ObservationError> {
        if let Err(err) = self.check(observation) {
            warn!(
                "rejected object observation for session {}: {err}",
                self.session.id
            );
            return Err(err);
        }
        self.last_observed_at = Some(observation.observed_at);

        let mut events = Vec::new();
        for kind in self.flagger.flag(observation) {
            let event = self.session.event(kind, observation.observed_at);
            if !self.log.append(event.clone()) {
                break;
            }
            log_info!("{}", event);
            events.push(event);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Detection, EventKind};
    use chrono::{Duration, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn processor() -> (ObjectProcessor, EventLog) {
        let log = EventLog::new();
        let session = Session::with_id("session001", "cand-1", "Jane Doe", t(0));
        (
            ObjectProcessor::new(session, &ItemPolicy::default(), log.clone()),
            log,
        )
    }

    #[test]
    fn each_tick_with_a_phone_is_recorded() {
        let (mut processor, log) = processor();
        for tick in 0..3 {
            let obs = ObjectObservation::new(
                vec![Detection::new("person", 0.98), Detection::new("cell phone", 0.77)],
                t(tick * 2),
            );
            assert_eq!(processor.process(&obs).unwrap().len(), 1);
        }

        let events = log.snapshot();
        assert_eq!(events.len(), 3);
        assert!(events
            .iter()
            .all(|e| e.kind == EventKind::ProhibitedItem("cell phone".into())));
        assert_eq!(events[2].occurred_at, t(4));
    }

    #[test]
    fn one_bad_confidence_rejects_the_whole_observation() {
        let (mut processor, log) = processor();
        let obs = ObjectObservation::new(
            vec![Detection::new("book", 0.9), Detection::new("laptop", -0.1)],
            t(0),
        );

        assert!(processor.process(&obs).is_err());
        assert!(log.is_empty());
    }

    #[test]
    fn out_of_order_tick_is_rejected() {
        let (mut processor, log) = processor();
        let book = |at| ObjectObservation::new(vec![Detection::new("book", 0.9)], at);
        processor.process(&book(t(4))).unwrap();

        assert!(matches!(
            processor.process(&book(t(2))),
            Err(ObservationError::OutOfOrder { .. })
        ));
        assert_eq!(log.len(), 1);
    }
}
