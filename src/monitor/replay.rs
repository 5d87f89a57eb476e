use std::io::BufRead;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::warn;

use crate::error::ObservationError;
use crate::event_log::EventLog;
use crate::models::{Event, ObservationRecord, Session};
use crate::report::{build_report, Report};
use crate::settings::{MonitorSettings, ScoringWeights};

use super::{FaceProcessor, ObjectProcessor};

/// Drives one session from a recorded observation stream on virtual time.
///
/// The focus timer is resolved against observation timestamps: before each
/// record is applied, a timer that came due at or before the record's time
/// fires at its own deadline. Reports are taken at the replay clock, i.e. the
/// latest time seen.
pub struct SessionReplay {
    session: Session,
    log: EventLog,
    faces: FaceProcessor,
    objects: ObjectProcessor,
    weights: ScoringWeights,
    clock: DateTime<Utc>,
}

impl SessionReplay {
    pub fn new(session: Session, settings: &MonitorSettings) -> Self {
        let log = EventLog::new();
        Self {
            faces: FaceProcessor::new(session.clone(), settings.focus.clone(), log.clone()),
            objects: ObjectProcessor::new(session.clone(), &settings.items, log.clone()),
            clock: session.started_at,
            weights: settings.scoring,
            session,
            log,
        }
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn clock(&self) -> DateTime<Utc> {
        self.clock
    }

    /// Applies one record. A rejected record changes nothing, not even the clock.
    pub fn ingest(&mut self, record: &ObservationRecord) -> Result<Vec<Event>, ObservationError> {
        match record {
            ObservationRecord::Faces(obs) => self.faces.check(obs)?,
            ObservationRecord::Objects(obs) => self.objects.check(obs)?,
        }

        let mut events = self.advance_to(record.observed_at());
        match record {
            ObservationRecord::Faces(obs) => events.extend(self.faces.process(obs)?.events),
            ObservationRecord::Objects(obs) => events.extend(self.objects.process(obs)?),
        }
        Ok(events)
    }

    /// Moves the clock forward, firing a focus timer that is due by `at`.
    pub fn advance_to(&mut self, at: DateTime<Utc>) -> Vec<Event> {
        if at > self.clock {
            self.clock = at;
        }
        self.faces.fire_due(at).into_iter().collect()
    }

    /// Applies every record, skipping rejected ones.
    pub fn run<'a>(&mut self, records: impl IntoIterator<Item = &'a ObservationRecord>) -> usize {
        let mut rejected = 0;
        for record in records {
            if self.ingest(record).is_err() {
                rejected += 1;
            }
        }
        rejected
    }

    pub fn report(&self) -> Report {
        build_report(&self.session, &self.log.snapshot(), &self.weights, self.clock)
    }

    /// Ends the session at `at`: fires what is due, drops pending timers and
    /// closes the log.
    pub fn finish(mut self, at: DateTime<Utc>) -> (Report, Vec<Event>) {
        self.advance_to(at);
        self.faces.shutdown();
        self.log.close();
        (self.report(), self.log.snapshot())
    }
}

/// Reads a JSON-lines recording. Blank lines are ignored; lines that do not
/// parse are skipped with a warning. Records come back ordered by time, with
/// ties kept in file order.
pub fn read_records<R: BufRead>(reader: R) -> Result<Vec<ObservationRecord>> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", index + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<ObservationRecord>(trimmed) {
            Ok(record) => records.push(record),
            Err(err) => warn!("skipping malformed record on line {}: {err}", index + 1),
        }
    }
    records.sort_by_key(|record| record.observed_at());
    Ok(records)
}
