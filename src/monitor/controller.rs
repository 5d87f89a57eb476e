use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::Utc;
use log::info;
use tokio::sync::{broadcast, watch, Mutex};

use crate::event_log::EventLog;
use crate::focus::FocusState;
use crate::models::{Event, FaceObservation, ObjectObservation, Session};
use crate::report::{build_report, Report};
use crate::sensing::{ObservationSource, SensingController};
use crate::settings::MonitorSettings;

struct ActiveSession {
    session: Session,
    log: EventLog,
    sensing: SensingController,
    focus_rx: watch::Receiver<FocusState>,
}

/// Handle to the live monitor. Clones share the same session slot; at most
/// one session runs at a time.
#[derive(Clone)]
pub struct MonitorController {
    settings: Arc<MonitorSettings>,
    active: Arc<Mutex<Option<ActiveSession>>>,
}

impl MonitorController {
    pub fn new(settings: MonitorSettings) -> Self {
        Self {
            settings: Arc::new(settings),
            active: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn is_active(&self) -> bool {
        self.active.lock().await.is_some()
    }

    pub async fn start_session<F, O>(
        &self,
        subject_id: &str,
        subject_label: &str,
        faces: F,
        objects: O,
    ) -> Result<Session>
    where
        F: ObservationSource<Observation = FaceObservation>,
        O: ObservationSource<Observation = ObjectObservation>,
    {
        let mut guard = self.active.lock().await;
        if guard.is_some() {
            return Err(anyhow!("session already active"));
        }

        let session = Session::new(subject_id, subject_label, Utc::now());
        let log = EventLog::new();
        let mut sensing = SensingController::new();
        let focus_rx = sensing.start_sensing(&session, &log, &self.settings, faces, objects)?;

        info!(
            "session {} started for {} ({})",
            session.id, session.subject_label, session.subject_id
        );

        *guard = Some(ActiveSession {
            session: session.clone(),
            log,
            sensing,
            focus_rx,
        });
        Ok(session)
    }

    /// Latest focus flags, for status displays.
    pub async fn focus_state(&self) -> Result<FocusState> {
        let guard = self.active.lock().await;
        let active = guard.as_ref().ok_or_else(|| anyhow!("no active session"))?;
        let state = *active.focus_rx.borrow();
        Ok(state)
    }

    pub async fn events(&self) -> Result<Vec<Event>> {
        let guard = self.active.lock().await;
        let active = guard.as_ref().ok_or_else(|| anyhow!("no active session"))?;
        Ok(active.log.snapshot())
    }

    /// The last `n` events, oldest first.
    pub async fn recent_events(&self, n: usize) -> Result<Vec<Event>> {
        let guard = self.active.lock().await;
        let active = guard.as_ref().ok_or_else(|| anyhow!("no active session"))?;
        Ok(active.log.recent(n))
    }

    pub async fn subscribe(&self) -> Result<broadcast::Receiver<Event>> {
        let guard = self.active.lock().await;
        let active = guard.as_ref().ok_or_else(|| anyhow!("no active session"))?;
        Ok(active.log.subscribe())
    }

    /// Report over what has been recorded so far; the session keeps running.
    pub async fn report(&self) -> Result<Report> {
        let guard = self.active.lock().await;
        let active = guard.as_ref().ok_or_else(|| anyhow!("no active session"))?;
        Ok(build_report(
            &active.session,
            &active.log.snapshot(),
            &self.settings.scoring,
            Utc::now(),
        ))
    }

    /// Stops both producers, drops pending timers, closes the log and returns
    /// the final report. The session is discarded afterwards.
    pub async fn end_session(&self) -> Result<Report> {
        let mut active = self
            .active
            .lock()
            .await
            .take()
            .ok_or_else(|| anyhow!("no active session to end"))?;

        let stopped = active.sensing.stop_sensing().await;
        active.log.close();

        let report = build_report(
            &active.session,
            &active.log.snapshot(),
            &self.settings.scoring,
            Utc::now(),
        );
        info!(
            "session {} ended: {} events, score {}",
            active.session.id,
            active.log.len(),
            report.final_score
        );

        stopped?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Detection, EventKind};
    use crate::sensing::{ScriptStep, ScriptedSource};
    use chrono::{DateTime, Duration as ChronoDuration};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn faces_every(interval_ms: i64, counts: &[i64]) -> ScriptedSource<FaceObservation> {
        let base = Utc::now();
        ScriptedSource::observations(
            counts
                .iter()
                .enumerate()
                .map(|(i, &count)| {
                    FaceObservation::new(count, base + ChronoDuration::milliseconds(i as i64 * interval_ms))
                }),
        )
    }

    fn no_objects() -> ScriptedSource<ObjectObservation> {
        ScriptedSource::new(Vec::new())
    }

    fn kinds(events: &[Event]) -> Vec<EventKind> {
        events.iter().map(|e| e.kind.clone()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn focus_event_waits_for_single_face_ticks_to_stop() {
        let controller = MonitorController::new(MonitorSettings::default());
        // Twelve one-second ticks of a single face, then the detector goes quiet.
        controller
            .start_session("cand-1", "Jane Doe", faces_every(1_000, &[1; 12]), no_objects())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(11_500)).await;
        assert!(!controller.focus_state().await.unwrap().lost);
        assert!(controller.events().await.unwrap().is_empty());

        // Last tick at 11s, so the timer expires at 16s.
        tokio::time::sleep(Duration::from_millis(4_000)).await;
        assert!(!controller.focus_state().await.unwrap().lost);
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert!(controller.focus_state().await.unwrap().lost);

        let report = controller.end_session().await.unwrap();
        assert_eq!(report.event_counts.not_focused, 1);
        assert_eq!(report.final_score, 98);
    }

    #[tokio::test(start_paused = true)]
    async fn recent_events_keeps_the_tail_in_order() {
        let controller = MonitorController::new(MonitorSettings::default());
        let base = Utc::now();
        let objects = ScriptedSource::observations((0..5).map(|i| {
            ObjectObservation::new(
                vec![Detection::new("book", 0.9)],
                base + ChronoDuration::seconds(i * 2),
            )
        }));
        controller
            .start_session("cand-1", "Jane Doe", no_faces(), objects)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(9_500)).await;
        let all = controller.events().await.unwrap();
        let recent = controller.recent_events(3).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(recent, all[2..].to_vec());

        controller.end_session().await.unwrap();
        assert!(controller.recent_events(3).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn streak_broken_at_4_9_seconds_emits_nothing() {
        let mut settings = MonitorSettings::default();
        settings.cadence.face_interval_ms = 100;
        let controller = MonitorController::new(settings);

        let mut counts = vec![1; 49];
        counts.push(0);
        controller
            .start_session("cand-1", "Jane Doe", faces_every(100, &counts), no_objects())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(8)).await;
        let events = controller.events().await.unwrap();
        assert!(events.is_empty(), "unexpected events {events:?}");
        assert!(!controller.focus_state().await.unwrap().lost);
        controller.end_session().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn both_producers_feed_one_ordered_log() {
        let controller = MonitorController::new(MonitorSettings::default());
        let base = Utc::now();
        let at = |ms: i64| -> DateTime<Utc> { base + ChronoDuration::milliseconds(ms) };

        let faces = ScriptedSource::observations([
            FaceObservation::new(1, at(0)),
            FaceObservation::new(2, at(1_000)),
            FaceObservation::new(2, at(2_000)),
            FaceObservation::new(1, at(3_000)),
        ]);
        let objects = ScriptedSource::observations([
            ObjectObservation::new(vec![Detection::new("cell phone", 0.9)], at(0)),
            ObjectObservation::new(vec![Detection::new("person", 0.9)], at(2_000)),
            ObjectObservation::new(
                vec![Detection::new("cell phone", 0.8), Detection::new("book", 0.65)],
                at(4_000),
            ),
        ]);

        controller
            .start_session("cand-1", "Jane Doe", faces, objects)
            .await
            .unwrap();
        let mut rx = controller.subscribe().await.unwrap();

        tokio::time::sleep(Duration::from_millis(5_500)).await;
        let report = controller.end_session().await.unwrap();

        assert_eq!(report.event_counts.multiple_subjects, 1);
        assert_eq!(report.event_counts.prohibited_item, 3);
        assert_eq!(report.final_score, 100 - 5 - 15);

        // The subscription joined after the first tick; whatever it saw must be
        // a suffix of the log in the same order.
        let mut streamed = Vec::new();
        while let Ok(event) = rx.try_recv() {
            streamed.push(event);
        }
        assert!(kinds(&streamed).contains(&EventKind::ProhibitedItem("book".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_sources_never_imply_absence() {
        let controller = MonitorController::new(MonitorSettings::default());
        let faces: ScriptedSource<FaceObservation> =
            ScriptedSource::new((0..30).map(|_| ScriptStep::Fail("detector crashed".into())));
        let objects: ScriptedSource<ObjectObservation> =
            ScriptedSource::new((0..15).map(|_| ScriptStep::NotReady));

        controller
            .start_session("cand-1", "Jane Doe", faces, objects)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(controller.focus_state().await.unwrap(), FocusState::new());
        let report = controller.end_session().await.unwrap();
        assert_eq!(report.final_score, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_detector_ticks_do_not_overlap() {
        struct SlowDetector {
            in_flight: Arc<AtomicUsize>,
            max_in_flight: Arc<AtomicUsize>,
            calls: Arc<AtomicUsize>,
        }

        impl ObservationSource for SlowDetector {
            type Observation = FaceObservation;

            async fn sample(&mut self) -> Result<Option<FaceObservation>> {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(now, Ordering::SeqCst);
                self.calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2_500)).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(Some(FaceObservation::new(1, Utc::now())))
            }
        }

        let max_in_flight = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let detector = SlowDetector {
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: max_in_flight.clone(),
            calls: calls.clone(),
        };

        let controller = MonitorController::new(MonitorSettings::default());
        controller
            .start_session("cand-1", "Jane Doe", detector, no_objects())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        controller.end_session().await.unwrap();

        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
        // One call per ~3s window instead of one per second.
        assert!(calls.load(Ordering::SeqCst) <= 5);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_detector_is_abandoned_after_timeout() {
        let mut settings = MonitorSettings::default();
        settings.cadence.sample_timeout_ms = 500;
        let controller = MonitorController::new(settings);
        let base = Utc::now();

        let faces = ScriptedSource::new([
            ScriptStep::Slow(Duration::from_secs(60), FaceObservation::new(3, base)),
            ScriptStep::Observe(FaceObservation::new(2, base + ChronoDuration::seconds(1))),
        ]);
        controller
            .start_session("cand-1", "Jane Doe", faces, no_objects())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;

        let report = controller.end_session().await.unwrap();
        assert_eq!(report.event_counts.multiple_subjects, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn one_session_at_a_time_and_nothing_after_teardown() {
        let controller = MonitorController::new(MonitorSettings::default());
        controller
            .start_session("cand-1", "Jane Doe", faces_every(1_000, &[1, 1]), no_objects())
            .await
            .unwrap();

        assert!(controller
            .start_session("cand-2", "John Roe", no_faces(), no_objects())
            .await
            .is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!controller.focus_state().await.unwrap().lost);

        // Mid-session report is allowed and leaves the session running.
        let mid = controller.report().await.unwrap();
        assert_eq!(mid.final_score, 100);
        assert!(controller.is_active().await);

        // Ending before the armed focus timer expires discards it.
        let report = controller.end_session().await.unwrap();
        assert_eq!(report.event_counts.not_focused, 0);
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(!controller.is_active().await);
        assert!(controller.report().await.is_err());
        assert!(controller.end_session().await.is_err());
    }

    fn no_faces() -> ScriptedSource<FaceObservation> {
        ScriptedSource::new(Vec::new())
    }
}
