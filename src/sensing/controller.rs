use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::event_log::EventLog;
use crate::focus::FocusState;
use crate::models::{FaceObservation, ObjectObservation, Session};
use crate::monitor::{FaceProcessor, ObjectProcessor};
use crate::settings::MonitorSettings;

use super::loop_worker::{face_loop, object_loop};
use super::source::ObservationSource;

/// Owns the two producer tasks of a live session.
pub struct SensingController {
    face_handle: Option<JoinHandle<()>>,
    object_handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl Default for SensingController {
    fn default() -> Self {
        Self::new()
    }
}

impl SensingController {
    pub fn new() -> Self {
        Self {
            face_handle: None,
            object_handle: None,
            cancel_token: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel_token.is_some()
    }

    /// Spawns both loops; returns the feed of focus-state snapshots.
    pub fn start_sensing<F, O>(
        &mut self,
        session: &Session,
        log: &EventLog,
        settings: &MonitorSettings,
        faces: F,
        objects: O,
    ) -> Result<watch::Receiver<FocusState>>
    where
        F: ObservationSource<Observation = FaceObservation>,
        O: ObservationSource<Observation = ObjectObservation>,
    {
        if self.is_active() {
            bail!("sensing already active");
        }

        let cancel_token = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(FocusState::new());

        let face_processor =
            FaceProcessor::new(session.clone(), settings.focus.clone(), log.clone());
        let object_processor = ObjectProcessor::new(session.clone(), &settings.items, log.clone());
        let focus_delay = std::time::Duration::from_millis(settings.focus.focus_delay_ms);

        info!(
            "starting sensing for session {} (faces every {}ms, objects every {}ms)",
            session.id, settings.cadence.face_interval_ms, settings.cadence.object_interval_ms
        );

        self.face_handle = Some(tokio::spawn(face_loop(
            face_processor,
            faces,
            settings.cadence.clone(),
            focus_delay,
            state_tx,
            cancel_token.clone(),
        )));
        self.object_handle = Some(tokio::spawn(object_loop(
            object_processor,
            objects,
            settings.cadence.clone(),
            cancel_token.clone(),
        )));
        self.cancel_token = Some(cancel_token);

        Ok(state_rx)
    }

    /// Cancels both loops and waits for them, so no tick is still in flight
    /// when this returns.
    pub async fn stop_sensing(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        let faces = match self.face_handle.take() {
            Some(handle) => handle.await.context("face loop task failed to join"),
            None => Ok(()),
        };
        let objects = match self.object_handle.take() {
            Some(handle) => handle.await.context("object loop task failed to join"),
            None => Ok(()),
        };
        faces.and(objects)
    }
}
