use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::focus::{FocusState, TimerCommand};
use crate::models::{FaceObservation, ObjectObservation};
use crate::monitor::{FaceProcessor, ObjectProcessor};
use crate::settings::SamplingCadence;

use super::source::ObservationSource;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Face producer loop. Owns the face processor and backs its focus timer with
/// a real deadline.
///
/// Ticks are serialized: the loop awaits each sample before it can observe the
/// next tick, and ticks missed meanwhile are skipped rather than queued.
pub async fn face_loop<S>(
    mut processor: FaceProcessor,
    mut source: S,
    cadence: SamplingCadence,
    focus_delay: Duration,
    state_tx: watch::Sender<FocusState>,
    cancel_token: CancellationToken,
) where
    S: ObservationSource<Observation = FaceObservation>,
{
    let mut ticker = time::interval(cadence.face_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // (generation, deadline) of the armed focus timer
    let mut armed: Option<(u64, Instant)> = None;

    loop {
        let deadline = armed.map(|(_, at)| at).unwrap_or_else(Instant::now);

        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                log_info!("face loop shutting down");
                break;
            }
            _ = time::sleep_until(deadline), if armed.is_some() => {
                if let Some((generation, _)) = armed.take() {
                    processor.fire(generation, Utc::now());
                    state_tx.send_replace(processor.state());
                }
            }
            _ = ticker.tick() => {
                let Some(observation) = sample_with_timeout(&mut source, cadence.sample_timeout(), "face").await else {
                    continue;
                };
                // Rejections are logged by the processor and leave state as is.
                let Ok(outcome) = processor.process(&observation) else {
                    continue;
                };
                match outcome.timer {
                    TimerCommand::Arm(pending) => {
                        log_debug!("focus timer armed (generation {})", pending.generation);
                        armed = Some((pending.generation, Instant::now() + focus_delay));
                    }
                    TimerCommand::Cancel => armed = None,
                    TimerCommand::Unchanged => {}
                }
                state_tx.send_replace(processor.state());
            }
        }
    }

    processor.shutdown();
}

/// Object producer loop. Stateless apart from ordering checks.
pub async fn object_loop<S>(
    mut processor: ObjectProcessor,
    mut source: S,
    cadence: SamplingCadence,
    cancel_token: CancellationToken,
) where
    S: ObservationSource<Observation = ObjectObservation>,
{
    let mut ticker = time::interval(cadence.object_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                log_info!("object loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                let Some(observation) = sample_with_timeout(&mut source, cadence.sample_timeout(), "object").await else {
                    continue;
                };
                // Rejections are logged by the processor; flagged items are
                // already in the log.
                if let Ok(events) = processor.process(&observation) {
                    if !events.is_empty() {
                        log_debug!("{} item event(s) from one frame", events.len());
                    }
                }
            }
        }
    }
}

/// One bounded detector call. Failures and timeouts mean "no new information".
async fn sample_with_timeout<S: ObservationSource>(
    source: &mut S,
    timeout: Duration,
    producer: &str,
) -> Option<S::Observation> {
    match time::timeout(timeout, source.sample()).await {
        Ok(Ok(Some(observation))) => Some(observation),
        Ok(Ok(None)) => {
            log_debug!("{producer} source not ready; skipping tick");
            None
        }
        Ok(Err(err)) => {
            log_error!("{producer} sample failed: {err:?}");
            None
        }
        Err(_) => {
            log_warn!("{producer} sample timeout (> {}ms)", timeout.as_millis());
            None
        }
    }
}
