use chrono::{DateTime, Utc};

use crate::models::EventKind;
use crate::settings::FocusConfig;

use super::FocusState;

/// The single-shot `NotFocused` timer currently armed, if any.
///
/// `generation` identifies the arm cycle; a fire carrying any other
/// generation is stale and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingFocusTimer {
    pub generation: u64,
    pub due_at: DateTime<Utc>,
}

/// What the driver must do with its timer handle after an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Unchanged,
    Arm(PendingFocusTimer),
    Cancel,
}

/// A condition that just became stable, stamped with the moment it did.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusSignal {
    pub kind: EventKind,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FocusUpdate {
    pub signals: Vec<FocusSignal>,
    pub timer: TimerCommand,
}

/// Turns per-tick face counts into edge-triggered focus conditions.
///
/// The debouncer keeps no clock of its own. Absence is measured between
/// observation timestamps, and the focus timer is described to the caller
/// through [`TimerCommand`] so that a live worker can back it with a real
/// sleep while a replay backs it with virtual time.
#[derive(Debug, Clone)]
pub struct FocusDebouncer {
    config: FocusConfig,
    state: FocusState,
    generation: u64,
    pending: Option<PendingFocusTimer>,
    absence_started_at: Option<DateTime<Utc>>,
}

impl FocusDebouncer {
    pub fn new(config: FocusConfig) -> Self {
        Self {
            config,
            state: FocusState::new(),
            generation: 0,
            pending: None,
            absence_started_at: None,
        }
    }

    pub fn state(&self) -> FocusState {
        self.state
    }

    pub fn pending_timer(&self) -> Option<PendingFocusTimer> {
        self.pending
    }

    pub fn observe(&mut self, count: u32, at: DateTime<Utc>) -> FocusUpdate {
        let mut signals = Vec::new();

        // Focus timer: restarted on every single-face tick, so it only expires
        // once single-face ticks stop arriving for a full delay.
        let timer = if count == 1 {
            TimerCommand::Arm(self.arm(at))
        } else {
            self.state.lost = false;
            if self.cancel_pending() {
                TimerCommand::Cancel
            } else {
                TimerCommand::Unchanged
            }
        };

        if count == 0 {
            match self.absence_started_at {
                None => self.absence_started_at = Some(at),
                Some(started) => {
                    if !self.state.absent && at - started > self.config.absence_threshold() {
                        self.state.absent = true;
                        signals.push(FocusSignal {
                            kind: EventKind::Absent,
                            at,
                        });
                    }
                }
            }
        } else {
            self.absence_started_at = None;
            self.state.absent = false;
        }

        if count > 1 {
            if !self.state.multiple {
                self.state.multiple = true;
                signals.push(FocusSignal {
                    kind: EventKind::MultipleSubjects,
                    at,
                });
            }
        } else {
            self.state.multiple = false;
        }

        FocusUpdate { signals, timer }
    }

    /// Delivers the expiry of the timer armed under `generation`, observed at
    /// `fired_at`. The signal is never stamped before the deadline.
    pub fn fire(&mut self, generation: u64, fired_at: DateTime<Utc>) -> Option<FocusSignal> {
        let pending = match self.pending {
            Some(pending) if pending.generation == generation => pending,
            _ => return None,
        };
        self.pending = None;

        if self.state.lost {
            return None;
        }
        self.state.lost = true;
        Some(FocusSignal {
            kind: EventKind::NotFocused,
            at: fired_at.max(pending.due_at),
        })
    }

    /// Fires the pending timer if its deadline is at or before `now`, stamped
    /// at the deadline itself.
    pub fn fire_due(&mut self, now: DateTime<Utc>) -> Option<FocusSignal> {
        match self.pending {
            Some(pending) if pending.due_at <= now => self.fire(pending.generation, pending.due_at),
            _ => None,
        }
    }

    /// Drops any pending timer. Used on session teardown.
    pub fn shutdown(&mut self) {
        self.cancel_pending();
    }

    fn arm(&mut self, at: DateTime<Utc>) -> PendingFocusTimer {
        self.generation = self.generation.wrapping_add(1);
        let pending = PendingFocusTimer {
            generation: self.generation,
            due_at: at + self.config.focus_delay(),
        };
        self.pending = Some(pending);
        pending
    }

    fn cancel_pending(&mut self) -> bool {
        if self.pending.take().is_some() {
            self.generation = self.generation.wrapping_add(1);
            true
        } else {
            false
        }
    }
}
