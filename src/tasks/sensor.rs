// SipSense - Sensor Task
//
// Owns the motion tracker and ticks it at the display rate. Each status
// record is reduced to edge events (drinking started, sip completed, shake
// started/ended) and pushed into the pet channel. Operator commands are
// applied between ticks.

use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;

use crate::config::*;
use crate::drivers::AccelSource;
use crate::events::{PetEvent, StatusRecord, TrackerCommand};
use crate::motion::MotionTracker;

/// Remembers the previous tick so only transitions become events.
#[derive(Debug, Default, Clone, Copy)]
pub struct EdgeState {
    drinking: bool,
    shaking: bool,
}

impl EdgeState {
    pub fn events(&mut self, status: &StatusRecord) -> Vec<PetEvent> {
        let mut events = Vec::new();

        if status.drinking && !self.drinking {
            events.push(PetEvent::DrinkingStarted);
        }
        if let Some(sip) = status.completed_sip {
            events.push(PetEvent::SipCompleted(sip));
        } else if status.session_discarded {
            events.push(PetEvent::DrinkingStopped);
        }

        if status.shaking && !self.shaking {
            events.push(PetEvent::ShakeStarted);
        } else if !status.shaking && self.shaking {
            events.push(PetEvent::ShakeEnded);
        }

        self.drinking = status.drinking;
        self.shaking = status.shaking;
        events
    }
}

/// Why the loop stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Shutdown,
    PetChannelClosed,
}

pub fn sensor_task<S: AccelSource>(
    mut tracker: MotionTracker<S>,
    tick_interval: Duration,
    calibration_samples: usize,
    pet_tx: Sender<PetEvent>,
    cmd_rx: Receiver<TrackerCommand>,
) -> anyhow::Result<Exit> {
    log::info!("Sensor task started ({:?} tick)", tick_interval);

    let mut edges = EdgeState::default();
    let mut commands_open = true;
    let status_every = Duration::from_millis(STATUS_LOG_INTERVAL_MS);
    let mut last_status_log = Instant::now();

    loop {
        let tick_start = Instant::now();

        // ---- Operator commands ----
        while commands_open {
            match cmd_rx.try_recv() {
                Ok(TrackerCommand::Shutdown) => {
                    log::info!("Shutdown requested, leaving sensor task");
                    return Ok(Exit::Shutdown);
                }
                Ok(cmd) => {
                    let reply = apply_command(&mut tracker, cmd, calibration_samples);
                    if let Some(event) = reply {
                        if pet_tx.send(event).is_err() {
                            return Ok(Exit::PetChannelClosed);
                        }
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::debug!("Command channel closed, continuing without console");
                    commands_open = false;
                }
            }
        }

        // ---- One tracker tick ----
        let events = match tracker.update().context("motion tracker stopped")? {
            Some(status) => {
                if last_status_log.elapsed() >= status_every {
                    log_status(&status);
                    last_status_log = Instant::now();
                }
                edges.events(&status)
            }
            None => vec![PetEvent::SensorHiccup],
        };

        for event in events {
            if pet_tx.send(event).is_err() {
                log::warn!("Pet channel closed, exiting sensor task");
                return Ok(Exit::PetChannelClosed);
            }
        }

        // Sleep for the remainder of the tick to hold the target rate.
        let elapsed = tick_start.elapsed();
        if elapsed < tick_interval {
            thread::sleep(tick_interval - elapsed);
        }
    }
}

fn apply_command<S: AccelSource>(
    tracker: &mut MotionTracker<S>,
    cmd: TrackerCommand,
    calibration_samples: usize,
) -> Option<PetEvent> {
    match cmd {
        TrackerCommand::Recalibrate => match tracker.calibrate(calibration_samples) {
            Ok(cal) => Some(PetEvent::Recalibrated {
                noise_threshold_deg: cal.noise_threshold_deg,
            }),
            Err(e) => {
                log::error!("Recalibration failed, keeping previous baseline: {}", e);
                None
            }
        },
        TrackerCommand::ResetLifetimeTotal => {
            tracker.reset_lifetime_total();
            Some(totals(tracker))
        }
        TrackerCommand::ReportStatus => Some(totals(tracker)),
        TrackerCommand::Shutdown => None,
    }
}

fn totals<S: AccelSource>(tracker: &MotionTracker<S>) -> PetEvent {
    PetEvent::Totals {
        lifetime_ml: tracker.committed_ml(),
        sips: tracker.sip_count(),
    }
}

fn log_status(status: &StatusRecord) {
    log::debug!(
        "Tilt X {:.1}° Y {:.1}° total {:.1}° | {} | session {:.1} ml | total {:.1} ml",
        status.tilt_x_deg,
        status.tilt_y_deg,
        status.total_tilt_deg,
        if status.drinking { "DRINKING" } else { "IDLE" },
        status.session_volume_ml,
        status.lifetime_total_ml
    );
}
