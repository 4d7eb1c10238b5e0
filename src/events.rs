// SipSense - Sensor Records & Events

use std::time::Duration;

// ---------------------------------------------------------------------------
// Accelerometer sample (g-units)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccelSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl AccelSample {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn dot(&self, other: &AccelSample) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }
}

// ---------------------------------------------------------------------------
// Completed drinking session
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sip {
    pub duration: Duration,
    pub volume_ml: f32,
}

// ---------------------------------------------------------------------------
// Per-tick tracker output
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatusRecord {
    /// A drinking session is open after this tick.
    pub drinking: bool,
    /// Volume added this tick, 0 unless actively accumulating.
    pub volume_this_tick_ml: f32,
    /// Set on the tick a session that met the minimum duration was finalized.
    pub completed_sip: Option<Sip>,
    /// Set on the tick a session closed too short to count.
    pub session_discarded: bool,
    pub shaking: bool,
    pub tilt_x_deg: f32,
    pub tilt_y_deg: f32,
    /// Angle from the calibrated rest vector, 0..=180.
    pub total_tilt_deg: f32,
    pub session_volume_ml: f32,
    pub lifetime_total_ml: f32,
}

impl StatusRecord {
    pub fn session_just_ended(&self) -> bool {
        self.completed_sip.is_some()
    }

    pub fn session_final_volume_ml(&self) -> Option<f32> {
        self.completed_sip.map(|sip| sip.volume_ml)
    }
}

// ---------------------------------------------------------------------------
// Pet events, sent from the sensor task to the pet task via channel
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PetEvent {
    /// Bottle entered pouring position.
    DrinkingStarted,
    /// A session finished and counted as a sip.
    SipCompleted(Sip),
    /// A session ended without qualifying as a sip.
    DrinkingStopped,
    /// Shake gesture began.
    ShakeStarted,
    /// Shake hold timer ran out.
    ShakeEnded,
    /// On-demand totals of finished sips; an open session is not included.
    Totals { lifetime_ml: f32, sips: u32 },
    /// No sample this tick.
    SensorHiccup,
    /// Calibration replaced.
    Recalibrated { noise_threshold_deg: f32 },
}

// ---------------------------------------------------------------------------
// Operator commands, sent from the console task to the sensor task
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerCommand {
    Recalibrate,
    ResetLifetimeTotal,
    ReportStatus,
    Shutdown,
}

impl TrackerCommand {
    /// Parse a console line.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "c" | "calibrate" | "recalibrate" => Some(Self::Recalibrate),
            "r" | "reset" => Some(Self::ResetLifetimeTotal),
            "s" | "status" => Some(Self::ReportStatus),
            "q" | "quit" | "exit" => Some(Self::Shutdown),
            _ => None,
        }
    }
}
