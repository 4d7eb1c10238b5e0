// SipSense - Hardware & Tracker Configuration
// Target: Raspberry Pi (Linux, /dev/i2c-*) with a GY-521 (MPU6050) on the bottle.

use std::env;
use std::time::Duration;

use anyhow::Context;

use crate::error::TrackerError;

// ---------------------------------------------------------------------------
// I2C Bus
// ---------------------------------------------------------------------------
pub const I2C_ADDR_MPU6050: u8 = 0x68;
pub const I2C_ADDR_MPU6050_ALT: u8 = 0x69; // AD0 pulled high

/// Probe order: (bus number, device address). Bus 1 is the Pi header bus.
pub const I2C_PROBE_CANDIDATES: [(u8, u8); 4] = [
    (1, I2C_ADDR_MPU6050),
    (1, I2C_ADDR_MPU6050_ALT),
    (0, I2C_ADDR_MPU6050),
    (0, I2C_ADDR_MPU6050_ALT),
];
pub const I2C_PROBE_ATTEMPTS: u32 = 5;              // per candidate, while the bus reports busy
pub const I2C_PROBE_RETRY_DELAY_MS: u64 = 2000;
pub const MPU6050_WAKE_DELAY_MS: u64 = 100;

// ---------------------------------------------------------------------------
// MPU6050 Sensor Scale Factors
// ---------------------------------------------------------------------------
pub const ACCEL_SCALE_2G: f32 = 16384.0; // LSB/g at ±2 g

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------
pub const DEFAULT_TICK_HZ: u32 = 20;
pub const CALIBRATION_SAMPLES: usize = 200;
pub const CALIBRATION_INTERVAL_MS: u64 = 20;          // 50 Hz while calibrating
pub const CALIBRATION_MAX_FAILURES: usize = 50;
pub const MAX_CONSECUTIVE_READ_FAILURES: u32 = 40;     // ~2 s at 20 Hz
pub const STATUS_LOG_INTERVAL_MS: u64 = 5000;

// ---------------------------------------------------------------------------
// Drinking detection (degrees / seconds)
// ---------------------------------------------------------------------------
pub const TILT_LOWER_DEG: f32 = 70.0;
pub const TILT_UPPER_DEG: f32 = 180.0;
pub const DRINKING_TIMEOUT_S: f32 = 2.0;
pub const MIN_DRINKING_TIME_S: f32 = 0.3;
pub const REQUIRED_STABLE_READINGS: u32 = 5;
pub const MIN_NOISE_THRESHOLD_DEG: f32 = 5.0;
pub const NOISE_DEG_PER_G: f32 = 100.0;

// ---------------------------------------------------------------------------
// Flow model (ml/s). Needs re-tuning per bottle geometry.
// ---------------------------------------------------------------------------
pub const BASE_FLOW_RATE: f32 = 6.0;
pub const ANGLE_MULTIPLIER: f32 = 0.5;                 // per 10° past TILT_LOWER_DEG
pub const MAX_FLOW_RATE: f32 = 40.0;
pub const MAX_VOLUME_PER_TICK_ML: f32 = 20.0;

// ---------------------------------------------------------------------------
// Shake detection
// ---------------------------------------------------------------------------
pub const SHAKE_WINDOW_SIZE: usize = 5;
pub const SHAKE_THRESHOLD_G: f32 = 1.2;
pub const SHAKE_HOLD_MS: u64 = 3000;

/// Every tunable of the motion pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub tilt_lower_deg: f32,
    pub tilt_upper_deg: f32,
    pub drinking_timeout: Duration,
    pub min_drinking_time: Duration,
    pub required_stable_readings: u32,
    /// Floor for the calibrated noise threshold.
    pub min_noise_threshold_deg: f32,
    /// Converts the calibration Y-axis standard deviation (g) into degrees.
    pub noise_deg_per_g: f32,

    pub base_flow_rate: f32,
    pub angle_multiplier: f32,
    pub max_flow_rate: f32,
    pub max_volume_per_tick_ml: f32,

    pub shake_window_size: usize,
    pub shake_threshold_g: f32,
    pub shake_hold: Duration,

    pub calibration_interval: Duration,
    pub calibration_max_failures: usize,
    pub max_consecutive_read_failures: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tilt_lower_deg: TILT_LOWER_DEG,
            tilt_upper_deg: TILT_UPPER_DEG,
            drinking_timeout: Duration::from_secs_f32(DRINKING_TIMEOUT_S),
            min_drinking_time: Duration::from_secs_f32(MIN_DRINKING_TIME_S),
            required_stable_readings: REQUIRED_STABLE_READINGS,
            min_noise_threshold_deg: MIN_NOISE_THRESHOLD_DEG,
            noise_deg_per_g: NOISE_DEG_PER_G,
            base_flow_rate: BASE_FLOW_RATE,
            angle_multiplier: ANGLE_MULTIPLIER,
            max_flow_rate: MAX_FLOW_RATE,
            max_volume_per_tick_ml: MAX_VOLUME_PER_TICK_ML,
            shake_window_size: SHAKE_WINDOW_SIZE,
            shake_threshold_g: SHAKE_THRESHOLD_G,
            shake_hold: Duration::from_millis(SHAKE_HOLD_MS),
            calibration_interval: Duration::from_millis(CALIBRATION_INTERVAL_MS),
            calibration_max_failures: CALIBRATION_MAX_FAILURES,
            max_consecutive_read_failures: MAX_CONSECUTIVE_READ_FAILURES,
        }
    }
}

impl TrackerConfig {
    /// Reject combinations the state machine cannot work with.
    pub fn validate(&self) -> Result<(), TrackerError> {
        let invalid = |reason: &str| -> Result<(), TrackerError> {
            Err(TrackerError::InvalidConfig(reason.to_string()))
        };

        if !(self.tilt_lower_deg >= 0.0 && self.tilt_lower_deg < self.tilt_upper_deg) {
            return invalid("tilt_lower_deg must be >= 0 and below tilt_upper_deg");
        }
        if self.tilt_upper_deg > 180.0 {
            return invalid("tilt_upper_deg cannot exceed 180");
        }
        if self.shake_window_size < 2 {
            return invalid("shake_window_size must be at least 2");
        }
        if self.base_flow_rate < 0.0 || self.max_flow_rate < 0.0 || self.angle_multiplier < 0.0 {
            return invalid("flow model coefficients must be non-negative");
        }
        if self.max_volume_per_tick_ml < 0.0 {
            return invalid("max_volume_per_tick_ml must be non-negative");
        }
        if self.min_noise_threshold_deg < 0.0 || self.noise_deg_per_g < 0.0 {
            return invalid("noise threshold parameters must be non-negative");
        }
        if self.max_consecutive_read_failures == 0 {
            return invalid("max_consecutive_read_failures must be at least 1");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Host runtime (binary only)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub force_simulation: bool,
    pub tick_hz: u32,
    pub calibration_samples: usize,
    pub simulation_seed: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            force_simulation: false,
            tick_hz: DEFAULT_TICK_HZ,
            calibration_samples: CALIBRATION_SAMPLES,
            simulation_seed: 0x5195,
        }
    }
}

impl RuntimeConfig {
    /// Read `SIPSENSE_*` overrides from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup("SIPSENSE_SIMULATE") {
            cfg.force_simulation = match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                other => anyhow::bail!("SIPSENSE_SIMULATE: unrecognised value {other:?}"),
            };
        }
        if let Some(v) = lookup("SIPSENSE_TICK_HZ") {
            cfg.tick_hz = v.trim().parse().context("SIPSENSE_TICK_HZ")?;
            anyhow::ensure!(
                (1..=200).contains(&cfg.tick_hz),
                "SIPSENSE_TICK_HZ must be within 1..=200"
            );
        }
        if let Some(v) = lookup("SIPSENSE_CALIBRATION_SAMPLES") {
            cfg.calibration_samples = v.trim().parse().context("SIPSENSE_CALIBRATION_SAMPLES")?;
            anyhow::ensure!(cfg.calibration_samples > 0, "SIPSENSE_CALIBRATION_SAMPLES must be > 0");
        }
        if let Some(v) = lookup("SIPSENSE_SEED") {
            cfg.simulation_seed = v.trim().parse().context("SIPSENSE_SEED")?;
        }

        Ok(cfg)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_hz))
    }
}
