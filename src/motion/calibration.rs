//! Rest-position baseline.
//!
//! The bottle is held upright and still while a burst of samples is taken.
//! Their mean becomes the rest vector that all tilt is measured against, and
//! their Y-axis spread sets how much tilt change counts as real movement.

use std::thread;
use std::time::Duration;

use crate::drivers::AccelSource;
use crate::error::CalibrationError;
use crate::events::AccelSample;

/// Below this the mean vector is treated as "no gravity seen".
const MIN_REST_MAGNITUDE_G: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Mean gravity vector at rest (g).
    pub rest_vector: AccelSample,
    /// Per-axis population standard deviation of the samples (g).
    pub std_dev: AccelSample,
    /// Minimum tilt change between samples treated as movement (degrees).
    pub noise_threshold_deg: f32,
    pub sample_count: usize,
}

impl Calibration {
    pub fn from_samples(
        samples: &[AccelSample],
        min_noise_threshold_deg: f32,
        noise_deg_per_g: f32,
    ) -> Result<Self, CalibrationError> {
        if samples.is_empty() {
            return Err(CalibrationError::NoSamples);
        }
        let n = samples.len() as f32;

        let sum = samples.iter().fold(AccelSample::default(), |acc, s| {
            AccelSample::new(acc.x + s.x, acc.y + s.y, acc.z + s.z)
        });
        let mean = AccelSample::new(sum.x / n, sum.y / n, sum.z / n);

        if mean.magnitude() < MIN_REST_MAGNITUDE_G {
            return Err(CalibrationError::DegenerateBaseline);
        }

        let var = samples.iter().fold(AccelSample::default(), |acc, s| {
            AccelSample::new(
                acc.x + (s.x - mean.x).powi(2),
                acc.y + (s.y - mean.y).powi(2),
                acc.z + (s.z - mean.z).powi(2),
            )
        });
        let std_dev = AccelSample::new((var.x / n).sqrt(), (var.y / n).sqrt(), (var.z / n).sqrt());

        Ok(Self {
            rest_vector: mean,
            std_dev,
            noise_threshold_deg: min_noise_threshold_deg.max(std_dev.y * noise_deg_per_g),
            sample_count: samples.len(),
        })
    }
}

/// Take `count` good readings from `source`, `interval` apart.
///
/// Transient read failures are skipped and retried; more than `max_failures`
/// of them, or a single disconnect, aborts the run.
pub fn collect_samples<S: AccelSource + ?Sized>(
    source: &mut S,
    count: usize,
    interval: Duration,
    max_failures: usize,
) -> Result<Vec<AccelSample>, CalibrationError> {
    if count == 0 {
        return Err(CalibrationError::NoSamples);
    }

    let mut samples = Vec::with_capacity(count);
    let mut failures = 0usize;

    while samples.len() < count {
        match source.read_accel() {
            Ok(sample) => samples.push(sample),
            Err(e) if e.is_transient() => {
                failures += 1;
                log::warn!("Calibration read failed ({}/{}): {}", failures, max_failures, e);
                if failures > max_failures {
                    return Err(CalibrationError::SensorUnresponsive {
                        failures,
                        collected: samples.len(),
                    });
                }
            }
            Err(e) => return Err(CalibrationError::SensorLost(e)),
        }

        if !interval.is_zero() {
            thread::sleep(interval);
        }
    }

    Ok(samples)
}
