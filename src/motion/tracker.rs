//! The motion tracker: one owned value holding calibration, drinking and
//! shake state. All mutation goes through `calibrate*`, `update*`,
//! `process_sample` and `reset_lifetime_total`.

use std::time::Instant;

use crate::config::TrackerConfig;
use crate::drivers::AccelSource;
use crate::error::TrackerError;
use crate::events::{AccelSample, StatusRecord};
use crate::motion::calibration::{self, Calibration};
use crate::motion::drinking::DrinkingDetector;
use crate::motion::shake::ShakeDetector;
use crate::motion::tilt;

pub struct MotionTracker<S> {
    source: S,
    config: TrackerConfig,
    calibration: Option<Calibration>,
    drinking: DrinkingDetector,
    shake: ShakeDetector,
    consecutive_failures: u32,
}

impl<S: AccelSource> MotionTracker<S> {
    pub fn new(source: S, config: TrackerConfig) -> Result<Self, TrackerError> {
        config.validate()?;
        Ok(Self {
            drinking: DrinkingDetector::new(&config),
            shake: ShakeDetector::new(&config),
            source,
            config,
            calibration: None,
            consecutive_failures: 0,
        })
    }

    /// Sample the resting bottle and replace the baseline.
    ///
    /// Blocks for roughly `sample_count * calibration_interval`. On failure the
    /// previous calibration, if any, stays in effect.
    pub fn calibrate(&mut self, sample_count: usize) -> Result<&Calibration, TrackerError> {
        log::info!("Calibrating: keep the bottle upright and still ({} samples)", sample_count);
        let samples = calibration::collect_samples(
            &mut self.source,
            sample_count,
            self.config.calibration_interval,
            self.config.calibration_max_failures,
        )?;
        self.calibrate_from_samples(&samples)
    }

    pub fn calibrate_from_samples(&mut self, samples: &[AccelSample]) -> Result<&Calibration, TrackerError> {
        let cal = Calibration::from_samples(
            samples,
            self.config.min_noise_threshold_deg,
            self.config.noise_deg_per_g,
        )?;

        log::info!(
            "Calibration complete: rest ({:.3}, {:.3}, {:.3}) g, noise ±{:.3}/±{:.3} g, threshold {:.1}°",
            cal.rest_vector.x,
            cal.rest_vector.y,
            cal.rest_vector.z,
            cal.std_dev.x,
            cal.std_dev.y,
            cal.noise_threshold_deg
        );

        self.drinking.reset_stability();
        self.consecutive_failures = 0;
        Ok(self.calibration.insert(cal))
    }

    /// One tick at the current monotonic time.
    pub fn update(&mut self) -> Result<Option<StatusRecord>, TrackerError> {
        self.update_at(Instant::now())
    }

    /// One tick: read a sample and advance. `Ok(None)` means the read failed
    /// transiently and nothing changed.
    pub fn update_at(&mut self, now: Instant) -> Result<Option<StatusRecord>, TrackerError> {
        let cal = self.calibration.ok_or(TrackerError::NotCalibrated)?;

        match self.source.read_accel() {
            Ok(sample) => {
                self.consecutive_failures = 0;
                Ok(Some(self.advance(&cal, sample, now)))
            }
            Err(e) if e.is_transient() => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.config.max_consecutive_read_failures {
                    return Err(TrackerError::SensorLost {
                        consecutive_failures: self.consecutive_failures,
                        last: e,
                    });
                }
                log::debug!("No sample this tick ({}): {}", self.consecutive_failures, e);
                Ok(None)
            }
            Err(e) => Err(TrackerError::SensorLost {
                consecutive_failures: self.consecutive_failures + 1,
                last: e,
            }),
        }
    }

    /// One tick on a sample obtained elsewhere.
    pub fn process_sample(&mut self, sample: AccelSample, now: Instant) -> Result<StatusRecord, TrackerError> {
        let cal = self.calibration.ok_or(TrackerError::NotCalibrated)?;
        Ok(self.advance(&cal, sample, now))
    }

    fn advance(&mut self, cal: &Calibration, sample: AccelSample, now: Instant) -> StatusRecord {
        let total_tilt_deg = tilt::total_tilt_deg(&sample, &cal.rest_vector);
        let (tilt_x_deg, tilt_y_deg) = tilt::axis_tilts_deg(&sample);

        let step = self.drinking.step(total_tilt_deg, cal.noise_threshold_deg, now);
        let shaking = self.shake.update(sample.magnitude(), now);

        StatusRecord {
            drinking: step.drinking,
            volume_this_tick_ml: step.volume_this_tick_ml,
            completed_sip: step.completed_sip,
            shaking,
            tilt_x_deg,
            tilt_y_deg,
            total_tilt_deg,
            session_discarded: step.discarded,
            session_volume_ml: self.drinking.session_volume_ml(),
            lifetime_total_ml: self.drinking.lifetime_total_ml(),
        }
    }

    pub fn reset_lifetime_total(&mut self) {
        log::info!("Water consumption counter reset");
        self.drinking.reset_lifetime_total();
    }

    pub fn lifetime_total_ml(&self) -> f32 {
        self.drinking.lifetime_total_ml()
    }

    /// Volume of finished sips, excluding any session still open.
    pub fn committed_ml(&self) -> f32 {
        self.drinking.committed_ml()
    }

    pub fn session_volume_ml(&self) -> f32 {
        self.drinking.session_volume_ml()
    }

    pub fn sip_count(&self) -> u32 {
        self.drinking.sip_count()
    }

    pub fn is_drinking(&self) -> bool {
        self.drinking.is_drinking()
    }

    pub fn is_shaking(&self) -> bool {
        self.shake.is_shaking()
    }

    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibration.as_ref()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SensorError;
    use std::collections::VecDeque;
    use std::time::Duration;

    const UP: AccelSample = AccelSample::new(0.0, 0.0, 1.0);

    #[derive(Default)]
    struct Script(VecDeque<Result<AccelSample, SensorError>>);

    impl AccelSource for Script {
        fn read_accel(&mut self) -> Result<AccelSample, SensorError> {
            self.0.pop_front().unwrap_or(Ok(UP))
        }
    }

    fn calibrated() -> MotionTracker<Script> {
        let mut t = MotionTracker::new(Script::default(), TrackerConfig::default()).unwrap();
        t.calibrate_from_samples(&[UP; 20]).unwrap();
        t
    }

    #[test]
    fn refuses_to_run_uncalibrated() {
        let mut t = MotionTracker::new(Script::default(), TrackerConfig::default()).unwrap();
        assert_eq!(t.update(), Err(TrackerError::NotCalibrated));
        assert_eq!(
            t.process_sample(UP, Instant::now()),
            Err(TrackerError::NotCalibrated)
        );
    }

    #[test]
    fn rejects_bad_config() {
        let cfg = TrackerConfig {
            shake_window_size: 0,
            ..TrackerConfig::default()
        };
        assert!(matches!(
            MotionTracker::new(Script::default(), cfg),
            Err(TrackerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn calibrate_reads_from_source() {
        let cfg = TrackerConfig {
            calibration_interval: Duration::ZERO,
            ..TrackerConfig::default()
        };
        let mut t = MotionTracker::new(Script::default(), cfg).unwrap();
        let cal = *t.calibrate(30).unwrap();
        assert_eq!(cal.rest_vector, UP);
        assert_eq!(cal.sample_count, 30);
    }

    #[test]
    fn failed_recalibration_keeps_old_baseline() {
        let mut t = calibrated();
        let before = *t.calibration().unwrap();
        assert!(t.calibrate_from_samples(&[AccelSample::default(); 5]).is_err());
        assert_eq!(t.calibration(), Some(&before));
    }

    #[test]
    fn transient_failure_skips_tick() {
        let mut t = calibrated();
        t.source_mut().0.push_back(Err(SensorError::transient("busy")));
        assert_eq!(t.update(), Ok(None));
        assert!(t.update().unwrap().is_some());
    }

    #[test]
    fn repeated_failures_become_sensor_lost() {
        let mut t = calibrated();
        let limit = t.config().max_consecutive_read_failures;
        for _ in 0..limit {
            t.source_mut().0.push_back(Err(SensorError::transient("busy")));
        }
        for _ in 1..limit {
            assert_eq!(t.update(), Ok(None));
        }
        assert!(matches!(
            t.update(),
            Err(TrackerError::SensorLost { consecutive_failures, .. }) if consecutive_failures == limit
        ));
    }

    #[test]
    fn disconnect_is_fatal() {
        let mut t = calibrated();
        t.source_mut().0.push_back(Err(SensorError::disconnected("gone")));
        assert!(matches!(t.update(), Err(TrackerError::SensorLost { .. })));
    }

    #[test]
    fn status_carries_tilts() {
        let mut t = calibrated();
        let status = t.process_sample(AccelSample::new(0.0, 1.0, 0.0), Instant::now()).unwrap();
        assert!((status.total_tilt_deg - 90.0).abs() < 1e-3);
        assert!((status.tilt_x_deg - 90.0).abs() < 1e-3);
        assert!(status.tilt_y_deg.abs() < 1e-3);
        assert!(!status.drinking);
        assert!(!status.shaking);
    }
}
