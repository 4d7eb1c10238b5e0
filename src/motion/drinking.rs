//! Drinking session state machine and flow model.
//!
//! A session opens once the total tilt sits inside the pouring band for
//! enough consecutive stable samples. While open, volume is integrated with a
//! linear tilt-to-flow proxy. The session closes immediately when tilt leaves
//! the band, or after a timeout when samples stop qualifying (unstable).
//! Closed sessions shorter than the minimum duration are discarded as bumps.

use std::time::{Duration, Instant};

use crate::config::TrackerConfig;
use crate::events::Sip;

/// Linear "more tilt, faster pour" estimate. Coefficients need tuning per bottle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowModel {
    pub tilt_lower_deg: f32,
    pub base_flow_rate: f32,
    pub angle_multiplier: f32,
    pub max_flow_rate: f32,
    pub max_volume_per_tick_ml: f32,
}

impl FlowModel {
    pub fn from_config(cfg: &TrackerConfig) -> Self {
        Self {
            tilt_lower_deg: cfg.tilt_lower_deg,
            base_flow_rate: cfg.base_flow_rate,
            angle_multiplier: cfg.angle_multiplier,
            max_flow_rate: cfg.max_flow_rate,
            max_volume_per_tick_ml: cfg.max_volume_per_tick_ml,
        }
    }

    /// Flow in ml/s at `total_tilt_deg`.
    pub fn flow_rate(&self, total_tilt_deg: f32) -> f32 {
        // Tens of degrees past the pouring threshold.
        let angle_factor = ((total_tilt_deg - self.tilt_lower_deg) / 10.0).max(0.0);
        (self.base_flow_rate * (1.0 + angle_factor * self.angle_multiplier))
            .clamp(0.0, self.max_flow_rate)
    }

    /// Volume poured over `elapsed`, capped per tick.
    pub fn volume_ml(&self, total_tilt_deg: f32, elapsed: Duration) -> f32 {
        (self.flow_rate(total_tilt_deg) * elapsed.as_secs_f32()).min(self.max_volume_per_tick_ml)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DrinkingSession {
    start: Instant,
    last_update: Instant,
    volume_ml: f32,
}

/// Outcome of one [`DrinkingDetector::step`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DrinkingStep {
    pub drinking: bool,
    pub started: bool,
    pub volume_this_tick_ml: f32,
    pub completed_sip: Option<Sip>,
    /// A session closed but was too short to count.
    pub discarded: bool,
}

#[derive(Debug, Clone)]
pub struct DrinkingDetector {
    flow: FlowModel,
    tilt_lower_deg: f32,
    tilt_upper_deg: f32,
    timeout: Duration,
    min_duration: Duration,
    required_stable_readings: u32,

    session: Option<DrinkingSession>,
    last_total_tilt_deg: f32,
    stable_readings: u32,
    committed_ml: f32,
    sip_count: u32,
}

impl DrinkingDetector {
    pub fn new(cfg: &TrackerConfig) -> Self {
        Self {
            flow: FlowModel::from_config(cfg),
            tilt_lower_deg: cfg.tilt_lower_deg,
            tilt_upper_deg: cfg.tilt_upper_deg,
            timeout: cfg.drinking_timeout,
            min_duration: cfg.min_drinking_time,
            required_stable_readings: cfg.required_stable_readings,
            session: None,
            last_total_tilt_deg: 0.0,
            stable_readings: 0,
            committed_ml: 0.0,
            sip_count: 0,
        }
    }

    pub fn step(&mut self, total_tilt_deg: f32, noise_threshold_deg: f32, now: Instant) -> DrinkingStep {
        let mut out = DrinkingStep::default();

        if (total_tilt_deg - self.last_total_tilt_deg).abs() > noise_threshold_deg {
            self.stable_readings = 0;
        } else {
            self.stable_readings = self.stable_readings.saturating_add(1);
        }

        let in_band = self.tilt_lower_deg < total_tilt_deg && total_tilt_deg < self.tilt_upper_deg;

        if in_band && self.stable_readings >= self.required_stable_readings {
            let session = self.session.get_or_insert_with(|| {
                out.started = true;
                DrinkingSession {
                    start: now,
                    last_update: now,
                    volume_ml: 0.0,
                }
            });
            if out.started {
                log::info!("Drinking detected, session started (tilt {:.1}°)", total_tilt_deg);
            }

            let dt = now.saturating_duration_since(session.last_update);
            if !dt.is_zero() {
                let poured = self.flow.volume_ml(total_tilt_deg, dt);
                session.volume_ml += poured;
                out.volume_this_tick_ml = poured;
            }
            session.last_update = now;
            out.drinking = true;
        } else if let Some(session) = self.session {
            // Out of band ends at once; in band but unstable waits for the timeout.
            if !in_band || now.saturating_duration_since(session.last_update) > self.timeout {
                self.finish(session, now, &mut out);
            } else {
                out.drinking = true;
            }
        }

        self.last_total_tilt_deg = total_tilt_deg;
        out
    }

    fn finish(&mut self, session: DrinkingSession, now: Instant, out: &mut DrinkingStep) {
        self.session = None;
        let duration = now.saturating_duration_since(session.start);

        if duration >= self.min_duration {
            self.committed_ml += session.volume_ml;
            self.sip_count += 1;
            log::info!(
                "Drinking session ended: {:.1} s, {:.1} ml (total {:.1} ml)",
                duration.as_secs_f32(),
                session.volume_ml,
                self.committed_ml
            );
            out.completed_sip = Some(Sip {
                duration,
                volume_ml: session.volume_ml,
            });
        } else {
            log::debug!(
                "Discarding {:.2} s session ({:.1} ml) as noise",
                duration.as_secs_f32(),
                session.volume_ml
            );
            out.discarded = true;
        }
    }

    /// Forget the stability run, e.g. after the baseline changed.
    pub fn reset_stability(&mut self) {
        self.stable_readings = 0;
        self.last_total_tilt_deg = 0.0;
    }

    pub fn is_drinking(&self) -> bool {
        self.session.is_some()
    }

    pub fn session_volume_ml(&self) -> f32 {
        self.session.map_or(0.0, |s| s.volume_ml)
    }

    /// Finished sips only.
    pub fn committed_ml(&self) -> f32 {
        self.committed_ml
    }

    /// Finished sips plus the session in progress.
    pub fn lifetime_total_ml(&self) -> f32 {
        self.committed_ml + self.session_volume_ml()
    }

    pub fn reset_lifetime_total(&mut self) {
        self.committed_ml = 0.0;
        self.sip_count = 0;
    }

    pub fn sip_count(&self) -> u32 {
        self.sip_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(50);
    const NOISE: f32 = 5.0;

    fn detector() -> DrinkingDetector {
        DrinkingDetector::new(&TrackerConfig::default())
    }

    /// Feed `tilts` at 20 Hz starting at `t0`; returns the steps and the next instant.
    fn feed(d: &mut DrinkingDetector, t0: Instant, tilts: &[f32]) -> (Vec<DrinkingStep>, Instant) {
        let mut t = t0;
        let steps = tilts
            .iter()
            .map(|&tilt| {
                let step = d.step(tilt, NOISE, t);
                t += TICK;
                step
            })
            .collect();
        (steps, t)
    }

    #[test]
    fn flow_rate_matches_linear_model() {
        let flow = FlowModel::from_config(&TrackerConfig::default());
        assert!((flow.flow_rate(70.0) - 6.0).abs() < 1e-5);
        assert!((flow.flow_rate(90.0) - 12.0).abs() < 1e-5);
        assert!((flow.flow_rate(40.0) - 6.0).abs() < 1e-5);
        // 6 * (1 + 11 * 0.5) = 39, still under the ceiling
        assert!((flow.flow_rate(180.0) - 39.0).abs() < 1e-4);
    }

    #[test]
    fn flow_rate_respects_ceiling() {
        let cfg = TrackerConfig {
            angle_multiplier: 5.0,
            ..TrackerConfig::default()
        };
        let flow = FlowModel::from_config(&cfg);
        assert_eq!(flow.flow_rate(150.0), cfg.max_flow_rate);
    }

    #[test]
    fn volume_per_tick_is_capped() {
        let flow = FlowModel::from_config(&TrackerConfig::default());
        for tilt in [71.0, 120.0, 179.9] {
            assert!(flow.volume_ml(tilt, Duration::from_secs(3600)) <= 20.0);
        }
        assert!((flow.volume_ml(90.0, Duration::from_millis(500)) - 6.0).abs() < 1e-4);
    }

    #[test]
    fn needs_stable_run_before_starting() {
        let mut d = detector();
        let (steps, _) = feed(&mut d, Instant::now(), &[90.0; 6]);
        // First sample jumps 90° (unstable), then five stable ones.
        assert!(steps[..5].iter().all(|s| !s.drinking));
        assert!(steps[5].drinking && steps[5].started);
        assert_eq!(steps[5].volume_this_tick_ml, 0.0);
    }

    #[test]
    fn single_spike_does_not_start() {
        let mut d = detector();
        let mut tilts = vec![0.0; 10];
        tilts.push(95.0);
        tilts.extend([0.0; 10]);
        let (steps, _) = feed(&mut d, Instant::now(), &tilts);
        assert!(steps.iter().all(|s| !s.drinking));
    }

    #[test]
    fn returning_upright_ends_session_at_once() {
        let mut d = detector();
        let (_, t) = feed(&mut d, Instant::now(), &[90.0; 20]);
        assert!(d.is_drinking());
        let poured = d.session_volume_ml();
        assert!(poured > 0.0);

        let step = d.step(0.0, NOISE, t);
        assert!(!step.drinking);
        assert_eq!(step.completed_sip.map(|s| s.volume_ml), Some(poured));
        assert!(!d.is_drinking());
        assert_eq!(d.session_volume_ml(), 0.0);
        assert_eq!(d.sip_count(), 1);
        assert_eq!(d.committed_ml(), poured);
    }

    #[test]
    fn open_session_is_not_committed() {
        let mut d = detector();
        feed(&mut d, Instant::now(), &[90.0; 15]);
        assert!(d.session_volume_ml() > 0.0);
        assert_eq!(d.committed_ml(), 0.0);
        assert_eq!(d.lifetime_total_ml(), d.session_volume_ml());
    }

    #[test]
    fn unstable_tilt_in_band_waits_for_timeout() {
        let mut d = detector();
        let (_, mut t) = feed(&mut d, Instant::now(), &[90.0; 10]);
        assert!(d.is_drinking());

        // Swing between 90 and 110: in band, never stable.
        let mut ended = None;
        for i in 0..60 {
            let step = d.step(if i % 2 == 0 { 110.0 } else { 90.0 }, NOISE, t);
            if !step.drinking {
                ended = Some((i, step));
                break;
            }
            t += TICK;
        }
        let (i, step) = ended.unwrap();
        // 2 s timeout at 20 Hz
        assert!(i >= 40);
        assert!(step.completed_sip.is_some());
    }

    #[test]
    fn short_session_is_discarded() {
        let mut d = detector();
        let (_, t) = feed(&mut d, Instant::now(), &[90.0; 7]);
        assert!(d.is_drinking());
        // Open for 0.1 s only.
        let step = d.step(0.0, NOISE, t);
        assert!(step.completed_sip.is_none());
        assert!(step.discarded);
        assert_eq!(d.lifetime_total_ml(), 0.0);
        assert_eq!(d.sip_count(), 0);
    }

    #[test]
    fn leaving_through_the_top_ends_session() {
        let cfg = TrackerConfig {
            tilt_upper_deg: 150.0,
            ..TrackerConfig::default()
        };
        let mut d = DrinkingDetector::new(&cfg);
        let (_, t) = feed(&mut d, Instant::now(), &[120.0; 20]);
        assert!(d.is_drinking());
        let step = d.step(152.0, NOISE, t);
        assert!(!step.drinking);
        assert!(step.completed_sip.is_some());
    }

    #[test]
    fn lifetime_is_sum_of_sips() {
        let mut d = detector();
        let mut t = Instant::now();
        let mut sips = 0.0;
        for hold in [12, 20, 30] {
            let mut tilts = vec![100.0; hold];
            tilts.push(0.0);
            let (steps, next) = feed(&mut d, t, &tilts);
            sips += steps.last().and_then(|s| s.completed_sip).unwrap().volume_ml;
            t = next;
        }
        assert!((d.lifetime_total_ml() - sips).abs() < 1e-4);

        d.reset_lifetime_total();
        assert_eq!(d.lifetime_total_ml(), 0.0);
    }
}
