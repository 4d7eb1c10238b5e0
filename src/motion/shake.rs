//! Shake gesture from swings in acceleration magnitude.
//!
//! Only |a| is looked at, so the same motion reads the same whichever axis
//! it happens on. Once triggered, `shaking` is held for a while so UI
//! reactions can play out.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::TrackerConfig;

#[derive(Debug, Clone)]
pub struct ShakeDetector {
    window: VecDeque<f32>,
    window_size: usize,
    threshold_g: f32,
    hold: Duration,
    shaking_until: Option<Instant>,
}

impl ShakeDetector {
    pub fn new(cfg: &TrackerConfig) -> Self {
        Self {
            window: VecDeque::with_capacity(cfg.shake_window_size + 1),
            window_size: cfg.shake_window_size,
            threshold_g: cfg.shake_threshold_g,
            hold: cfg.shake_hold,
            shaking_until: None,
        }
    }

    /// Push one magnitude sample and return whether the bottle counts as shaking.
    pub fn update(&mut self, magnitude_g: f32, now: Instant) -> bool {
        self.window.push_back(magnitude_g);
        while self.window.len() > self.window_size {
            self.window.pop_front();
        }

        if let Some(spread) = self.spread() {
            if spread > self.threshold_g {
                if self.shaking_until.is_none() {
                    log::info!("Shake detected (max accel diff {:.2}g)", spread);
                }
                self.shaking_until = Some(now + self.hold);
                return true;
            }
        }

        if matches!(self.shaking_until, Some(until) if now >= until) {
            log::debug!("Shake hold expired");
            self.shaking_until = None;
        }
        self.shaking_until.is_some()
    }

    /// max - min over a full window.
    fn spread(&self) -> Option<f32> {
        if self.window.len() < self.window_size {
            return None;
        }
        let (min, max) = self
            .window
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &m| (lo.min(m), hi.max(m)));
        Some(max - min)
    }

    pub fn is_shaking(&self) -> bool {
        self.shaking_until.is_some()
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::AccelSample;

    const TICK: Duration = Duration::from_millis(50);

    fn run(detector: &mut ShakeDetector, t0: Instant, samples: &[AccelSample]) -> Vec<bool> {
        samples
            .iter()
            .enumerate()
            .map(|(i, s)| detector.update(s.magnitude(), t0 + TICK * i as u32))
            .collect()
    }

    #[test]
    fn window_never_exceeds_size() {
        let mut d = ShakeDetector::new(&TrackerConfig::default());
        let t0 = Instant::now();
        for i in 0..50 {
            d.update(1.0, t0 + TICK * i);
            assert!(d.window_len() <= 5);
        }
        assert_eq!(d.window_len(), 5);
    }

    #[test]
    fn needs_full_window() {
        let mut d = ShakeDetector::new(&TrackerConfig::default());
        let t0 = Instant::now();
        assert!(!d.update(0.0, t0));
        assert!(!d.update(3.0, t0 + TICK));
        assert!(!d.update(0.0, t0 + TICK * 2));
        assert!(!d.update(3.0, t0 + TICK * 3));
        assert!(d.update(0.0, t0 + TICK * 4));
    }

    #[test]
    fn steady_gravity_is_not_a_shake() {
        let mut d = ShakeDetector::new(&TrackerConfig::default());
        let rest = vec![AccelSample::new(0.0, 0.0, 1.0); 40];
        assert!(run(&mut d, Instant::now(), &rest).iter().all(|s| !s));
    }

    #[test]
    fn shake_is_held_then_clears() {
        let mut d = ShakeDetector::new(&TrackerConfig::default());
        let t0 = Instant::now();
        for (i, m) in [1.0, 2.8, 0.4, 2.9, 0.3].iter().enumerate() {
            d.update(*m, t0 + TICK * i as u32);
        }
        assert!(d.is_shaking());

        // The swing stays in the window for three more samples, each re-arming the hold.
        let last_trigger = t0 + TICK * 7;
        let mut t = t0 + TICK * 5;
        while t < last_trigger + Duration::from_secs(3) {
            assert!(d.update(1.0, t));
            t += TICK;
        }
        assert!(!d.update(1.0, last_trigger + Duration::from_secs(3)));
    }

    #[test]
    fn direction_does_not_matter() {
        let mags = [1.0f32, 2.6, 0.2, 2.4, 1.0, 1.0, 1.0];
        let along_z: Vec<_> = mags.iter().map(|&m| AccelSample::new(0.0, 0.0, m)).collect();
        let spread: Vec<_> = mags
            .iter()
            .map(|&m| {
                let c = m / 3f32.sqrt();
                AccelSample::new(c, -c, c)
            })
            .collect();

        let t0 = Instant::now();
        let a = run(&mut ShakeDetector::new(&TrackerConfig::default()), t0, &along_z);
        let b = run(&mut ShakeDetector::new(&TrackerConfig::default()), t0, &spread);
        assert_eq!(a, b);
        assert!(a.iter().any(|s| *s));
    }
}
