// SipSense - Simulated Accelerometer
//
// Stands in for the MPU6050 when no hardware answers. Produces an upright
// bottle with jitter, and now and then a held tilt (a sip) or a shake burst,
// so the whole pipeline can be exercised on a desk.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::drivers::AccelSource;
use crate::error::SensorError;
use crate::events::AccelSample;

const JITTER_G: f32 = 0.03;
const SIP_CHANCE: f64 = 0.01;
const SHAKE_CHANCE: f64 = 0.005;
const SIP_TICKS: std::ops::Range<u32> = 15..40;
const SHAKE_TICKS: std::ops::Range<u32> = 6..15;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Resting,
    /// Tilted towards the mouth at a fixed angle (degrees from upright).
    Sipping { remaining: u32, angle_deg: f32 },
    Shaking { remaining: u32 },
}

pub struct SimulatedAccel {
    rng: StdRng,
    phase: Phase,
}

impl SimulatedAccel {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            phase: Phase::Resting,
        }
    }

    fn jitter(&mut self) -> f32 {
        self.rng.gen_range(-JITTER_G..JITTER_G)
    }

    fn next_phase(&mut self) -> Phase {
        match self.phase {
            Phase::Resting => {
                let roll: f64 = self.rng.gen();
                if roll < SIP_CHANCE {
                    Phase::Sipping {
                        remaining: self.rng.gen_range(SIP_TICKS),
                        angle_deg: self.rng.gen_range(80.0f32..130.0),
                    }
                } else if roll < SIP_CHANCE + SHAKE_CHANCE {
                    Phase::Shaking {
                        remaining: self.rng.gen_range(SHAKE_TICKS),
                    }
                } else {
                    Phase::Resting
                }
            }
            Phase::Sipping { remaining: 0, .. } | Phase::Shaking { remaining: 0 } => Phase::Resting,
            Phase::Sipping { remaining, angle_deg } => Phase::Sipping {
                remaining: remaining - 1,
                angle_deg,
            },
            Phase::Shaking { remaining } => Phase::Shaking {
                remaining: remaining - 1,
            },
        }
    }
}

impl AccelSource for SimulatedAccel {
    fn read_accel(&mut self) -> Result<AccelSample, SensorError> {
        let phase = self.next_phase();
        self.phase = phase;

        let sample = match phase {
            Phase::Resting => AccelSample::new(self.jitter(), self.jitter(), 1.0 + self.jitter()),
            Phase::Sipping { angle_deg, .. } => {
                let (sin, cos) = angle_deg.to_radians().sin_cos();
                AccelSample::new(self.jitter(), sin + self.jitter(), cos + self.jitter())
            }
            Phase::Shaking { .. } => {
                let mut axis = || self.rng.gen_range(-2.0f32..2.0);
                AccelSample::new(axis(), axis(), axis())
            }
        };
        Ok(sample)
    }
}
