// SipSense - Sensor Drivers

pub mod imu;
pub mod probe;
pub mod simulated;

#[cfg(test)]
pub(crate) mod fake_bus;

use crate::error::SensorError;
use crate::events::AccelSample;

/// Anything that can produce one accelerometer reading in g-units.
pub trait AccelSource {
    fn read_accel(&mut self) -> Result<AccelSample, SensorError>;
}

impl<S: AccelSource + ?Sized> AccelSource for Box<S> {
    fn read_accel(&mut self) -> Result<AccelSample, SensorError> {
        (**self).read_accel()
    }
}
