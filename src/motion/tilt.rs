//! Tilt angles from a single accelerometer sample.

use crate::events::AccelSample;

/// Angle between `sample` and the calibrated `rest` vector, in degrees.
///
/// Independent of which way the bottle is tipped. A zero-length vector on
/// either side reads as no tilt.
pub fn total_tilt_deg(sample: &AccelSample, rest: &AccelSample) -> f32 {
    let mag_sample = sample.magnitude();
    let mag_rest = rest.magnitude();

    let cos_angle = if mag_sample > 0.0 && mag_rest > 0.0 {
        (sample.dot(rest) / (mag_sample * mag_rest)).clamp(-1.0, 1.0)
    } else {
        1.0
    };
    cos_angle.acos().to_degrees()
}

/// Per-axis tilt relative to gravity, (about X, about Y) in degrees.
pub fn axis_tilts_deg(sample: &AccelSample) -> (f32, f32) {
    let AccelSample { x, y, z } = *sample;
    let tilt_x = y.atan2((x * x + z * z).sqrt()).to_degrees();
    let tilt_y = (-x).atan2((y * y + z * z).sqrt()).to_degrees();
    (tilt_x, tilt_y)
}
