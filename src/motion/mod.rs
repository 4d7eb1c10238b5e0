//! Motion classification: calibration, tilt, drinking sessions and shake.
//!
//! [`MotionTracker`] is the only owner of this state. Callers drive it with
//! one `update` per display tick and read the returned [`StatusRecord`].
//!
//! [`StatusRecord`]: crate::events::StatusRecord

pub mod calibration;
pub mod drinking;
pub mod shake;
pub mod tilt;
pub mod tracker;

pub use calibration::Calibration;
pub use drinking::{DrinkingDetector, FlowModel};
pub use shake::ShakeDetector;
pub use tracker::MotionTracker;
