//! SipSense: water-bottle motion tracking for a virtual pet.
//!
//! An MPU6050 strapped to a bottle is polled once per display tick. The
//! [`motion::MotionTracker`] turns each accelerometer sample into a
//! [`events::StatusRecord`]: whether the bottle is tipped for drinking, how
//! much water that is estimated to be, when a sip finished, and whether the
//! bottle is being shaken.
//!
//! ```no_run
//! use sipsense::config::TrackerConfig;
//! use sipsense::drivers::simulated::SimulatedAccel;
//! use sipsense::motion::MotionTracker;
//!
//! # fn main() -> Result<(), sipsense::error::TrackerError> {
//! let mut tracker = MotionTracker::new(SimulatedAccel::new(1), TrackerConfig::default())?;
//! tracker.calibrate(200)?;
//! if let Some(status) = tracker.update()? {
//!     if let Some(ml) = status.session_final_volume_ml() {
//!         println!("sip: {ml:.0} ml");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod drivers;
pub mod error;
pub mod events;
pub mod motion;
pub mod tasks;

pub use drivers::AccelSource;
pub use error::{CalibrationError, SensorError, TrackerError};
pub use events::{AccelSample, PetEvent, Sip, StatusRecord, TrackerCommand};
pub use motion::MotionTracker;
