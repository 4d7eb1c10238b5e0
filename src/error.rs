// SipSense - Error Types

use thiserror::Error;

/// How bad a failed sensor read is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorErrorKind {
    /// Bus busy, arbitration lost, overrun. Worth trying again next tick.
    Transient,
    /// Device no longer answers.
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("sensor read failed ({kind:?}): {message}")]
pub struct SensorError {
    pub kind: SensorErrorKind,
    pub message: String,
}

impl SensorError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: SensorErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn disconnected(message: impl Into<String>) -> Self {
        Self {
            kind: SensorErrorKind::Disconnected,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == SensorErrorKind::Transient
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("no calibration samples were collected")]
    NoSamples,
    #[error("sensor unresponsive during calibration ({failures} failed reads, {collected} good)")]
    SensorUnresponsive { failures: usize, collected: usize },
    #[error("sensor lost during calibration: {0}")]
    SensorLost(SensorError),
    #[error("rest vector has zero magnitude")]
    DegenerateBaseline,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackerError {
    #[error("tracker has not been calibrated")]
    NotCalibrated,
    #[error("calibration failed: {0}")]
    Calibration(#[from] CalibrationError),
    #[error("sensor lost after {consecutive_failures} consecutive failures: {last}")]
    SensorLost {
        consecutive_failures: u32,
        last: SensorError,
    },
    #[error("invalid tracker configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("no MPU6050 found (tried {})", format_candidates(.tried))]
    NotFound { tried: Vec<(u8, u8)> },
}

fn format_candidates(tried: &[(u8, u8)]) -> String {
    tried
        .iter()
        .map(|(bus, addr)| format!("bus {bus} @ 0x{addr:02X}"))
        .collect::<Vec<_>>()
        .join(", ")
}
