// SipSense - I2C Device Discovery
//
// Walks an ordered list of (bus, address) candidates and returns the first
// MPU6050 that identifies itself and accepts the wake-up sequence. A bus
// that reports busy is retried a bounded number of times before moving on.

use std::fmt::Display;
use std::thread;
use std::time::Duration;

use embedded_hal::i2c::I2c;

use crate::drivers::imu::{self, Mpu6050, WHO_AM_I_EXPECTED};
use crate::error::ProbeError;

/// A device found by [`probe_candidates`].
pub struct Probed<I2C> {
    pub bus: u8,
    pub address: u8,
    pub device: Mpu6050<I2C>,
}

pub fn probe_candidates<I2C, F, E>(
    candidates: &[(u8, u8)],
    attempts: u32,
    retry_delay: Duration,
    mut open_bus: F,
) -> Result<Probed<I2C>, ProbeError>
where
    I2C: I2c,
    F: FnMut(u8) -> Result<I2C, E>,
    E: Display,
{
    let mut tried = Vec::with_capacity(candidates.len());

    for &(bus, address) in candidates {
        tried.push((bus, address));
        log::debug!("Probing I2C bus {} @ 0x{:02X}", bus, address);

        for attempt in 1..=attempts.max(1) {
            let i2c = match open_bus(bus) {
                Ok(i2c) => i2c,
                Err(e) => {
                    log::warn!("Cannot open I2C bus {}: {}", bus, e);
                    break;
                }
            };

            let mut device = Mpu6050::new(i2c, address);
            match device.who_am_i() {
                Ok(WHO_AM_I_EXPECTED) => match device.init() {
                    Ok(()) => {
                        log::info!("MPU6050 found on bus {} @ 0x{:02X}", bus, address);
                        return Ok(Probed { bus, address, device });
                    }
                    Err(e) => {
                        log::warn!("MPU6050 on bus {} @ 0x{:02X} failed to wake: {:?}", bus, address, e);
                        break;
                    }
                },
                Ok(other) => {
                    log::warn!(
                        "Unexpected WHO_AM_I 0x{:02X} on bus {} @ 0x{:02X}",
                        other,
                        bus,
                        address
                    );
                    break;
                }
                Err(e) => {
                    let err = imu::classify(&e);
                    if err.is_transient() && attempt < attempts {
                        log::warn!(
                            "Bus {} busy (attempt {}/{}), retrying in {:?}",
                            bus,
                            attempt,
                            attempts,
                            retry_delay
                        );
                        thread::sleep(retry_delay);
                        continue;
                    }
                    log::debug!("No answer on bus {} @ 0x{:02X}: {}", bus, address, err);
                    break;
                }
            }
        }
    }

    Err(ProbeError::NotFound { tried })
}

/// Probe the Raspberry Pi `/dev/i2c-*` buses.
#[cfg(target_os = "linux")]
pub fn probe_linux() -> Result<Probed<linux_embedded_hal::I2cdev>, ProbeError> {
    use crate::config::*;

    let probed = probe_candidates(
        &I2C_PROBE_CANDIDATES,
        I2C_PROBE_ATTEMPTS,
        Duration::from_millis(I2C_PROBE_RETRY_DELAY_MS),
        |bus| linux_embedded_hal::I2cdev::new(format!("/dev/i2c-{bus}")),
    )?;
    thread::sleep(Duration::from_millis(MPU6050_WAKE_DELAY_MS));
    Ok(probed)
}
