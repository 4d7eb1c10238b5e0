// SipSense - MPU6050 (GY-521) Accelerometer Driver
//
// Register-level driver over any embedded-hal 1.0 I2C bus. Only the
// accelerometer is used; the gyro stays at its power-on configuration.

use embedded_hal::i2c::{ErrorKind, I2c};

use crate::config::*;
use crate::drivers::AccelSource;
use crate::error::SensorError;
use crate::events::AccelSample;

// MPU6050 register addresses
const REG_PWR_MGMT_1: u8 = 0x6B;
const REG_CONFIG: u8 = 0x1A;
const REG_ACCEL_CONFIG: u8 = 0x1C;
const REG_ACCEL_XOUT_H: u8 = 0x3B; // Start of 6-byte accel burst
const REG_WHO_AM_I: u8 = 0x75;
pub const WHO_AM_I_EXPECTED: u8 = 0x68;

pub struct Mpu6050<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Mpu6050<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn who_am_i(&mut self) -> Result<u8, I2C::Error> {
        let mut buf = [0u8; 1];
        self.i2c.write_read(self.address, &[REG_WHO_AM_I], &mut buf)?;
        Ok(buf[0])
    }

    /// Verify the device is reachable on the I2C bus.
    pub fn is_connected(&mut self) -> bool {
        matches!(self.who_am_i(), Ok(WHO_AM_I_EXPECTED))
    }

    /// Wake the sensor and configure accel ±2 g, DLPF 21 Hz.
    pub fn init(&mut self) -> Result<(), I2C::Error> {
        // Wake up (clear SLEEP bit)
        self.i2c.write(self.address, &[REG_PWR_MGMT_1, 0x00])?;

        // DLPF bandwidth 21 Hz
        self.i2c.write(self.address, &[REG_CONFIG, 0x04])?;

        // Accelerometer: ±2 g
        self.i2c.write(self.address, &[REG_ACCEL_CONFIG, 0x00])?;

        log::info!("MPU6050 @ 0x{:02X} initialised (±2g, DLPF 21Hz)", self.address);
        Ok(())
    }

    /// Burst-read the three accel axes as raw two's-complement counts.
    pub fn read_raw(&mut self) -> Result<[i16; 3], I2C::Error> {
        let mut raw = [0u8; 6];
        self.i2c.write_read(self.address, &[REG_ACCEL_XOUT_H], &mut raw)?;

        Ok([
            i16::from_be_bytes([raw[0], raw[1]]),
            i16::from_be_bytes([raw[2], raw[3]]),
            i16::from_be_bytes([raw[4], raw[5]]),
        ])
    }

    /// Give the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> AccelSource for Mpu6050<I2C> {
    fn read_accel(&mut self) -> Result<AccelSample, SensorError> {
        let [x, y, z] = self.read_raw().map_err(|e| classify(&e))?;
        Ok(AccelSample::new(
            f32::from(x) / ACCEL_SCALE_2G,
            f32::from(y) / ACCEL_SCALE_2G,
            f32::from(z) / ACCEL_SCALE_2G,
        ))
    }
}

/// Map a bus error onto retry-next-tick vs. device-gone.
pub fn classify<E: embedded_hal::i2c::Error>(err: &E) -> SensorError {
    match err.kind() {
        ErrorKind::Bus | ErrorKind::ArbitrationLoss | ErrorKind::Overrun => {
            SensorError::transient(format!("{err:?}"))
        }
        _ => SensorError::disconnected(format!("{err:?}")),
    }
}
