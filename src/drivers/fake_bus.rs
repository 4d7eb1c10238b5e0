// In-memory I2C bus with a single register-mapped device, for driver tests.

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

#[derive(Debug)]
pub struct FakeError(pub ErrorKind);

impl embedded_hal::i2c::Error for FakeError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

pub struct FakeBus {
    device_address: u8,
    registers: [u8; 128],
    fail: Option<ErrorKind>,
    /// Number of upcoming transactions that fail with `fail`; `None` means all of them.
    fail_remaining: Option<u32>,
}

impl FakeBus {
    /// A bus with an MPU6050 answering at `address`.
    pub fn mpu6050(address: u8) -> Self {
        let mut registers = [0u8; 128];
        registers[0x75] = 0x68;
        registers[0x6B] = 0x40; // SLEEP set at power-on
        Self {
            device_address: address,
            registers,
            fail: None,
            fail_remaining: None,
        }
    }

    pub fn register(&self, reg: u8) -> u8 {
        self.registers[reg as usize]
    }

    pub fn set_registers(&mut self, start: u8, values: &[u8]) {
        let start = start as usize;
        self.registers[start..start + values.len()].copy_from_slice(values);
    }

    pub fn fail_with(&mut self, kind: Option<ErrorKind>) {
        self.fail = kind;
        self.fail_remaining = None;
    }

    pub fn fail_times(&mut self, kind: ErrorKind, times: u32) {
        self.fail = Some(kind);
        self.fail_remaining = Some(times);
    }
}

impl ErrorType for FakeBus {
    type Error = FakeError;
}

impl I2c for FakeBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if let Some(kind) = self.fail {
            match self.fail_remaining.as_mut() {
                Some(0) => self.fail = None,
                Some(n) => {
                    *n -= 1;
                    return Err(FakeError(kind));
                }
                None => return Err(FakeError(kind)),
            }
        }
        if address != self.device_address {
            return Err(FakeError(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)));
        }

        let mut pointer = 0usize;
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => {
                    if let Some((&reg, rest)) = bytes.split_first() {
                        pointer = reg as usize;
                        for (i, b) in rest.iter().enumerate() {
                            self.registers[pointer + i] = *b;
                        }
                    }
                }
                Operation::Read(buf) => {
                    for (i, b) in buf.iter_mut().enumerate() {
                        *b = self.registers[pointer + i];
                    }
                }
            }
        }
        Ok(())
    }
}
