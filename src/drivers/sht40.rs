//! Sensirion SHT40 temperature / humidity sensor.
//!
//! Generic over any `embedded_hal::i2c::I2c` bus. One measurement is a
//! single-byte trigger, a conversion wait, then a 6-byte read:
//!
//! ```text
//! ┌────────┬────────┬──────┬────────┬────────┬──────┐
//! │ T msb  │ T lsb  │ CRC  │ RH msb │ RH lsb │ CRC  │
//! └────────┴────────┴──────┴────────┴────────┴──────┘
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

use crate::app::ports::BoardPort;
use crate::error::SensorError;

/// Measure T & RH with high precision (high repeatability).
pub const CMD_MEASURE_HIGH_PRECISION: u8 = 0xFD;

/// Worst-case high-precision conversion time.
const MEASURE_DELAY_MS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub temperature_c: f32,
    /// Clamped to 0–100.
    pub humidity_pct: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sht40Error<E> {
    Bus(E),
    /// A data word failed its checksum.
    Crc,
}

pub struct Sht40<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Sht40<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn measure(&mut self, delay: &mut impl DelayNs) -> Result<Measurement, Sht40Error<I2C::Error>> {
        self.i2c
            .write(self.address, &[CMD_MEASURE_HIGH_PRECISION])
            .map_err(Sht40Error::Bus)?;
        delay.delay_ms(MEASURE_DELAY_MS);
        let mut buf = [0u8; 6];
        self.i2c.read(self.address, &mut buf).map_err(Sht40Error::Bus)?;

        if crc8(&buf[0..2]) != buf[2] || crc8(&buf[3..5]) != buf[5] {
            return Err(Sht40Error::Crc);
        }
        let t_ticks = u16::from_be_bytes([buf[0], buf[1]]);
        let rh_ticks = u16::from_be_bytes([buf[3], buf[4]]);
        Ok(convert(t_ticks, rh_ticks))
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

/// Raw ticks to physical units.
pub fn convert(t_ticks: u16, rh_ticks: u16) -> Measurement {
    let t = -45.0 + 175.0 * f32::from(t_ticks) / 65535.0;
    let rh = -6.0 + 125.0 * f32::from(rh_ticks) / 65535.0;
    Measurement {
        temperature_c: t,
        humidity_pct: rh.clamp(0.0, 100.0),
    }
}

/// Sensirion CRC-8: polynomial 0x31, init 0xFF.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0xFFu8;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 { (crc << 1) ^ 0x31 } else { crc << 1 };
        }
    }
    crc
}

// ── BoardPort bridge ──────────────────────────────────────────

/// Exposes the board's I2C primitives as an `embedded_hal` bus.
pub struct BoardI2c<'a> {
    board: &'a dyn BoardPort,
}

impl<'a> BoardI2c<'a> {
    pub fn new(board: &'a dyn BoardPort) -> Self {
        Self { board }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardI2cError(pub SensorError);

impl embedded_hal::i2c::Error for BoardI2cError {
    fn kind(&self) -> ErrorKind {
        match self.0 {
            SensorError::BusNack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown),
            _ => ErrorKind::Other,
        }
    }
}

impl ErrorType for BoardI2c<'_> {
    type Error = BoardI2cError;
}

impl I2c for BoardI2c<'_> {
    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
        for op in operations {
            let result = match op {
                Operation::Write(bytes) => self.board.i2c_write(address, bytes),
                Operation::Read(buf) => self.board.i2c_read(address, buf),
            };
            result.map_err(BoardI2cError)?;
        }
        Ok(())
    }
}

/// `DelayNs` on top of `std::thread::sleep`.
pub struct ThreadDelay;

impl DelayNs for ThreadDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(core::time::Duration::from_nanos(ns.into()));
    }
}
