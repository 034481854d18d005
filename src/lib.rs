//! # VCNL4010 Proximity and Ambient Light Sensor Driver
//!
//! This crate provides a `no_std` driver for Vishay's VCNL4010 combined
//! proximity and ambient light sensor, communicating over I2C.
//!
//! The driver is blocking by default; enable the `async` feature to get the
//! same API as `async fn`s on top of `embedded-hal-async`.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use vcnl4010::Vcnl4010;
//!
//! let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
//! let mut sensor = Vcnl4010::new(i2c).unwrap();
//!
//! let proximity = sensor.get_proximity().unwrap();
//! let lux = sensor.get_ambient_lux().unwrap();
//! println!("proximity: {proximity}, ambient: {lux} lux");
//! ```
//!
//! ## Re-entrancy
//!
//! Every operation takes `&mut self`: the driver stages each transaction in
//! an internal scratch buffer and runs multi-step register sequences
//! (read-modify-write, trigger-then-poll), so a single instance must not be
//! shared between tasks without external serialization. Wrap the whole
//! driver in a mutex if concurrent access is required, not just the bus.
#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod fmt; // <-- must be first module!

#[cfg(not(feature = "async"))]
use embedded_hal::i2c::I2c;
#[cfg(feature = "async")]
use embedded_hal_async::i2c::I2c;

/// Default I2C address of the VCNL4010.
pub const DEFAULT_I2C_ADDRESS: u8 = 0x13;

// Command register bits.
const MEASURE_PROXIMITY: u8 = 0x08;
const MEASURE_AMBIENT: u8 = 0x10;
const PROXIMITY_READY: u8 = 0x20;
const AMBIENT_READY: u8 = 0x40;

// Lux value per 16-bit ambient count. The device-side ambient parameter
// register is never touched by this driver, so the factor is fixed.
const AMBIENT_LUX_SCALE: f32 = 0.25;

/// Register addresses for the VCNL4010 sensor.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// Command register, measurement trigger and ready flags (0x80)
    Command = 0x80,
    /// Product ID revision register (0x81)
    ProductId = 0x81,
    /// Proximity sample rate index register (0x82)
    ProximityRate = 0x82,
    /// IR LED current register, lower 6 bits in units of 10 mA (0x83)
    IrLed = 0x83,
    /// Ambient light parameter register (0x84)
    AmbientParameter = 0x84,
    /// 16-bit ambient light result register (0x85)
    AmbientData = 0x85,
    /// 16-bit proximity result register (0x87)
    ProximityData = 0x87,
    /// Interrupt control register (0x89)
    InterruptControl = 0x89,
    /// Proximity modulator delay/dead-time adjustment register (0x8A)
    ProximityAdjust = 0x8A,
    /// Interrupt status register (0x8E)
    InterruptStatus = 0x8E,
    /// Proximity modulator timing register, bits 3-4 select the
    /// modulation frequency (0x8F)
    ModulatorTiming = 0x8F,
}

impl From<Register> for u8 {
    fn from(r: Register) -> Self {
        r as u8
    }
}

/// Proximity measurement rate options for the VCNL4010 sensor.
///
/// The value is an index into the device's fixed rate table; the driver
/// stores and returns only the index. See the datasheet for how the rate
/// trades power consumption against proximity detection accuracy.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleRate {
    /// 1.95 measurements/sec (default)
    Rate1_95,
    /// 3.90625 measurements/sec
    Rate3_90625,
    /// 7.8125 measurements/sec
    Rate7_8125,
    /// 16.625 measurements/sec
    Rate16_625,
    /// 31.25 measurements/sec
    Rate31_25,
    /// 62.5 measurements/sec
    Rate62_5,
    /// 125 measurements/sec
    Rate125,
    /// 250 measurements/sec
    Rate250,
    /// Unrecognized register contents
    Unknown(u8),
}

impl From<SampleRate> for u8 {
    fn from(rate: SampleRate) -> Self {
        match rate {
            SampleRate::Rate1_95 => 0,
            SampleRate::Rate3_90625 => 1,
            SampleRate::Rate7_8125 => 2,
            SampleRate::Rate16_625 => 3,
            SampleRate::Rate31_25 => 4,
            SampleRate::Rate62_5 => 5,
            SampleRate::Rate125 => 6,
            SampleRate::Rate250 => 7,
            SampleRate::Unknown(value) => value,
        }
    }
}

impl From<u8> for SampleRate {
    fn from(value: u8) -> Self {
        match value {
            0 => SampleRate::Rate1_95,
            1 => SampleRate::Rate3_90625,
            2 => SampleRate::Rate7_8125,
            3 => SampleRate::Rate16_625,
            4 => SampleRate::Rate31_25,
            5 => SampleRate::Rate62_5,
            6 => SampleRate::Rate125,
            7 => SampleRate::Rate250,
            _ => {
                warn!("Unknown SampleRate value: {}", value);
                SampleRate::Unknown(value)
            }
        }
    }
}

/// Proximity modulator timing options for the VCNL4010 sensor.
///
/// This is the frequency of the IR square wave used for the proximity
/// measurement. The datasheet recommends leaving it at the default
/// 390.625 kHz.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModulatorFrequency {
    /// 390.625 kHz (default)
    Freq390K625,
    /// 781.25 kHz
    Freq781K25,
    /// 1.5625 MHz
    Freq1M5625,
    /// 3.125 MHz
    Freq3M125,
    /// Unrecognized register contents
    Unknown(u8),
}

impl From<ModulatorFrequency> for u8 {
    fn from(freq: ModulatorFrequency) -> Self {
        match freq {
            ModulatorFrequency::Freq390K625 => 0,
            ModulatorFrequency::Freq781K25 => 1,
            ModulatorFrequency::Freq1M5625 => 2,
            ModulatorFrequency::Freq3M125 => 3,
            ModulatorFrequency::Unknown(value) => value,
        }
    }
}

impl From<u8> for ModulatorFrequency {
    fn from(value: u8) -> Self {
        match value {
            0 => ModulatorFrequency::Freq390K625,
            1 => ModulatorFrequency::Freq781K25,
            2 => ModulatorFrequency::Freq1M5625,
            3 => ModulatorFrequency::Freq3M125,
            _ => {
                warn!("Unknown ModulatorFrequency value: {}", value);
                ModulatorFrequency::Unknown(value)
            }
        }
    }
}

/// VCNL4010 proximity and ambient light sensor driver.
///
/// The driver owns the I2C bus handle and the device address, and stages
/// every transaction through an internal 3-byte scratch buffer. All device
/// state (LED current, sample rate, modulator frequency) lives on the
/// sensor itself; getters re-query the device on every call.
///
/// A single instance is not re-entrant: the scratch buffer and the
/// multi-step register sequences require exclusive access, which the
/// `&mut self` receivers enforce within one task. Serialize externally if
/// the sensor is shared.
pub struct Vcnl4010<I2C> {
    /// I2C interface for communication with the sensor
    i2c: I2C,
    /// 7-bit I2C slave address of the sensor
    address: u8,
    /// Scratch buffer for register transactions
    buffer: [u8; 3],
    /// Maximum number of ready polls per measurement, `None` = poll forever
    poll_limit: Option<u32>,
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), keep_self),
    async(feature = "async", keep_self)
)]
impl<I2C, E> Vcnl4010<I2C>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
{
    /// Creates a new driver for a sensor at the default address (0x13).
    ///
    /// Probes the product ID register to verify a VCNL4010 is present, then
    /// writes the factory power-on defaults: LED current 200 mA, the
    /// slowest sample rate (1.95 measurements/sec) and the lowest modulator
    /// frequency (390.625 kHz), and enables the on-chip self-timed
    /// interrupt mode used for measurement polling.
    ///
    /// # Errors
    ///
    /// * `Err(Error::UnknownDevice(id))` - If the product ID does not
    ///   identify a VCNL4010. The check is not retried; fix the wiring.
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use vcnl4010::Vcnl4010;
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let mut sensor = Vcnl4010::new(i2c).unwrap();
    /// ```
    pub async fn new(i2c: I2C) -> Result<Self, Error<E>> {
        Self::new_with_address(i2c, DEFAULT_I2C_ADDRESS).await
    }

    /// Creates a new driver for a sensor at a non-default address.
    ///
    /// Behaves exactly like [`new`](Self::new) otherwise.
    ///
    /// # Errors
    ///
    /// * `Err(Error::UnknownDevice(id))` - If the product ID does not
    ///   identify a VCNL4010
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn new_with_address(i2c: I2C, address: u8) -> Result<Self, Error<E>> {
        let mut sensor = Self {
            i2c,
            address,
            buffer: [0; 3],
            poll_limit: None,
        };
        let revision = sensor.read_byte(Register::ProductId).await?;
        if revision & 0xF0 != 0x20 {
            error!("Failed to find VCNL4010, product ID: {}", revision);
            return Err(Error::UnknownDevice(revision));
        }
        info!("Found VCNL4010, product revision: {}", revision & 0x0F);
        sensor.set_led_current(20).await?;
        sensor.set_samplerate(SampleRate::Rate1_95).await?;
        sensor.set_frequency(ModulatorFrequency::Freq390K625).await?;
        sensor.write_byte(Register::InterruptControl, 0x08).await?;
        Ok(sensor)
    }

    /// Releases the underlying I2C bus and destroys the driver.
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Bounds the ready-polling loop of the measurement functions.
    ///
    /// By default (`None`) the driver polls the command register forever,
    /// matching the sensor's documented behavior; if the device stops
    /// responding mid-measurement this blocks indefinitely. With
    /// `Some(n)`, [`get_proximity`](Self::get_proximity) and
    /// [`get_ambient`](Self::get_ambient) give up after `n` unsuccessful
    /// polls and return [`Error::Timeout`]. Each poll is one I2C read, so
    /// the bound is an iteration count, not wall-clock time.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use vcnl4010::Vcnl4010;
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let mut sensor = Vcnl4010::new(i2c).unwrap();
    ///
    /// sensor.set_poll_limit(Some(10_000));
    /// match sensor.get_proximity() {
    ///     Ok(proximity) => println!("proximity: {proximity}"),
    ///     Err(vcnl4010::Error::Timeout) => println!("sensor stopped responding"),
    ///     Err(e) => println!("bus error: {e}"),
    /// }
    /// ```
    pub fn set_poll_limit(&mut self, limit: Option<u32>) {
        self.poll_limit = limit;
    }

    /// The current of the IR LED in units of 10 mA.
    ///
    /// Ranges from 0 (0 mA, off) to 20 (200 mA). The default is 20. See
    /// the datasheet for how LED current impacts proximity measurements.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn get_led_current(&mut self) -> Result<u8, Error<E>> {
        Ok(self.read_byte(Register::IrLed).await? & 0x3F)
    }

    /// Sets the current of the IR LED in units of 10 mA.
    ///
    /// # Errors
    ///
    /// * `Err(Error::InvalidArgument)` - If `value` is greater than 20.
    ///   Nothing is written to the device.
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn set_led_current(&mut self, value: u8) -> Result<(), Error<E>> {
        if value > 20 {
            error!("Invalid LED current: {}", value);
            return Err(Error::InvalidArgument);
        }
        self.write_byte(Register::IrLed, value).await
    }

    /// The current of the IR LED in milliamps (0-200).
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn get_led_current_ma(&mut self) -> Result<u16, Error<E>> {
        Ok(u16::from(self.get_led_current().await?) * 10)
    }

    /// Sets the current of the IR LED in milliamps.
    ///
    /// The chip only supports current changes in 10 mA increments, so the
    /// value is quantized down: setting 123 mA programs the same on-device
    /// value as 120 mA. Use [`set_led_current`](Self::set_led_current) to
    /// set the register value without unit conversion.
    ///
    /// # Errors
    ///
    /// * `Err(Error::InvalidArgument)` - If the quantized value exceeds
    ///   20 (200 mA)
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use vcnl4010::Vcnl4010;
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let mut sensor = Vcnl4010::new(i2c).unwrap();
    ///
    /// sensor.set_led_current_ma(123).unwrap();
    /// assert_eq!(sensor.get_led_current_ma().unwrap(), 120);
    /// ```
    #[allow(clippy::cast_possible_truncation)]
    pub async fn set_led_current_ma(&mut self, ma: u16) -> Result<(), Error<E>> {
        let value = ma / 10;
        if value > 20 {
            error!("Invalid LED current: {} mA", ma);
            return Err(Error::InvalidArgument);
        }
        self.set_led_current(value as u8).await
    }

    /// The proximity measurement rate.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn get_samplerate(&mut self) -> Result<SampleRate, Error<E>> {
        let value = self.read_byte(Register::ProximityRate).await?;
        Ok(SampleRate::from(value))
    }

    /// Sets the proximity measurement rate.
    ///
    /// # Errors
    ///
    /// * `Err(Error::InvalidArgument)` - If the rate index is out of range
    ///   (only possible through [`SampleRate::Unknown`]). Nothing is
    ///   written to the device.
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn set_samplerate(&mut self, rate: SampleRate) -> Result<(), Error<E>> {
        let value = u8::from(rate);
        if value > 7 {
            error!("Invalid sample rate index: {}", value);
            return Err(Error::InvalidArgument);
        }
        self.write_byte(Register::ProximityRate, value).await
    }

    /// The proximity modulator timing.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn get_frequency(&mut self) -> Result<ModulatorFrequency, Error<E>> {
        let timing = self.read_byte(Register::ModulatorTiming).await?;
        Ok(ModulatorFrequency::from((timing >> 3) & 0x03))
    }

    /// Sets the proximity modulator timing.
    ///
    /// The timing register holds unrelated bits, so the frequency field is
    /// read-modify-written: bits 3-4 are replaced, everything else is
    /// preserved.
    ///
    /// # Errors
    ///
    /// * `Err(Error::InvalidArgument)` - If the frequency index is out of
    ///   range (only possible through [`ModulatorFrequency::Unknown`]).
    ///   Nothing is written to the device.
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn set_frequency(&mut self, freq: ModulatorFrequency) -> Result<(), Error<E>> {
        let value = u8::from(freq);
        if value > 3 {
            error!("Invalid modulator frequency index: {}", value);
            return Err(Error::InvalidArgument);
        }
        let mut timing = self.read_byte(Register::ModulatorTiming).await?;
        timing &= !0b0001_1000;
        timing |= value << 3;
        self.write_byte(Register::ModulatorTiming, timing).await
    }

    /// The detected proximity of an object in front of the sensor.
    ///
    /// Triggers a one-shot measurement and blocks until the sensor reports
    /// it complete. The result is a unit-less unsigned 16-bit value
    /// INVERSELY proportional to the distance of an object in front of the
    /// sensor (up to a max of ~200 mm): a value of 10 is an object farther
    /// away than a value of 1000. There is no conversion to absolute
    /// distance, only relative comparisons are possible.
    ///
    /// # Errors
    ///
    /// * `Err(Error::Timeout)` - If a poll limit is configured via
    ///   [`set_poll_limit`](Self::set_poll_limit) and the measurement did
    ///   not complete within it
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use vcnl4010::Vcnl4010;
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let mut sensor = Vcnl4010::new(i2c).unwrap();
    ///
    /// let near = sensor.get_proximity().unwrap();
    /// // ... move an object closer to the sensor ...
    /// let nearer = sensor.get_proximity().unwrap();
    /// assert!(nearer > near);
    /// ```
    pub async fn get_proximity(&mut self) -> Result<u16, Error<E>> {
        self.measure(MEASURE_PROXIMITY, PROXIMITY_READY, Register::ProximityData)
            .await
    }

    /// The detected ambient light in front of the sensor.
    ///
    /// Triggers a one-shot measurement and blocks until the sensor reports
    /// it complete. The result is a unit-less unsigned 16-bit value with
    /// higher values for more detected light. See
    /// [`get_ambient_lux`](Self::get_ambient_lux) for a value in lux.
    ///
    /// # Errors
    ///
    /// * `Err(Error::Timeout)` - If a poll limit is configured via
    ///   [`set_poll_limit`](Self::set_poll_limit) and the measurement did
    ///   not complete within it
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn get_ambient(&mut self) -> Result<u16, Error<E>> {
        self.measure(MEASURE_AMBIENT, AMBIENT_READY, Register::AmbientData)
            .await
    }

    /// The detected ambient light in front of the sensor, in lux.
    ///
    /// This is the raw ambient count scaled by a fixed 0.25 lux/count
    /// factor. The ambient parameter register is left at its power-on value
    /// and is not accounted for in the conversion.
    ///
    /// # Errors
    ///
    /// * `Err(Error::Timeout)` - If a poll limit is configured via
    ///   [`set_poll_limit`](Self::set_poll_limit) and the measurement did
    ///   not complete within it
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn get_ambient_lux(&mut self) -> Result<f32, Error<E>> {
        let raw = self.get_ambient().await?;
        Ok(f32::from(raw) * AMBIENT_LUX_SCALE)
    }

    /// Runs one measurement: clear the interrupt status, set the trigger
    /// bit, poll the command register for the ready bit, read the result.
    async fn measure(
        &mut self,
        trigger: u8,
        ready: u8,
        data_register: Register,
    ) -> Result<u16, Error<E>> {
        // Clear the interrupt status bit, preserving the rest.
        let status = self.read_byte(Register::InterruptStatus).await?;
        self.write_byte(Register::InterruptStatus, status & !0x80)
            .await?;
        // Trigger the measurement.
        self.write_byte(Register::Command, trigger).await?;
        // Wait for the result. Without a poll limit this spins until the
        // device answers, which is forever if it never does.
        let mut attempts = 0u32;
        loop {
            let command = self.read_byte(Register::Command).await?;
            if command & ready != 0 {
                debug!("Measurement ready after {} polls", attempts);
                break;
            }
            attempts += 1;
            if let Some(limit) = self.poll_limit {
                if attempts >= limit {
                    error!("Measurement not ready after {} polls", attempts);
                    return Err(Error::Timeout);
                }
            }
        }
        self.read_word(data_register).await
    }

    /// Reads a single byte from a sensor register.
    ///
    /// Low-level escape hatch; most applications should use the
    /// higher-level accessors instead.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn read_byte(&mut self, register: Register) -> Result<u8, Error<E>> {
        let (wbuf, rbuf) = self.buffer.split_at_mut(1);
        wbuf[0] = register.into();
        self.i2c
            .write_read(self.address, wbuf, &mut rbuf[..1])
            .await?;
        Ok(rbuf[0])
    }

    /// Reads a 16-bit big-endian word from a sensor register.
    ///
    /// Low-level escape hatch; most applications should use the
    /// higher-level accessors instead.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn read_word(&mut self, register: Register) -> Result<u16, Error<E>> {
        let (wbuf, rbuf) = self.buffer.split_at_mut(1);
        wbuf[0] = register.into();
        self.i2c.write_read(self.address, wbuf, rbuf).await?;
        Ok(u16::from_be_bytes([rbuf[0], rbuf[1]]))
    }

    /// Writes a single byte to a sensor register.
    ///
    /// Low-level escape hatch; most applications should use the
    /// higher-level accessors instead.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn write_byte(&mut self, register: Register, value: u8) -> Result<(), Error<E>> {
        self.buffer[0] = register.into();
        self.buffer[1] = value;
        self.i2c.write(self.address, &self.buffer[..2]).await?;
        Ok(())
    }
}

/// Error type for VCNL4010 sensor operations.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E: core::fmt::Debug> {
    /// I2C communication error from the underlying hardware
    I2cError(E),
    /// Product ID read at startup did not identify a VCNL4010; carries the
    /// byte actually read
    UnknownDevice(u8),
    /// Configuration value outside the range the device accepts
    InvalidArgument,
    /// Measurement did not complete within the configured poll limit
    Timeout,
}

impl<E: core::fmt::Debug> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl<E: core::fmt::Debug> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Error::I2cError(error)
    }
}
