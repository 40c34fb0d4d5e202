// Copyright (c) 2022, Zachary D. Olkin.
// This code is provided under the MIT license.

use crate::lis3mdl::bits::StatusReg;
use crate::lis3mdl::capture::CaptureStats;
use crate::lis3mdl::channel::{Channel, ScanMask, MAX_RECORD_BYTES};
use crate::lis3mdl::config::{DataRate, FullScale};
use crate::lis3mdl::{MagError, RegisterInterface, Registers};

use strum::IntoEnumIterator;

/// Scan buffer for three samples plus the timestamp, aligned so the timestamp slot is too.
#[repr(C, align(8))]
pub(crate) struct ScanBuffer(pub(crate) [u8; MAX_RECORD_BYTES]);

/// Per device state. Created with the defaults of the init sequence, owned by the driver.
pub(crate) struct DeviceState {
    pub(crate) gain: FullScale,
    pub(crate) rate: DataRate,
    pub(crate) enabled: bool,
    pub(crate) hw_timestamp: i64,
    pub(crate) scratch: ScanBuffer,
}

impl Default for DeviceState {
    fn default() -> Self {
        DeviceState {
            gain: FullScale::Gauss4,
            rate: DataRate::Hz0_625,
            enabled: false,
            hw_timestamp: 0,
            scratch: ScanBuffer([0; MAX_RECORD_BYTES]),
        }
    }
}

/// What a [`Lis3mdl::read_value`] or [`Lis3mdl::write_value`] call is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InfoKind {
    /// Unscaled sample of one axis
    Raw,
    /// Sample converted to physical units. Not provided by this driver.
    Processed,
    /// Sensitivity, shared by all axes
    Scale,
    /// Offset to apply before scaling. Not provided by this driver.
    Offset,
    /// Output data rate, shared by all axes
    SampleRate,
}

/// Value returned by [`Lis3mdl::read_value`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Value {
    /// Plain integer
    Int(i32),
    /// `integer + micro / 1_000_000`
    IntPlusMicro(i32, i32),
    /// `numerator / denominator`
    Fractional(i32, i32),
}

impl Value {
    /// The value as a float.
    pub fn as_f32(self) -> f32 {
        match self {
            Value::Int(v) => v as f32,
            Value::IntPlusMicro(v, micro) => v as f32 + micro as f32 / 1_000_000.0,
            Value::Fractional(num, den) => num as f32 / den as f32,
        }
    }
}

/// The LIS3MDL driver. Instantiate this struct in your application code then use it to configure
/// the magnetometer and feed it to the deferred half of a [`Trigger`](crate::lis3mdl::trigger::Trigger).
///
/// It is generic over the register transport, see [`SpiInterface`](crate::lis3mdl::spi::SpiInterface)
/// and [`I2cInterface`](crate::lis3mdl::i2c::I2cInterface).
pub struct Lis3mdl<BUS> {
    pub(crate) bus: BUS,
    pub(crate) state: DeviceState,
    pub(crate) scan_mask: ScanMask,
    pub(crate) stats: CaptureStats,
}

impl<BUS> Lis3mdl<BUS> {
    /// Sensitivity in micro-gauss per LSB.
    pub fn gain(&self) -> u32 {
        self.state.gain.micro_gain()
    }

    /// Output data rate in milli-Hz.
    pub fn rate(&self) -> u32 {
        self.state.rate.millihertz()
    }

    /// Current full scale.
    pub fn full_scale(&self) -> FullScale {
        self.state.gain
    }

    /// Current output data rate.
    pub fn data_rate(&self) -> DataRate {
        self.state.rate
    }

    /// Checks if buffered capture is enabled. Returns true if enabled, false if otherwise.
    pub fn is_enabled(&self) -> bool {
        self.state.enabled
    }

    /// Axes included in buffered capture.
    pub fn scan_mask(&self) -> ScanMask {
        self.scan_mask
    }

    /// Counters of emitted and lost records.
    pub fn stats(&self) -> CaptureStats {
        self.stats
    }
}

impl<BUS, E> Lis3mdl<BUS>
where
    BUS: RegisterInterface<Error = E>,
{
    /// Create a driver with the default state: ±4 gauss, 0.625 Hz, buffer disabled.
    ///
    /// Nothing is sent on the bus, call [`init`](Self::init) to bring the device up.
    pub fn new(bus: BUS) -> Self {
        Lis3mdl {
            bus,
            state: DeviceState::default(),
            scan_mask: ScanMask::EMPTY,
            stats: CaptureStats::default(),
        }
    }

    /// Direct access to the register transport.
    pub fn bus(&mut self) -> &mut BUS {
        &mut self.bus
    }

    /// Give the bus back. Refused while buffered capture is enabled, disable the trigger first.
    pub fn destroy(self) -> Result<BUS, Self> {
        if self.state.enabled {
            return Err(self);
        }
        Ok(self.bus)
    }

    /// Who Am I? Reads the identity register and reports the value.
    ///
    /// Useful for testing that the magnetometer is properly connected. It should read 0x3D.
    pub fn who_am_i(&mut self) -> Result<u8, MagError<E>> {
        Ok(self.bus.read_register(Registers::WhoAmI.addr())?)
    }

    /// Reads the data ready and overrun flags.
    pub fn status(&mut self) -> Result<StatusReg, MagError<E>> {
        Ok(StatusReg::from(self.bus.read_register(Registers::StatusReg.addr())?))
    }

    /// Logs the content of every named register at debug level.
    pub fn dump_config(&mut self) -> Result<(), MagError<E>> {
        for reg in Registers::iter() {
            let value = self.bus.read_register(reg.addr())?;
            debug!("{}({:#x}): {:#x}", reg.name(), reg.addr(), value);
        }
        Ok(())
    }

    /// Read one attribute of a channel.
    ///
    /// * `Raw` reads the axis output registers as a signed 16-bit sample, no scaling applied.
    ///   Returns `Busy` while buffered capture is enabled.
    /// * `Scale` returns `IntPlusMicro(0, gain)`, gain being micro-gauss per LSB.
    /// * `SampleRate` returns `Fractional(rate, 1000)`, rate being milli-Hz.
    ///
    /// Anything else, including any kind on the timestamp channel, is `InvalidArgument`.
    pub fn read_value(&mut self, channel: Channel, kind: InfoKind) -> Result<Value, MagError<E>> {
        let axis = match channel {
            Channel::Magnetic(axis) => axis,
            Channel::Timestamp => return Err(MagError::InvalidArgument),
        };

        match kind {
            InfoKind::Raw => {
                if self.state.enabled {
                    return Err(MagError::Busy);
                }
                let mut buf = [0; 2];
                self.bus.bulk_read(axis.register().addr(), &mut buf)?;
                Ok(Value::Int(i16::from_le_bytes(buf) as i32))
            }
            InfoKind::Scale => Ok(Value::IntPlusMicro(0, self.gain() as i32)),
            InfoKind::SampleRate => Ok(Value::Fractional(self.rate() as i32, 1000)),
            _ => Err(MagError::InvalidArgument),
        }
    }

    /// Write one attribute of a channel.
    ///
    /// * `Scale`: `val2` is the sensitivity in micro-gauss per LSB, see [`write_scale`](Self::write_scale).
    /// * `SampleRate`: the rate is `val` Hz plus `val2` micro-Hz and is truncated to milli-Hz,
    ///   see [`write_rate`](Self::write_rate).
    ///
    /// Anything else is `InvalidArgument`.
    pub fn write_value(
        &mut self,
        channel: Channel,
        kind: InfoKind,
        val: i32,
        val2: i32,
    ) -> Result<(), MagError<E>> {
        if channel == Channel::Timestamp {
            return Err(MagError::InvalidArgument);
        }

        match kind {
            InfoKind::Scale => {
                let gain = u32::try_from(val2).map_err(|_| MagError::InvalidArgument)?;
                self.write_scale(gain)
            }
            InfoKind::SampleRate => {
                let mhz = val
                    .checked_mul(1000)
                    .and_then(|hz| hz.checked_add(val2 / 1000))
                    .and_then(|mhz| u32::try_from(mhz).ok())
                    .ok_or(MagError::InvalidArgument)?;
                self.write_rate(mhz)
            }
            _ => Err(MagError::InvalidArgument),
        }
    }
}
