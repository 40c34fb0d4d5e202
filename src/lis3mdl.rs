// Copyright (c) 2022, Zachary D. Olkin.
// This code is provided under the MIT license.

/// Typed views of the control and status registers.
pub mod bits;

/// The i2c module holds the register transport used when the device sits on an I2C bus
pub mod i2c;

/// The SPI module holds the register transport used when the device sits on an SPI bus
pub mod spi;

/// Output data rate and full scale tables, identity check and init sequence.
pub mod config;

/// Static channel descriptors and the scan mask.
pub mod channel;

/// The driver instance: device state and the raw read/write facade.
pub mod device;

/// Reads the enabled axes and assembles output records.
pub mod capture;

/// Interrupt line negotiation and the interrupt/deferred split of a capture cycle.
pub mod trigger;

use strum::{EnumIter, IntoStaticStr};

/// Expected content of the WHO_AM_I register.
pub const WHO_AM_I_VALUE: u8 = 0x3D;

/// 7-bit I2C address with SDO/SA1 tied low.
pub const DEFAULT_ADDRESS: u8 = 0x1C;
/// 7-bit I2C address with SDO/SA1 tied high.
pub const ALTERNATE_ADDRESS: u8 = 0x1E;

/// Register map of the LIS3MDL. Every register is 8 bits wide, the output registers are the low
/// byte of a little endian 16-bit pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, IntoStaticStr)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Registers {
    /// Identity register, reads 0x3D
    WhoAmI = 0x0F,
    /// Temperature enable, XY operating mode, output data rate, self test
    CtrlReg1 = 0x20,
    /// Full scale, reboot, soft reset
    CtrlReg2 = 0x21,
    /// Low power and conversion mode
    CtrlReg3 = 0x22,
    /// Z operating mode and endianness
    CtrlReg4 = 0x23,
    /// Fast read and block data update. Reserved by this driver.
    CtrlReg5 = 0x24,
    /// Data ready and overrun flags
    StatusReg = 0x27,
    /// X axis output, low byte
    OutXL = 0x28,
    /// Y axis output, low byte
    OutYL = 0x2A,
    /// Z axis output, low byte
    OutZL = 0x2C,
    /// Interrupt configuration
    IntCfg = 0x30,
}

impl Registers {
    /// Register address on the bus, without any transport flags.
    pub const fn addr(self) -> u8 {
        self as u8
    }

    /// Data sheet style name of the register, for diagnostics.
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// The possible errors that the driver can return.
///
/// The `BusError` option is for when a HAL function using either the SPI or I2C bus fails.
/// During bring-up it aborts the init sequence, during capture it only drops the current record.
///
/// `InvalidArgument` is for a rate, scale or info kind the device does not support. No state is
/// changed when it is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagError<E> {
    /// An error occurred when using the bus
    BusError(E),
    /// WHO_AM_I did not read 0x3D, holds the value that was read
    InvalidDevice(u8),
    /// An invalid input was passed to the function
    InvalidArgument,
    /// The operation conflicts with an active buffered capture
    Busy,
    /// The trigger was disabled and can not be armed again
    TriggerDisabled,
    /// The interrupt line could not be configured or requested
    ResourceUnavailable,
}

impl<E> From<E> for MagError<E> {
    fn from(error: E) -> Self {
        MagError::BusError(error)
    }
}

#[cfg(feature = "defmt")]
impl<E> defmt::Format for MagError<E> {
    fn format(&self, fmt: defmt::Formatter) {
        match *self {
            MagError::BusError(_) => defmt::write!(fmt, "Bus Error!"),
            MagError::InvalidDevice(id) => defmt::write!(fmt, "Invalid WHO_AM_I: {=u8:#x}", id),
            MagError::InvalidArgument => defmt::write!(fmt, "Invalid input in the function!"),
            MagError::Busy => defmt::write!(fmt, "Buffered capture is active!"),
            MagError::TriggerDisabled => defmt::write!(fmt, "Trigger is disabled!"),
            MagError::ResourceUnavailable => defmt::write!(fmt, "Interrupt line unavailable!"),
        }
    }
}

/// Shifts `value` into the field selected by `mask`.
///
/// The shift is the position of the lowest set bit of the mask and bits of `value` that fall
/// outside the field are dropped. Returns `None` for an empty mask.
pub const fn field_prep(mask: u8, value: u8) -> Option<u8> {
    if mask == 0 {
        return None;
    }
    Some((value << mask.trailing_zeros()) & mask)
}

/// Byte level access to the register space of the device.
///
/// Implementations assume exclusive, serialized access to the bus: one transaction is in flight at
/// a time and no queuing happens inside the transport.
pub trait RegisterInterface {
    /// Error reported by the underlying bus.
    type Error;

    /// Reads a single register.
    fn read_register(&mut self, reg: u8) -> Result<u8, Self::Error>;

    /// Writes a single register.
    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Self::Error>;

    /// Reads `buf.len()` consecutive registers starting at `reg` using the device side address
    /// auto-increment.
    fn bulk_read(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Read-modify-write of the bits selected by `mask`.
    ///
    /// `value` is shifted to the lowest set bit of `mask`. Nothing is written back when the
    /// register already holds the requested field.
    fn update_bits(&mut self, reg: u8, mask: u8, value: u8) -> Result<(), MagError<Self::Error>> {
        let field = field_prep(mask, value).ok_or(MagError::InvalidArgument)?;

        let current = self.read_register(reg)?;
        let next = (current & !mask) | field;
        if next != current {
            self.write_register(reg, next)?;
        }
        trace!("update_bits {:#x}: {:#x} -> {:#x}", reg, current, next);

        Ok(())
    }
}

impl<T: RegisterInterface + ?Sized> RegisterInterface for &mut T {
    type Error = T::Error;

    fn read_register(&mut self, reg: u8) -> Result<u8, Self::Error> {
        (**self).read_register(reg)
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Self::Error> {
        (**self).write_register(reg, value)
    }

    fn bulk_read(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        (**self).bulk_read(reg, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_prep_rate_mask() {
        // CTRL_REG1 rate field, bits 4:1
        assert_eq!(field_prep(0x1E, 0b0000), Some(0x00));
        assert_eq!(field_prep(0x1E, 0b0001), Some(0x02));
        assert_eq!(field_prep(0x1E, 0b1110), Some(0x1C));
        assert_eq!(field_prep(0x1E, 0b1111), Some(0x1E));
        assert_eq!(field_prep(0x1E, 0xFF), Some(0x1E));
    }

    #[test]
    fn field_prep_scale_mask() {
        // CTRL_REG2 full scale field, bits 6:5
        assert_eq!(field_prep(0x60, 0b00), Some(0x00));
        assert_eq!(field_prep(0x60, 0b01), Some(0x20));
        assert_eq!(field_prep(0x60, 0b10), Some(0x40));
        assert_eq!(field_prep(0x60, 0b11), Some(0x60));
        assert_eq!(field_prep(0x60, 0b100), Some(0x00));
    }

    #[test]
    fn field_prep_rejects_empty_mask() {
        assert_eq!(field_prep(0, 1), None);
    }

    #[test]
    fn register_names() {
        assert_eq!(Registers::WhoAmI.addr(), 0x0F);
        assert_eq!(Registers::OutZL.addr(), 0x2C);
        assert_eq!(Registers::CtrlReg4.name(), "CtrlReg4");
    }
}
