// Copyright (c) 2022, Zachary D. Olkin.
// This code is provided under the MIT license.

use crate::lis3mdl::{RegisterInterface, DEFAULT_ADDRESS};

use embedded_hal::i2c::I2c;

/// Sub-address flag that makes the device auto-increment across a multi byte read.
const I2C_AUTO_INCREMENT: u8 = 1 << 7;

/// Register transport over an I2C bus.
pub struct I2cInterface<I2C> {
    i2c: I2C,
    addr: u8,
}

impl<I2C> I2cInterface<I2C>
where
    I2C: I2c,
{
    /// Wrap an I2C bus.
    ///
    /// The 7-bit address is specified as `addr`, see [`DEFAULT_ADDRESS`] and
    /// [`ALTERNATE_ADDRESS`](crate::lis3mdl::ALTERNATE_ADDRESS).
    pub fn new(i2c: I2C, addr: u8) -> Self {
        I2cInterface { i2c, addr }
    }

    /// Wrap an I2C bus using the address selected by SDO tied low.
    pub fn with_default_address(i2c: I2C) -> Self {
        Self::new(i2c, DEFAULT_ADDRESS)
    }

    /// Give the I2C bus back.
    pub fn destroy(self) -> I2C {
        self.i2c
    }
}

impl<I2C> RegisterInterface for I2cInterface<I2C>
where
    I2C: I2c,
{
    type Error = I2C::Error;

    fn read_register(&mut self, reg: u8) -> Result<u8, Self::Error> {
        let mut buf = [0];
        self.i2c.write_read(self.addr, &[reg], &mut buf)?;
        Ok(buf[0])
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Self::Error> {
        self.i2c.write(self.addr, &[reg, value])
    }

    fn bulk_read(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.i2c
            .write_read(self.addr, &[reg | I2C_AUTO_INCREMENT], buf)
    }
}
