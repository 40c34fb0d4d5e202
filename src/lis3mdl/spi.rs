// Copyright (c) 2022, Zachary D. Olkin.
// This code is provided under the MIT license.

use crate::lis3mdl::RegisterInterface;

use embedded_hal::spi::{Operation, SpiDevice};

/// Read flag, first bit of the address byte.
const SPI_READ: u8 = 1 << 7;
/// Address auto-increment flag for multi byte transfers.
const SPI_AUTO_INCREMENT: u8 = 1 << 6;
/// Address bits left after the two flag bits.
const SPI_ADDR_MASK: u8 = 0x3F;

/// Register transport over a 4-wire SPI bus.
///
/// Chip select is handled by the `SpiDevice` implementation. Bulk reads set both flag bits so the
/// device auto-increments the address across the burst.
pub struct SpiInterface<SPI> {
    spi: SPI,
}

impl<SPI> SpiInterface<SPI>
where
    SPI: SpiDevice,
{
    /// Wrap an SPI device.
    pub fn new(spi: SPI) -> Self {
        SpiInterface { spi }
    }

    /// Give the SPI device back.
    pub fn destroy(self) -> SPI {
        self.spi
    }
}

impl<SPI> RegisterInterface for SpiInterface<SPI>
where
    SPI: SpiDevice,
{
    type Error = SPI::Error;

    fn read_register(&mut self, reg: u8) -> Result<u8, Self::Error> {
        let mut buf = [0];
        self.spi.transaction(&mut [
            Operation::Write(&[SPI_READ | (reg & SPI_ADDR_MASK)]),
            Operation::Read(&mut buf),
        ])?;
        Ok(buf[0])
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Self::Error> {
        self.spi.write(&[reg & SPI_ADDR_MASK, value])
    }

    fn bulk_read(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.spi.transaction(&mut [
            Operation::Write(&[SPI_READ | SPI_AUTO_INCREMENT | (reg & SPI_ADDR_MASK)]),
            Operation::Read(buf),
        ])
    }
}
