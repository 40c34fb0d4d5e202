//! Host side doubles for the LIS3MDL driver: a register file behind the driver's register
//! interface, SPI and I2C devices that decode the driver's framing, an interrupt line that records
//! what was done to it, a settable clock and a record sink.

use std::cell::Cell;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::{i2c, spi};
use lis3mdl_driver::lis3mdl::capture::{Record, RecordSink};
use lis3mdl_driver::lis3mdl::channel::Axis;
use lis3mdl_driver::lis3mdl::trigger::{InterruptLine, LineConfig};
use lis3mdl_driver::lis3mdl::{RegisterInterface, WHO_AM_I_VALUE};

/// Error of the mock bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusFault;

/// One transaction seen by [`MockBus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusOp {
    /// Single register read
    Read(u8),
    /// Single register write
    Write(u8, u8),
    /// Burst read of `len` bytes
    BulkRead(u8, usize),
}

/// Register file with an auto-incrementing address pointer.
#[derive(Debug)]
pub struct MockBus {
    pub regs: [u8; 256],
    pub log: Vec<BusOp>,
    fail_reads: Vec<u8>,
    fail_writes: Vec<u8>,
}

impl MockBus {
    /// A device answering the identity check.
    pub fn new() -> Self {
        Self::with_identity(WHO_AM_I_VALUE)
    }

    pub fn with_identity(id: u8) -> Self {
        let mut regs = [0; 256];
        regs[0x0F] = id;
        MockBus {
            regs,
            log: Vec::new(),
            fail_reads: Vec::new(),
            fail_writes: Vec::new(),
        }
    }

    pub fn set_axis(&mut self, axis: Axis, value: i16) {
        let addr = axis.register().addr() as usize;
        self.regs[addr..addr + 2].copy_from_slice(&value.to_le_bytes());
    }

    pub fn fail_read(&mut self, reg: u8) {
        self.fail_reads.push(reg);
    }

    pub fn fail_write(&mut self, reg: u8) {
        self.fail_writes.push(reg);
    }

    pub fn clear_failures(&mut self) {
        self.fail_reads.clear();
        self.fail_writes.clear();
    }

    /// Writes in the order they were issued.
    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.log
            .iter()
            .filter_map(|op| match *op {
                BusOp::Write(reg, value) => Some((reg, value)),
                _ => None,
            })
            .collect()
    }

    pub fn bulk_reads(&self) -> Vec<u8> {
        self.log
            .iter()
            .filter_map(|op| match *op {
                BusOp::BulkRead(reg, _) => Some(reg),
                _ => None,
            })
            .collect()
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterInterface for MockBus {
    type Error = BusFault;

    fn read_register(&mut self, reg: u8) -> Result<u8, BusFault> {
        self.log.push(BusOp::Read(reg));
        if self.fail_reads.contains(&reg) {
            return Err(BusFault);
        }
        Ok(self.regs[reg as usize])
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), BusFault> {
        self.log.push(BusOp::Write(reg, value));
        if self.fail_writes.contains(&reg) {
            return Err(BusFault);
        }
        self.regs[reg as usize] = value;
        Ok(())
    }

    fn bulk_read(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), BusFault> {
        self.log.push(BusOp::BulkRead(reg, buf.len()));
        if self.fail_reads.contains(&reg) {
            return Err(BusFault);
        }
        let start = reg as usize;
        buf.copy_from_slice(&self.regs[start..start + buf.len()]);
        Ok(())
    }
}

/// SPI device modelling the LIS3MDL framing: the first byte is the address with the read flag in
/// bit 7 and the auto-increment flag in bit 6.
#[derive(Debug, Default)]
pub struct MockSpi {
    pub regs: Vec<u8>,
    /// Address byte of every transaction
    pub headers: Vec<u8>,
}

impl MockSpi {
    pub fn new() -> Self {
        MockSpi {
            regs: vec![0; 64],
            headers: Vec::new(),
        }
    }
}

impl spi::ErrorType for MockSpi {
    type Error = spi::ErrorKind;
}

impl spi::SpiDevice for MockSpi {
    fn transaction(&mut self, operations: &mut [spi::Operation<'_, u8>]) -> Result<(), Self::Error> {
        let mut header = None;
        for op in operations.iter_mut() {
            match op {
                spi::Operation::Write(bytes) => {
                    let (first, rest) = bytes.split_first().ok_or(spi::ErrorKind::Other)?;
                    header = Some(*first);
                    self.headers.push(*first);
                    let addr = (*first & 0x3F) as usize;
                    for (i, value) in rest.iter().enumerate() {
                        self.regs[addr + i] = *value;
                    }
                }
                spi::Operation::Read(buf) => {
                    let first = header.ok_or(spi::ErrorKind::Other)?;
                    if first & 0x80 == 0 {
                        return Err(spi::ErrorKind::Other);
                    }
                    let addr = (first & 0x3F) as usize;
                    let increment = first & 0x40 != 0;
                    for (i, byte) in buf.iter_mut().enumerate() {
                        *byte = if increment { self.regs[addr + i] } else { self.regs[addr] };
                    }
                }
                _ => return Err(spi::ErrorKind::Other),
            }
        }
        Ok(())
    }
}

/// I2C target modelling the LIS3MDL sub-address: bit 7 enables auto-increment.
#[derive(Debug, Default)]
pub struct MockI2c {
    pub regs: Vec<u8>,
    /// `(address, sub-address)` of every transaction
    pub headers: Vec<(u8, u8)>,
}

impl MockI2c {
    pub fn new() -> Self {
        MockI2c {
            regs: vec![0; 128],
            headers: Vec::new(),
        }
    }
}

impl i2c::ErrorType for MockI2c {
    type Error = i2c::ErrorKind;
}

impl i2c::I2c for MockI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut sub = None;
        for op in operations.iter_mut() {
            match op {
                i2c::Operation::Write(bytes) => {
                    let (first, rest) = bytes.split_first().ok_or(i2c::ErrorKind::Other)?;
                    sub = Some(*first);
                    self.headers.push((address, *first));
                    let reg = (*first & 0x7F) as usize;
                    for (i, value) in rest.iter().enumerate() {
                        self.regs[reg + i] = *value;
                    }
                }
                i2c::Operation::Read(buf) => {
                    let first = sub.ok_or(i2c::ErrorKind::Other)?;
                    let reg = (first & 0x7F) as usize;
                    let increment = first & 0x80 != 0;
                    for (i, byte) in buf.iter_mut().enumerate() {
                        *byte = if increment { self.regs[reg + i] } else { self.regs[reg] };
                    }
                }
            }
        }
        Ok(())
    }
}

/// What happened to a [`MockLine`], shared with the test after the line moved into the trigger.
#[derive(Debug, Default)]
pub struct LineLog {
    pub configured: Cell<Option<LineConfig>>,
    pub enabled: Cell<bool>,
    pub released: Cell<bool>,
    pub masked: Cell<bool>,
    pub masks: Cell<u32>,
    pub unmasks: Cell<u32>,
}

/// Interrupt line double.
#[derive(Debug, Default)]
pub struct MockLine {
    pub log: Rc<LineLog>,
    pub fail_configure: bool,
    pub fail_enable: bool,
}

impl MockLine {
    pub fn new() -> (Self, Rc<LineLog>) {
        let line = MockLine::default();
        let log = line.log.clone();
        (line, log)
    }
}

impl InterruptLine for MockLine {
    type Error = ();

    fn configure(&mut self, config: LineConfig) -> Result<(), ()> {
        if self.fail_configure {
            return Err(());
        }
        self.log.configured.set(Some(config));
        Ok(())
    }

    fn enable(&mut self) -> Result<(), ()> {
        if self.fail_enable {
            return Err(());
        }
        self.log.enabled.set(true);
        Ok(())
    }

    fn mask(&self) {
        self.log.masked.set(true);
        self.log.masks.set(self.log.masks.get() + 1);
    }

    fn unmask(&self) {
        self.log.masked.set(false);
        self.log.unmasks.set(self.log.unmasks.get() + 1);
    }

    fn release(&mut self) {
        self.log.enabled.set(false);
        self.log.configured.set(None);
        self.log.released.set(true);
    }
}

/// Clock the test moves by hand. Returns the handle and a closure usable as the driver clock.
pub fn manual_clock(start: i64) -> (Rc<Cell<i64>>, impl Fn() -> i64) {
    let now = Rc::new(Cell::new(start));
    let handle = now.clone();
    (handle, move || now.get())
}

/// Sink collecting records, optionally bounded.
#[derive(Debug, Default)]
pub struct VecSink {
    pub records: Vec<Record>,
    pub capacity: Option<usize>,
}

impl VecSink {
    pub fn new() -> Self {
        VecSink::default()
    }

    pub fn bounded(capacity: usize) -> Self {
        VecSink {
            records: Vec::new(),
            capacity: Some(capacity),
        }
    }
}

impl RecordSink for VecSink {
    fn push_record(&mut self, record: Record) -> Result<(), Record> {
        if let Some(capacity) = self.capacity {
            if self.records.len() >= capacity {
                return Err(record);
            }
        }
        self.records.push(record);
        Ok(())
    }
}
