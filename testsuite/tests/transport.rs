use lis3mdl_driver::lis3mdl::channel::{Axis, Channel};
use lis3mdl_driver::lis3mdl::device::{InfoKind, Lis3mdl, Value};
use lis3mdl_driver::lis3mdl::i2c::I2cInterface;
use lis3mdl_driver::lis3mdl::spi::SpiInterface;
use lis3mdl_driver::lis3mdl::{RegisterInterface, ALTERNATE_ADDRESS, DEFAULT_ADDRESS};
use testsuite::{MockI2c, MockSpi};

#[test]
fn spi_single_read_sets_read_flag() {
    let mut spi = MockSpi::new();
    spi.regs[0x0F] = 0x3D;
    let mut bus = SpiInterface::new(spi);

    assert_eq!(bus.read_register(0x0F), Ok(0x3D));
    assert_eq!(bus.destroy().headers, vec![0x8F]);
}

#[test]
fn spi_bulk_read_sets_both_flags() {
    let mut spi = MockSpi::new();
    spi.regs[0x28..0x2E].copy_from_slice(&[1, 2, 3, 4, 5, 6]);
    let mut bus = SpiInterface::new(spi);

    let mut buf = [0; 6];
    bus.bulk_read(0x28, &mut buf).unwrap();
    assert_eq!(buf, [1, 2, 3, 4, 5, 6]);
    assert_eq!(bus.destroy().headers, vec![0xE8]);
}

#[test]
fn spi_write_clears_flags() {
    let mut bus = SpiInterface::new(MockSpi::new());

    bus.write_register(0x20, 0x60).unwrap();
    let spi = bus.destroy();
    assert_eq!(spi.headers, vec![0x20]);
    assert_eq!(spi.regs[0x20], 0x60);
}

#[test]
fn spi_device_init_and_raw_read() {
    let mut spi = MockSpi::new();
    spi.regs[0x0F] = 0x3D;
    spi.regs[0x2A] = 0xFE;
    spi.regs[0x2B] = 0xFF;
    let mut dev = Lis3mdl::new(SpiInterface::new(spi));

    dev.init().unwrap();
    assert_eq!(
        dev.read_value(Channel::Magnetic(Axis::Y), InfoKind::Raw),
        Ok(Value::Int(-2))
    );
    dev.write_scale(584).unwrap();

    let spi = match dev.destroy() {
        Ok(bus) => bus.destroy(),
        Err(_) => panic!("device still buffering"),
    };
    assert_eq!(spi.regs[0x21], 0x60);
    assert_eq!(spi.regs[0x23], 0x0C);
}

#[test]
fn i2c_framing() {
    let mut i2c = MockI2c::new();
    i2c.regs[0x0F] = 0x3D;
    i2c.regs[0x2C] = 0x10;
    i2c.regs[0x2D] = 0x20;
    let mut bus = I2cInterface::new(i2c, ALTERNATE_ADDRESS);

    assert_eq!(bus.read_register(0x0F), Ok(0x3D));
    let mut buf = [0; 2];
    bus.bulk_read(0x2C, &mut buf).unwrap();
    assert_eq!(buf, [0x10, 0x20]);
    bus.write_register(0x22, 0x03).unwrap();

    let i2c = bus.destroy();
    assert_eq!(
        i2c.headers,
        vec![(0x1E, 0x0F), (0x1E, 0xAC), (0x1E, 0x22)]
    );
    assert_eq!(i2c.regs[0x22], 0x03);
}

#[test]
fn i2c_default_address() {
    let mut i2c = MockI2c::new();
    i2c.regs[0x0F] = 0x3D;
    let mut dev = Lis3mdl::new(I2cInterface::with_default_address(i2c));

    assert_eq!(dev.who_am_i(), Ok(0x3D));
    let i2c = match dev.destroy() {
        Ok(bus) => bus.destroy(),
        Err(_) => panic!("device still buffering"),
    };
    assert_eq!(i2c.headers, vec![(DEFAULT_ADDRESS, 0x0F)]);
}
