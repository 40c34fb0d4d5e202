use bitfield::bitfield;

bitfield! {
    /// bitfields of CTRL_REG1 register
    pub struct CtrlReg1(u8);
    impl Debug;
    /// enable the temperature sensor
    pub temp_en, set_temp_en: 7;
    /// X and Y axes operating mode
    pub u8, om, set_om: 6, 5;
    /// output data rate code: DO[2:0] followed by FAST_ODR
    pub u8, odr, set_odr: 4, 1;
    /// enable self test
    pub st, set_st: 0;
}

bitfield! {
    /// bitfields of CTRL_REG2 register
    pub struct CtrlReg2(u8);
    impl Debug;
    /// full scale selection
    pub u8, fs, set_fs: 6, 5;
    /// reboot memory content
    pub reboot, set_reboot: 3;
    /// reset configuration and user registers
    pub soft_rst, set_soft_rst: 2;
}

bitfield! {
    /// bitfields of CTRL_REG3 register
    pub struct CtrlReg3(u8);
    impl Debug;
    /// low power mode, forces the lowest data rate
    pub lp, set_lp: 5;
    /// 3-wire SPI interface
    pub sim, set_sim: 2;
    /// conversion mode
    pub u8, md, set_md: 1, 0;
}

bitfield! {
    /// bitfields of CTRL_REG4 register
    pub struct CtrlReg4(u8);
    impl Debug;
    /// Z axis operating mode
    pub u8, omz, set_omz: 3, 2;
    /// big endian output data
    pub ble, set_ble: 1;
}

bitfield! {
    /// bitfields of STATUS_REG register
    pub struct StatusReg(u8);
    impl Debug;
    /// X, Y and Z data overrun
    pub zyxor, _: 7;
    /// new X, Y and Z data available
    pub zyxda, _: 3;
}

bitfield! {
    /// bitfields of INT_CFG register
    pub struct IntCfg(u8);
    impl Debug;
    /// enable interrupt generation on X
    pub xien, set_xien: 7;
    /// enable interrupt generation on Y
    pub yien, set_yien: 6;
    /// enable interrupt generation on Z
    pub zien, set_zien: 5;
    /// interrupt pin active high
    pub iea, set_iea: 2;
    /// latch the interrupt request
    pub lir, set_lir: 1;
    /// enable the interrupt
    pub ien, set_ien: 0;
}

macro_rules! raw_byte {
    ($($name:ident),*) => {
        $(
            impl $name {
                /// Raw register content.
                pub fn bits(&self) -> u8 {
                    self.0
                }
            }

            impl From<u8> for $name {
                fn from(value: u8) -> Self {
                    $name(value)
                }
            }
        )*
    };
}

raw_byte!(CtrlReg1, CtrlReg2, CtrlReg3, CtrlReg4, StatusReg, IntCfg);

/// Bit mask of the output data rate field in CTRL_REG1.
pub const ODR_MASK: u8 = 0x1E;
/// Bit mask of the full scale field in CTRL_REG2.
pub const FS_MASK: u8 = 0x60;

/// Operating mode of an axis group. Higher modes oversample more and trade power for noise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatingMode {
    /// Low power mode
    LowPower = 0b00,
    /// Medium performance mode
    MediumPerformance = 0b01,
    /// High performance mode
    HighPerformance = 0b10,
    /// Ultra high performance mode
    UltraHighPerformance = 0b11,
}

/// Conversion mode selected in CTRL_REG3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConversionMode {
    /// Continuous conversion
    Continuous = 0b00,
    /// Single conversion, returns to power down afterwards
    Single = 0b01,
    /// Power down
    PowerDown = 0b11,
}
