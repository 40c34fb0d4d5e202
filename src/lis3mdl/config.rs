// Copyright (c) 2022, Zachary D. Olkin.
// This code is provided under the MIT license.

use crate::lis3mdl::bits::{
    ConversionMode, CtrlReg1, CtrlReg2, CtrlReg3, CtrlReg4, OperatingMode, FS_MASK, ODR_MASK,
};
use crate::lis3mdl::device::Lis3mdl;
use crate::lis3mdl::{MagError, RegisterInterface, Registers, WHO_AM_I_VALUE};

use strum::{EnumCount, EnumIter, IntoEnumIterator};

/// Output data rate options, as the 4-bit DO[2:0] + FAST_ODR code of CTRL_REG1.
///
/// Rates are tracked in milli-Hz so that 0.625 Hz is exact. The 155 Hz entry is the FAST_ODR
/// rate of the ultra high performance mode selected by the init sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, EnumCount)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataRate {
    /// 0.625 Hz
    Hz0_625,
    /// 1.25 Hz
    Hz1_25,
    /// 2.5 Hz
    Hz2_5,
    /// 5 Hz
    Hz5,
    /// 10 Hz
    Hz10,
    /// 20 Hz
    Hz20,
    /// 40 Hz
    Hz40,
    /// 80 Hz
    Hz80,
    /// 155 Hz
    Hz155,
}

impl DataRate {
    /// Rate in milli-Hz.
    pub const fn millihertz(self) -> u32 {
        match self {
            DataRate::Hz0_625 => 625,
            DataRate::Hz1_25 => 1_250,
            DataRate::Hz2_5 => 2_500,
            DataRate::Hz5 => 5_000,
            DataRate::Hz10 => 10_000,
            DataRate::Hz20 => 20_000,
            DataRate::Hz40 => 40_000,
            DataRate::Hz80 => 80_000,
            DataRate::Hz155 => 155_000,
        }
    }

    /// Look up a rate given in milli-Hz. Anything not in the table is `None`.
    pub const fn from_millihertz(mhz: u32) -> Option<Self> {
        match mhz {
            625 => Some(DataRate::Hz0_625),
            1_250 => Some(DataRate::Hz1_25),
            2_500 => Some(DataRate::Hz2_5),
            5_000 => Some(DataRate::Hz5),
            10_000 => Some(DataRate::Hz10),
            20_000 => Some(DataRate::Hz20),
            40_000 => Some(DataRate::Hz40),
            80_000 => Some(DataRate::Hz80),
            155_000 => Some(DataRate::Hz155),
            _ => None,
        }
    }

    /// Register code, to be placed under [`ODR_MASK`].
    pub const fn bits(self) -> u8 {
        match self {
            DataRate::Hz0_625 => 0b0000,
            DataRate::Hz1_25 => 0b0010,
            DataRate::Hz2_5 => 0b0100,
            DataRate::Hz5 => 0b0110,
            DataRate::Hz10 => 0b1000,
            DataRate::Hz20 => 0b1010,
            DataRate::Hz40 => 0b1100,
            DataRate::Hz80 => 0b1110,
            DataRate::Hz155 => 0b0001,
        }
    }

    /// Decode a register code. Codes with FAST_ODR set and DO != 0 depend on the operating mode
    /// and are not part of the table.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0b0000 => Some(DataRate::Hz0_625),
            0b0010 => Some(DataRate::Hz1_25),
            0b0100 => Some(DataRate::Hz2_5),
            0b0110 => Some(DataRate::Hz5),
            0b1000 => Some(DataRate::Hz10),
            0b1010 => Some(DataRate::Hz20),
            0b1100 => Some(DataRate::Hz40),
            0b1110 => Some(DataRate::Hz80),
            0b0001 => Some(DataRate::Hz155),
            _ => None,
        }
    }

    /// All supported rates, slowest first.
    pub fn available() -> impl Iterator<Item = DataRate> {
        DataRate::iter()
    }
}

/// Full scale options in gauss, as the FS[1:0] code of CTRL_REG2.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, EnumCount)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FullScale {
    /// ±4 gauss
    Gauss4,
    /// ±8 gauss
    Gauss8,
    /// ±12 gauss
    Gauss12,
    /// ±16 gauss
    Gauss16,
}

impl FullScale {
    /// Sensitivity in micro-gauss per LSB.
    pub const fn micro_gain(self) -> u32 {
        match self {
            FullScale::Gauss4 => 146,
            FullScale::Gauss8 => 292,
            FullScale::Gauss12 => 437,
            FullScale::Gauss16 => 584,
        }
    }

    /// Look up a sensitivity given in micro-gauss per LSB.
    pub const fn from_micro_gain(gain: u32) -> Option<Self> {
        match gain {
            146 => Some(FullScale::Gauss4),
            292 => Some(FullScale::Gauss8),
            437 => Some(FullScale::Gauss12),
            584 => Some(FullScale::Gauss16),
            _ => None,
        }
    }

    /// Register code, to be placed under [`FS_MASK`].
    pub const fn bits(self) -> u8 {
        match self {
            FullScale::Gauss4 => 0b00,
            FullScale::Gauss8 => 0b01,
            FullScale::Gauss12 => 0b10,
            FullScale::Gauss16 => 0b11,
        }
    }

    /// Decode a register code.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0b00 => Some(FullScale::Gauss4),
            0b01 => Some(FullScale::Gauss8),
            0b10 => Some(FullScale::Gauss12),
            0b11 => Some(FullScale::Gauss16),
            _ => None,
        }
    }

    /// Full scale range in gauss.
    pub const fn gauss(self) -> u8 {
        match self {
            FullScale::Gauss4 => 4,
            FullScale::Gauss8 => 8,
            FullScale::Gauss12 => 12,
            FullScale::Gauss16 => 16,
        }
    }

    /// All supported ranges, smallest first.
    pub fn available() -> impl Iterator<Item = FullScale> {
        FullScale::iter()
    }
}

/// One register write of the init sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegWrite {
    /// Target register
    pub reg: Registers,
    /// Value written
    pub value: u8,
}

/// Writes that bring the device into ±4 gauss, 0.625 Hz, ultra high performance, continuous
/// conversion. The order matters: scale, rate + XY mode, Z mode, conversion mode.
pub fn init_sequence() -> [RegWrite; 4] {
    let mut ctrl2 = CtrlReg2::from(0);
    ctrl2.set_fs(FullScale::Gauss4.bits());

    let mut ctrl1 = CtrlReg1::from(0);
    ctrl1.set_om(OperatingMode::UltraHighPerformance as u8);
    ctrl1.set_odr(DataRate::Hz0_625.bits());

    let mut ctrl4 = CtrlReg4::from(0);
    ctrl4.set_omz(OperatingMode::UltraHighPerformance as u8);

    let mut ctrl3 = CtrlReg3::from(0);
    ctrl3.set_lp(false);
    ctrl3.set_md(ConversionMode::Continuous as u8);

    [
        RegWrite { reg: Registers::CtrlReg2, value: ctrl2.bits() },
        RegWrite { reg: Registers::CtrlReg1, value: ctrl1.bits() },
        RegWrite { reg: Registers::CtrlReg4, value: ctrl4.bits() },
        RegWrite { reg: Registers::CtrlReg3, value: ctrl3.bits() },
    ]
}

impl<BUS, E> Lis3mdl<BUS>
where
    BUS: RegisterInterface<Error = E>,
{
    /// Reads WHO_AM_I and fails with `InvalidDevice` unless it reads 0x3D.
    pub fn check_identity(&mut self) -> Result<(), MagError<E>> {
        let id = self.who_am_i()?;
        if id != WHO_AM_I_VALUE {
            error!("Invalid WHO_AM_I: {:#x}, expected {:#x}", id, WHO_AM_I_VALUE);
            return Err(MagError::InvalidDevice(id));
        }
        info!("Init ok. WHO_AM_I: {:#x}", id);
        Ok(())
    }

    /// Runs the init sequence, stopping at the first failed write.
    ///
    /// Device state is reset to the values the sequence programs.
    pub fn configure(&mut self) -> Result<(), MagError<E>> {
        for entry in init_sequence() {
            debug!("write_reg {}({:#x}) = {:#x}", entry.reg.name(), entry.reg.addr(), entry.value);
            if let Err(e) = self.bus.write_register(entry.reg.addr(), entry.value) {
                error!("Could not configure device, write to {} failed", entry.reg.name());
                return Err(MagError::BusError(e));
            }
        }

        self.state.gain = FullScale::Gauss4;
        self.state.rate = DataRate::Hz0_625;
        Ok(())
    }

    /// Identity check followed by the init sequence. No control register is written if the
    /// identity check fails.
    pub fn init(&mut self) -> Result<(), MagError<E>> {
        self.check_identity()?;
        self.configure()
    }

    /// Set the output data rate, given in milli-Hz.
    ///
    /// Returns `InvalidArgument` and leaves the device untouched if the rate is not one of the
    /// supported values. See [`DataRate`] for the list.
    pub fn write_rate(&mut self, mhz: u32) -> Result<(), MagError<E>> {
        let rate = match DataRate::from_millihertz(mhz) {
            Some(rate) => rate,
            None => {
                warn!("Unrecognized data rate: {}", mhz);
                return Err(MagError::InvalidArgument);
            }
        };

        let previous = core::mem::replace(&mut self.state.rate, rate);
        debug!("Update rate bits: {:#x}", rate.bits());
        self.bus
            .update_bits(Registers::CtrlReg1.addr(), ODR_MASK, rate.bits())
            .map_err(|e| {
                self.state.rate = previous;
                e
            })
    }

    /// Set the full scale, given as sensitivity in micro-gauss per LSB.
    ///
    /// Returns `InvalidArgument` and leaves the device untouched if the gain is not one of the
    /// supported values. See [`FullScale`] for the list.
    pub fn write_scale(&mut self, micro_gain: u32) -> Result<(), MagError<E>> {
        let scale = match FullScale::from_micro_gain(micro_gain) {
            Some(scale) => scale,
            None => {
                warn!("Unrecognized scale: {}", micro_gain);
                return Err(MagError::InvalidArgument);
            }
        };

        let previous = core::mem::replace(&mut self.state.gain, scale);
        debug!("Update scale bits: {:#x}", scale.bits());
        self.bus
            .update_bits(Registers::CtrlReg2.addr(), FS_MASK, scale.bits())
            .map_err(|e| {
                self.state.gain = previous;
                e
            })
    }

    /// Convenience wrapper around [`write_rate`](Self::write_rate).
    pub fn set_data_rate(&mut self, rate: DataRate) -> Result<(), MagError<E>> {
        self.write_rate(rate.millihertz())
    }

    /// Convenience wrapper around [`write_scale`](Self::write_scale).
    pub fn set_full_scale(&mut self, scale: FullScale) -> Result<(), MagError<E>> {
        self.write_scale(scale.micro_gain())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_table_is_bijective() {
        assert_eq!(DataRate::COUNT, 9);
        for rate in DataRate::iter() {
            assert_eq!(DataRate::from_bits(rate.bits()), Some(rate));
            assert_eq!(DataRate::from_millihertz(rate.millihertz()), Some(rate));
        }
    }

    #[test]
    fn scale_table_is_bijective() {
        assert_eq!(FullScale::COUNT, 4);
        for scale in FullScale::iter() {
            assert_eq!(FullScale::from_bits(scale.bits()), Some(scale));
            assert_eq!(FullScale::from_micro_gain(scale.micro_gain()), Some(scale));
        }
    }

    #[test]
    fn unknown_values_are_rejected() {
        assert_eq!(DataRate::from_millihertz(0), None);
        assert_eq!(DataRate::from_millihertz(155), None);
        assert_eq!(DataRate::from_millihertz(300_000), None);
        assert_eq!(DataRate::from_bits(0b0011), None);
        assert_eq!(FullScale::from_micro_gain(145), None);
        assert_eq!(FullScale::from_bits(0b100), None);
    }

    #[test]
    fn rate_codes_fit_the_field() {
        for rate in DataRate::available() {
            assert_eq!(rate.bits() & !0x0F, 0);
        }
        assert_eq!(DataRate::Hz155.bits(), 0b0001);
        assert_eq!(DataRate::Hz80.bits(), 0b1110);
    }

    #[test]
    fn init_sequence_order_and_values() {
        let seq = init_sequence();
        let writes: [(u8, u8); 4] = [
            (seq[0].reg.addr(), seq[0].value),
            (seq[1].reg.addr(), seq[1].value),
            (seq[2].reg.addr(), seq[2].value),
            (seq[3].reg.addr(), seq[3].value),
        ];
        assert_eq!(writes, [(0x21, 0x00), (0x20, 0x60), (0x23, 0x0C), (0x22, 0x00)]);
    }
}
