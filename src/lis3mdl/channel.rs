use crate::lis3mdl::Registers;

use strum::{EnumCount, EnumIter, IntoEnumIterator};

/// Size of one axis sample in the output record.
pub const SAMPLE_BYTES: usize = 2;
/// Size of the timestamp in the output record.
pub const TIMESTAMP_BYTES: usize = 8;
/// Largest possible record: three samples, padding, timestamp.
pub const MAX_RECORD_BYTES: usize = record_len(3);

/// A physical measurement axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, EnumCount)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    /// X axis, scan index 0
    X,
    /// Y axis, scan index 1
    Y,
    /// Z axis, scan index 2
    Z,
}

impl Axis {
    /// Position of the axis in the output record ordering.
    pub const fn scan_index(self) -> u8 {
        self as u8
    }

    /// Low byte of the axis output register pair.
    pub const fn register(self) -> Registers {
        match self {
            Axis::X => Registers::OutXL,
            Axis::Y => Registers::OutYL,
            Axis::Z => Registers::OutZL,
        }
    }

    const fn bit(self) -> u8 {
        1 << self.scan_index()
    }
}

/// A channel as seen by a consumer: one of the axes or the synthetic timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    /// Magnetic field along an axis
    Magnetic(Axis),
    /// Capture timestamp in nanoseconds
    Timestamp,
}

/// Byte order of a channel in the output record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Endianness {
    /// Least significant byte first
    Little,
}

/// Static description of a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelSpec {
    /// Which channel this is
    pub channel: Channel,
    /// Register holding the low byte of the sample, `None` for the timestamp
    pub address: Option<u8>,
    /// Position in the output record
    pub scan_index: u8,
    /// Width of the value in bits
    pub bits: u8,
    /// Two's complement value
    pub signed: bool,
    /// Byte order in the record
    pub endianness: Endianness,
}

const fn axis_spec(axis: Axis) -> ChannelSpec {
    ChannelSpec {
        channel: Channel::Magnetic(axis),
        address: Some(axis.register().addr()),
        scan_index: axis.scan_index(),
        bits: 16,
        signed: true,
        endianness: Endianness::Little,
    }
}

/// Channels in scan index order.
pub const CHANNELS: [ChannelSpec; 4] = [
    axis_spec(Axis::X),
    axis_spec(Axis::Y),
    axis_spec(Axis::Z),
    ChannelSpec {
        channel: Channel::Timestamp,
        address: None,
        scan_index: 3,
        bits: 64,
        signed: true,
        endianness: Endianness::Little,
    },
];

/// Offset of the timestamp in a record holding `samples` axis samples.
pub const fn timestamp_offset(samples: usize) -> usize {
    (samples * SAMPLE_BYTES + TIMESTAMP_BYTES - 1) / TIMESTAMP_BYTES * TIMESTAMP_BYTES
}

/// Total length of a record holding `samples` axis samples.
pub const fn record_len(samples: usize) -> usize {
    timestamp_offset(samples) + TIMESTAMP_BYTES
}

/// Set of axes included in a capture. The timestamp is always included.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanMask(u8);

impl ScanMask {
    /// No axis selected
    pub const EMPTY: ScanMask = ScanMask(0);
    /// All three axes
    pub const ALL: ScanMask = ScanMask(0b111);

    /// Mask holding exactly the given axes.
    pub fn from_axes(axes: &[Axis]) -> Self {
        axes.iter().fold(Self::EMPTY, |mask, &axis| mask.with(axis))
    }

    /// Copy of the mask with `axis` added.
    pub const fn with(self, axis: Axis) -> Self {
        ScanMask(self.0 | axis.bit())
    }

    /// Whether `axis` is part of the capture.
    pub const fn contains(self, axis: Axis) -> bool {
        self.0 & axis.bit() != 0
    }

    /// Number of axes selected.
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Whether no axis is selected.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Selected axes in increasing scan index order.
    pub fn iter(self) -> impl Iterator<Item = Axis> {
        Axis::iter().filter(move |axis| self.contains(*axis))
    }

    /// Byte offset of `axis` inside a record built with this mask.
    pub fn offset_of(self, axis: Axis) -> Option<usize> {
        self.iter()
            .position(|a| a == axis)
            .map(|slot| slot * SAMPLE_BYTES)
    }
}
