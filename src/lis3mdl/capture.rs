// Copyright (c) 2022, Zachary D. Olkin.
// This code is provided under the MIT license.

use crate::lis3mdl::channel::{
    record_len, timestamp_offset, Axis, ScanMask, MAX_RECORD_BYTES, SAMPLE_BYTES, TIMESTAMP_BYTES,
};
use crate::lis3mdl::device::Lis3mdl;
use crate::lis3mdl::trigger::Clock;
use crate::lis3mdl::{MagError, RegisterInterface};

use heapless::spsc::Producer;

/// Where the timestamp of a record comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimestampSource {
    /// The device's own interrupt fired: use the timestamp taken in interrupt context.
    Hardware,
    /// Any other trigger: read the clock when the record is assembled.
    Software,
}

/// One output record: the enabled axis samples, padding, and an 8 byte aligned timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Record {
    bytes: [u8; MAX_RECORD_BYTES],
    len: u8,
    mask: ScanMask,
}

impl Record {
    fn from_scratch(scratch: &[u8; MAX_RECORD_BYTES], mask: ScanMask) -> Self {
        let len = record_len(mask.len());
        let mut bytes = [0; MAX_RECORD_BYTES];
        bytes[..len].copy_from_slice(&scratch[..len]);
        Record {
            bytes,
            len: len as u8,
            mask,
        }
    }

    /// The record exactly as laid out for the consumer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Axes present in the record.
    pub fn scan_mask(&self) -> ScanMask {
        self.mask
    }

    /// Raw sample of `axis`, `None` if the axis was not captured.
    pub fn sample(&self, axis: Axis) -> Option<i16> {
        let offset = self.mask.offset_of(axis)?;
        Some(i16::from_le_bytes([self.bytes[offset], self.bytes[offset + 1]]))
    }

    /// Capture timestamp in nanoseconds.
    pub fn timestamp(&self) -> i64 {
        let offset = timestamp_offset(self.mask.len());
        let mut ts = [0; TIMESTAMP_BYTES];
        ts.copy_from_slice(&self.bytes[offset..offset + TIMESTAMP_BYTES]);
        i64::from_le_bytes(ts)
    }
}

/// Consumer of completed records.
pub trait RecordSink {
    /// Take one record. A sink that has no room gives the record back.
    fn push_record(&mut self, record: Record) -> Result<(), Record>;
}

impl<const N: usize> RecordSink for Producer<'_, Record, N> {
    fn push_record(&mut self, record: Record) -> Result<(), Record> {
        self.enqueue(record)
    }
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn push_record(&mut self, record: Record) -> Result<(), Record> {
        (**self).push_record(record)
    }
}

/// Diagnostic counters for capture cycles that do not reach the consumer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CaptureStats {
    /// Records handed to the sink
    pub records: u32,
    /// Cycles abandoned because a bus read failed
    pub dropped: u32,
    /// Records the sink had no room for
    pub overruns: u32,
}

impl<BUS, E> Lis3mdl<BUS>
where
    BUS: RegisterInterface<Error = E>,
{
    /// Runs one capture cycle: reads every enabled axis in scan order into the scratch buffer,
    /// stamps it and pushes one record to `sink`.
    ///
    /// A failed read abandons the cycle before anything reaches the sink. The error is returned,
    /// counted in [`CaptureStats::dropped`] and nothing else changes, so the next cycle can run.
    pub fn capture<C, S>(
        &mut self,
        source: TimestampSource,
        clock: &C,
        sink: &mut S,
    ) -> Result<(), MagError<E>>
    where
        C: Clock + ?Sized,
        S: RecordSink + ?Sized,
    {
        let mask = self.scan_mask;
        let scratch = &mut self.state.scratch.0;
        scratch.fill(0);

        let mut cursor = 0;
        for axis in mask.iter() {
            let slot = &mut scratch[cursor..cursor + SAMPLE_BYTES];
            if let Err(e) = self.bus.bulk_read(axis.register().addr(), slot) {
                self.stats.dropped = self.stats.dropped.wrapping_add(1);
                warn!("Capture dropped, read of axis {} failed", axis.scan_index());
                return Err(MagError::BusError(e));
            }
            cursor += SAMPLE_BYTES;
        }

        let timestamp = match source {
            TimestampSource::Hardware => self.state.hw_timestamp,
            TimestampSource::Software => clock.now_ns(),
        };
        let offset = timestamp_offset(mask.len());
        scratch[offset..offset + TIMESTAMP_BYTES].copy_from_slice(&timestamp.to_le_bytes());

        let record = Record::from_scratch(scratch, mask);
        match sink.push_record(record) {
            Ok(()) => {
                self.stats.records = self.stats.records.wrapping_add(1);
                trace!("Record pushed, timestamp {}", timestamp);
            }
            Err(_) => {
                self.stats.overruns = self.stats.overruns.wrapping_add(1);
                warn!("Record sink full, record discarded");
            }
        }

        Ok(())
    }
}
