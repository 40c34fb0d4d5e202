// Copyright (c) 2022, Zachary D. Olkin.
// This code is provided under the MIT license.

//! The device raises its interrupt line when a new sample is latched. A capture cycle is split in
//! two halves:
//!
//! * [`Irq::on_interrupt`] runs in the interrupt handler. It never touches the bus: it reads the
//!   clock, moves the state from `Armed` to `Firing` and queues the timestamp.
//! * [`Deferred::service`] runs in task context. It takes the queued timestamp, reads the axes over
//!   the bus, pushes the record and then re-arms.
//!
//! Only one cycle is in flight at a time: an interrupt that arrives while the state is not `Armed`
//! is ignored.
//!
//! ```text
//! Idle --enable--> Armed --irq--> Firing --service--> Armed (or Idle)
//!   any --disable--> Disabled
//! ```

use crate::lis3mdl::capture::{RecordSink, TimestampSource};
use crate::lis3mdl::channel::ScanMask;
use crate::lis3mdl::device::Lis3mdl;
use crate::lis3mdl::{MagError, RegisterInterface, Registers};

use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use heapless::spsc::{Consumer, Producer, Queue};

/// Monotonic time source used for record timestamps.
pub trait Clock {
    /// Current time in nanoseconds. Must be callable from interrupt context.
    fn now_ns(&self) -> i64;
}

impl<F> Clock for F
where
    F: Fn() -> i64,
{
    fn now_ns(&self) -> i64 {
        self()
    }
}

/// Trigger type requested for the interrupt line, usually from board configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerType {
    /// Rising edge
    EdgeRising,
    /// Falling edge
    EdgeFalling,
    /// Both edges
    EdgeBoth,
    /// High level
    LevelHigh,
    /// Low level
    LevelLow,
    /// Nothing requested
    Unspecified,
}

/// Line modes the device can drive. DRDY is active high only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineMode {
    /// Rising edge
    EdgeRising,
    /// High level
    LevelHigh,
}

/// Result of the polarity negotiation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineConfig {
    /// Mode the line gets configured with
    pub mode: LineMode,
    /// Mask the line on assertion and unmask once the cycle completes
    pub one_shot: bool,
}

/// Map a requested trigger type onto what the device supports.
///
/// Falling edge and low level become rising edge and high level. Anything else that is not rising
/// edge or high level falls back to rising edge. Level modes are one-shot so an asserted line can
/// not storm while the deferred half is reading the axes.
pub fn negotiate(requested: TriggerType) -> LineConfig {
    let mode = match requested {
        TriggerType::EdgeRising => LineMode::EdgeRising,
        TriggerType::LevelHigh => LineMode::LevelHigh,
        TriggerType::EdgeFalling => {
            warn!("Falling edge interrupt not supported, using rising edge");
            LineMode::EdgeRising
        }
        TriggerType::LevelLow => {
            warn!("Low level interrupt not supported, using high level");
            LineMode::LevelHigh
        }
        TriggerType::EdgeBoth | TriggerType::Unspecified => {
            warn!("Unsupported interrupt trigger, using rising edge");
            LineMode::EdgeRising
        }
    };

    LineConfig {
        mode,
        one_shot: mode == LineMode::LevelHigh,
    }
}

/// The interrupt line the device's DRDY pin is wired to.
///
/// `mask` and `unmask` are called from both halves and take `&self`; implementations usually
/// write an interrupt controller register.
pub trait InterruptLine {
    /// Error reported when the line can not be set up.
    type Error;

    /// Set the trigger mode of the line.
    fn configure(&mut self, config: LineConfig) -> Result<(), Self::Error>;

    /// Request the line and route it to the handler.
    fn enable(&mut self) -> Result<(), Self::Error>;

    /// Stop delivering interrupts.
    fn mask(&self);

    /// Resume delivering interrupts.
    fn unmask(&self);

    /// Undo `configure` and `enable`.
    fn release(&mut self);
}

/// State of the trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerState {
    /// Set up, buffer not enabled
    Idle,
    /// Waiting for the next interrupt
    Armed,
    /// Interrupt taken, capture pending or running
    Firing,
    /// Torn down, can not be armed again
    Disabled,
}

const IDLE: u8 = 0;
const ARMED: u8 = 1;
const FIRING: u8 = 2;
const DISABLED: u8 = 3;

impl TriggerState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            ARMED => TriggerState::Armed,
            FIRING => TriggerState::Firing,
            DISABLED => TriggerState::Disabled,
            _ => TriggerState::Idle,
        }
    }
}

/// Outcome of [`Irq::on_interrupt`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrqOutcome {
    /// The trigger was not armed, nothing was scheduled
    Ignored,
    /// A capture is queued for the deferred half
    Scheduled,
}

/// Message from interrupt context to the deferred half.
struct Fire {
    timestamp: i64,
}

/// Owner of the interrupt line and the hand-off queue between the two halves.
///
/// `N` is the queue size; one slot is always free so the default of 2 holds the single in-flight
/// cycle.
pub struct Trigger<L, C, const N: usize = 2> {
    state: AtomicU8,
    completed: AtomicU32,
    config: LineConfig,
    line: L,
    clock: C,
    queue: Queue<Fire, N>,
}

impl<L, C, const N: usize> Trigger<L, C, N>
where
    L: InterruptLine,
    C: Clock,
{
    /// Negotiate the polarity, then configure and request the line. The line is left masked
    /// until buffered capture is enabled.
    ///
    /// Returns `ResourceUnavailable` if the line can not be set up. A line that was configured
    /// but could not be requested is released first.
    pub fn setup(mut line: L, requested: TriggerType, clock: C) -> Result<Self, MagError<L::Error>> {
        let config = negotiate(requested);

        if line.configure(config).is_err() {
            error!("Could not configure interrupt line");
            return Err(MagError::ResourceUnavailable);
        }
        if line.enable().is_err() {
            error!("Could not request interrupt line");
            line.release();
            return Err(MagError::ResourceUnavailable);
        }
        line.mask();

        Ok(Trigger {
            state: AtomicU8::new(IDLE),
            completed: AtomicU32::new(0),
            config,
            line,
            clock,
            queue: Queue::new(),
        })
    }

    /// Split into the interrupt half and the deferred half.
    pub fn split(&mut self) -> (Irq<'_, L, C, N>, Deferred<'_, L, C, N>) {
        let (producer, consumer) = self.queue.split();
        let one_shot = self.config.one_shot;

        (
            Irq {
                state: &self.state,
                line: &self.line,
                clock: &self.clock,
                one_shot,
                producer,
            },
            Deferred {
                state: &self.state,
                completed: &self.completed,
                line: &self.line,
                clock: &self.clock,
                one_shot,
                consumer,
            },
        )
    }

    /// Current state.
    pub fn state(&self) -> TriggerState {
        TriggerState::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Line configuration chosen at setup.
    pub fn config(&self) -> LineConfig {
        self.config
    }

    /// Number of capture cycles completed, successful or not.
    pub fn completed_cycles(&self) -> u32 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Release the interrupt line and give it back.
    ///
    /// Refused while the trigger is armed or a cycle is in flight: disable it first.
    pub fn release(self) -> Result<L, Self> {
        match self.state() {
            TriggerState::Armed | TriggerState::Firing => {
                warn!("Trigger still armed, disable it before releasing the line");
                Err(self)
            }
            TriggerState::Idle | TriggerState::Disabled => {
                let Trigger { mut line, .. } = self;
                line.mask();
                line.release();
                Ok(line)
            }
        }
    }
}

/// The interrupt context half. Only non-blocking work happens here.
pub struct Irq<'a, L, C, const N: usize = 2> {
    state: &'a AtomicU8,
    line: &'a L,
    clock: &'a C,
    one_shot: bool,
    producer: Producer<'a, Fire, N>,
}

impl<'a, L, C, const N: usize> Irq<'a, L, C, N>
where
    L: InterruptLine,
    C: Clock,
{
    /// Call from the interrupt handler of the DRDY line.
    ///
    /// Takes the timestamp, moves `Armed` to `Firing` and queues the capture. Returns
    /// [`IrqOutcome::Scheduled`] when the deferred half has work to do.
    pub fn on_interrupt(&mut self) -> IrqOutcome {
        let timestamp = self.clock.now_ns();

        if self
            .state
            .compare_exchange(ARMED, FIRING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            if self.one_shot {
                self.line.mask();
            }
            return IrqOutcome::Ignored;
        }

        if self.one_shot {
            self.line.mask();
        }

        match self.producer.enqueue(Fire { timestamp }) {
            Ok(()) => IrqOutcome::Scheduled,
            Err(_) => {
                // Queue still holds a fire the deferred half never took.
                self.state.store(ARMED, Ordering::Release);
                if self.one_shot {
                    self.line.unmask();
                }
                IrqOutcome::Ignored
            }
        }
    }
}

/// The task context half. Owns the capture cycle and may block on the bus.
pub struct Deferred<'a, L, C, const N: usize = 2> {
    state: &'a AtomicU8,
    completed: &'a AtomicU32,
    line: &'a L,
    clock: &'a C,
    one_shot: bool,
    consumer: Consumer<'a, Fire, N>,
}

impl<'a, L, C, const N: usize> Deferred<'a, L, C, N>
where
    L: InterruptLine,
    C: Clock,
{
    /// Current state.
    pub fn state(&self) -> TriggerState {
        TriggerState::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Whether an interrupt queued a capture that has not been serviced yet.
    pub fn pending(&self) -> bool {
        self.consumer.ready()
    }

    /// Enable buffered capture of the axes in `mask` and arm the trigger.
    ///
    /// One register read is issued to prime the bus. Its failure is only logged.
    pub fn enable<BUS, E>(&mut self, dev: &mut Lis3mdl<BUS>, mask: ScanMask) -> Result<(), MagError<E>>
    where
        BUS: RegisterInterface<Error = E>,
    {
        match self.state() {
            TriggerState::Disabled => return Err(MagError::TriggerDisabled),
            TriggerState::Armed | TriggerState::Firing => return Err(MagError::Busy),
            TriggerState::Idle => {}
        }
        if dev.state.enabled {
            return Err(MagError::Busy);
        }

        dev.scan_mask = mask;
        dev.state.enabled = true;

        if dev.bus.read_register(Registers::StatusReg.addr()).is_err() {
            warn!("Warm-up read failed");
        }

        self.state.store(ARMED, Ordering::Release);
        self.line.unmask();
        debug!("Trigger armed");
        Ok(())
    }

    /// Stop buffered capture. The trigger ends up `Disabled` and can not be armed again; a
    /// queued capture that was not serviced yet is discarded.
    pub fn disable<BUS>(&mut self, dev: &mut Lis3mdl<BUS>) {
        self.state.store(DISABLED, Ordering::Release);
        self.line.mask();
        dev.state.enabled = false;

        while self.consumer.dequeue().is_some() {
            debug!("Discarding queued capture");
        }
        debug!("Trigger disabled");
    }

    /// Run the capture queued by the interrupt half, if any.
    ///
    /// Returns `None` when nothing was queued, otherwise the outcome of the cycle. The cycle is
    /// completed, and the trigger re-armed, whether the capture succeeded or not.
    pub fn service<BUS, E, S>(
        &mut self,
        dev: &mut Lis3mdl<BUS>,
        sink: &mut S,
    ) -> Option<Result<(), MagError<E>>>
    where
        BUS: RegisterInterface<Error = E>,
        S: RecordSink + ?Sized,
    {
        let fire = self.consumer.dequeue()?;
        dev.state.hw_timestamp = fire.timestamp;

        let result = dev.capture(TimestampSource::Hardware, self.clock, sink);
        self.complete(dev.state.enabled);
        Some(result)
    }

    /// Run one software triggered cycle. The timestamp is taken when the record is assembled.
    ///
    /// Only possible while armed, so it never overlaps a hardware triggered cycle.
    pub fn fire_software<BUS, E, S>(
        &mut self,
        dev: &mut Lis3mdl<BUS>,
        sink: &mut S,
    ) -> Result<(), MagError<E>>
    where
        BUS: RegisterInterface<Error = E>,
        S: RecordSink + ?Sized,
    {
        if let Err(raw) =
            self.state
                .compare_exchange(ARMED, FIRING, Ordering::AcqRel, Ordering::Acquire)
        {
            return Err(match TriggerState::from_raw(raw) {
                TriggerState::Disabled => MagError::TriggerDisabled,
                TriggerState::Idle => MagError::InvalidArgument,
                TriggerState::Armed | TriggerState::Firing => MagError::Busy,
            });
        }

        let result = dev.capture(TimestampSource::Software, self.clock, sink);
        self.complete(dev.state.enabled);
        result
    }

    /// Number of capture cycles completed, successful or not.
    pub fn completed_cycles(&self) -> u32 {
        self.completed.load(Ordering::Relaxed)
    }

    fn complete(&mut self, enabled: bool) {
        let next = if enabled { ARMED } else { IDLE };
        let rearmed = self
            .state
            .compare_exchange(FIRING, next, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
            && next == ARMED;

        let done = self.completed.load(Ordering::Relaxed).wrapping_add(1);
        self.completed.store(done, Ordering::Relaxed);

        if self.one_shot && rearmed {
            self.line.unmask();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negotiation_remaps_unsupported_polarity() {
        assert_eq!(
            negotiate(TriggerType::EdgeFalling),
            LineConfig { mode: LineMode::EdgeRising, one_shot: false }
        );
        assert_eq!(
            negotiate(TriggerType::LevelLow),
            LineConfig { mode: LineMode::LevelHigh, one_shot: true }
        );
        assert_eq!(negotiate(TriggerType::EdgeBoth).mode, LineMode::EdgeRising);
        assert_eq!(negotiate(TriggerType::Unspecified).mode, LineMode::EdgeRising);
    }

    #[test]
    fn level_modes_are_one_shot() {
        assert!(negotiate(TriggerType::LevelHigh).one_shot);
        assert!(!negotiate(TriggerType::EdgeRising).one_shot);
    }

    #[test]
    fn closures_are_clocks() {
        let clock = || 1_000_i64;
        assert_eq!(clock.now_ns(), 1_000);
    }
}
