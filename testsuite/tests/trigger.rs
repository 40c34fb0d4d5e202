use lis3mdl_driver::lis3mdl::channel::ScanMask;
use lis3mdl_driver::lis3mdl::device::Lis3mdl;
use lis3mdl_driver::lis3mdl::trigger::{
    IrqOutcome, LineConfig, LineMode, Trigger, TriggerState, TriggerType,
};
use lis3mdl_driver::lis3mdl::{MagError, Registers};
use testsuite::{manual_clock, BusOp, MockBus, MockLine, VecSink};

#[test]
fn setup_negotiates_and_leaves_line_masked() {
    let (line, log) = MockLine::new();
    let (_, clock) = manual_clock(0);
    let trigger: Trigger<_, _> = Trigger::setup(line, TriggerType::LevelLow, clock).unwrap();

    let expected = LineConfig { mode: LineMode::LevelHigh, one_shot: true };
    assert_eq!(trigger.config(), expected);
    assert_eq!(log.configured.get(), Some(expected));
    assert!(log.enabled.get());
    assert!(log.masked.get());
    assert_eq!(trigger.state(), TriggerState::Idle);
}

#[test]
fn failed_request_releases_the_line() {
    let (mut line, log) = MockLine::new();
    line.fail_enable = true;
    let (_, clock) = manual_clock(0);

    let result: Result<Trigger<_, _>, _> = Trigger::setup(line, TriggerType::EdgeRising, clock);
    assert!(matches!(result, Err(MagError::ResourceUnavailable)));
    assert!(log.released.get());
    assert_eq!(log.configured.get(), None);
}

#[test]
fn failed_configure_is_resource_unavailable() {
    let (mut line, log) = MockLine::new();
    line.fail_configure = true;
    let (_, clock) = manual_clock(0);

    let result: Result<Trigger<_, _>, _> = Trigger::setup(line, TriggerType::EdgeRising, clock);
    assert!(matches!(result, Err(MagError::ResourceUnavailable)));
    assert!(!log.enabled.get());
}

#[test]
fn interrupt_while_idle_is_ignored() {
    let (line, _) = MockLine::new();
    let (_, clock) = manual_clock(0);
    let mut trigger: Trigger<_, _> = Trigger::setup(line, TriggerType::EdgeRising, clock).unwrap();

    let (mut irq, deferred) = trigger.split();
    assert_eq!(irq.on_interrupt(), IrqOutcome::Ignored);
    assert!(!deferred.pending());
    assert_eq!(deferred.state(), TriggerState::Idle);
}

#[test]
fn one_cycle_in_flight() {
    let (line, _) = MockLine::new();
    let (now, clock) = manual_clock(100);
    let mut trigger: Trigger<_, _> = Trigger::setup(line, TriggerType::EdgeRising, clock).unwrap();
    let mut dev = Lis3mdl::new(MockBus::new());
    let mut sink = VecSink::new();

    {
        let (mut irq, mut deferred) = trigger.split();
        deferred.enable(&mut dev, ScanMask::ALL).unwrap();
        assert_eq!(deferred.state(), TriggerState::Armed);

        assert_eq!(irq.on_interrupt(), IrqOutcome::Scheduled);
        assert_eq!(deferred.state(), TriggerState::Firing);

        now.set(200);
        assert_eq!(irq.on_interrupt(), IrqOutcome::Ignored);

        assert!(deferred.service(&mut dev, &mut sink).unwrap().is_ok());
        assert!(deferred.service(&mut dev, &mut sink).is_none());
        assert_eq!(deferred.state(), TriggerState::Armed);
        assert_eq!(deferred.completed_cycles(), 1);
    }

    assert_eq!(sink.records.len(), 1);
    assert_eq!(sink.records[0].timestamp(), 100);
    assert_eq!(trigger.completed_cycles(), 1);
}

#[test]
fn level_trigger_masks_until_cycle_completes() {
    let (line, log) = MockLine::new();
    let (_, clock) = manual_clock(0);
    let mut trigger: Trigger<_, _> = Trigger::setup(line, TriggerType::LevelHigh, clock).unwrap();
    let mut dev = Lis3mdl::new(MockBus::new());
    let mut sink = VecSink::new();

    let (mut irq, mut deferred) = trigger.split();
    deferred.enable(&mut dev, ScanMask::ALL).unwrap();
    assert!(!log.masked.get());

    assert_eq!(irq.on_interrupt(), IrqOutcome::Scheduled);
    assert!(log.masked.get());

    deferred.service(&mut dev, &mut sink).unwrap().unwrap();
    assert!(!log.masked.get());
    assert_eq!(deferred.state(), TriggerState::Armed);
}

#[test]
fn edge_trigger_never_masks_on_interrupt() {
    let (line, log) = MockLine::new();
    let (_, clock) = manual_clock(0);
    let mut trigger: Trigger<_, _> = Trigger::setup(line, TriggerType::EdgeRising, clock).unwrap();
    let mut dev = Lis3mdl::new(MockBus::new());
    let mut sink = VecSink::new();

    let (mut irq, mut deferred) = trigger.split();
    deferred.enable(&mut dev, ScanMask::ALL).unwrap();
    let masks = log.masks.get();

    irq.on_interrupt();
    deferred.service(&mut dev, &mut sink).unwrap().unwrap();
    assert_eq!(log.masks.get(), masks);
}

#[test]
fn disable_discards_pending_capture_and_is_terminal() {
    let (line, log) = MockLine::new();
    let (_, clock) = manual_clock(0);
    let mut trigger: Trigger<_, _> = Trigger::setup(line, TriggerType::EdgeRising, clock).unwrap();
    let mut dev = Lis3mdl::new(MockBus::new());
    let mut sink = VecSink::new();

    let (mut irq, mut deferred) = trigger.split();
    deferred.enable(&mut dev, ScanMask::ALL).unwrap();
    assert_eq!(irq.on_interrupt(), IrqOutcome::Scheduled);

    deferred.disable(&mut dev);
    assert!(!dev.is_enabled());
    assert!(log.masked.get());
    assert!(!deferred.pending());
    assert!(deferred.service(&mut dev, &mut sink).is_none());
    assert!(sink.records.is_empty());

    assert_eq!(irq.on_interrupt(), IrqOutcome::Ignored);
    assert!(matches!(
        deferred.enable(&mut dev, ScanMask::ALL),
        Err(MagError::TriggerDisabled)
    ));
    assert!(matches!(
        deferred.fire_software(&mut dev, &mut sink),
        Err(MagError::TriggerDisabled)
    ));
}

#[test]
fn enable_twice_is_busy() {
    let (line, _) = MockLine::new();
    let (_, clock) = manual_clock(0);
    let mut trigger: Trigger<_, _> = Trigger::setup(line, TriggerType::EdgeRising, clock).unwrap();
    let mut dev = Lis3mdl::new(MockBus::new());

    let (_, mut deferred) = trigger.split();
    deferred.enable(&mut dev, ScanMask::ALL).unwrap();
    assert!(matches!(deferred.enable(&mut dev, ScanMask::ALL), Err(MagError::Busy)));
}

#[test]
fn enable_issues_warm_up_read() {
    let (line, _) = MockLine::new();
    let (_, clock) = manual_clock(0);
    let mut trigger: Trigger<_, _> = Trigger::setup(line, TriggerType::EdgeRising, clock).unwrap();
    let mut dev = Lis3mdl::new(MockBus::new());

    let (_, mut deferred) = trigger.split();
    deferred.enable(&mut dev, ScanMask::ALL).unwrap();
    assert_eq!(dev.bus().log, vec![BusOp::Read(Registers::StatusReg.addr())]);
}

#[test]
fn failed_warm_up_read_still_arms() {
    let (line, _) = MockLine::new();
    let (_, clock) = manual_clock(0);
    let mut trigger: Trigger<_, _> = Trigger::setup(line, TriggerType::EdgeRising, clock).unwrap();
    let mut bus = MockBus::new();
    bus.fail_read(Registers::StatusReg.addr());
    let mut dev = Lis3mdl::new(bus);

    let (_, mut deferred) = trigger.split();
    assert!(deferred.enable(&mut dev, ScanMask::ALL).is_ok());
    assert_eq!(deferred.state(), TriggerState::Armed);
    assert!(dev.is_enabled());
}

#[test]
fn release_refused_while_armed() {
    let (line, log) = MockLine::new();
    let (_, clock) = manual_clock(0);
    let mut trigger: Trigger<_, _> = Trigger::setup(line, TriggerType::EdgeRising, clock).unwrap();
    let mut dev = Lis3mdl::new(MockBus::new());

    {
        let (_, mut deferred) = trigger.split();
        deferred.enable(&mut dev, ScanMask::ALL).unwrap();
    }

    let mut trigger = match trigger.release() {
        Ok(_) => panic!("line released while armed"),
        Err(trigger) => trigger,
    };
    assert!(!log.released.get());

    {
        let (_, mut deferred) = trigger.split();
        deferred.disable(&mut dev);
    }

    assert!(trigger.release().is_ok());
    assert!(log.released.get());
    assert!(dev.destroy().is_ok());
}

#[test]
fn software_trigger_requires_armed() {
    let (line, _) = MockLine::new();
    let (_, clock) = manual_clock(0);
    let mut trigger: Trigger<_, _> = Trigger::setup(line, TriggerType::EdgeRising, clock).unwrap();
    let mut dev = Lis3mdl::new(MockBus::new());
    let mut sink = VecSink::new();

    let (mut irq, mut deferred) = trigger.split();
    assert!(matches!(
        deferred.fire_software(&mut dev, &mut sink),
        Err(MagError::InvalidArgument)
    ));

    deferred.enable(&mut dev, ScanMask::ALL).unwrap();
    irq.on_interrupt();
    assert!(matches!(deferred.fire_software(&mut dev, &mut sink), Err(MagError::Busy)));

    deferred.service(&mut dev, &mut sink).unwrap().unwrap();
    deferred.fire_software(&mut dev, &mut sink).unwrap();
    assert_eq!(sink.records.len(), 2);
    assert_eq!(deferred.completed_cycles(), 2);
}
