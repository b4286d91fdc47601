//! Contract tests for both invariant tiers.
//!
//! The PPT tier is checked through the shared invariant log, the streaming
//! tier through the signal ring the loop writes on every cycle.

use smu_stream::config::StreamConfig;
use smu_stream::driver::{self, Options};
use smu_stream::harness::{MockDevice, MockSession};
use smu_stream::invariant_ppt::{
    contract_test, CONFIG_REJECTS_INVALID, CONFIG_VALID, DEVICE_PRESENT, FAULT_TERMINAL,
    NO_DEVICE_REJECTED, QUEUES_PREALLOCATED, RATE_NEGOTIATED, STREAM_STARTED,
};
use smu_stream::invariant_rt::{
    contract_test_rt, count_invariant_signals, drain_invariant_signals, new_invariant_queue,
    INV_CYCLE_CLEAN, INV_FAULT_STALL_SERVED, INV_RX_CONSUMED, INV_RX_FILLED, INV_TX_DRAINED,
    INV_WRITES_BEFORE_READ,
};
use smu_stream::device::{Device, DeviceInfo};
use smu_stream::sink::NullSink;
use smu_stream::{DeviceError, FaultTrigger, Sample, StreamingLoop};
use std::collections::VecDeque;
use std::time::Duration;

#[test]
fn contract_bring_up_and_teardown() {
    let mut session = MockSession::new(vec![MockDevice::new().fail_at(5, DeviceError::overflow())]);
    let options = Options::default();
    let err = driver::run(&mut session, &options, &options.fault_trigger(), |_| {
        Ok(NullSink::default())
    })
    .unwrap_err();
    assert!(err.is_timing_violation());

    contract_test(
        "bring-up then fatal error",
        &[
            CONFIG_VALID,
            QUEUES_PREALLOCATED,
            DEVICE_PRESENT,
            RATE_NEGOTIATED,
            STREAM_STARTED,
            FAULT_TERMINAL,
        ],
    );
}

#[test]
fn contract_rejections() {
    let mut session = MockSession::empty();
    assert!(driver::bring_up(&mut session, None).is_err());
    let zero = StreamConfig {
        target_depth: 0,
        ..StreamConfig::default()
    };
    assert!(StreamingLoop::new(zero).is_err());

    contract_test("rejections", &[NO_DEVICE_REJECTED, CONFIG_REJECTS_INVALID]);
}

#[test]
fn contract_every_cycle_writes_before_it_reads() {
    let (tx, mut rx) = new_invariant_queue();
    let mut stream = StreamingLoop::new(StreamConfig::default())
        .unwrap()
        .with_invariant_signals(tx);
    let mut device = MockDevice::new();
    let mut sink = NullSink::default();
    for _ in 0..10 {
        stream.run_cycle(&mut device, &mut sink).unwrap();
    }

    let signals = drain_invariant_signals(&mut rx);
    contract_test_rt(
        "clean cycles",
        &signals,
        &[
            INV_TX_DRAINED,
            INV_WRITES_BEFORE_READ,
            INV_RX_FILLED,
            INV_RX_CONSUMED,
            INV_CYCLE_CLEAN,
        ],
    );

    let counts = count_invariant_signals(&signals);
    assert_eq!(counts[INV_TX_DRAINED as usize], 20);
    assert_eq!(counts[INV_CYCLE_CLEAN as usize], 10);
    assert_eq!(counts[INV_FAULT_STALL_SERVED as usize], 0);

    // Within a cycle the barrier comes before the read is reported.
    let barrier = signals.iter().position(|&id| id == INV_WRITES_BEFORE_READ);
    let filled = signals.iter().position(|&id| id == INV_RX_FILLED);
    assert!(barrier < filled);
}

/// Accepts writes like the mock, then pushes a stray sample back onto the
/// queue it was handed.
struct Regrowing(MockDevice);

impl Device for Regrowing {
    fn info(&self) -> &DeviceInfo {
        self.0.info()
    }

    fn write(&mut self, queue: &mut VecDeque<f32>, channel: usize) -> Result<(), DeviceError> {
        self.0.write(queue, channel)?;
        queue.push_back(0.0);
        Ok(())
    }

    fn read(&mut self, buf: &mut Vec<Sample>, count: usize) -> Result<(), DeviceError> {
        self.0.read(buf, count)
    }
}

#[test]
fn contract_tx_drained_is_withheld_when_a_write_grows_its_queue() {
    let (tx, mut rx) = new_invariant_queue();
    let mut stream = StreamingLoop::new(StreamConfig::default())
        .unwrap()
        .with_invariant_signals(tx);
    let mut device = Regrowing(MockDevice::new().accept(0));
    stream
        .run_cycle(&mut device, &mut NullSink::default())
        .unwrap();

    let signals = drain_invariant_signals(&mut rx);
    assert!(!signals.contains(&INV_TX_DRAINED));
    assert!(signals.contains(&INV_CYCLE_CLEAN));
}

#[test]
fn contract_failed_cycle_is_never_clean() {
    let (tx, mut rx) = new_invariant_queue();
    let mut stream = StreamingLoop::new(StreamConfig::default())
        .unwrap()
        .with_invariant_signals(tx);
    let mut device = MockDevice::new().fail_at(2, DeviceError::overflow());
    assert!(stream
        .run_cycle(&mut device, &mut NullSink::default())
        .is_err());

    let signals = drain_invariant_signals(&mut rx);
    assert!(signals.contains(&INV_WRITES_BEFORE_READ));
    assert!(!signals.contains(&INV_RX_FILLED));
    assert!(!signals.contains(&INV_CYCLE_CLEAN));
}

#[test]
fn contract_stall_is_reported() {
    let (tx, mut rx) = new_invariant_queue();
    let trigger = FaultTrigger::new(Duration::from_millis(1));
    let mut stream = StreamingLoop::new(StreamConfig::default())
        .unwrap()
        .with_fault_trigger(trigger.clone())
        .with_invariant_signals(tx);
    trigger.trigger();
    stream
        .run_cycle(&mut MockDevice::new(), &mut NullSink::default())
        .unwrap();

    let signals = drain_invariant_signals(&mut rx);
    contract_test_rt("stall served", &signals, &[INV_FAULT_STALL_SERVED, INV_CYCLE_CLEAN]);
    assert_eq!(signals.first(), Some(&INV_FAULT_STALL_SERVED));
}
