//! Call ordering and failure handling of the streaming cycle, observed
//! through a recording mock device.

use smu_stream::config::StreamConfig;
use smu_stream::harness::{Call, MockDevice};
use smu_stream::sink::{NullSink, SampleSink};
use smu_stream::{DeviceError, Sample, StreamError, StreamState, StreamingLoop, Verdict};

/// Keeps a copy of every tuple it is handed.
#[derive(Default)]
struct Recorder {
    blocks: Vec<Vec<Sample>>,
}

impl SampleSink for Recorder {
    fn consume(&mut self, tuples: &[Sample]) -> Result<(), StreamError> {
        self.blocks.push(tuples.to_vec());
        Ok(())
    }
}

#[test]
fn default_cycle_writes_a_then_b_then_reads_1024() {
    let mut stream = StreamingLoop::new(StreamConfig::default()).unwrap();
    let mut device = MockDevice::new();
    stream.run_cycle(&mut device, &mut NullSink::default()).unwrap();

    assert_eq!(
        device.calls(),
        &[
            Call::Write { channel: 0, queued: 1024 },
            Call::Write { channel: 1, queued: 1024 },
            Call::Read { count: 1024 },
        ]
    );
}

#[test]
fn every_write_sees_a_queue_at_depth() {
    let mut stream = StreamingLoop::new(StreamConfig::default()).unwrap();
    // The device only takes part of each queue, so later cycles must top up.
    let mut device = MockDevice::new().accept(300);
    let mut sink = NullSink::default();
    for _ in 0..5 {
        stream.run_cycle(&mut device, &mut sink).unwrap();
    }

    let writes: Vec<_> = device
        .calls()
        .iter()
        .filter_map(|call| match call {
            Call::Write { queued, .. } => Some(*queued),
            Call::Read { .. } => None,
        })
        .collect();
    assert_eq!(writes.len(), 10);
    assert!(writes.iter().all(|&queued| queued == 1024));
    assert_eq!(stream.stats().samples_written, [1500, 1500]);
    for queue in stream.tx_queues() {
        assert_eq!(queue.len(), 1024 - 300);
    }
}

#[test]
fn each_cycle_delivers_only_its_own_read() {
    let config = StreamConfig {
        samples_per_cycle: 4,
        ..StreamConfig::default()
    };
    let mut stream = StreamingLoop::new(config).unwrap();
    let mut device = MockDevice::new();
    let mut sink = Recorder::default();
    for _ in 0..3 {
        stream.run_cycle(&mut device, &mut sink).unwrap();
    }

    assert_eq!(sink.blocks.len(), 3);
    for (n, block) in sink.blocks.iter().enumerate() {
        let tag = (n + 1) as f32;
        assert_eq!(block.len(), 4);
        assert!(block.iter().all(|tuple| tuple[0] == tag && tuple[2] == -tag));
    }
    assert_eq!(stream.received()[3], [3.0, 3.0, -3.0, 0.0]);
}

#[test]
fn timing_violation_stops_the_loop() {
    let mut stream = StreamingLoop::new(StreamConfig::default()).unwrap();
    let mut device = MockDevice::new().fail_at(3, DeviceError::underflow(0));
    let mut sink = Recorder::default();

    assert!(matches!(stream.step(&mut device, &mut sink), Verdict::Continue));
    match stream.step(&mut device, &mut sink) {
        Verdict::Terminate(err) => {
            assert!(err.is_timing_violation());
            assert_eq!(err.diagnostic(), "sample(s) dropped!");
        }
        Verdict::Continue => panic!("underflow must terminate the stream"),
    }
    assert_eq!(stream.state(), StreamState::Faulted);
    assert_eq!(device.call_count(), 4);

    // Terminal: nothing else reaches the device.
    assert!(stream.step(&mut device, &mut sink).is_terminal());
    assert_eq!(device.call_count(), 4);
    assert_eq!(sink.blocks.len(), 1);
}

#[test]
fn failed_read_after_successful_writes_fails_the_whole_cycle() {
    let mut stream = StreamingLoop::new(StreamConfig::default()).unwrap();
    let mut device = MockDevice::new().fail_at(2, DeviceError::overflow());
    let mut sink = Recorder::default();

    let err = stream.run_cycle(&mut device, &mut sink).unwrap_err();
    assert!(err.is_timing_violation());
    // Both writes went out, but the cycle never counts as complete.
    assert_eq!(device.calls().len(), 3);
    assert_eq!(stream.stats().cycles, 0);
    assert_eq!(stream.stats().samples_read, 0);
    assert!(sink.blocks.is_empty());
}

#[test]
fn detached_device_is_fatal_too() {
    let mut stream = StreamingLoop::new(StreamConfig::default()).unwrap();
    let mut device = MockDevice::new().fail_at(0, DeviceError::Detached);
    let err = stream.run(&mut device, &mut NullSink::default());
    assert!(matches!(err, StreamError::Device(DeviceError::Detached)));
    assert!(!err.is_timing_violation());
    assert_eq!(err.diagnostic(), "device detached");
}
