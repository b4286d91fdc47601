use smu_stream::config::StreamConfig;
use smu_stream::harness::MockDevice;
use smu_stream::sink::NullSink;
use smu_stream::StreamingLoop;
use std::time::Instant;

#[test]
fn cycle_overhead_is_bounded() {
    let mut stream = StreamingLoop::new(StreamConfig::default()).unwrap();
    let mut device = MockDevice::new().unrecorded();
    let mut sink = NullSink::default();

    let start = Instant::now();
    for _ in 0..1000 {
        stream.run_cycle(&mut device, &mut sink).unwrap();
    }
    let duration = start.elapsed();
    // Well under one packet period at the default rate per cycle.
    assert!(duration.as_millis() < 1000, "Execution took too long: {:?}", duration);
}
