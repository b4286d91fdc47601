//! Streaming module: the continuous write/read cycle.

// IMPORTANT: Do not call assert_invariant or any PPT logging in the cycle path to avoid locks/allocs.

use crate::config::{StreamConfig, OUTPUT_CHANNELS};
use crate::device::Device;
use crate::error::StreamError;
use crate::fault::FaultTrigger;
use crate::invariant_rt::{
    signal_invariant, INV_CYCLE_CLEAN, INV_FAULT_STALL_SERVED, INV_RX_CONSUMED, INV_RX_FILLED,
    INV_TX_DRAINED, INV_WRITES_BEFORE_READ,
};
use crate::queue::{Sample, TxQueue};
use crate::sink::SampleSink;
use crate::states::{StreamState, Verdict};
use rtrb::Producer;

/// Counters kept across cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Cycles that completed write, read and consume.
    pub cycles: u64,
    /// Samples each output channel's device write accepted.
    pub samples_written: [u64; OUTPUT_CHANNELS],
    /// Tuples received and consumed.
    pub samples_read: u64,
    /// Fault stalls served.
    pub stalls: u64,
}

/// The streaming loop: owns the transmit queues and the receive buffer.
#[derive(Debug)]
pub struct StreamingLoop {
    config: StreamConfig,
    tx: [TxQueue; OUTPUT_CHANNELS],
    rx: Vec<Sample>,
    state: StreamState,
    stats: StreamStats,
    fault: Option<FaultTrigger>,
    signals: Option<Producer<u8>>,
}

impl StreamingLoop {
    /// Validate `config` and allocate every buffer the cycle will use.
    pub fn new(config: StreamConfig) -> Result<Self, StreamError> {
        config.validate()?;
        let tx = TxQueue::per_channel(config.target_depth);
        let rx = Vec::with_capacity(config.samples_per_cycle);
        Ok(Self {
            config,
            tx,
            rx,
            state: StreamState::Idle,
            stats: StreamStats::default(),
            fault: None,
            signals: None,
        })
    }

    /// Check `trigger` at the top of every cycle.
    pub fn with_fault_trigger(mut self, trigger: FaultTrigger) -> Self {
        self.fault = Some(trigger);
        self
    }

    /// Emit cycle invariants on `tx`.
    pub fn with_invariant_signals(mut self, tx: Producer<u8>) -> Self {
        self.signals = Some(tx);
        self
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    pub fn tx_queues(&self) -> &[TxQueue; OUTPUT_CHANNELS] {
        &self.tx
    }

    /// Tuples from the most recent read.
    pub fn received(&self) -> &[Sample] {
        &self.rx
    }

    /// Mark the loop faulted by an error raised outside the cycle (startup)
    /// and hand the error back.
    pub fn fail(&mut self, err: StreamError) -> StreamError {
        self.state.fault();
        err
    }

    /// Run one cycle: refill and write every channel, read, consume.
    ///
    /// Any error faults the loop; later calls return
    /// [`StreamError::Faulted`] without touching the device.
    pub fn run_cycle<D, S>(&mut self, device: &mut D, sink: &mut S) -> Result<(), StreamError>
    where
        D: Device + ?Sized,
        S: SampleSink + ?Sized,
    {
        if !self.state.begin_cycle() {
            return Err(StreamError::Faulted);
        }
        match self.cycle(device, sink) {
            Ok(()) => {
                self.stats.cycles += 1;
                self.signal(INV_CYCLE_CLEAN);
                log::trace!("cycle {} complete", self.stats.cycles);
                Ok(())
            }
            Err(err) => {
                log::debug!("cycle {} failed: {}", self.stats.cycles + 1, err);
                Err(self.fail(err))
            }
        }
    }

    /// Run one cycle and turn the outcome into a verdict.
    pub fn step<D, S>(&mut self, device: &mut D, sink: &mut S) -> Verdict
    where
        D: Device + ?Sized,
        S: SampleSink + ?Sized,
    {
        match self.run_cycle(device, sink) {
            Ok(()) => Verdict::Continue,
            Err(err) => Verdict::Terminate(err),
        }
    }

    /// Cycle until a fatal error and return it.
    pub fn run<D, S>(&mut self, device: &mut D, sink: &mut S) -> StreamError
    where
        D: Device + ?Sized,
        S: SampleSink + ?Sized,
    {
        loop {
            if let Verdict::Terminate(err) = self.step(device, sink) {
                return err;
            }
        }
    }

    fn cycle<D, S>(&mut self, device: &mut D, sink: &mut S) -> Result<(), StreamError>
    where
        D: Device + ?Sized,
        S: SampleSink + ?Sized,
    {
        if self.fault.as_ref().is_some_and(FaultTrigger::service) {
            self.stats.stalls += 1;
            self.signal(INV_FAULT_STALL_SERVED);
        }

        let depth = self.config.target_depth;
        let fill = self.config.fill_value;
        for (index, queue) in self.tx.iter_mut().enumerate() {
            queue.refill(depth, fill);
            let queued = queue.len();
            let channel = queue.channel();
            device.write(queue.samples_mut(), channel)?;
            // A write may only shrink the queue.
            if queue.len() <= queued {
                if let Some(tx) = self.signals.as_mut() {
                    signal_invariant(tx, INV_TX_DRAINED);
                }
            }
            self.stats.samples_written[index] += queued.saturating_sub(queue.len()) as u64;
        }
        self.signal(INV_WRITES_BEFORE_READ);

        let count = self.config.samples_per_cycle;
        self.rx.clear();
        device.read(&mut self.rx, count)?;
        if self.rx.len() != count {
            return Err(StreamError::ShortRead {
                expected: count,
                actual: self.rx.len(),
            });
        }
        self.signal(INV_RX_FILLED);

        sink.consume(&self.rx)?;
        self.stats.samples_read += count as u64;
        self.signal(INV_RX_CONSUMED);
        Ok(())
    }

    #[inline]
    fn signal(&mut self, id: u8) {
        if let Some(tx) = self.signals.as_mut() {
            signal_invariant(tx, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeviceError;
    use crate::harness::{Call, MockDevice};
    use crate::sink::NullSink;

    fn small_config() -> StreamConfig {
        StreamConfig {
            target_depth: 64,
            samples_per_cycle: 32,
            ..StreamConfig::default()
        }
    }

    #[test]
    fn cycle_writes_each_channel_then_reads() {
        let mut stream = StreamingLoop::new(small_config()).unwrap();
        let mut device = MockDevice::new();
        let mut sink = NullSink::default();
        stream.run_cycle(&mut device, &mut sink).unwrap();

        assert_eq!(
            device.calls(),
            &[
                Call::Write { channel: 0, queued: 64 },
                Call::Write { channel: 1, queued: 64 },
                Call::Read { count: 32 },
            ]
        );
        assert_eq!(sink.consumed, 32);
        assert_eq!(stream.state(), StreamState::Streaming);
        assert_eq!(stream.stats().samples_written, [64, 64]);
    }

    #[test]
    fn faulted_loop_never_touches_the_device_again() {
        let mut stream = StreamingLoop::new(small_config()).unwrap();
        let mut device = MockDevice::new().fail_at(1, DeviceError::underflow(1));
        let mut sink = NullSink::default();

        let err = stream.run_cycle(&mut device, &mut sink).unwrap_err();
        assert!(err.is_timing_violation());
        assert_eq!(stream.state(), StreamState::Faulted);
        let calls = device.calls().len();

        assert!(matches!(
            stream.run_cycle(&mut device, &mut sink),
            Err(StreamError::Faulted)
        ));
        assert_eq!(device.calls().len(), calls);
        assert_eq!(sink.consumed, 0);
    }

    #[test]
    fn short_read_is_fatal() {
        let mut stream = StreamingLoop::new(small_config()).unwrap();
        let mut device = MockDevice::new().short_reads(8);
        let err = stream
            .run_cycle(&mut device, &mut NullSink::default())
            .unwrap_err();
        assert!(matches!(
            err,
            StreamError::ShortRead {
                expected: 32,
                actual: 8
            }
        ));
    }

    #[test]
    fn run_returns_the_terminal_error() {
        let mut stream = StreamingLoop::new(small_config()).unwrap();
        let mut device = MockDevice::new().fail_at(8, DeviceError::overflow());
        let err = stream.run(&mut device, &mut NullSink::default());
        assert!(err.is_timing_violation());
        // Calls 0..=7 are two full cycles plus both writes of the third.
        assert_eq!(stream.stats().cycles, 2);
    }
}
