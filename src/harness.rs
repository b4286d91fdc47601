//! Test harness: scripted devices and sessions that record how the loop
//! drives them.

use crate::config::{INPUT_WIDTH, OUTPUT_CHANNELS};
use crate::device::{Device, DeviceInfo, Mode, Session};
use crate::error::DeviceError;
use crate::queue::Sample;
use std::collections::VecDeque;

/// Default rate reported by mock devices.
pub const MOCK_RATE: u32 = 100_000;

/// One transfer call seen by a [`MockDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `queued` is the queue length at the moment of the call.
    Write { channel: usize, queued: usize },
    Read { count: usize },
}

/// A device that accepts writes, fabricates reads and can be told to fail.
///
/// Tuples of the n-th read (1-based) are `[n, index, -n, 0.0]`, so stale
/// data from an earlier cycle is easy to spot.
#[derive(Debug)]
pub struct MockDevice {
    info: DeviceInfo,
    calls: Vec<Call>,
    record: bool,
    accept: usize,
    fail_at: Option<(usize, DeviceError)>,
    short: Option<usize>,
    call_index: usize,
    reads: u64,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            info: DeviceInfo {
                serial: "MOCK-0000".to_string(),
                firmware: "mock".to_string(),
                output_channels: OUTPUT_CHANNELS,
                input_width: INPUT_WIDTH,
                default_rate: MOCK_RATE,
            },
            calls: Vec::new(),
            record: true,
            accept: usize::MAX,
            fail_at: None,
            short: None,
            call_index: 0,
            reads: 0,
        }
    }

    /// Fail the `call`-th transfer (0-based, writes and reads counted together).
    pub fn fail_at(mut self, call: usize, err: DeviceError) -> Self {
        self.fail_at = Some((call, err));
        self
    }

    /// Deliver only `count` tuples per read.
    pub fn short_reads(mut self, count: usize) -> Self {
        self.short = Some(count);
        self
    }

    /// Drain at most `samples` from the queue per write.
    pub fn accept(mut self, samples: usize) -> Self {
        self.accept = samples;
        self
    }

    /// Stop recording calls, so transfers never allocate.
    pub fn unrecorded(mut self) -> Self {
        self.record = false;
        self
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Transfers attempted so far, recorded or not.
    pub fn call_count(&self) -> usize {
        self.call_index
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }

    fn enter(&mut self, call: Call) -> Result<(), DeviceError> {
        if self.record {
            self.calls.push(call);
        }
        let index = self.call_index;
        self.call_index += 1;
        match &self.fail_at {
            Some((at, err)) if *at == index => Err(err.clone()),
            _ => Ok(()),
        }
    }
}

impl Device for MockDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn write(&mut self, queue: &mut VecDeque<f32>, channel: usize) -> Result<(), DeviceError> {
        self.enter(Call::Write {
            channel,
            queued: queue.len(),
        })?;
        if channel >= OUTPUT_CHANNELS {
            return Err(DeviceError::InvalidChannel {
                channel,
                available: OUTPUT_CHANNELS,
            });
        }
        let taken = self.accept.min(queue.len());
        drop(queue.drain(..taken));
        Ok(())
    }

    fn read(&mut self, buf: &mut Vec<Sample>, count: usize) -> Result<(), DeviceError> {
        self.enter(Call::Read { count })?;
        self.reads += 1;
        let tag = self.reads as f32;
        let delivered = self.short.unwrap_or(count).min(count);
        buf.clear();
        buf.extend((0..delivered).map(|i| [tag, i as f32, -tag, 0.0]));
        Ok(())
    }
}

/// Session operations seen by a [`MockSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCall {
    AddAll,
    Configure(u32),
    Start,
    End,
}

/// A session whose devices are handed in up front.
#[derive(Debug, Default)]
pub struct MockSession {
    attached: Vec<MockDevice>,
    devices: Vec<MockDevice>,
    log: Vec<SessionCall>,
}

impl MockSession {
    /// A session that discovers `attached` on `add_all`.
    pub fn new(attached: Vec<MockDevice>) -> Self {
        Self {
            attached,
            ..Self::default()
        }
    }

    /// A session with nothing plugged in.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn log(&self) -> &[SessionCall] {
        &self.log
    }
}

impl Session for MockSession {
    type Device = MockDevice;

    fn add_all(&mut self) -> Result<usize, DeviceError> {
        self.log.push(SessionCall::AddAll);
        self.devices.append(&mut self.attached);
        Ok(self.devices.len())
    }

    fn devices(&self) -> &[MockDevice] {
        &self.devices
    }

    fn device_mut(&mut self, index: usize) -> Option<&mut MockDevice> {
        self.devices.get_mut(index)
    }

    fn configure(&mut self, rate: u32) -> Result<u32, DeviceError> {
        self.log.push(SessionCall::Configure(rate));
        Ok(rate)
    }

    fn start(&mut self, _mode: Mode) -> Result<(), DeviceError> {
        self.log.push(SessionCall::Start);
        Ok(())
    }

    fn end(&mut self) -> Result<(), DeviceError> {
        self.log.push(SessionCall::End);
        Ok(())
    }
}
