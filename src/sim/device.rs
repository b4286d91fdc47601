//! Host side of a simulated device.

use super::transport::{DataflowEvent, Transport, TransportEnds, EVENT_QUEUE_CAPACITY};
use super::SimConfig;
use crate::config::{INPUT_WIDTH, OUTPUT_CHANNELS};
use crate::control::{new_control_queue, TransportCmd};
use crate::device::{Device, DeviceInfo};
use crate::error::DeviceError;
use crate::queue::Sample;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use rtrb::{Consumer, Producer, RingBuffer};
use std::collections::VecDeque;
use std::thread::JoinHandle;
use std::time::Duration;

/// Dataflow events a device has drained so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataflowCounts {
    pub overflows: u64,
    pub underflows: [u64; OUTPUT_CHANNELS],
}

impl DataflowCounts {
    fn record(&mut self, event: DataflowEvent) {
        match event {
            DataflowEvent::Overflow => self.overflows += 1,
            DataflowEvent::Underflow { channel } => self.underflows[channel] += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.overflows + self.underflows.iter().sum::<u64>()
    }
}

/// One simulated instrument and its transport thread.
pub struct SimDevice {
    info: DeviceInfo,
    outputs: [Producer<f32>; OUTPUT_CHANNELS],
    input: Receiver<Vec<Sample>>,
    pending: VecDeque<Sample>,
    events: Consumer<DataflowEvent>,
    control: Producer<TransportCmd>,
    transport: Option<JoinHandle<()>>,
    running: bool,
    rate: u32,
    packet: usize,
    read_timeout: Duration,
    ignore_dataflow: bool,
    counts: DataflowCounts,
}

impl std::fmt::Debug for SimDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimDevice")
            .field("serial", &self.info.serial)
            .field("running", &self.running)
            .field("rate", &self.rate)
            .field("counts", &self.counts)
            .finish()
    }
}

impl SimDevice {
    /// Create the device and park its transport thread until started.
    pub(crate) fn attach(index: usize, config: &SimConfig) -> Result<Self, DeviceError> {
        let packet = config.packet();
        let fifo = config.fifo();

        let (out_a, ring_a) = RingBuffer::new(fifo);
        let (out_b, ring_b) = RingBuffer::new(fifo);
        let (input_tx, input_rx) = crossbeam_channel::bounded(fifo / packet);
        let (events_tx, events_rx) = RingBuffer::new(EVENT_QUEUE_CAPACITY);
        let (control_tx, control_rx) = new_control_queue();

        let serial = format!("SIM{:05}", index);
        let transport = Transport::new(
            TransportEnds {
                outputs: [ring_a, ring_b],
                input: input_tx,
                events: events_tx,
                control: control_rx,
            },
            packet,
            config.load_ohms,
        )
        .spawn(format!("transport-{}", serial))
        .map_err(|err| {
            log::error!("failed to start transport for {}: {}", serial, err);
            DeviceError::Detached
        })?;

        Ok(Self {
            info: DeviceInfo {
                serial,
                firmware: "2.17-sim".to_string(),
                output_channels: OUTPUT_CHANNELS,
                input_width: INPUT_WIDTH,
                default_rate: config.default_rate,
            },
            outputs: [out_a, out_b],
            input: input_rx,
            pending: VecDeque::with_capacity(packet),
            events: events_rx,
            control: control_tx,
            transport: Some(transport),
            running: false,
            rate: config.default_rate,
            packet,
            read_timeout: config.read_timeout,
            ignore_dataflow: config.ignore_dataflow,
            counts: DataflowCounts::default(),
        })
    }

    pub(crate) fn start(&mut self, rate: u32) -> Result<(), DeviceError> {
        self.send(TransportCmd::Start { rate })?;
        self.rate = rate;
        self.running = true;
        Ok(())
    }

    pub(crate) fn stop(&mut self) -> Result<(), DeviceError> {
        self.send(TransportCmd::Stop)?;
        self.running = false;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Every dataflow event drained so far, reported or ignored.
    pub fn dataflow_counts(&self) -> DataflowCounts {
        self.counts
    }

    fn send(&mut self, cmd: TransportCmd) -> Result<(), DeviceError> {
        self.control.push(cmd).map_err(|_| DeviceError::Detached)
    }

    /// How long a read waits for one packet.
    fn packet_wait(&self) -> Duration {
        let period = Duration::from_secs_f64(self.packet as f64 / f64::from(self.rate.max(1)));
        self.read_timeout.max(period * 4)
    }

    /// Drain transport events; the first one fails the transfer.
    fn check_dataflow(&mut self) -> Result<(), DeviceError> {
        let mut first = None;
        while let Ok(event) = self.events.pop() {
            self.counts.record(event);
            if self.ignore_dataflow {
                log::warn!("{}: ignoring {:?}", self.info.serial, event);
            } else if first.is_none() {
                first = Some(event);
            }
        }
        match first {
            Some(event) => Err(event.into()),
            None => Ok(()),
        }
    }
}

impl Device for SimDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn write(&mut self, queue: &mut VecDeque<f32>, channel: usize) -> Result<(), DeviceError> {
        if channel >= OUTPUT_CHANNELS {
            return Err(DeviceError::InvalidChannel {
                channel,
                available: OUTPUT_CHANNELS,
            });
        }
        self.check_dataflow()?;

        let ring = &mut self.outputs[channel];
        let accepted = ring.slots().min(queue.len());
        if accepted == 0 {
            return Ok(());
        }
        // A chunk commits all at once, so the transport never sees a half-written cycle.
        if let Ok(chunk) = ring.write_chunk_uninit(accepted) {
            chunk.fill_from_iter(queue.drain(..accepted));
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut Vec<Sample>, count: usize) -> Result<(), DeviceError> {
        if !self.running {
            return Err(DeviceError::NotStarted);
        }
        self.check_dataflow()?;

        buf.clear();
        let wait = self.packet_wait();
        while buf.len() < count {
            if self.pending.is_empty() {
                match self.input.recv_timeout(wait) {
                    Ok(packet) => self.pending.extend(packet),
                    Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                        log::error!(
                            "{}: no samples for {} ms",
                            self.info.serial,
                            wait.as_millis()
                        );
                        return Err(DeviceError::Detached);
                    }
                }
            }
            let take = (count - buf.len()).min(self.pending.len());
            buf.extend(self.pending.drain(..take));
        }

        self.check_dataflow()
    }
}

impl Drop for SimDevice {
    fn drop(&mut self) {
        // Only join when the transport is certain to see the halt.
        if self.control.push(TransportCmd::Halt).is_ok() {
            if let Some(transport) = self.transport.take() {
                let _ = transport.join();
            }
        }
    }
}
