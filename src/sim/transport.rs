//! Transport thread of a simulated device.

use crate::config::OUTPUT_CHANNELS;
use crate::control::TransportCmd;
use crate::error::DeviceError;
use crate::queue::Sample;
use crossbeam_channel::{Sender, TrySendError};
use rtrb::{Consumer, Producer};
use std::io;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Capacity of the transport → device event ring.
pub(crate) const EVENT_QUEUE_CAPACITY: usize = 64;

/// Longest the transport sleeps before looking at its command queue again.
const IDLE_POLL: Duration = Duration::from_millis(2);

/// A dataflow failure observed by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataflowEvent {
    Overflow,
    Underflow { channel: usize },
}

impl From<DataflowEvent> for DeviceError {
    fn from(event: DataflowEvent) -> Self {
        match event {
            DataflowEvent::Overflow => DeviceError::overflow(),
            DataflowEvent::Underflow { channel } => DeviceError::underflow(channel),
        }
    }
}

/// The transport's side of every queue it shares with its device.
pub(crate) struct TransportEnds {
    pub outputs: [Consumer<f32>; OUTPUT_CHANNELS],
    pub input: Sender<Vec<Sample>>,
    pub events: Producer<DataflowEvent>,
    pub control: Consumer<TransportCmd>,
}

/// Packet schedule anchored at the moment streaming started.
struct Clock {
    started: Instant,
    period: Duration,
    packets: u64,
}

impl Clock {
    fn new(rate: u32, packet: usize) -> Self {
        Self {
            started: Instant::now(),
            period: Duration::from_secs_f64(packet as f64 / f64::from(rate.max(1))),
            packets: 0,
        }
    }

    /// Packets whose deadline has passed but that were not produced yet.
    fn due(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.started).as_nanos();
        let ticks = elapsed / self.period.as_nanos().max(1);
        (ticks as u64).saturating_sub(self.packets)
    }

    fn next_deadline(&self) -> Instant {
        self.started + self.period.mul_f64((self.packets + 1) as f64)
    }
}

pub(crate) struct Transport {
    ends: TransportEnds,
    packet: usize,
    load_ohms: f32,
    primed: [bool; OUTPUT_CHANNELS],
    held: [f32; OUTPUT_CHANNELS],
    clock: Option<Clock>,
}

impl Transport {
    pub(crate) fn new(ends: TransportEnds, packet: usize, load_ohms: f32) -> Self {
        Self {
            ends,
            packet,
            load_ohms,
            primed: [false; OUTPUT_CHANNELS],
            held: [0.0; OUTPUT_CHANNELS],
            clock: None,
        }
    }

    pub(crate) fn spawn(self, name: String) -> io::Result<JoinHandle<()>> {
        thread::Builder::new().name(name).spawn(move || self.run())
    }

    fn run(mut self) {
        loop {
            while let Ok(cmd) = self.ends.control.pop() {
                log::trace!("transport command: {}", cmd.description());
                match cmd {
                    TransportCmd::Start { rate } => self.clock = Some(Clock::new(rate, self.packet)),
                    TransportCmd::Stop => self.clock = None,
                    TransportCmd::Halt => return,
                }
            }
            if self.ends.control.is_abandoned() {
                return;
            }

            let now = Instant::now();
            let due = match &self.clock {
                Some(clock) => clock.due(now),
                None => {
                    thread::sleep(IDLE_POLL);
                    continue;
                }
            };
            for _ in 0..due {
                if !self.exchange_packet() {
                    return;
                }
            }

            let Some(clock) = self.clock.as_mut() else {
                continue;
            };
            clock.packets += due;
            let wait = clock
                .next_deadline()
                .saturating_duration_since(Instant::now())
                .min(IDLE_POLL);
            thread::sleep(wait);
        }
    }

    /// Take one packet from each output ring and produce one input packet.
    /// Returns false once the device side is gone.
    fn exchange_packet(&mut self) -> bool {
        let mut packet = Vec::with_capacity(self.packet);
        let mut starved = [false; OUTPUT_CHANNELS];

        for _ in 0..self.packet {
            let mut tuple = [0.0; 4];
            for channel in 0..OUTPUT_CHANNELS {
                match self.ends.outputs[channel].pop() {
                    Ok(value) => {
                        self.held[channel] = value;
                        self.primed[channel] = true;
                    }
                    // A channel nobody has written to yet idles at its held value.
                    Err(_) => starved[channel] |= self.primed[channel],
                }
                let volts = self.held[channel];
                tuple[2 * channel] = volts;
                tuple[2 * channel + 1] = volts / self.load_ohms;
            }
            packet.push(tuple);
        }

        for (channel, &starved) in starved.iter().enumerate() {
            if starved {
                self.signal(DataflowEvent::Underflow { channel });
            }
        }

        match self.ends.input.try_send(packet) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.signal(DataflowEvent::Overflow);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Never blocks; a full ring already holds an unreported event.
    fn signal(&mut self, event: DataflowEvent) {
        let _ = self.ends.events.push(event);
    }
}
