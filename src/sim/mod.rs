//! Simulated source-measure instrument.
//!
//! Each [`SimDevice`] owns a transport thread that plays the part of the USB
//! link and converters: once started it wakes every packet period, takes one
//! packet of output samples per channel and produces one packet of input
//! tuples. Output is looped back, so the tuple for a sample is
//! `[va, va / R, vb, vb / R]` with `R` the configured load.
//!
//! ## Dataflow model
//!
//! | Condition | Event |
//! |-----------|-------|
//! | A written channel has less than a packet queued at a tick | underflow |
//! | The input FIFO has no room for a new packet | overflow |
//!
//! Events travel lock-free from the transport to the device, which turns the
//! first pending one into [`DeviceError::TimingViolation`] on its next write
//! or read, unless [`SimConfig::ignore_dataflow`] is set.
//!
//! [`DeviceError::TimingViolation`]: crate::error::DeviceError::TimingViolation

mod device;
mod session;
mod transport;

pub use device::{DataflowCounts, SimDevice};
pub use session::SimSession;
pub use transport::DataflowEvent;

use std::time::Duration;

/// Shape and behavior of the simulated instruments.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Devices `add_all` will find.
    pub devices: usize,
    /// Rate each device reports as its default.
    pub default_rate: u32,
    /// Highest rate `configure` accepts.
    pub max_rate: u32,
    /// Samples exchanged per transport tick.
    pub packet_samples: usize,
    /// Depth of the output rings and of the input FIFO, in samples.
    pub fifo_samples: usize,
    /// Load the current column is computed against, in ohms.
    pub load_ohms: f32,
    /// Shortest time a read waits for the next packet before declaring the
    /// device detached.
    pub read_timeout: Duration,
    /// Count and log dataflow events instead of failing transfers.
    pub ignore_dataflow: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            devices: 1,
            default_rate: 100_000,
            max_rate: 200_000,
            packet_samples: 1024,
            fifo_samples: 16_384,
            load_ohms: 2_500.0,
            read_timeout: Duration::from_secs(1),
            ignore_dataflow: false,
        }
    }
}

impl SimConfig {
    pub(crate) fn packet(&self) -> usize {
        self.packet_samples.max(1)
    }

    pub(crate) fn fifo(&self) -> usize {
        self.fifo_samples.max(self.packet())
    }
}
