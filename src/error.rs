//! Error types for streaming sessions.
//!
//! Two layers: [`DeviceError`] is what a device or session reports at the
//! hardware boundary, [`StreamError`] is what the streaming loop and the
//! driver surface. Every variant of both is fatal to the stream.

use crate::config::ConfigError;
use std::fmt;
use std::io;

/// Direction of a dataflow failure at the hardware boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataflow {
    /// Samples were produced faster than the host read them.
    Overflow,
    /// The transmit side ran out of samples before the host refilled it.
    Underflow,
}

impl fmt::Display for Dataflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dataflow::Overflow => write!(f, "overflow"),
            Dataflow::Underflow => write!(f, "underflow"),
        }
    }
}

fn channel_label(channel: &Option<usize>) -> String {
    match channel {
        Some(channel) => format!(" on channel {}", channel),
        None => String::new(),
    }
}

/// Errors reported by a [`Device`](crate::device::Device) or
/// [`Session`](crate::device::Session).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeviceError {
    /// The transport could not keep up with the sample clock.
    #[error("timing violation: sample {dataflow}{}", channel_label(.channel))]
    TimingViolation {
        /// Which side of the transport lost samples.
        dataflow: Dataflow,
        /// Output channel that starved, when known.
        channel: Option<usize>,
    },

    /// The device stopped delivering samples.
    #[error("device detached")]
    Detached,

    /// The requested sample rate cannot be configured.
    #[error("unsupported sample rate {requested} S/s (maximum {max} S/s)")]
    UnsupportedRate {
        /// Rate asked for.
        requested: u32,
        /// Highest rate the device supports.
        max: u32,
    },

    /// A write addressed a channel the device does not have.
    #[error("invalid channel {channel} (device has {available})")]
    InvalidChannel {
        /// Channel index asked for.
        channel: usize,
        /// Number of output channels on the device.
        available: usize,
    },

    /// A transfer was attempted before the session was started.
    #[error("session not started")]
    NotStarted,
}

impl DeviceError {
    /// Shorthand for an overflow on the receive side.
    pub fn overflow() -> Self {
        Self::TimingViolation {
            dataflow: Dataflow::Overflow,
            channel: None,
        }
    }

    /// Shorthand for an underflow on one output channel.
    pub fn underflow(channel: usize) -> Self {
        Self::TimingViolation {
            dataflow: Dataflow::Underflow,
            channel: Some(channel),
        }
    }

    /// Whether this error reports lost samples.
    pub fn is_timing_violation(&self) -> bool {
        matches!(self, Self::TimingViolation { .. })
    }
}

/// Errors surfaced by the streaming loop and the driver.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// No eligible device was found at startup.
    #[error("no device present")]
    NoDevice,

    /// The device failed a transfer or a session operation.
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// The device returned a different number of tuples than requested.
    #[error("short read: requested {expected} samples, got {actual}")]
    ShortRead {
        /// Requested sample count.
        expected: usize,
        /// Tuples actually delivered.
        actual: usize,
    },

    /// Received samples could not be written out.
    #[error("failed to emit received samples: {0}")]
    Output(#[from] io::Error),

    /// The WAV capture failed.
    #[error("capture failed: {0}")]
    Capture(#[from] hound::Error),

    /// The stream configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The loop already hit a fatal error and will not run another cycle.
    #[error("stream already faulted")]
    Faulted,
}

impl StreamError {
    /// Whether the stream died because samples were dropped.
    pub fn is_timing_violation(&self) -> bool {
        matches!(self, Self::Device(err) if err.is_timing_violation())
    }

    /// One-line message for the operator.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::NoDevice => "Plug in a device.".to_string(),
            err if err.is_timing_violation() => "sample(s) dropped!".to_string(),
            err => err.to_string(),
        }
    }
}

/// Result type for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_violation_messages() {
        assert_eq!(
            DeviceError::underflow(1).to_string(),
            "timing violation: sample underflow on channel 1"
        );
        assert_eq!(
            DeviceError::overflow().to_string(),
            "timing violation: sample overflow"
        );
    }

    #[test]
    fn diagnostics_match_operator_messages() {
        assert_eq!(StreamError::NoDevice.diagnostic(), "Plug in a device.");
        let dropped = StreamError::from(DeviceError::overflow());
        assert!(dropped.is_timing_violation());
        assert_eq!(dropped.diagnostic(), "sample(s) dropped!");
        let detached = StreamError::from(DeviceError::Detached);
        assert!(!detached.is_timing_violation());
        assert_eq!(detached.diagnostic(), "device detached");
    }
}
