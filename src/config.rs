//! Stream configuration: the harness constants and their validation.

use crate::invariant_ppt::{assert_invariant, CONFIG_REJECTS_INVALID, CONFIG_VALID};
use std::time::Duration;

/// Number of output channels driven by the loop.
pub const OUTPUT_CHANNELS: usize = 2;

/// Values per received sample tuple.
pub const INPUT_WIDTH: usize = 4;

/// Depth each transmit queue is topped up to before a write.
pub const TARGET_DEPTH: usize = 1024;

/// Samples requested from the device per cycle.
pub const SAMPLES_PER_CYCLE: usize = 1024;

/// Constant written into the transmit queues.
pub const FILL_VALUE: f32 = 3.0;

/// How long a fault trigger stalls the streaming thread.
pub const FAULT_STALL: Duration = Duration::from_millis(250);

/// Configuration of one streaming loop.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfig {
    /// Transmit queue watermark.
    pub target_depth: usize,
    /// Value appended by refill.
    pub fill_value: f32,
    /// Tuples requested by each read.
    pub samples_per_cycle: usize,
    /// Stall applied when the fault trigger fires.
    pub fault_stall: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            target_depth: TARGET_DEPTH,
            fill_value: FILL_VALUE,
            samples_per_cycle: SAMPLES_PER_CYCLE,
            fault_stall: FAULT_STALL,
        }
    }
}

impl StreamConfig {
    /// Check the configuration before any buffer is allocated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rejected = if self.target_depth == 0 {
            Some(ConfigError::ZeroDepth)
        } else if self.samples_per_cycle == 0 {
            Some(ConfigError::ZeroSampleCount)
        } else if !self.fill_value.is_finite() {
            Some(ConfigError::NonFiniteFill(self.fill_value))
        } else if self.fault_stall.is_zero() {
            Some(ConfigError::ZeroStall)
        } else {
            None
        };

        if let Some(err) = rejected {
            assert_invariant(
                CONFIG_REJECTS_INVALID,
                true,
                "Invalid stream configuration rejected",
                Some("validate"),
            );
            return Err(err);
        }

        assert_invariant(CONFIG_VALID, true, "Stream configuration accepted", Some("validate"));
        Ok(())
    }
}

/// Errors from [`StreamConfig::validate`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("target depth must be at least one sample")]
    ZeroDepth,
    #[error("samples per cycle must be at least one")]
    ZeroSampleCount,
    #[error("fill value must be finite, got {0}")]
    NonFiniteFill(f32),
    #[error("fault stall must be longer than zero")]
    ZeroStall,
}
