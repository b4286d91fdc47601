use clap::Parser;
use smu_stream::config::{StreamConfig, FAULT_STALL, FILL_VALUE, TARGET_DEPTH};
use smu_stream::driver::Options;
use smu_stream::sim::SimConfig;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "smu-stream",
    version,
    about = "Continuous full-duplex streaming against a source-measure unit",
    long_about = "Keeps both output channels queued with a constant value and prints every \
                  received tuple as four columns. Any dropped sample is fatal.\n\
                  Type a line on stdin to stall the stream and provoke a timing violation."
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Session sample rate in S/s (defaults to the device's own rate)
    #[arg(long, env = "SMU_STREAM_RATE")]
    pub rate: Option<u32>,

    /// Transmit queue depth per channel
    #[arg(long, env = "SMU_STREAM_DEPTH", default_value_t = TARGET_DEPTH)]
    pub depth: usize,

    /// Value written to both output channels
    #[arg(long, env = "SMU_STREAM_FILL", default_value_t = FILL_VALUE)]
    pub fill: f32,

    /// Stall applied by the fault trigger, in milliseconds
    #[arg(long, env = "SMU_STREAM_STALL_MS", default_value_t = FAULT_STALL.as_millis() as u64)]
    pub stall_ms: u64,

    /// Stop cleanly after this many cycles
    #[arg(long)]
    pub cycles: Option<u64>,

    /// Fire the fault trigger once this many cycles have completed
    #[arg(long)]
    pub fault_after: Option<u64>,

    /// Also record received tuples to a 4-channel WAV file
    #[arg(long)]
    pub capture: Option<PathBuf>,

    /// Simulated devices to attach
    #[arg(long, env = "SMU_STREAM_DEVICES", default_value_t = 1)]
    pub devices: usize,

    /// Log dataflow errors instead of failing on them
    #[arg(long)]
    pub ignore_dataflow: bool,
}

impl Cli {
    pub fn options(&self) -> Options {
        Options {
            stream: StreamConfig {
                target_depth: self.depth,
                fill_value: self.fill,
                fault_stall: Duration::from_millis(self.stall_ms),
                ..StreamConfig::default()
            },
            rate: self.rate,
            cycles: self.cycles,
            fault_after: self.fault_after,
        }
    }

    pub fn sim_config(&self) -> SimConfig {
        SimConfig {
            devices: self.devices,
            ignore_dataflow: self.ignore_dataflow,
            ..SimConfig::default()
        }
    }
}
