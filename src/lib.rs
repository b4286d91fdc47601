//! Continuous full-duplex streaming against a source-measure unit.
//!
//! Each cycle tops two transmit queues up to a fixed depth, writes them to
//! the device, reads one block of four-value tuples and hands the block to a
//! sink. Any dropped sample is fatal.

pub mod config;
pub mod control;
pub mod device;
pub mod driver;
pub mod error;
pub mod fault;
#[doc(hidden)]
pub mod harness;
#[doc(hidden)]
pub mod invariant_ppt;
pub mod invariant_rt;
pub mod queue;
pub mod sim;
pub mod sink;
pub mod states;
pub mod stream;

pub use config::{ConfigError, StreamConfig};
pub use device::{Device, DeviceInfo, Mode, Session};
pub use error::{Dataflow, DeviceError, StreamError, StreamResult};
pub use fault::FaultTrigger;
pub use queue::{Sample, TxQueue};
pub use sink::{NullSink, SampleSink, Tee, TextSink, WavCapture};
pub use states::{StreamState, Verdict};
pub use stream::{StreamStats, StreamingLoop};
