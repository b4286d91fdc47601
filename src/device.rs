//! Collaborator traits: the session that owns devices, and the device the
//! streaming loop writes to and reads from.
//!
//! The loop only ever calls [`Device::write`] and [`Device::read`]. Everything
//! else here is used once, by the driver, to bring a session up.

use crate::error::DeviceError;
use crate::queue::Sample;
use std::collections::VecDeque;

/// How a session streams once started.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Run until explicitly ended.
    Continuous,
}

/// Static description of an attached device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub serial: String,
    pub firmware: String,
    /// Writable output channels.
    pub output_channels: usize,
    /// Values per received tuple.
    pub input_width: usize,
    /// Rate the device runs at when nothing else is asked for.
    pub default_rate: u32,
}

/// A full-duplex instrument channel set.
pub trait Device {
    fn info(&self) -> &DeviceInfo;

    /// Hand queued samples for `channel` to the device.
    ///
    /// The device drains from the front of `queue` whatever it accepted; the
    /// rest stays queued for the next cycle.
    fn write(&mut self, queue: &mut VecDeque<f32>, channel: usize) -> Result<(), DeviceError>;

    /// Replace the contents of `buf` with exactly `count` received tuples.
    fn read(&mut self, buf: &mut Vec<Sample>, count: usize) -> Result<(), DeviceError>;
}

impl<D: Device + ?Sized> Device for Box<D> {
    fn info(&self) -> &DeviceInfo {
        (**self).info()
    }

    fn write(&mut self, queue: &mut VecDeque<f32>, channel: usize) -> Result<(), DeviceError> {
        (**self).write(queue, channel)
    }

    fn read(&mut self, buf: &mut Vec<Sample>, count: usize) -> Result<(), DeviceError> {
        (**self).read(buf, count)
    }
}

/// Discovery and lifecycle of a group of devices sharing one sample clock.
pub trait Session {
    type Device: Device;

    /// Register every compatible device; returns how many the session holds.
    fn add_all(&mut self) -> Result<usize, DeviceError>;

    fn devices(&self) -> &[Self::Device];

    fn device_mut(&mut self, index: usize) -> Option<&mut Self::Device>;

    /// The device's own preferred sample rate.
    fn default_rate_for(&self, device: &Self::Device) -> u32 {
        device.info().default_rate
    }

    /// Set the session sample rate; returns the rate actually configured.
    fn configure(&mut self, rate: u32) -> Result<u32, DeviceError>;

    fn start(&mut self, mode: Mode) -> Result<(), DeviceError>;

    /// Stop streaming on every device.
    fn end(&mut self) -> Result<(), DeviceError>;
}
