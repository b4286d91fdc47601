use super::{SimConfig, SimDevice};
use crate::device::{Device, Mode, Session};
use crate::error::DeviceError;

/// A session over simulated devices sharing one sample rate.
#[derive(Debug)]
pub struct SimSession {
    config: SimConfig,
    devices: Vec<SimDevice>,
    rate: u32,
    running: bool,
}

impl Default for SimSession {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl SimSession {
    pub fn new(config: SimConfig) -> Self {
        let rate = config.default_rate;
        Self {
            config,
            devices: Vec::new(),
            rate,
            running: false,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The rate the next `start` will run at.
    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl Session for SimSession {
    type Device = SimDevice;

    fn add_all(&mut self) -> Result<usize, DeviceError> {
        for index in self.devices.len()..self.config.devices {
            let device = SimDevice::attach(index, &self.config)?;
            log::info!(
                "attached {} (firmware {})",
                device.info().serial,
                device.info().firmware
            );
            self.devices.push(device);
        }
        Ok(self.devices.len())
    }

    fn devices(&self) -> &[SimDevice] {
        &self.devices
    }

    fn device_mut(&mut self, index: usize) -> Option<&mut SimDevice> {
        self.devices.get_mut(index)
    }

    fn configure(&mut self, rate: u32) -> Result<u32, DeviceError> {
        if rate == 0 || rate > self.config.max_rate {
            return Err(DeviceError::UnsupportedRate {
                requested: rate,
                max: self.config.max_rate,
            });
        }
        self.rate = rate;
        log::debug!("session rate set to {} S/s", rate);
        Ok(rate)
    }

    fn start(&mut self, mode: Mode) -> Result<(), DeviceError> {
        match mode {
            Mode::Continuous => {
                for device in &mut self.devices {
                    device.start(self.rate)?;
                }
            }
        }
        self.running = true;
        Ok(())
    }

    fn end(&mut self) -> Result<(), DeviceError> {
        for device in &mut self.devices {
            device.stop()?;
        }
        self.running = false;
        Ok(())
    }
}
