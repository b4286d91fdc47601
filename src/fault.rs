//! Fault injection for the dropped-sample path.
//!
//! A [`FaultTrigger`] is a shared token. Anything may arm it; the streaming
//! loop consumes it at the top of the next cycle and stalls its own thread for
//! the configured duration. The stall starves the device transport, and the
//! device reports the resulting timing violation on its next transfer. The
//! trigger never raises an error itself.

use crate::config::FAULT_STALL;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Shared, cloneable fault token.
#[derive(Debug, Clone)]
pub struct FaultTrigger {
    armed: Arc<AtomicBool>,
    stall: Duration,
}

impl Default for FaultTrigger {
    fn default() -> Self {
        Self::new(FAULT_STALL)
    }
}

impl FaultTrigger {
    pub fn new(stall: Duration) -> Self {
        Self {
            armed: Arc::new(AtomicBool::new(false)),
            stall,
        }
    }

    /// Arm the trigger. Arming an armed trigger is a no-op.
    pub fn trigger(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Disarm and report whether the trigger was armed.
    pub fn take(&self) -> bool {
        self.armed.swap(false, Ordering::SeqCst)
    }

    pub fn stall(&self) -> Duration {
        self.stall
    }

    /// Consume a pending trigger by blocking the calling thread for the stall
    /// duration. Returns whether a stall happened.
    pub fn service(&self) -> bool {
        if !self.take() {
            return false;
        }
        log::warn!(
            "fault trigger: stalling streaming thread for {} ms to force dropped samples",
            self.stall.as_millis()
        );
        thread::sleep(self.stall);
        true
    }
}

/// Arm `trigger` for every line read from `reader`, until end of input.
///
/// This is the operator's "quit" request: press enter on the controlling
/// terminal and the next cycle stalls.
pub fn watch_lines<R>(reader: R, trigger: FaultTrigger) -> JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || {
        for line in reader.lines() {
            if line.is_err() {
                break;
            }
            log::info!("fault trigger armed from input");
            trigger.trigger();
        }
    })
}
