//! Control message types for session → transport communication.
//!
//! These messages are sent via lock-free SPSC queue from the thread that owns
//! a simulated device to that device's transport thread. The transport drains
//! the queue before every packet and whenever it is idle.
//!
//! All messages are `Copy` and fixed-size, so sending never allocates.

use rtrb::{Consumer, Producer, RingBuffer};

/// Capacity for the transport command queue.
pub const CONTROL_QUEUE_CAPACITY: usize = 16;

/// Creates a new transport command queue pair.
///
/// Returns (producer for the device, consumer for the transport thread).
pub fn new_control_queue() -> (Producer<TransportCmd>, Consumer<TransportCmd>) {
    RingBuffer::new(CONTROL_QUEUE_CAPACITY)
}

/// Commands understood by a transport thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCmd {
    /// Start clocking packets at `rate` samples per second.
    Start {
        /// Sample rate in S/s.
        rate: u32,
    },

    /// Stop clocking; pending samples stay where they are.
    Stop,

    /// Exit the transport thread.
    Halt,
}

impl TransportCmd {
    /// Returns a human-readable description (for debugging).
    pub fn description(&self) -> &'static str {
        match self {
            TransportCmd::Start { .. } => "Start",
            TransportCmd::Stop => "Stop",
            TransportCmd::Halt => "Halt",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_cmd_is_copy() {
        let cmd = TransportCmd::Start { rate: 100_000 };
        let cmd2 = cmd;
        assert_eq!(cmd, cmd2);
    }

    #[test]
    fn test_control_queue_roundtrip() {
        let (mut tx, mut rx) = new_control_queue();

        tx.push(TransportCmd::Start { rate: 20_000 }).unwrap();
        tx.push(TransportCmd::Halt).unwrap();

        assert_eq!(rx.pop().unwrap(), TransportCmd::Start { rate: 20_000 });
        assert_eq!(rx.pop().unwrap().description(), "Halt");
        assert!(rx.pop().is_err());
    }
}
