//! Transmit queues and the refill discipline.

#![forbid(unsafe_code)]

use crate::config::{INPUT_WIDTH, OUTPUT_CHANNELS};
use crate::invariant_ppt::{assert_invariant, QUEUES_PREALLOCATED};
use std::collections::VecDeque;

/// One simultaneously sampled input tuple.
pub type Sample = [f32; INPUT_WIDTH];

/// Channel names in write order.
pub const CHANNEL_NAMES: [&str; OUTPUT_CHANNELS] = ["A", "B"];

/// Append `fill` to `queue` until it holds `target_depth` samples.
///
/// Never removes samples; a queue already at or above the target is left
/// untouched. Returns how many samples were appended.
pub fn refill(queue: &mut VecDeque<f32>, target_depth: usize, fill: f32) -> usize {
    let missing = target_depth.saturating_sub(queue.len());
    queue.extend(std::iter::repeat(fill).take(missing));
    missing
}

/// Samples waiting to be written to one output channel.
#[derive(Debug, Clone)]
pub struct TxQueue {
    name: &'static str,
    channel: usize,
    samples: VecDeque<f32>,
}

impl TxQueue {
    /// Create an empty queue with room for `depth` samples.
    pub fn new(name: &'static str, channel: usize, depth: usize) -> Self {
        let samples = VecDeque::with_capacity(depth);
        assert_invariant(
            QUEUES_PREALLOCATED,
            samples.capacity() >= depth,
            "Transmit queue holds a full cycle without growing",
            Some(name),
        );
        Self {
            name,
            channel,
            samples,
        }
    }

    /// One queue per output channel, in write order.
    pub fn per_channel(depth: usize) -> [TxQueue; OUTPUT_CHANNELS] {
        std::array::from_fn(|channel| TxQueue::new(CHANNEL_NAMES[channel], channel, depth))
    }

    /// Top the queue up to `target_depth` with `fill`.
    pub fn refill(&mut self, target_depth: usize, fill: f32) -> usize {
        refill(&mut self.samples, target_depth, fill)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Device channel index this queue feeds.
    pub fn channel(&self) -> usize {
        self.channel
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &VecDeque<f32> {
        &self.samples
    }

    /// The queue as handed to a device write, which drains what it sends.
    pub fn samples_mut(&mut self) -> &mut VecDeque<f32> {
        &mut self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refill_tops_up_to_depth() {
        let mut queue = VecDeque::from(vec![1.0, 2.0]);
        assert_eq!(refill(&mut queue, 5, 3.0), 3);
        assert_eq!(queue, VecDeque::from(vec![1.0, 2.0, 3.0, 3.0, 3.0]));
    }

    #[test]
    fn refill_never_truncates() {
        let mut queue: VecDeque<f32> = std::iter::repeat(1.0).take(10).collect();
        assert_eq!(refill(&mut queue, 4, 3.0), 0);
        assert_eq!(queue.len(), 10);
        assert!(queue.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn per_channel_queues_are_named_in_write_order() {
        let queues = TxQueue::per_channel(16);
        assert_eq!(queues[0].name(), "A");
        assert_eq!(queues[0].channel(), 0);
        assert_eq!(queues[1].name(), "B");
        assert_eq!(queues[1].channel(), 1);
        assert!(queues.iter().all(TxQueue::is_empty));
    }
}
