//! RT-safe invariant signaling for the streaming cycle.
//!
//! This module provides a two-tier invariant system:
//! - **Tier 1 (RT-safe)**: Lock-free signaling of invariant IDs from the streaming thread
//! - **Tier 2 (Non-RT)**: Verification and contract testing on another thread
//!
//! # Design Philosophy
//!
//! RT code **signals facts**. Non-RT code **judges correctness**.
//!
//! Unlike [`crate::invariant_ppt`], which takes a lock, this system:
//! - Never allocates in the RT path
//! - Never locks in the RT path
//! - Never panics in the RT path
//! - Uses lock-free SPSC queues for cross-thread communication
//!
//! # Example
//!
//! ```ignore
//! let (tx, mut rx) = new_invariant_queue();
//! let mut stream = StreamingLoop::new(config)?.with_invariant_signals(tx);
//! stream.run_cycle(&mut device, &mut sink)?;
//!
//! let signals = drain_invariant_signals(&mut rx);
//! assert!(signals.contains(&INV_TX_DRAINED));
//! ```

use rtrb::{Consumer, Producer, RingBuffer};

// ============================================================================
// RT-Safe Invariant IDs (Tier 1)
// ============================================================================
// These are integer IDs, not strings. No allocation, no formatting.

/// A channel write left its transmit queue no longer than it was handed over.
pub const INV_TX_DRAINED: u8 = 1;

/// Every channel write of the cycle returned before the read was issued.
pub const INV_WRITES_BEFORE_READ: u8 = 2;

/// The receive buffer held exactly the requested tuple count after the read.
pub const INV_RX_FILLED: u8 = 3;

/// Received tuples were handed to the sink.
pub const INV_RX_CONSUMED: u8 = 4;

/// A pending fault trigger stalled the streaming thread.
pub const INV_FAULT_STALL_SERVED: u8 = 5;

/// The cycle completed without error.
pub const INV_CYCLE_CLEAN: u8 = 6;

// ============================================================================
// Invariant Signal Queue
// ============================================================================

/// Capacity for invariant signal queue.
/// Large enough for a few dozen cycles between drains.
pub const INVARIANT_QUEUE_CAPACITY: usize = 256;

/// Creates a new invariant signal queue pair.
///
/// Returns (producer for the streaming thread, consumer for the checker).
pub fn new_invariant_queue() -> (Producer<u8>, Consumer<u8>) {
    RingBuffer::new(INVARIANT_QUEUE_CAPACITY)
}

/// Signals an invariant was checked in the RT path.
///
/// # RT Safety
/// - No allocation
/// - No locking
/// - No panics
/// - If queue is full, signal is dropped (preferable to blocking)
#[inline]
pub fn signal_invariant(tx: &mut Producer<u8>, id: u8) {
    let _ = tx.push(id);
}

// ============================================================================
// Non-RT Verification (Tier 2)
// ============================================================================

/// Drains all pending invariant signals from the queue.
pub fn drain_invariant_signals(rx: &mut Consumer<u8>) -> Vec<u8> {
    let mut signals = Vec::with_capacity(INVARIANT_QUEUE_CAPACITY);
    while let Ok(id) = rx.pop() {
        signals.push(id);
    }
    signals
}

/// Counts occurrences of each invariant ID in a signal list.
pub fn count_invariant_signals(signals: &[u8]) -> [usize; 256] {
    let mut counts = [0usize; 256];
    for &id in signals {
        counts[id as usize] += 1;
    }
    counts
}

/// Contract verification: asserts that required invariants were signaled.
///
/// # Panics
/// Panics if any required invariant was not signaled at least once.
#[cfg(any(test, feature = "ppt"))]
pub fn contract_test_rt(contract_name: &str, signals: &[u8], required: &[u8]) {
    let counts = count_invariant_signals(signals);
    let missing: Vec<&str> = required
        .iter()
        .filter(|&&id| counts[id as usize] == 0)
        .map(|&id| invariant_name(id))
        .collect();

    if !missing.is_empty() {
        let present: Vec<&str> = signals
            .iter()
            .map(|&id| invariant_name(id))
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();

        panic!(
            "RT Contract '{}' missing invariants: {:?}. Present: {:?}",
            contract_name, missing, present
        );
    }
}

/// Maps invariant ID to human-readable name (for diagnostics only).
pub const fn invariant_name(id: u8) -> &'static str {
    match id {
        INV_TX_DRAINED => "TX_DRAINED",
        INV_WRITES_BEFORE_READ => "WRITES_BEFORE_READ",
        INV_RX_FILLED => "RX_FILLED",
        INV_RX_CONSUMED => "RX_CONSUMED",
        INV_FAULT_STALL_SERVED => "FAULT_STALL_SERVED",
        INV_CYCLE_CLEAN => "CYCLE_CLEAN",
        _ => "UNKNOWN",
    }
}

// ============================================================================
// Tests
// ============================================================================
