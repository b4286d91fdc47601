//! Thin driver: bring a session up, run the loop, map the outcome to an
//! exit status.
//!
//! The driver never exits the process itself. [`run`] returns the loop's
//! terminal error and [`exit_code`] tells the binary what status to use.

use crate::config::StreamConfig;
use crate::device::{Mode, Session};
use crate::error::StreamError;
use crate::fault::FaultTrigger;
use crate::invariant_ppt::{
    assert_invariant, DEVICE_PRESENT, FAULT_TERMINAL, NO_DEVICE_REJECTED, RATE_NEGOTIATED,
    STREAM_STARTED,
};
use crate::sink::SampleSink;
use crate::states::Verdict;
use crate::stream::{StreamStats, StreamingLoop};

/// Everything a run needs besides the session and the sink.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    pub stream: StreamConfig,
    /// Session rate; the first device's default when unset.
    pub rate: Option<u32>,
    /// Stop cleanly after this many cycles.
    pub cycles: Option<u64>,
    /// Arm the fault trigger once this many cycles have completed.
    pub fault_after: Option<u64>,
}

impl Options {
    /// A fault trigger carrying the configured stall.
    pub fn fault_trigger(&self) -> FaultTrigger {
        FaultTrigger::new(self.stream.fault_stall)
    }
}

/// Discover devices, negotiate the rate and start continuous streaming.
///
/// Returns the negotiated rate. No streaming call is made when nothing is
/// attached.
pub fn bring_up<S: Session>(session: &mut S, rate: Option<u32>) -> Result<u32, StreamError> {
    let found = session.add_all()?;
    if found == 0 {
        assert_invariant(
            NO_DEVICE_REJECTED,
            true,
            "Startup with no device rejected",
            Some("bring_up"),
        );
        return Err(StreamError::NoDevice);
    }
    assert_invariant(DEVICE_PRESENT, found > 0, "A device is attached", Some("bring_up"));

    let device = session.devices().first().ok_or(StreamError::NoDevice)?;
    let requested = rate.unwrap_or_else(|| session.default_rate_for(device));
    let negotiated = session.configure(requested)?;
    assert_invariant(
        RATE_NEGOTIATED,
        negotiated > 0,
        "Session rate negotiated",
        Some("bring_up"),
    );
    log::info!(
        "{} device(s) attached, streaming at {} S/s",
        found,
        negotiated
    );

    session.start(Mode::Continuous)?;
    assert_invariant(STREAM_STARTED, true, "Continuous streaming started", Some("bring_up"));
    Ok(negotiated)
}

/// Bring `session` up and stream from its first device into the sink built
/// by `make_sink` (which receives the negotiated rate).
///
/// Without `options.cycles` this only returns on a fatal error.
pub fn run<S, K, F>(
    session: &mut S,
    options: &Options,
    trigger: &FaultTrigger,
    make_sink: F,
) -> Result<StreamStats, StreamError>
where
    S: Session,
    K: SampleSink,
    F: FnOnce(u32) -> Result<K, StreamError>,
{
    let mut stream =
        StreamingLoop::new(options.stream.clone())?.with_fault_trigger(trigger.clone());

    let rate = bring_up(session, options.rate).map_err(|err| terminate(&mut stream, err))?;
    let outcome = make_sink(rate).and_then(|mut sink| {
        let device = session.device_mut(0).ok_or(StreamError::NoDevice)?;
        let streamed = drive(&mut stream, device, &mut sink, options, trigger);
        // Flush the sink on every exit; a streaming error outranks a flush error.
        match (streamed, sink.finish()) {
            (Err(err), finished) => {
                if let Err(flush) = finished {
                    log::warn!("failed to flush output after a fatal error: {}", flush);
                }
                Err(err)
            }
            (Ok(()), finished) => finished,
        }
    });

    if let Err(err) = session.end() {
        log::warn!("failed to end session: {}", err);
    }

    match outcome {
        Ok(()) => {
            let stats = stream.stats().clone();
            log::info!(
                "{} cycles, {} samples read, {} stall(s)",
                stats.cycles,
                stats.samples_read,
                stats.stalls
            );
            Ok(stats)
        }
        Err(err) => {
            log::error!("streaming stopped after {} cycles: {}", stream.stats().cycles, err);
            Err(terminate(&mut stream, err))
        }
    }
}

/// Fault the loop for good and hand the error back.
fn terminate(stream: &mut StreamingLoop, err: StreamError) -> StreamError {
    let err = stream.fail(err);
    assert_invariant(
        FAULT_TERMINAL,
        stream.state().is_terminal(),
        "Fatal error leaves the loop in its terminal state",
        Some("terminate"),
    );
    err
}

fn drive<D, K>(
    stream: &mut StreamingLoop,
    device: &mut D,
    sink: &mut K,
    options: &Options,
    trigger: &FaultTrigger,
) -> Result<(), StreamError>
where
    D: crate::device::Device + ?Sized,
    K: SampleSink + ?Sized,
{
    loop {
        // Checked before each step, so `fault_after: Some(0)` stalls the first cycle.
        let done = stream.stats().cycles;
        if options.fault_after == Some(done) {
            log::warn!("arming fault trigger after {} cycles", done);
            trigger.trigger();
        }
        if options.cycles.is_some_and(|limit| done >= limit) {
            return Ok(());
        }
        if let Verdict::Terminate(err) = stream.step(device, sink) {
            return Err(err);
        }
        log::debug!(
            "cycle {}: {:?}",
            stream.stats().cycles,
            stream.stats().samples_written
        );
    }
}

/// Process exit status for a terminal error.
pub fn exit_code(err: &StreamError) -> i32 {
    match err {
        StreamError::Config(_) => 2,
        _ => 1,
    }
}
