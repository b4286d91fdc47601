//! Lifecycle of a streaming loop.

use crate::error::StreamError;

/// Where a loop is in its life. `Faulted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    /// Created, no cycle run yet.
    #[default]
    Idle,
    /// At least one cycle started, no error seen.
    Streaming,
    /// A fatal error ended the stream.
    Faulted,
}

impl StreamState {
    pub fn is_terminal(self) -> bool {
        self == StreamState::Faulted
    }

    /// Enter `Streaming`. Returns false if the loop is already faulted.
    pub(crate) fn begin_cycle(&mut self) -> bool {
        match self {
            StreamState::Faulted => false,
            StreamState::Idle | StreamState::Streaming => {
                *self = StreamState::Streaming;
                true
            }
        }
    }

    /// Enter `Faulted`, from any state. Runs on the streaming thread, so
    /// nothing here may lock or allocate.
    pub(crate) fn fault(&mut self) {
        *self = StreamState::Faulted;
    }
}

/// Outcome of one [`StreamingLoop::step`](crate::stream::StreamingLoop::step).
#[derive(Debug)]
pub enum Verdict {
    /// The cycle succeeded; run another.
    Continue,
    /// The stream is over; the driver decides how to exit.
    Terminate(StreamError),
}

impl Verdict {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Verdict::Terminate(_))
    }
}
