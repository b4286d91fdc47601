//! Consumers of received sample tuples.

use crate::config::INPUT_WIDTH;
use crate::error::StreamError;
use crate::queue::Sample;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Receives every tuple of every successful read, once, in arrival order.
pub trait SampleSink {
    fn consume(&mut self, tuples: &[Sample]) -> Result<(), StreamError>;

    /// Flush everything consumed so far to its destination. Called once when
    /// the stream stops.
    fn finish(&mut self) -> Result<(), StreamError> {
        Ok(())
    }
}

impl<S: SampleSink + ?Sized> SampleSink for Box<S> {
    fn consume(&mut self, tuples: &[Sample]) -> Result<(), StreamError> {
        (**self).consume(tuples)
    }

    fn finish(&mut self) -> Result<(), StreamError> {
        (**self).finish()
    }
}

impl<S: SampleSink + ?Sized> SampleSink for &mut S {
    fn consume(&mut self, tuples: &[Sample]) -> Result<(), StreamError> {
        (**self).consume(tuples)
    }

    fn finish(&mut self) -> Result<(), StreamError> {
        (**self).finish()
    }
}

/// Writes one line of four fixed-point values per tuple.
#[derive(Debug)]
pub struct TextSink<W: Write> {
    out: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl TextSink<BufWriter<io::StdoutLock<'static>>> {
    /// Buffered, locked standard output. Flushed once per cycle.
    pub fn stdout() -> Self {
        Self::new(BufWriter::new(io::stdout().lock()))
    }
}

impl<W: Write> SampleSink for TextSink<W> {
    fn consume(&mut self, tuples: &[Sample]) -> Result<(), StreamError> {
        for [a, b, c, d] in tuples {
            writeln!(self.out, "{:.6} {:.6} {:.6} {:.6}", a, b, c, d)?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), StreamError> {
        self.out.flush()?;
        Ok(())
    }
}

/// Discards tuples, counting them.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink {
    pub consumed: u64,
}

impl SampleSink for NullSink {
    fn consume(&mut self, tuples: &[Sample]) -> Result<(), StreamError> {
        self.consumed += tuples.len() as u64;
        Ok(())
    }
}

/// Records tuples to a 4-channel 32-bit float WAV file.
pub struct WavCapture {
    writer: hound::WavWriter<BufWriter<File>>,
}

impl WavCapture {
    pub fn create(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self, StreamError> {
        let spec = hound::WavSpec {
            channels: INPUT_WIDTH as u16,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let writer = hound::WavWriter::create(path, spec)?;
        Ok(Self { writer })
    }

    /// Write the header and close the file. Dropping the capture also
    /// finalizes it, but swallows any error; [`SampleSink::finish`] reports
    /// it without closing.
    pub fn finalize(self) -> Result<(), StreamError> {
        self.writer.finalize()?;
        Ok(())
    }
}

impl SampleSink for WavCapture {
    fn consume(&mut self, tuples: &[Sample]) -> Result<(), StreamError> {
        for tuple in tuples {
            for &value in tuple {
                self.writer.write_sample(value)?;
            }
        }
        Ok(())
    }

    /// Bring the header up to date and flush the file.
    fn finish(&mut self) -> Result<(), StreamError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Feeds every tuple to two sinks, first then second.
#[derive(Debug)]
pub struct Tee<A, B>(pub A, pub B);

impl<A: SampleSink, B: SampleSink> SampleSink for Tee<A, B> {
    fn consume(&mut self, tuples: &[Sample]) -> Result<(), StreamError> {
        self.0.consume(tuples)?;
        self.1.consume(tuples)
    }

    /// Finishes both sinks even if the first fails; the first error wins.
    fn finish(&mut self) -> Result<(), StreamError> {
        let first = self.0.finish();
        let second = self.1.finish();
        first.and(second)
    }
}
