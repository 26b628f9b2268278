//! Output sinks and the fan-out writer.

use crate::filter::StreamFilter;
use std::fs::File;
use std::io::{self, Stdout, Write};
use tracing::warn;

/// A destination for captured output.
///
/// `finish` is called once after the last chunk; sinks that buffer state
/// (such as [`FilteredWriter`]) write it out there.
pub trait LogSink: Write + Send {
    /// Completes the sink after the final chunk.
    ///
    /// # Errors
    ///
    /// Returns any error from writing buffered state or flushing.
    fn finish(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl LogSink for File {}

impl LogSink for Vec<u8> {}

impl<S: LogSink + ?Sized> LogSink for Box<S> {
    fn finish(&mut self) -> io::Result<()> {
        (**self).finish()
    }
}

/// The terminal passthrough sink.
///
/// A console that goes away (for example a closed pipe) must not abort the
/// build, so write errors are reported once and later output is discarded.
#[derive(Debug)]
pub struct ConsoleSink {
    out: Stdout,
    broken: bool,
}

impl ConsoleSink {
    /// Creates a sink writing to the process's stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self {
            out: io::stdout(),
            broken: false,
        }
    }

    /// Creates a sink that discards everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            out: io::stdout(),
            broken: true,
        }
    }

    fn disable(&mut self, err: &io::Error) {
        if !self.broken {
            warn!(error = %err, "Console output failed; continuing with log files only");
            self.broken = true;
        }
    }
}

impl Write for ConsoleSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.broken {
            if let Err(e) = self.out.write_all(buf) {
                self.disable(&e);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.broken {
            if let Err(e) = self.out.flush() {
                self.disable(&e);
            }
        }
        Ok(())
    }
}

impl LogSink for ConsoleSink {}

/// A sink that passes output through a [`StreamFilter`] before writing it.
#[derive(Debug)]
pub struct FilteredWriter<W: LogSink> {
    inner: W,
    filter: StreamFilter,
    finished: bool,
}

impl<W: LogSink> FilteredWriter<W> {
    /// Wraps `inner` with a fresh filter.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            filter: StreamFilter::new(),
            finished: false,
        }
    }
}

impl<W: LogSink> Write for FilteredWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let filtered = self.filter.push(buf);
        if !filtered.is_empty() {
            self.inner.write_all(&filtered)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: LogSink> LogSink for FilteredWriter<W> {
    fn finish(&mut self) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        let tail = self.filter.finish();
        if !tail.is_empty() {
            self.inner.write_all(&tail)?;
        }
        self.inner.finish()
    }
}

impl<W: LogSink> Drop for FilteredWriter<W> {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.finish();
        }
    }
}

/// Writes every chunk to each sink, in order, before accepting the next.
#[derive(Default)]
pub struct FanOutWriter {
    sinks: Vec<Box<dyn LogSink>>,
}

impl FanOutWriter {
    /// Creates a fan-out over `sinks`.
    #[must_use]
    pub fn new(sinks: Vec<Box<dyn LogSink>>) -> Self {
        Self { sinks }
    }

    /// Adds a sink.
    #[must_use]
    pub fn with_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Returns the number of sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Returns true if there are no sinks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl std::fmt::Debug for FanOutWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanOutWriter")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl Write for FanOutWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for sink in &mut self.sinks {
            sink.write_all(buf)?;
            sink.flush()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        for sink in &mut self.sinks {
            sink.flush()?;
        }
        Ok(())
    }
}

impl LogSink for FanOutWriter {
    fn finish(&mut self) -> io::Result<()> {
        // Every sink gets finished even if an earlier one fails.
        let mut first_err = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.finish() {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SharedBuffer;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_filtered_writer_streams_lines() {
        let buffer = SharedBuffer::new();
        let mut writer = FilteredWriter::new(buffer.clone());

        writer.write_all(b"\x1b[1mbold\x1b[0m\nhalf").unwrap();
        assert_eq!(buffer.contents(), b"bold\n".to_vec());

        writer.write_all(b" line").unwrap();
        writer.finish().unwrap();
        assert_eq!(buffer.contents(), b"bold\nhalf line".to_vec());
    }

    #[test]
    fn test_filtered_writer_finishes_on_drop() {
        let buffer = SharedBuffer::new();
        {
            let mut writer = FilteredWriter::new(buffer.clone());
            writer.write_all(b"no newline").unwrap();
        }
        assert_eq!(buffer.contents(), b"no newline".to_vec());
    }

    #[test]
    fn test_fan_out_writes_every_sink_in_order() {
        let raw = SharedBuffer::new();
        let txt = SharedBuffer::new();
        let mut fan_out = FanOutWriter::default()
            .with_sink(raw.clone())
            .with_sink(FilteredWriter::new(txt.clone()));
        assert_eq!(fan_out.len(), 2);

        fan_out.write_all(b"\x1b[32mok\x1b[0m\n\n\n\n").unwrap();
        fan_out.write_all(b"end").unwrap();
        fan_out.finish().unwrap();

        assert_eq!(raw.contents(), b"\x1b[32mok\x1b[0m\n\n\n\nend".to_vec());
        assert_eq!(txt.contents(), b"ok\n\nend".to_vec());
    }

    #[test]
    fn test_fan_out_propagates_sink_error() {
        struct Broken;

        impl Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::other("disk full"))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        impl LogSink for Broken {}

        let mut fan_out = FanOutWriter::default().with_sink(Broken);
        let err = fan_out.write_all(b"x").unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }
}
