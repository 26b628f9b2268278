//! Incremental text normalization for captured build output.
//!
//! Build tools decorate their output with colors, cursor movement and
//! terminal titles. The filter turns that into plain text suitable for the
//! `txt` log:
//!
//! 1. CSI escape sequences are removed
//! 2. xterm title sequences are removed
//! 3. remaining C0 control characters (except tab and newline) are removed
//! 4. runs of blank lines collapse into a single blank line
//!
//! Filtering works line by line as output arrives. Only the current partial
//! line is buffered.

mod line;

pub use line::{collapse_blank, is_blank, normalize_line, BlankDecision};

/// Streaming filter over chunks of raw output.
#[derive(Debug, Clone, Default)]
pub struct StreamFilter {
    /// Bytes of the current, not yet terminated line.
    pending: Vec<u8>,
    /// Whether the last emitted line was blank.
    previous_blank: bool,
}

impl StreamFilter {
    /// Creates a new filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns the filtered text of every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (head, tail) = rest.split_at(pos);
            if self.pending.is_empty() {
                self.emit_line(head, true, &mut out);
            } else {
                let mut line = std::mem::take(&mut self.pending);
                line.extend_from_slice(head);
                self.emit_line(&line, true, &mut out);
            }
            rest = &tail[1..];
        }

        self.pending.extend_from_slice(rest);
        out
    }

    /// Flushes the trailing partial line, if any.
    ///
    /// A trailing partial line is written without a newline, and only if it
    /// is not blank.
    pub fn finish(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.emit_line(&line, false, &mut out);
        }
        out
    }

    /// Returns the number of buffered bytes of the current partial line.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn emit_line(&mut self, raw: &[u8], terminated: bool, out: &mut Vec<u8>) {
        let line = normalize_line(raw);
        let blank = is_blank(&line);

        if blank && !terminated {
            return;
        }

        let decision = collapse_blank(self.previous_blank, blank);
        self.previous_blank = decision.previous_blank;
        if !decision.emit {
            return;
        }

        if !blank {
            out.extend_from_slice(&line);
        }
        if terminated {
            out.push(b'\n');
        }
    }
}

/// Filters a complete buffer in one pass.
#[must_use]
pub fn filter_bytes(input: &[u8]) -> Vec<u8> {
    let mut filter = StreamFilter::new();
    let mut out = filter.push(input);
    out.extend(filter.finish());
    out
}
