//! Per-line normalization and the blank-line collapse rule.

use regex::bytes::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// CSI sequences: `ESC [ params letter` (colors, cursor movement, erase).
#[allow(clippy::expect_used)]
static CSI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u)\x1b\[[0-9;?]*[A-Za-z]").expect("valid pattern")
});

/// xterm window title sequences: `ESC ] 0 ; title BEL`.
#[allow(clippy::expect_used)]
static XTERM_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u)\x1b\]0;[^\x07]*\x07").expect("valid pattern")
});

/// C0 controls and DEL, except tab and newline.
#[allow(clippy::expect_used)]
static CONTROL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u)[\x00-\x08\x0b-\x1f\x7f]").expect("valid pattern")
});

/// Strips terminal escape sequences and control characters from a line.
///
/// Applies, in order: CSI stripping, xterm title stripping, then removal of
/// the remaining C0 controls (tab and newline are kept).
#[must_use]
pub fn normalize_line(line: &[u8]) -> Cow<'_, [u8]> {
    let stripped = CSI.replace_all(line, &b""[..]);
    let stripped = strip_with(&XTERM_TITLE, stripped);
    strip_with(&CONTROL, stripped)
}

fn strip_with<'a>(pattern: &Regex, input: Cow<'a, [u8]>) -> Cow<'a, [u8]> {
    match input {
        Cow::Borrowed(bytes) => pattern.replace_all(bytes, &b""[..]),
        Cow::Owned(bytes) if pattern.is_match(&bytes) => {
            Cow::Owned(pattern.replace_all(&bytes, &b""[..]).into_owned())
        }
        owned @ Cow::Owned(_) => owned,
    }
}

/// Returns true if a normalized line contains only whitespace.
#[must_use]
pub fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

/// The outcome of feeding one line through the blank-line collapse rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlankDecision {
    /// Whether the line should be written.
    pub emit: bool,
    /// Whether the last written line is now blank.
    pub previous_blank: bool,
}

/// Collapses runs of blank lines to a single blank line.
///
/// A blank line is dropped only when the previously written line was also
/// blank. Non-blank lines are always written and reset the state.
#[must_use]
pub const fn collapse_blank(previous_blank: bool, line_blank: bool) -> BlankDecision {
    match (previous_blank, line_blank) {
        (true, true) => BlankDecision {
            emit: false,
            previous_blank: true,
        },
        (_, blank) => BlankDecision {
            emit: true,
            previous_blank: blank,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_strips_csi() {
        assert_eq!(&*normalize_line(b"\x1b[1;32mok\x1b[0m"), b"ok");
        assert_eq!(&*normalize_line(b"\x1b[2K\x1b[1Gdone"), b"done");
        assert_eq!(&*normalize_line(b"\x1b[?25lhidden"), b"hidden");
    }

    #[test]
    fn test_strips_xterm_title() {
        assert_eq!(&*normalize_line(b"\x1b]0;make: building\x07CC foo.o"), b"CC foo.o");
    }

    #[test]
    fn test_strips_controls_keeps_tab() {
        assert_eq!(&*normalize_line(b"a\tb\r\x08c\x7f\x00"), b"a\tbc");
    }

    #[test]
    fn test_plain_line_is_borrowed() {
        let line = b"checking for gcc... gcc";
        assert!(matches!(normalize_line(line), Cow::Borrowed(_)));
    }

    #[test]
    fn test_non_utf8_survives() {
        assert_eq!(&*normalize_line(b"caf\xe9 \x1b[0m"), b"caf\xe9 ");
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(b""));
        assert!(is_blank(b" \t "));
        assert!(!is_blank(b" x "));
    }

    #[test]
    fn test_collapse_blank_transitions() {
        assert_eq!(
            collapse_blank(false, true),
            BlankDecision { emit: true, previous_blank: true }
        );
        assert_eq!(
            collapse_blank(true, true),
            BlankDecision { emit: false, previous_blank: true }
        );
        assert_eq!(
            collapse_blank(true, false),
            BlankDecision { emit: true, previous_blank: false }
        );
        assert_eq!(
            collapse_blank(false, false),
            BlankDecision { emit: true, previous_blank: false }
        );
    }
}
