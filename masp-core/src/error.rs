//! Error taxonomy (§7): a hand-written enum with manual `Display`/`Error`
//! impls rather than reaching for `thiserror`.

use std::fmt;
use std::path::PathBuf;

/// Non-fatal diagnostic severity. Both are reported through the
/// [`crate::emitter::Diagnostics`] sink; only `Error` contributes to a
/// non-zero exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One reported diagnostic, carrying the source name and line the way
/// every frame on the input stack does.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub source_name: String,
    pub line: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}: {}", self.source_name, self.line, self.severity, self.message)
    }
}

/// Errors that can escape as `Err` from engine-level operations: resource
/// errors (§7) that keep the rest of the run alive, and an explicit
/// `Fatal` variant for conditions §7 says must end the process with a
/// diagnostic rather than a panic (buffer-capacity overflow is the one
/// exception, implemented as a genuine `panic!` per §4.A).
#[derive(Debug)]
pub enum MaspError {
    /// An include or primary input file could not be opened or read.
    Io { path: PathBuf, source: std::io::Error },
    /// The output sink could not be written to.
    OutputWrite(std::io::Error),
    /// A condition §7 classifies as fatal: input-stack depth exceeded,
    /// macro-expansion depth exceeded, or repeat-count exceeded.
    Fatal(String),
}

impl fmt::Display for MaspError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::OutputWrite(source) => write!(f, "write error: {source}"),
            Self::Fatal(message) => write!(f, "fatal: {message}"),
        }
    }
}

impl std::error::Error for MaspError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } | Self::OutputWrite(source) => Some(source),
            Self::Fatal(_) => None,
        }
    }
}
