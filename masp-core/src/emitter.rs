//! Emitter (§4.H): writes translated lines to the output sink, with an
//! optional source-copy comment, and a separate diagnostics sink.

use std::io::{self, Write};

use crate::error::{Diagnostic, Severity};

/// Writes translated (and optionally source-copied) lines to `W`.
pub struct Emitter<W: Write> {
    out: W,
    copy_source: bool,
    comment_char: char,
}

impl<W: Write> Emitter<W> {
    pub fn new(out: W, copy_source: bool, comment_char: char) -> Self {
        Self { out, copy_source, comment_char }
    }

    /// Emits one line: if source-copy is enabled, first writes `original`
    /// prefixed by the comment character, then always writes `translated`.
    pub fn emit(&mut self, original: &str, translated: &str) -> io::Result<()> {
        if self.copy_source {
            writeln!(self.out, "{}{original}", self.comment_char)?;
        }
        writeln!(self.out, "{translated}")
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Accumulates non-fatal diagnostics (syntax, resource, and structural
/// errors) and logs each through `tracing` as it arrives.
#[derive(Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(
        &mut self,
        severity: Severity,
        source_name: &str,
        line: usize,
        message: impl Into<String>,
    ) {
        let diagnostic = Diagnostic {
            severity,
            source_name: source_name.to_string(),
            line,
            message: message.into(),
        };
        match severity {
            Severity::Warning => tracing::warn!("{diagnostic}"),
            Severity::Error => tracing::error!("{diagnostic}"),
        }
        self.items.push(diagnostic);
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn items(&self) -> &[Diagnostic] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_without_copy_source_writes_only_translated() {
        let mut buf = Vec::new();
        let mut emitter = Emitter::new(&mut buf, false, ';');
        emitter.emit(".db 1,2,3", ".byte\t1,2,3").unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), ".byte\t1,2,3\n");
    }

    #[test]
    fn emit_with_copy_source_prefixes_the_original() {
        let mut buf = Vec::new();
        let mut emitter = Emitter::new(&mut buf, true, ';');
        emitter.emit(".db 1,2,3", ".byte\t1,2,3").unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), ";.db 1,2,3\n.byte\t1,2,3\n");
    }

    #[test]
    fn diagnostics_track_error_presence() {
        let mut diags = Diagnostics::new();
        assert!(!diags.has_errors());
        diags.report(Severity::Warning, "f.s", 3, "looks odd");
        assert!(!diags.has_errors());
        diags.report(Severity::Error, "f.s", 4, "undefined macro");
        assert!(diags.has_errors());
        assert_eq!(diags.items().len(), 2);
    }
}
