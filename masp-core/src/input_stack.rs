//! Input Stack (§4.B): a LIFO stack of logical input sources, each
//! yielding lines, normalizing line endings and backslash-newline
//! continuation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::MaspError;
use crate::macros::MacroDef;

/// Implementation-defined maximum input-stack depth (§5 "Implementation-
/// defined maxima"). Exceeding it is fatal.
pub const MAX_DEPTH: usize = 256;

/// Splits raw source text into logical lines: `\r\n` and `\r` normalize to
/// `\n`; a line ending in `\` before the terminator is concatenated with
/// the next physical line, backslash and terminator dropped (§4.B). No
/// bracket/paren continuation tracking is performed — only this rule.
#[must_use]
pub fn split_logical_lines(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut physical: Vec<&str> = normalized.split('\n').collect();
    if physical.last() == Some(&"") {
        physical.pop();
    }
    let mut logical = Vec::new();
    let mut acc = String::new();
    for line in physical {
        if let Some(stripped) = line.strip_suffix('\\') {
            acc.push_str(stripped);
        } else {
            acc.push_str(line);
            logical.push(std::mem::take(&mut acc));
        }
    }
    if !acc.is_empty() {
        logical.push(acc);
    }
    logical
}

enum FrameKind {
    File,
    Macro { bindings: BTreeMap<String, String> },
    Repeat { remaining: u32 },
}

struct Frame {
    kind: FrameKind,
    source_name: String,
    lines: Vec<String>,
    cursor: usize,
    lineno: usize,
}

impl Frame {
    /// Advances the cursor and returns the next line, looping a `Repeat`
    /// frame's body for its remaining count instead of exhausting.
    fn advance(&mut self) -> Option<String> {
        if self.cursor >= self.lines.len() {
            if let FrameKind::Repeat { remaining } = &mut self.kind {
                if *remaining > 1 {
                    *remaining -= 1;
                    self.cursor = 0;
                } else {
                    return None;
                }
            } else {
                return None;
            }
        }
        let line = self.lines[self.cursor].clone();
        self.cursor += 1;
        self.lineno += 1;
        Some(line)
    }

    /// Forces this frame to exhaust on its next `advance`, used by
    /// `.END` to stop the current source early while still letting it
    /// pop normally.
    fn force_exhausted(&mut self) {
        self.cursor = self.lines.len();
        if let FrameKind::Repeat { remaining } = &mut self.kind {
            *remaining = 0;
        }
    }
}

/// One line surfaced by [`InputStack::next_line`].
pub struct NextLine {
    pub text: String,
    pub source_name: String,
    pub line: usize,
}

/// The stack of input sources (§4.B / §3 "Input Source"). Consumed in
/// LIFO order; the program terminates when the stack empties.
#[derive(Default)]
pub struct InputStack {
    frames: Vec<Frame>,
}

impl InputStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn check_depth(&self) -> Result<(), MaspError> {
        if self.frames.len() >= MAX_DEPTH {
            return Err(MaspError::Fatal(format!(
                "input-stack depth exceeded the maximum of {MAX_DEPTH} nested sources"
            )));
        }
        Ok(())
    }

    /// Reads and pushes `path` as a new file frame (primary or included —
    /// both are plain file frames; only the first push in a run is ever
    /// "primary" in the sense of §3, which has no behavioral effect here).
    pub fn push_file(&mut self, path: &Path) -> Result<(), MaspError> {
        self.check_depth()?;
        let text = fs::read_to_string(path)
            .map_err(|source| MaspError::Io { path: path.to_path_buf(), source })?;
        self.frames.push(Frame {
            kind: FrameKind::File,
            source_name: path.display().to_string(),
            lines: split_logical_lines(&text),
            cursor: 0,
            lineno: 0,
        });
        Ok(())
    }

    /// Pushes an already-loaded buffer as a file frame, used by the CLI
    /// to feed the primary input without requiring a real path (and by
    /// tests).
    pub fn push_text(&mut self, source_name: &str, text: &str) -> Result<(), MaspError> {
        self.check_depth()?;
        self.frames.push(Frame {
            kind: FrameKind::File,
            source_name: source_name.to_string(),
            lines: split_logical_lines(text),
            cursor: 0,
            lineno: 0,
        });
        Ok(())
    }

    /// Pushes a macro-expansion frame bound to `bindings`.
    pub fn push_macro(
        &mut self,
        def: &MacroDef,
        bindings: BTreeMap<String, String>,
        call_source: &str,
        call_line: usize,
    ) -> Result<(), MaspError> {
        self.check_depth()?;
        self.frames.push(Frame {
            kind: FrameKind::Macro { bindings },
            source_name: format!("{call_source}:{call_line}:macro {}", def.name),
            lines: def.body.clone(),
            cursor: 0,
            lineno: 0,
        });
        Ok(())
    }

    /// Pushes a repeat-body frame that replays `body` `count` times.
    pub fn push_repeat(
        &mut self,
        body: Vec<String>,
        count: u32,
        call_source: &str,
        call_line: usize,
    ) -> Result<(), MaspError> {
        self.check_depth()?;
        if count == 0 {
            return Ok(());
        }
        self.frames.push(Frame {
            kind: FrameKind::Repeat { remaining: count },
            source_name: format!("{call_source}:{call_line}:repeat"),
            lines: body,
            cursor: 0,
            lineno: 0,
        });
        Ok(())
    }

    /// Forces the current (topmost) frame to end early, per `.END`'s
    /// "stop processing the current source (still pops normally)".
    pub fn end_current(&mut self) {
        if let Some(top) = self.frames.last_mut() {
            top.force_exhausted();
        }
    }

    /// Returns the next logical line, popping exhausted frames as
    /// needed. `None` once the stack is empty.
    pub fn next_line(&mut self) -> Option<NextLine> {
        loop {
            let top = self.frames.last_mut()?;
            if let Some(text) = top.advance() {
                return Some(NextLine {
                    text,
                    source_name: top.source_name.clone(),
                    line: top.lineno,
                });
            }
            self.frames.pop();
        }
    }

    /// Looks up a macro formal-parameter binding in the nearest enclosing
    /// macro frame (skipping plain file/repeat frames), consulted before
    /// falling through to the symbol table (§4.C).
    #[must_use]
    pub fn lookup_binding(&self, name: &str) -> Option<&str> {
        for frame in self.frames.iter().rev() {
            if let FrameKind::Macro { bindings } = &frame.kind {
                return bindings.get(name).map(String::as_str);
            }
        }
        None
    }

    /// Current top-of-stack source name, for diagnostics.
    #[must_use]
    pub fn current_source_name(&self) -> Option<&str> {
        self.frames.last().map(|f| f.source_name.as_str())
    }
}
