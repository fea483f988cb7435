//! The engine-context value (§9 DESIGN NOTES: "organized as an
//! engine-context value threaded through all handlers, avoiding
//! process-wide mutable state"). `Engine` owns every subsystem and is
//! passed by `&mut` into the scanner and directive dispatch.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::conditional::ConditionalStack;
use crate::emitter::{Diagnostics, Emitter};
use crate::error::{MaspError, Severity};
use crate::input_stack::InputStack;
use crate::macros::MacroStore;
use crate::scanner::{self, MacroCollector, RepeatCollector};
use crate::symtab::SymbolTable;

/// Implementation-defined maximum macro-expansion depth (§5). Distinct
/// from [`crate::input_stack::MAX_DEPTH`] conceptually, though both are
/// enforced by the same input-stack push check since macro frames are
/// pushed onto it.
pub const MAX_MACRO_EXPANSION_DEPTH: usize = crate::input_stack::MAX_DEPTH;

/// Implementation-defined maximum `.AREPEAT` count (§5).
pub const MAX_REPEAT_COUNT: u32 = 1_000_000;

/// Run-time configuration derived once from the CLI (§6), bundling the
/// parsed settings into one plain value for the rest of the program to
/// consume instead of threading individual flags through.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub copy_source: bool,
    pub comment_char: char,
    pub include_path: Vec<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { copy_source: false, comment_char: ';', include_path: Vec::new() }
    }
}

/// Everything a directive handler or the scanner needs, bundled into one
/// value instead of free-floating globals.
pub struct Engine<W: Write> {
    pub input: InputStack,
    pub symbols: SymbolTable,
    pub macros: MacroStore,
    pub conditionals: ConditionalStack,
    pub emitter: Emitter<W>,
    pub diagnostics: Diagnostics,
    pub alternate_mode: bool,
    pub config: EngineConfig,
    pub(crate) macro_collector: Option<MacroCollector>,
    pub(crate) repeat_collector: Option<RepeatCollector>,
    /// Set by a directive handler that hit a §7 "Fatal error" (e.g.
    /// input-stack depth exceeded). Checked by `run` after every line so
    /// the engine stops immediately rather than limping on, per §7's
    /// "the process terminates immediately with a diagnostic" — modeled
    /// here as an early, clean stop rather than a panic, since only
    /// buffer-capacity overflow (§4.A) aborts via `panic!`.
    pub(crate) fatal: Option<MaspError>,
}

impl<W: Write> Engine<W> {
    pub fn new(out: W, config: EngineConfig) -> Self {
        let emitter = Emitter::new(out, config.copy_source, config.comment_char);
        Self {
            input: InputStack::new(),
            symbols: SymbolTable::new(),
            macros: MacroStore::new(),
            conditionals: ConditionalStack::new(),
            emitter,
            diagnostics: Diagnostics::new(),
            alternate_mode: false,
            config,
            macro_collector: None,
            repeat_collector: None,
            fatal: None,
        }
    }

    /// Records a fatal condition, causing `run` to stop after the
    /// current line instead of continuing to drain the input stack.
    pub(crate) fn report_fatal(&mut self, source_name: &str, line: usize, err: MaspError) {
        self.diagnostics.report(Severity::Error, source_name, line, err.to_string());
        self.fatal = Some(err);
    }

    /// The fatal error that stopped the run, if any.
    #[must_use]
    pub fn fatal(&self) -> Option<&MaspError> {
        self.fatal.as_ref()
    }

    /// Resolves `.INCLUDE "<name>"` against the configured include path,
    /// trying the literal path first.
    fn resolve_include(&self, name: &str) -> PathBuf {
        let direct = Path::new(name);
        if direct.is_absolute() || direct.is_file() {
            return direct.to_path_buf();
        }
        for dir in &self.config.include_path {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return candidate;
            }
        }
        direct.to_path_buf()
    }

    pub fn include_file(&mut self, name: &str, from_source: &str, from_line: usize) {
        let path = self.resolve_include(name);
        if let Err(err) = self.input.push_file(&path) {
            match err {
                MaspError::Fatal(_) => self.report_fatal(from_source, from_line, err),
                other => self.diagnostics.report(
                    Severity::Error,
                    from_source,
                    from_line,
                    format!("cannot include {name}: {other}"),
                ),
            }
        }
    }

    /// Feeds `path` as the primary input and drives the engine to
    /// completion (until the input stack empties, per §3 "the program
    /// terminates when the stack empties").
    pub fn process_file(&mut self, path: &Path) -> Result<(), MaspError> {
        self.input.push_file(path)?;
        self.run();
        Ok(())
    }

    /// Feeds `text` as a named primary input and drives the engine to
    /// completion. Used by the CLI for stdin-shaped sources and by tests.
    pub fn process_text(&mut self, source_name: &str, text: &str) -> Result<(), MaspError> {
        self.input.push_text(source_name, text)?;
        self.run();
        Ok(())
    }

    /// Drains the input stack, dispatching each logical line to the
    /// scanner (§4.F), until it empties.
    fn run(&mut self) {
        while let Some(next) = self.input.next_line() {
            scanner::process_line(self, &next.text, &next.source_name, next.line);
            if self.fatal.is_some() {
                return;
            }
        }
        if self.conditionals.depth() > 0 {
            self.diagnostics.report(
                Severity::Error,
                "<eof>",
                0,
                "unclosed .AIF block at end of source",
            );
        }
        if self.macro_collector.is_some() {
            self.diagnostics.report(
                Severity::Error,
                "<eof>",
                0,
                "unclosed .MACRO block at end of source",
            );
        }
        if self.repeat_collector.is_some() {
            self.diagnostics.report(
                Severity::Error,
                "<eof>",
                0,
                "unclosed .AREPEAT block at end of source",
            );
        }
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(self.diagnostics.has_errors())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: &str, copy_source: bool) -> String {
        let mut out = Vec::new();
        let config = EngineConfig { copy_source, comment_char: ';', ..EngineConfig::default() };
        {
            let mut engine = Engine::new(&mut out, config);
            engine.process_text("t.s", input).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn scenario_1_db_list() {
        let out = run(".db 1,2,3\n.END\n", true);
        assert!(out.contains(".byte\t1,2,3"));
    }

    #[test]
    fn scenario_2_dw_hex_normalizes_to_decimal() {
        let out = run(".dw 258\n.END\n", true);
        assert!(out.contains(".short\t258"));
    }

    #[test]
    fn scenario_3_assign_then_db_substitutes() {
        let out = run("X .assign 3\n.db X\n.END\n", true);
        assert!(out.contains(".byte\t3"));
    }

    #[test]
    fn scenario_4_macro_call_substitutes_formal() {
        let out = run(".macro M x\n .db \\x\n .endm\n M 5\n.END\n", true);
        assert!(out.contains(".byte\t5"));
    }

    #[test]
    fn macro_call_with_comma_separated_formals_binds_each() {
        let out = run(".macro M a,b\n .db \\a,\\b\n .endm\n M 1,2\n.END\n", true);
        assert!(out.contains(".byte\t1,2"));
    }

    #[test]
    fn scenario_5_aif_true_emits_body() {
        let out = run(".AIF 1 EQ 1\n.DB 9\n.AENDI\n.END\n", true);
        assert!(out.contains(".byte\t9"));
    }

    #[test]
    fn aif_predicate_substitutes_macro_formal_before_evaluating() {
        let out = run(".macro M x\n .AIF \\x EQ 1\n .DB 9\n .AENDI\n .endm\n M 1\n.END\n", true);
        assert!(out.contains(".byte\t9"));
    }

    #[test]
    fn scenario_6_aif_false_emits_else_branch() {
        let out = run(".AIF 0 EQ 1\n.DB 1\n.AELSE\n.DB 2\n.AENDI\n.END\n", true);
        assert!(out.contains(".byte\t2"));
        assert!(!out.contains(".byte\t1"));
    }

    #[test]
    fn scenario_7_heading() {
        let out = run(".HEADING \"TITLE\"\n.END\n", true);
        assert!(out.contains(".title\t\"TITLE\""));
    }

    #[test]
    fn scenario_8_alternate_mode_source_copy_contains_original_string() {
        let out = run(".ALTERNATE\n.db \"ABC\"\n.END\n", true);
        assert!(out.contains("ABC"));
    }

    #[test]
    fn scenario_9_arepeat_replays_body_three_times() {
        let out = run(".AREPEAT 3\n.DB 1\n.AENDR\n.END\n", true);
        assert_eq!(out.matches(".byte\t1").count(), 3);
    }

    #[test]
    fn scenario_10_export() {
        let out = run(".EXPORT foo\n.END\n", true);
        assert!(out.contains(".global\tfoo"));
    }

    #[test]
    fn determinism_across_repeated_runs() {
        let input = ".macro M x\n .db \\x\n .endm\n M 1\n M 2\n.END\n";
        let first = run(input, true);
        for _ in 0..50 {
            assert_eq!(run(input, true), first);
        }
    }
}
