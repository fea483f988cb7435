//! Line Scanner (§4.F): the per-line dispatch algorithm — suppression
//! check, `.ASSIGN`/`.EQU` recognition, directive dispatch, macro calls,
//! ordinary-line substitution, and emission.

use std::io::Write;

use crate::conditional::evaluate_predicate;
use crate::directives;
use crate::engine::{Engine, MAX_REPEAT_COUNT};
use crate::error::Severity;
use crate::macros::MacroDef;
use crate::sb::ByteBuffer;
use crate::symtab::SymbolTable;

/// In-progress `.MACRO ... .ENDM` body collection.
pub(crate) struct MacroCollector {
    name: String,
    formals: Vec<String>,
    body: Vec<String>,
}

/// In-progress `.AREPEAT <n> ... .AENDR` body collection.
pub(crate) struct RepeatCollector {
    count: u32,
    body: Vec<String>,
    call_source: String,
    call_line: usize,
}

const CONDITIONAL_CONTROL: &[&str] = &[".AIF", ".AELSE", ".AENDI", ".AREPEAT", ".AENDR"];

/// The first whitespace-delimited token in `s` (already left-trimmed).
fn first_token(s: &str) -> &str {
    s.split_whitespace().next().unwrap_or("")
}

/// Text following the first whitespace-delimited token.
fn rest_after_first_token(s: &str) -> &str {
    let trimmed = s.trim_start();
    match trimmed.find(char::is_whitespace) {
        Some(idx) => trimmed[idx..].trim_start(),
        None => "",
    }
}

/// Recognizes `<ident> .ASSIGN <value>` / `<ident> .EQU <value>` (§4.F
/// step 3). Returns `(name, value_text)`.
fn match_assign(trimmed: &str) -> Option<(&str, &str)> {
    let mut words = trimmed.splitn(3, char::is_whitespace);
    let name = words.next()?;
    if name.is_empty() || name.starts_with('.') {
        return None;
    }
    let remainder = trimmed[name.len()..].trim_start();
    let keyword = first_token(remainder);
    if !keyword.eq_ignore_ascii_case(".assign") && !keyword.eq_ignore_ascii_case(".equ") {
        return None;
    }
    let value = rest_after_first_token(remainder);
    Some((name, value))
}

/// Extracts a quoted path/string starting at the first quote in `s`,
/// returning its inner text (quotes stripped).
fn extract_quoted(s: &str) -> Option<String> {
    let trimmed = s.trim();
    let buf = ByteBuffer::from_str(trimmed);
    let idx = trimmed.find(['"', '\'']).filter(|&i| i == 0)?;
    let mut lit = ByteBuffer::new();
    let new_idx = buf.eat_literal(idx, &mut lit);
    if new_idx == idx {
        return None;
    }
    let text = lit.as_str().into_owned();
    Some(text.trim_matches(['"', '\'']).to_string())
}

/// Substitutes `\x` formal-parameter references (from `bindings`, if
/// any) and bare symbol references (from `symbols`) into `line`,
/// protecting quoted regions with `eat_literal` (§4.F step 6).
pub fn substitute(line: &str, symbols: &SymbolTable, bindings: Option<&dyn Fn(&str) -> Option<String>>) -> String {
    let bytes = line.as_bytes();
    let n = bytes.len();
    let buf = ByteBuffer::from_str(line);
    let mut out = String::with_capacity(line.len());
    let mut i = 0;
    let mut run_start = 0;
    while i < n {
        let c = bytes[i];
        if c == b'"' || c == b'\'' {
            out.push_str(&line[run_start..i]);
            let mut lit = ByteBuffer::new();
            let new_i = buf.eat_literal(i, &mut lit);
            out.push_str(&lit.as_str());
            i = new_i;
            run_start = i;
            continue;
        }
        if c == b'\\' {
            let start = i + 1;
            let mut j = start;
            while j < n && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
                j += 1;
            }
            if j > start {
                let name = &line[start..j];
                let bound = bindings.and_then(|lookup| lookup(name));
                out.push_str(&line[run_start..i]);
                match bound {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(&line[i..j]),
                }
                i = j;
                run_start = i;
                continue;
            }
        }
        if c.is_ascii_alphabetic() || c == b'_' {
            let start = i;
            let mut j = i;
            while j < n && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
                j += 1;
            }
            let word = &line[start..j];
            if let Some(value) = symbols.lookup(word) {
                out.push_str(&line[run_start..start]);
                out.push_str(&value.as_str());
                i = j;
                run_start = i;
                continue;
            }
            i = j;
            continue;
        }
        i += 1;
    }
    out.push_str(&line[run_start..n]);
    out
}

/// Runs [`substitute`] against `engine`'s current symbol table and
/// (if one is active) the nearest enclosing macro binding frame.
fn substitute_current<W: Write>(engine: &Engine<W>, text: &str) -> String {
    let lookup = |name: &str| engine.input.lookup_binding(name).map(str::to_string);
    substitute(text, &engine.symbols, Some(&lookup))
}

/// Processes one logical line against the engine (§4.F).
pub fn process_line<W: Write>(engine: &mut Engine<W>, raw_line: &str, source_name: &str, lineno: usize) {
    if engine.macro_collector.is_some() {
        collect_macro_line(engine, raw_line, source_name, lineno);
        return;
    }
    if engine.repeat_collector.is_some() {
        collect_repeat_line(engine, raw_line, source_name, lineno);
        return;
    }

    let trimmed = raw_line.trim_start();
    let first = first_token(trimmed);
    let first_upper = first.to_ascii_uppercase();
    let is_conditional_control = CONDITIONAL_CONTROL.contains(&first_upper.as_str());

    if !engine.conditionals.is_emitting() && !is_conditional_control {
        return;
    }

    if let Some((name, value_text)) = match_assign(trimmed) {
        let substituted = substitute_current(engine, value_text);
        engine.symbols.define(name, ByteBuffer::from_str(substituted.trim()));
        return;
    }

    if first.starts_with('.') {
        dispatch_directive(engine, &first_upper, trimmed, source_name, lineno);
        return;
    }

    if engine.macros.lookup(first).is_some() {
        dispatch_macro_call(engine, first, rest_after_first_token(trimmed), source_name, lineno);
        return;
    }

    let substituted = substitute_current(engine, raw_line);
    emit(engine, raw_line, &substituted);
}

fn emit<W: Write>(engine: &mut Engine<W>, original: &str, translated: &str) {
    if let Err(io_err) = engine.emitter.emit(original, translated) {
        engine.diagnostics.report(
            Severity::Error,
            engine.input.current_source_name().unwrap_or("<unknown>"),
            0,
            format!("write error: {io_err}"),
        );
    }
}

fn collect_macro_line<W: Write>(engine: &mut Engine<W>, raw_line: &str, source_name: &str, lineno: usize) {
    let first = first_token(raw_line.trim_start());
    if first.eq_ignore_ascii_case(".endm") {
        let collector = engine.macro_collector.take().expect("checked by caller");
        engine.macros.define(MacroDef {
            name: collector.name,
            formals: collector.formals,
            body: collector.body,
        });
        return;
    }
    if first.eq_ignore_ascii_case(".macro") {
        engine.diagnostics.report(
            Severity::Error,
            source_name,
            lineno,
            "nested .MACRO is not supported",
        );
        return;
    }
    if let Some(collector) = &mut engine.macro_collector {
        collector.body.push(raw_line.to_string());
    }
}

fn collect_repeat_line<W: Write>(engine: &mut Engine<W>, raw_line: &str, source_name: &str, lineno: usize) {
    let first = first_token(raw_line.trim_start());
    if first.eq_ignore_ascii_case(".aendr") {
        let collector = engine.repeat_collector.take().expect("checked by caller");
        if let Err(err) = engine.input.push_repeat(
            collector.body,
            collector.count,
            &collector.call_source,
            collector.call_line,
        ) {
            match err {
                crate::error::MaspError::Fatal(_) => engine.report_fatal(source_name, lineno, err),
                other => engine.diagnostics.report(Severity::Error, source_name, lineno, other.to_string()),
            }
        }
        return;
    }
    if first.eq_ignore_ascii_case(".arepeat") {
        engine.diagnostics.report(
            Severity::Error,
            source_name,
            lineno,
            "nested .AREPEAT is not supported",
        );
        return;
    }
    if let Some(collector) = &mut engine.repeat_collector {
        collector.body.push(raw_line.to_string());
    }
}

fn dispatch_directive<W: Write>(
    engine: &mut Engine<W>,
    directive_upper: &str,
    trimmed: &str,
    source_name: &str,
    lineno: usize,
) {
    let rest = rest_after_first_token(trimmed);

    match directive_upper {
        ".MACRO" => {
            let name = first_token(rest);
            if name.is_empty() {
                engine.diagnostics.report(Severity::Error, source_name, lineno, "`.MACRO` requires a name");
                return;
            }
            let formals: Vec<String> = directives::split_operands(rest_after_first_token(rest))
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect();
            engine.macro_collector =
                Some(MacroCollector { name: name.to_string(), formals, body: Vec::new() });
        }
        ".ENDM" => {
            engine.diagnostics.report(Severity::Error, source_name, lineno, "`.ENDM` without `.MACRO`");
        }
        ".AREPEAT" => {
            let substituted = substitute_current(engine, rest);
            match directives::parse_integer_literal(substituted.trim()) {
                Some(n) if n >= 0 && (n as u64) <= u64::from(MAX_REPEAT_COUNT) => {
                    engine.repeat_collector = Some(RepeatCollector {
                        count: n as u32,
                        body: Vec::new(),
                        call_source: source_name.to_string(),
                        call_line: lineno,
                    });
                }
                Some(_) => {
                    engine.diagnostics.report(
                        Severity::Error,
                        source_name,
                        lineno,
                        format!("`.AREPEAT` count exceeds the maximum of {MAX_REPEAT_COUNT}"),
                    );
                }
                None => {
                    engine.diagnostics.report(
                        Severity::Error,
                        source_name,
                        lineno,
                        format!("malformed `.AREPEAT` count: '{rest}'"),
                    );
                }
            }
        }
        ".AENDR" => {
            engine.diagnostics.report(Severity::Error, source_name, lineno, "`.AENDR` without `.AREPEAT`");
        }
        ".AIF" => {
            let substituted = substitute_current(engine, rest);
            match evaluate_predicate(&substituted) {
                Ok(result) => engine.conditionals.push_if(result),
                Err(message) => {
                    engine.diagnostics.report(Severity::Error, source_name, lineno, message);
                    engine.conditionals.push_if(false);
                }
            }
        }
        ".AELSE" => {
            if let Err(err) = engine.conditionals.toggle_else() {
                engine.diagnostics.report(Severity::Error, source_name, lineno, err.to_string());
            }
        }
        ".AENDI" => {
            if let Err(err) = engine.conditionals.pop_endif() {
                engine.diagnostics.report(Severity::Error, source_name, lineno, err.to_string());
            }
        }
        ".INCLUDE" => match extract_quoted(rest) {
            Some(path) => engine.include_file(&path, source_name, lineno),
            None => {
                engine.diagnostics.report(
                    Severity::Error,
                    source_name,
                    lineno,
                    "`.INCLUDE` requires a quoted path",
                );
            }
        },
        ".ALTERNATE" => engine.alternate_mode = true,
        ".END" => engine.input.end_current(),
        ".ASSIGN" | ".EQU" => {
            let operands = directives::split_operands(rest);
            match operands.split_first() {
                Some((name, value_parts)) if !name.is_empty() => {
                    let value = value_parts.join(",");
                    let substituted = substitute_current(engine, &value);
                    engine.symbols.define(name, ByteBuffer::from_str(substituted.trim()));
                }
                _ => {
                    engine.diagnostics.report(
                        Severity::Error,
                        source_name,
                        lineno,
                        format!("malformed `{directive_upper}`"),
                    );
                }
            }
        }
        ".PRINT" => match directives::lookup_print(rest) {
            Some(simple) => {
                let translated = directives::render(simple, "", engine.alternate_mode);
                emit(engine, trimmed, &translated);
            }
            None => {
                engine.diagnostics.report(
                    Severity::Error,
                    source_name,
                    lineno,
                    format!("`.PRINT` argument must be LIST or NOLIST, got '{rest}'"),
                );
            }
        },
        other => {
            if let Some(simple) = directives::lookup_simple(other) {
                let substituted = substitute_current(engine, rest);
                let translated = directives::render(simple, &substituted, engine.alternate_mode);
                emit(engine, trimmed, &translated);
            } else {
                engine.diagnostics.report(
                    Severity::Error,
                    source_name,
                    lineno,
                    format!("unrecognized directive '{other}'"),
                );
            }
        }
    }
}

fn dispatch_macro_call<W: Write>(
    engine: &mut Engine<W>,
    name: &str,
    actuals_text: &str,
    source_name: &str,
    lineno: usize,
) {
    let Some(def) = engine.macros.lookup(name).cloned() else {
        engine.diagnostics.report(Severity::Error, source_name, lineno, format!("undefined macro '{name}'"));
        return;
    };
    let substituted = substitute_current(engine, actuals_text);
    let actuals: Vec<String> =
        directives::split_operands(&substituted).into_iter().filter(|s| !s.is_empty()).collect();
    match crate::macros::MacroStore::bind(&def, &actuals) {
        Ok(bindings) => {
            if let Err(err) = engine.input.push_macro(&def, bindings, source_name, lineno) {
                match err {
                    crate::error::MaspError::Fatal(_) => engine.report_fatal(source_name, lineno, err),
                    other => engine.diagnostics.report(Severity::Error, source_name, lineno, other.to_string()),
                }
            }
        }
        Err(too_many) => {
            engine.diagnostics.report(
                Severity::Error,
                source_name,
                lineno,
                format!(
                    "macro '{name}' called with {} actuals but takes at most {}",
                    too_many.got, too_many.expected
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_token_skips_nothing_already_trimmed() {
        assert_eq!(first_token(".db 1,2"), ".db");
        assert_eq!(first_token(""), "");
    }

    #[test]
    fn rest_after_first_token_trims_leading_space() {
        assert_eq!(rest_after_first_token(".db   1,2,3"), "1,2,3");
        assert_eq!(rest_after_first_token(".page"), "");
    }

    #[test]
    fn match_assign_recognizes_assign_and_equ() {
        assert_eq!(match_assign("X .assign 3"), Some(("X", "3")));
        assert_eq!(match_assign("Y .EQU 0x10"), Some(("Y", "0x10")));
        assert_eq!(match_assign(".db 1"), None);
        assert_eq!(match_assign("X .notassign 3"), None);
    }

    #[test]
    fn extract_quoted_strips_delimiters() {
        assert_eq!(extract_quoted("\"path/to/file\""), Some("path/to/file".to_string()));
        assert_eq!(extract_quoted("nope"), None);
    }

    #[test]
    fn substitute_replaces_bare_symbol_but_not_inside_string_literal() {
        let mut symbols = SymbolTable::new();
        symbols.define("X", ByteBuffer::from_str("42"));
        let out = substitute("db X, \"X\"", &symbols, None);
        assert_eq!(out, "db 42, \"X\"");
    }

    #[test]
    fn substitute_resolves_backslash_formal_from_bindings() {
        let symbols = SymbolTable::new();
        let lookup = |name: &str| if name == "a" { Some("99".to_string()) } else { None };
        let lookup_ref: &dyn Fn(&str) -> Option<String> = &lookup;
        let out = substitute(" .db \\a", &symbols, Some(lookup_ref));
        assert_eq!(out, " .db 99");
    }

    #[test]
    fn substitute_is_a_no_op_with_no_matching_symbol_or_binding() {
        let symbols = SymbolTable::new();
        let out = substitute("mov r0, r1", &symbols, None);
        assert_eq!(out, "mov r0, r1");
    }
}
