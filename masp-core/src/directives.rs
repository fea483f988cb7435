//! Directive Handlers (§4.G): the recognized directives and their
//! translations. Stateless data-directive rendering lives here; the
//! directives that need to mutate engine state (`.INCLUDE`, `.MACRO`,
//! `.AIF`/.../`.AREPEAT`, `.ASSIGN`, `.ALTERNATE`, `.END`, macro calls)
//! are dispatched from `src/scanner.rs`, which owns the `&mut Engine`.

use crate::sb::ByteBuffer;

/// The directives whose translation is a pure function of their operand
/// text and the ALTERNATE-mode flag — no engine-state interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleDirective {
    Db,
    Dw,
    Dl,
    Align,
    Res,
    Export,
    Heading,
    Page,
    PrintList,
    PrintNoList,
}

/// Case-insensitive directive table (§4.F "matched after case-folding").
/// `.SRES` is a spelling alias for `.RES` (§4.G).
const SIMPLE_DIRECTIVES: &[(&str, SimpleDirective)] = &[
    (".DB", SimpleDirective::Db),
    (".DW", SimpleDirective::Dw),
    (".DL", SimpleDirective::Dl),
    (".ALIGN", SimpleDirective::Align),
    (".RES", SimpleDirective::Res),
    (".SRES", SimpleDirective::Res),
    (".EXPORT", SimpleDirective::Export),
    (".HEADING", SimpleDirective::Heading),
    (".PAGE", SimpleDirective::Page),
];

#[must_use]
pub fn lookup_simple(name: &str) -> Option<SimpleDirective> {
    let upper = name.to_ascii_uppercase();
    SIMPLE_DIRECTIVES.iter().find(|(n, _)| *n == upper).map(|(_, d)| *d)
}

/// `.PRINT LIST` / `.PRINT NOLIST` is a two-word directive; handled
/// separately from the single-token table above.
#[must_use]
pub fn lookup_print(rest: &str) -> Option<SimpleDirective> {
    match rest.trim().to_ascii_uppercase().as_str() {
        "LIST" => Some(SimpleDirective::PrintList),
        "NOLIST" => Some(SimpleDirective::PrintNoList),
        _ => None,
    }
}

/// Renders a [`SimpleDirective`] and its (already symbol-substituted)
/// operand text into GNU-assembler output.
#[must_use]
pub fn render(directive: SimpleDirective, rest: &str, alternate_mode: bool) -> String {
    match directive {
        SimpleDirective::Db => format!(".byte\t{}", render_data_operands(rest, alternate_mode)),
        SimpleDirective::Dw => format!(".short\t{}", render_data_operands(rest, alternate_mode)),
        SimpleDirective::Dl => format!(".long\t{}", render_data_operands(rest, alternate_mode)),
        SimpleDirective::Align => format!(".align\t{}", render_data_operands(rest, alternate_mode)),
        SimpleDirective::Res => format!(".space\t{}", render_data_operands(rest, alternate_mode)),
        SimpleDirective::Export => format!(".global\t{}", rest.trim()),
        SimpleDirective::Heading => format!(".title\t{}", rest.trim()),
        SimpleDirective::Page => ".eject".to_string(),
        SimpleDirective::PrintList => ".list".to_string(),
        SimpleDirective::PrintNoList => ".nolist".to_string(),
    }
}

/// Tokenizes an operand list respecting nested parentheses and quoted
/// literals (§4.G).
#[must_use]
pub fn split_operands(s: &str) -> Vec<String> {
    if s.trim().is_empty() {
        return Vec::new();
    }
    let buf = ByteBuffer::from_str(s);
    let bytes = s.as_bytes();
    let n = bytes.len();
    let mut out = Vec::new();
    let mut i = 0;
    let mut depth: i32 = 0;
    let mut start = 0;
    while i < n {
        match bytes[i] {
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' => {
                depth = depth.saturating_sub(1);
                i += 1;
            }
            b'"' | b'\'' => {
                let mut lit = ByteBuffer::new();
                i = buf.eat_literal(i, &mut lit);
            }
            b',' if depth == 0 => {
                out.push(s[start..i].trim().to_string());
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    out.push(s[start..].trim().to_string());
    out
}

fn is_quoted(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 2
        && ((bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\''))
}

fn render_operand(op: &str, alternate_mode: bool) -> String {
    let trimmed = op.trim();
    if is_quoted(trimmed) {
        if alternate_mode {
            let inner = &trimmed[1..trimmed.len() - 1];
            return inner.chars().map(|c| format!("'{c}'")).collect::<Vec<_>>().join(",");
        }
        return trimmed.to_string();
    }
    match parse_integer_literal(trimmed) {
        Some(n) => n.to_string(),
        None => trimmed.to_string(),
    }
}

#[must_use]
pub fn render_data_operands(list: &str, alternate_mode: bool) -> String {
    split_operands(list).iter().map(|op| render_operand(op, alternate_mode)).collect::<Vec<_>>().join(",")
}

/// Parses an integer literal with the base conversions §4.G specifies:
/// `0x`/`0X` hex, leading `0` octal, trailing `B` binary, trailing `Q`
/// octal, trailing `H` hex, plain decimal otherwise.
#[must_use]
pub fn parse_integer_literal(tok: &str) -> Option<i64> {
    let t = tok.trim();
    if t.is_empty() {
        return None;
    }
    if let Some(rest) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return i64::from_str_radix(rest, 16).ok();
    }
    if let Some(rest) = t.strip_suffix(['H', 'h']) {
        if !rest.is_empty() {
            return i64::from_str_radix(rest, 16).ok();
        }
    }
    if let Some(rest) = t.strip_suffix(['B', 'b']) {
        if !rest.is_empty() {
            return i64::from_str_radix(rest, 2).ok();
        }
    }
    if let Some(rest) = t.strip_suffix(['Q', 'q']) {
        if !rest.is_empty() {
            return i64::from_str_radix(rest, 8).ok();
        }
    }
    if t.len() > 1 && t.starts_with('0') && t.as_bytes().iter().all(u8::is_ascii_digit) {
        return i64::from_str_radix(&t[1..], 8).ok();
    }
    t.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_simple_is_case_insensitive_and_aliases_sres() {
        assert_eq!(lookup_simple(".db"), Some(SimpleDirective::Db));
        assert_eq!(lookup_simple(".DB"), Some(SimpleDirective::Db));
        assert_eq!(lookup_simple(".sres"), Some(SimpleDirective::Res));
        assert_eq!(lookup_simple(".nope"), None);
    }

    #[test]
    fn render_db_decimal_normalizes_and_joins_with_commas() {
        assert_eq!(render(SimpleDirective::Db, "1,2,3", false), ".byte\t1,2,3");
    }

    #[test]
    fn render_dw_normalizes_hex_to_decimal() {
        assert_eq!(render(SimpleDirective::Dw, "0x102", false), ".short\t258");
    }

    #[test]
    fn render_export_passes_name_through() {
        assert_eq!(render(SimpleDirective::Export, "foo", false), ".global\tfoo");
    }

    #[test]
    fn render_heading_keeps_quotes() {
        assert_eq!(render(SimpleDirective::Heading, "\"TITLE\"", false), ".title\t\"TITLE\"");
    }

    #[test]
    fn alternate_mode_expands_string_operand_to_char_literals() {
        assert_eq!(render(SimpleDirective::Db, "\"AB\"", true), ".byte\t'A','B'");
    }

    #[test]
    fn non_alternate_mode_keeps_string_operand_verbatim() {
        assert_eq!(render(SimpleDirective::Db, "\"AB\"", false), ".byte\t\"AB\"");
    }

    #[test]
    fn split_operands_respects_parens_and_quotes() {
        let ops = split_operands("foo(1,2),\"a,b\",3");
        assert_eq!(ops, vec!["foo(1,2)", "\"a,b\"", "3"]);
    }

    #[test]
    fn parse_integer_literal_covers_all_bases() {
        assert_eq!(parse_integer_literal("0x1A"), Some(26));
        assert_eq!(parse_integer_literal("0X1a"), Some(26));
        assert_eq!(parse_integer_literal("1AH"), Some(26));
        assert_eq!(parse_integer_literal("1010B"), Some(10));
        assert_eq!(parse_integer_literal("17Q"), Some(15));
        assert_eq!(parse_integer_literal("017"), Some(15));
        assert_eq!(parse_integer_literal("258"), Some(258));
        assert_eq!(parse_integer_literal("0"), Some(0));
    }
}
