//! Symbol Table (§4.C): `name -> value` with case-folded lookup, used by
//! `.ASSIGN`/`.EQU` and by the scanner's substitution pass.

use std::collections::BTreeMap;

use smartstring::alias::CompactString;

use crate::sb::ByteBuffer;

fn fold(name: &str) -> CompactString {
    CompactString::from(name.to_ascii_uppercase())
}

/// Global symbol table. Lives for the entire run; mutated only by
/// directive handlers, read by the scanner.
#[derive(Default)]
pub struct SymbolTable {
    table: BTreeMap<CompactString, ByteBuffer>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Establishes or replaces a symbol.
    pub fn define(&mut self, name: &str, value: ByteBuffer) {
        self.table.insert(fold(name), value);
    }

    /// Looks up a symbol's value, case-insensitively.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&ByteBuffer> {
        self.table.get(&fold(name))
    }

    #[must_use]
    pub fn is_defined(&self, name: &str) -> bool {
        self.table.contains_key(&fold(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_and_lookup_is_case_insensitive() {
        let mut syms = SymbolTable::new();
        syms.define("Foo", ByteBuffer::from_str("3"));
        assert_eq!(syms.lookup("FOO").unwrap().as_str(), "3");
        assert_eq!(syms.lookup("foo").unwrap().as_str(), "3");
    }

    #[test]
    fn redefine_replaces_prior_value() {
        let mut syms = SymbolTable::new();
        syms.define("X", ByteBuffer::from_str("1"));
        syms.define("X", ByteBuffer::from_str("2"));
        assert_eq!(syms.lookup("X").unwrap().as_str(), "2");
    }

    #[test]
    fn unknown_symbol_is_absent() {
        let syms = SymbolTable::new();
        assert!(syms.lookup("NOPE").is_none());
        assert!(!syms.is_defined("NOPE"));
    }
}
