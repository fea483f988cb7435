//! Macro Store (§4.D): `name -> { formals, body }`, plus the positional
//! binding of actuals to formals performed at each call site.

use std::collections::BTreeMap;

use smartstring::alias::CompactString;

fn fold(name: &str) -> CompactString {
    CompactString::from(name.to_ascii_uppercase())
}

/// A macro definition: its formal parameter names and its verbatim body
/// lines (no substitution happens at definition time — §4.G).
#[derive(Debug, Clone)]
pub struct MacroDef {
    pub name: String,
    pub formals: Vec<String>,
    pub body: Vec<String>,
}

/// Error binding actuals to formals: too many actuals is the one case
/// §4.D calls out explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TooManyActuals {
    pub expected: usize,
    pub got: usize,
}

/// Global macro store. A redefinition replaces the prior entry.
#[derive(Default)]
pub struct MacroStore {
    table: BTreeMap<CompactString, MacroDef>,
}

impl MacroStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, def: MacroDef) {
        self.table.insert(fold(&def.name), def);
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&MacroDef> {
        self.table.get(&fold(name))
    }

    #[must_use]
    pub fn is_defined(&self, name: &str) -> bool {
        self.table.contains_key(&fold(name))
    }

    /// Pairs `actuals` with `def.formals` positionally. Fewer actuals than
    /// formals bind the remainder to the empty string; more is an error.
    pub fn bind(
        def: &MacroDef,
        actuals: &[String],
    ) -> Result<BTreeMap<String, String>, TooManyActuals> {
        if actuals.len() > def.formals.len() {
            return Err(TooManyActuals { expected: def.formals.len(), got: actuals.len() });
        }
        let mut bindings = BTreeMap::new();
        for (i, formal) in def.formals.iter().enumerate() {
            let actual = actuals.get(i).cloned().unwrap_or_default();
            bindings.insert(formal.clone(), actual);
        }
        Ok(bindings)
    }
}
