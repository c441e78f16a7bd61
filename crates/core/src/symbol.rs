//! Symbol interning, spec §3.3.
//!
//! Grounded on the teacher's `intern.rs` `StringId` scheme: a small `Copy`
//! index type backed by a vector, so cloning a word cell never clones text.

use std::fmt;

use ahash::AHashMap;

/// Interned symbol identity. Stable for the lifetime of the `Runtime` that
/// created it; carries a canonical (lowercase) form and a hash, spec §3.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Symbol(u32);

impl Symbol {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Reconstructs a `Symbol` from a previously-returned `index()`. Only
    /// sound for indices a `SymbolTable` actually minted (e.g. a LET patch's
    /// cached symbol slot, spec §4.E); never construct one from an arbitrary
    /// integer.
    #[must_use]
    pub(crate) fn from_index(idx: u32) -> Self {
        Self(idx)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%sym{}", self.0)
    }
}

/// The symbol table: interned byte strings with stable identity, spec §3.3.
///
/// Canonicalization here is case-insensitive ASCII fold, matching Rebol's
/// case-insensitive-by-default word comparisons; the original spelling is
/// retained alongside the canonical form for molding.
#[derive(Debug, Default)]
pub struct SymbolTable {
    spellings: Vec<Box<str>>,
    canonical: Vec<Box<str>>,
    by_canonical: AHashMap<Box<str>, Symbol>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `text`, returning the existing `Symbol` if this canonical form
    /// was already seen, else allocating a new one.
    pub fn intern(&mut self, text: &str) -> Symbol {
        let canon = canonicalize(text);
        if let Some(&sym) = self.by_canonical.get(canon.as_str()) {
            return sym;
        }
        let id = Symbol(u32::try_from(self.spellings.len()).expect("symbol table overflow"));
        self.spellings.push(text.into());
        self.canonical.push(canon.clone().into());
        self.by_canonical.insert(canon.into(), id);
        id
    }

    #[must_use]
    pub fn spelling(&self, sym: Symbol) -> &str {
        &self.spellings[sym.index()]
    }

    #[must_use]
    pub fn canonical_str(&self, sym: Symbol) -> &str {
        &self.canonical[sym.index()]
    }

    /// Looks up a symbol without interning, for lookups that must not grow
    /// the table (spec §4.E: "binding never mutates the structure").
    #[must_use]
    pub fn lookup(&self, text: &str) -> Option<Symbol> {
        self.by_canonical.get(canonicalize(text).as_str()).copied()
    }
}

fn canonicalize(text: &str) -> String {
    text.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_case_insensitive() {
        let mut table = SymbolTable::new();
        let a = table.intern("Foo");
        let b = table.intern("FOO");
        let c = table.intern("foo");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(table.spelling(a), "Foo");
    }

    #[test]
    fn distinct_spellings_are_distinct_symbols() {
        let mut table = SymbolTable::new();
        let a = table.intern("foo");
        let b = table.intern("bar");
        assert_ne!(a, b);
    }
}
