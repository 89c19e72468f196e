//! Symbol table: one entry per referenced function and per auto-included
//! directory file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File auto-included before the functions of its directory.
pub const BOOTSTRAP_FILE: &str = "_.sh";
/// File auto-included after the functions of its directory.
pub const FINALIZER_FILE: &str = "ZZZ.sh";

/// Output bucket of a symbol. Declaration order is emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Position {
    Prologue,
    Body,
    Epilogue,
}

impl Position {
    pub const ALL: [Position; 3] = [Position::Prologue, Position::Body, Position::Epilogue];
}

/// A named, file-backed function (or auto-included directory file).
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    source_file: Option<PathBuf>,
    pub source_loaded: bool,
    pub source: String,
    pub rendered_as_template: bool,
    pub position: Position,
    pub inserted: bool,
}

impl Symbol {
    pub fn new(name: impl Into<String>, position: Position) -> Self {
        Symbol {
            name: name.into(),
            source_file: None,
            source_loaded: false,
            source: String::new(),
            rendered_as_template: false,
            position,
            inserted: false,
        }
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    /// Record the resolved file. The path is set at most once; later calls
    /// are ignored and return `false`.
    pub fn set_source_file(&mut self, path: impl Into<PathBuf>) -> bool {
        if self.source_file.is_some() {
            return false;
        }
        self.source_file = Some(path.into());
        true
    }
}

/// Map a symbol name to its path relative to a search directory:
/// `Linux::Apt::install` becomes `Linux/Apt/install.sh`.
pub fn symbol_path(name: &str) -> PathBuf {
    PathBuf::from(format!("{}.sh", name.replace("::", "/")))
}

/// All symbols of one compile session, keyed and iterated by name.
/// Entries are never removed.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: BTreeMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        self.symbols.get_mut(name)
    }

    /// Insert a new symbol unless the name is already present.
    /// Returns whether the symbol was inserted.
    pub fn insert(&mut self, symbol: Symbol) -> bool {
        if self.symbols.contains_key(&symbol.name) {
            return false;
        }
        self.symbols.insert(symbol.name.clone(), symbol);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Symbol> {
        self.symbols.values_mut()
    }

    /// Names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.symbols.keys().cloned().collect()
    }

    /// Names of symbols whose content is not loaded yet, sorted.
    pub fn unloaded(&self) -> Vec<String> {
        self.symbols
            .values()
            .filter(|s| !s.source_loaded)
            .map(|s| s.name.clone())
            .collect()
    }

    /// Names of loaded symbols that still need their one-time template
    /// rendering, sorted.
    pub fn unrendered(&self) -> Vec<String> {
        self.symbols
            .values()
            .filter(|s| s.source_loaded && !s.rendered_as_template)
            .map(|s| s.name.clone())
            .collect()
    }

    pub fn mark_all_uninserted(&mut self) {
        for symbol in self.symbols.values_mut() {
            symbol.inserted = false;
        }
    }
}
