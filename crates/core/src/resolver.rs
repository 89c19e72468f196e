//! Symbol name to source file resolution over an ordered search path.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{CompileError, Result};
use crate::symbol::{symbol_path, Position, BOOTSTRAP_FILE, FINALIZER_FILE};

/// Resolves symbol names against an ordered list of search directories.
#[derive(Debug, Clone)]
pub struct Resolver {
    search_dirs: Vec<PathBuf>,
}

impl Resolver {
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        Resolver { search_dirs }
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// First existing `<dir>/<symbol path>` on the search path.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let relative = symbol_path(name);
        for dir in &self.search_dirs {
            let candidate = dir.join(&relative);
            tracing::trace!(symbol = name, candidate = %candidate.display(), "probing");
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }

    /// Like [`Resolver::resolve`] but absence is a `FunctionNotFound` error.
    pub fn resolve_or_fail(&self, name: &str) -> Result<PathBuf> {
        self.resolve(name)
            .ok_or_else(|| CompileError::FunctionNotFound {
                name: name.to_string(),
                search_dirs: self.search_dirs.clone(),
            })
    }
}

/// Bootstrap and finalizer files sitting next to `source_file`, with the
/// bucket each belongs to.
pub fn directory_files(source_file: &Path) -> Vec<(PathBuf, Position)> {
    let Some(dir) = source_file.parent() else {
        return Vec::new();
    };
    [
        (BOOTSTRAP_FILE, Position::Prologue),
        (FINALIZER_FILE, Position::Epilogue),
    ]
    .into_iter()
    .map(|(file, position)| (dir.join(file), position))
    .filter(|(path, _)| path.is_file())
    .collect()
}

/// Symbol names left to the runtime environment.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    patterns: Vec<Regex>,
}

impl IgnoreList {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|source| CompileError::InvalidIgnorePattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(IgnoreList { patterns })
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(name))
    }
}
