//! Reference discovery and symbol loading.
//!
//! Loading a symbol rescans its content, so every load may register more
//! symbols; [`load_all`] repeats resolve-then-load rounds until nothing new
//! appears.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CompileError, Result};
use crate::resolver::directory_files;
use crate::session::CompileSession;
use crate::symbol::{Position, Symbol};

/// `Namespace::Sub::function`: one or more uppercase-leading segments
/// followed by a final identifier. The leading group keeps matches from
/// starting in the middle of a longer identifier.
static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9_:])(?P<name>(?:[A-Z][A-Za-z0-9_]*::)+[A-Za-z_][A-Za-z0-9_]*)")
        .expect("reference pattern is valid")
});

/// Names referenced on non-blank, non-comment lines of `code`, in order of
/// first appearance.
pub fn references(code: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for line in code.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        for caps in REFERENCE.captures_iter(line) {
            let name = &caps["name"];
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

/// Register every reference in `code` not yet in the table as an
/// unresolved body symbol. Ignored names are skipped. Returns the new names.
pub fn extract_references(session: &mut CompileSession<'_>, code: &str) -> Vec<String> {
    let mut added = Vec::new();
    for name in references(code) {
        if session.ignore.is_ignored(&name) || session.symbols.contains(&name) {
            continue;
        }
        tracing::debug!(symbol = %name, "discovered reference");
        session.symbols.insert(Symbol::new(name.clone(), Position::Body));
        added.push(name);
    }
    added
}

/// Whether `code` references a symbol the session does not know yet.
pub fn has_unknown_references(session: &CompileSession<'_>, code: &str) -> bool {
    references(code)
        .iter()
        .any(|name| !session.ignore.is_ignored(name) && !session.symbols.contains(name))
}

/// Blank out a leading shebang line. The line itself is kept (empty) so
/// line counts are preserved; any other first line is left untouched.
pub fn strip_shebang(content: &str) -> String {
    if content.starts_with("#!/") {
        match content.find('\n') {
            Some(end) => content[end..].to_string(),
            None => String::new(),
        }
    } else {
        content.to_string()
    }
}

/// Read a resolved symbol's file, store its content and rescan it.
pub fn load_content(session: &mut CompileSession<'_>, name: &str) -> Result<()> {
    let Some(path) = session
        .symbols
        .get(name)
        .and_then(|s| s.source_file())
        .map(|p| p.to_path_buf())
    else {
        return Err(CompileError::FunctionNotFound {
            name: name.to_string(),
            search_dirs: session.resolver.search_dirs().to_vec(),
        });
    };

    let bytes = std::fs::read(&path).map_err(|e| CompileError::io(&path, e))?;
    let content = String::from_utf8(bytes).map_err(|e| CompileError::NonUtf8Source {
        name: name.to_string(),
        path: path.clone(),
        valid_up_to: e.utf8_error().valid_up_to(),
    })?;
    let content = strip_shebang(&content);
    tracing::debug!(symbol = name, path = %path.display(), "loaded");

    if let Some(symbol) = session.symbols.get_mut(name) {
        symbol.source = content.clone();
        symbol.source_loaded = true;
    }
    extract_references(session, &content);
    Ok(())
}

/// Resolve `name` if needed and register the bootstrap/finalizer files of
/// its directory.
fn resolve_symbol(session: &mut CompileSession<'_>, name: &str) -> Result<()> {
    let existing = session
        .symbols
        .get(name)
        .and_then(|s| s.source_file())
        .map(|p| p.to_path_buf());
    let path = match existing {
        Some(path) => path,
        None => {
            let path = session.resolver.resolve_or_fail(name)?;
            if let Some(symbol) = session.symbols.get_mut(name) {
                symbol.set_source_file(&path);
            }
            path
        }
    };

    for (file, position) in directory_files(&path) {
        let file_name = file.to_string_lossy().into_owned();
        let mut symbol = Symbol::new(file_name, position);
        symbol.set_source_file(&file);
        if session.symbols.insert(symbol) {
            tracing::debug!(file = %file.display(), ?position, "auto-included");
        }
    }
    Ok(())
}

/// Resolve and load until no unloaded symbol remains. Each round handles
/// the symbols known at its start. Returns the number of rounds run.
pub fn load_all(session: &mut CompileSession<'_>) -> Result<usize> {
    let mut rounds = 0;
    loop {
        let pending = session.symbols.unloaded();
        if pending.is_empty() {
            return Ok(rounds);
        }
        rounds += 1;
        tracing::debug!(round = rounds, pending = pending.len(), "load round");
        for name in pending {
            resolve_symbol(session, &name)?;
            load_content(session, &name)?;
        }
    }
}
