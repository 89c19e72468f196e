//! Lay out symbol sources and inject them into the host code.

use crate::error::{CompileError, Result};
use crate::symbol::{Position, SymbolTable};

/// Line of the host code before which the functions are injected.
pub const FUNCTIONS_DIRECTIVE: &str = "# FUNCTIONS";

/// Concatenate loaded symbol sources: prologue, body then epilogue, each
/// bucket sorted by name. Callers reset the `inserted` flags first with
/// [`SymbolTable::mark_all_uninserted`].
pub fn assemble(symbols: &mut SymbolTable) -> String {
    let mut out = String::new();
    for position in Position::ALL {
        for symbol in symbols.iter_mut().filter(|s| s.position == position) {
            if symbol.inserted {
                continue;
            }
            if !symbol.source_loaded {
                tracing::warn!(symbol = %symbol.name, "skipping function whose source was never loaded");
                continue;
            }
            out.push_str(&symbol.source);
            symbol.inserted = true;
        }
    }
    out
}

/// Copy `host_code` line by line, writing `functions` right before the
/// `# FUNCTIONS` line. Without the directive the functions are dropped;
/// a second directive is an error.
pub fn inject(host_code: &str, functions: &str) -> Result<String> {
    let mut out = String::with_capacity(host_code.len() + functions.len());
    let mut injected = false;
    for (index, line) in host_code.lines().enumerate() {
        if line == FUNCTIONS_DIRECTIVE {
            if injected {
                return Err(CompileError::DuplicatedFunctionsDirective { line: index + 1 });
            }
            out.push_str(functions);
            injected = true;
        }
        out.push_str(line);
        out.push('\n');
    }
    Ok(out)
}
