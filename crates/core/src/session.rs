//! Per-compile state, passed explicitly to every stage.

use serde_json::Value;

use crate::config::CompilerConfig;
use crate::error::Result;
use crate::render::TemplateRenderer;
use crate::resolver::{IgnoreList, Resolver};
use crate::symbol::SymbolTable;

/// One compile invocation. Created empty, grows monotonically, dropped at
/// the end of the compile.
pub struct CompileSession<'a> {
    pub symbols: SymbolTable,
    pub config: &'a CompilerConfig,
    pub renderer: &'a dyn TemplateRenderer,
    /// Data handed to the renderer when a symbol source is rendered.
    pub context: &'a Value,
    pub resolver: Resolver,
    pub ignore: IgnoreList,
}

impl<'a> CompileSession<'a> {
    pub fn new(
        config: &'a CompilerConfig,
        renderer: &'a dyn TemplateRenderer,
        context: &'a Value,
    ) -> Result<Self> {
        Ok(CompileSession {
            symbols: SymbolTable::new(),
            config,
            renderer,
            context,
            resolver: Resolver::new(config.search_dirs.clone()),
            ignore: IgnoreList::new(&config.ignore)?,
        })
    }
}
