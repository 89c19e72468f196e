//! Compile driver: the two-level fixpoint around analysis and generation.
//!
//! `analyze_functions` discovers, loads and renders symbols until no new
//! reference appears, then runs the processors over the table.
//! `generate_code` assembles and injects the functions and applies every
//! `post_process` hook. The driver repeats both stages until generation is
//! stable, then materialises the output once more and trims it.

use serde_json::Value;

use crate::annotation::{build_pipeline, AnnotationProcessor};
use crate::assembler;
use crate::config::CompilerConfig;
use crate::error::{CompileError, Result};
use crate::loader;
use crate::render::TemplateRenderer;
use crate::session::CompileSession;

/// Processor pipeline of one compile.
pub type Pipeline = Vec<Box<dyn AnnotationProcessor>>;

/// Outcome of an analysis pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Analysis {
    /// Resolve/load rounds run by the load fixpoint.
    pub load_rounds: usize,
    /// Symbols rendered (and parsed) during this pass.
    pub rendered: usize,
}

/// Outcome of a generation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub code: String,
    /// Whether the post-process chain rewrote the assembled code.
    pub changed: bool,
}

/// Run the load fixpoint over the references in `code`, render new
/// symbols once and hand them to `parse_function`, then call `process`.
pub fn analyze_functions(
    session: &mut CompileSession<'_>,
    pipeline: &mut Pipeline,
    code: &str,
) -> Result<Analysis> {
    loader::extract_references(session, code);
    let load_rounds = loader::load_all(session)?;

    let pending = session.symbols.unrendered();
    for name in &pending {
        render_symbol(session, name)?;
        for processor in pipeline.iter_mut() {
            processor.parse_function(session, name)?;
        }
    }

    for processor in pipeline.iter_mut() {
        processor.process(session)?;
    }

    Ok(Analysis {
        load_rounds,
        rendered: pending.len(),
    })
}

fn render_symbol(session: &mut CompileSession<'_>, name: &str) -> Result<()> {
    let Some(symbol) = session.symbols.get(name) else {
        return Ok(());
    };
    let rendered = session
        .renderer
        .render_content(&symbol.source, session.context)
        .map_err(|e| match e {
            CompileError::Template { message, .. } => CompileError::Template {
                template: name.to_string(),
                message,
            },
            other => other,
        })?;
    if let Some(symbol) = session.symbols.get_mut(name) {
        symbol.source = rendered;
        symbol.rendered_as_template = true;
    }
    Ok(())
}

/// Assemble the table into `host_code` and run every `post_process` hook.
pub fn generate_code(
    session: &mut CompileSession<'_>,
    pipeline: &mut Pipeline,
    host_code: &str,
) -> Result<Generated> {
    session.symbols.mark_all_uninserted();
    for processor in pipeline.iter_mut() {
        processor.reset();
    }

    let functions = assembler::assemble(&mut session.symbols);
    let injected = assembler::inject(host_code, &functions)?;

    let mut code = injected.clone();
    for processor in pipeline.iter_mut() {
        code = processor.post_process(session, code)?;
    }
    let changed = code != injected;
    Ok(Generated { code, changed })
}

/// Strip trailing whitespace from every line.
pub fn trim_trailing_whitespace(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    for line in code.lines() {
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Compiles host code against a configuration and a template renderer.
pub struct Compiler<'a> {
    config: &'a CompilerConfig,
    renderer: &'a dyn TemplateRenderer,
}

impl<'a> Compiler<'a> {
    pub fn new(config: &'a CompilerConfig, renderer: &'a dyn TemplateRenderer) -> Self {
        Compiler { config, renderer }
    }

    /// Compile `host_code` (already rendered) into the final script.
    /// `context` is the data used to render each function source.
    pub fn compile(&self, host_code: &str, context: &Value) -> Result<String> {
        let mut session = CompileSession::new(self.config, self.renderer, context)?;
        let mut pipeline = build_pipeline(&self.config.pipeline);
        for processor in pipeline.iter_mut() {
            processor.init(&session)?;
        }

        let mut code = host_code.to_string();
        let mut iteration = 0;
        loop {
            if iteration == self.config.max_iterations {
                return Err(CompileError::NotConverged {
                    iterations: iteration,
                });
            }
            iteration += 1;

            let analysis = analyze_functions(&mut session, &mut pipeline, &code)?;
            let generated = generate_code(&mut session, &mut pipeline, host_code)?;
            tracing::debug!(
                iteration,
                load_rounds = analysis.load_rounds,
                rendered = analysis.rendered,
                symbols = session.symbols.len(),
                changed = generated.changed,
                "compile iteration"
            );

            let rewritten = generated.changed && generated.code != code;
            let undiscovered = loader::has_unknown_references(&session, &generated.code);
            if !rewritten && !undiscovered {
                break;
            }
            code = generated.code;
        }

        let generated = generate_code(&mut session, &mut pipeline, host_code)?;
        Ok(trim_trailing_whitespace(&generated.code))
    }
}
