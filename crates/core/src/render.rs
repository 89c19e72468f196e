//! Template rendering for symbol sources, the host skeleton and the
//! annotation processors.
//!
//! The engine only depends on [`TemplateRenderer`]; [`MiniJinjaRenderer`]
//! is the implementation used by the CLI.

use std::path::{Path, PathBuf};

use minijinja::syntax::SyntaxConfig;
use minijinja::Environment;
use serde_json::Value;

use crate::error::{CompileError, Result};

/// Extension of template files registered from a template directory.
pub const TEMPLATE_EXTENSION: &str = "tpl";

/// Name used in errors raised while rendering inline content.
const INLINE_TEMPLATE: &str = "<inline>";

pub trait TemplateRenderer {
    /// Render a registered template by name.
    fn render(&self, name: &str, data: &Value) -> Result<String>;

    /// Render `content` itself as a template.
    fn render_content(&self, content: &str, data: &Value) -> Result<String>;
}

/// [`TemplateRenderer`] backed by a `minijinja` environment.
///
/// Comments use `{{# ... #}}` so that shell expressions such as
/// `${#array[@]}` pass through untouched.
pub struct MiniJinjaRenderer {
    env: Environment<'static>,
}

impl MiniJinjaRenderer {
    pub fn new() -> Result<Self> {
        let syntax = SyntaxConfig::builder()
            .block_delimiters("{%", "%}")
            .variable_delimiters("{{", "}}")
            .comment_delimiters("{{#", "#}}")
            .build()
            .map_err(|e| CompileError::template(INLINE_TEMPLATE, e))?;

        let mut env = Environment::new();
        env.set_syntax(syntax);
        env.set_keep_trailing_newline(true);
        Ok(MiniJinjaRenderer { env })
    }

    /// Build a renderer with every template found under `dirs`.
    pub fn from_dirs(dirs: &[PathBuf]) -> Result<Self> {
        let mut renderer = Self::new()?;
        for dir in dirs {
            renderer.add_template_dir(dir)?;
        }
        Ok(renderer)
    }

    /// Register a template under `name`.
    pub fn add_template(&mut self, name: &str, source: &str) -> Result<()> {
        self.env
            .add_template_owned(name.to_string(), source.to_string())
            .map_err(|e| CompileError::template(name, e))
    }

    /// Register every `*.tpl` file under `dir`, named by its path relative
    /// to `dir` without the extension (`annotations/require.tpl` becomes
    /// `annotations/require`).
    pub fn add_template_dir(&mut self, dir: &Path) -> Result<()> {
        for path in crate::archive::collect_files(dir).map_err(|e| CompileError::io(dir, e))? {
            if path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXTENSION) {
                continue;
            }
            let Ok(relative) = path.strip_prefix(dir) else {
                continue;
            };
            let name = relative
                .with_extension("")
                .to_string_lossy()
                .replace('\\', "/");
            let source = std::fs::read_to_string(&path).map_err(|e| CompileError::io(&path, e))?;
            tracing::trace!(template = %name, path = %path.display(), "registering template");
            self.add_template(&name, &source)?;
        }
        Ok(())
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.env.get_template(name).is_ok()
    }
}

impl TemplateRenderer for MiniJinjaRenderer {
    fn render(&self, name: &str, data: &Value) -> Result<String> {
        let template = self
            .env
            .get_template(name)
            .map_err(|e| CompileError::template(name, e))?;
        template
            .render(data)
            .map_err(|e| CompileError::template(name, e))
    }

    fn render_content(&self, content: &str, data: &Value) -> Result<String> {
        self.env
            .render_str(content, data)
            .map_err(|e| CompileError::template(INLINE_TEMPLATE, e))
    }
}
