//! Annotation processors: directive-driven rewrites of symbol sources and
//! of the assembled code.

pub mod embed;
pub mod require;

use crate::config::ProcessorKind;
use crate::error::Result;
use crate::session::CompileSession;

pub use embed::EmbedProcessor;
pub use require::RequireProcessor;

/// Five-hook lifecycle shared by every processor.
///
/// Within one compile, hooks run in pipeline order and per phase: every
/// `parse_function` call for a symbol happens before `process`, which
/// happens before `post_process`.
pub trait AnnotationProcessor {
    fn name(&self) -> &'static str;

    /// Check configuration before the first pass.
    fn init(&mut self, session: &CompileSession<'_>) -> Result<()>;

    /// Clear per-pass state. Called before each generation pass.
    fn reset(&mut self);

    /// Called once per symbol, right after its template rendering.
    fn parse_function(&mut self, session: &mut CompileSession<'_>, name: &str) -> Result<()>;

    /// Called once per analysis pass over the whole table.
    fn process(&mut self, session: &mut CompileSession<'_>) -> Result<()>;

    /// Rewrite the fully assembled code.
    fn post_process(&mut self, session: &CompileSession<'_>, code: String) -> Result<String>;
}

/// Fresh processor instances in the configured order.
pub fn build_pipeline(kinds: &[ProcessorKind]) -> Vec<Box<dyn AnnotationProcessor>> {
    kinds
        .iter()
        .map(|kind| -> Box<dyn AnnotationProcessor> {
            match kind {
                ProcessorKind::Require => Box::new(RequireProcessor::default()),
                ProcessorKind::Embed => Box::new(EmbedProcessor::default()),
            }
        })
        .collect()
}

/// Read a required template name, reporting the dotted field path when it
/// is missing.
pub(crate) fn required_template(
    processor: &'static str,
    field: &str,
    value: Option<&String>,
) -> Result<String> {
    match value {
        Some(name) if !name.trim().is_empty() => Ok(name.clone()),
        _ => Err(crate::error::CompileError::InitValidation {
            processor,
            field: format!("compiler.annotations.{}", field),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_follows_configured_order() {
        let pipeline = build_pipeline(&[ProcessorKind::Embed, ProcessorKind::Require]);
        let names: Vec<&str> = pipeline.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["embed", "require"]);
    }

    #[test]
    fn missing_template_reports_field_path() {
        let err = required_template("require", "require_template", None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "require processor: missing required configuration field compiler.annotations.require_template"
        );
        let blank = " ".to_string();
        assert!(required_template("require", "require_template", Some(&blank)).is_err());
    }
}
