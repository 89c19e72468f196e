//! `# @require <Function::name>`: declared dependencies between functions.
//!
//! A function carrying require markers is wrapped with the
//! check-requirements template, which asserts at runtime that each required
//! function was initialised. Each required function is wrapped once with
//! the require template, which emits its one-time initialisation guard.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use super::{required_template, AnnotationProcessor};
use crate::error::{CompileError, Result};
use crate::session::CompileSession;

static REQUIRE_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*#\s*@require\s+(?P<name>.+)$").expect("require pattern is valid")
});

/// Require bookkeeping for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequireState {
    /// Names listed by the symbol's require markers.
    pub requires: Vec<String>,
    /// Markers have been scanned (and the check wrapper applied).
    pub scanned: bool,
    /// Another symbol requires this one.
    pub required: bool,
    /// The require wrapper has been applied.
    pub computed: bool,
}

#[derive(Debug, Default)]
pub struct RequireProcessor {
    require_template: String,
    check_requirements_template: String,
    states: HashMap<String, RequireState>,
}

impl RequireProcessor {
    pub fn state(&self, name: &str) -> Option<&RequireState> {
        self.states.get(name)
    }

    fn inject_check_requirements(
        &self,
        session: &CompileSession<'_>,
        name: &str,
        code: &str,
        requires: &[String],
    ) -> Result<String> {
        ensure_function_header(name, code, None)?;
        session.renderer.render(
            &self.check_requirements_template,
            &json!({ "code": code, "name": name, "requires": requires }),
        )
    }

    fn inject_require(
        &self,
        session: &CompileSession<'_>,
        name: &str,
        code: &str,
        required_by: &str,
    ) -> Result<String> {
        ensure_function_header(name, code, Some(required_by))?;
        session
            .renderer
            .render(&self.require_template, &json!({ "code": code, "name": name }))
    }
}

/// Names listed by require markers in `code`, one per line, in order.
pub fn scan_requires(code: &str) -> Vec<String> {
    code.lines()
        .filter_map(|line| REQUIRE_DIRECTIVE.captures(line))
        .map(|caps| caps["name"].trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Check that `code` defines a function called exactly `name`.
fn ensure_function_header(name: &str, code: &str, required_by: Option<&str>) -> Result<()> {
    let pattern = format!(r"(?m)^\s*(?:function\s+)?{}\s*\(\)\s*\{{", regex::escape(name));
    let header = Regex::new(&pattern).map_err(|e| CompileError::RequiredFunctionNotFound {
        name: name.to_string(),
        required_by: required_by.map(str::to_owned),
        reason: e.to_string(),
    })?;
    if header.is_match(code) {
        Ok(())
    } else {
        Err(CompileError::RequiredFunctionNotFound {
            name: name.to_string(),
            required_by: required_by.map(str::to_owned),
            reason: format!("no function definition named {} in its source", name),
        })
    }
}

impl AnnotationProcessor for RequireProcessor {
    fn name(&self) -> &'static str {
        "require"
    }

    fn init(&mut self, session: &CompileSession<'_>) -> Result<()> {
        let annotations = &session.config.annotations;
        self.require_template = required_template(
            "require",
            "require_template",
            annotations.require_template.as_ref(),
        )?;
        self.check_requirements_template = required_template(
            "require",
            "check_requirements_template",
            annotations.check_requirements_template.as_ref(),
        )?;
        Ok(())
    }

    fn reset(&mut self) {}

    fn parse_function(&mut self, _session: &mut CompileSession<'_>, _name: &str) -> Result<()> {
        Ok(())
    }

    fn process(&mut self, session: &mut CompileSession<'_>) -> Result<()> {
        let names = session.symbols.names();

        for name in &names {
            let Some(symbol) = session.symbols.get(name) else {
                continue;
            };
            if !symbol.rendered_as_template
                || self.states.get(name).is_some_and(|s| s.scanned)
            {
                continue;
            }
            let requires = scan_requires(&symbol.source);
            let wrapped = if requires.is_empty() {
                None
            } else {
                Some(self.inject_check_requirements(session, name, &symbol.source, &requires)?)
            };

            if let (Some(code), Some(symbol)) = (wrapped, session.symbols.get_mut(name)) {
                symbol.source = code;
            }
            let state = self.states.entry(name.clone()).or_default();
            state.requires = requires;
            state.scanned = true;
        }

        let edges: Vec<(String, String)> = names
            .iter()
            .filter_map(|name| self.states.get(name).map(|s| (name, &s.requires)))
            .flat_map(|(name, requires)| requires.iter().map(move |r| (name.clone(), r.clone())))
            .collect();

        for (required_by, target) in edges {
            let Some(symbol) = session.symbols.get(&target) else {
                return Err(CompileError::RequiredFunctionNotFound {
                    name: target,
                    required_by: Some(required_by),
                    reason: "function is not part of the compiled code".to_string(),
                });
            };

            let state = self.states.entry(target.clone()).or_default();
            state.required = true;
            if state.computed {
                continue;
            }

            let code = self.inject_require(session, &target, &symbol.source, &required_by)?;
            if let Some(symbol) = session.symbols.get_mut(&target) {
                symbol.source = code;
            }
            self.states.entry(target).or_default().computed = true;
        }
        Ok(())
    }

    fn post_process(&mut self, _session: &CompileSession<'_>, code: String) -> Result<String> {
        Ok(code)
    }
}
