//! Compiler configuration file (`bash-compiler.toml`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, Result};

/// Default outer fixpoint iteration cap.
pub const DEFAULT_MAX_ITERATIONS: usize = 64;

/// Top-level wrapper matching the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub compiler: CompilerConfig,
    #[serde(default)]
    pub vars: serde_json::Map<String, serde_json::Value>,
}

/// The `[compiler]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Host skeleton template.
    pub skeleton: Option<PathBuf>,
    /// Default output file.
    pub output: Option<PathBuf>,
    pub search_dirs: Vec<PathBuf>,
    /// Regular expressions; matching symbol names are left to the runtime.
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default)]
    pub template_dirs: Vec<PathBuf>,
    #[serde(default = "default_pipeline")]
    pub pipeline: Vec<ProcessorKind>,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default)]
    pub annotations: AnnotationsConfig,
}

/// `[compiler.annotations]`: template names used by the processors.
/// Each key is only required when its processor is in the pipeline; the
/// processors check them in their `init` hook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotationsConfig {
    pub require_template: Option<String>,
    pub check_requirements_template: Option<String>,
    pub embed_file_template: Option<String>,
    pub embed_dir_template: Option<String>,
}

/// Annotation processors available to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorKind {
    Require,
    Embed,
}

fn default_pipeline() -> Vec<ProcessorKind> {
    vec![ProcessorKind::Require, ProcessorKind::Embed]
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

impl CompilerConfig {
    /// Configuration with the given search dirs and every other field at
    /// its default.
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        CompilerConfig {
            skeleton: None,
            output: None,
            search_dirs,
            ignore: Vec::new(),
            template_dirs: Vec::new(),
            pipeline: default_pipeline(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            annotations: AnnotationsConfig::default(),
        }
    }

    /// Validate the fields that do not depend on a processor.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.search_dirs.is_empty() {
            return Err("compiler.search_dirs cannot be empty".to_string());
        }
        if self.max_iterations == 0 {
            return Err("compiler.max_iterations must be at least 1".to_string());
        }
        for pattern in &self.ignore {
            if let Err(e) = regex::Regex::new(pattern) {
                return Err(format!("compiler.ignore: invalid pattern '{}': {}", pattern, e));
            }
        }
        Ok(())
    }

    /// Make every relative path absolute against `base_dir`.
    fn rebase(&mut self, base_dir: &Path) {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base_dir.join(&*p);
            }
        };
        self.skeleton.iter_mut().for_each(rebase);
        self.output.iter_mut().for_each(rebase);
        self.search_dirs.iter_mut().for_each(rebase);
        self.template_dirs.iter_mut().for_each(rebase);
    }
}

impl ConfigFile {
    /// Parse a configuration from TOML text. Relative paths are resolved
    /// against `base_dir`; `origin` is only used in error messages.
    pub fn from_toml_str(text: &str, base_dir: &Path, origin: &Path) -> Result<Self> {
        let mut file: ConfigFile =
            toml::from_str(text).map_err(|e| CompileError::config(origin, e.to_string()))?;
        file.compiler
            .validate()
            .map_err(|message| CompileError::config(origin, message))?;
        file.compiler.rebase(base_dir);
        Ok(file)
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| CompileError::io(path, e))?;
        let base_dir = path.parent().unwrap_or(Path::new("."));
        Self::from_toml_str(&text, base_dir, path)
    }

    /// The `[vars]` table as a template context.
    pub fn template_context(&self) -> serde_json::Value {
        serde_json::Value::Object(self.vars.clone())
    }
}
