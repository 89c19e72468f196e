#![allow(clippy::result_large_err)]
//! bash-compiler-core: assembles a bash script from a skeleton and a
//! library of file-backed functions.
//!
//! Functions are named `Namespace::Sub::name` and live in
//! `Namespace/Sub/name.sh` under one of the configured search directories.
//! The compiler finds every function referenced by the skeleton (and,
//! transitively, by the functions it pulls in), renders each one as a
//! template, runs the annotation processors over them and injects the
//! result at the `# FUNCTIONS` line of the skeleton.
//!
//! # Public API
//!
//! - [`Compiler`] -- run the full fixpoint compile
//! - [`ConfigFile`], [`CompilerConfig`] -- configuration
//! - [`TemplateRenderer`], [`MiniJinjaRenderer`] -- template rendering
//! - [`CompileError`] -- error type
//!
//! The individual stages ([`analyze_functions`], [`generate_code`],
//! [`assembler::assemble`], [`assembler::inject`]) are public for callers
//! that drive the pipeline themselves.

pub mod annotation;
pub mod archive;
pub mod assembler;
pub mod config;
pub mod driver;
pub mod error;
pub mod loader;
pub mod render;
pub mod resolver;
pub mod session;
pub mod symbol;

// ── Convenience re-exports: key types ────────────────────────────────

pub use annotation::{AnnotationProcessor, EmbedProcessor, RequireProcessor};
pub use config::{AnnotationsConfig, CompilerConfig, ConfigFile, ProcessorKind};
pub use error::{CompileError, Result};
pub use render::{MiniJinjaRenderer, TemplateRenderer};
pub use resolver::Resolver;
pub use session::CompileSession;
pub use symbol::{Position, Symbol, SymbolTable};

// ── Convenience re-exports: pipeline entry points ────────────────────

pub use driver::{analyze_functions, generate_code, Compiler, Pipeline};
